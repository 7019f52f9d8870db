//! Integrazioni esterne: invio e-mail e assistente AI della chat.
//!
//! Entrambe sono dietro un trait, con un'implementazione HTTP (`reqwest`) e
//! una locale usata quando la configurazione manca.

pub mod assistant;
pub mod mailer;

pub use assistant::{AssistantError, CannedAssistant, ChatAssistant, HttpAssistant};
pub use mailer::{Email, HttpMailer, LogMailer, MailError, Mailer};
