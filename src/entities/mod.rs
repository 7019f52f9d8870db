//! Entities module - Entità del dominio applicativo
//!
//! Questo modulo contiene tutte le entità (models) che rappresentano i dati persistiti nel database.
//! Ogni entity corrisponde a una tabella nel database.

pub mod attendance;
pub mod chat_message;
pub mod conversation;
pub mod demand;
pub mod enums;
pub mod service;
pub mod user;

// Re-exports per facilitare l'import
pub use attendance::Attendance;
pub use chat_message::ChatMessage;
pub use conversation::Conversation;
pub use demand::Demand;
pub use enums::{ConversationStatus, DemandStatus, Role, SenderKind};
pub use service::Service;
pub use user::User;
