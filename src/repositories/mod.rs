//! Repositories module - Accesso ai dati
//!
//! Ogni entità ha un trait `*Store` con le operazioni richieste dagli handler
//! e due implementazioni: `*Repository` su PostgreSQL e `Memory*Repository`
//! in memoria.

pub mod attendance;
pub mod chat_message;
pub mod conversation;
pub mod demand;
pub mod memory;
pub mod service;
pub mod traits;
pub mod user;

// Re-exports per facilitare l'import
pub use attendance::{AttendanceFilter, AttendanceRepository, AttendanceStore};
pub use chat_message::{ChatMessageRepository, ChatMessageStore};
pub use conversation::{
    ConversationFilter, ConversationRepository, ConversationStore, ConversationTransition,
};
pub use demand::{DemandFilter, DemandRepository, DemandStore};
pub use memory::{
    MemoryAttendanceRepository, MemoryChatMessageRepository, MemoryConversationRepository,
    MemoryDemandRepository, MemoryServiceRepository, MemoryUserRepository,
};
pub use service::{ServiceRepository, ServiceStore};
pub use traits::{Create, Delete, Read, ReadMany, Update};
pub use user::{UserRepository, UserStore};
