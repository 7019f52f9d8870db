//! ChatMessage entity - Messaggio all'interno di una conversazione

use super::enums::SenderKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct ChatMessage {
    pub message_id: i32,
    pub conversation_id: i32,
    // None per i messaggi dell'assistente e di sistema
    pub sender_id: Option<i32>,
    pub sender_kind: SenderKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
