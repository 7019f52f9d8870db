//! Conversation entity - Conversazione della chat di supporto

use super::enums::ConversationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Conversation {
    pub conversation_id: i32,
    pub client_id: i32,
    // valorizzato solo quando un membro dello staff accetta l'handoff
    pub attendant_id: Option<i32>,
    pub subject: Option<String>,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub handoff_requested_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub rating: Option<i16>,
    pub feedback: Option<String>,
}

impl Conversation {
    pub fn is_participant(&self, user_id: i32) -> bool {
        self.client_id == user_id || self.attendant_id == Some(user_id)
    }
}
