//! Notification DTOs - Snapshot calcolato ad ogni ciclo di polling

use crate::entities::ConversationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversationUpdateDTO {
    pub conversation_id: i32,
    pub status: ConversationStatus,
    pub last_message_id: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NotificationSnapshotDTO {
    pub generated_at: DateTime<Utc>,
    /// numero di conversazioni in attesa di un operatore, solo per lo staff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_queue: Option<usize>,
    pub conversations: Vec<ConversationUpdateDTO>,
}

impl NotificationSnapshotDTO {
    /// Confronta il contenuto ignorando l'istante di generazione
    pub fn same_content(&self, other: &Self) -> bool {
        self.pending_queue == other.pending_queue && self.conversations == other.conversations
    }
}
