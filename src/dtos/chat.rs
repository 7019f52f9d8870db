//! Chat DTOs - Data Transfer Objects per conversazioni e messaggi

use crate::entities::{ChatMessage, Conversation, ConversationStatus, SenderKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConversationDTO {
    pub conversation_id: i32,
    pub client_id: i32,
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

impl From<Conversation> for ConversationDTO {
    fn from(value: Conversation) -> Self {
        Self {
            conversation_id: value.conversation_id,
            client_id: value.client_id,
            attendant_id: value.attendant_id,
            subject: value.subject,
            status: value.status,
            created_at: value.created_at,
            updated_at: value.updated_at,
            handoff_requested_at: value.handoff_requested_at,
            ended_at: value.ended_at,
            rating: value.rating,
            feedback: value.feedback,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatMessageDTO {
    pub message_id: i32,
    pub conversation_id: i32,
    pub sender_id: Option<i32>,
    pub sender_kind: SenderKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessage> for ChatMessageDTO {
    fn from(value: ChatMessage) -> Self {
        Self {
            message_id: value.message_id,
            conversation_id: value.conversation_id,
            sender_id: value.sender_id,
            sender_kind: value.sender_kind,
            content: value.content,
            created_at: value.created_at,
        }
    }
}

/// Body di POST /api/chat/conversations
#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
pub struct CreateConversationRequestDTO {
    #[validate(length(max = 200))]
    pub subject: Option<String>,
}

/// DTO per creare una conversazione nel repository
#[derive(Debug, Clone)]
pub struct CreateConversationDTO {
    pub client_id: i32,
    pub subject: Option<String>,
}

/// Body di POST /api/chat/conversations/{id}/messages
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct SendMessageDTO {
    #[validate(length(min = 1, max = 5000, message = "Message content must be between 1 and 5000 characters"))]
    pub content: String,
}

/// DTO per creare un nuovo messaggio (senza message_id)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateChatMessageDTO {
    pub conversation_id: i32,
    pub sender_id: Option<i32>,
    pub sender_kind: SenderKind,
    #[validate(length(min = 1, max = 5000, message = "Message content must be between 1 and 5000 characters"))]
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
pub struct RejectHandoffDTO {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct FeedbackDTO {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}
