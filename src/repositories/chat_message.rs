//! ChatMessageRepository - Repository per i messaggi della chat di supporto

use super::Create;
use crate::dtos::CreateChatMessageDTO;
use crate::entities::ChatMessage;
use async_trait::async_trait;
use sqlx::{Error, PgPool};
use tracing::{debug, instrument};

#[async_trait]
pub trait ChatMessageStore: Create<ChatMessage, CreateChatMessageDTO> + Send + Sync {
    /// Messages with id greater than `after_id` (all when `None`), ascending by id,
    /// at most `limit`. Used by clients polling for new messages.
    async fn find_after(
        &self,
        conversation_id: &i32,
        after_id: Option<i32>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, Error>;

    /// Last `limit` messages of a conversation, returned in ascending order
    async fn find_recent(&self, conversation_id: &i32, limit: i64)
    -> Result<Vec<ChatMessage>, Error>;

    async fn last_message_id(&self, conversation_id: &i32) -> Result<Option<i32>, Error>;
}

const MESSAGE_COLUMNS: &str =
    "message_id, conversation_id, sender_id, sender_kind, content, created_at";

// CHAT MESSAGE REPO
pub struct ChatMessageRepository {
    connection_pool: PgPool,
}

impl ChatMessageRepository {
    pub fn new(connection_pool: PgPool) -> Self {
        Self { connection_pool }
    }
}

#[async_trait]
impl ChatMessageStore for ChatMessageRepository {
    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    async fn find_after(
        &self,
        conversation_id: &i32,
        after_id: Option<i32>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, Error> {
        let sql = format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM chat_messages
            WHERE conversation_id = $1 AND message_id > $2
            ORDER BY message_id ASC
            LIMIT $3
            "#
        );
        let messages = sqlx::query_as::<_, ChatMessage>(&sql)
            .bind(conversation_id)
            .bind(after_id.unwrap_or(0))
            .bind(limit)
            .fetch_all(&self.connection_pool)
            .await?;
        debug!("Retrieved {} messages", messages.len());
        Ok(messages)
    }

    async fn find_recent(
        &self,
        conversation_id: &i32,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, Error> {
        let sql = format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM (
                SELECT {MESSAGE_COLUMNS} FROM chat_messages
                WHERE conversation_id = $1
                ORDER BY message_id DESC
                LIMIT $2
            ) recent
            ORDER BY message_id ASC
            "#
        );
        sqlx::query_as::<_, ChatMessage>(&sql)
            .bind(conversation_id)
            .bind(limit)
            .fetch_all(&self.connection_pool)
            .await
    }

    async fn last_message_id(&self, conversation_id: &i32) -> Result<Option<i32>, Error> {
        sqlx::query_scalar("SELECT MAX(message_id) FROM chat_messages WHERE conversation_id = $1")
            .bind(conversation_id)
            .fetch_one(&self.connection_pool)
            .await
    }
}

#[async_trait]
impl Create<ChatMessage, CreateChatMessageDTO> for ChatMessageRepository {
    #[instrument(skip(self, data), fields(conversation_id = %data.conversation_id, kind = ?data.sender_kind))]
    async fn create(&self, data: &CreateChatMessageDTO) -> Result<ChatMessage, Error> {
        let sql = format!(
            r#"
            INSERT INTO chat_messages (conversation_id, sender_id, sender_kind, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {MESSAGE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ChatMessage>(&sql)
            .bind(data.conversation_id)
            .bind(data.sender_id)
            .bind(data.sender_kind)
            .bind(&data.content)
            .fetch_one(&self.connection_pool)
            .await
    }
}
