//! ConversationRepository - Repository per le conversazioni della chat di supporto

use super::{Create, Read};
use crate::dtos::CreateConversationDTO;
use crate::entities::{Conversation, ConversationStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Error, PgPool};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Default)]
pub struct ConversationFilter {
    pub client_id: Option<i32>,
    pub attendant_id: Option<i32>,
    /// vuoto = qualsiasi stato
    pub statuses: Vec<ConversationStatus>,
}

impl ConversationFilter {
    pub fn matches(&self, conversation: &Conversation) -> bool {
        self.client_id.is_none_or(|id| conversation.client_id == id)
            && self
                .attendant_id
                .is_none_or(|id| conversation.attendant_id == Some(id))
            && (self.statuses.is_empty() || self.statuses.contains(&conversation.status))
    }
}

/// Cambio di stato richiesto da un passo del workflow di handoff
#[derive(Debug, Clone)]
pub struct ConversationTransition {
    /// stati di partenza ammessi
    pub from: Vec<ConversationStatus>,
    pub to: ConversationStatus,
    /// operatore da assegnare (solo per l'accept)
    pub attendant_id: Option<i32>,
    pub at: DateTime<Utc>,
}

impl ConversationTransition {
    pub fn new(from: &[ConversationStatus], to: ConversationStatus) -> Self {
        Self {
            from: from.to_vec(),
            to,
            attendant_id: None,
            at: Utc::now(),
        }
    }

    pub fn with_attendant(mut self, attendant_id: i32) -> Self {
        self.attendant_id = Some(attendant_id);
        self
    }

    /// Applica la transizione ad una copia in memoria, `false` se lo stato di partenza non è ammesso
    pub fn apply(&self, conversation: &mut Conversation) -> bool {
        if !self.from.contains(&conversation.status) {
            return false;
        }
        conversation.status = self.to;
        conversation.updated_at = self.at;
        if let Some(attendant_id) = self.attendant_id {
            conversation.attendant_id = Some(attendant_id);
        }
        match self.to {
            ConversationStatus::WaitingHuman => conversation.handoff_requested_at = Some(self.at),
            ConversationStatus::Ended => conversation.ended_at = Some(self.at),
            _ => {}
        }
        true
    }
}

#[async_trait]
pub trait ConversationStore:
    Create<Conversation, CreateConversationDTO> + Read<Conversation, i32> + Send + Sync
{
    /// Most recently updated first
    async fn find_many(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>, Error>;

    /// Pending handoff queue, oldest request first
    async fn find_waiting(&self) -> Result<Vec<Conversation>, Error>;

    async fn count_waiting(&self) -> Result<usize, Error>;

    /// Atomic compare-and-set of the conversation status.
    /// `Ok(None)` when the conversation is missing or not in one of `from`.
    async fn transition(
        &self,
        id: &i32,
        transition: &ConversationTransition,
    ) -> Result<Option<Conversation>, Error>;

    /// Stores the feedback only once, and only on ended conversations
    async fn set_feedback(
        &self,
        id: &i32,
        rating: i16,
        comment: Option<&str>,
    ) -> Result<Option<Conversation>, Error>;

    /// Bumps `updated_at` after a new message
    async fn touch(&self, id: &i32, at: DateTime<Utc>) -> Result<(), Error>;
}

const CONVERSATION_COLUMNS: &str = "conversation_id, client_id, attendant_id, subject, status, created_at, updated_at, handoff_requested_at, ended_at, rating, feedback";

// CONVERSATION REPO
pub struct ConversationRepository {
    connection_pool: PgPool,
}

impl ConversationRepository {
    pub fn new(connection_pool: PgPool) -> Self {
        Self { connection_pool }
    }
}

#[async_trait]
impl ConversationStore for ConversationRepository {
    #[instrument(skip(self))]
    async fn find_many(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>, Error> {
        let mut query_builder = sqlx::QueryBuilder::new(format!(
            "SELECT {CONVERSATION_COLUMNS} FROM chat_conversations WHERE TRUE"
        ));
        if let Some(client_id) = filter.client_id {
            query_builder.push(" AND client_id = ").push_bind(client_id);
        }
        if let Some(attendant_id) = filter.attendant_id {
            query_builder.push(" AND attendant_id = ").push_bind(attendant_id);
        }
        if !filter.statuses.is_empty() {
            query_builder.push(" AND status IN (");
            let mut separated = query_builder.separated(", ");
            for status in &filter.statuses {
                separated.push_bind(*status);
            }
            separated.push_unseparated(")");
        }
        query_builder.push(" ORDER BY updated_at DESC, conversation_id DESC");

        query_builder
            .build_query_as::<Conversation>()
            .fetch_all(&self.connection_pool)
            .await
    }

    async fn find_waiting(&self) -> Result<Vec<Conversation>, Error> {
        let sql = format!(
            r#"
            SELECT {CONVERSATION_COLUMNS} FROM chat_conversations
            WHERE status = $1
            ORDER BY handoff_requested_at ASC, conversation_id ASC
            "#
        );
        sqlx::query_as::<_, Conversation>(&sql)
            .bind(ConversationStatus::WaitingHuman)
            .fetch_all(&self.connection_pool)
            .await
    }

    async fn count_waiting(&self) -> Result<usize, Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_conversations WHERE status = $1")
                .bind(ConversationStatus::WaitingHuman)
                .fetch_one(&self.connection_pool)
                .await?;
        Ok(count as usize)
    }

    #[instrument(skip(self, transition), fields(conversation_id = %id, to = ?transition.to))]
    async fn transition(
        &self,
        id: &i32,
        transition: &ConversationTransition,
    ) -> Result<Option<Conversation>, Error> {
        let handoff_at = (transition.to == ConversationStatus::WaitingHuman).then_some(transition.at);
        let ended_at = (transition.to == ConversationStatus::Ended).then_some(transition.at);

        // il WHERE sullo stato rende l'UPDATE un compare-and-set: due accept concorrenti
        // non possono entrambi trovare la riga in WAITING_HUMAN
        let mut query_builder = sqlx::QueryBuilder::new("UPDATE chat_conversations SET status = ");
        query_builder.push_bind(transition.to);
        query_builder.push(", updated_at = ").push_bind(transition.at);
        query_builder
            .push(", attendant_id = COALESCE(")
            .push_bind(transition.attendant_id)
            .push(", attendant_id)");
        query_builder
            .push(", handoff_requested_at = COALESCE(")
            .push_bind(handoff_at)
            .push(", handoff_requested_at)");
        query_builder
            .push(", ended_at = COALESCE(")
            .push_bind(ended_at)
            .push(", ended_at)");
        query_builder.push(" WHERE conversation_id = ").push_bind(id);
        query_builder.push(" AND status IN (");
        let mut separated = query_builder.separated(", ");
        for status in &transition.from {
            separated.push_bind(*status);
        }
        separated.push_unseparated(")");
        query_builder.push(format!(" RETURNING {CONVERSATION_COLUMNS}"));

        let conversation = query_builder
            .build_query_as::<Conversation>()
            .fetch_optional(&self.connection_pool)
            .await?;
        if conversation.is_some() {
            info!("Conversation status changed");
        } else {
            debug!("Conversation transition rejected");
        }
        Ok(conversation)
    }

    #[instrument(skip(self, comment), fields(conversation_id = %id))]
    async fn set_feedback(
        &self,
        id: &i32,
        rating: i16,
        comment: Option<&str>,
    ) -> Result<Option<Conversation>, Error> {
        let sql = format!(
            r#"
            UPDATE chat_conversations SET rating = $2, feedback = $3, updated_at = NOW()
            WHERE conversation_id = $1 AND status = $4 AND rating IS NULL
            RETURNING {CONVERSATION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Conversation>(&sql)
            .bind(id)
            .bind(rating)
            .bind(comment)
            .bind(ConversationStatus::Ended)
            .fetch_optional(&self.connection_pool)
            .await
    }

    async fn touch(&self, id: &i32, at: DateTime<Utc>) -> Result<(), Error> {
        sqlx::query("UPDATE chat_conversations SET updated_at = $2 WHERE conversation_id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.connection_pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Create<Conversation, CreateConversationDTO> for ConversationRepository {
    #[instrument(skip(self, data), fields(client_id = %data.client_id))]
    async fn create(&self, data: &CreateConversationDTO) -> Result<Conversation, Error> {
        let sql = format!(
            r#"
            INSERT INTO chat_conversations (client_id, subject, status)
            VALUES ($1, $2, $3)
            RETURNING {CONVERSATION_COLUMNS}
            "#
        );
        let conversation = sqlx::query_as::<_, Conversation>(&sql)
            .bind(data.client_id)
            .bind(&data.subject)
            .bind(ConversationStatus::Bot)
            .fetch_one(&self.connection_pool)
            .await?;
        info!("Conversation created with id {}", conversation.conversation_id);
        Ok(conversation)
    }
}

#[async_trait]
impl Read<Conversation, i32> for ConversationRepository {
    async fn read(&self, id: &i32) -> Result<Option<Conversation>, Error> {
        let sql = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM chat_conversations WHERE conversation_id = $1"
        );
        sqlx::query_as::<_, Conversation>(&sql)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}
