//! In-memory repositories
//!
//! Same contracts as the PostgreSQL repositories, backed by `DashMap`s. Used
//! when the server runs without `DATABASE_URL` (local demos) and by the
//! integration tests. Nothing survives a restart.

use super::attendance::{AttendanceFilter, AttendanceStore};
use super::chat_message::ChatMessageStore;
use super::conversation::{ConversationFilter, ConversationStore, ConversationTransition};
use super::demand::{DemandFilter, DemandStore};
use super::service::ServiceStore;
use super::user::UserStore;
use super::{Create, Delete, Read, ReadMany, Update};
use crate::dtos::{
    CreateAttendanceDTO, CreateChatMessageDTO, CreateConversationDTO, CreateDemandDTO,
    CreateServiceDTO, CreateUserDTO, UpdateDemandDTO, UpdateServiceDTO, UpdateUserDTO,
};
use crate::entities::{
    Attendance, ChatMessage, Conversation, ConversationStatus, Demand, DemandStatus, Role,
    Service, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::Error;
use sqlx::error::{DatabaseError, ErrorKind};
use std::borrow::Cow;
use std::error::Error as StdError;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};

/// Violazione di un vincolo di unicità, riportata come errore di database
/// così che gli handler la trattino come con PostgreSQL
#[derive(Debug, thiserror::Error)]
#[error("duplicate key value violates unique constraint \"{constraint}\"")]
pub struct UniqueViolation {
    constraint: &'static str,
}

impl DatabaseError for UniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed("23505"))
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn constraint(&self) -> Option<&str> {
        Some(self.constraint)
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::UniqueViolation
    }
}

fn unique_violation(constraint: &'static str) -> Error {
    Error::Database(Box::new(UniqueViolation { constraint }))
}

/// Tabella in memoria con chiave primaria autoincrementale
struct Table<T> {
    rows: DashMap<i32, T>,
    next_id: AtomicI32,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicI32::new(1),
        }
    }

    fn next_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn get(&self, id: &i32) -> Option<T> {
        self.rows.get(id).map(|row| row.value().clone())
    }

    fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows
            .iter()
            .filter(|row| predicate(row.value()))
            .map(|row| row.value().clone())
            .collect()
    }
}

// ********************* USERS **********************//

pub struct MemoryUserRepository {
    table: Table<User>,
    // serializza i controlli di unicità con l'inserimento
    write_lock: Mutex<()>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
            write_lock: Mutex::new(()),
        }
    }

    fn check_unique(
        &self,
        user_id: Option<i32>,
        email: Option<&str>,
        registration: Option<&str>,
    ) -> Result<(), Error> {
        for row in self.table.rows.iter() {
            let other = row.value();
            if Some(other.user_id) == user_id {
                continue;
            }
            if email.is_some_and(|e| other.email == e) {
                return Err(unique_violation("users_email_key"));
            }
            if registration.is_some_and(|r| other.registration.as_deref() == Some(r)) {
                return Err(unique_violation("users_registration_key"));
            }
        }
        Ok(())
    }
}

impl Default for MemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let email = email.to_lowercase();
        Ok(self.table.filter(|u| u.email == email).into_iter().next())
    }

    async fn find_by_registration(&self, registration: &str) -> Result<Option<User>, Error> {
        Ok(self
            .table
            .filter(|u| u.registration.as_deref() == Some(registration))
            .into_iter()
            .next())
    }

    async fn find_many(
        &self,
        role: Option<Role>,
        search: Option<&str>,
    ) -> Result<Vec<User>, Error> {
        let pattern = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let mut users = self.table.filter(|u| {
            role.is_none_or(|r| u.role == r)
                && pattern.as_ref().is_none_or(|p| {
                    u.name.to_lowercase().starts_with(p.as_str()) || u.email.starts_with(p.as_str())
                })
        });
        users.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.user_id.cmp(&b.user_id))
        });
        Ok(users)
    }
}

#[async_trait]
impl Create<User, CreateUserDTO> for MemoryUserRepository {
    async fn create(&self, data: &CreateUserDTO) -> Result<User, Error> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let email = data.email.to_lowercase();
        self.check_unique(None, Some(&email), data.registration.as_deref())?;
        let user = User {
            user_id: self.table.next_id(),
            name: data.name.clone(),
            email,
            password: data.password.clone(),
            role: data.role,
            registration: data.registration.clone(),
            active: true,
            created_at: Utc::now(),
        };
        self.table.rows.insert(user.user_id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl Read<User, i32> for MemoryUserRepository {
    async fn read(&self, id: &i32) -> Result<Option<User>, Error> {
        Ok(self.table.get(id))
    }
}

#[async_trait]
impl ReadMany<User, i32> for MemoryUserRepository {
    async fn read_many(&self, ids: &[i32]) -> Result<Vec<User>, Error> {
        Ok(self.table.filter(|u| ids.contains(&u.user_id)))
    }
}

#[async_trait]
impl Update<User, UpdateUserDTO, i32> for MemoryUserRepository {
    async fn update(&self, id: &i32, data: &UpdateUserDTO) -> Result<User, Error> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.check_unique(Some(*id), None, data.registration.as_deref())?;
        let mut row = self.table.rows.get_mut(id).ok_or(Error::RowNotFound)?;
        if let Some(ref name) = data.name {
            row.name = name.clone();
        }
        if let Some(role) = data.role {
            row.role = role;
        }
        if let Some(ref registration) = data.registration {
            row.registration = Some(registration.clone());
        }
        if let Some(active) = data.active {
            row.active = active;
        }
        Ok(row.clone())
    }
}

#[async_trait]
impl Delete<i32> for MemoryUserRepository {
    async fn delete(&self, id: &i32) -> Result<(), Error> {
        let mut row = self.table.rows.get_mut(id).ok_or(Error::RowNotFound)?;
        row.active = false;
        Ok(())
    }
}

// ********************* SERVICES **********************//

pub struct MemoryServiceRepository {
    table: Table<Service>,
    write_lock: Mutex<()>,
}

impl MemoryServiceRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
            write_lock: Mutex::new(()),
        }
    }

    fn check_unique_name(&self, service_id: Option<i32>, name: &str) -> Result<(), Error> {
        let name = name.trim().to_lowercase();
        let duplicated = self
            .table
            .rows
            .iter()
            .any(|row| Some(row.service_id) != service_id && row.name.to_lowercase() == name);
        if duplicated {
            return Err(unique_violation("services_name_key"));
        }
        Ok(())
    }
}

impl Default for MemoryServiceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceStore for MemoryServiceRepository {
    async fn find_many(&self, include_inactive: bool) -> Result<Vec<Service>, Error> {
        let mut services = self.table.filter(|s| include_inactive || s.active);
        // stesso ordine di ORDER BY LOWER(name), name
        services.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(services)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Service>, Error> {
        let name = name.trim().to_lowercase();
        Ok(self
            .table
            .filter(|s| s.name.to_lowercase() == name)
            .into_iter()
            .next())
    }
}

#[async_trait]
impl Create<Service, CreateServiceDTO> for MemoryServiceRepository {
    async fn create(&self, data: &CreateServiceDTO) -> Result<Service, Error> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.check_unique_name(None, &data.name)?;
        let service = Service {
            service_id: self.table.next_id(),
            name: data.name.trim().to_string(),
            description: data.description.clone(),
            category: data.category.clone(),
            active: true,
            created_at: Utc::now(),
        };
        self.table.rows.insert(service.service_id, service.clone());
        Ok(service)
    }
}

#[async_trait]
impl Read<Service, i32> for MemoryServiceRepository {
    async fn read(&self, id: &i32) -> Result<Option<Service>, Error> {
        Ok(self.table.get(id))
    }
}

#[async_trait]
impl Update<Service, UpdateServiceDTO, i32> for MemoryServiceRepository {
    async fn update(&self, id: &i32, data: &UpdateServiceDTO) -> Result<Service, Error> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref name) = data.name {
            self.check_unique_name(Some(*id), name)?;
        }
        let mut row = self.table.rows.get_mut(id).ok_or(Error::RowNotFound)?;
        if let Some(ref name) = data.name {
            row.name = name.trim().to_string();
        }
        if let Some(ref description) = data.description {
            row.description = description.clone();
        }
        if let Some(ref category) = data.category {
            row.category = Some(category.clone());
        }
        if let Some(active) = data.active {
            row.active = active;
        }
        Ok(row.clone())
    }
}

#[async_trait]
impl Delete<i32> for MemoryServiceRepository {
    async fn delete(&self, id: &i32) -> Result<(), Error> {
        let mut row = self.table.rows.get_mut(id).ok_or(Error::RowNotFound)?;
        row.active = false;
        Ok(())
    }
}

// ********************* DEMANDS **********************//

pub struct MemoryDemandRepository {
    table: Table<Demand>,
    write_lock: Mutex<()>,
}

impl MemoryDemandRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
            write_lock: Mutex::new(()),
        }
    }
}

impl Default for MemoryDemandRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DemandStore for MemoryDemandRepository {
    async fn find_by_protocol(&self, protocol: &str) -> Result<Option<Demand>, Error> {
        Ok(self
            .table
            .filter(|d| d.protocol == protocol)
            .into_iter()
            .next())
    }

    async fn find_many(&self, filter: &DemandFilter) -> Result<Vec<Demand>, Error> {
        let mut demands = self.table.filter(|d| filter.matches(d));
        demands.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.demand_id.cmp(&a.demand_id))
        });
        Ok(demands)
    }

    async fn transition_status(
        &self,
        id: &i32,
        from: DemandStatus,
        to: DemandStatus,
    ) -> Result<Option<Demand>, Error> {
        let Some(mut row) = self.table.rows.get_mut(id) else {
            return Ok(None);
        };
        if row.status != from {
            return Ok(None);
        }
        row.status = to;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }
}

#[async_trait]
impl Create<Demand, CreateDemandDTO> for MemoryDemandRepository {
    async fn create(&self, data: &CreateDemandDTO) -> Result<Demand, Error> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.table.rows.iter().any(|d| d.protocol == data.protocol) {
            return Err(unique_violation("demands_protocol_key"));
        }
        let demand = Demand {
            demand_id: self.table.next_id(),
            protocol: data.protocol.clone(),
            client_id: data.client_id,
            service_id: data.service_id,
            assignee_id: None,
            description: data.description.clone(),
            status: DemandStatus::Pending,
            created_at: data.created_at,
            updated_at: data.created_at,
        };
        self.table.rows.insert(demand.demand_id, demand.clone());
        Ok(demand)
    }
}

#[async_trait]
impl Read<Demand, i32> for MemoryDemandRepository {
    async fn read(&self, id: &i32) -> Result<Option<Demand>, Error> {
        Ok(self.table.get(id))
    }
}

#[async_trait]
impl Update<Demand, UpdateDemandDTO, i32> for MemoryDemandRepository {
    async fn update(&self, id: &i32, data: &UpdateDemandDTO) -> Result<Demand, Error> {
        let mut row = self.table.rows.get_mut(id).ok_or(Error::RowNotFound)?;
        if let Some(assignee_id) = data.assignee_id {
            row.assignee_id = Some(assignee_id);
            row.updated_at = Utc::now();
        }
        Ok(row.clone())
    }
}

// ********************* ATTENDANCES **********************//

pub struct MemoryAttendanceRepository {
    table: Table<Attendance>,
}

impl MemoryAttendanceRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for MemoryAttendanceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttendanceStore for MemoryAttendanceRepository {
    async fn find_many(&self, filter: &AttendanceFilter) -> Result<Vec<Attendance>, Error> {
        let mut attendances = self.table.filter(|a| filter.matches(a));
        attendances.sort_by(|a, b| {
            b.attended_at
                .cmp(&a.attended_at)
                .then(b.attendance_id.cmp(&a.attendance_id))
        });
        Ok(attendances)
    }
}

#[async_trait]
impl Create<Attendance, CreateAttendanceDTO> for MemoryAttendanceRepository {
    async fn create(&self, data: &CreateAttendanceDTO) -> Result<Attendance, Error> {
        let attendance = Attendance {
            attendance_id: self.table.next_id(),
            demand_id: data.demand_id,
            attendant_id: data.attendant_id,
            description: data.description.clone(),
            duration_minutes: data.duration_minutes,
            attended_at: data.attended_at,
            created_at: Utc::now(),
        };
        self.table
            .rows
            .insert(attendance.attendance_id, attendance.clone());
        Ok(attendance)
    }
}

#[async_trait]
impl Read<Attendance, i32> for MemoryAttendanceRepository {
    async fn read(&self, id: &i32) -> Result<Option<Attendance>, Error> {
        Ok(self.table.get(id))
    }
}

#[async_trait]
impl Delete<i32> for MemoryAttendanceRepository {
    async fn delete(&self, id: &i32) -> Result<(), Error> {
        self.table.rows.remove(id);
        Ok(())
    }
}

// ********************* CHAT **********************//

pub struct MemoryConversationRepository {
    table: Table<Conversation>,
}

impl MemoryConversationRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for MemoryConversationRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationRepository {
    async fn find_many(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>, Error> {
        let mut conversations = self.table.filter(|c| filter.matches(c));
        conversations.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then(b.conversation_id.cmp(&a.conversation_id))
        });
        Ok(conversations)
    }

    async fn find_waiting(&self) -> Result<Vec<Conversation>, Error> {
        let mut waiting = self
            .table
            .filter(|c| c.status == ConversationStatus::WaitingHuman);
        waiting.sort_by(|a, b| {
            a.handoff_requested_at
                .cmp(&b.handoff_requested_at)
                .then(a.conversation_id.cmp(&b.conversation_id))
        });
        Ok(waiting)
    }

    async fn count_waiting(&self) -> Result<usize, Error> {
        Ok(self
            .table
            .rows
            .iter()
            .filter(|c| c.status == ConversationStatus::WaitingHuman)
            .count())
    }

    async fn transition(
        &self,
        id: &i32,
        transition: &ConversationTransition,
    ) -> Result<Option<Conversation>, Error> {
        // get_mut tiene il lock dello shard: controllo e scrittura sono atomici
        let Some(mut row) = self.table.rows.get_mut(id) else {
            return Ok(None);
        };
        if !transition.apply(&mut row) {
            return Ok(None);
        }
        Ok(Some(row.clone()))
    }

    async fn set_feedback(
        &self,
        id: &i32,
        rating: i16,
        comment: Option<&str>,
    ) -> Result<Option<Conversation>, Error> {
        let Some(mut row) = self.table.rows.get_mut(id) else {
            return Ok(None);
        };
        if row.status != ConversationStatus::Ended || row.rating.is_some() {
            return Ok(None);
        }
        row.rating = Some(rating);
        row.feedback = comment.map(str::to_string);
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn touch(&self, id: &i32, at: DateTime<Utc>) -> Result<(), Error> {
        if let Some(mut row) = self.table.rows.get_mut(id) {
            row.updated_at = at;
        }
        Ok(())
    }
}

#[async_trait]
impl Create<Conversation, CreateConversationDTO> for MemoryConversationRepository {
    async fn create(&self, data: &CreateConversationDTO) -> Result<Conversation, Error> {
        let now = Utc::now();
        let conversation = Conversation {
            conversation_id: self.table.next_id(),
            client_id: data.client_id,
            attendant_id: None,
            subject: data.subject.clone(),
            status: ConversationStatus::Bot,
            created_at: now,
            updated_at: now,
            handoff_requested_at: None,
            ended_at: None,
            rating: None,
            feedback: None,
        };
        self.table
            .rows
            .insert(conversation.conversation_id, conversation.clone());
        Ok(conversation)
    }
}

#[async_trait]
impl Read<Conversation, i32> for MemoryConversationRepository {
    async fn read(&self, id: &i32) -> Result<Option<Conversation>, Error> {
        Ok(self.table.get(id))
    }
}

pub struct MemoryChatMessageRepository {
    table: Table<ChatMessage>,
}

impl MemoryChatMessageRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }

    fn sorted_for(&self, conversation_id: i32) -> Vec<ChatMessage> {
        let mut messages = self
            .table
            .filter(|m| m.conversation_id == conversation_id);
        messages.sort_by_key(|m| m.message_id);
        messages
    }
}

impl Default for MemoryChatMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatMessageStore for MemoryChatMessageRepository {
    async fn find_after(
        &self,
        conversation_id: &i32,
        after_id: Option<i32>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, Error> {
        let after_id = after_id.unwrap_or(0);
        Ok(self
            .sorted_for(*conversation_id)
            .into_iter()
            .filter(|m| m.message_id > after_id)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_recent(
        &self,
        conversation_id: &i32,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, Error> {
        let messages = self.sorted_for(*conversation_id);
        let skip = messages.len().saturating_sub(limit.max(0) as usize);
        Ok(messages.into_iter().skip(skip).collect())
    }

    async fn last_message_id(&self, conversation_id: &i32) -> Result<Option<i32>, Error> {
        Ok(self
            .table
            .rows
            .iter()
            .filter(|m| m.conversation_id == *conversation_id)
            .map(|m| m.message_id)
            .max())
    }
}

#[async_trait]
impl Create<ChatMessage, CreateChatMessageDTO> for MemoryChatMessageRepository {
    async fn create(&self, data: &CreateChatMessageDTO) -> Result<ChatMessage, Error> {
        let message = ChatMessage {
            message_id: self.table.next_id(),
            conversation_id: data.conversation_id,
            sender_id: data.sender_id,
            sender_kind: data.sender_kind,
            content: data.content.clone(),
            created_at: Utc::now(),
        };
        self.table.rows.insert(message.message_id, message.clone());
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, registration: Option<&str>) -> CreateUserDTO {
        CreateUserDTO {
            name: "Test".into(),
            email: email.into(),
            password: "hash".into(),
            role: Role::Student,
            registration: registration.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_user_email_is_unique_and_lowercase() {
        let repo = MemoryUserRepository::new();
        let user = repo.create(&new_user("Ana@NAF.br", None)).await.unwrap();
        assert_eq!(user.email, "ana@naf.br");

        let err = repo.create(&new_user("ana@naf.br", None)).await.unwrap_err();
        match err {
            Error::Database(db) => assert!(db.is_unique_violation()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(repo.find_by_email("ANA@naf.br").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_user_registration_is_unique() {
        let repo = MemoryUserRepository::new();
        repo.create(&new_user("a@naf.br", Some("2024001"))).await.unwrap();
        assert!(repo.create(&new_user("b@naf.br", Some("2024001"))).await.is_err());
        assert!(repo.create(&new_user("c@naf.br", Some("2024002"))).await.is_ok());
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_user() {
        let repo = MemoryUserRepository::new();
        let user = repo.create(&new_user("a@naf.br", None)).await.unwrap();
        repo.delete(&user.user_id).await.unwrap();
        let stored = repo.read(&user.user_id).await.unwrap().unwrap();
        assert!(!stored.active);
        assert!(matches!(repo.delete(&999).await, Err(Error::RowNotFound)));
    }

    #[tokio::test]
    async fn test_services_sorted_ignoring_case() {
        let repo = MemoryServiceRepository::new();
        for name in ["CPF", "MEI", "imposto de renda"] {
            repo.create(&CreateServiceDTO {
                name: name.into(),
                description: "Orientação".into(),
                category: None,
            })
            .await
            .unwrap();
        }
        let names: Vec<String> = repo
            .find_many(false)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["CPF", "imposto de renda", "MEI"]);
    }

    #[tokio::test]
    async fn test_demand_transition_is_compare_and_set() {
        let repo = MemoryDemandRepository::new();
        let demand = repo
            .create(&CreateDemandDTO {
                protocol: "NAF20261019-000001".into(),
                client_id: 1,
                service_id: 1,
                description: "MEI".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let moved = repo
            .transition_status(&demand.demand_id, DemandStatus::Pending, DemandStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(moved.unwrap().status, DemandStatus::InProgress);

        let stale = repo
            .transition_status(&demand.demand_id, DemandStatus::Pending, DemandStatus::Cancelled)
            .await
            .unwrap();
        assert!(stale.is_none());
    }

    #[tokio::test]
    async fn test_messages_after_and_recent() {
        let repo = MemoryChatMessageRepository::new();
        for i in 0..5 {
            repo.create(&CreateChatMessageDTO {
                conversation_id: 1,
                sender_id: Some(1),
                sender_kind: crate::entities::SenderKind::Client,
                content: format!("msg {i}"),
            })
            .await
            .unwrap();
        }
        repo.create(&CreateChatMessageDTO {
            conversation_id: 2,
            sender_id: None,
            sender_kind: crate::entities::SenderKind::System,
            content: "other".into(),
        })
        .await
        .unwrap();

        let after = repo.find_after(&1, Some(2), 100).await.unwrap();
        assert_eq!(
            after.iter().map(|m| m.message_id).collect::<Vec<_>>(),
            vec![3, 4, 5]
        );

        let recent = repo.find_recent(&1, 2).await.unwrap();
        assert_eq!(recent[0].content, "msg 3");
        assert_eq!(recent[1].content, "msg 4");

        assert_eq!(repo.last_message_id(&1).await.unwrap(), Some(5));
        assert_eq!(repo.last_message_id(&3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_feedback_only_once_and_only_when_ended() {
        let repo = MemoryConversationRepository::new();
        let conv = repo
            .create(&CreateConversationDTO {
                client_id: 1,
                subject: None,
            })
            .await
            .unwrap();
        let id = conv.conversation_id;

        assert!(repo.set_feedback(&id, 5, None).await.unwrap().is_none());

        let end = ConversationTransition::new(&ConversationStatus::OPEN, ConversationStatus::Ended);
        repo.transition(&id, &end).await.unwrap().unwrap();

        let rated = repo.set_feedback(&id, 4, Some("ótimo")).await.unwrap().unwrap();
        assert_eq!(rated.rating, Some(4));
        assert!(repo.set_feedback(&id, 1, None).await.unwrap().is_none());
    }
}
