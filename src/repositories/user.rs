//! UserRepository - Repository per la gestione degli utenti

use super::{Create, Delete, Read, ReadMany, Update};
use crate::dtos::{CreateUserDTO, UpdateUserDTO};
use crate::entities::{Role, User};
use async_trait::async_trait;
use sqlx::{Error, PgPool};
use tracing::{debug, info, instrument};

/// Operazioni disponibili sugli utenti, indipendenti dal backend
#[async_trait]
pub trait UserStore:
    Create<User, CreateUserDTO>
    + Read<User, i32>
    + ReadMany<User, i32>
    + Update<User, UpdateUserDTO, i32>
    + Delete<i32>
    + Send
    + Sync
{
    /// Find user by exact e-mail match (e-mails are stored lowercase)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    /// Find a student by enrolment number
    async fn find_by_registration(&self, registration: &str) -> Result<Option<User>, Error>;

    /// List users ordered by name, optionally filtered by role and by a
    /// case-insensitive prefix on name or e-mail
    async fn find_many(&self, role: Option<Role>, search: Option<&str>)
    -> Result<Vec<User>, Error>;
}

const USER_COLUMNS: &str =
    r#"user_id, name, email, password, role, registration, active, created_at"#;

// USER REPO
pub struct UserRepository {
    connection_pool: PgPool,
}

impl UserRepository {
    pub fn new(connection_pool: PgPool) -> UserRepository {
        Self { connection_pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        debug!("Finding user by email");
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email.to_lowercase())
            .fetch_optional(&self.connection_pool)
            .await
    }

    #[instrument(skip(self))]
    async fn find_by_registration(&self, registration: &str) -> Result<Option<User>, Error> {
        debug!("Finding user by registration");
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE registration = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(registration)
            .fetch_optional(&self.connection_pool)
            .await
    }

    #[instrument(skip(self))]
    async fn find_many(
        &self,
        role: Option<Role>,
        search: Option<&str>,
    ) -> Result<Vec<User>, Error> {
        let mut query_builder =
            sqlx::QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));
        if let Some(role) = role {
            query_builder.push(" AND role = ");
            query_builder.push_bind(role);
        }
        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("{}%", search.trim().to_lowercase());
            query_builder.push(" AND (LOWER(name) LIKE ");
            query_builder.push_bind(pattern.clone());
            query_builder.push(" OR email LIKE ");
            query_builder.push_bind(pattern);
            query_builder.push(")");
        }
        query_builder.push(" ORDER BY LOWER(name) ASC, user_id ASC");

        let users = query_builder
            .build_query_as::<User>()
            .fetch_all(&self.connection_pool)
            .await?;
        debug!("Found {} users", users.len());
        Ok(users)
    }
}

#[async_trait]
impl Create<User, CreateUserDTO> for UserRepository {
    #[instrument(skip(self, data), fields(role = ?data.role))]
    async fn create(&self, data: &CreateUserDTO) -> Result<User, Error> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password, role, registration)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&data.name)
            .bind(data.email.to_lowercase())
            .bind(&data.password)
            .bind(data.role)
            .bind(&data.registration)
            .fetch_one(&self.connection_pool)
            .await?;

        info!("User created with id {}", user.user_id);
        Ok(user)
    }
}

#[async_trait]
impl Read<User, i32> for UserRepository {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn read(&self, id: &i32) -> Result<Option<User>, Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

#[async_trait]
impl ReadMany<User, i32> for UserRepository {
    async fn read_many(&self, ids: &[i32]) -> Result<Vec<User>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ANY($1)");
        sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(&self.connection_pool)
            .await
    }
}

#[async_trait]
impl Update<User, UpdateUserDTO, i32> for UserRepository {
    #[instrument(skip(self, data), fields(user_id = %id))]
    async fn update(&self, id: &i32, data: &UpdateUserDTO) -> Result<User, Error> {
        // First, get the current user to ensure it exists
        let current_user = self.read(id).await?.ok_or(Error::RowNotFound)?;

        if data.name.is_none()
            && data.role.is_none()
            && data.registration.is_none()
            && data.active.is_none()
        {
            debug!("No fields to update, returning current user");
            return Ok(current_user);
        }

        let mut query_builder = sqlx::QueryBuilder::new("UPDATE users SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(ref name) = data.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }
        if let Some(role) = data.role {
            separated.push("role = ");
            separated.push_bind_unseparated(role);
        }
        if let Some(ref registration) = data.registration {
            separated.push("registration = ");
            separated.push_bind_unseparated(registration);
        }
        if let Some(active) = data.active {
            separated.push("active = ");
            separated.push_bind_unseparated(active);
        }
        query_builder.push(" WHERE user_id = ");
        query_builder.push_bind(id);
        query_builder.push(format!(" RETURNING {USER_COLUMNS}"));

        let user = query_builder
            .build_query_as::<User>()
            .fetch_one(&self.connection_pool)
            .await?;
        info!("User updated successfully");
        Ok(user)
    }
}

#[async_trait]
impl Delete<i32> for UserRepository {
    /// Soft delete: the user is deactivated so demands and attendances keep their author
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn delete(&self, user_id: &i32) -> Result<(), Error> {
        let result = sqlx::query("UPDATE users SET active = FALSE WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }
        info!("User deactivated");
        Ok(())
    }
}
