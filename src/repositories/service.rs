//! ServiceRepository - Repository per il catalogo dei servizi

use super::{Create, Delete, Read, Update};
use crate::dtos::{CreateServiceDTO, UpdateServiceDTO};
use crate::entities::Service;
use async_trait::async_trait;
use sqlx::{Error, PgPool};
use tracing::{debug, info, instrument};

#[async_trait]
pub trait ServiceStore:
    Create<Service, CreateServiceDTO>
    + Read<Service, i32>
    + Update<Service, UpdateServiceDTO, i32>
    + Delete<i32>
    + Send
    + Sync
{
    /// List services ordered by name; inactive ones only when requested
    async fn find_many(&self, include_inactive: bool) -> Result<Vec<Service>, Error>;

    /// Case-insensitive lookup used to reject duplicated names
    async fn find_by_name(&self, name: &str) -> Result<Option<Service>, Error>;
}

const SERVICE_COLUMNS: &str = "service_id, name, description, category, active, created_at";

// SERVICE REPO
pub struct ServiceRepository {
    connection_pool: PgPool,
}

impl ServiceRepository {
    pub fn new(connection_pool: PgPool) -> Self {
        Self { connection_pool }
    }
}

#[async_trait]
impl ServiceStore for ServiceRepository {
    #[instrument(skip(self))]
    async fn find_many(&self, include_inactive: bool) -> Result<Vec<Service>, Error> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE active OR $1 ORDER BY LOWER(name) ASC, name ASC"
        );
        let services = sqlx::query_as::<_, Service>(&sql)
            .bind(include_inactive)
            .fetch_all(&self.connection_pool)
            .await?;
        debug!("Found {} services", services.len());
        Ok(services)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Service>, Error> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE LOWER(name) = LOWER($1)");
        sqlx::query_as::<_, Service>(&sql)
            .bind(name.trim())
            .fetch_optional(&self.connection_pool)
            .await
    }
}

#[async_trait]
impl Create<Service, CreateServiceDTO> for ServiceRepository {
    #[instrument(skip(self, data), fields(name = %data.name))]
    async fn create(&self, data: &CreateServiceDTO) -> Result<Service, Error> {
        let sql = format!(
            r#"
            INSERT INTO services (name, description, category)
            VALUES ($1, $2, $3)
            RETURNING {SERVICE_COLUMNS}
            "#
        );
        let service = sqlx::query_as::<_, Service>(&sql)
            .bind(data.name.trim())
            .bind(&data.description)
            .bind(&data.category)
            .fetch_one(&self.connection_pool)
            .await?;
        info!("Service created with id {}", service.service_id);
        Ok(service)
    }
}

#[async_trait]
impl Read<Service, i32> for ServiceRepository {
    async fn read(&self, id: &i32) -> Result<Option<Service>, Error> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE service_id = $1");
        sqlx::query_as::<_, Service>(&sql)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

#[async_trait]
impl Update<Service, UpdateServiceDTO, i32> for ServiceRepository {
    #[instrument(skip(self, data), fields(service_id = %id))]
    async fn update(&self, id: &i32, data: &UpdateServiceDTO) -> Result<Service, Error> {
        let current = self.read(id).await?.ok_or(Error::RowNotFound)?;

        if data.name.is_none()
            && data.description.is_none()
            && data.category.is_none()
            && data.active.is_none()
        {
            return Ok(current);
        }

        // Build dynamic UPDATE query using QueryBuilder
        let mut query_builder = sqlx::QueryBuilder::new("UPDATE services SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(ref name) = data.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name.trim());
        }
        if let Some(ref description) = data.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }
        if let Some(ref category) = data.category {
            separated.push("category = ");
            separated.push_bind_unseparated(category);
        }
        if let Some(active) = data.active {
            separated.push("active = ");
            separated.push_bind_unseparated(active);
        }
        query_builder.push(" WHERE service_id = ");
        query_builder.push_bind(id);
        query_builder.push(format!(" RETURNING {SERVICE_COLUMNS}"));

        let service = query_builder
            .build_query_as::<Service>()
            .fetch_one(&self.connection_pool)
            .await?;
        info!("Service updated successfully");
        Ok(service)
    }
}

#[async_trait]
impl Delete<i32> for ServiceRepository {
    /// Soft delete: demands keep pointing at the service
    #[instrument(skip(self), fields(service_id = %id))]
    async fn delete(&self, id: &i32) -> Result<(), Error> {
        let result = sqlx::query("UPDATE services SET active = FALSE WHERE service_id = $1")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }
        info!("Service deactivated");
        Ok(())
    }
}
