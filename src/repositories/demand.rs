//! DemandRepository - Repository per le richieste (ticket) dei clienti

use super::{Create, Read, Update};
use crate::dtos::{CreateDemandDTO, UpdateDemandDTO};
use crate::entities::{Demand, DemandStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Error, PgPool};
use tracing::{debug, info, instrument};

/// Filtri combinabili per la lista delle demand; i campi `None` non filtrano
#[derive(Debug, Clone, Default)]
pub struct DemandFilter {
    pub client_id: Option<i32>,
    pub assignee_id: Option<i32>,
    pub service_id: Option<i32>,
    pub status: Option<DemandStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl DemandFilter {
    pub fn matches(&self, demand: &Demand) -> bool {
        self.client_id.is_none_or(|id| demand.client_id == id)
            && self.assignee_id.is_none_or(|id| demand.assignee_id == Some(id))
            && self.service_id.is_none_or(|id| demand.service_id == id)
            && self.status.is_none_or(|s| demand.status == s)
            && self.created_from.is_none_or(|from| demand.created_at >= from)
            && self.created_to.is_none_or(|to| demand.created_at <= to)
    }
}

#[async_trait]
pub trait DemandStore:
    Create<Demand, CreateDemandDTO> + Read<Demand, i32> + Update<Demand, UpdateDemandDTO, i32> + Send + Sync
{
    async fn find_by_protocol(&self, protocol: &str) -> Result<Option<Demand>, Error>;

    /// Newest first
    async fn find_many(&self, filter: &DemandFilter) -> Result<Vec<Demand>, Error>;

    /// Compare-and-set on the status column.
    ///
    /// # Returns
    /// * `Ok(Some(Demand))` - status was `from` and is now `to`
    /// * `Ok(None)` - the demand does not exist or its status changed meanwhile
    async fn transition_status(
        &self,
        id: &i32,
        from: DemandStatus,
        to: DemandStatus,
    ) -> Result<Option<Demand>, Error>;
}

const DEMAND_COLUMNS: &str = "demand_id, protocol, client_id, service_id, assignee_id, description, status, created_at, updated_at";

// DEMAND REPO
pub struct DemandRepository {
    connection_pool: PgPool,
}

impl DemandRepository {
    pub fn new(connection_pool: PgPool) -> Self {
        Self { connection_pool }
    }
}

#[async_trait]
impl DemandStore for DemandRepository {
    #[instrument(skip(self))]
    async fn find_by_protocol(&self, protocol: &str) -> Result<Option<Demand>, Error> {
        let sql = format!("SELECT {DEMAND_COLUMNS} FROM demands WHERE protocol = $1");
        sqlx::query_as::<_, Demand>(&sql)
            .bind(protocol)
            .fetch_optional(&self.connection_pool)
            .await
    }

    #[instrument(skip(self))]
    async fn find_many(&self, filter: &DemandFilter) -> Result<Vec<Demand>, Error> {
        let mut query_builder =
            sqlx::QueryBuilder::new(format!("SELECT {DEMAND_COLUMNS} FROM demands WHERE TRUE"));
        if let Some(client_id) = filter.client_id {
            query_builder.push(" AND client_id = ").push_bind(client_id);
        }
        if let Some(assignee_id) = filter.assignee_id {
            query_builder.push(" AND assignee_id = ").push_bind(assignee_id);
        }
        if let Some(service_id) = filter.service_id {
            query_builder.push(" AND service_id = ").push_bind(service_id);
        }
        if let Some(status) = filter.status {
            query_builder.push(" AND status = ").push_bind(status);
        }
        if let Some(from) = filter.created_from {
            query_builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.created_to {
            query_builder.push(" AND created_at <= ").push_bind(to);
        }
        query_builder.push(" ORDER BY created_at DESC, demand_id DESC");

        let demands = query_builder
            .build_query_as::<Demand>()
            .fetch_all(&self.connection_pool)
            .await?;
        debug!("Found {} demands", demands.len());
        Ok(demands)
    }

    #[instrument(skip(self), fields(demand_id = %id, from = ?from, to = ?to))]
    async fn transition_status(
        &self,
        id: &i32,
        from: DemandStatus,
        to: DemandStatus,
    ) -> Result<Option<Demand>, Error> {
        let sql = format!(
            r#"
            UPDATE demands SET status = $3, updated_at = NOW()
            WHERE demand_id = $1 AND status = $2
            RETURNING {DEMAND_COLUMNS}
            "#
        );
        let demand = sqlx::query_as::<_, Demand>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(&self.connection_pool)
            .await?;
        if demand.is_some() {
            info!("Demand status changed");
        } else {
            debug!("Demand status not changed");
        }
        Ok(demand)
    }
}

#[async_trait]
impl Create<Demand, CreateDemandDTO> for DemandRepository {
    #[instrument(skip(self, data), fields(client_id = %data.client_id, service_id = %data.service_id))]
    async fn create(&self, data: &CreateDemandDTO) -> Result<Demand, Error> {
        let sql = format!(
            r#"
            INSERT INTO demands (protocol, client_id, service_id, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {DEMAND_COLUMNS}
            "#
        );
        let demand = sqlx::query_as::<_, Demand>(&sql)
            .bind(&data.protocol)
            .bind(data.client_id)
            .bind(data.service_id)
            .bind(&data.description)
            .bind(data.created_at)
            .fetch_one(&self.connection_pool)
            .await?;
        info!("Demand {} created with id {}", demand.protocol, demand.demand_id);
        Ok(demand)
    }
}

#[async_trait]
impl Read<Demand, i32> for DemandRepository {
    async fn read(&self, id: &i32) -> Result<Option<Demand>, Error> {
        let sql = format!("SELECT {DEMAND_COLUMNS} FROM demands WHERE demand_id = $1");
        sqlx::query_as::<_, Demand>(&sql)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

#[async_trait]
impl Update<Demand, UpdateDemandDTO, i32> for DemandRepository {
    #[instrument(skip(self, data), fields(demand_id = %id))]
    async fn update(&self, id: &i32, data: &UpdateDemandDTO) -> Result<Demand, Error> {
        let Some(assignee_id) = data.assignee_id else {
            return self.read(id).await?.ok_or(Error::RowNotFound);
        };

        let mut query_builder = sqlx::QueryBuilder::new("UPDATE demands SET updated_at = NOW()");
        query_builder.push(", assignee_id = ").push_bind(assignee_id);
        query_builder.push(" WHERE demand_id = ").push_bind(id);
        query_builder.push(format!(" RETURNING {DEMAND_COLUMNS}"));

        query_builder
            .build_query_as::<Demand>()
            .fetch_one(&self.connection_pool)
            .await
    }
}
