//! AttendanceRepository - Repository per le attendance

use super::{Create, Delete, Read};
use crate::dtos::CreateAttendanceDTO;
use crate::entities::Attendance;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Error, PgPool};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub demand_id: Option<i32>,
    pub attendant_id: Option<i32>,
    pub attended_from: Option<DateTime<Utc>>,
    pub attended_to: Option<DateTime<Utc>>,
}

impl AttendanceFilter {
    pub fn matches(&self, attendance: &Attendance) -> bool {
        self.demand_id.is_none_or(|id| attendance.demand_id == id)
            && self.attendant_id.is_none_or(|id| attendance.attendant_id == id)
            && self.attended_from.is_none_or(|from| attendance.attended_at >= from)
            && self.attended_to.is_none_or(|to| attendance.attended_at <= to)
    }
}

#[async_trait]
pub trait AttendanceStore:
    Create<Attendance, CreateAttendanceDTO> + Read<Attendance, i32> + Delete<i32> + Send + Sync
{
    /// Ordered by `attended_at` descending
    async fn find_many(&self, filter: &AttendanceFilter) -> Result<Vec<Attendance>, Error>;
}

const ATTENDANCE_COLUMNS: &str =
    "attendance_id, demand_id, attendant_id, description, duration_minutes, attended_at, created_at";

// ATTENDANCE REPO
pub struct AttendanceRepository {
    connection_pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(connection_pool: PgPool) -> Self {
        Self { connection_pool }
    }
}

#[async_trait]
impl AttendanceStore for AttendanceRepository {
    #[instrument(skip(self))]
    async fn find_many(&self, filter: &AttendanceFilter) -> Result<Vec<Attendance>, Error> {
        let mut query_builder = sqlx::QueryBuilder::new(format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances WHERE TRUE"
        ));
        if let Some(demand_id) = filter.demand_id {
            query_builder.push(" AND demand_id = ").push_bind(demand_id);
        }
        if let Some(attendant_id) = filter.attendant_id {
            query_builder.push(" AND attendant_id = ").push_bind(attendant_id);
        }
        if let Some(from) = filter.attended_from {
            query_builder.push(" AND attended_at >= ").push_bind(from);
        }
        if let Some(to) = filter.attended_to {
            query_builder.push(" AND attended_at <= ").push_bind(to);
        }
        query_builder.push(" ORDER BY attended_at DESC, attendance_id DESC");

        let attendances = query_builder
            .build_query_as::<Attendance>()
            .fetch_all(&self.connection_pool)
            .await?;
        debug!("Found {} attendances", attendances.len());
        Ok(attendances)
    }
}

#[async_trait]
impl Create<Attendance, CreateAttendanceDTO> for AttendanceRepository {
    #[instrument(skip(self, data), fields(demand_id = %data.demand_id, attendant_id = %data.attendant_id))]
    async fn create(&self, data: &CreateAttendanceDTO) -> Result<Attendance, Error> {
        let sql = format!(
            r#"
            INSERT INTO attendances (demand_id, attendant_id, description, duration_minutes, attended_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ATTENDANCE_COLUMNS}
            "#
        );
        let attendance = sqlx::query_as::<_, Attendance>(&sql)
            .bind(data.demand_id)
            .bind(data.attendant_id)
            .bind(&data.description)
            .bind(data.duration_minutes)
            .bind(data.attended_at)
            .fetch_one(&self.connection_pool)
            .await?;
        info!("Attendance created with id {}", attendance.attendance_id);
        Ok(attendance)
    }
}

#[async_trait]
impl Read<Attendance, i32> for AttendanceRepository {
    async fn read(&self, id: &i32) -> Result<Option<Attendance>, Error> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendances WHERE attendance_id = $1");
        sqlx::query_as::<_, Attendance>(&sql)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

#[async_trait]
impl Delete<i32> for AttendanceRepository {
    #[instrument(skip(self), fields(attendance_id = %id))]
    async fn delete(&self, id: &i32) -> Result<(), Error> {
        sqlx::query("DELETE FROM attendances WHERE attendance_id = $1")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        info!("Attendance deleted successfully");
        Ok(())
    }
}
