//! Report services - Riepilogo di demand e attendance per il coordinamento

use crate::core::{ApiQuery, AppError, AppState, require_role};
use crate::dtos::{
    AttendantStatsDTO, ReportQuery, ReportSummaryDTO, ServiceCountDTO, StatusCountsDTO,
};
use crate::entities::{Attendance, Demand, DemandStatus, Role, Service, User};
use crate::repositories::{AttendanceFilter, DemandFilter, ReadMany};
use axum::{
    Extension,
    extract::{Json, State},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Aggrega demand e attendance già filtrate per periodo
pub fn build_summary(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    demands: &[Demand],
    services: &[Service],
    attendances: &[Attendance],
    attendants: &[User],
) -> ReportSummaryDTO {
    let mut by_status = StatusCountsDTO::default();
    let mut by_service: HashMap<i32, usize> = HashMap::new();
    for demand in demands {
        match demand.status {
            DemandStatus::Pending => by_status.pending += 1,
            DemandStatus::InProgress => by_status.in_progress += 1,
            DemandStatus::Completed => by_status.completed += 1,
            DemandStatus::Cancelled => by_status.cancelled += 1,
        }
        *by_service.entry(demand.service_id).or_default() += 1;
    }

    let service_names: HashMap<i32, &str> = services
        .iter()
        .map(|s| (s.service_id, s.name.as_str()))
        .collect();
    let mut demands_by_service: Vec<ServiceCountDTO> = by_service
        .into_iter()
        .map(|(service_id, count)| ServiceCountDTO {
            service_id,
            name: service_names
                .get(&service_id)
                .map(|n| n.to_string())
                .unwrap_or_default(),
            count,
        })
        .collect();
    demands_by_service.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

    let mut per_attendant: HashMap<i32, (usize, i64)> = HashMap::new();
    let mut minutes_total: i64 = 0;
    for attendance in attendances {
        let minutes = i64::from(attendance.duration_minutes);
        minutes_total += minutes;
        let entry = per_attendant.entry(attendance.attendant_id).or_default();
        entry.0 += 1;
        entry.1 += minutes;
    }

    let attendant_names: HashMap<i32, &str> = attendants
        .iter()
        .map(|u| (u.user_id, u.name.as_str()))
        .collect();
    let mut attendant_stats: Vec<AttendantStatsDTO> = per_attendant
        .into_iter()
        .map(|(user_id, (count, minutes))| AttendantStatsDTO {
            user_id,
            name: attendant_names
                .get(&user_id)
                .map(|n| n.to_string())
                .unwrap_or_default(),
            attendances: count,
            minutes,
        })
        .collect();
    attendant_stats
        .sort_by(|a, b| b.minutes.cmp(&a.minutes).then_with(|| a.name.cmp(&b.name)));

    ReportSummaryDTO {
        from,
        to,
        demands_total: demands.len(),
        demands_by_status: by_status,
        demands_by_service,
        attendances_total: attendances.len(),
        attendance_minutes_total: minutes_total,
        attendants: attendant_stats,
    }
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn report_summary(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ApiQuery(params): ApiQuery<ReportQuery>, // /reports/summary?from=...&to=...
) -> Result<Json<ReportSummaryDTO>, AppError> {
    // 1. Riservato a docenti e coordinatori
    // 2. Un intervallo con from > to è BAD_REQUEST
    // 3. Caricare demand (per data di creazione) e attendance (per data) nel periodo
    // 4. Risolvere i nomi di servizi e operatori e aggregare
    require_role(&current_user, &[Role::Teacher, Role::Coordinator])?;

    if let (Some(from), Some(to)) = (params.from, params.to) {
        if from > to {
            warn!("Report requested with from > to");
            return Err(AppError::bad_request("`from` must not be after `to`"));
        }
    }

    let demands = state
        .demands
        .find_many(&DemandFilter {
            created_from: params.from,
            created_to: params.to,
            ..Default::default()
        })
        .await?;
    let attendances = state
        .attendances
        .find_many(&AttendanceFilter {
            attended_from: params.from,
            attended_to: params.to,
            ..Default::default()
        })
        .await?;
    let services = state.services.find_many(true).await?;

    let mut attendant_ids: Vec<i32> = attendances.iter().map(|a| a.attendant_id).collect();
    attendant_ids.sort_unstable();
    attendant_ids.dedup();
    let attendants = state.users.read_many(&attendant_ids).await?;

    let summary = build_summary(
        params.from,
        params.to,
        &demands,
        &services,
        &attendances,
        &attendants,
    );
    info!(
        "Report built: {} demands, {} attendances",
        summary.demands_total, summary.attendances_total
    );
    Ok(Json(summary))
}
