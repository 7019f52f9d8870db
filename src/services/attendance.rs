//! Attendance services - Registro delle sessioni svolte sulle demand

use crate::core::{ApiJson, ApiQuery, AppError, AppState, require_staff};
use crate::dtos::{
    AttendanceDTO, AttendanceListQuery, CreateAttendanceDTO, CreateAttendanceRequestDTO,
};
use crate::entities::{Attendance, DemandStatus, Role, User};
use crate::repositories::{AttendanceFilter, Create, Delete, Read};
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Docenti e coordinatori vedono tutto, lo studente i propri, il cliente quelli delle proprie demand
async fn ensure_can_view(
    state: &AppState,
    user: &User,
    attendance: &Attendance,
) -> Result<(), AppError> {
    let allowed = match user.role {
        Role::Teacher | Role::Coordinator => true,
        Role::Student => attendance.attendant_id == user.user_id,
        Role::Client => state
            .demands
            .read(&attendance.demand_id)
            .await?
            .is_some_and(|d| d.client_id == user.user_id),
    };
    if !allowed {
        warn!("User {} cannot access attendance {}", user.user_id, attendance.attendance_id);
        return Err(AppError::forbidden("You cannot access this attendance"));
    }
    Ok(())
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, demand_id = %body.demand_id))]
pub async fn create_attendance(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ApiJson(body): ApiJson<CreateAttendanceRequestDTO>,
) -> Result<(StatusCode, Json<AttendanceDTO>), AppError> {
    debug!("Logging attendance");
    // 1. Solo il personale registra sessioni; validare descrizione e durata
    // 2. La demand deve esistere (NOT_FOUND) e non essere chiusa (CONFLICT)
    // 3. Salvare la sessione, con data odierna se non indicata
    // 4. Una demand Pending passa a InProgress
    require_staff(&current_user)?;
    body.validate()?;

    let demand = state
        .demands
        .read(&body.demand_id)
        .await?
        .ok_or_else(|| AppError::not_found("Demand not found"))?;

    if demand.status.is_closed() {
        warn!("Attendance on closed demand {}", demand.demand_id);
        return Err(AppError::conflict("Demand is already closed"));
    }

    let attendance = state
        .attendances
        .create(&CreateAttendanceDTO {
            demand_id: demand.demand_id,
            attendant_id: current_user.user_id,
            description: body.description.trim().to_string(),
            duration_minutes: body.duration_minutes,
            attended_at: body.attended_at.unwrap_or_else(Utc::now),
        })
        .await?;

    if demand.status == DemandStatus::Pending {
        // se un'altra richiesta ha già cambiato stato non c'è nulla da fare
        let moved = state
            .demands
            .transition_status(&demand.demand_id, DemandStatus::Pending, DemandStatus::InProgress)
            .await?;
        if moved.is_some() {
            info!("Demand {} moved to InProgress", demand.protocol);
        }
    }

    info!("Attendance {} logged", attendance.attendance_id);
    Ok((StatusCode::CREATED, Json(AttendanceDTO::from(attendance))))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_attendances(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ApiQuery(params): ApiQuery<AttendanceListQuery>,
) -> Result<Json<Vec<AttendanceDTO>>, AppError> {
    // 1. Lo studente vede solo le proprie sessioni
    // 2. Il cliente deve indicare una propria demand_id
    // 3. Docenti e coordinatori filtrano liberamente
    let mut filter = AttendanceFilter {
        demand_id: params.demand_id,
        attendant_id: params.attendant_id,
        ..Default::default()
    };

    match current_user.role {
        Role::Teacher | Role::Coordinator => {}
        Role::Student => filter.attendant_id = Some(current_user.user_id),
        Role::Client => {
            let demand_id = params
                .demand_id
                .ok_or_else(|| AppError::bad_request("demand_id is required"))?;
            let demand = state
                .demands
                .read(&demand_id)
                .await?
                .ok_or_else(|| AppError::not_found("Demand not found"))?;
            if demand.client_id != current_user.user_id {
                return Err(AppError::forbidden("You cannot access this demand"));
            }
        }
    }

    let attendances = state.attendances.find_many(&filter).await?;
    info!("Found {} attendances", attendances.len());
    Ok(Json(attendances.into_iter().map(AttendanceDTO::from).collect()))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, attendance_id = %attendance_id))]
pub async fn get_attendance(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(attendance_id): Path<i32>,
) -> Result<Json<AttendanceDTO>, AppError> {
    let attendance = state
        .attendances
        .read(&attendance_id)
        .await?
        .ok_or_else(|| AppError::not_found("Attendance not found"))?;
    ensure_can_view(&state, &current_user, &attendance).await?;
    Ok(Json(AttendanceDTO::from(attendance)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, attendance_id = %attendance_id))]
pub async fn delete_attendance(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(attendance_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    // solo il coordinatore o chi ha registrato la sessione
    let attendance = state
        .attendances
        .read(&attendance_id)
        .await?
        .ok_or_else(|| AppError::not_found("Attendance not found"))?;

    if current_user.role != Role::Coordinator && attendance.attendant_id != current_user.user_id {
        warn!("User cannot delete attendance");
        return Err(AppError::forbidden("You cannot delete this attendance"));
    }

    state.attendances.delete(&attendance_id).await?;
    info!("Attendance deleted");
    Ok(StatusCode::NO_CONTENT)
}
