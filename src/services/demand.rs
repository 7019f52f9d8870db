//! Demand services - Richieste (ticket) dei clienti con numero di protocollo

use super::send_email;
use crate::core::{ApiJson, ApiQuery, AppError, AppState, require_role};
use crate::dtos::{
    AssignDemandDTO, CreateDemandDTO, CreateDemandRequestDTO, DemandDTO, DemandListQuery,
    UpdateDemandDTO, UpdateDemandStatusDTO,
};
use crate::entities::{Demand, DemandStatus, Role, User};
use crate::integrations::Email;
use crate::repositories::{Create, DemandFilter, Read, Update};
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

/// Tentativi di generazione del protocollo in caso di collisione
const PROTOCOL_ATTEMPTS: usize = 3;

/// Il cliente vede solo le proprie demand, il personale tutte
pub(crate) fn can_view_demand(user: &User, demand: &Demand) -> bool {
    user.is_staff() || demand.client_id == user.user_id
}

fn ensure_can_view(user: &User, demand: &Demand) -> Result<(), AppError> {
    if !can_view_demand(user, demand) {
        warn!("User {} cannot access demand {}", user.user_id, demand.demand_id);
        return Err(AppError::forbidden("You cannot access this demand"));
    }
    Ok(())
}

/// Filtro di visibilità della lista in base al ruolo
pub(crate) fn visibility_filter(user: &User, params: &DemandListQuery) -> DemandFilter {
    let mut filter = DemandFilter {
        status: params.status,
        service_id: params.service_id,
        ..Default::default()
    };
    match user.role {
        Role::Client => filter.client_id = Some(user.user_id),
        Role::Student => filter.assignee_id = Some(user.user_id),
        Role::Teacher | Role::Coordinator => {}
    }
    filter
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, service_id = %body.service_id))]
pub async fn create_demand(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ApiJson(body): ApiJson<CreateDemandRequestDTO>,
) -> Result<(StatusCode, Json<DemandDTO>), AppError> {
    debug!("Creating demand");
    // 1. Validare la descrizione (non vuota, massimo 5000 caratteri)
    // 2. Il servizio deve esistere ed essere attivo, altrimenti NOT_FOUND
    // 3. Generare il protocollo NAF<data>-<hex> e salvare la demand in stato Pending
    // 4. Inviare l'e-mail di conferma al cliente senza bloccare la risposta
    body.validate()?;

    let service = state
        .services
        .read(&body.service_id)
        .await?
        .filter(|s| s.active)
        .ok_or_else(|| {
            warn!("Demand for a missing or inactive service");
            AppError::not_found("Service not found")
        })?;

    let mut attempt = 0;
    let demand = loop {
        attempt += 1;
        let now = Utc::now();
        let data = CreateDemandDTO {
            protocol: Demand::generate_protocol(now),
            client_id: current_user.user_id,
            service_id: service.service_id,
            description: body.description.trim().to_string(),
            created_at: now,
        };
        match state.demands.create(&data).await {
            Ok(demand) => break demand,
            Err(sqlx::Error::Database(db))
                if db.is_unique_violation() && attempt < PROTOCOL_ATTEMPTS =>
            {
                warn!("Protocol collision, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    };

    info!("Demand {} created", demand.protocol);
    send_email(
        &state,
        Email::demand_created(&current_user, &demand, &service),
    );
    Ok((StatusCode::CREATED, Json(DemandDTO::from(demand))))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_demands(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ApiQuery(params): ApiQuery<DemandListQuery>,
) -> Result<Json<Vec<DemandDTO>>, AppError> {
    // 1. Costruire il filtro di visibilità (cliente: proprie, studente: assegnate, altri: tutte)
    // 2. Ritornare la lista dalla più recente
    let filter = visibility_filter(&current_user, &params);
    let demands = state.demands.find_many(&filter).await?;
    info!("Found {} demands", demands.len());
    Ok(Json(demands.into_iter().map(DemandDTO::from).collect()))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, demand_id = %demand_id))]
pub async fn get_demand(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(demand_id): Path<i32>,
) -> Result<Json<DemandDTO>, AppError> {
    let demand = state
        .demands
        .read(&demand_id)
        .await?
        .ok_or_else(|| AppError::not_found("Demand not found"))?;
    ensure_can_view(&current_user, &demand)?;
    Ok(Json(DemandDTO::from(demand)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, protocol = %protocol))]
pub async fn get_demand_by_protocol(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(protocol): Path<String>,
) -> Result<Json<DemandDTO>, AppError> {
    let demand = state
        .demands
        .find_by_protocol(protocol.trim())
        .await?
        .ok_or_else(|| AppError::not_found("Demand not found"))?;
    ensure_can_view(&current_user, &demand)?;
    Ok(Json(DemandDTO::from(demand)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, demand_id = %demand_id, status = ?body.status))]
pub async fn update_demand_status(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(demand_id): Path<i32>,
    ApiJson(body): ApiJson<UpdateDemandStatusDTO>,
) -> Result<Json<DemandDTO>, AppError> {
    // 1. Recuperare la demand, NOT_FOUND se assente
    // 2. Il cliente proprietario può solo cancellare una demand Pending; altri clienti FORBIDDEN
    // 3. Verificare che la transizione sia legale, altrimenti CONFLICT
    // 4. Applicare la transizione con compare-and-set sullo stato letto
    // 5. Avvisare il cliente via e-mail
    let demand = state
        .demands
        .read(&demand_id)
        .await?
        .ok_or_else(|| AppError::not_found("Demand not found"))?;

    if !current_user.is_staff() {
        if demand.client_id != current_user.user_id {
            warn!("Client tried to change a demand they do not own");
            return Err(AppError::forbidden("You cannot access this demand"));
        }
        if body.status != DemandStatus::Cancelled {
            return Err(AppError::forbidden("Clients can only cancel their demands"));
        }
        if demand.status != DemandStatus::Pending {
            return Err(AppError::conflict("Only pending demands can be cancelled"));
        }
    }

    if !demand.status.can_transition_to(body.status) {
        warn!("Illegal transition {} -> {}", demand.status, body.status);
        return Err(AppError::conflict("Illegal status transition").with_details(format!(
            "{} -> {}",
            demand.status, body.status
        )));
    }

    let previous = demand.status;
    let updated = state
        .demands
        .transition_status(&demand_id, previous, body.status)
        .await?
        .ok_or_else(|| {
            warn!("Demand status changed concurrently");
            AppError::conflict("Demand status changed meanwhile")
        })?;

    info!("Demand {} moved to {}", updated.protocol, updated.status);
    match state.users.read(&updated.client_id).await {
        Ok(Some(client)) => send_email(
            &state,
            Email::demand_status_changed(&client, &updated, previous),
        ),
        Ok(None) => warn!("Client of demand {} not found", updated.demand_id),
        Err(e) => error!("Failed to load client for status e-mail: {:?}", e),
    }
    Ok(Json(DemandDTO::from(updated)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, demand_id = %demand_id, assignee_id = %body.assignee_id))]
pub async fn assign_demand(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(demand_id): Path<i32>,
    ApiJson(body): ApiJson<AssignDemandDTO>,
) -> Result<Json<DemandDTO>, AppError> {
    // 1. Solo docenti e coordinatori assegnano le demand
    // 2. L'assegnatario deve essere un membro del personale attivo, altrimenti BAD_REQUEST
    // 3. Una demand chiusa non si riassegna
    require_role(&current_user, &[Role::Teacher, Role::Coordinator])?;

    let demand = state
        .demands
        .read(&demand_id)
        .await?
        .ok_or_else(|| AppError::not_found("Demand not found"))?;

    let assignee = state.users.read(&body.assignee_id).await?;
    if !assignee.is_some_and(|u| u.active && u.is_staff()) {
        warn!("Invalid assignee");
        return Err(AppError::bad_request("Assignee must be an active staff member"));
    }

    if demand.status.is_closed() {
        return Err(AppError::conflict("Demand is already closed"));
    }

    let updated = state
        .demands
        .update(
            &demand_id,
            &UpdateDemandDTO {
                assignee_id: Some(body.assignee_id),
            },
        )
        .await?;
    info!("Demand assigned");
    Ok(Json(DemandDTO::from(updated)))
}
