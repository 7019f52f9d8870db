//! Catalog services - Catalogo dei servizi offerti dal NAF

use crate::core::auth::optional_user;
use crate::core::{ApiJson, ApiQuery, AppError, AppState, require_role};
use crate::dtos::{CreateServiceDTO, ServiceDTO, ServiceListQuery, UpdateServiceDTO};
use crate::entities::{Role, User};
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

fn is_coordinator(user: &Option<User>) -> bool {
    user.as_ref().is_some_and(|u| u.role == Role::Coordinator)
}

#[instrument(skip(state, headers))]
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<ServiceListQuery>,
) -> Result<Json<Vec<ServiceDTO>>, AppError> {
    debug!("Listing services");
    // 1. Route pubblica: l'utente è opzionale
    // 2. include_inactive vale solo per un coordinatore autenticato
    // 3. Ritornare i servizi ordinati per nome
    let include_inactive = params.include_inactive && {
        let user = optional_user(&state, &headers).await?;
        is_coordinator(&user)
    };

    let services = state.services.find_many(include_inactive).await?;
    info!("Found {} services", services.len());
    Ok(Json(services.into_iter().map(ServiceDTO::from).collect()))
}

#[instrument(skip(state, headers), fields(service_id = %service_id))]
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(service_id): Path<i32>,
) -> Result<Json<ServiceDTO>, AppError> {
    // 1. Cercare il servizio, NOT_FOUND se assente
    // 2. Un servizio inattivo è visibile solo al coordinatore
    let service = state
        .services
        .read(&service_id)
        .await?
        .ok_or_else(|| AppError::not_found("Service not found"))?;

    if !service.active {
        let user = optional_user(&state, &headers).await?;
        if !is_coordinator(&user) {
            warn!("Inactive service requested");
            return Err(AppError::not_found("Service not found"));
        }
    }

    Ok(Json(ServiceDTO::from(service)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ApiJson(body): ApiJson<CreateServiceDTO>,
) -> Result<(StatusCode, Json<ServiceDTO>), AppError> {
    // 1. Solo il coordinatore, con body valido
    // 2. Nome univoco (senza distinzione di maiuscole), altrimenti CONFLICT
    // 3. Salvare e ritornare 201
    require_role(&current_user, &[Role::Coordinator])?;
    body.validate()?;

    if state.services.find_by_name(&body.name).await?.is_some() {
        warn!("Duplicated service name");
        return Err(AppError::conflict("Service name already exists"));
    }

    let service = state.services.create(&body).await?;
    info!("Service {} created", service.service_id);
    Ok((StatusCode::CREATED, Json(ServiceDTO::from(service))))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, service_id = %service_id))]
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(service_id): Path<i32>,
    ApiJson(body): ApiJson<UpdateServiceDTO>,
) -> Result<Json<ServiceDTO>, AppError> {
    require_role(&current_user, &[Role::Coordinator])?;
    body.validate()?;

    if let Some(ref name) = body.name {
        if let Some(other) = state.services.find_by_name(name).await? {
            if other.service_id != service_id {
                return Err(AppError::conflict("Service name already exists"));
            }
        }
    }

    let service = state.services.update(&service_id, &body).await?;
    info!("Service updated");
    Ok(Json(ServiceDTO::from(service)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, service_id = %service_id))]
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(service_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    // soft delete: le demand esistenti continuano a riferire il servizio
    require_role(&current_user, &[Role::Coordinator])?;
    state.services.delete(&service_id).await?;
    info!("Service deactivated");
    Ok(StatusCode::NO_CONTENT)
}
