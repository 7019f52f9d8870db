//! User services - Amministrazione degli utenti (riservata al coordinatore)

use crate::core::{ApiJson, ApiQuery, AppError, AppState, require_role};
use crate::dtos::{CreateUserDTO, CreateUserRequestDTO, UpdateUserDTO, UserDTO, UserListQuery};
use crate::entities::{Role, User};
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ApiQuery(params): ApiQuery<UserListQuery>, // /users?role=Student&search=ana
) -> Result<Json<Vec<UserDTO>>, AppError> {
    debug!("Listing users");
    // 1. Solo il coordinatore può elencare gli utenti
    // 2. Filtrare per ruolo e per prefisso di nome o e-mail
    // 3. Ritornare la lista ordinata per nome
    require_role(&current_user, &[Role::Coordinator])?;

    let users = state
        .users
        .find_many(params.role, params.search.as_deref())
        .await?;
    info!("Found {} users", users.len());
    Ok(Json(users.into_iter().map(UserDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, role = ?body.role))]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ApiJson(body): ApiJson<CreateUserRequestDTO>,
) -> Result<(StatusCode, Json<UserDTO>), AppError> {
    // 1. Verificare che l'utente corrente sia coordinatore
    // 2. Validare il body; uno studente deve avere la matricola
    // 3. Rifiutare e-mail o matricola già presenti con CONFLICT
    // 4. Hashare la password e salvare l'utente
    require_role(&current_user, &[Role::Coordinator])?;
    body.validate()?;

    let registration = body
        .registration
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);
    if body.role == Role::Student && registration.is_none() {
        warn!("Student created without registration");
        return Err(AppError::bad_request("Students require a registration number"));
    }

    let email = body.email.trim().to_lowercase();
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::conflict("E-mail already registered"));
    }
    if let Some(ref registration) = registration {
        if state.users.find_by_registration(registration).await?.is_some() {
            return Err(AppError::conflict("Registration already in use"));
        }
    }

    let password_hash = User::hash_password(&body.password, state.bcrypt_cost)?;
    let created = state
        .users
        .create(&CreateUserDTO {
            name: body.name.trim().to_string(),
            email,
            password: password_hash,
            role: body.role,
            registration,
        })
        .await?;

    info!("User {} created with role {:?}", created.user_id, created.role);
    Ok((StatusCode::CREATED, Json(UserDTO::from(created))))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, target_id = %user_id))]
pub async fn get_user_by_id(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(user_id): Path<i32>, // parametro dalla URL /users/{user_id}
) -> Result<Json<UserDTO>, AppError> {
    debug!("Fetching user by ID");
    // 1. Un utente può leggere sé stesso, il coordinatore chiunque
    // 2. Ritornare NOT_FOUND se l'utente non esiste
    if current_user.user_id != user_id {
        require_role(&current_user, &[Role::Coordinator])?;
    }

    let user = state.users.read(&user_id).await?.ok_or_else(|| {
        warn!("User not found");
        AppError::not_found("User not found")
    })?;
    Ok(Json(UserDTO::from(user)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, target_id = %user_id))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(user_id): Path<i32>,
    ApiJson(body): ApiJson<UpdateUserDTO>,
) -> Result<Json<UserDTO>, AppError> {
    // 1. Solo il coordinatore, con body valido
    // 2. Il coordinatore non può disattivare sé stesso
    // 3. Se il ruolo risultante è Student serve una matricola
    // 4. Applicare l'aggiornamento parziale
    require_role(&current_user, &[Role::Coordinator])?;
    body.validate()?;

    if user_id == current_user.user_id && body.active == Some(false) {
        warn!("Coordinator tried to deactivate themself");
        return Err(AppError::conflict("You cannot deactivate yourself"));
    }

    let existing = state
        .users
        .read(&user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let role = body.role.unwrap_or(existing.role);
    let registration = body.registration.as_ref().or(existing.registration.as_ref());
    if role == Role::Student && registration.is_none() {
        return Err(AppError::bad_request("Students require a registration number"));
    }

    if let Some(ref registration) = body.registration {
        if let Some(other) = state.users.find_by_registration(registration).await? {
            if other.user_id != user_id {
                return Err(AppError::conflict("Registration already in use"));
            }
        }
    }

    let updated = state.users.update(&user_id, &body).await?;
    info!("User updated");
    Ok(Json(UserDTO::from(updated)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, target_id = %user_id))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(user_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    // 1. Solo il coordinatore, mai su sé stesso
    // 2. Soft delete: l'utente resta ma non può più autenticarsi
    require_role(&current_user, &[Role::Coordinator])?;

    if user_id == current_user.user_id {
        warn!("Coordinator tried to deactivate themself");
        return Err(AppError::conflict("You cannot deactivate yourself"));
    }

    state.users.delete(&user_id).await?;
    info!("User deactivated");
    Ok(StatusCode::NO_CONTENT)
}
