//! Auth services - Gestione autenticazione e registrazione utenti

use crate::core::auth::{TOKEN_COOKIE, TOKEN_TTL_HOURS};
use crate::core::{ApiJson, AppError, AppState, encode_jwt};
use crate::dtos::{
    CreateUserDTO, LoginDTO, LoginResponseDTO, RegisterRequestDTO, StudentLoginDTO, UserDTO,
};
use crate::entities::{Role, User};
use crate::repositories::Create;
use axum::{
    Extension,
    extract::{Json, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Costruisce la risposta di login: cookie HttpOnly, header Authorization e body JSON
fn session_response(
    user: User,
    secret: &str,
) -> Result<(StatusCode, HeaderMap, Json<LoginResponseDTO>), AppError> {
    let token = encode_jwt(&user, secret)?;

    let cookie_value = format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        TOKEN_COOKIE,
        token,
        TOKEN_TTL_HOURS * 60 * 60
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie_value)
            .map_err(|_| AppError::internal_server_error("Invalid session cookie"))?,
    );
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| AppError::internal_server_error("Invalid session token"))?,
    );

    Ok((
        StatusCode::OK,
        headers,
        Json(LoginResponseDTO {
            token,
            user: UserDTO::from(user),
        }),
    ))
}

/// Verifica password e stato dell'utente trovato
fn check_credentials(user: Option<User>, password: &str) -> Result<User, AppError> {
    let user = user.ok_or_else(|| {
        warn!("Login attempt for unknown user");
        AppError::unauthorized("Invalid credentials")
    })?;

    if !user.verify_password(password) {
        warn!("Wrong password for user {}", user.user_id);
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    if !user.active {
        warn!("Login attempt for deactivated user {}", user.user_id);
        return Err(AppError::unauthorized("User is deactivated"));
    }

    Ok(user)
}

#[instrument(skip(state, body))]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginDTO>,
) -> Result<(StatusCode, HeaderMap, Json<LoginResponseDTO>), AppError> {
    // 1. Cercare l'utente tramite e-mail (normalizzata in minuscolo dal repository)
    // 2. Verificare password e stato attivo, altrimenti UNAUTHORIZED
    // 3. Generare il token JWT e ritornare cookie, header Authorization e body
    let user = state.users.find_by_email(body.email.trim()).await?;
    let user = check_credentials(user, &body.password)?;

    info!("User {} logged in", user.user_id);
    session_response(user, &state.jwt_secret)
}

#[instrument(skip(state, body))]
pub async fn student_login(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<StudentLoginDTO>,
) -> Result<(StatusCode, HeaderMap, Json<LoginResponseDTO>), AppError> {
    // 1. Cercare l'utente tramite matricola
    // 2. Accettare solo utenti con ruolo Student (gli altri non hanno matricola valida per questo login)
    // 3. Verificare password e stato attivo, poi generare la sessione
    let user = state
        .users
        .find_by_registration(body.registration.trim())
        .await?
        .filter(|user| user.role == Role::Student);
    let user = check_credentials(user, &body.password)?;

    info!("Student {} logged in", user.user_id);
    session_response(user, &state.jwt_secret)
}

#[instrument(skip(state, body))]
pub async fn coordinator_login(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginDTO>,
) -> Result<(StatusCode, HeaderMap, Json<LoginResponseDTO>), AppError> {
    // 1. Stesso flusso del login normale
    // 2. Dopo la verifica delle credenziali, rifiutare con FORBIDDEN chi non è coordinatore
    let user = state.users.find_by_email(body.email.trim()).await?;
    let user = check_credentials(user, &body.password)?;

    if user.role != Role::Coordinator {
        warn!("Non-coordinator {} used the coordinator login", user.user_id);
        return Err(AppError::forbidden("Coordinator access only"));
    }

    info!("Coordinator {} logged in", user.user_id);
    session_response(user, &state.jwt_secret)
}

#[instrument(skip(state, body))]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<RegisterRequestDTO>,
) -> Result<Json<UserDTO>, AppError> {
    // 1. Validare il DTO con validator (nome, formato e-mail, lunghezza password)
    // 2. Controllare se esiste già un utente con la stessa e-mail, altrimenti CONFLICT
    // 3. Generare l'hash della password con il costo configurato
    // 4. Salvare il nuovo utente con ruolo Client
    // 5. Ritornare il DTO dell'utente creato
    body.validate()?;

    let email = body.email.trim().to_lowercase();
    if state.users.find_by_email(&email).await?.is_some() {
        warn!("Registration with an existing e-mail");
        return Err(AppError::conflict("E-mail already registered"));
    }

    let password_hash = User::hash_password(&body.password, state.bcrypt_cost)?;

    let created_user = state
        .users
        .create(&CreateUserDTO {
            name: body.name.trim().to_string(),
            email,
            password: password_hash,
            role: Role::Client,
            registration: None,
        })
        .await?;

    info!("Client {} registered", created_user.user_id);
    Ok(Json(UserDTO::from(created_user)))
}

#[instrument(skip(current_user), fields(user_id = %current_user.user_id))]
pub async fn current_user(Extension(current_user): Extension<User>) -> Json<UserDTO> {
    debug!("Returning current user");
    Json(UserDTO::from(current_user))
}

pub async fn logout_user() -> impl IntoResponse {
    let cookie_value = format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        TOKEN_COOKIE
    );
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie_value)],
        Json(serde_json::json!({ "message": "Logged out" })),
    )
}
