use crate::core::{AppError, AppState};
use crate::entities::{Role, User};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Error, body::Body, extract::Request, http, http::Response, middleware::Next};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Nome del cookie di sessione
pub const TOKEN_COOKIE: &str = "token";

/// Durata del token in ore
pub const TOKEN_TTL_HOURS: i64 = 24;

// struct che codifica il contenuto del token jwt
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
    pub id: i32,
    pub email: String,
    pub role: Role,
}

#[instrument(skip(user, secret), fields(user_id = %user.user_id))]
pub fn encode_jwt(user: &User, secret: &str) -> Result<String, Error> {
    debug!("Encoding JWT token for user");
    let now = Utc::now();
    let expire: chrono::TimeDelta = Duration::hours(TOKEN_TTL_HOURS);
    let exp: usize = (now + expire).timestamp() as usize;
    let iat: usize = now.timestamp() as usize;
    let claim = Claims {
        iat,
        exp,
        id: user.user_id,
        email: user.email.clone(),
        role: user.role,
    };

    encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map(|token| {
        info!("JWT token encoded successfully");
        token
    })
    .map_err(|e| {
        error!("Failed to encode JWT token: {:?}", e);
        Error::new("Error in encoding jwt token")
    })
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(jwt_token: &str, secret: &str) -> Result<TokenData<Claims>, Error> {
    debug!("Decoding JWT token");
    decode::<Claims>(
        jwt_token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| {
        debug!("JWT token decoded successfully for user: {}", data.claims.id);
        data
    })
    .map_err(|e| {
        warn!("Failed to decode JWT token: {:?}", e);
        Error::new("Error in decoding jwt token")
    })
}

/// Estrae il token da `Authorization: Bearer ...` oppure dal cookie `token`
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(http::header::AUTHORIZATION) {
        let value = value.to_str().ok()?;
        let mut parts = value.split_whitespace();
        return match (parts.next(), parts.next()) {
            (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => {
                Some(token.to_string())
            }
            _ => None,
        };
    }

    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}

/// Risolve l'utente della sessione: token valido e utente ancora attivo
pub async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = extract_token(headers).ok_or_else(|| {
        warn!("Missing authentication token");
        AppError::unauthorized("Please add the JWT token to the header")
    })?;

    let token_data = decode_jwt(&token, &state.jwt_secret)
        .map_err(|_| AppError::unauthorized("Unable to decode token"))?;

    // Fetch the user details from the database
    match state.users.read(&token_data.claims.id).await? {
        Some(user) if user.active => {
            debug!("User authenticated: {}", user.user_id);
            Ok(user)
        }
        Some(user) => {
            warn!("Deactivated user tried to authenticate: {}", user.user_id);
            Err(AppError::unauthorized("User is deactivated"))
        }
        None => {
            warn!("User not found in database: {}", token_data.claims.id);
            Err(AppError::unauthorized("You are not an authorized user"))
        }
    }
}

/// Come `resolve_user`, ma per le route pubbliche: nessun token o token non valido = anonimo
pub async fn optional_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<User>, AppError> {
    if extract_token(headers).is_none() {
        return Ok(None);
    }
    // sessione scaduta o non valida: si prosegue come anonimo
    match resolve_user(state, headers).await {
        Ok(user) => Ok(Some(user)),
        Err(err) if err.status() == StatusCode::UNAUTHORIZED => {
            debug!("Ignoring invalid session on public route");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let current_user = resolve_user(&state, req.headers()).await?;
    req.extensions_mut().insert(current_user);
    // l'utente si recupera dagli handler con Extension<User>
    Ok(next.run(req).await)
}

/// Helper function per verificare che un utente abbia uno dei ruoli richiesti
///
/// # Arguments
/// * `user` - L'utente da verificare
/// * `allowed_roles` - Lista di ruoli permessi
///
/// # Returns
/// * `Ok(())` se il ruolo è permesso
/// * `Err(AppError)` se il ruolo non è tra quelli permessi
#[instrument(skip(user), fields(user_id = %user.user_id))]
pub fn require_role(user: &User, allowed_roles: &[Role]) -> Result<(), AppError> {
    if !allowed_roles.contains(&user.role) {
        warn!(
            "User {} has insufficient role {:?}, required one of: {:?}",
            user.user_id, user.role, allowed_roles
        );
        return Err(AppError::forbidden("Insufficient role").with_details(format!(
            "This action requires one of the following roles: {:?}",
            allowed_roles
        )));
    }

    debug!("Role check passed for user {} with role {:?}", user.user_id, user.role);
    Ok(())
}

/// Scorciatoia per le operazioni riservate al personale del NAF
pub fn require_staff(user: &User) -> Result<(), AppError> {
    require_role(user, &Role::STAFF)
}
