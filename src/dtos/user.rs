//! User DTOs - Data Transfer Objects per utenti

use super::validation::{REGISTRATION_RE, not_blank};
use crate::entities::{Role, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// struct per gestire io col client, la password non esce mai dal server
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserDTO {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub registration: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDTO {
    fn from(value: User) -> Self {
        Self {
            user_id: value.user_id,
            name: value.name,
            email: value.email,
            role: value.role,
            registration: value.registration,
            active: value.active,
            created_at: value.created_at,
        }
    }
}

/// DTO per creare un nuovo utente nel repository (password già hashata)
#[derive(Debug, Clone)]
pub struct CreateUserDTO {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub registration: Option<String>,
}

/// DTO per aggiornare un utente (solo i campi `Some` vengono modificati)
#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
pub struct UpdateUserDTO {
    #[validate(length(min = 1, max = 120), custom(function = "not_blank"))]
    pub name: Option<String>,
    pub role: Option<Role>,
    #[validate(regex(path = *REGISTRATION_RE, message = "Registration must be 4-32 letters or digits"))]
    pub registration: Option<String>,
    pub active: Option<bool>,
}

/// Body di POST /api/auth/register, crea sempre un cliente
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct RegisterRequestDTO {
    #[validate(length(min = 1, max = 120), custom(function = "not_blank"))]
    pub name: String,
    #[validate(email(message = "Invalid e-mail address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,
}

/// Body di POST /api/users, usato dal coordinatore per creare utenti di qualsiasi ruolo
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateUserRequestDTO {
    #[validate(length(min = 1, max = 120), custom(function = "not_blank"))]
    pub name: String,
    #[validate(email(message = "Invalid e-mail address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,
    pub role: Role,
    #[validate(regex(path = *REGISTRATION_RE, message = "Registration must be 4-32 letters or digits"))]
    pub registration: Option<String>,
}

/// DTO per il login (email e password)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginDTO {
    pub email: String,
    pub password: String,
}

/// DTO per il login degli studenti tramite matricola
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StudentLoginDTO {
    pub registration: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponseDTO {
    pub token: String,
    pub user: UserDTO,
}
