#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use naf_contabil::core::{AppState, encode_jwt};
use naf_contabil::dtos::{CreateServiceDTO, CreateUserDTO};
use naf_contabil::entities::{ChatMessage, Role, Service, User};
use naf_contabil::integrations::{AssistantError, ChatAssistant, Email, MailError, Mailer};
use naf_contabil::repositories::Create;
use std::sync::{Arc, Mutex};

pub const JWT_SECRET: &str = "segredo-dos-testes-de-integracao";

/// Password usata da tutti gli utenti creati con `seed_user`
pub const PASSWORD: &str = "Senha12345";

/// Costo bcrypt minimo per non rallentare i test
pub const TEST_BCRYPT_COST: u32 = 4;

/// Crea un AppState in memoria per i test
///
/// # Returns
/// Arc<AppState> configurato con il JWT secret di test e costo bcrypt minimo
pub fn create_test_state() -> Arc<AppState> {
    Arc::new(AppState::in_memory(JWT_SECRET.to_string()).with_bcrypt_cost(TEST_BCRYPT_COST))
}

/// Come `create_test_state`, ma con mailer e assistente sostituiti
pub fn create_test_state_with(
    mailer: Arc<dyn Mailer>,
    assistant: Arc<dyn ChatAssistant>,
) -> Arc<AppState> {
    Arc::new(
        AppState::in_memory(JWT_SECRET.to_string())
            .with_bcrypt_cost(TEST_BCRYPT_COST)
            .with_mailer(mailer)
            .with_assistant(assistant),
    )
}

/// Crea un TestServer per i test
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = naf_contabil::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Inserisce un utente attivo con password `PASSWORD`
pub async fn seed_user(state: &AppState, name: &str, email: &str, role: Role) -> User {
    // matricola derivata dall'e-mail, così resta univoca
    let registration = (role == Role::Student).then(|| {
        let local: String = email
            .split('@')
            .next()
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        format!("RA{local}")
    });
    seed_user_with_registration(state, name, email, role, registration).await
}

pub async fn seed_user_with_registration(
    state: &AppState,
    name: &str,
    email: &str,
    role: Role,
    registration: Option<String>,
) -> User {
    let password = User::hash_password(PASSWORD, TEST_BCRYPT_COST).expect("hash");
    state
        .users
        .create(&CreateUserDTO {
            name: name.to_string(),
            email: email.to_string(),
            password,
            role,
            registration,
        })
        .await
        .expect("Failed to seed user")
}

pub async fn seed_service(state: &AppState, name: &str) -> Service {
    state
        .services
        .create(&CreateServiceDTO {
            name: name.to_string(),
            description: format!("Atendimento de {name}"),
            category: Some("Pessoa física".to_string()),
        })
        .await
        .expect("Failed to seed service")
}

/// Genera un JWT token per testing, valido per 24 ore
pub fn create_test_jwt(user: &User) -> String {
    encode_jwt(user, JWT_SECRET).expect("Failed to create JWT token")
}

/// Mailer che conserva le e-mail inviate
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Assistente che ripete l'ultimo messaggio del cliente e conta lo storico ricevuto
pub struct EchoAssistant;

#[async_trait]
impl ChatAssistant for EchoAssistant {
    async fn reply(&self, history: &[ChatMessage]) -> Result<String, AssistantError> {
        let last = history.last().map(|m| m.content.as_str()).unwrap_or_default();
        Ok(format!("eco ({}): {}", history.len(), last))
    }
}

/// Assistente sempre in errore
pub struct FailingAssistant;

#[async_trait]
impl ChatAssistant for FailingAssistant {
    async fn reply(&self, _history: &[ChatMessage]) -> Result<String, AssistantError> {
        Err(AssistantError::EmptyAnswer)
    }
}

/// Attende che i task in background (invio e-mail) abbiano girato
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
}
