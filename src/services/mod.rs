//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Questo modulo organizza i service handlers in sotto-moduli separati per una migliore manutenibilità.
//! Ogni modulo gestisce gli endpoint HTTP per una specifica funzionalità.

pub mod attendance;
pub mod auth;
pub mod chat;
pub mod demand;
pub mod notification;
pub mod report;
pub mod service;
pub mod user;

// Re-exports per facilitare l'import
pub use attendance::{create_attendance, delete_attendance, get_attendance, list_attendances};
pub use auth::{
    coordinator_login, current_user, login_user, logout_user, register_user, student_login,
};
pub use chat::{
    accept_handoff, create_conversation, end_conversation, get_conversation, handoff_queue,
    list_conversations, list_messages, reject_handoff, request_handoff, send_message,
    submit_feedback,
};
pub use demand::{
    assign_demand, create_demand, get_demand, get_demand_by_protocol, list_demands,
    update_demand_status,
};
pub use notification::{get_notifications, notification_stream};
pub use report::report_summary;
pub use service::{create_service, delete_service, get_service, list_services, update_service};
pub use user::{create_user, delete_user, get_user_by_id, list_users, update_user};

use crate::AppState;
use crate::integrations::Email;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::{Instrument, error, info_span};

/// Root endpoint - health check
pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, "NAF Contábil API is running")
}

/// Invia un'e-mail in background: un errore viene solo loggato
pub(crate) fn send_email(state: &AppState, email: Email) {
    let mailer = state.mailer.clone();
    let span = info_span!("send_email", to = %email.to);
    tokio::spawn(
        async move {
            if let Err(e) = mailer.send(&email).await {
                error!("Failed to send e-mail: {}", e);
            }
        }
        .instrument(span),
    );
}
