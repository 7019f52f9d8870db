//! NAF Contábil server library - espone i moduli principali per i test

pub mod core;
pub mod dtos;
pub mod entities;
pub mod integrations;
pub mod repositories;
pub mod services;

// Re-export dei tipi principali per facilitare l'import
pub use core::{AppError, AppState, auth, config};
pub use services::root;

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use std::sync::Arc;

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .nest("/auth", configure_auth_routes(state.clone()))
        .nest("/users", configure_user_routes(state.clone()))
        .nest("/services", configure_service_routes(state.clone()))
        .nest("/demands", configure_demand_routes(state.clone()))
        .nest("/attendances", configure_attendance_routes(state.clone()))
        .nest("/reports", configure_report_routes(state.clone()))
        .nest("/chat", configure_chat_routes(state.clone()))
        .nest("/notifications", configure_notification_routes(state.clone()));

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .with_state(state)
}

/// Router con il middleware di autenticazione applicato a tutte le sue route
fn authenticated(state: Arc<AppState>, router: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    router.route_layer(middleware::from_fn_with_state(
        state,
        authentication_middleware,
    ))
}

/// Configura le routes di autenticazione (login, register, sessione)
fn configure_auth_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use services::*;
    let public_routes = Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/student-login", post(student_login))
        .route("/coordinator-login", post(coordinator_login))
        .route("/logout", post(logout_user));

    let session_routes = authenticated(state, Router::new().route("/me", get(current_user)));

    public_routes.merge(session_routes)
}

/// Configura le routes per l'amministrazione degli utenti
fn configure_user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use services::*;
    authenticated(
        state,
        Router::new()
            .route("/", get(list_users).post(create_user))
            .route(
                "/{user_id}",
                get(get_user_by_id).patch(update_user).delete(delete_user),
            ),
    )
}

/// Configura le routes del catalogo: lettura pubblica, scrittura autenticata
fn configure_service_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use services::*;
    let public_routes = Router::new()
        .route("/", get(list_services))
        .route("/{service_id}", get(get_service));

    let admin_routes = authenticated(
        state,
        Router::new()
            .route("/", post(create_service))
            .route(
                "/{service_id}",
                patch(update_service).delete(delete_service),
            ),
    );

    public_routes.merge(admin_routes)
}

/// Configura le routes delle demand
fn configure_demand_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use services::*;
    authenticated(
        state,
        Router::new()
            .route("/", get(list_demands).post(create_demand))
            .route("/protocol/{protocol}", get(get_demand_by_protocol))
            .route("/{demand_id}", get(get_demand))
            .route("/{demand_id}/status", patch(update_demand_status))
            .route("/{demand_id}/assign", patch(assign_demand)),
    )
}

/// Configura le routes delle attendance
fn configure_attendance_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use services::*;
    authenticated(
        state,
        Router::new()
            .route("/", get(list_attendances).post(create_attendance))
            .route(
                "/{attendance_id}",
                get(get_attendance).delete(delete_attendance),
            ),
    )
}

/// Configura le routes dei report
fn configure_report_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use services::*;
    authenticated(state, Router::new().route("/summary", get(report_summary)))
}

/// Configura le routes della chat di supporto e del workflow di handoff
fn configure_chat_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use services::*;
    authenticated(
        state,
        Router::new()
            .route(
                "/conversations",
                get(list_conversations).post(create_conversation),
            )
            .route("/conversations/{conversation_id}", get(get_conversation))
            .route(
                "/conversations/{conversation_id}/messages",
                get(list_messages).post(send_message),
            )
            .route(
                "/conversations/{conversation_id}/handoff",
                post(request_handoff),
            )
            .route(
                "/conversations/{conversation_id}/accept",
                post(accept_handoff),
            )
            .route(
                "/conversations/{conversation_id}/reject",
                post(reject_handoff),
            )
            .route("/conversations/{conversation_id}/end", post(end_conversation))
            .route(
                "/conversations/{conversation_id}/feedback",
                post(submit_feedback),
            )
            .route("/queue", get(handoff_queue)),
    )
}

/// Configura le routes delle notifiche (snapshot e stream SSE)
fn configure_notification_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use services::*;
    authenticated(
        state,
        Router::new()
            .route("/", get(get_notifications))
            .route("/stream", get(notification_stream)),
    )
}
