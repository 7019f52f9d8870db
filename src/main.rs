use axum::http::{HeaderValue, Method, header};
use naf_contabil::core::Config;
use naf_contabil::integrations::{
    CannedAssistant, ChatAssistant, HttpAssistant, HttpMailer, LogMailer, Mailer,
};
use naf_contabil::{AppState, create_router};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Inizializza la configurazione
    let config = Config::from_env()?;
    config.print_info();

    let state = match config.database_url {
        Some(ref database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .max_lifetime(Duration::from_secs(config.connection_lifetime_secs))
                .acquire_timeout(Duration::from_secs(5))
                .connect(database_url)
                .await?;
            info!("Connected to PostgreSQL");

            if config.run_migrations {
                sqlx::migrate!("./migrations").run(&pool).await?;
                info!("Migrations applied");
            }
            AppState::new(pool, config.jwt_secret.clone())
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            AppState::in_memory(config.jwt_secret.clone())
        }
    };

    let state = state
        .with_bcrypt_cost(config.bcrypt_cost)
        .with_mailer(build_mailer(&config))
        .with_assistant(build_assistant(&config))
        .with_notification_interval(Duration::from_secs(config.notification_poll_secs));

    let app = create_router(Arc::new(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config)?);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    // Avvia il server
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn build_mailer(config: &Config) -> Arc<dyn Mailer> {
    match config.mail.clone().map(HttpMailer::new) {
        Some(Ok(mailer)) => Arc::new(mailer),
        Some(Err(e)) => {
            error!("Mail client setup failed, e-mails will only be logged: {}", e);
            Arc::new(LogMailer)
        }
        None => Arc::new(LogMailer),
    }
}

fn build_assistant(config: &Config) -> Arc<dyn ChatAssistant> {
    match config.ai.clone().map(HttpAssistant::new) {
        Some(Ok(assistant)) => Arc::new(assistant),
        Some(Err(e)) => {
            error!("Assistant client setup failed, using canned replies: {}", e);
            Arc::new(CannedAssistant)
        }
        None => Arc::new(CannedAssistant),
    }
}

/// Con CORS_ORIGIN si abilitano i cookie per quell'origine, altrimenti CORS permissivo
fn cors_layer(config: &Config) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let Some(ref origin) = config.cors_origin else {
        return Ok(CorsLayer::permissive());
    };
    Ok(CorsLayer::new()
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::AUTHORIZATION]))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
