//! Notification services - Aggiornamenti pseudo-realtime tramite polling
//!
//! Lo snapshot riassume coda di handoff e conversazioni aperte dell'utente;
//! lo stream SSE lo ricalcola a intervalli e lo invia solo quando cambia.

use crate::core::{AppError, AppState};
use crate::dtos::{ConversationUpdateDTO, NotificationSnapshotDTO};
use crate::entities::{ConversationStatus, User};
use crate::repositories::ConversationFilter;
use axum::{
    Extension,
    extract::{Json, State},
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::Utc;
use futures::future::try_join_all;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, instrument, warn};

/// Nome dell'evento SSE
pub const NOTIFICATION_EVENT: &str = "notification";

/// Calcola lo snapshot delle notifiche per l'utente
pub async fn build_snapshot(
    state: &AppState,
    user: &User,
) -> Result<NotificationSnapshotDTO, AppError> {
    let mut filter = ConversationFilter {
        statuses: ConversationStatus::OPEN.to_vec(),
        ..Default::default()
    };
    let pending_queue = if user.is_staff() {
        filter.attendant_id = Some(user.user_id);
        Some(state.conversations.count_waiting().await?)
    } else {
        filter.client_id = Some(user.user_id);
        None
    };

    let conversations = state.conversations.find_many(&filter).await?;
    // ultimo messaggio di ogni conversazione, query in parallelo
    let updates = try_join_all(conversations.into_iter().map(|conversation| async move {
        let last_message_id = state
            .messages
            .last_message_id(&conversation.conversation_id)
            .await?;
        Ok::<_, sqlx::Error>(ConversationUpdateDTO {
            conversation_id: conversation.conversation_id,
            status: conversation.status,
            last_message_id,
        })
    }))
    .await?;

    Ok(NotificationSnapshotDTO {
        generated_at: Utc::now(),
        pending_queue,
        conversations: updates,
    })
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn get_notifications(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<NotificationSnapshotDTO>, AppError> {
    let snapshot = build_snapshot(&state, &current_user).await?;
    debug!(
        "Snapshot with {} conversations",
        snapshot.conversations.len()
    );
    Ok(Json(snapshot))
}

/// Snapshot emessi al primo tick e poi solo quando il contenuto cambia
pub fn snapshot_stream(
    state: Arc<AppState>,
    user: User,
) -> impl Stream<Item = NotificationSnapshotDTO> + Send + 'static {
    let period = state.notification_interval;
    async_stream::stream! {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last: Option<NotificationSnapshotDTO> = None;

        loop {
            interval.tick().await;
            let snapshot = match build_snapshot(&state, &user).await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    // errore transitorio: si riprova al prossimo tick
                    warn!("Notification snapshot failed: {}", err.message());
                    continue;
                }
            };
            if last.as_ref().is_some_and(|prev| prev.same_content(&snapshot)) {
                continue;
            }
            last = Some(snapshot.clone());
            yield snapshot;
        }
    }
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn notification_stream(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("Opening notification stream");
    let period = state.notification_interval;
    let events = snapshot_stream(state, current_user).filter_map(|snapshot| {
        match Event::default().event(NOTIFICATION_EVENT).json_data(&snapshot) {
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                warn!("Failed to encode notification: {err}");
                None
            }
        }
    });

    Sse::new(events).keep_alive(default_keep_alive(period))
}

/// Commento di keep-alive tra un evento e l'altro
fn default_keep_alive(period: Duration) -> KeepAlive {
    KeepAlive::new()
        .interval(period.max(Duration::from_secs(1)))
        .text("keep-alive")
}
