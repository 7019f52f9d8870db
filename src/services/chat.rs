//! Chat services - Chat di supporto con assistente AI e passaggio a un operatore umano
//!
//! Ogni conversazione nasce in stato `Bot`. Il cliente può chiedere un
//! operatore (`WaitingHuman`), un membro del personale la prende in carico
//! (`Active`) o la rimanda all'assistente (`Bot`); da qualsiasi stato aperto
//! si può chiudere (`Ended`) e infine lasciare una valutazione, una sola volta.
//! Le transizioni sono compare-and-set nel repository: se due operatori
//! accettano la stessa conversazione, uno solo vince.

use crate::core::{ApiJson, ApiQuery, AppError, AppState, require_staff};
use crate::dtos::{
    ChatMessageDTO, ConversationDTO, ConversationListQuery, CreateChatMessageDTO,
    CreateConversationDTO, CreateConversationRequestDTO, FeedbackDTO, MessagesQuery,
    RejectHandoffDTO, SendMessageDTO,
};
use crate::entities::{ChatMessage, Conversation, ConversationStatus, Role, SenderKind, User};
use crate::integrations::assistant::FALLBACK_REPLY;
use crate::repositories::{ConversationFilter, ConversationTransition, Create, Read};
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

/// Messaggi di storico passati all'assistente
const ASSISTANT_HISTORY: i64 = 20;
const DEFAULT_MESSAGES_LIMIT: i64 = 100;
const MAX_MESSAGES_LIMIT: i64 = 200;
const MAX_MESSAGE_CHARS: usize = 5000;

const GREETING: &str = "Olá! Sou o assistente virtual do NAF Contábil. Como posso ajudar? \
Se preferir, você pode pedir para falar com um atendente.";

/// Chi può leggere una conversazione: i partecipanti, il personale mentre è in coda, il coordinatore
pub(crate) fn can_view_conversation(user: &User, conversation: &Conversation) -> bool {
    conversation.is_participant(user.user_id)
        || (user.is_staff() && conversation.status == ConversationStatus::WaitingHuman)
        || user.role == Role::Coordinator
}

/// Tipo di mittente per un nuovo messaggio, in base allo stato e a chi scrive
pub(crate) fn sender_kind_for(
    user: &User,
    conversation: &Conversation,
) -> Result<SenderKind, AppError> {
    let is_owner = conversation.client_id == user.user_id;
    match conversation.status {
        ConversationStatus::Ended => Err(AppError::conflict("Conversation has ended")),
        ConversationStatus::Bot | ConversationStatus::WaitingHuman if is_owner => {
            Ok(SenderKind::Client)
        }
        ConversationStatus::Active if is_owner => Ok(SenderKind::Client),
        ConversationStatus::Active if conversation.attendant_id == Some(user.user_id) => {
            Ok(SenderKind::Attendant)
        }
        _ => Err(AppError::forbidden("You cannot write in this conversation")),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

async fn load_conversation(state: &AppState, id: i32) -> Result<Conversation, AppError> {
    state
        .conversations
        .read(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation not found"))
}

async fn load_visible(
    state: &AppState,
    user: &User,
    id: i32,
) -> Result<Conversation, AppError> {
    let conversation = load_conversation(state, id).await?;
    if !can_view_conversation(user, &conversation) {
        warn!("User {} cannot access conversation {}", user.user_id, id);
        return Err(AppError::forbidden("You cannot access this conversation"));
    }
    Ok(conversation)
}

/// Salva un messaggio e aggiorna `updated_at` della conversazione
async fn store_message(
    state: &AppState,
    conversation_id: i32,
    sender_id: Option<i32>,
    sender_kind: SenderKind,
    content: String,
) -> Result<ChatMessage, AppError> {
    let message = state
        .messages
        .create(&CreateChatMessageDTO {
            conversation_id,
            sender_id,
            sender_kind,
            content,
        })
        .await?;
    state
        .conversations
        .touch(&conversation_id, message.created_at)
        .await?;
    Ok(message)
}

async fn system_message(
    state: &AppState,
    conversation_id: i32,
    content: String,
) -> Result<ChatMessage, AppError> {
    store_message(state, conversation_id, None, SenderKind::System, content).await
}

/// Applica una transizione; `None` dal repository significa che lo stato era già cambiato
async fn apply_transition(
    state: &AppState,
    conversation_id: i32,
    transition: ConversationTransition,
    conflict: &'static str,
) -> Result<Conversation, AppError> {
    state
        .conversations
        .transition(&conversation_id, &transition)
        .await?
        .ok_or_else(|| {
            warn!("Transition to {:?} rejected", transition.to);
            AppError::conflict(conflict)
        })
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ApiJson(body): ApiJson<CreateConversationRequestDTO>,
) -> Result<(StatusCode, Json<ConversationDTO>), AppError> {
    debug!("Opening conversation");
    // 1. Validare l'oggetto opzionale
    // 2. Creare la conversazione in stato Bot con l'utente corrente come cliente
    // 3. Salvare il messaggio di benvenuto dell'assistente
    body.validate()?;

    let subject = body
        .subject
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let conversation = state
        .conversations
        .create(&CreateConversationDTO {
            client_id: current_user.user_id,
            subject,
        })
        .await?;
    system_message(&state, conversation.conversation_id, GREETING.to_string()).await?;

    let conversation = load_conversation(&state, conversation.conversation_id).await?;
    info!("Conversation {} opened", conversation.conversation_id);
    Ok((StatusCode::CREATED, Json(ConversationDTO::from(conversation))))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ApiQuery(params): ApiQuery<ConversationListQuery>,
) -> Result<Json<Vec<ConversationDTO>>, AppError> {
    // il cliente vede le proprie conversazioni, il personale quelle che segue
    let mut filter = ConversationFilter {
        statuses: params.status.into_iter().collect(),
        ..Default::default()
    };
    if current_user.is_staff() {
        filter.attendant_id = Some(current_user.user_id);
    } else {
        filter.client_id = Some(current_user.user_id);
    }

    let conversations = state.conversations.find_many(&filter).await?;
    info!("Found {} conversations", conversations.len());
    Ok(Json(
        conversations.into_iter().map(ConversationDTO::from).collect(),
    ))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, conversation_id = %conversation_id))]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(conversation_id): Path<i32>,
) -> Result<Json<ConversationDTO>, AppError> {
    let conversation = load_visible(&state, &current_user, conversation_id).await?;
    Ok(Json(ConversationDTO::from(conversation)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, conversation_id = %conversation_id))]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(conversation_id): Path<i32>,
    ApiQuery(params): ApiQuery<MessagesQuery>, // ?after_id=42&limit=50
) -> Result<Json<Vec<ChatMessageDTO>>, AppError> {
    // 1. Verificare l'accesso alla conversazione
    // 2. Limite di default 100, massimo 200
    // 3. Ritornare i messaggi successivi ad after_id in ordine crescente
    load_visible(&state, &current_user, conversation_id).await?;

    let limit = params
        .limit
        .unwrap_or(DEFAULT_MESSAGES_LIMIT)
        .clamp(1, MAX_MESSAGES_LIMIT);
    let messages = state
        .messages
        .find_after(&conversation_id, params.after_id, limit)
        .await?;
    debug!("Returning {} messages", messages.len());
    Ok(Json(messages.into_iter().map(ChatMessageDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, conversation_id = %conversation_id))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(conversation_id): Path<i32>,
    ApiJson(body): ApiJson<SendMessageDTO>,
) -> Result<(StatusCode, Json<Vec<ChatMessageDTO>>), AppError> {
    // 1. Validare il contenuto (1..=5000 caratteri, non vuoto)
    // 2. Determinare il mittente dallo stato: Ended è CONFLICT, chi non può scrivere FORBIDDEN
    // 3. Salvare il messaggio
    // 4. In stato Bot chiedere la risposta all'assistente con gli ultimi 20 messaggi;
    //    se l'assistente fallisce si salva una risposta di ripiego
    // 5. Ritornare tutti i messaggi salvati
    body.validate()?;
    let content = body.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::bad_request("Message content must not be blank"));
    }

    let conversation = load_visible(&state, &current_user, conversation_id).await?;
    let sender_kind = sender_kind_for(&current_user, &conversation)?;

    let message = store_message(
        &state,
        conversation_id,
        Some(current_user.user_id),
        sender_kind,
        content,
    )
    .await?;
    let mut stored = vec![message];

    if conversation.status == ConversationStatus::Bot {
        let history = state
            .messages
            .find_recent(&conversation_id, ASSISTANT_HISTORY)
            .await?;
        let reply = match state.assistant.reply(&history).await {
            Ok(reply) => truncate_chars(&reply, MAX_MESSAGE_CHARS),
            Err(e) => {
                error!("Assistant failed: {}", e);
                FALLBACK_REPLY.to_string()
            }
        };
        let answer =
            store_message(&state, conversation_id, None, SenderKind::Assistant, reply).await?;
        stored.push(answer);
    }

    info!("{} messages stored", stored.len());
    Ok((
        StatusCode::CREATED,
        Json(stored.into_iter().map(ChatMessageDTO::from).collect()),
    ))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, conversation_id = %conversation_id))]
pub async fn request_handoff(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(conversation_id): Path<i32>,
) -> Result<Json<ConversationDTO>, AppError> {
    // 1. Solo il cliente della conversazione
    // 2. Bot -> WaitingHuman, la conversazione entra in coda
    let conversation = load_conversation(&state, conversation_id).await?;
    if conversation.client_id != current_user.user_id {
        return Err(AppError::forbidden("Only the client can request an attendant"));
    }

    apply_transition(
        &state,
        conversation_id,
        ConversationTransition::new(&[ConversationStatus::Bot], ConversationStatus::WaitingHuman),
        "Handoff is only possible while talking to the assistant",
    )
    .await?;
    system_message(
        &state,
        conversation_id,
        "O cliente solicitou atendimento humano. Aguarde, um atendente assumirá a conversa em breve."
            .to_string(),
    )
    .await?;

    info!("Handoff requested");
    let conversation = load_conversation(&state, conversation_id).await?;
    Ok(Json(ConversationDTO::from(conversation)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn handoff_queue(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<ConversationDTO>>, AppError> {
    // coda dei clienti in attesa, la richiesta più vecchia per prima
    require_staff(&current_user)?;
    let waiting = state.conversations.find_waiting().await?;
    debug!("{} conversations waiting", waiting.len());
    Ok(Json(waiting.into_iter().map(ConversationDTO::from).collect()))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, conversation_id = %conversation_id))]
pub async fn accept_handoff(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(conversation_id): Path<i32>,
) -> Result<Json<ConversationDTO>, AppError> {
    // 1. Solo il personale
    // 2. WaitingHuman -> Active con compare-and-set: chi arriva secondo riceve CONFLICT
    // 3. Messaggio di sistema con il nome dell'operatore
    require_staff(&current_user)?;
    load_conversation(&state, conversation_id).await?;

    let transition =
        ConversationTransition::new(&[ConversationStatus::WaitingHuman], ConversationStatus::Active)
            .with_attendant(current_user.user_id);
    apply_transition(
        &state,
        conversation_id,
        transition,
        "Conversation is not waiting for an attendant",
    )
    .await?;
    system_message(
        &state,
        conversation_id,
        format!("{} assumiu o atendimento.", current_user.name),
    )
    .await?;

    info!("Handoff accepted");
    let conversation = load_conversation(&state, conversation_id).await?;
    Ok(Json(ConversationDTO::from(conversation)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, conversation_id = %conversation_id))]
pub async fn reject_handoff(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(conversation_id): Path<i32>,
    body: Option<ApiJson<RejectHandoffDTO>>,
) -> Result<Json<ConversationDTO>, AppError> {
    // 1. Solo il personale, motivo opzionale (anche senza body)
    // 2. WaitingHuman -> Bot, la conversazione torna all'assistente
    require_staff(&current_user)?;
    let body = body.map(|ApiJson(body)| body).unwrap_or_default();
    body.validate()?;
    load_conversation(&state, conversation_id).await?;

    apply_transition(
        &state,
        conversation_id,
        ConversationTransition::new(&[ConversationStatus::WaitingHuman], ConversationStatus::Bot),
        "Conversation is not waiting for an attendant",
    )
    .await?;

    let reason = body
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let text = match reason {
        Some(reason) => format!(
            "No momento nenhum atendente pode assumir a conversa ({reason}). O assistente virtual continua disponível."
        ),
        None => "No momento nenhum atendente pode assumir a conversa. O assistente virtual continua disponível."
            .to_string(),
    };
    system_message(&state, conversation_id, text).await?;

    info!("Handoff rejected");
    let conversation = load_conversation(&state, conversation_id).await?;
    Ok(Json(ConversationDTO::from(conversation)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, conversation_id = %conversation_id))]
pub async fn end_conversation(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(conversation_id): Path<i32>,
) -> Result<Json<ConversationDTO>, AppError> {
    // cliente, operatore assegnato o coordinatore; da qualsiasi stato aperto
    let conversation = load_conversation(&state, conversation_id).await?;
    if !conversation.is_participant(current_user.user_id)
        && current_user.role != Role::Coordinator
    {
        return Err(AppError::forbidden("You cannot end this conversation"));
    }

    apply_transition(
        &state,
        conversation_id,
        ConversationTransition::new(&ConversationStatus::OPEN, ConversationStatus::Ended),
        "Conversation has already ended",
    )
    .await?;
    system_message(
        &state,
        conversation_id,
        format!("Conversa encerrada por {}.", current_user.name),
    )
    .await?;

    info!("Conversation ended");
    let conversation = load_conversation(&state, conversation_id).await?;
    Ok(Json(ConversationDTO::from(conversation)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, conversation_id = %conversation_id, rating = %body.rating))]
pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(conversation_id): Path<i32>,
    ApiJson(body): ApiJson<FeedbackDTO>,
) -> Result<Json<ConversationDTO>, AppError> {
    // 1. Solo il cliente, rating 1..=5
    // 2. Solo a conversazione chiusa e una sola volta, altrimenti CONFLICT
    body.validate()?;
    let conversation = load_conversation(&state, conversation_id).await?;
    if conversation.client_id != current_user.user_id {
        return Err(AppError::forbidden("Only the client can rate the conversation"));
    }
    if conversation.status != ConversationStatus::Ended {
        return Err(AppError::conflict("Conversation has not ended yet"));
    }

    let comment = body
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let rated = state
        .conversations
        .set_feedback(&conversation_id, body.rating, comment)
        .await?
        .ok_or_else(|| {
            warn!("Feedback already submitted");
            AppError::conflict("Feedback already submitted")
        })?;

    info!("Feedback stored");
    Ok(Json(ConversationDTO::from(rated)))
}
