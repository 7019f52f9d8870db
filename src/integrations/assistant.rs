use crate::core::config::AiConfig;
use crate::entities::{ChatMessage, SenderKind};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Istruzioni di sistema inviate al modello
pub const SYSTEM_INSTRUCTION: &str = "Você é o assistente virtual do NAF (Núcleo de Apoio Contábil e Fiscal) \
de uma universidade. Responda em português, de forma clara e objetiva, dúvidas sobre MEI, \
imposto de renda de pessoa física, CPF, emissão de certidões e demais serviços do NAF. \
Não peça senhas nem dados bancários. Quando não souber responder, sugira falar com um atendente humano.";

/// Risposta usata quando il modello non è disponibile o fallisce
pub const FALLBACK_REPLY: &str = "No momento não consigo responder. \
Você pode tentar novamente ou pedir para falar com um atendente humano.";

/// Risposta fissa dell'assistente senza configurazione AI
pub const CANNED_REPLY: &str = "Olá! Sou o assistente do NAF Contábil. \
Posso ajudar com dúvidas sobre MEI, imposto de renda e CPF. \
Para um atendimento personalizado, peça para falar com um atendente humano.";

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("assistant answered with status {0}")]
    Status(u16),

    #[error("assistant returned an empty answer")]
    EmptyAnswer,
}

#[async_trait]
pub trait ChatAssistant: Send + Sync {
    /// Produce la risposta dato lo storico (in ordine cronologico)
    async fn reply(&self, history: &[ChatMessage]) -> Result<String, AssistantError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

/// Request body for the generative API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Converte lo storico nel formato `contents`; i messaggi di sistema non vengono inviati
fn build_request(history: &[ChatMessage]) -> GenerateRequest {
    let contents = history
        .iter()
        .filter_map(|message| {
            let role = match message.sender_kind {
                SenderKind::Client => "user",
                SenderKind::Assistant | SenderKind::Attendant => "model",
                SenderKind::System => return None,
            };
            Some(Content {
                role: Some(role),
                parts: vec![Part {
                    text: message.content.clone(),
                }],
            })
        })
        .collect();

    GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: SYSTEM_INSTRUCTION.to_string(),
            }],
        },
        contents,
    }
}

fn extract_answer(response: GenerateResponse) -> Option<String> {
    let text = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .map(|part| part.text)
        .collect::<Vec<_>>()
        .join("");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Client per un endpoint generativo in stile Gemini (`generateContent`)
pub struct HttpAssistant {
    client: Client,
    url: String,
    api_key: String,
}

impl HttpAssistant {
    /// `{model}` nell'URL viene sostituito con il modello configurato
    pub fn new(config: AiConfig) -> Result<Self, AssistantError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            url: config.api_url.replace("{model}", &config.model),
            api_key: config.api_key,
        })
    }
}

#[async_trait]
impl ChatAssistant for HttpAssistant {
    #[instrument(skip(self, history), fields(messages = history.len()))]
    async fn reply(&self, history: &[ChatMessage]) -> Result<String, AssistantError> {
        let response = self
            .client
            .post(&self.url)
            .query(&[("key", &self.api_key)])
            .json(&build_request(history))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AssistantError::Status(response.status().as_u16()));
        }

        let body: GenerateResponse = response.json().await?;
        let answer = extract_answer(body).ok_or(AssistantError::EmptyAnswer)?;
        debug!("Assistant answered with {} chars", answer.len());
        Ok(answer)
    }
}

/// Assistente senza modello: risponde sempre con lo stesso testo di orientamento
pub struct CannedAssistant;

#[async_trait]
impl ChatAssistant for CannedAssistant {
    async fn reply(&self, _history: &[ChatMessage]) -> Result<String, AssistantError> {
        Ok(CANNED_REPLY.to_string())
    }
}
