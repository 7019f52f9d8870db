//! Integration tests per la chat di supporto e il workflow di handoff
//!
//! Test per:
//! - POST/GET /api/chat/conversations
//! - GET/POST /api/chat/conversations/{id}/messages
//! - POST /api/chat/conversations/{id}/handoff|accept|reject|end|feedback
//! - GET /api/chat/queue

mod common;

#[cfg(test)]
mod chat_tests {
    use super::common::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use naf_contabil::dtos::CreateChatMessageDTO;
    use naf_contabil::entities::{Role, SenderKind};
    use naf_contabil::integrations::assistant::FALLBACK_REPLY;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn echo_state() -> Arc<naf_contabil::AppState> {
        create_test_state_with(Arc::new(RecordingMailer::default()), Arc::new(EchoAssistant))
    }

    async fn open_conversation(server: &TestServer, token: &str) -> i64 {
        let response = server
            .post("/api/chat/conversations")
            .authorization_bearer(token)
            .json(&json!({ "subject": "Dúvida sobre MEI" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["conversation_id"].as_i64().unwrap()
    }

    async fn messages(server: &TestServer, token: &str, id: i64) -> Vec<Value> {
        let response = server
            .get(&format!("/api/chat/conversations/{id}/messages"))
            .authorization_bearer(token)
            .await;
        response.assert_status_ok();
        response.json()
    }

    // ============================================================
    // Conversazione con l'assistente
    // ============================================================

    #[tokio::test]
    async fn test_new_conversation_starts_with_greeting() {
        let state = echo_state();
        let client = seed_user(&state, "Ana", "ana@example.com", Role::Client).await;
        let server = create_test_server(state.clone());
        let token = create_test_jwt(&client);

        let id = open_conversation(&server, &token).await;
        let conversation: Value = server
            .get(&format!("/api/chat/conversations/{id}"))
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(conversation["status"], "Bot");
        assert_eq!(conversation["subject"], "Dúvida sobre MEI");

        let history = messages(&server, &token, id).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["sender_kind"], "System");
    }

    #[tokio::test]
    async fn test_bot_replies_with_history() {
        let state = echo_state();
        let client = seed_user(&state, "Ana", "ana@example.com", Role::Client).await;
        let server = create_test_server(state.clone());
        let token = create_test_jwt(&client);
        let id = open_conversation(&server, &token).await;

        let response = server
            .post(&format!("/api/chat/conversations/{id}/messages"))
            .authorization_bearer(&token)
            .json(&json!({ "content": "  Como abro um MEI?  " }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let stored: Vec<Value> = response.json();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0]["sender_kind"], "Client");
        assert_eq!(stored[0]["content"], "Como abro um MEI?");
        assert_eq!(stored[1]["sender_kind"], "Assistant");
        // saluto più messaggio del cliente
        assert_eq!(stored[1]["content"], "eco (2): Como abro um MEI?");

        let after = stored[0]["message_id"].as_i64().unwrap();
        let newer: Vec<Value> = server
            .get(&format!("/api/chat/conversations/{id}/messages?after_id={after}"))
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0]["sender_kind"], "Assistant");
    }

    #[tokio::test]
    async fn test_assistant_failure_stores_fallback() {
        let state = create_test_state_with(
            Arc::new(RecordingMailer::default()),
            Arc::new(FailingAssistant),
        );
        let client = seed_user(&state, "Ana", "ana@example.com", Role::Client).await;
        let server = create_test_server(state.clone());
        let token = create_test_jwt(&client);
        let id = open_conversation(&server, &token).await;

        let response = server
            .post(&format!("/api/chat/conversations/{id}/messages"))
            .authorization_bearer(&token)
            .json(&json!({ "content": "Olá" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let stored: Vec<Value> = response.json();
        assert_eq!(stored[1]["content"], FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_messages_limit_default_and_bounds() {
        let state = echo_state();
        let client = seed_user(&state, "Ana", "ana@example.com", Role::Client).await;
        let server = create_test_server(state.clone());
        let token = create_test_jwt(&client);
        let id = open_conversation(&server, &token).await;

        // saluto più 240 messaggi del cliente
        for n in 0..240 {
            state
                .messages
                .create(&CreateChatMessageDTO {
                    conversation_id: id as i32,
                    sender_id: Some(client.user_id),
                    sender_kind: SenderKind::Client,
                    content: format!("mensagem {n}"),
                })
                .await
                .unwrap();
        }
        let path = format!("/api/chat/conversations/{id}/messages");

        let default_page = messages(&server, &token, id).await;
        assert_eq!(default_page.len(), 100);
        assert_eq!(default_page[0]["sender_kind"], "System");

        let capped: Vec<Value> = server
            .get(&format!("{path}?limit=1000"))
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(capped.len(), 200);

        let single: Vec<Value> = server
            .get(&format!("{path}?limit=0"))
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(single.len(), 1);

        // la pagina successiva riparte dopo l'ultimo id ricevuto
        let last = capped[199]["message_id"].as_i64().unwrap();
        let rest: Vec<Value> = server
            .get(&format!("{path}?after_id={last}&limit=200"))
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(rest.len(), 41);
        assert_eq!(rest[40]["content"], "mensagem 239");
    }

    #[tokio::test]
    async fn test_message_validation_and_privacy() {
        let state = echo_state();
        let ana = seed_user(&state, "Ana", "ana@example.com", Role::Client).await;
        let rui = seed_user(&state, "Rui", "rui@example.com", Role::Client).await;
        let student = seed_user(&state, "Pedro", "pedro@naf.br", Role::Student).await;
        let server = create_test_server(state.clone());
        let token = create_test_jwt(&ana);
        let id = open_conversation(&server, &token).await;
        let path = format!("/api/chat/conversations/{id}/messages");

        server
            .post(&path)
            .authorization_bearer(&token)
            .json(&json!({ "content": "   " }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .post(&path)
            .authorization_bearer(&token)
            .json(&json!({ "content": "a".repeat(5001) }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .get(&path)
            .authorization_bearer(create_test_jwt(&rui))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        // lo staff non vede le conversazioni con il bot
        server
            .get(&path)
            .authorization_bearer(create_test_jwt(&student))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .get("/api/chat/conversations/999/messages")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    // ============================================================
    // Workflow di handoff
    // ============================================================

    #[tokio::test]
    async fn test_full_handoff_lifecycle() {
        let state = echo_state();
        let client = seed_user(&state, "Ana", "ana@example.com", Role::Client).await;
        let student = seed_user(&state, "Pedro", "pedro@naf.br", Role::Student).await;
        let server = create_test_server(state.clone());
        let client_token = create_test_jwt(&client);
        let staff_token = create_test_jwt(&student);
        let id = open_conversation(&server, &client_token).await;
        let base = format!("/api/chat/conversations/{id}");

        // 1. il cliente chiede un operatore
        let response = server
            .post(&format!("{base}/handoff"))
            .authorization_bearer(&client_token)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "WaitingHuman");
        assert!(!body["handoff_requested_at"].is_null());

        // 2. la conversazione compare in coda
        let queue: Vec<Value> = server
            .get("/api/chat/queue")
            .authorization_bearer(&staff_token)
            .await
            .json();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0]["conversation_id"], id);

        // 3. l'operatore accetta
        let response = server
            .post(&format!("{base}/accept"))
            .authorization_bearer(&staff_token)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "Active");
        assert_eq!(body["attendant_id"], student.user_id);

        // 4. i messaggi non passano più dall'assistente
        let stored: Vec<Value> = server
            .post(&format!("{base}/messages"))
            .authorization_bearer(&staff_token)
            .json(&json!({ "content": "Olá, sou o Pedro" }))
            .await
            .json();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["sender_kind"], "Attendant");

        let stored: Vec<Value> = server
            .post(&format!("{base}/messages"))
            .authorization_bearer(&client_token)
            .json(&json!({ "content": "Obrigada!" }))
            .await
            .json();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["sender_kind"], "Client");

        let mine: Vec<Value> = server
            .get("/api/chat/conversations")
            .authorization_bearer(&staff_token)
            .await
            .json();
        assert_eq!(mine.len(), 1);

        // 5. chiusura e feedback
        let response = server
            .post(&format!("{base}/end"))
            .authorization_bearer(&staff_token)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "Ended");

        server
            .post(&format!("{base}/messages"))
            .authorization_bearer(&client_token)
            .json(&json!({ "content": "Mais uma coisa" }))
            .await
            .assert_status(StatusCode::CONFLICT);

        let response = server
            .post(&format!("{base}/feedback"))
            .authorization_bearer(&client_token)
            .json(&json!({ "rating": 5, "comment": "Excelente" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["rating"], 5);
        assert_eq!(body["feedback"], "Excelente");

        server
            .post(&format!("{base}/feedback"))
            .authorization_bearer(&client_token)
            .json(&json!({ "rating": 1 }))
            .await
            .assert_status(StatusCode::CONFLICT);

        let kinds: Vec<String> = messages(&server, &client_token, id)
            .await
            .iter()
            .map(|m| m["sender_kind"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            kinds,
            vec!["System", "System", "System", "Attendant", "Client", "System"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_accept_has_single_winner() {
        let state = echo_state();
        let client = seed_user(&state, "Ana", "ana@example.com", Role::Client).await;
        let pedro = seed_user(&state, "Pedro", "pedro@naf.br", Role::Student).await;
        let prof = seed_user(&state, "Prof", "prof@naf.br", Role::Teacher).await;
        let server = create_test_server(state.clone());
        let client_token = create_test_jwt(&client);
        let id = open_conversation(&server, &client_token).await;
        let accept = format!("/api/chat/conversations/{id}/accept");

        server
            .post(&format!("/api/chat/conversations/{id}/handoff"))
            .authorization_bearer(&client_token)
            .await
            .assert_status_ok();

        let (first, second) = tokio::join!(
            async {
                server
                    .post(&accept)
                    .authorization_bearer(create_test_jwt(&pedro))
                    .await
            },
            async {
                server
                    .post(&accept)
                    .authorization_bearer(create_test_jwt(&prof))
                    .await
            },
        );
        let mut statuses = vec![first.status_code(), second.status_code()];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

        // nessun altro operatore può scrivere nella conversazione
        let conversation: Value = server
            .get(&format!("/api/chat/conversations/{id}"))
            .authorization_bearer(&client_token)
            .await
            .json();
        let winner = conversation["attendant_id"].as_i64().unwrap() as i32;
        let loser = if winner == pedro.user_id { &prof } else { &pedro };
        server
            .post(&format!("/api/chat/conversations/{id}/messages"))
            .authorization_bearer(create_test_jwt(loser))
            .json(&json!({ "content": "Posso ajudar?" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_reject_without_body_uses_default_message() {
        let state = echo_state();
        let client = seed_user(&state, "Ana", "ana@example.com", Role::Client).await;
        let teacher = seed_user(&state, "Prof", "prof@naf.br", Role::Teacher).await;
        let server = create_test_server(state.clone());
        let client_token = create_test_jwt(&client);
        let id = open_conversation(&server, &client_token).await;
        let base = format!("/api/chat/conversations/{id}");

        server
            .post(&format!("{base}/handoff"))
            .authorization_bearer(&client_token)
            .await
            .assert_status_ok();

        let response = server
            .post(&format!("{base}/reject"))
            .authorization_bearer(create_test_jwt(&teacher))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "Bot");

        let history = messages(&server, &client_token, id).await;
        let last = history.last().unwrap();
        assert_eq!(last["sender_kind"], "System");
        assert!(
            last["content"]
                .as_str()
                .unwrap()
                .starts_with("No momento nenhum atendente pode assumir a conversa.")
        );

        // un body presente deve comunque essere JSON valido
        server
            .post(&format!("{base}/handoff"))
            .authorization_bearer(&client_token)
            .await
            .assert_status_ok();
        server
            .post(&format!("{base}/reject"))
            .authorization_bearer(create_test_jwt(&teacher))
            .text("motivo")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reject_returns_conversation_to_bot() {
        let state = echo_state();
        let client = seed_user(&state, "Ana", "ana@example.com", Role::Client).await;
        let teacher = seed_user(&state, "Prof", "prof@naf.br", Role::Teacher).await;
        let server = create_test_server(state.clone());
        let client_token = create_test_jwt(&client);
        let id = open_conversation(&server, &client_token).await;
        let base = format!("/api/chat/conversations/{id}");

        // rifiuto senza richiesta pendente
        server
            .post(&format!("{base}/reject"))
            .authorization_bearer(create_test_jwt(&teacher))
            .json(&json!({}))
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .post(&format!("{base}/handoff"))
            .authorization_bearer(&client_token)
            .await
            .assert_status_ok();

        // il cliente non può rifiutare la propria richiesta
        server
            .post(&format!("{base}/reject"))
            .authorization_bearer(&client_token)
            .json(&json!({}))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = server
            .post(&format!("{base}/reject"))
            .authorization_bearer(create_test_jwt(&teacher))
            .json(&json!({ "reason": "fora do horário" }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "Bot");

        let history = messages(&server, &client_token, id).await;
        let last = history.last().unwrap();
        assert_eq!(last["sender_kind"], "System");
        assert!(last["content"].as_str().unwrap().contains("fora do horário"));

        // l'assistente riprende a rispondere
        let stored: Vec<Value> = server
            .post(&format!("{base}/messages"))
            .authorization_bearer(&client_token)
            .json(&json!({ "content": "Tudo bem" }))
            .await
            .json();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_handoff_rules() {
        let state = echo_state();
        let ana = seed_user(&state, "Ana", "ana@example.com", Role::Client).await;
        let rui = seed_user(&state, "Rui", "rui@example.com", Role::Client).await;
        let server = create_test_server(state.clone());
        let ana_token = create_test_jwt(&ana);
        let id = open_conversation(&server, &ana_token).await;
        let base = format!("/api/chat/conversations/{id}");

        server
            .post(&format!("{base}/handoff"))
            .authorization_bearer(create_test_jwt(&rui))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .get("/api/chat/queue")
            .authorization_bearer(&ana_token)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .post(&format!("{base}/handoff"))
            .authorization_bearer(&ana_token)
            .await
            .assert_status_ok();
        server
            .post(&format!("{base}/handoff"))
            .authorization_bearer(&ana_token)
            .await
            .assert_status(StatusCode::CONFLICT);

        // feedback prima della chiusura
        server
            .post(&format!("{base}/feedback"))
            .authorization_bearer(&ana_token)
            .json(&json!({ "rating": 4 }))
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .post(&format!("{base}/end"))
            .authorization_bearer(create_test_jwt(&rui))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .post(&format!("{base}/end"))
            .authorization_bearer(&ana_token)
            .await
            .assert_status_ok();
        server
            .post(&format!("{base}/end"))
            .authorization_bearer(&ana_token)
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .post(&format!("{base}/feedback"))
            .authorization_bearer(&ana_token)
            .json(&json!({ "rating": 6 }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
