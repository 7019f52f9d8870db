use crate::core::config::MailConfig;
use crate::entities::{Demand, DemandStatus, Service, User};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mail API answered with status {0}")]
    Status(u16),
}

/// Messaggio di posta in testo semplice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl Email {
    pub fn demand_created(client: &User, demand: &Demand, service: &Service) -> Self {
        Self {
            to: client.email.clone(),
            subject: format!("Demanda registrada - protocolo {}", demand.protocol),
            text: format!(
                "Olá, {}!\n\nSua demanda para o serviço \"{}\" foi registrada.\n\
                 Protocolo: {}\nStatus: {}\n\nGuarde o número do protocolo para acompanhar o atendimento.\n\n\
                 NAF Contábil",
                client.name,
                service.name,
                demand.protocol,
                demand.status.label()
            ),
        }
    }

    pub fn demand_status_changed(client: &User, demand: &Demand, previous: DemandStatus) -> Self {
        Self {
            to: client.email.clone(),
            subject: format!("Atualização da demanda {}", demand.protocol),
            text: format!(
                "Olá, {}!\n\nO status da sua demanda {} mudou de \"{}\" para \"{}\".\n\n\
                 NAF Contábil",
                client.name,
                demand.protocol,
                previous.label(),
                demand.status.label()
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Request body for the mail API
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Invia le e-mail tramite un'API HTTP JSON con bearer token
pub struct HttpMailer {
    client: Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Result<Self, MailError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, email), fields(to = %email.to))]
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&SendRequest {
                from: &self.config.from,
                to: &email.to,
                subject: &email.subject,
                text: &email.text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MailError::Status(response.status().as_u16()));
        }
        info!("E-mail sent");
        Ok(())
    }
}

/// Mailer di sviluppo: scrive l'e-mail nei log
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "E-mail (log only)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::entities::Role;

    #[test]
    fn test_demand_emails_mention_protocol_and_status() {
        let now = Utc::now();
        let client = User {
            user_id: 1,
            name: "João".into(),
            email: "joao@naf.br".into(),
            password: String::new(),
            role: Role::Client,
            registration: None,
            active: true,
            created_at: now,
        };
        let service = Service {
            service_id: 2,
            name: "Declaração de IRPF".into(),
            description: "Imposto de renda".into(),
            category: None,
            active: true,
            created_at: now,
        };
        let mut demand = Demand {
            demand_id: 3,
            protocol: "NAF20261019-ABC123".into(),
            client_id: 1,
            service_id: 2,
            assignee_id: None,
            description: "Preciso declarar".into(),
            status: DemandStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let created = Email::demand_created(&client, &demand, &service);
        assert_eq!(created.to, "joao@naf.br");
        assert!(created.subject.contains("NAF20261019-ABC123"));
        assert!(created.text.contains("Declaração de IRPF"));

        demand.status = DemandStatus::Completed;
        let changed = Email::demand_status_changed(&client, &demand, DemandStatus::InProgress);
        assert!(changed.text.contains(DemandStatus::InProgress.label()));
        assert!(changed.text.contains(DemandStatus::Completed.label()));
    }
}
