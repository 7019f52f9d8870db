//! Demand DTOs - Data Transfer Objects per le richieste dei clienti

use super::validation::not_blank;
use crate::entities::{Demand, DemandStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DemandDTO {
    pub demand_id: i32,
    pub protocol: String,
    pub client_id: i32,
    pub service_id: i32,
    pub assignee_id: Option<i32>,
    pub description: String,
    pub status: DemandStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Demand> for DemandDTO {
    fn from(value: Demand) -> Self {
        Self {
            demand_id: value.demand_id,
            protocol: value.protocol,
            client_id: value.client_id,
            service_id: value.service_id,
            assignee_id: value.assignee_id,
            description: value.description,
            status: value.status,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Body di POST /api/demands
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateDemandRequestDTO {
    pub service_id: i32,
    #[validate(
        length(min = 1, max = 5000, message = "Description must be between 1 and 5000 characters"),
        custom(function = "not_blank")
    )]
    pub description: String,
}

/// DTO per creare una demand nel repository (protocollo già generato)
#[derive(Debug, Clone)]
pub struct CreateDemandDTO {
    pub protocol: String,
    pub client_id: i32,
    pub service_id: i32,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// DTO per aggiornare una demand; lo stato cambia solo con `transition_status`
#[derive(Debug, Clone, Default)]
pub struct UpdateDemandDTO {
    pub assignee_id: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateDemandStatusDTO {
    pub status: DemandStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AssignDemandDTO {
    pub assignee_id: i32,
}
