//! Enumerazioni - Tipi enumerati utilizzati nelle entità

use serde::{Deserialize, Serialize};
use std::fmt;

// ********************* ENUMERAZIONI UTILI **********************//

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Coordinator,
    Teacher,
    Student,
    Client,
}

impl Role {
    /// Tutti i ruoli tranne il cliente fanno parte dello staff del NAF
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Client)
    }

    pub const STAFF: [Role; 3] = [Role::Coordinator, Role::Teacher, Role::Student];
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "demand_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DemandStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl DemandStatus {
    pub const ALL: [DemandStatus; 4] = [
        DemandStatus::Pending,
        DemandStatus::InProgress,
        DemandStatus::Completed,
        DemandStatus::Cancelled,
    ];

    /// Transizioni ammesse:
    /// Pending -> InProgress | Cancelled, InProgress -> Completed | Cancelled
    pub fn can_transition_to(&self, next: DemandStatus) -> bool {
        matches!(
            (self, next),
            (DemandStatus::Pending, DemandStatus::InProgress)
                | (DemandStatus::Pending, DemandStatus::Cancelled)
                | (DemandStatus::InProgress, DemandStatus::Completed)
                | (DemandStatus::InProgress, DemandStatus::Cancelled)
        )
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, DemandStatus::Completed | DemandStatus::Cancelled)
    }

    /// Etichetta leggibile usata nelle email ai clienti
    pub fn label(&self) -> &'static str {
        match self {
            DemandStatus::Pending => "Pendente",
            DemandStatus::InProgress => "Em atendimento",
            DemandStatus::Completed => "Concluída",
            DemandStatus::Cancelled => "Cancelada",
        }
    }
}

impl fmt::Display for DemandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "conversation_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationStatus {
    Bot,
    WaitingHuman,
    Active,
    Ended,
}

impl ConversationStatus {
    pub const OPEN: [ConversationStatus; 3] = [
        ConversationStatus::Bot,
        ConversationStatus::WaitingHuman,
        ConversationStatus::Active,
    ];
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "sender_kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderKind {
    Client,
    Attendant,
    Assistant,
    System,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demand_transitions_forward_only() {
        use DemandStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!InProgress.can_transition_to(Pending));
        for next in DemandStatus::ALL {
            assert!(!Completed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_staff_roles() {
        assert!(Role::Coordinator.is_staff());
        assert!(Role::Teacher.is_staff());
        assert!(Role::Student.is_staff());
        assert!(!Role::Client.is_staff());
    }

    #[test]
    fn test_enum_json_representation() {
        assert_eq!(
            serde_json::to_string(&DemandStatus::InProgress).unwrap(),
            "\"InProgress\""
        );
        let status: ConversationStatus = serde_json::from_str("\"WaitingHuman\"").unwrap();
        assert_eq!(status, ConversationStatus::WaitingHuman);
    }
}
