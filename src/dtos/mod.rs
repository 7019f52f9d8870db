//! DTOs module - Data Transfer Objects
//!
//! Questo modulo contiene tutti i DTOs usati per la comunicazione client-server.
//! I DTOs separano la rappresentazione esterna (API) dalla rappresentazione interna (entities).

pub mod attendance;
pub mod chat;
pub mod demand;
pub mod notification;
pub mod query;
pub mod report;
pub mod service;
pub mod user;
pub mod validation;

// Re-exports per facilitare l'import
pub use attendance::{AttendanceDTO, CreateAttendanceDTO, CreateAttendanceRequestDTO};
pub use chat::{
    ChatMessageDTO, ConversationDTO, CreateChatMessageDTO, CreateConversationDTO,
    CreateConversationRequestDTO, FeedbackDTO, RejectHandoffDTO, SendMessageDTO,
};
pub use demand::{
    AssignDemandDTO, CreateDemandDTO, CreateDemandRequestDTO, DemandDTO, UpdateDemandDTO,
    UpdateDemandStatusDTO,
};
pub use notification::{ConversationUpdateDTO, NotificationSnapshotDTO};
pub use query::{
    AttendanceListQuery, ConversationListQuery, DemandListQuery, MessagesQuery, ReportQuery,
    ServiceListQuery, UserListQuery,
};
pub use report::{AttendantStatsDTO, ReportSummaryDTO, ServiceCountDTO, StatusCountsDTO};
pub use service::{CreateServiceDTO, ServiceDTO, UpdateServiceDTO};
pub use user::{
    CreateUserDTO, CreateUserRequestDTO, LoginDTO, LoginResponseDTO, RegisterRequestDTO,
    StudentLoginDTO, UpdateUserDTO, UserDTO,
};
