//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod chat;
pub mod contribution_report;
pub mod event;
pub mod membership;
pub mod scheduler_config;
pub mod user;

// Re-export specific types to avoid conflicts
pub use chat::{Column as ChatColumn, Entity as Chat, Model as ChatModel};
pub use contribution_report::{
    Column as ContributionReportColumn, Entity as ContributionReport,
    Model as ContributionReportModel,
};
pub use event::{Column as EventColumn, Entity as Event, Model as EventModel};
pub use membership::{Column as MembershipColumn, Entity as Membership, Model as MembershipModel};
pub use scheduler_config::{
    Column as SchedulerConfigColumn, Entity as SchedulerConfig, Model as SchedulerConfigModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
