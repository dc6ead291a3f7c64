//! Core business logic - Framework-agnostic bot operations.
//!
//! Nothing here knows about Discord. The platform is reached through the
//! [`panel::Messenger`] trait and the AI through [`crate::ai::ContentGenerator`],
//! both carried by [`context::AppContext`].

/// Birthday task engine
pub mod birthday;
/// Chat registration and admin commands
pub mod chat;
/// Explicit application context
pub mod context;
/// Bounded notification task group
pub mod fanout;
/// Button token grammar
pub mod intent;
/// Membership detection and toggles
pub mod membership;
/// Menu reconstructor
pub mod menu;
/// Notification content with AI fallbacks
pub mod notify;
/// Outbound panels and the messaging collaborator
pub mod panel;
/// User registration and profile edits
pub mod profile;
/// Daily contribution reports
pub mod report;
/// Bounded retry loop
pub mod retry;
/// Roles and the effective-role rule
pub mod role;
/// Token router
pub mod router;
/// Scheduler loop
pub mod scheduler;
/// Persistence access layer
pub mod store;
