//! Chat entity - A managed group and where its contributions go.
//!
//! `external_id` is the Discord channel id. `status` mirrors whether the
//! owner and the bot can still see the channel; it is refreshed every time
//! the chat is listed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Chat database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chats")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord channel id
    #[sea_orm(unique)]
    pub external_id: i64,
    /// User id of the admin who collects the money
    pub owner_id: i64,
    /// Payment destination shown in contribution requests
    pub card_number: String,
    /// Whether the owner and the bot still have access to the channel
    pub status: bool,
    /// When the chat was registered
    pub created_at: DateTime,
}

/// Defines relationships between Chat and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each chat is owned by one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
    /// One chat has many memberships
    #[sea_orm(has_many = "super::membership::Entity")]
    Memberships,
    /// One chat has many events
    #[sea_orm(has_many = "super::event::Entity")]
    Events,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
