//! User entity - A person the bot has talked to.
//!
//! Created on first interaction, updated on profile edits and role changes,
//! never hard-deleted. `external_id` is the Discord user id.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user id
    #[sea_orm(unique)]
    pub external_id: i64,
    /// Display name shown in panels and notifications
    pub first_name: String,
    /// Discord username, if known
    pub username: Option<String>,
    /// Phone number with a leading `+`
    pub phone_number: Option<String>,
    /// Birthday; only month and day matter for scheduling
    pub birthday: Option<Date>,
    /// Stored role: `none`, `admin` or `super-admin`
    pub role: String,
    /// When the user first talked to the bot
    pub created_at: DateTime,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user participates in many chats
    #[sea_orm(has_many = "super::membership::Entity")]
    Memberships,
    /// One user owns (administers) many chats
    #[sea_orm(has_many = "super::chat::Entity")]
    Chats,
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::chat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chats.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
