//! Event entity - One birthday collection for a (person, chat) pair.
//!
//! `user_id` is empty when the birthday person has no User record; `label`
//! then carries their name and phone. `status == true` means the collection
//! is open.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Event database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Birthday person, if registered
    pub user_id: Option<i64>,
    /// Chat collecting for this event
    pub chat_id: i64,
    /// Human-readable subject (name and phone)
    pub label: String,
    /// The birthday being celebrated
    pub date_event: Date,
    /// Amount asked from every participant
    pub amount: i64,
    /// Open (`true`) or closed
    pub status: bool,
    /// When the event was opened
    pub created_at: DateTime,
}

/// Defines relationships between Event and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each event belongs to one chat
    #[sea_orm(
        belongs_to = "super::chat::Entity",
        from = "Column::ChatId",
        to = "super::chat::Column::Id"
    )]
    Chat,
    /// One event has many contribution reports
    #[sea_orm(has_many = "super::contribution_report::Entity")]
    Reports,
}

impl Related<super::chat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chat.def()
    }
}

impl Related<super::contribution_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
