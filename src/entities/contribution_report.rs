//! Contribution report entity - Whether one participant paid for one event.
//!
//! Unique per (user, chat, event). Created unpaid the first time the
//! participant is asked; flipped by the admin from the report view.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Contribution report database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contribution_reports")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Participant who was asked
    pub user_id: i64,
    /// Chat the request came from
    pub chat_id: i64,
    /// Event being paid for
    pub event_id: i64,
    /// `true` once the admin marked the contribution as received
    pub status: bool,
}

/// Defines relationships between `ContributionReport` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each report belongs to one event
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
    /// Each report belongs to one participant
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
