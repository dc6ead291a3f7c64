//! Membership entity - A user's participation in one chat.
//!
//! `status` gates whether the user is asked for money in that chat and is
//! admin-togglable. `updated_at` is the last time the user was seen there.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Membership database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "memberships")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Chat the user belongs to
    pub chat_id: i64,
    /// The participating user
    pub user_id: i64,
    /// Whether the user takes part in collections
    pub status: bool,
    /// Last time the user was seen in the chat
    pub updated_at: DateTime,
}

/// Defines relationships between Membership and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each membership belongs to one chat
    #[sea_orm(
        belongs_to = "super::chat::Entity",
        from = "Column::ChatId",
        to = "super::chat::Column::Id"
    )]
    Chat,
    /// Each membership belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::chat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chat.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
