//! Scheduler config entity - Operator-tunable trigger settings keyed by title.
//! Known titles are `check_birthday` and `check_report`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Scheduler config database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scheduler_config")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Key of the setting (e.g. `"check_birthday"`)
    #[sea_orm(unique)]
    pub title: String,
    /// Trigger time of day as `HH:MM`
    pub trigger_time: Option<String>,
    /// Days-to-birthday horizon
    pub lookahead: Option<i64>,
}

/// `SchedulerConfig` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
