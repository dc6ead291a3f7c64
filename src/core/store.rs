//! Persistence access layer - Retry-wrapped CRUD over the closed set of models.
//!
//! Every primitive runs inside [`with_retry`] and opens a fresh transaction
//! per attempt. Failures are logged and surface as `None` or an empty `Vec`;
//! callers never see a `DbErr`.
//!
//! `update` has merge semantics: the caller hands over a detached, already
//! mutated model and every column is written back as-is.

use super::retry::{RetryPolicy, with_retry};
use crate::entities::{
    chat, contribution_report, event, membership, scheduler_config, user, ContributionReport,
    Event, Membership, User,
};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    IntoActiveModel, ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

/// A model managed by the persistence layer.
pub trait Record: ModelTrait + Clone + Send + Sync {
    /// Active model used for inserts and updates
    type Active: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send + Sync;
    /// Logical model name used in logs
    const NAME: &'static str;

    /// Primary key column
    fn id_column() -> <Self::Entity as EntityTrait>::Column;
    /// Primary key value
    fn id(&self) -> i64;
}

macro_rules! impl_record {
    ($module:ident, $name:literal) => {
        impl Record for $module::Model {
            type Active = $module::ActiveModel;
            const NAME: &'static str = $name;

            fn id_column() -> $module::Column {
                $module::Column::Id
            }

            fn id(&self) -> i64 {
                self.id
            }
        }
    };
}

impl_record!(user, "user");
impl_record!(chat, "chat");
impl_record!(membership, "membership");
impl_record!(event, "event");
impl_record!(contribution_report, "contribution_report");
impl_record!(scheduler_config, "scheduler_config");

/// Fetches one row by primary key.
pub async fn get_by_id<M>(db: &DatabaseConnection, id: i64) -> Option<M>
where
    M: Record,
    M::Entity: EntityTrait<Model = M>,
{
    let label = format!("get_by_id({}, {id})", M::NAME);
    with_retry(RetryPolicy::default(), &label, || async move {
        let txn = db.begin().await?;
        let row = M::Entity::find()
            .filter(M::id_column().eq(id))
            .one(&txn)
            .await?;
        txn.commit().await?;
        Ok(row)
    })
    .await
    .flatten()
}

/// Fetches every row matching `filter`, ordered by primary key.
pub async fn get_many<M>(db: &DatabaseConnection, filter: Condition) -> Vec<M>
where
    M: Record,
    M::Entity: EntityTrait<Model = M>,
{
    let label = format!("get_many({})", M::NAME);
    with_retry(RetryPolicy::default(), &label, || {
        let filter = filter.clone();
        async move {
            let txn = db.begin().await?;
            let rows = M::Entity::find()
                .filter(filter)
                .order_by_asc(M::id_column())
                .all(&txn)
                .await?;
            txn.commit().await?;
            Ok(rows)
        }
    })
    .await
    .unwrap_or_default()
}

/// Inserts a row and returns its new id, or `None` once retries are exhausted
/// or a unique key already holds an equal row.
pub async fn create<A>(db: &DatabaseConnection, data: A) -> Option<i64>
where
    A: ActiveModelTrait + ActiveModelBehavior + Clone + Send + Sync,
    <A::Entity as EntityTrait>::Model: Record + IntoActiveModel<A>,
{
    let label = format!("create({})", <<A::Entity as EntityTrait>::Model as Record>::NAME);
    let id = with_retry(RetryPolicy::default(), &label, || {
        let data = data.clone();
        async move {
            let txn = db.begin().await?;
            let model = data.insert(&txn).await?;
            txn.commit().await?;
            Ok(model.id())
        }
    })
    .await;

    if let Some(id) = id {
        tracing::info!("{label} -> {id}");
    }
    id
}

/// Writes every column of a detached model back to its row.
pub async fn update<M>(db: &DatabaseConnection, model: M) -> Option<M>
where
    M: Record + IntoActiveModel<M::Active>,
    M::Entity: EntityTrait<Model = M>,
{
    let label = format!("update({}, {})", M::NAME, model.id());
    with_retry(RetryPolicy::default(), &label, || {
        let active: M::Active = model.clone().into_active_model().reset_all();
        async move {
            let txn = db.begin().await?;
            let saved = active.update(&txn).await?;
            txn.commit().await?;
            Ok(saved)
        }
    })
    .await
}

/// Looks a user up by their Discord id.
pub async fn get_user_by_external(db: &DatabaseConnection, external_id: i64) -> Option<user::Model> {
    get_many::<user::Model>(
        db,
        Condition::all().add(user::Column::ExternalId.eq(external_id)),
    )
    .await
    .into_iter()
    .next()
}

/// Looks a chat up by its Discord channel id.
pub async fn get_chat_by_external(db: &DatabaseConnection, external_id: i64) -> Option<chat::Model> {
    get_many::<chat::Model>(
        db,
        Condition::all().add(chat::Column::ExternalId.eq(external_id)),
    )
    .await
    .into_iter()
    .next()
}

/// Canonical event for a (birthday user, chat) pair: the one with the latest date.
pub async fn get_event(db: &DatabaseConnection, user_id: i64, chat_id: i64) -> Option<event::Model> {
    let label = format!("get_event(user={user_id}, chat={chat_id})");
    with_retry(RetryPolicy::default(), &label, || async move {
        let txn = db.begin().await?;
        let row = Event::find()
            .filter(event::Column::UserId.eq(user_id))
            .filter(event::Column::ChatId.eq(chat_id))
            .order_by_desc(event::Column::DateEvent)
            .one(&txn)
            .await?;
        txn.commit().await?;
        Ok(row)
    })
    .await
    .flatten()
}

/// Report for a (participant, chat, event) triple.
pub async fn get_report(
    db: &DatabaseConnection,
    user_id: i64,
    chat_id: i64,
    event_id: i64,
) -> Option<contribution_report::Model> {
    get_many::<contribution_report::Model>(
        db,
        Condition::all()
            .add(contribution_report::Column::UserId.eq(user_id))
            .add(contribution_report::Column::ChatId.eq(chat_id))
            .add(contribution_report::Column::EventId.eq(event_id)),
    )
    .await
    .into_iter()
    .next()
}

/// Membership row for a (chat, user) pair.
pub async fn get_membership(
    db: &DatabaseConnection,
    chat_id: i64,
    user_id: i64,
) -> Option<membership::Model> {
    get_many::<membership::Model>(
        db,
        Condition::all()
            .add(membership::Column::ChatId.eq(chat_id))
            .add(membership::Column::UserId.eq(user_id)),
    )
    .await
    .into_iter()
    .next()
}

/// Every membership of a chat joined with its user.
pub async fn get_memberships(
    db: &DatabaseConnection,
    chat_id: i64,
) -> Vec<(membership::Model, user::Model)> {
    let label = format!("get_memberships(chat={chat_id})");
    let rows = with_retry(RetryPolicy::default(), &label, || async move {
        let txn = db.begin().await?;
        let rows = Membership::find()
            .filter(membership::Column::ChatId.eq(chat_id))
            .order_by_asc(membership::Column::Id)
            .find_also_related(User)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(rows)
    })
    .await
    .unwrap_or_default();

    rows.into_iter()
        .filter_map(|(member, user)| user.map(|user| (member, user)))
        .collect()
}

/// Every report of an event joined with the participant.
pub async fn get_event_reports(
    db: &DatabaseConnection,
    event_id: i64,
) -> Vec<(contribution_report::Model, user::Model)> {
    let label = format!("get_event_reports(event={event_id})");
    let rows = with_retry(RetryPolicy::default(), &label, || async move {
        let txn = db.begin().await?;
        let rows = ContributionReport::find()
            .filter(contribution_report::Column::EventId.eq(event_id))
            .order_by_asc(contribution_report::Column::Id)
            .find_also_related(User)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(rows)
    })
    .await
    .unwrap_or_default();

    rows.into_iter()
        .filter_map(|(report, user)| user.map(|user| (report, user)))
        .collect()
}

/// Fields of an event to open when none exists for the target date.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Birthday person, if registered
    pub user_id: Option<i64>,
    /// Collecting chat
    pub chat_id: i64,
    /// Human-readable subject
    pub label: String,
    /// Birthday being celebrated
    pub date_event: chrono::NaiveDate,
    /// Amount per participant
    pub amount: i64,
}

/// Event of a (birthday user, chat) pair on one date, the unique key of `events`.
pub async fn get_event_on(
    db: &DatabaseConnection,
    user_id: i64,
    chat_id: i64,
    date_event: chrono::NaiveDate,
) -> Option<event::Model> {
    get_many::<event::Model>(
        db,
        Condition::all()
            .add(event::Column::UserId.eq(user_id))
            .add(event::Column::ChatId.eq(chat_id))
            .add(event::Column::DateEvent.eq(date_event)),
    )
    .await
    .into_iter()
    .next()
}

/// Returns the event for the pair on `date_event`, opening one if absent.
/// A lost insert race falls through to the re-fetch.
pub async fn ensure_event(db: &DatabaseConnection, new: NewEvent) -> Option<event::Model> {
    let Some(user_id) = new.user_id else {
        return create_event(db, &new).await;
    };

    if let Some(existing) = get_event_on(db, user_id, new.chat_id, new.date_event).await {
        return Some(existing);
    }

    if let Some(created) = create_event(db, &new).await {
        return Some(created);
    }
    tracing::debug!("event for user {user_id} chat {} not created, re-fetching", new.chat_id);
    get_event_on(db, user_id, new.chat_id, new.date_event).await
}

async fn create_event(db: &DatabaseConnection, new: &NewEvent) -> Option<event::Model> {
    let id = create(
        db,
        event::ActiveModel {
            user_id: Set(new.user_id),
            chat_id: Set(new.chat_id),
            label: Set(new.label.clone()),
            date_event: Set(new.date_event),
            amount: Set(new.amount),
            status: Set(true),
            created_at: Set(chrono::Local::now().naive_local()),
            ..Default::default()
        },
    )
    .await?;
    get_by_id(db, id).await
}

/// Returns the report for the triple, creating an unpaid one if absent.
pub async fn ensure_report(
    db: &DatabaseConnection,
    user_id: i64,
    chat_id: i64,
    event_id: i64,
) -> Option<contribution_report::Model> {
    if let Some(existing) = get_report(db, user_id, chat_id, event_id).await {
        return Some(existing);
    }

    create(
        db,
        contribution_report::ActiveModel {
            user_id: Set(user_id),
            chat_id: Set(chat_id),
            event_id: Set(event_id),
            status: Set(false),
            ..Default::default()
        },
    )
    .await;
    get_report(db, user_id, chat_id, event_id).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::Result;
    use crate::test_utils::{create_test_chat, create_test_user, setup_test_db};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_create_and_get_by_id() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, 1, "Ann").await?;

        let loaded: user::Model = get_by_id(&db, user.id).await.unwrap();
        assert_eq!(loaded.first_name, "Ann");
        assert!(get_by_id::<user::Model>(&db, 999).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_merges_detached_model() -> Result<()> {
        let db = setup_test_db().await?;
        let mut user = create_test_user(&db, 1, "Ann").await?;

        user.phone_number = Some("+79990000000".to_string());
        user.role = "admin".to_string();
        let saved = update(&db, user.clone()).await.unwrap();
        assert_eq!(saved, user);

        let reloaded: user::Model = get_by_id(&db, user.id).await.unwrap();
        assert_eq!(reloaded.role, "admin");
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_external_id_returns_none() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, 7, "Ann").await?;

        let duplicate = user::ActiveModel {
            external_id: Set(7),
            first_name: Set("Other".to_string()),
            role: Set("none".to_string()),
            created_at: Set(chrono::Local::now().naive_local()),
            ..Default::default()
        };
        assert!(create(&db, duplicate).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_get_many_filters() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, 1, "Ann").await?;
        create_test_user(&db, 2, "Bob").await?;

        let all: Vec<user::Model> = get_many(&db, Condition::all()).await;
        assert_eq!(all.len(), 2);

        let bobs: Vec<user::Model> =
            get_many(&db, Condition::all().add(user::Column::FirstName.eq("Bob"))).await;
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].external_id, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_event_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, 1, "Owner").await?;
        let subject = create_test_user(&db, 2, "Ann").await?;
        let chat = create_test_chat(&db, 100, owner.id).await?;

        let new = NewEvent {
            user_id: Some(subject.id),
            chat_id: chat.id,
            label: "Ann +7999".to_string(),
            date_event: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            amount: 500,
        };
        let first = ensure_event(&db, new.clone()).await.unwrap();
        let second = ensure_event(&db, new).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(first.status);
        let events: Vec<event::Model> = get_many(&db, Condition::all()).await;
        assert_eq!(events.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_next_year_opens_new_event() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, 1, "Owner").await?;
        let subject = create_test_user(&db, 2, "Ann").await?;
        let chat = create_test_chat(&db, 100, owner.id).await?;

        let mut new = NewEvent {
            user_id: Some(subject.id),
            chat_id: chat.id,
            label: "Ann".to_string(),
            date_event: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            amount: 500,
        };
        let old = ensure_event(&db, new.clone()).await.unwrap();
        new.date_event = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let current = ensure_event(&db, new).await.unwrap();

        assert_ne!(old.id, current.id);
        assert_eq!(get_event(&db, subject.id, chat.id).await.unwrap().id, current.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_later_dated_event_does_not_hide_new_one() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, 1, "Owner").await?;
        let subject = create_test_user(&db, 2, "Ann").await?;
        let chat = create_test_chat(&db, 100, owner.id).await?;

        let mut new = NewEvent {
            user_id: Some(subject.id),
            chat_id: chat.id,
            label: "Ann party".to_string(),
            date_event: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            amount: 500,
        };
        let party = ensure_event(&db, new.clone()).await.unwrap();

        new.date_event = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let birthday = ensure_event(&db, new.clone()).await.unwrap();
        assert_ne!(party.id, birthday.id);
        assert_eq!(birthday.date_event, new.date_event);

        let again = ensure_event(&db, new).await.unwrap();
        assert_eq!(again.id, birthday.id);
        let events: Vec<event::Model> = get_many(&db, Condition::all()).await;
        assert_eq!(events.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_report_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, 1, "Owner").await?;
        let payer = create_test_user(&db, 2, "Bob").await?;
        let chat = create_test_chat(&db, 100, owner.id).await?;
        let event = ensure_event(
            &db,
            NewEvent {
                user_id: Some(owner.id),
                chat_id: chat.id,
                label: "Owner".to_string(),
                date_event: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
                amount: 500,
            },
        )
        .await
        .unwrap();

        let first = ensure_report(&db, payer.id, chat.id, event.id).await.unwrap();
        let second = ensure_report(&db, payer.id, chat.id, event.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(!first.status);

        let reports = get_event_reports(&db, event.id).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].1.first_name, "Bob");
        Ok(())
    }
}
