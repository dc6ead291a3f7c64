//! User registration and profile edits.

use super::role::Role;
use super::store;
use crate::entities::user;
use crate::errors::{Error, Result};
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, Set};

/// Who pressed a button or sent a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Platform user id
    pub external_id: i64,
    /// Display name
    pub first_name: String,
    /// Platform username
    pub username: Option<String>,
}

/// Loads the actor's user row, creating it on first contact.
///
/// Always reads fresh from the database so role changes apply immediately.
pub async fn ensure_user(db: &DatabaseConnection, actor: &Actor) -> Result<user::Model> {
    if let Some(existing) = store::get_user_by_external(db, actor.external_id).await {
        return Ok(existing);
    }

    let created = store::create(
        db,
        user::ActiveModel {
            external_id: Set(actor.external_id),
            first_name: Set(actor.first_name.clone()),
            username: Set(actor.username.clone()),
            phone_number: Set(None),
            birthday: Set(None),
            role: Set(Role::None.as_str().to_string()),
            created_at: Set(chrono::Local::now().naive_local()),
            ..Default::default()
        },
    )
    .await;
    if created.is_some() {
        tracing::info!("Registered user {} ({})", actor.first_name, actor.external_id);
    }

    // A concurrent first contact may have won the insert
    store::get_user_by_external(db, actor.external_id)
        .await
        .ok_or_else(|| Error::persistence("create(user)"))
}

/// Normalises a phone number to `+` followed by digits.
pub fn normalize_phone(raw: &str) -> Result<String> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '+'))
        .collect();

    if !(10..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::invalid(format!("'{raw}' is not a valid phone number")));
    }
    Ok(format!("+{digits}"))
}

/// Parses `YYYY-MM-DD` or `DD.MM.YYYY`.
pub fn parse_birthday(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d.%m.%Y"))
        .map_err(|_| Error::invalid(format!("'{raw}' is not a date, use YYYY-MM-DD")))
}

/// Stores a phone number for the actor.
pub async fn set_phone(db: &DatabaseConnection, actor: &Actor, raw: &str) -> Result<user::Model> {
    let phone = normalize_phone(raw)?;
    let mut user = ensure_user(db, actor).await?;
    user.phone_number = Some(phone);
    store::update(db, user)
        .await
        .ok_or_else(|| Error::persistence("update(user)"))
}

/// Stores a birthday for the actor.
pub async fn set_birthday(db: &DatabaseConnection, actor: &Actor, raw: &str) -> Result<user::Model> {
    let birthday = parse_birthday(raw)?;
    if birthday > chrono::Local::now().date_naive() {
        return Err(Error::invalid("Birthday cannot be in the future"));
    }
    let mut user = ensure_user(db, actor).await?;
    user.birthday = Some(birthday);
    store::update(db, user)
        .await
        .ok_or_else(|| Error::persistence("update(user)"))
}

/// Finds a registered user by normalised phone number.
pub async fn find_by_phone(db: &DatabaseConnection, raw: &str) -> Result<Option<user::Model>> {
    use sea_orm::{ColumnTrait, Condition};

    let phone = normalize_phone(raw)?;
    Ok(store::get_many::<user::Model>(
        db,
        Condition::all().add(user::Column::PhoneNumber.eq(phone)),
    )
    .await
    .into_iter()
    .next())
}
