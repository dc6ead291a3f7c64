//! Menu reconstructor - Builds every panel from persisted state.
//!
//! Nothing about the current view is stored server-side. Each function takes
//! the actor (freshly loaded) and the requested view and derives the panel
//! from the database and live platform checks. Buttons always carry row ids.

use super::context::AppContext;
use super::intent::{AdminCommand, ChatAction, Intent, Scope, SuperCommand, UserCommand};
use super::panel::{Button, Panel, chat_title_or_fallback};
use super::role::{EffectiveRole, Role, effective_role};
use super::store;
use crate::entities::{chat, contribution_report, event, membership, user};
use crate::errors::{Error, Result};
use chrono::Datelike;
use sea_orm::{ColumnTrait, Condition};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

/// Entries per members/report page. One of the five button rows is kept for navigation.
pub const ROWS_PER_PAGE: usize = 4;
/// Entries per calendar page.
pub const CALENDAR_PAGE: usize = 7;
/// Chat buttons per row in chat lists.
const BUTTONS_PER_ROW: usize = 5;
/// Chats per "my groups" page: four rows of buttons plus navigation.
const GROUPS_PER_PAGE: usize = ROWS_PER_PAGE * BUTTONS_PER_ROW;

fn close_button() -> Button {
    Button::token("✖ Close", Intent::Dismiss)
}

fn home_button() -> Button {
    Button::token("🏠 Menu", Intent::Back)
}

/// Main menu for `actor`.
pub fn main_menu(actor: &user::Model, operator_id: i64) -> Panel {
    let role = effective_role(actor, operator_id);
    let phone = actor.phone_number.as_ref().map_or_else(
        || "Share your phone number with /phone so admins can find you.".to_string(),
        Clone::clone,
    );
    let birthday = actor.birthday.map_or_else(
        || "Birthday not set yet.".to_string(),
        |d| d.format("%d.%m.%Y").to_string(),
    );
    let text = format!("👋 Hello, {}!\n📞 {phone}\n🎂 {birthday}", actor.first_name);

    let mut panel = Panel::text(text)
        .row(vec![
            Button::token("🎂 Birthday", Intent::User(UserCommand::ChangeBirthday)),
            Button::token("📅 Calendar", Intent::User(UserCommand::Calendar { page: 0 })),
            Button::token("💸 My contributions", Intent::User(UserCommand::MyContributions)),
        ]);

    if role.is_admin() {
        let scope = scope_for(role);
        panel = panel.button(Button::token("👥 My groups", scope.wrap(AdminCommand::MyGroups { page: 1 })));
    }
    if role.is_super() {
        panel = panel.row(vec![
            Button::token("🗂 Manage chats", Intent::Super(SuperCommand::ManageChats { page: 1 })),
            Button::token("➕ Add chat", Intent::Super(SuperCommand::AddChat)),
        ]);
    }
    panel.button(close_button())
}

/// Scope that nested admin buttons are rendered under for `role`.
pub const fn scope_for(role: EffectiveRole) -> Scope {
    match role {
        EffectiveRole::Super => Scope::Super,
        EffectiveRole::Admin | EffectiveRole::User => Scope::Admin,
    }
}

/// "My groups": owned chats (all chats for super), one-based `page` of them,
/// each listed chat re-checked live.
///
/// A plain admin without chats is demoted and gets the main menu back.
pub async fn my_groups(app: &AppContext, actor: &user::Model, page: usize) -> Result<Panel> {
    let role = effective_role(actor, app.operator_id());
    let filter = if role.is_super() {
        Condition::all()
    } else {
        Condition::all().add(chat::Column::OwnerId.eq(actor.id))
    };
    let chats: Vec<chat::Model> = store::get_many(&app.db, filter).await;

    if chats.is_empty() {
        if role == EffectiveRole::Admin {
            let mut demoted = actor.clone();
            demoted.role = Role::None.as_str().to_string();
            let demoted = store::update(&app.db, demoted)
                .await
                .ok_or_else(|| Error::persistence("update(user)"))?;
            tracing::info!("User {} owns no chats, admin role removed", demoted.id);
            let mut panel = main_menu(&demoted, app.operator_id());
            panel.text = format!("You no longer manage any group.\n\n{}", panel.text);
            return Ok(panel);
        }
        return Ok(Panel::text("👥 No groups yet.").row(vec![home_button(), close_button()]));
    }

    let scope = scope_for(role);
    let total = chats.len();
    let page = wrap_page(page, total, GROUPS_PER_PAGE);
    let pages = total.div_ceil(GROUPS_PER_PAGE);
    let mut owners: HashMap<i64, i64> = HashMap::from([(actor.id, actor.external_id)]);
    let mut text = format!("👥 Your groups ({total}), page {page}/{pages}:\n");
    let mut buttons = Vec::new();

    for chat in chats.into_iter().skip((page - 1) * GROUPS_PER_PAGE).take(GROUPS_PER_PAGE) {
        let known = owners.get(&chat.owner_id).copied();
        let owner_external = match known {
            Some(id) => Some(id),
            None => store::get_by_id::<user::Model>(&app.db, chat.owner_id)
                .await
                .map(|owner| {
                    owners.insert(owner.id, owner.external_id);
                    owner.external_id
                }),
        };
        let chat = refresh_chat_status(app, chat, owner_external).await;
        let title = chat_title_or_fallback(app.messenger.as_ref(), chat.external_id).await;
        let marker = if chat.status { "🟢" } else { "🔴" };
        writeln!(text, "{marker} {title}")?;
        buttons.push(Button::token(
            format!("{marker} {title}"),
            scope.wrap(AdminCommand::ChatSettings { chat_id: chat.id }),
        ));
    }

    let mut panel = Panel::text(text);
    for row in buttons.chunks(BUTTONS_PER_ROW) {
        panel = panel.row(row.to_vec());
    }
    let mut nav = Vec::new();
    if pages > 1 {
        nav.push(Button::token("◀", scope.wrap(AdminCommand::MyGroups { page: page - 1 })));
        nav.push(Button::token("▶", scope.wrap(AdminCommand::MyGroups { page: page + 1 })));
    }
    nav.push(home_button());
    nav.push(close_button());
    Ok(panel.row(nav))
}

async fn refresh_chat_status(app: &AppContext, chat: chat::Model, owner: Option<i64>) -> chat::Model {
    let live = match owner {
        Some(owner) => app
            .messenger
            .is_member(chat.external_id, owner)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Access check for chat {} failed: {e}", chat.id);
                false
            }),
        None => false,
    };
    if live == chat.status {
        return chat;
    }

    let mut updated = chat.clone();
    updated.status = live;
    tracing::info!("Chat {} is now {}", chat.id, if live { "active" } else { "inactive" });
    store::update(&app.db, updated).await.unwrap_or(chat)
}

/// Normalises a one-based window number with wrap-around in both directions.
pub fn wrap_page(page: usize, total_items: usize, page_size: usize) -> usize {
    let pages = total_items.div_ceil(page_size.max(1)).max(1);
    if page == 0 {
        pages
    } else if page > pages {
        1
    } else {
        page
    }
}

/// Paginated list of every chat for super admins.
pub async fn manage_chats(app: &AppContext, page: usize) -> Result<Panel> {
    let size = app.config.collection.page_size.max(1);
    let chats: Vec<chat::Model> = store::get_many(&app.db, Condition::all()).await;
    let page = wrap_page(page, chats.len(), size);
    let pages = chats.len().div_ceil(size).max(1);

    let mut text = format!("🗂 All chats ({}), page {page}/{pages}\n", chats.len());
    let mut buttons = Vec::new();
    for chat in chats.iter().skip((page - 1) * size).take(size) {
        let title = chat_title_or_fallback(app.messenger.as_ref(), chat.external_id).await;
        let marker = if chat.status { "🟢" } else { "🔴" };
        writeln!(text, "{marker} {title}")?;
        buttons.push(Button::token(
            format!("{marker} {title}"),
            Intent::Super(SuperCommand::Act(AdminCommand::ChatSettings { chat_id: chat.id })),
        ));
    }

    let mut panel = Panel::text(text);
    for row in buttons.chunks(BUTTONS_PER_ROW) {
        panel = panel.row(row.to_vec());
    }
    Ok(panel.row(vec![
        Button::token("◀", Intent::Super(SuperCommand::ManageChats { page: page - 1 })),
        Button::token("▶", Intent::Super(SuperCommand::ManageChats { page: page + 1 })),
        home_button(),
        close_button(),
    ]))
}

/// Explains how to register a chat.
pub fn add_chat_help() -> Panel {
    Panel::text(
        "➕ To manage a new group, add the bot to the channel and run\n\
         `/add_chat <channel> <card number>` there or here.",
    )
    .row(vec![home_button(), close_button()])
}

/// Settings panel of one chat.
pub async fn chat_settings(app: &AppContext, chat: &chat::Model, scope: Scope) -> Result<Panel> {
    let title = chat_title_or_fallback(app.messenger.as_ref(), chat.external_id).await;
    let owner: Option<user::Model> = store::get_by_id(&app.db, chat.owner_id).await;
    let events = open_events(app, chat.id).await;

    let mut text = format!("⚙️ {title}\n");
    writeln!(text, "Chat id: {}", chat.id)?;
    writeln!(text, "💳 Card: {}", chat.card_number)?;
    if let Some(owner) = &owner {
        writeln!(text, "👤 Admin: {}", owner.first_name)?;
    }
    writeln!(text, "Status: {}", if chat.status { "active" } else { "inactive" })?;
    if events.is_empty() {
        text.push_str("No open collections.");
    } else {
        text.push_str("Open collections:");
        for event in &events {
            write!(text, "\n🎁 {} ({}) - {}", event.label, event.date_event.format("%d.%m"), event.amount)?;
        }
    }

    let action = |label: &str, action: ChatAction| {
        Button::token(
            label,
            scope.wrap(AdminCommand::ChatAction {
                action,
                chat_id: chat.id,
                page: 0,
            }),
        )
    };
    let event_buttons: Vec<Button> = events
        .iter()
        .take(BUTTONS_PER_ROW)
        .map(|event| {
            Button::token(
                format!("🎁 {}", event.label),
                scope.wrap(AdminCommand::EventPanel { event_id: event.id }),
            )
        })
        .collect();

    Ok(Panel::text(text)
        .row(vec![
            action("💳 Card", ChatAction::Card),
            action("👥 Members", ChatAction::Members),
            action("📊 Report", ChatAction::Report),
            action("🔁 Change admin", ChatAction::ChangeAdmin),
        ])
        .row(event_buttons)
        .row(vec![
            Button::token("◀ Back", scope.wrap(AdminCommand::MyGroups { page: 1 })),
            close_button(),
        ]))
}

async fn open_events(app: &AppContext, chat_id: i64) -> Vec<event::Model> {
    store::get_many(
        &app.db,
        Condition::all()
            .add(event::Column::ChatId.eq(chat_id))
            .add(event::Column::Status.eq(true)),
    )
    .await
}

/// One of the chat settings sub-views.
pub async fn chat_action(
    app: &AppContext,
    chat: &chat::Model,
    action: ChatAction,
    page: usize,
    scope: Scope,
) -> Result<Panel> {
    let back = Button::token(
        "◀ Back",
        scope.wrap(AdminCommand::ChatSettings { chat_id: chat.id }),
    );
    match action {
        ChatAction::Card => Ok(Panel::text(format!(
            "💳 Current card: {}\nTo change it run `/card {} <16 digits>`.",
            chat.card_number, chat.id
        ))
        .row(vec![back, close_button()])),
        ChatAction::ChangeAdmin => Ok(Panel::text(format!(
            "🔁 To hand this group over run `/change_admin {} <phone>`.\n\
             The new admin must be registered and present in the chat.",
            chat.id
        ))
        .row(vec![back, close_button()])),
        ChatAction::Members => members_view(app, chat, page, scope, back).await,
        ChatAction::Report => report_view(app, chat, page, scope, back).await,
    }
}

fn page_nav(
    page: usize,
    pages: usize,
    to: impl Fn(usize) -> Intent,
    back: Button,
) -> Vec<Button> {
    let mut row = Vec::new();
    if page > 0 {
        row.push(Button::token("◀", to(page - 1)));
    }
    if page + 1 < pages {
        row.push(Button::token("▶", to(page + 1)));
    }
    row.push(back);
    row.push(close_button());
    row
}

async fn members_view(
    app: &AppContext,
    chat: &chat::Model,
    page: usize,
    scope: Scope,
    back: Button,
) -> Result<Panel> {
    let members = store::get_memberships(&app.db, chat.id).await;
    let pages = members.len().div_ceil(ROWS_PER_PAGE).max(1);
    let page = page.min(pages - 1);

    let mut panel = Panel::text(format!(
        "👥 Members ({}), page {}/{pages}\n✅ takes part, ❌ is not asked for money",
        members.len(),
        page + 1
    ));
    for (member, user) in members.iter().skip(page * ROWS_PER_PAGE).take(ROWS_PER_PAGE) {
        panel = panel.button(member_button(member, user, page, scope));
    }
    let nav = page_nav(
        page,
        pages,
        |p| {
            scope.wrap(AdminCommand::ChatAction {
                action: ChatAction::Members,
                chat_id: chat.id,
                page: p,
            })
        },
        back,
    );
    Ok(panel.row(nav))
}

fn member_button(member: &membership::Model, user: &user::Model, page: usize, scope: Scope) -> Button {
    let marker = if member.status { "✅" } else { "❌" };
    Button::token(
        format!("{marker} {}", user.first_name),
        scope.wrap(AdminCommand::ToggleMembership {
            membership_id: member.id,
            page,
        }),
    )
}

async fn report_view(
    app: &AppContext,
    chat: &chat::Model,
    page: usize,
    scope: Scope,
    back: Button,
) -> Result<Panel> {
    let mut rows: Vec<(contribution_report::Model, user::Model, String)> = Vec::new();
    for event in open_events(app, chat.id).await {
        for (report, user) in store::get_event_reports(&app.db, event.id).await {
            rows.push((report, user, event.label.clone()));
        }
    }
    let pages = rows.len().div_ceil(ROWS_PER_PAGE).max(1);
    let page = page.min(pages - 1);
    let paid = rows.iter().filter(|(report, ..)| report.status).count();

    let mut panel = Panel::text(format!(
        "📊 Contributions: {paid}/{} paid, page {}/{pages}\nPress a name to mark it paid or unpaid.",
        rows.len(),
        page + 1
    ));
    for (report, user, label) in rows.iter().skip(page * ROWS_PER_PAGE).take(ROWS_PER_PAGE) {
        let marker = if report.status { "✅" } else { "⏳" };
        panel = panel.button(Button::token(
            format!("{marker} {} → {label}", user.first_name),
            scope.wrap(AdminCommand::TogglePaid {
                report_id: report.id,
                page,
            }),
        ));
    }
    let nav = page_nav(
        page,
        pages,
        |p| {
            scope.wrap(AdminCommand::ChatAction {
                action: ChatAction::Report,
                chat_id: chat.id,
                page: p,
            })
        },
        back,
    );
    Ok(panel.row(nav))
}

/// Admin control panel of one event.
pub async fn event_panel(app: &AppContext, event: &event::Model, scope: Scope) -> Result<Panel> {
    let reports = store::get_event_reports(&app.db, event.id).await;
    let paid = reports.iter().filter(|(report, _)| report.status).count();

    let mut text = format!("🎁 Collection for {}\n", event.label);
    writeln!(text, "📅 {}", event.date_event.format("%d.%m.%Y"))?;
    writeln!(text, "💰 {} per person", event.amount)?;
    writeln!(text, "✅ {paid}/{} paid", reports.len())?;
    write!(text, "Status: {}", if event.status { "open" } else { "closed" })?;

    let toggle_label = if event.status { "🔒 Close event" } else { "🔓 Reopen event" };
    Ok(Panel::text(text)
        .row(vec![
            Button::token("💰 Other amount", scope.wrap(AdminCommand::EventAmount { event_id: event.id })),
            Button::token(toggle_label, scope.wrap(AdminCommand::ToggleEvent { event_id: event.id })),
            Button::token(
                "📊 Report",
                scope.wrap(AdminCommand::ChatAction {
                    action: ChatAction::Report,
                    chat_id: event.chat_id,
                    page: 0,
                }),
            ),
        ])
        .row(vec![
            Button::token("◀ Chat", scope.wrap(AdminCommand::ChatSettings { chat_id: event.chat_id })),
            close_button(),
        ]))
}

/// Explains how to override an event amount.
pub fn event_amount_help(event: &event::Model, scope: Scope) -> Panel {
    Panel::text(format!(
        "💰 Current amount: {}\nTo change it run `/amount {} <amount>`.",
        event.amount, event.id
    ))
    .row(vec![
        Button::token("◀ Back", scope.wrap(AdminCommand::EventPanel { event_id: event.id })),
        close_button(),
    ])
}

/// Explains how to change the birthday.
pub fn change_birthday(actor: &user::Model) -> Panel {
    let current = actor
        .birthday
        .map_or_else(|| "not set".to_string(), |b| b.format("%d.%m.%Y").to_string());
    Panel::text(format!(
        "🎂 Your birthday: {current}\nTo change it run `/birthday YYYY-MM-DD`."
    ))
    .row(vec![home_button(), close_button()])
}

/// Birthdays of everyone sharing a chat with the actor, sorted by month and day.
pub async fn calendar(app: &AppContext, actor: &user::Model, page: usize) -> Result<Panel> {
    let own: Vec<membership::Model> = store::get_many(
        &app.db,
        Condition::all().add(membership::Column::UserId.eq(actor.id)),
    )
    .await;

    let mut people: BTreeMap<i64, user::Model> = BTreeMap::new();
    if actor.birthday.is_some() {
        people.insert(actor.id, actor.clone());
    }
    for membership in own {
        for (_, user) in store::get_memberships(&app.db, membership.chat_id).await {
            if user.birthday.is_some() {
                people.insert(user.id, user);
            }
        }
    }

    let mut entries: Vec<(u32, u32, String)> = people
        .into_values()
        .filter_map(|user| {
            user.birthday
                .map(|b| (b.month(), b.day(), user.first_name.clone()))
        })
        .collect();
    entries.sort();

    let pages = entries.len().div_ceil(CALENDAR_PAGE).max(1);
    let page = page.min(pages - 1);
    let mut text = format!("📅 Birthdays, page {}/{pages}\n", page + 1);
    if entries.is_empty() {
        text.push_str("Nobody has shared a birthday yet.");
    }
    for (month, day, name) in entries.iter().skip(page * CALENDAR_PAGE).take(CALENDAR_PAGE) {
        writeln!(text, "{day:02}.{month:02} {name}")?;
    }

    let nav = page_nav(
        page,
        pages,
        |p| Intent::User(UserCommand::Calendar { page: p }),
        home_button(),
    );
    Ok(Panel::text(text).row(nav))
}

/// The actor's unpaid contributions for open events.
pub async fn my_contributions(app: &AppContext, actor: &user::Model) -> Result<Panel> {
    let pending: Vec<contribution_report::Model> = store::get_many(
        &app.db,
        Condition::all()
            .add(contribution_report::Column::UserId.eq(actor.id))
            .add(contribution_report::Column::Status.eq(false)),
    )
    .await;

    let mut text = String::from("💸 Your pending contributions:\n");
    let mut listed = 0;
    for report in pending {
        let Some(event) = store::get_by_id::<event::Model>(&app.db, report.event_id).await else {
            continue;
        };
        if !event.status {
            continue;
        }
        let card = store::get_by_id::<chat::Model>(&app.db, report.chat_id)
            .await
            .map_or_else(|| "unknown".to_string(), |chat| chat.card_number);
        writeln!(
            text,
            "🎁 {} ({}): {} to card {card}",
            event.label,
            event.date_event.format("%d.%m"),
            event.amount
        )?;
        listed += 1;
    }
    if listed == 0 {
        text = String::from("💸 You have no pending contributions. 🎉");
    }
    Ok(Panel::text(text).row(vec![home_button(), close_button()]))
}
