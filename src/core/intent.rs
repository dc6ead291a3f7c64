//! Button tokens and the intents they decode to.
//!
//! Every action button carries a token `0:<segment>[:<args>]`. The `0:`
//! namespace marks tokens owned by the router; anything else is free text.
//! Tokens always embed numeric row ids, never list positions.
//!
//! Grammar after the namespace:
//! - `x`, `m`, `b`: dismiss, home, back
//! - `user:birthday`, `user:calendar:<page>`, `user:contributions`
//! - `admin:<command>` and `super:<command>`, where `<command>` is one of
//!   `groups[:<page>]`, `chat:<id>`, `set:<card|users|report|change_admin>:<id>[:<page>]`,
//!   `event:<id>`, `event_amount:<id>`, `event_status:<id>`,
//!   `member:<id>:<page>`, `paid:<id>:<page>`
//! - `super:list:<page>`, `super:add_chat`

use std::fmt;
use std::str::FromStr;

/// Prefix of every router-owned token.
pub const NAMESPACE: &str = "0:";

/// A decoded button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Close the panel
    Dismiss,
    /// Replace the panel with a fresh main menu
    Home,
    /// Re-render the main menu in place
    Back,
    /// Views open to every user
    User(UserCommand),
    /// Chat admin commands, limited to owned chats
    Admin(AdminCommand),
    /// Super admin commands
    Super(SuperCommand),
}

/// Commands behind the `user` segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// Explains how to set a birthday
    ChangeBirthday,
    /// Birthdays of people sharing a chat with the actor
    Calendar {
        /// Zero-based page
        page: usize,
    },
    /// The actor's unpaid contributions
    MyContributions,
}

/// Settings sub-views of a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    /// How to change the payment card
    Card,
    /// Members with participation toggles
    Members,
    /// Contribution reports with paid toggles
    Report,
    /// How to hand the chat over
    ChangeAdmin,
}

impl ChatAction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Members => "users",
            Self::Report => "report",
            Self::ChangeAdmin => "change_admin",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "card" => Some(Self::Card),
            "users" => Some(Self::Members),
            "report" => Some(Self::Report),
            "change_admin" => Some(Self::ChangeAdmin),
            _ => None,
        }
    }
}

/// Commands available to chat admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    /// Chats owned by the actor
    MyGroups {
        /// One-based window, wrapping at both ends
        page: usize,
    },
    /// Settings panel of one chat
    ChatSettings {
        /// Chat row id
        chat_id: i64,
    },
    /// A settings sub-view
    ChatAction {
        /// Which sub-view
        action: ChatAction,
        /// Chat row id
        chat_id: i64,
        /// Zero-based page for paginated views
        page: usize,
    },
    /// Control panel of an event
    EventPanel {
        /// Event row id
        event_id: i64,
    },
    /// Explains how to override the amount
    EventAmount {
        /// Event row id
        event_id: i64,
    },
    /// Close or reopen an event
    ToggleEvent {
        /// Event row id
        event_id: i64,
    },
    /// Flip a member's participation
    ToggleMembership {
        /// Membership row id
        membership_id: i64,
        /// Page to re-render
        page: usize,
    },
    /// Flip a report's paid flag
    TogglePaid {
        /// Report row id
        report_id: i64,
        /// Page to re-render
        page: usize,
    },
}

/// Commands available to super admins only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuperCommand {
    /// Paginated list of every chat
    ManageChats {
        /// One-based window number; out-of-range values wrap
        page: usize,
    },
    /// Explains how to register a chat
    AddChat,
    /// An admin command on any chat
    Act(AdminCommand),
}

/// Which role segment admin commands are rendered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `admin:` tokens
    Admin,
    /// `super:` tokens
    Super,
}

impl Scope {
    /// Wraps an admin command in this scope.
    pub const fn wrap(self, command: AdminCommand) -> Intent {
        match self {
            Self::Admin => Intent::Admin(command),
            Self::Super => Intent::Super(SuperCommand::Act(command)),
        }
    }
}

/// Token that is not router-owned or does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized token")]
pub struct UnknownToken;

impl FromStr for Intent {
    type Err = UnknownToken;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let body = token.strip_prefix(NAMESPACE).ok_or(UnknownToken)?;
        let parts: Vec<&str> = body.split(':').collect();
        match parts.as_slice() {
            ["x"] => Ok(Self::Dismiss),
            ["m"] => Ok(Self::Home),
            ["b"] => Ok(Self::Back),
            ["user", rest @ ..] => parse_user(rest).map(Self::User),
            ["admin", rest @ ..] => parse_admin(rest).map(Self::Admin),
            ["super", "list", page] => Ok(Self::Super(SuperCommand::ManageChats {
                page: number(page)?,
            })),
            ["super", "add_chat"] => Ok(Self::Super(SuperCommand::AddChat)),
            ["super", rest @ ..] => parse_admin(rest).map(|c| Self::Super(SuperCommand::Act(c))),
            _ => Err(UnknownToken),
        }
    }
}

fn parse_user(parts: &[&str]) -> Result<UserCommand, UnknownToken> {
    match parts {
        ["birthday"] => Ok(UserCommand::ChangeBirthday),
        ["calendar", page] => Ok(UserCommand::Calendar { page: number(page)? }),
        ["contributions"] => Ok(UserCommand::MyContributions),
        _ => Err(UnknownToken),
    }
}

fn parse_admin(parts: &[&str]) -> Result<AdminCommand, UnknownToken> {
    match parts {
        ["groups"] => Ok(AdminCommand::MyGroups { page: 1 }),
        ["groups", page] => Ok(AdminCommand::MyGroups { page: number(page)? }),
        ["chat", id] => Ok(AdminCommand::ChatSettings { chat_id: id_of(id)? }),
        ["set", action, id] => Ok(AdminCommand::ChatAction {
            action: ChatAction::parse(action).ok_or(UnknownToken)?,
            chat_id: id_of(id)?,
            page: 0,
        }),
        ["set", action, id, page] => Ok(AdminCommand::ChatAction {
            action: ChatAction::parse(action).ok_or(UnknownToken)?,
            chat_id: id_of(id)?,
            page: number(page)?,
        }),
        ["event", id] => Ok(AdminCommand::EventPanel { event_id: id_of(id)? }),
        ["event_amount", id] => Ok(AdminCommand::EventAmount { event_id: id_of(id)? }),
        ["event_status", id] => Ok(AdminCommand::ToggleEvent { event_id: id_of(id)? }),
        ["member", id, page] => Ok(AdminCommand::ToggleMembership {
            membership_id: id_of(id)?,
            page: number(page)?,
        }),
        ["paid", id, page] => Ok(AdminCommand::TogglePaid {
            report_id: id_of(id)?,
            page: number(page)?,
        }),
        _ => Err(UnknownToken),
    }
}

fn id_of(raw: &str) -> Result<i64, UnknownToken> {
    raw.parse().map_err(|_| UnknownToken)
}

fn number(raw: &str) -> Result<usize, UnknownToken> {
    raw.parse().map_err(|_| UnknownToken)
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(NAMESPACE)?;
        match self {
            Self::Dismiss => f.write_str("x"),
            Self::Home => f.write_str("m"),
            Self::Back => f.write_str("b"),
            Self::User(UserCommand::ChangeBirthday) => f.write_str("user:birthday"),
            Self::User(UserCommand::Calendar { page }) => write!(f, "user:calendar:{page}"),
            Self::User(UserCommand::MyContributions) => f.write_str("user:contributions"),
            Self::Admin(command) => write!(f, "admin:{}", AdminToken(command)),
            Self::Super(SuperCommand::ManageChats { page }) => write!(f, "super:list:{page}"),
            Self::Super(SuperCommand::AddChat) => f.write_str("super:add_chat"),
            Self::Super(SuperCommand::Act(command)) => write!(f, "super:{}", AdminToken(command)),
        }
    }
}

struct AdminToken<'a>(&'a AdminCommand);

impl fmt::Display for AdminToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self.0 {
            AdminCommand::MyGroups { page } => write!(f, "groups:{page}"),
            AdminCommand::ChatSettings { chat_id } => write!(f, "chat:{chat_id}"),
            AdminCommand::ChatAction {
                action,
                chat_id,
                page,
            } => write!(f, "set:{}:{chat_id}:{page}", action.as_str()),
            AdminCommand::EventPanel { event_id } => write!(f, "event:{event_id}"),
            AdminCommand::EventAmount { event_id } => write!(f, "event_amount:{event_id}"),
            AdminCommand::ToggleEvent { event_id } => write!(f, "event_status:{event_id}"),
            AdminCommand::ToggleMembership {
                membership_id,
                page,
            } => write!(f, "member:{membership_id}:{page}"),
            AdminCommand::TogglePaid { report_id, page } => write!(f, "paid:{report_id}:{page}"),
        }
    }
}
