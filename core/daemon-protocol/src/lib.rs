//! IPC protocol types and validation for playtime-daemon.
//!
//! This crate is shared by the daemon and its clients to prevent schema drift.
//! The daemon remains the authority on validation, but clients can reuse the
//! same types to construct valid requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024; // 1MB
pub const MAX_USER_ID_LEN: usize = 64;

pub const COMMAND_REPORT: &str = "!mygames";
pub const COMMAND_RESET: &str = "!cleargames";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Method {
    GetHealth,
    Presence,
    Command,
    Shutdown,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub protocol_version: u32,
    pub method: Method,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl Response {
    pub fn ok(id: Option<String>, data: Value) -> Self {
        Self {
            ok: true,
            id,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(ErrorInfo::new(code, message)),
        }
    }

    pub fn error_with_info(id: Option<String>, error: ErrorInfo) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(error),
        }
    }
}

/// Presence activity categories as reported by the chat platform.
/// Only [`ActivityKind::Game`] is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Game,
    Streaming,
    Listening,
    Watching,
    Custom,
    Competing,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    pub kind: ActivityKind,
}

impl Activity {
    pub fn game(name: impl Into<String>) -> Self {
        Activity {
            name: name.into(),
            kind: ActivityKind::Game,
        }
    }
}

/// A user's complete presence at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl PresenceUpdate {
    pub fn validate(&self) -> Result<(), ErrorInfo> {
        validate_user_id(&self.user_id)?;
        if self
            .activities
            .iter()
            .any(|activity| activity.name.trim().is_empty())
        {
            return Err(ErrorInfo::new(
                "invalid_activity",
                "activity name must not be empty",
            ));
        }
        Ok(())
    }

    /// Names of game activities, compared by exact string equality.
    pub fn tracked_activities(&self) -> BTreeSet<String> {
        self.activities
            .iter()
            .filter(|activity| activity.kind == ActivityKind::Game)
            .map(|activity| activity.name.clone())
            .collect()
    }

    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.user_id)
    }
}

/// Raw chat message text from a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEvent {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub content: String,
}

impl CommandEvent {
    pub fn validate(&self) -> Result<(), ErrorInfo> {
        validate_user_id(&self.user_id)
    }

    pub fn verb(&self) -> Option<Verb> {
        Verb::parse(&self.content)
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Report,
    Reset,
}

impl Verb {
    /// Recognizes exactly the two command strings; anything else is `None`.
    pub fn parse(content: &str) -> Option<Self> {
        match content.trim() {
            COMMAND_REPORT => Some(Verb::Report),
            COMMAND_RESET => Some(Verb::Reset),
            _ => None,
        }
    }

    pub fn as_command(&self) -> &'static str {
        match self {
            Verb::Report => COMMAND_REPORT,
            Verb::Reset => COMMAND_RESET,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTotal {
    pub activity: String,
    pub seconds: f64,
}

/// Structured result of a command; rendering is left to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandReply {
    Report { totals: Vec<ActivityTotal> },
    NoData,
    Reset { cleared: bool },
    Ignored,
}

pub fn parse_presence(params: Value) -> Result<PresenceUpdate, ErrorInfo> {
    let update: PresenceUpdate = serde_json::from_value(params).map_err(|err| {
        ErrorInfo::new(
            "invalid_params",
            format!("presence payload is invalid JSON: {}", err),
        )
    })?;
    update.validate()?;
    Ok(update)
}

pub fn parse_command(params: Value) -> Result<CommandEvent, ErrorInfo> {
    let command: CommandEvent = serde_json::from_value(params).map_err(|err| {
        ErrorInfo::new(
            "invalid_params",
            format!("command payload is invalid JSON: {}", err),
        )
    })?;
    command.validate()?;
    Ok(command)
}

fn validate_user_id(user_id: &str) -> Result<(), ErrorInfo> {
    if user_id.trim().is_empty() {
        return Err(ErrorInfo::new("missing_field", "user_id is required"));
    }
    if user_id.len() > MAX_USER_ID_LEN {
        return Err(ErrorInfo::new(
            "invalid_user_id",
            format!("user_id must be {} characters or fewer", MAX_USER_ID_LEN),
        ));
    }
    Ok(())
}
