//! Subcommand bodies. Each returns the text to print, if any.

use playtime_core::{render_no_data, render_report, render_reset};
use playtime_daemon_protocol::{
    Activity, ActivityKind, CommandEvent, CommandReply, PresenceUpdate, Verb,
};
use serde_json::Value;

use crate::daemon_client::DaemonClient;

pub struct PresenceArgs {
    pub user_id: String,
    pub username: Option<String>,
    pub bot: bool,
    pub games: Vec<String>,
    pub activities: Vec<Activity>,
}

pub fn presence(client: &DaemonClient, args: PresenceArgs) -> Result<Option<String>, String> {
    let mut activities: Vec<Activity> = args.games.into_iter().map(Activity::game).collect();
    activities.extend(args.activities);

    let update = PresenceUpdate {
        user_id: args.user_id,
        username: args.username,
        bot: args.bot,
        activities,
    };
    update.validate().map_err(|err| err.message)?;

    let data = client.send_presence(&update)?;
    tracing::info!(user_id = %update.user_id, outcome = %data, "Presence sent");
    Ok(Some(pretty(&data)?))
}

pub fn command(
    client: &DaemonClient,
    user_id: String,
    content: String,
    display_name: Option<String>,
) -> Result<Option<String>, String> {
    let event = CommandEvent {
        user_id,
        display_name,
        content,
    };
    event.validate().map_err(|err| err.message)?;

    let reply = client.send_command(&event)?;
    Ok(render_reply(event.display_name(), &reply))
}

pub fn verb(
    client: &DaemonClient,
    user_id: String,
    verb: Verb,
    display_name: Option<String>,
) -> Result<Option<String>, String> {
    command(client, user_id, verb.as_command().to_string(), display_name)
}

pub fn health(client: &DaemonClient) -> Result<Option<String>, String> {
    let data = client.health()?;
    Ok(Some(pretty(&data)?))
}

pub fn shutdown(client: &DaemonClient) -> Result<Option<String>, String> {
    client.shutdown()?;
    Ok(Some("playtime daemon stopping".to_string()))
}

/// `Ignored` renders nothing, matching the chat bot staying silent.
pub fn render_reply(name: &str, reply: &CommandReply) -> Option<String> {
    match reply {
        CommandReply::Report { totals } => Some(render_report(
            name,
            totals
                .iter()
                .map(|total| (total.activity.as_str(), total.seconds)),
        )),
        CommandReply::NoData => Some(render_no_data(name)),
        CommandReply::Reset { cleared } => Some(render_reset(name, *cleared)),
        CommandReply::Ignored => None,
    }
}

/// Parses `KIND:NAME`, e.g. `listening:Spotify`. The name may itself contain colons.
pub fn parse_activity(raw: &str) -> Result<Activity, String> {
    let (kind, name) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected KIND:NAME, got '{}'", raw))?;
    if name.trim().is_empty() {
        return Err(format!("activity name is empty in '{}'", raw));
    }
    let kind: ActivityKind =
        serde_json::from_value(Value::String(kind.trim().to_ascii_lowercase()))
            .map_err(|err| format!("unknown activity kind '{}': {}", kind, err))?;
    Ok(Activity {
        name: name.to_string(),
        kind,
    })
}

fn pretty(value: &Value) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| format!("Failed to render response: {}", err))
}
