//! Human-readable rendering for command replies.

/// Formats whole seconds as `1d 2h 3m 4s`, dropping zero components.
/// Always shows at least the seconds component.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let days = total / 86_400;
    let hours = (total / 3_600) % 24;
    let minutes = (total / 60) % 60;
    let secs = total % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{}s", secs));
    }
    parts.join(" ")
}

pub fn render_report<'a>(name: &str, totals: impl IntoIterator<Item = (&'a str, f64)>) -> String {
    let mut response = format!("Here are your tracked game play times, {}:\n", name);
    for (activity, seconds) in totals {
        response.push_str(&format!(
            "- **{}**: {}\n",
            activity,
            format_duration(seconds)
        ));
    }
    response
}

pub fn render_no_data(name: &str) -> String {
    format!("Hey {}, I haven't tracked any games for you yet!", name)
}

pub fn render_reset(name: &str, cleared: bool) -> String {
    if cleared {
        format!("Hey {}, your game tracking data has been cleared!", name)
    } else {
        format!("Hey {}, you don't have any game data to clear!", name)
    }
}
