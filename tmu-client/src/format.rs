//! Display helpers shared by every view.

use chrono::{DateTime, Utc};

/// Compact counter: `1.2K`, `3.4M`, or the plain number below a thousand.
pub fn format_count(n: u64) -> String {
    if n < 1_000 {
        return n.to_string();
    }
    // Round to tenths before picking the unit: 999_950 is 1.0M, not 1000.0K
    let tenths = n.saturating_add(50) / 100;
    if tenths < 10_000 {
        return format!("{}.{}K", tenths / 10, tenths % 10);
    }
    let tenths = n.saturating_add(50_000) / 100_000;
    format!("{}.{}M", tenths / 10, tenths % 10)
}

/// Feed timestamp: `now`, `5m`, `3h`, `2d`, then `Mar 4`.
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "now".to_string()
    } else if minutes < 60 {
        format!("{}m", minutes)
    } else if hours < 24 {
        format!("{}h", hours)
    } else if days < 7 {
        format!("{}d", days)
    } else {
        at.format("%b %-d").to_string()
    }
}

/// Announcement timestamp: `Today, 9:05 AM`, `Yesterday, ...`, `3 days ago`, then the full date.
pub fn announcement_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = now.signed_duration_since(at).num_days();
    let clock = at.format("%-I:%M %p");
    match days {
        d if d < 1 => format!("Today, {}", clock),
        1 => format!("Yesterday, {}", clock),
        d if d < 7 => format!("{} days ago", d),
        _ => at.format("%b %-d, %Y").to_string(),
    }
}
