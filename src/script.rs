use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;

use crate::model::{Message, MessageStatus, Role};

pub const SENDER_MARKER: char = '>';
pub const RECEIVER_MARKER: char = '<';

pub const DEFAULT_SCRIPT: &str = "> Yo! How's your day going?
< Pretty good, just built a chat maker app.
> No way, that's sick!
< Yeah, check it out!";

static MARKER_PREFIX: OnceLock<Regex> = OnceLock::new();

fn marker_prefix() -> &'static Regex {
    MARKER_PREFIX.get_or_init(|| Regex::new(r"^[><]\s*").expect("marker regex is valid"))
}

/// Parses a script using the local wall clock for timestamps.
pub fn parse_script_now(script: &str, status: MessageStatus) -> Vec<Message> {
    parse_script(script, status, Local::now())
}

/// Turns script text into messages, in line order.
///
/// Blank lines are skipped. A non-blank line whose first non-whitespace
/// character is neither marker is dropped without error, but it still
/// consumes an index, so ids are `"{position among non-blank lines}-{text}"`.
/// Every message of one call shares the timestamp taken from `now`.
/// A leading byte order mark is ignored.
pub fn parse_script(script: &str, status: MessageStatus, now: DateTime<Local>) -> Vec<Message> {
    let timestamp = format_timestamp(&now);

    strip_bom(script)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .filter_map(|(index, line)| {
            let (role, text) = classify_line(line)?;
            Some(Message {
                id: format!("{index}-{text}"),
                text: text.to_owned(),
                sender: role,
                timestamp: timestamp.clone(),
                status: (role == Role::Sender).then_some(status),
            })
        })
        .collect()
}

pub fn strip_bom(script: &str) -> &str {
    script.strip_prefix('\u{feff}').unwrap_or(script)
}

/// Role and trimmed body for a marked line, `None` for anything else.
pub fn classify_line(line: &str) -> Option<(Role, &str)> {
    let trimmed = line.trim_start();
    let role = match trimmed.chars().next()? {
        SENDER_MARKER => Role::Sender,
        RECEIVER_MARKER => Role::Receiver,
        _ => return None,
    };
    let body = marker_prefix()
        .find(trimmed)
        .map_or(trimmed, |prefix| &trimmed[prefix.end()..]);
    Some((role, body.trim()))
}

/// Hour and minute on a 24h clock, zero padded.
pub fn format_timestamp(now: &DateTime<Local>) -> String {
    now.format("%H:%M").to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScriptStats {
    pub lines: usize,
    pub blank: usize,
    pub dropped: usize,
    pub sender: usize,
    pub receiver: usize,
}

pub fn script_stats(script: &str) -> ScriptStats {
    let mut stats = ScriptStats::default();
    for line in strip_bom(script).lines() {
        stats.lines += 1;
        if line.trim().is_empty() {
            stats.blank += 1;
            continue;
        }
        match classify_line(line) {
            Some((Role::Sender, _)) => stats.sender += 1,
            Some((Role::Receiver, _)) => stats.receiver += 1,
            None => stats.dropped += 1,
        }
    }
    stats
}
