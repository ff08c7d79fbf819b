use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::api::EpisodeRecord;

/// One playable item, normalised once per fetch and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub members: String,
    pub published_at: String,
    pub thumbnail: String,
    pub description: String,
    pub duration: u64,
    pub duration_display: String,
    pub url: String,
}

impl Episode {
    pub fn from_record(record: EpisodeRecord) -> Self {
        let duration = parse_duration_seconds(&record.duration);
        Self {
            id: record.name,
            title: record.title,
            members: record.members,
            published_at: format_published_at(&record.published_at),
            thumbnail: record.thumbnail,
            description: record.description,
            duration,
            duration_display: format_duration(duration),
            url: record.url,
        }
    }
}

/// Accepts `125`, `125.9` or `"125"`; anything else (including negatives) is 0.
pub(crate) fn parse_duration_seconds(raw: &Value) -> u64 {
    let seconds = match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match seconds {
        Some(value) if value.is_finite() && value > 0.0 => value.floor() as u64,
        _ => 0,
    }
}

pub(crate) fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

pub(crate) fn parse_published_at(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_utc());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed);
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(parsed);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub(crate) fn format_published_at(raw: &str) -> String {
    match parse_published_at(raw) {
        Some(parsed) => parsed.format("%-d %b %y").to_string(),
        None => raw.trim().to_string(),
    }
}

/// Splits a listing into its "latest" head and the rest. Both halves index
/// into the same combined queue: the rest starts at `latest.len()`.
pub(crate) fn split_latest(episodes: &[Episode], count: usize) -> (&[Episode], &[Episode]) {
    episodes.split_at(count.min(episodes.len()))
}

pub(crate) fn strip_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    let mut tag = String::new();
    for ch in raw.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let name = tag
                    .trim_start_matches('/')
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_ascii_lowercase();
                if matches!(name.as_str(), "p" | "br" | "br/" | "li" | "div") {
                    out.push('\n');
                }
            }
            _ if in_tag => tag.push(ch),
            _ => out.push(ch),
        }
    }

    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    decoded
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn truncate(input: &str, max_chars: usize) -> String {
    let char_count = input.chars().count();
    if char_count <= max_chars {
        return input.to_string();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let mut out = input.chars().take(max_chars - 3).collect::<String>();
    out.push_str("...");
    out
}
