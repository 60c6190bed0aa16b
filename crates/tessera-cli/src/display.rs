//! Terminal rendering of replies and log entries.

use serde_json::Value;
use tessera_core::Degradation;
use tessera_types::truncate_str;

/// Longest field value shown in a log summary line.
const MAX_FIELD_BYTES: usize = 60;

/// One-line summary of a log entry: its timestamp, then the other fields.
pub fn summarize_entry(entry: &Value) -> String {
    let Value::Object(map) = entry else {
        return truncated(&entry.to_string());
    };

    let timestamp = map.get("timestamp").and_then(Value::as_str).unwrap_or("?");
    let parts: Vec<String> = map
        .iter()
        .filter(|(k, _)| k.as_str() != "timestamp")
        .map(|(k, v)| {
            let val = match v {
                Value::String(s) => truncated(s),
                other => truncated(&other.to_string()),
            };
            format!("{k}: {val}")
        })
        .collect();
    format!("{timestamp}  {}", parts.join(", "))
}

fn truncated(s: &str) -> String {
    let single_line = s.replace('\n', " ");
    let cut = truncate_str(&single_line, MAX_FIELD_BYTES);
    if cut.len() < single_line.len() {
        format!("{cut}...")
    } else {
        single_line
    }
}

pub fn print_degraded(degraded: &[Degradation]) {
    for d in degraded {
        eprintln!("  [{} degraded: {}]", d.stage.as_str(), d.message);
    }
}

pub fn print_help() {
    eprintln!("Available commands:");
    eprintln!("  /audio <path>         Transcribe an audio file and reply to it");
    eprintln!("  /image <path-or-url>  Caption and OCR an image, then reply to it");
    eprintln!("  /speak                Toggle spoken replies");
    eprintln!("  /context              Show context window usage");
    eprintln!("  /log <feature> [n]    Show the last n entries of chat, speech, image or synthesis");
    eprintln!("  /help                 Show this help");
    eprintln!("  /quit                 Exit");
}
