//! Structural validation of a persisted state document.
//!
//! Runs against the raw JSON value before typed deserialization so a
//! corrupted file reports every shape problem in one pass instead of bailing
//! at the first bad field.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Checks `doc` against the persisted-state schema, returning one entry per
/// violation (empty means the document is safe to deserialize).
pub fn check(doc: &Value) -> Vec<String> {
    let mut issues = Vec::new();

    let Some(root) = doc.as_object() else {
        issues.push("root: expected an object".to_string());
        return issues;
    };

    let Some(data) = root.get("data") else {
        issues.push("root: missing field `data`".to_string());
        return issues;
    };

    let Some(entries) = data.as_object() else {
        issues.push("data: expected an object keyed by vod id".to_string());
        return issues;
    };

    for (vod_id, record) in entries {
        check_record(vod_id, record, &mut issues);
    }

    issues
}

fn check_record(vod_id: &str, record: &Value, issues: &mut Vec<String>) {
    let path = format!("data.{vod_id}");

    let Some(record) = record.as_object() else {
        issues.push(format!("{path}: expected an object"));
        return;
    };

    match record.get("info") {
        Some(info) => check_info(&path, info, issues),
        None => issues.push(format!("{path}: missing field `info`")),
    }

    match record.get("emotes") {
        Some(Value::Array(emotes)) => {
            for (i, emote) in emotes.iter().enumerate() {
                check_emote(&format!("{path}.emotes[{i}]"), emote, issues);
            }
        }
        Some(_) => issues.push(format!("{path}.emotes: expected an array")),
        None => issues.push(format!("{path}: missing field `emotes`")),
    }
}

fn check_info(path: &str, info: &Value, issues: &mut Vec<String>) {
    let path = format!("{path}.info");

    let Some(info) = info.as_object() else {
        issues.push(format!("{path}: expected an object"));
        return;
    };

    for field in ["id", "title"] {
        if !info.get(field).is_some_and(Value::is_string) {
            issues.push(format!("{path}.{field}: expected a string"));
        }
    }

    for field in ["created", "published"] {
        match info.get(field).and_then(Value::as_str) {
            Some(raw) if raw.parse::<DateTime<Utc>>().is_ok() => {}
            Some(raw) => issues.push(format!("{path}.{field}: unparseable timestamp `{raw}`")),
            None => issues.push(format!("{path}.{field}: expected an RFC 3339 string")),
        }
    }
}

fn check_emote(path: &str, emote: &Value, issues: &mut Vec<String>) {
    let Some(emote) = emote.as_object() else {
        issues.push(format!("{path}: expected an object"));
        return;
    };

    if !emote.get("name").is_some_and(Value::is_string) {
        issues.push(format!("{path}.name: expected a string"));
    }

    match emote.get("users") {
        Some(Value::Array(users)) => {
            for (i, user) in users.iter().enumerate() {
                check_user(&format!("{path}.users[{i}]"), user, issues);
            }
        }
        Some(_) => issues.push(format!("{path}.users: expected an array")),
        None => issues.push(format!("{path}: missing field `users`")),
    }
}

fn check_user(path: &str, user: &Value, issues: &mut Vec<String>) {
    let Some(user) = user.as_object() else {
        issues.push(format!("{path}: expected an object"));
        return;
    };

    if !user.get("display_name").is_some_and(Value::is_string) {
        issues.push(format!("{path}.display_name: expected a string"));
    }

    if !user.get("use_index").is_some_and(Value::is_u64) {
        issues.push(format!("{path}.use_index: expected a non-negative integer"));
    }
}
