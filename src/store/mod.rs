use thiserror::Error;
use tracing::instrument;

pub mod models;
mod validate;

pub use models::EmoteState;

pub type StoreResult<T> = core::result::Result<T, StoreError>;

/// Parses a serialized state document into typed state.
///
/// The document is validated structurally as a whole before deserialization,
/// so a corrupted file surfaces every schema violation at once. Absence of a
/// state file is not this function's concern; the caller starts empty in
/// that case.
#[instrument(skip(text), fields(bytes = text.len()))]
pub fn load(text: &str) -> StoreResult<EmoteState> {
    let doc: serde_json::Value = serde_json::from_str(text)?;

    let issues = validate::check(&doc);
    if !issues.is_empty() {
        tracing::error!(count = issues.len(), "state document failed validation");
        return Err(StoreError::Validation { issues });
    }

    Ok(serde_json::from_value(doc)?)
}

/// Encodes state as pretty-printed JSON with a trailing newline.
///
/// Output is deterministic for identical contents: struct fields serialize
/// in declaration order and the vod map iterates sorted by id.
#[instrument(skip(state), fields(records = state.data.len()))]
pub fn serialize(state: &EmoteState) -> StoreResult<String> {
    let mut text = serde_json::to_string_pretty(state)?;
    text.push('\n');

    Ok(text)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("malformed state document: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("state document failed schema validation:\n  {}", issues.join("\n  "))]
    Validation { issues: Vec<String> },
}
