// Serialized form of the todo collection

use crate::models::Todo;
use eyre::{Context, Result};
use tracing::{debug, warn};

/// Serialize the whole collection as one JSON array
pub fn encode_collection(todos: &[Todo]) -> Result<Vec<u8>> {
    serde_json::to_vec(todos).context("Failed to serialize todo collection")
}

/// Deserialize a stored collection
///
/// A missing value is an empty collection. So is a malformed one (bad JSON,
/// wrong shape, invalid UTF-8, a truncated write): the failure is logged and
/// the caller starts over rather than erroring out.
pub fn decode_collection(raw: Option<&[u8]>) -> Vec<Todo> {
    let raw = match raw {
        Some(raw) if !raw.trim_ascii().is_empty() => raw,
        _ => {
            debug!("No stored collection, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_slice::<Vec<Todo>>(raw) {
        Ok(todos) => {
            debug!(count = todos.len(), "Decoded stored collection");
            todos
        }
        Err(e) => {
            warn!(error = ?e, len = raw.len(), "Stored collection is malformed, starting empty");
            Vec::new()
        }
    }
}
