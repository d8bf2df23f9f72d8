//! Node identifier rules
//!
//! User ids must not contain [`SEPARATOR`]; it is reserved for the qualified
//! ids synthesized by forks (`base::fork_id`) and for the root id.

use crate::error::GraphError;

/// Reserved separator character
pub const SEPARATOR: char = ':';

/// Id of the synthetic root node present in every graph
pub const ROOT_ID: &str = "::root::";

/// Validate a caller-chosen id (node id or fork id)
pub fn validate_id(id: &str) -> Result<(), GraphError> {
    if id.is_empty() {
        return Err(GraphError::invalid_id(id, "id cannot be empty"));
    }
    if id.contains(SEPARATOR) {
        return Err(GraphError::invalid_id(
            id,
            format!("'{}' is reserved and cannot be used in an id", SEPARATOR),
        ));
    }
    Ok(())
}

/// Build the id of a forked copy of `node_id`
pub fn qualify(node_id: &str, fork_id: &str) -> String {
    format!("{}{}{}{}", node_id, SEPARATOR, SEPARATOR, fork_id)
}
