//! Command messages.
//!
//! A command addresses a handler through a `:`-delimited node path and
//! names the verb to perform. Positional parameters ride in the node
//! path itself, e.g. `channels:42:snapshot` carries the parameter `42`.

use crate::error::{MessageError, Result};
use crate::message::Message;
use serde::{Deserialize, Serialize};

/// Delimiter between node path segments.
pub const NODE_DELIMITER: char = ':';

/// A control command: routing node path plus an action verb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(flatten)]
    pub message: Message,
    pub node: String,
    pub action: String,
}

impl Command {
    pub fn new(node: impl Into<String>, action: impl Into<String>) -> Self {
        Command {
            message: Message::new(),
            node: node.into(),
            action: action.into(),
        }
    }

    /// A command is valid when both node and action are non-empty.
    pub fn valid(&self) -> bool {
        !self.node.is_empty() && !self.action.is_empty()
    }

    /// Positional parameter at index `n` of the node path, if present.
    pub fn param(&self, n: usize) -> Option<&str> {
        self.node.split(NODE_DELIMITER).nth(n)
    }

    /// All positional parameters of the node path.
    pub fn params(&self) -> Vec<&str> {
        self.node.split(NODE_DELIMITER).collect()
    }

    /// Segment-wise match of the node path against a pattern.
    ///
    /// A `*` segment matches any single segment; segment counts must
    /// agree. `matches("channels:*:snapshot")` accepts
    /// `channels:42:snapshot` but not `channels:42`.
    pub fn matches(&self, pattern: &str) -> bool {
        let ours: Vec<&str> = self.node.split(NODE_DELIMITER).collect();
        let theirs: Vec<&str> = pattern.split(NODE_DELIMITER).collect();
        if ours.len() != theirs.len() {
            return false;
        }
        ours.iter()
            .zip(theirs.iter())
            .all(|(a, b)| *b == "*" || a == b)
    }

    /// Parse and validate a command from its wire representation.
    pub fn from_json(json: &str) -> Result<Self> {
        let cmd: Command = serde_json::from_str(json)?;
        if !cmd.valid() {
            return Err(MessageError::Invalid(
                "command requires a non-empty node and action".into(),
            ));
        }
        Ok(cmd)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn validity_requires_node_and_action() {
        assert!(Command::new("channels:42", "snapshot").valid());
        assert!(!Command::new("", "snapshot").valid());
        assert!(!Command::new("channels:42", "").valid());
    }

    #[test]
    fn positional_params_come_from_the_node_path() {
        let cmd = Command::new("channels:42:video", "start");
        assert_eq!(cmd.param(0), Some("channels"));
        assert_eq!(cmd.param(1), Some("42"));
        assert_eq!(cmd.param(2), Some("video"));
        assert_eq!(cmd.param(3), None);
        assert_eq!(cmd.params(), vec!["channels", "42", "video"]);
    }

    #[test]
    fn wildcard_matching_is_segment_wise() {
        let cmd = Command::new("channels:42:snapshot", "take");
        assert!(cmd.matches("channels:42:snapshot"));
        assert!(cmd.matches("channels:*:snapshot"));
        assert!(cmd.matches("*:*:*"));
        assert!(!cmd.matches("channels:42"));
        assert!(!cmd.matches("channels:43:snapshot"));
    }

    #[test]
    fn invalid_wire_command_is_rejected() {
        let json = r#"{"id":"1","node":"","action":"snapshot"}"#;
        assert!(matches!(
            Command::from_json(json),
            Err(MessageError::Invalid(_))
        ));

        let json = r#"{"id":"1","node":"channels:42","action":"snapshot"}"#;
        let cmd = Command::from_json(json).unwrap();
        assert_eq!(cmd.param(1), Some("42"));
    }
}
