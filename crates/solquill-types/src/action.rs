//! Structured effects extracted from assistant text.

use serde::{Deserialize, Serialize};

/// One structured effect extracted from an assistant transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Plain text to relay to the user.
    Message { content: String },
    /// Create a new file at a synthesized path.
    CreateFile { path: String, content: String },
    /// Replace the content of the file currently being edited.
    EditFile { path: String, content: String },
    /// Remove a file.
    DeleteFile { path: String },
}

impl Action {
    /// Short tag naming the action kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Message { .. } => "message",
            Action::CreateFile { .. } => "create_file",
            Action::EditFile { .. } => "edit_file",
            Action::DeleteFile { .. } => "delete_file",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serde_tag() {
        let action = Action::EditFile {
            path: "contracts/Token.sol".to_string(),
            content: "contract Token {}".to_string(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "edit_file");
        assert_eq!(action.kind(), "edit_file");
    }
}
