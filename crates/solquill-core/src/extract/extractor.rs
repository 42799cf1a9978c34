//! Line-oriented extractor for assistant responses.
//!
//! The assistant answers in prose with fenced code blocks. A fenced block in
//! the target language becomes a file operation: an edit of the file being
//! worked on when there is one, a new file otherwise. A block introduced by a
//! suggestion line ("Consider: ...") is only shown as an example and never
//! touches files. Every other non-blank line is relayed as a message.
//!
//! Extraction is a pure function of the text and the editing target.

use solquill_types::action::Action;
use solquill_types::file::DEFAULT_LANGUAGE;

/// Case-insensitive markers that turn the next fenced block into an example.
pub const SUGGESTION_KEYWORDS: &[&str] = &[
    "suggestion:",
    "idea:",
    "you could:",
    "consider:",
    "recommendation:",
    "proposal:",
];

const FENCE: &str = "```";

/// Classifies assistant text into an ordered list of [`Action`]s.
#[derive(Debug, Clone)]
pub struct ActionExtractor {
    language: String,
    open_marker: String,
}

impl Default for ActionExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl ActionExtractor {
    /// Extractor for fences tagged with `language`.
    pub fn new(language: impl Into<String>) -> Self {
        let language = language.into();
        let open_marker = format!("{FENCE}{language}");
        Self {
            language,
            open_marker,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Extract actions from `text`.
    ///
    /// `editing` is the path of the file currently being edited. When set,
    /// every non-suggestion block edits that file; otherwise each block
    /// creates a new file. An unterminated block yields nothing.
    pub fn extract(&self, text: &str, editing: Option<&str>) -> Vec<Action> {
        let mut actions = Vec::new();
        let mut in_fence = false;
        let mut suggestion_pending = false;
        let mut buffer = String::new();

        for line in text.split('\n') {
            if !in_fence && is_suggestion(line) {
                suggestion_pending = true;
                actions.push(Action::Message {
                    content: line.trim().to_string(),
                });
                continue;
            }

            if line.starts_with(&self.open_marker) {
                in_fence = true;
                buffer.clear();
                continue;
            }

            if in_fence && line.starts_with(FENCE) {
                in_fence = false;
                let code = buffer.trim();
                if !code.is_empty() {
                    let action = if suggestion_pending {
                        Action::Message {
                            content: format!(
                                "Example code:\n{FENCE}{}\n{code}\n{FENCE}",
                                self.language
                            ),
                        }
                    } else if let Some(path) = editing {
                        Action::EditFile {
                            path: path.to_string(),
                            content: code.to_string(),
                        }
                    } else {
                        Action::CreateFile {
                            path: format!("contracts/Contract_{}.sol", actions.len()),
                            content: code.to_string(),
                        }
                    };
                    actions.push(action);
                }
                suggestion_pending = false;
                continue;
            }

            if in_fence {
                buffer.push_str(line);
                buffer.push('\n');
            } else if !line.trim().is_empty() {
                actions.push(Action::Message {
                    content: line.trim().to_string(),
                });
            }
        }

        actions
    }
}

fn is_suggestion(line: &str) -> bool {
    let lower = line.to_lowercase();
    SUGGESTION_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ActionExtractor {
        ActionExtractor::default()
    }

    #[test]
    fn test_suggestion_block_yields_two_messages() {
        let text = "Suggestion: try this\n```solidity\ncontract A{}\n```";
        let actions = extractor().extract(text, None);

        assert_eq!(
            actions,
            vec![
                Action::Message {
                    content: "Suggestion: try this".to_string()
                },
                Action::Message {
                    content: "Example code:\n```solidity\ncontract A{}\n```".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_block_edits_current_file() {
        let text = "```solidity\ncontract A{}\n```";
        let actions = extractor().extract(text, Some("contracts/A.sol"));
        assert_eq!(
            actions,
            vec![Action::EditFile {
                path: "contracts/A.sol".to_string(),
                content: "contract A{}".to_string()
            }]
        );
    }

    #[test]
    fn test_block_creates_file_when_not_editing() {
        let text = "```solidity\ncontract A{}\n```";
        let actions = extractor().extract(text, None);
        assert_eq!(
            actions,
            vec![Action::CreateFile {
                path: "contracts/Contract_0.sol".to_string(),
                content: "contract A{}".to_string()
            }]
        );
    }

    #[test]
    fn test_synthesized_path_counts_prior_actions() {
        let text = "Here is your token.\n\n```solidity\ncontract T {}\n```\nDone.";
        let actions = extractor().extract(text, None);
        assert_eq!(actions.len(), 3);
        assert!(matches!(
            &actions[1],
            Action::CreateFile { path, .. } if path == "contracts/Contract_1.sol"
        ));
        assert_eq!(
            actions[2],
            Action::Message {
                content: "Done.".to_string()
            }
        );
    }

    #[test]
    fn test_unterminated_fence_yields_nothing() {
        let text = "```solidity\ncontract A {\n  uint x;";
        assert!(extractor().extract(text, None).is_empty());

        let text = "Intro\n```solidity\ncontract A {}";
        assert_eq!(extractor().extract(text, None).len(), 1);
    }

    #[test]
    fn test_blank_block_is_skipped_and_resets_suggestion() {
        let text = "Consider: nothing\n```solidity\n   \n```\n```solidity\ncontract B {}\n```";
        let actions = extractor().extract(text, None);
        assert_eq!(actions.len(), 2);
        assert!(matches!(&actions[1], Action::CreateFile { .. }));
    }

    #[test]
    fn test_suggestion_applies_only_to_next_block() {
        let text = "Idea: split it\n```solidity\ncontract Ex {}\n```\n```solidity\ncontract Real {}\n```";
        let actions = extractor().extract(text, Some("Real.sol"));
        assert_eq!(actions.len(), 3);
        assert!(matches!(&actions[1], Action::Message { content } if content.starts_with("Example code:")));
        assert!(matches!(&actions[2], Action::EditFile { content, .. } if content == "contract Real {}"));
    }

    #[test]
    fn test_keywords_inside_fence_are_code() {
        let text = "```solidity\n// Consider: gas\ncontract A {}\n```";
        let actions = extractor().extract(text, None);
        assert_eq!(actions.len(), 1);
        assert!(matches!(
            &actions[0],
            Action::CreateFile { content, .. } if content == "// Consider: gas\ncontract A {}"
        ));
    }

    #[test]
    fn test_other_language_fence_is_relayed_as_text() {
        let text = "```bash\nforge build\n```";
        let actions = extractor().extract(text, None);
        let contents: Vec<_> = actions
            .iter()
            .map(|a| match a {
                Action::Message { content } => content.as_str(),
                other => panic!("unexpected action {other:?}"),
            })
            .collect();
        assert_eq!(contents, vec!["```bash", "forge build", "```"]);
    }

    #[test]
    fn test_reopening_fence_discards_partial_block() {
        let text = "```solidity\nhalf\n```solidity\ncontract Whole {}\n```";
        let actions = extractor().extract(text, None);
        assert_eq!(
            actions,
            vec![Action::CreateFile {
                path: "contracts/Contract_0.sol".to_string(),
                content: "contract Whole {}".to_string()
            }]
        );
    }

    #[test]
    fn test_interior_indentation_is_preserved() {
        let text = "```solidity\ncontract A {\n    uint x;\n}\n```";
        let actions = extractor().extract(text, None);
        assert!(matches!(
            &actions[0],
            Action::CreateFile { content, .. } if content == "contract A {\n    uint x;\n}"
        ));
    }

    #[test]
    fn test_custom_language() {
        let vyper = ActionExtractor::new("vyper");
        let actions = vyper.extract("```vyper\n@external\n```", None);
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], Action::CreateFile { .. }));
    }
}
