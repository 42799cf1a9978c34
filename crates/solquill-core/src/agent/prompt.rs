//! System instruction and conversation history for the language model.

use solquill_types::chat::{Message, Sender};
use solquill_types::compile::CompileDiagnostic;
use solquill_types::llm::{LlmMessage, MessageRole};

use super::context::EditContext;

/// Event types whose transcript text is raw file content.
const FILE_EVENT_TYPES: &[&str] = &["file_create", "code_edit"];

/// System instruction for a contract-authoring conversation whose code
/// blocks are fenced with `language`.
pub fn system_prompt(language: &str) -> String {
    format!(
        "You are a smart contract engineer helping a user write, review and fix contracts \
in an editor. The editor applies your replies automatically, so follow these conventions:

- Put every contract you create or change in a single fenced block tagged ```{language}.
- A ```{language} block replaces the file the user is editing, or creates a new file when \
no file is open. Always send the complete file, never a fragment.
- Only create or edit a contract when the user asks for it.
- For ideas that should not be applied, start the line before the block with \"Suggestion:\" \
or \"Idea:\". Such blocks are shown as examples and leave the files untouched.
- Use pragma solidity ^0.8.20 and include an SPDX-License-Identifier in new contracts.
- Keep the existing structure and behaviour of a contract when editing it, and follow \
established security practice.
- Write explanations as short standalone lines; each line is delivered as its own message."
    )
}

/// System instruction for repairing a contract that fails to compile.
pub fn repair_system_prompt(language: &str) -> String {
    format!(
        "You are a smart contract engineer. Fix the compilation errors in the contract. \
Reply with the complete corrected file in a single fenced block tagged ```{language} \
and change nothing that the errors do not require."
    )
}

/// User message listing compiler errors and the code they refer to.
pub fn repair_request(errors: &[CompileDiagnostic], code: &str, language: &str) -> String {
    let mut text = String::from("Fix the following compilation errors:\n");
    for error in errors {
        text.push_str(&format!("Line {}: {}\n", error.line, error.message));
    }
    text.push_str(&format!("\nCurrent code:\n```{language}\n{code}\n```"));
    text
}

/// Build the model history for a chat transcript.
///
/// User messages map to the user role and AI messages to the assistant role.
/// File events are re-fenced so the model sees its own code as code.
/// Consecutive messages of the same role are merged, and the history always
/// starts with a user message. When a file is being edited, its current code
/// is appended as a final user note.
pub fn build_history(transcript: &[Message], context: &EditContext, language: &str) -> Vec<LlmMessage> {
    let mut history: Vec<LlmMessage> = Vec::new();

    for message in transcript {
        let role = match message.sender {
            Sender::User => MessageRole::User,
            Sender::Ai => MessageRole::Assistant,
        };
        if history.is_empty() && role == MessageRole::Assistant {
            continue;
        }

        let is_file_event = message
            .action_type
            .as_deref()
            .is_some_and(|t| FILE_EVENT_TYPES.contains(&t));
        let content = if is_file_event {
            format!("```{language}\n{}\n```", message.text)
        } else {
            message.text.clone()
        };

        push_merged(&mut history, role, content);
    }

    if let (Some(file), Some(code)) = (context.editing_target(), context.current_code()) {
        let note = format!("Current file: {file}\nCurrent code:\n```{language}\n{code}\n```");
        push_merged(&mut history, MessageRole::User, note);
    }

    history
}

fn push_merged(history: &mut Vec<LlmMessage>, role: MessageRole, content: String) {
    match history.last_mut() {
        Some(last) if last.role == role => {
            last.content.push_str("\n\n");
            last.content.push_str(&content);
        }
        _ => history.push(LlmMessage { role, content }),
    }
}
