//! One conversational turn.
//!
//! A turn records the user message, asks the model for a reply, extracts
//! actions from it and applies them one by one. Every applied action is
//! streamed to the client and recorded in the transcript before the next one
//! starts, so a turn cut short by a disconnect leaves consistent state behind.

use std::time::Duration;

use tracing::field::Empty;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use solquill_types::action::Action;
use solquill_types::chat::Message;
use solquill_types::compile::CompilationResult;
use solquill_types::config::{AgentConfig, LlmConfig};
use solquill_types::error::DispatchError;
use solquill_types::event::{FileMetadata, ServerEvent};
use solquill_types::frame::MessageFrame;
use solquill_types::identity::{ChatId, OwnerId};
use solquill_types::llm::{CompletionRequest, LlmMessage};

use crate::chat::{ChatRepository, ChatService};
use crate::compile::BoxCompiler;
use crate::extract::ActionExtractor;
use crate::llm::BoxLlmProvider;
use crate::session::{EventSink, FrameFailure, SinkClosed};

use super::context::EditContext;
use super::prompt::{build_history, repair_request, repair_system_prompt, system_prompt};

/// Status line sent before the model is called. Not recorded.
pub const ANALYZING_NOTICE: &str = "Analyzing your request...";

/// Status lines of the compile repair loop. Not recorded.
pub const REPAIR_NOTICE: &str = "Found compilation errors. Attempting to fix...";
pub const REPAIR_SUCCEEDED: &str = "Successfully fixed compilation errors.";
pub const REPAIR_FAILED: &str = "Could not automatically fix all compilation errors.";

const REPAIR_TEMPERATURE: f64 = 0.3;

/// Model and pacing parameters of an agent.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    /// Delay between the events of one turn.
    pub pacing: Duration,
    /// Fence tag of code blocks that become file operations.
    pub language: String,
    /// Model round trips spent repairing a failed compile; 0 disables repair.
    pub max_fix_attempts: u32,
}

impl AgentSettings {
    pub fn from_config(llm: &LlmConfig, agent: &AgentConfig) -> Self {
        Self {
            model: llm.model.clone(),
            max_tokens: llm.max_tokens,
            temperature: Some(llm.temperature),
            pacing: Duration::from_millis(agent.pacing_ms),
            language: agent.fence_language.clone(),
            max_fix_attempts: agent.max_fix_attempts,
        }
    }
}

/// Conversational agent bound to one connected owner.
pub struct ContractAgent {
    settings: AgentSettings,
    extractor: ActionExtractor,
    context: EditContext,
}

impl ContractAgent {
    pub fn new(settings: AgentSettings) -> Self {
        let extractor = ActionExtractor::new(settings.language.clone());
        Self {
            settings,
            extractor,
            context: EditContext::new(),
        }
    }

    pub fn context(&self) -> &EditContext {
        &self.context
    }

    /// A file was deleted outside a turn.
    pub fn forget_file(&mut self, path: &str) {
        self.context.forget(path);
    }

    /// Run one turn for `frame` in an existing chat.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_turn<R, S>(
        &mut self,
        owner: &OwnerId,
        chat_id: &ChatId,
        frame: &MessageFrame,
        chats: &ChatService<R>,
        llm: &BoxLlmProvider,
        compiler: Option<&BoxCompiler>,
        sink: &mut S,
    ) -> Result<(), FrameFailure>
    where
        R: ChatRepository,
        S: EventSink,
    {
        if frame.context.current_file.is_some() {
            self.context.refresh(&frame.context);
        }

        chats
            .append_message(owner, chat_id, Message::user(frame.content.clone()))
            .await?;

        let transcript = chats.store().transcript(owner, chat_id)?;
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: build_history(&transcript, &self.context, &self.settings.language),
            system: Some(system_prompt(&self.settings.language)),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        sink.send(ServerEvent::message(ANALYZING_NOTICE)).await?;

        let response = llm
            .complete(&request)
            .instrument(completion_span(llm, &request))
            .await
            .map_err(DispatchError::from)?;
        let actions = self
            .extractor
            .extract(&response.content, self.context.editing_target());
        debug!(
            owner = %owner,
            chat_id = %chat_id,
            actions = actions.len(),
            output_tokens = response.usage.output_tokens,
            "reply extracted"
        );

        for (index, action) in actions.into_iter().enumerate() {
            let event = self.apply(owner, chat_id, action, chats).await?;
            if let Some(text) = event.transcript_text() {
                chats
                    .append_message(owner, chat_id, Message::ai(text, event.kind()))
                    .await?;
            }
            if index > 0 && !self.settings.pacing.is_zero() {
                tokio::time::sleep(self.settings.pacing).await;
            }
            sink.send(event).await?;
        }

        if let Some(compiler) = compiler {
            self.compile_current(owner, chat_id, chats, llm, compiler, sink)
                .await?;
        }

        info!(owner = %owner, chat_id = %chat_id, "turn completed");
        Ok(())
    }

    async fn apply<R: ChatRepository>(
        &mut self,
        owner: &OwnerId,
        chat_id: &ChatId,
        action: Action,
        chats: &ChatService<R>,
    ) -> Result<ServerEvent, FrameFailure> {
        let language = self.settings.language.clone();
        let metadata = |path: String, canonical: String| FileMetadata {
            path,
            canonical_name: Some(canonical),
            language: Some(language.clone()),
            chat_id: Some(chat_id.clone()),
        };

        let event = match action {
            Action::Message { content } => ServerEvent::Message { content },
            Action::CreateFile { path, content } => {
                let outcome = chats
                    .put_file(owner, chat_id, &path, &content, &language)
                    .await?;
                ServerEvent::FileCreate {
                    content,
                    metadata: metadata(path, outcome.canonical_name),
                }
            }
            Action::EditFile { path, content } => {
                let outcome = chats
                    .put_file(owner, chat_id, &path, &content, &language)
                    .await?;
                self.context.record_edit(&path, &content);
                ServerEvent::CodeEdit {
                    content,
                    metadata: metadata(path, outcome.canonical_name),
                }
            }
            Action::DeleteFile { path } => {
                chats.delete_file(owner, chat_id, &path).await?;
                self.context.forget(&path);
                let canonical = crate::file::canonical_name(&path);
                ServerEvent::FileDelete {
                    content: String::new(),
                    metadata: metadata(path, canonical),
                }
            }
        };

        Ok(event)
    }

    /// Compile the file being edited, if it is a Solidity source, and try to
    /// repair it when it does not build.
    async fn compile_current<R, S>(
        &mut self,
        owner: &OwnerId,
        chat_id: &ChatId,
        chats: &ChatService<R>,
        llm: &BoxLlmProvider,
        compiler: &BoxCompiler,
        sink: &mut S,
    ) -> Result<(), FrameFailure>
    where
        R: ChatRepository,
        S: EventSink,
    {
        let Some(path) = self
            .context
            .editing_target()
            .filter(|p| p.ends_with(".sol"))
            .map(str::to_string)
        else {
            return Ok(());
        };

        let stored = chats.store().current_file(owner, chat_id, &path)?;
        let Some(source) = stored
            .map(|file| file.content)
            .or_else(|| self.context.current_code().map(str::to_string))
        else {
            return Ok(());
        };

        let result = compiler.compile(&path, &source).await?;
        report_compilation(chat_id, &path, result.clone(), sink).await?;
        if result.success || self.settings.max_fix_attempts == 0 {
            return Ok(());
        }

        sink.send(ServerEvent::message(REPAIR_NOTICE)).await?;
        let fixed = self
            .repair(owner, chat_id, &path, source, result, chats, llm, compiler, sink)
            .await?;
        let outcome = if fixed { REPAIR_SUCCEEDED } else { REPAIR_FAILED };
        sink.send(ServerEvent::message(outcome)).await?;
        Ok(())
    }

    /// Ask the model for corrected code until the file compiles or the
    /// attempts run out. Every fix is applied as an edit of `path`.
    #[allow(clippy::too_many_arguments)]
    async fn repair<R, S>(
        &mut self,
        owner: &OwnerId,
        chat_id: &ChatId,
        path: &str,
        mut source: String,
        mut result: CompilationResult,
        chats: &ChatService<R>,
        llm: &BoxLlmProvider,
        compiler: &BoxCompiler,
        sink: &mut S,
    ) -> Result<bool, FrameFailure>
    where
        R: ChatRepository,
        S: EventSink,
    {
        let language = self.settings.language.clone();

        for attempt in 1..=self.settings.max_fix_attempts {
            let request = CompletionRequest {
                model: self.settings.model.clone(),
                messages: vec![LlmMessage::user(repair_request(
                    &result.errors,
                    &source,
                    &language,
                ))],
                system: Some(repair_system_prompt(&language)),
                max_tokens: self.settings.max_tokens,
                temperature: Some(REPAIR_TEMPERATURE),
            };
            let response = match llm
                .complete(&request)
                .instrument(completion_span(llm, &request))
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(owner = %owner, chat_id = %chat_id, attempt, error = %e, "repair request failed");
                    return Ok(false);
                }
            };

            let fix = self
                .extractor
                .extract(&response.content, Some(path))
                .into_iter()
                .find(|action| matches!(action, Action::EditFile { .. }));
            let Some(action) = fix else {
                debug!(owner = %owner, chat_id = %chat_id, attempt, "repair reply had no code");
                continue;
            };

            let event = self.apply(owner, chat_id, action, chats).await?;
            if let Some(text) = event.transcript_text() {
                chats
                    .append_message(owner, chat_id, Message::ai(text.clone(), event.kind()))
                    .await?;
                source = text;
            }
            sink.send(event).await?;

            result = compiler.compile(path, &source).await?;
            report_compilation(chat_id, path, result.clone(), sink).await?;
            if result.success {
                info!(owner = %owner, chat_id = %chat_id, attempt, path, "compilation errors repaired");
                return Ok(true);
            }
        }

        Ok(false)
    }
}

async fn report_compilation<S: EventSink>(
    chat_id: &ChatId,
    path: &str,
    result: CompilationResult,
    sink: &mut S,
) -> Result<(), SinkClosed> {
    sink.send(ServerEvent::CompilationResult {
        content: result,
        metadata: FileMetadata {
            chat_id: Some(chat_id.clone()),
            ..FileMetadata::path(path)
        },
    })
    .await
}

fn completion_span(llm: &BoxLlmProvider, request: &CompletionRequest) -> Span {
    info_span!(
        "gen_ai.chat",
        gen_ai.provider.name = llm.name(),
        gen_ai.request.model = %request.model,
        gen_ai.request.max_tokens = request.max_tokens,
        gen_ai.request.temperature = ?request.temperature,
        gen_ai.response.id = Empty,
        gen_ai.usage.input_tokens = Empty,
        gen_ai.usage.output_tokens = Empty,
    )
}
