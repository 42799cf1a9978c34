//! Per-connection frame dispatch.
//!
//! A [`ConnectionSession`] belongs to exactly one connection of one owner.
//! Frames are handled strictly one after another: `handle_text` returns only
//! after every event of the frame has been handed to the sink. Any per-frame
//! failure becomes a single `error` event and the session keeps going; only a
//! closed sink ends it.

use std::sync::Arc;

use tracing::{debug, warn};

use solquill_types::error::{CompileError, DispatchError, FormatError, StoreError};
use solquill_types::event::{ChatMetadata, FileMetadata, ServerEvent, SyncMetadata, VersionMetadata};
use solquill_types::frame::{
    ChatRefFrame, ClientFrame, CreateChatFrame, FileRefFrame, FileVersionFrame, MessageFrame,
    SaveFileFrame, SyncFrame,
};
use solquill_types::identity::{ChatId, OwnerId};
use solquill_types::llm::LlmError;

use crate::agent::{AgentSettings, ContractAgent};
use crate::chat::{ChatRepository, ChatService};
use crate::compile::BoxCompiler;
use crate::file::canonical_name;
use crate::llm::BoxLlmProvider;

use super::sink::{EventSink, SinkClosed};

/// Why a frame did not complete.
#[derive(Debug)]
pub enum FrameFailure {
    /// The frame failed; report it and keep the connection.
    Rejected(DispatchError),
    /// The client is gone.
    Closed(SinkClosed),
}

impl From<DispatchError> for FrameFailure {
    fn from(err: DispatchError) -> Self {
        FrameFailure::Rejected(err)
    }
}

impl From<SinkClosed> for FrameFailure {
    fn from(err: SinkClosed) -> Self {
        FrameFailure::Closed(err)
    }
}

impl From<StoreError> for FrameFailure {
    fn from(err: StoreError) -> Self {
        FrameFailure::Rejected(err.into())
    }
}

impl From<FormatError> for FrameFailure {
    fn from(err: FormatError) -> Self {
        FrameFailure::Rejected(err.into())
    }
}

impl From<LlmError> for FrameFailure {
    fn from(err: LlmError) -> Self {
        FrameFailure::Rejected(err.into())
    }
}

impl From<CompileError> for FrameFailure {
    fn from(err: CompileError) -> Self {
        FrameFailure::Rejected(err.into())
    }
}

/// State of one live connection: its owner, active chat and agent.
pub struct ConnectionSession<R: ChatRepository> {
    owner: OwnerId,
    active_chat: Option<ChatId>,
    agent: ContractAgent,
    chats: Arc<ChatService<R>>,
    llm: Arc<BoxLlmProvider>,
    compiler: Option<Arc<BoxCompiler>>,
}

impl<R: ChatRepository> ConnectionSession<R> {
    pub fn new(
        owner: OwnerId,
        active_chat: Option<ChatId>,
        settings: AgentSettings,
        chats: Arc<ChatService<R>>,
        llm: Arc<BoxLlmProvider>,
        compiler: Option<Arc<BoxCompiler>>,
    ) -> Self {
        Self {
            owner,
            active_chat,
            agent: ContractAgent::new(settings),
            chats,
            llm,
            compiler,
        }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn active_chat(&self) -> Option<&ChatId> {
        self.active_chat.as_ref()
    }

    /// Greet a freshly connected client with its chats.
    ///
    /// Restores the owner's persisted chats and opens the chat requested at
    /// connect time, if any.
    pub async fn open<S: EventSink>(&mut self, sink: &mut S) -> Result<(), SinkClosed> {
        self.chats.load_owner(&self.owner).await;

        if let Some(chat_id) = self.active_chat.clone() {
            if let Err(e) = self.chats.open_chat(&self.owner, &chat_id, None).await {
                self.active_chat = None;
                sink.send(ServerEvent::error(e.to_string())).await?;
            }
        }

        let chats = self.chats.store().list_chats(&self.owner);
        sink.send(ServerEvent::ChatsLoaded { content: chats }).await
    }

    /// Parse and handle one text frame.
    pub async fn handle_text<S: EventSink>(&mut self, text: &str, sink: &mut S) -> Result<(), SinkClosed> {
        match ClientFrame::parse(text) {
            Ok(frame) => self.handle_frame(frame, sink).await,
            Err(e) => {
                warn!(owner = %self.owner, error = %e, "unparseable frame");
                sink.send(ServerEvent::error(e.to_string())).await
            }
        }
    }

    /// Handle one frame, turning any failure into a single `error` event.
    pub async fn handle_frame<S: EventSink>(
        &mut self,
        frame: ClientFrame,
        sink: &mut S,
    ) -> Result<(), SinkClosed> {
        let kind = frame.kind().to_string();
        debug!(owner = %self.owner, frame = %kind, "dispatching frame");

        match self.dispatch(frame, sink).await {
            Ok(()) => Ok(()),
            Err(FrameFailure::Rejected(e)) => {
                warn!(owner = %self.owner, frame = %kind, error = %e, "frame rejected");
                sink.send(ServerEvent::error(e.to_string())).await
            }
            Err(FrameFailure::Closed(closed)) => Err(closed),
        }
    }

    async fn dispatch<S: EventSink>(&mut self, frame: ClientFrame, sink: &mut S) -> Result<(), FrameFailure> {
        match frame {
            ClientFrame::Message(msg) => self.converse(msg, sink).await,
            ClientFrame::SyncChatHistory(sync) => self.sync(sync, false, sink).await,
            ClientFrame::FullHistorySync(sync) => self.sync(sync, true, sink).await,
            ClientFrame::SaveFile(save) => self.save_file(save, sink).await,
            ClientFrame::GetFileVersion(req) => self.file_version(req, sink).await,
            ClientFrame::DeleteFile(req) => self.delete_file(req, sink).await,
            ClientFrame::Compile(req) => self.compile(req, sink).await,
            ClientFrame::CreateChat(req) => self.create_chat(req, sink).await,
            ClientFrame::ListChats => {
                let chats = self.chats.store().list_chats(&self.owner);
                Ok(sink.send(ServerEvent::ChatsLoaded { content: chats }).await?)
            }
            ClientFrame::DeleteChat(req) => self.delete_chat(req, sink).await,
            ClientFrame::Ping => Ok(sink.send(ServerEvent::pong()).await?),
            ClientFrame::Unknown { kind } => Err(DispatchError::UnknownKind(kind).into()),
        }
    }

    /// Chat a frame refers to: the explicit id, else the active chat, else a
    /// freshly minted one. The result becomes the active chat.
    fn resolve_chat(&mut self, raw: Option<&str>) -> Result<ChatId, FormatError> {
        let chat_id = match (raw, &self.active_chat) {
            (Some(raw), _) => ChatId::parse(raw)?,
            (None, Some(active)) => active.clone(),
            (None, None) => ChatId::generate(),
        };
        self.active_chat = Some(chat_id.clone());
        Ok(chat_id)
    }

    /// Chat a frame refers to, without minting one.
    fn existing_chat(&self, raw: Option<&str>) -> Result<ChatId, FormatError> {
        match (raw, &self.active_chat) {
            (Some(raw), _) => ChatId::parse(raw),
            (None, Some(active)) => Ok(active.clone()),
            (None, None) => Err(FormatError::MalformedFrame(
                "no chat_id given and no active chat".to_string(),
            )),
        }
    }

    async fn converse<S: EventSink>(&mut self, msg: MessageFrame, sink: &mut S) -> Result<(), FrameFailure> {
        let chat_id = self.resolve_chat(msg.chat_id.as_deref())?;
        self.chats.open_chat(&self.owner, &chat_id, None).await?;

        let compiler = self.compiler.as_deref();
        self.agent
            .run_turn(
                &self.owner,
                &chat_id,
                &msg,
                &self.chats,
                &self.llm,
                compiler,
                sink,
            )
            .await
    }

    async fn sync<S: EventSink>(&mut self, sync: SyncFrame, full: bool, sink: &mut S) -> Result<(), FrameFailure> {
        let chat_id = self.resolve_chat(sync.chat_id.as_deref())?;
        if full {
            self.chats.reset_chat(&self.owner, &chat_id).await?;
        }
        self.chats
            .open_chat(&self.owner, &chat_id, sync.name.as_deref())
            .await?;

        let outcome = self
            .chats
            .replace_history(&self.owner, &chat_id, &sync.messages, &sync.files)
            .await?;
        let summary = self.chats.store().read(&self.owner, &chat_id, |c| c.summary())?;

        sink.send(ServerEvent::ChatSynced {
            content: summary,
            metadata: SyncMetadata {
                chat_id,
                imported_messages: outcome.accepted,
                dropped_messages: outcome.dropped,
                files: outcome.files,
                full_reset: full,
            },
        })
        .await?;
        Ok(())
    }

    async fn save_file<S: EventSink>(&mut self, save: SaveFileFrame, sink: &mut S) -> Result<(), FrameFailure> {
        let chat_id = self.resolve_chat(save.chat_id.as_deref())?;
        self.chats.open_chat(&self.owner, &chat_id, None).await?;

        let outcome = self
            .chats
            .put_file(&self.owner, &chat_id, &save.path, &save.content, &save.language)
            .await?;

        sink.send(ServerEvent::FileSaved {
            content: outcome.canonical_name.clone(),
            metadata: FileMetadata {
                path: save.path,
                canonical_name: Some(outcome.canonical_name),
                language: Some(save.language),
                chat_id: Some(chat_id),
            },
        })
        .await?;
        Ok(())
    }

    async fn file_version<S: EventSink>(
        &mut self,
        req: FileVersionFrame,
        sink: &mut S,
    ) -> Result<(), FrameFailure> {
        let chat_id = self.existing_chat(req.chat_id.as_deref())?;
        self.chats.require_chat(&self.owner, &chat_id).await?;

        let store = self.chats.store();
        let version = store.get_file(&self.owner, &chat_id, &req.path, req.version)?;
        let history_len = store.file_history(&self.owner, &chat_id, &req.path)?.len();

        sink.send(ServerEvent::FileVersion {
            content: version.content,
            metadata: VersionMetadata {
                canonical_name: canonical_name(&req.path),
                path: req.path,
                version: req.version,
                timestamp: version.timestamp,
                history_len,
            },
        })
        .await?;
        Ok(())
    }

    async fn delete_file<S: EventSink>(&mut self, req: FileRefFrame, sink: &mut S) -> Result<(), FrameFailure> {
        let chat_id = self.existing_chat(req.chat_id.as_deref())?;
        self.chats.require_chat(&self.owner, &chat_id).await?;

        let canonical = canonical_name(&req.path);
        if !self.chats.delete_file(&self.owner, &chat_id, &req.path).await? {
            return Err(StoreError::FileNotFound(canonical).into());
        }
        self.agent.forget_file(&req.path);

        sink.send(ServerEvent::FileDelete {
            content: String::new(),
            metadata: FileMetadata {
                path: req.path,
                canonical_name: Some(canonical),
                language: None,
                chat_id: Some(chat_id),
            },
        })
        .await?;
        Ok(())
    }

    async fn compile<S: EventSink>(&mut self, req: FileRefFrame, sink: &mut S) -> Result<(), FrameFailure> {
        let chat_id = self.existing_chat(req.chat_id.as_deref())?;
        self.chats.require_chat(&self.owner, &chat_id).await?;

        let file = self
            .chats
            .store()
            .current_file(&self.owner, &chat_id, &req.path)?
            .ok_or_else(|| StoreError::FileNotFound(canonical_name(&req.path)))?;
        let compiler = self
            .compiler
            .as_deref()
            .ok_or_else(|| CompileError::Unavailable("compilation is disabled".to_string()))?;

        let result = compiler.compile(&req.path, &file.content).await?;
        sink.send(ServerEvent::CompilationResult {
            content: result,
            metadata: FileMetadata {
                path: req.path,
                canonical_name: Some(file.canonical_name),
                language: Some(file.language),
                chat_id: Some(chat_id),
            },
        })
        .await?;
        Ok(())
    }

    async fn create_chat<S: EventSink>(
        &mut self,
        req: CreateChatFrame,
        sink: &mut S,
    ) -> Result<(), FrameFailure> {
        let chat_id = match req.chat_id.as_deref() {
            Some(raw) => ChatId::parse(raw)?,
            None => ChatId::generate(),
        };
        let (summary, _) = self
            .chats
            .open_chat(&self.owner, &chat_id, req.name.as_deref())
            .await?;
        self.active_chat = Some(chat_id);

        sink.send(ServerEvent::ChatCreated { content: summary }).await?;
        Ok(())
    }

    async fn delete_chat<S: EventSink>(&mut self, req: ChatRefFrame, sink: &mut S) -> Result<(), FrameFailure> {
        let chat_id = self.existing_chat(req.chat_id.as_deref())?;
        self.chats.delete_chat(&self.owner, &chat_id).await?;
        if self.active_chat.as_ref() == Some(&chat_id) {
            self.active_chat = None;
        }

        sink.send(ServerEvent::ChatDeleted {
            content: chat_id.to_string(),
            metadata: ChatMetadata { chat_id },
        })
        .await?;
        Ok(())
    }
}
