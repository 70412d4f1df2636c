//! Turn handler for the narration context.
//!
//! A turn is authorized, its chat resolved and its user message persisted
//! before the model is started; the model's output is then streamed on a
//! background task that owns the turn's state machine until the assistant
//! message is persisted or the turn fails.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use storyteller_core::chat::Chat;
use storyteller_core::clock::Clock;
use storyteller_core::ids::IdGenerator;
use storyteller_core::message::{Message, Part, Role};
use storyteller_core::model::{
    FinishReason, LanguageModel, ModelEvent, ModelRequest, ModelStream, ToolCall,
};
use storyteller_core::quota::QuotaPolicy;
use storyteller_core::repository::{ChatRepository, UserDirectory};
use storyteller_core::story::STORY_TOOL_NAME;
use storyteller_core::user::{User, UserIdentity};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{Instrument, Span, error, info, instrument, warn};
use uuid::Uuid;

use crate::application::chunking::WordChunker;
use crate::domain::commands::HandleTurn;
use crate::domain::errors::TurnError;
use crate::domain::events::TurnEvent;
use crate::domain::phase::{TurnMachine, TurnPhase};
use crate::domain::prompt::system_prompt;
use crate::domain::story_tool::StoryTool;
use crate::domain::transcript::ResponseBatch;

/// Events buffered between the turn task and the caller.
pub const TURN_CHANNEL_CAPACITY: usize = 32;

/// Error text sent to the client when generation fails mid-stream.
pub const GENERATION_FAILED_MESSAGE: &str = "An error occurred while generating the story.";

/// Runs chat turns against the store, the model and the story tool.
pub struct TurnOrchestrator {
    chats: Arc<dyn ChatRepository>,
    users: Arc<dyn UserDirectory>,
    model: Arc<dyn LanguageModel>,
    story_tool: Arc<StoryTool>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    quota: QuotaPolicy,
}

impl std::fmt::Debug for TurnOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}

impl TurnOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        chats: Arc<dyn ChatRepository>,
        users: Arc<dyn UserDirectory>,
        model: Arc<dyn LanguageModel>,
        story_tool: Arc<StoryTool>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        quota: QuotaPolicy,
    ) -> Self {
        Self {
            chats,
            users,
            model,
            story_tool,
            clock,
            ids,
            quota,
        }
    }

    /// Handles one turn.
    ///
    /// Everything that can be refused is checked before this returns; once a
    /// `TurnStream` is handed back, failures are reported in-band.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized`, `UserNotFound`, `QuotaExceeded`, `Forbidden`
    /// or `InvalidRequest` when the turn is refused, `Store` when the store
    /// fails, and `Model` when generation cannot start. The user message is
    /// already persisted when `Model` is returned.
    #[instrument(
        skip(self, command, identity),
        fields(chat_id = %command.chat_id, correlation_id = %command.correlation_id)
    )]
    pub async fn handle_turn(
        &self,
        command: HandleTurn,
        identity: Option<UserIdentity>,
    ) -> Result<TurnStream, TurnError> {
        let identity = identity.ok_or(TurnError::Unauthorized)?;
        let user = self.authorize(&identity).await?;
        let user_message = self.user_message(&command)?;
        self.resolve_chat(command.chat_id, &user, &identity).await?;

        let mut transcript = self.chats.messages_by_chat(command.chat_id).await?;
        self.chats
            .save_messages(std::slice::from_ref(&user_message))
            .await?;
        info!(message_id = %user_message.id, "user message persisted");
        transcript.push(user_message);

        let request = ModelRequest {
            system: system_prompt(),
            messages: transcript,
            tools: vec![StoryTool::definition()],
        };
        let model_stream = self
            .model
            .stream(request)
            .await
            .inspect_err(|e| error!(error = %e, "model failed to start"))?;

        let cancel = CancellationToken::new();
        let (events, receiver) = mpsc::channel(TURN_CHANNEL_CAPACITY);
        let runner = TurnRunner {
            turn_id: command.correlation_id,
            chat_id: command.chat_id,
            chats: Arc::clone(&self.chats),
            story_tool: Arc::clone(&self.story_tool),
            clock: Arc::clone(&self.clock),
            ids: Arc::clone(&self.ids),
            events,
            cancel: cancel.clone(),
        };
        tokio::spawn(runner.run(model_stream).instrument(Span::current()));

        Ok(TurnStream {
            events: receiver,
            _disconnect: cancel.drop_guard(),
        })
    }

    async fn authorize(&self, identity: &UserIdentity) -> Result<User, TurnError> {
        let user = self
            .users
            .find_user_by_email(&identity.email)
            .await?
            .ok_or(TurnError::UserNotFound)?;

        let since = QuotaPolicy::window_start(self.clock.now());
        let used = self.chats.count_user_messages_since(user.id, since).await?;
        let window = self.quota.window(identity.user_type, used);
        if window.is_exhausted() {
            warn!(user_id = %user.id, used, ceiling = window.ceiling, "daily message quota exhausted");
            return Err(TurnError::QuotaExceeded {
                used,
                ceiling: window.ceiling,
            });
        }
        Ok(user)
    }

    async fn resolve_chat(
        &self,
        chat_id: Uuid,
        user: &User,
        identity: &UserIdentity,
    ) -> Result<(), TurnError> {
        match self.chats.find_chat(chat_id).await? {
            None => {
                self.chats
                    .save_chat(&Chat::new_story(chat_id, user.id))
                    .await?;
                info!(owner_id = %user.id, "chat created");
            }
            Some(_) if identity.is_guest() => {
                // Guest ids can rotate between sessions, so guests are not
                // held to chat ownership.
                info!(user_id = %user.id, "guest accessing chat without ownership check");
            }
            Some(chat) if !chat.is_owned_by(user.id) => {
                warn!(user_id = %user.id, owner_id = %chat.owner_id, "chat belongs to another user");
                return Err(TurnError::Forbidden);
            }
            Some(_) => {}
        }
        Ok(())
    }

    fn user_message(&self, command: &HandleTurn) -> Result<Message, TurnError> {
        let has_content = command.message.parts.iter().any(|part| match part {
            Part::Text { text } => !text.trim().is_empty(),
            Part::ToolInvocation { .. } => true,
        });
        if !has_content {
            return Err(TurnError::InvalidRequest(
                "user message has no content".into(),
            ));
        }
        Ok(Message {
            id: command.message.id.unwrap_or_else(|| self.ids.next_id()),
            chat_id: command.chat_id,
            role: Role::User,
            parts: command.message.parts.clone(),
            created_at: self.clock.now(),
        })
    }
}

/// Output of a running turn. Dropping it signals a client disconnect, which
/// abandons the turn, including any narration in flight.
pub struct TurnStream {
    events: mpsc::Receiver<TurnEvent>,
    _disconnect: DropGuard,
}

impl std::fmt::Debug for TurnStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnStream").finish_non_exhaustive()
    }
}

impl Stream for TurnStream {
    type Item = TurnEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<TurnEvent>> {
        self.events.poll_recv(cx)
    }
}

/// Whether the caller is still listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Disconnected,
}

/// State owned by the background task of one turn.
struct TurnRunner {
    turn_id: Uuid,
    chat_id: Uuid,
    chats: Arc<dyn ChatRepository>,
    story_tool: Arc<StoryTool>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    events: mpsc::Sender<TurnEvent>,
    cancel: CancellationToken,
}

impl TurnRunner {
    async fn run(self, mut stream: ModelStream) {
        let mut machine = TurnMachine::new(self.turn_id);
        match self.drive(&mut machine, &mut stream).await {
            Ok(Flow::Continue) => info!("turn completed"),
            Ok(Flow::Disconnected) => info!(phase = ?machine.phase(), "client disconnected; turn abandoned"),
            Err(e) => {
                error!(error = %e, phase = ?machine.phase(), "turn failed");
                if let Err(transition) = machine.advance(TurnPhase::Failed) {
                    error!(error = %transition, "could not mark turn failed");
                }
                self.emit(TurnEvent::Error(GENERATION_FAILED_MESSAGE.to_owned()))
                    .await;
            }
        }
    }

    async fn drive(
        &self,
        machine: &mut TurnMachine,
        stream: &mut ModelStream,
    ) -> Result<Flow, TurnError> {
        let assistant_id = self.ids.next_id();
        let mut batch = ResponseBatch::new(assistant_id);
        let mut chunker = WordChunker::new();
        let mut tool_called = false;
        let mut finish = FinishReason::Stop;

        machine.advance(TurnPhase::Streaming)?;
        if self
            .emit(TurnEvent::StepStarted {
                message_id: assistant_id,
            })
            .await
            == Flow::Disconnected
        {
            return Ok(Flow::Disconnected);
        }

        loop {
            let next = tokio::select! {
                () = self.cancel.cancelled() => return Ok(Flow::Disconnected),
                next = stream.next() => next,
            };
            let Some(event) = next else { break };

            match event.map_err(|e| TurnError::Generation(e.to_string()))? {
                ModelEvent::TextDelta(delta) => {
                    batch.push_text(&delta);
                    for chunk in chunker.push(&delta) {
                        if self.emit(TurnEvent::TextDelta(chunk)).await == Flow::Disconnected {
                            return Ok(Flow::Disconnected);
                        }
                    }
                }
                ModelEvent::ToolCall(call) if call.tool_name != STORY_TOOL_NAME => {
                    warn!(tool = %call.tool_name, "ignoring call to unknown tool");
                }
                ModelEvent::ToolCall(call) if tool_called => {
                    warn!(call_id = %call.call_id, "ignoring additional tool call in the same turn");
                }
                ModelEvent::ToolCall(call) => {
                    tool_called = true;
                    if self.flush(&mut chunker).await == Flow::Disconnected
                        || self.call_story_tool(machine, &mut batch, call).await?
                            == Flow::Disconnected
                    {
                        return Ok(Flow::Disconnected);
                    }
                }
                ModelEvent::Finish(reason) => finish = reason,
            }
        }

        if self.flush(&mut chunker).await == Flow::Disconnected {
            return Ok(Flow::Disconnected);
        }

        machine.advance(TurnPhase::Finalizing)?;
        self.finalize(batch).await;
        machine.advance(TurnPhase::Done)?;
        Ok(self.emit(TurnEvent::Finished { reason: finish }).await)
    }

    /// Runs the story tool for `call`. Text streaming pauses until the
    /// tool, and the narration inside it, has resolved.
    async fn call_story_tool(
        &self,
        machine: &mut TurnMachine,
        batch: &mut ResponseBatch,
        call: ToolCall,
    ) -> Result<Flow, TurnError> {
        batch.push_tool_call(&call);
        let announced = self
            .emit(TurnEvent::ToolCall {
                tool_call_id: call.call_id.clone(),
                tool_name: call.tool_name.clone(),
                args: call.args.clone(),
            })
            .await;
        if announced == Flow::Disconnected {
            return Ok(Flow::Disconnected);
        }

        machine.advance(TurnPhase::AwaitingTool)?;
        let outcome = tokio::select! {
            () = self.cancel.cancelled() => return Ok(Flow::Disconnected),
            outcome = self.story_tool.execute(&call.args) => outcome,
        };
        let story = outcome.map_err(|e| {
            TurnError::Generation(format!("invalid {STORY_TOOL_NAME} arguments: {e}"))
        })?;
        let result =
            serde_json::to_value(&story).map_err(|e| TurnError::Generation(e.to_string()))?;

        batch.push_tool_result(self.ids.next_id(), &call, result.clone());
        machine.advance(TurnPhase::Streaming)?;
        Ok(self
            .emit(TurnEvent::ToolResult {
                tool_call_id: call.call_id,
                result,
            })
            .await)
    }

    async fn flush(&self, chunker: &mut WordChunker) -> Flow {
        match chunker.flush() {
            Some(rest) => self.emit(TurnEvent::TextDelta(rest)).await,
            None => Flow::Continue,
        }
    }

    /// Persists the folded assistant message. Failures here are logged only:
    /// the streamed output is already with the client.
    async fn finalize(&self, batch: ResponseBatch) {
        let Some(trailing_id) = batch.trailing_assistant_id() else {
            error!(error = %TurnError::NoAssistantMessage, "assistant message not saved");
            return;
        };

        let message = Message {
            id: self.ids.next_id(),
            chat_id: self.chat_id,
            role: Role::Assistant,
            parts: batch.into_assistant_parts(),
            created_at: self.clock.now(),
        };
        match self.chats.save_messages(std::slice::from_ref(&message)).await {
            Ok(()) => info!(%trailing_id, message_id = %message.id, "assistant message persisted"),
            Err(e) => error!(error = %e, "assistant message not saved"),
        }
    }

    async fn emit(&self, event: TurnEvent) -> Flow {
        if self.events.send(event).await.is_ok() {
            Flow::Continue
        } else {
            self.cancel.cancel();
            Flow::Disconnected
        }
    }
}
