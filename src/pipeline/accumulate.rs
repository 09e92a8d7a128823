use crate::pipeline::{ChatEventStream, PipelineError};
use crate::types::{ChatEvent, MessageRole};
use crate::{BoxStream, Error};
use futures::{stream, StreamExt};
use serde_json::Value;

/// Folds chat-completion chunk frames into partial-message events.
///
/// Holds one event back so the final event can be flagged `is_last` when the
/// frame stream ends; the terminator itself never produces an event.
#[derive(Debug, Default)]
pub struct DeltaAccumulator;

struct Delta {
    role: Option<MessageRole>,
    content: Option<String>,
    finish_reason: Option<String>,
}

struct AccState {
    input: BoxStream<'static, Value>,
    role: Option<MessageRole>,
    content: String,
    emitted: usize,
    pending: Option<ChatEvent>,
    deferred_error: Option<Error>,
    finished: bool,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self
    }

    /// Pull the first choice's delta out of a chunk. `Ok(None)` for frames
    /// without choices (usage-only chunks and the like).
    fn delta(frame: &Value) -> Result<Option<Delta>, PipelineError> {
        if let Some(err) = frame.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| err.to_string());
            return Err(PipelineError::Upstream(message));
        }

        let Some(choice) = frame
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
        else {
            return Ok(None);
        };

        let delta = choice.get("delta");
        let role = delta
            .and_then(|d| d.get("role"))
            .and_then(|r| serde_json::from_value::<MessageRole>(r.clone()).ok());
        let content = delta
            .and_then(|d| d.get("content"))
            .and_then(Value::as_str)
            .map(String::from);
        let finish_reason = choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(String::from);

        Ok(Some(Delta {
            role,
            content,
            finish_reason,
        }))
    }

    pub fn accumulate(&self, input: BoxStream<'static, Value>) -> ChatEventStream {
        let state = AccState {
            input,
            role: None,
            content: String::new(),
            emitted: 0,
            pending: None,
            deferred_error: None,
            finished: false,
        };

        let stream = stream::unfold(state, |mut state| async move {
            if let Some(err) = state.deferred_error.take() {
                state.finished = true;
                return Some((Err(err), state));
            }
            if state.finished {
                return None;
            }

            loop {
                match state.input.next().await {
                    Some(Ok(frame)) => {
                        let delta = match Self::delta(&frame) {
                            Ok(Some(delta)) => delta,
                            Ok(None) => continue,
                            Err(e) => {
                                let err: Error = e.into();
                                match state.pending.take() {
                                    Some(prev) => {
                                        state.deferred_error = Some(err);
                                        return Some((Ok(prev), state));
                                    }
                                    None => {
                                        state.finished = true;
                                        return Some((Err(err), state));
                                    }
                                }
                            }
                        };

                        if let Some(role) = delta.role {
                            state.role = Some(role);
                        }
                        let piece = delta.content.unwrap_or_default();
                        state.content.push_str(&piece);

                        let event = ChatEvent {
                            role: state.role.unwrap_or(MessageRole::Assistant),
                            content: state.content.clone(),
                            delta: piece,
                            is_first: state.emitted == 0,
                            is_last: false,
                            finish_reason: delta.finish_reason,
                        };
                        state.emitted += 1;

                        match state.pending.replace(event) {
                            Some(prev) => return Some((Ok(prev), state)),
                            None => continue,
                        }
                    }
                    Some(Err(e)) => match state.pending.take() {
                        Some(prev) => {
                            state.deferred_error = Some(e);
                            return Some((Ok(prev), state));
                        }
                        None => {
                            state.finished = true;
                            return Some((Err(e), state));
                        }
                    },
                    None => {
                        state.finished = true;
                        let mut last = state.pending.take()?;
                        last.is_last = true;
                        return Some((Ok(last), state));
                    }
                }
            }
        });

        Box::pin(stream)
    }
}
