//! Per-stream reassembly of upstream deltas into client chunks.
//!
//! For ordinary models every non-empty delta is forwarded as one content
//! chunk. For reasoning models the output starts with an undelimited
//! reasoning segment, so everything is held back until `</think>` shows up in
//! the accumulated buffer. At that point the buffered text is flushed once as
//! a `reasoning` chunk and the stream switches to forwarding.
//!
//! Termination is tracked by a single flag: a `finish_reason` delta, the end
//! of the upstream sequence and an upstream error all end the stream, and
//! whichever comes first is the only one that produces `[DONE]`.

use crate::framing::{Frame, StreamContext};
use crate::thinking::THINK_CLOSE_TAG;
use crate::types::{Delta, ErrorEnvelope};
use crate::upstream::UpstreamDelta;
use std::fmt::Display;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Reasoning model, nothing received yet.
    CollectingUnknown,
    /// Reasoning model, text buffered and no closing tag seen.
    InThinking,
    /// Forwarding deltas as they arrive.
    InFinal,
}

#[derive(Debug)]
struct StreamState {
    context: StreamContext,
    accumulated_text: String,
    thinking_buffer: String,
    mode: StreamMode,
    thinking_emitted: bool,
    terminated: bool,
}

#[derive(Debug)]
pub struct StreamReassembler {
    state: StreamState,
}

impl StreamReassembler {
    pub fn new(context: StreamContext, reasoning_capable: bool) -> Self {
        let mode = if reasoning_capable {
            StreamMode::CollectingUnknown
        } else {
            StreamMode::InFinal
        };

        Self {
            state: StreamState {
                context,
                accumulated_text: String::new(),
                thinking_buffer: String::new(),
                mode,
                thinking_emitted: false,
                terminated: false,
            },
        }
    }

    pub fn context(&self) -> &StreamContext {
        &self.state.context
    }

    pub fn mode(&self) -> StreamMode {
        self.state.mode
    }

    pub fn is_terminated(&self) -> bool {
        self.state.terminated
    }

    /// Everything received from upstream so far, reasoning included.
    pub fn accumulated_text(&self) -> &str {
        &self.state.accumulated_text
    }

    /// Feed one upstream delta. Returns nothing once terminated.
    pub fn push(&mut self, delta: UpstreamDelta) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.state.terminated {
            return frames;
        }

        if let Some(text) = delta.content.as_deref() {
            self.state.accumulated_text.push_str(text);
            match self.state.mode {
                StreamMode::InFinal => self.emit_content(text, &mut frames),
                StreamMode::CollectingUnknown | StreamMode::InThinking => {
                    self.buffer_thinking(text, &mut frames)
                }
            }
        }

        if let Some(reason) = delta.finish_reason {
            frames.push(Frame::Chunk(
                self.state.context.chunk(Delta::default(), Some(reason)),
            ));
            frames.push(Frame::Done);
            self.state.terminated = true;
        }

        frames
    }

    /// Upstream ran out without a finish reason.
    ///
    /// Reasoning still sitting in the buffer (no closing tag ever arrived) is
    /// dropped, not flushed.
    pub fn finish(&mut self) -> Vec<Frame> {
        if self.state.terminated {
            return Vec::new();
        }
        self.state.terminated = true;

        warn!(
            id = %self.state.context.id,
            "stream ended without finish_reason, sending [DONE] anyway"
        );
        if !self.state.thinking_buffer.is_empty() {
            warn!(
                id = %self.state.context.id,
                discarded_bytes = self.state.thinking_buffer.len(),
                "reasoning never closed, discarding buffered text"
            );
        }

        vec![Frame::Done]
    }

    /// Upstream failed. Emits an error frame followed by `[DONE]`.
    pub fn fail(&mut self, error: &impl Display) -> Vec<Frame> {
        if self.state.terminated {
            return Vec::new();
        }
        self.state.terminated = true;

        vec![
            Frame::Error(ErrorEnvelope::internal(error.to_string())),
            Frame::Done,
        ]
    }

    fn emit_content(&self, text: &str, frames: &mut Vec<Frame>) {
        if !text.is_empty() {
            frames.push(Frame::Chunk(
                self.state.context.chunk(Delta::content(text), None),
            ));
        }
    }

    fn buffer_thinking(&mut self, text: &str, frames: &mut Vec<Frame>) {
        if text.is_empty() {
            return;
        }

        // A tag may straddle the previous delta, so rescan its tail.
        let scan_from = self
            .state
            .thinking_buffer
            .len()
            .saturating_sub(THINK_CLOSE_TAG.len() - 1);
        self.state.thinking_buffer.push_str(text);
        self.state.mode = StreamMode::InThinking;

        let Some(pos) = find_from(&self.state.thinking_buffer, scan_from, THINK_CLOSE_TAG) else {
            return;
        };

        let buffer = std::mem::take(&mut self.state.thinking_buffer);
        let thinking = buffer[..pos].trim();
        let answer = &buffer[pos + THINK_CLOSE_TAG.len()..];

        if !thinking.is_empty() && !self.state.thinking_emitted {
            frames.push(Frame::Chunk(
                self.state.context.chunk(Delta::reasoning(thinking), None),
            ));
            self.state.thinking_emitted = true;
        }

        self.state.mode = StreamMode::InFinal;
        if !answer.trim().is_empty() {
            self.emit_content(answer, frames);
        }
    }
}

fn find_from(haystack: &str, from: usize, needle: &str) -> Option<usize> {
    let mut start = from.min(haystack.len());
    while !haystack.is_char_boundary(start) {
        start -= 1;
    }
    haystack[start..].find(needle).map(|i| start + i)
}
