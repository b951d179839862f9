//! Streaming conversion (SSE).
//!
//! Drives a [`StreamReassembler`] from an upstream [`DeltaStream`] and yields
//! fully formatted OpenAI SSE frames:
//!
//! ```text
//! data: {"id":"chatcmpl-...","object":"chat.completion.chunk",...}
//!
//! data: [DONE]
//!
//! ```
//!
//! Deltas are read one at a time. Once the reassembler terminates, the
//! upstream stream is dropped without reading the rest.

use crate::error::UpstreamError;
use crate::framing::Frame;
use crate::reassembler::StreamReassembler;
use crate::translation::estimate_tokens;
use crate::upstream::DeltaStream;
use async_stream::stream;
use futures::{Stream, StreamExt};
use tracing::{debug, error};

/// Translate an upstream delta stream into client SSE frames.
pub fn handle_streaming(
    mut deltas: DeltaStream,
    mut reassembler: StreamReassembler,
) -> impl Stream<Item = String> + Send {
    stream! {
        while let Some(next) = deltas.next().await {
            let frames = match next {
                Ok(delta) => reassembler.push(delta),
                Err(e) => {
                    error!(id = %reassembler.context().id, error = %e, "upstream stream failed");
                    reassembler.fail(&e)
                }
            };

            for frame in frames {
                if let Some(encoded) = encode(&frame) {
                    yield encoded;
                }
            }

            if reassembler.is_terminated() {
                debug!(
                    id = %reassembler.context().id,
                    completion_tokens = estimate_tokens(Some(reassembler.accumulated_text())),
                    "stream finished"
                );
                return;
            }
        }

        for frame in reassembler.finish() {
            if let Some(encoded) = encode(&frame) {
                yield encoded;
            }
        }
    }
}

/// Frames for a stream whose upstream call failed before any delta arrived.
pub fn failed_stream(
    mut reassembler: StreamReassembler,
    error: &UpstreamError,
) -> impl Stream<Item = String> + Send {
    let frames: Vec<String> = reassembler.fail(error).iter().filter_map(encode).collect();
    futures::stream::iter(frames)
}

fn encode(frame: &Frame) -> Option<String> {
    match frame.encode() {
        Ok(s) => Some(s),
        Err(e) => {
            error!(error = %e, "failed to encode stream frame");
            None
        }
    }
}
