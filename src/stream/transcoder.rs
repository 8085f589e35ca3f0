use bytes::Bytes;
use futures_util::Stream;

use crate::error::GatewayError;
use crate::protocol::anthropic::StreamEvent;
use crate::protocol::mapping::stop_reason_to_finish_reason;
use crate::protocol::openai_chat::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
use crate::util::unix_now_secs;

use super::{openai_sse_frame, sse_data_payload, LineBuffer, DONE_FRAME};

/// Stateful native-to-compat SSE transcoder.
///
/// Consumes the Messages event stream chunk by chunk and emits Chat
/// Completions chunk frames, preserving arrival order. One event in, at most
/// one frame out; a malformed event is logged and skipped rather than
/// aborting the stream.
pub struct StreamTranscoder {
    lines: LineBuffer,
    chunk_id: String,
    model: String,
    created: u64,
    finished: bool,
}

impl StreamTranscoder {
    #[must_use]
    pub fn new(chunk_id: String, model: String) -> Self {
        Self {
            lines: LineBuffer::new(),
            chunk_id,
            model,
            created: unix_now_secs(),
            finished: false,
        }
    }

    /// Feed one upstream chunk and append any produced frames to `out`.
    pub fn feed(&mut self, chunk: &[u8], out: &mut Vec<Bytes>) {
        let mut lines = Vec::new();
        self.lines.feed_into(chunk, &mut lines);
        for line in &lines {
            self.process_line(line, out);
        }
    }

    /// Flush the held-back partial line once the upstream stream has closed.
    pub fn finish(&mut self, out: &mut Vec<Bytes>) {
        if let Some(tail) = self.lines.take_remainder() {
            self.process_line(&tail, out);
        }
    }

    fn process_line(&mut self, line: &str, out: &mut Vec<Bytes>) {
        if self.finished {
            return;
        }
        let Some(payload) = sse_data_payload(line) else {
            return;
        };
        if payload.trim() == "[DONE]" {
            out.push(Bytes::from_static(DONE_FRAME.as_bytes()));
            return;
        }

        let event: StreamEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(error = %err, "skipping undecodable stream event");
                return;
            }
        };

        match event {
            StreamEvent::MessageStart {} => out.push(self.chunk_frame(
                ChunkDelta {
                    role: Some("assistant"),
                    content: Some(String::new()),
                },
                None,
            )),
            StreamEvent::ContentBlockDelta { delta } => {
                if delta.kind == "text_delta" {
                    if let Some(text) = delta.text {
                        out.push(self.chunk_frame(
                            ChunkDelta {
                                role: None,
                                content: Some(text),
                            },
                            None,
                        ));
                    }
                }
            }
            StreamEvent::MessageDelta { delta } => {
                if let Some(stop_reason) = delta.stop_reason {
                    let finish = stop_reason_to_finish_reason(Some(&stop_reason)).to_string();
                    out.push(self.chunk_frame(ChunkDelta::default(), Some(finish)));
                }
            }
            StreamEvent::MessageStop {} => {
                out.push(Bytes::from_static(DONE_FRAME.as_bytes()));
                self.finished = true;
            }
            StreamEvent::Error { error } => {
                let body = serde_json::json!({ "error": error });
                out.push(openai_sse_frame(&body.to_string()));
            }
            StreamEvent::ContentBlockStart {}
            | StreamEvent::ContentBlockStop {}
            | StreamEvent::Ping {}
            | StreamEvent::Unrecognized => {}
        }
    }

    fn chunk_frame(&self, delta: ChunkDelta, finish_reason: Option<String>) -> Bytes {
        let chunk = ChatCompletionChunk {
            id: self.chunk_id.clone(),
            object: "chat.completion.chunk",
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        };
        match serde_json::to_string(&chunk) {
            Ok(json) => openai_sse_frame(&json),
            Err(err) => {
                tracing::debug!(error = %err, "failed to serialize chunk frame");
                Bytes::new()
            }
        }
    }
}

/// Adapt an upstream byte stream into a transcoded compat SSE byte stream.
///
/// Frames come out in arrival order; an upstream read error is surfaced as a
/// terminal stream error, and the stream ends when the upstream body ends.
pub fn transcode_sse_stream<S, E>(
    upstream: S,
    transcoder: StreamTranscoder,
) -> impl Stream<Item = Result<Bytes, GatewayError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    use futures_util::StreamExt;
    use std::collections::VecDeque;

    futures_util::stream::unfold(
        (
            Box::pin(upstream),
            transcoder,
            VecDeque::<Bytes>::new(),
            false,
        ),
        |(mut upstream, mut transcoder, mut pending, mut done)| async move {
            loop {
                if let Some(frame) = pending.pop_front() {
                    return Some((Ok(frame), (upstream, transcoder, pending, done)));
                }
                if done {
                    return None;
                }

                let mut produced = Vec::new();
                match upstream.as_mut().next().await {
                    Some(Ok(bytes)) => transcoder.feed(&bytes, &mut produced),
                    Some(Err(err)) => {
                        done = true;
                        return Some((
                            Err(GatewayError::Transport(format!(
                                "upstream stream error: {err}"
                            ))),
                            (upstream, transcoder, pending, done),
                        ));
                    }
                    None => {
                        transcoder.finish(&mut produced);
                        done = true;
                    }
                }
                pending.extend(produced);
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(input: &str) -> Vec<String> {
        let mut transcoder =
            StreamTranscoder::new("chatcmpl-test".to_string(), "test-model".to_string());
        let mut out = Vec::new();
        transcoder.feed(input.as_bytes(), &mut out);
        transcoder.finish(&mut out);
        out.iter()
            .map(|frame| String::from_utf8_lossy(frame).into_owned())
            .collect()
    }

    fn payload(frame: &str) -> serde_json::Value {
        let data = frame.trim_start_matches("data: ").trim();
        serde_json::from_str(data).unwrap()
    }

    #[test]
    fn test_full_event_sequence() {
        let frames = feed_all(concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n",
            "event: content_block_start\n",
            "data: {\"type\":\"content_block_start\",\"index\":0}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
            "event: content_block_stop\n",
            "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
            "event: message_delta\n",
            "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"}}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        ));

        assert_eq!(frames.len(), 4);

        let opening = payload(&frames[0]);
        assert_eq!(opening["choices"][0]["delta"]["role"], "assistant");
        assert_eq!(opening["choices"][0]["delta"]["content"], "");
        assert!(opening["choices"][0]["finish_reason"].is_null());
        assert_eq!(opening["object"], "chat.completion.chunk");
        assert_eq!(opening["model"], "test-model");

        let content = payload(&frames[1]);
        assert_eq!(content["choices"][0]["delta"]["content"], "Hi");

        let finish = payload(&frames[2]);
        assert_eq!(finish["choices"][0]["finish_reason"], "stop");
        assert!(finish["choices"][0]["delta"]
            .as_object()
            .unwrap()
            .is_empty());

        assert_eq!(frames[3], "data: [DONE]\n\n");
    }

    #[test]
    fn test_ping_and_unknown_events_emit_nothing() {
        let frames = feed_all(concat!(
            "data: {\"type\":\"ping\"}\n\n",
            "data: {\"type\":\"content_block_checkpoint\"}\n\n",
        ));
        assert!(frames.is_empty());
    }

    #[test]
    fn test_done_passthrough_does_not_finish_stream() {
        let frames = feed_all(concat!(
            "data: [DONE]\n\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"x\"}}\n\n",
        ));
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], "data: [DONE]\n\n");
    }

    #[test]
    fn test_nothing_relayed_after_message_stop() {
        let frames = feed_all(concat!(
            "data: {\"type\":\"message_stop\"}\n\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"late\"}}\n\n",
        ));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], "data: [DONE]\n\n");
    }

    #[test]
    fn test_malformed_event_is_skipped() {
        let frames = feed_all(concat!(
            "data: {not json}\n\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"ok\"}}\n\n",
        ));
        assert_eq!(frames.len(), 1);
        assert_eq!(payload(&frames[0])["choices"][0]["delta"]["content"], "ok");
    }

    #[test]
    fn test_error_event_emits_error_chunk() {
        let frames = feed_all(
            "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"busy\"}}\n\n",
        );
        assert_eq!(frames.len(), 1);
        let body = payload(&frames[0]);
        assert_eq!(body["error"]["type"], "overloaded_error");
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut transcoder = StreamTranscoder::new("chatcmpl-1".to_string(), "m".to_string());
        let mut out = Vec::new();
        transcoder.feed(b"data: {\"type\":\"content_block_delta\",\"delta\"", &mut out);
        assert!(out.is_empty());
        transcoder.feed(b":{\"type\":\"text_delta\",\"text\":\"AB\"}}\n\n", &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_non_text_delta_ignored() {
        let frames = feed_all(
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\"}}\n\n",
        );
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn test_transcode_stream_orders_and_terminates() {
        use futures_util::StreamExt;

        let chunks: Vec<Result<Bytes, std::convert::Infallible>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"type\":\"message_start\",\"message\":{}}\n\n",
            )),
            Ok(Bytes::from_static(
                b"data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\ndata: {\"type\":\"message_stop\"}\n\n",
            )),
        ];
        let upstream = futures_util::stream::iter(chunks);
        let transcoder = StreamTranscoder::new("chatcmpl-1".to_string(), "m".to_string());
        let frames: Vec<_> = transcode_sse_stream(upstream, transcoder).collect().await;

        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(Result::is_ok));
        let last = frames.last().unwrap().as_ref().unwrap();
        assert_eq!(last.as_ref(), b"data: [DONE]\n\n");
    }
}
