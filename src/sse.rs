/// Incremental decoder for `data: {...}` completion streams
use log::warn;
use serde::Deserialize;

const DONE_MARKER: &str = "[DONE]";

/// One decoded frame of a streaming completion
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    Delta {
        content: Option<String>,
        reasoning: Option<String>,
    },
    Done,
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

/// Buffers raw body bytes and yields events once a frame's blank-line
/// terminator has arrived. Bytes stay undecoded until then, so multi-byte
/// characters split across network chunks survive.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        SseDecoder { buffer: Vec::new() }
    }

    /// Feed a chunk of the response body
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some((end, terminator_len)) = find_frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + terminator_len).take(end).collect();
            events.extend(decode_frame(&frame));
        }
        events
    }

    /// Flush whatever is left once the body has ended
    pub fn finish(&mut self) -> Vec<SseEvent> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let frame = std::mem::take(&mut self.buffer);
        decode_frame(&frame)
    }
}

/// Position and length of the first blank-line terminator
fn find_frame_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n");
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n");

    match (lf, crlf) {
        (Some(a), Some(b)) if b < a => Some((b, 4)),
        (Some(a), _) => Some((a, 2)),
        (None, Some(b)) => Some((b, 4)),
        (None, None) => None,
    }
}

fn decode_frame(frame: &[u8]) -> Vec<SseEvent> {
    let text = String::from_utf8_lossy(frame);

    text.lines()
        .filter_map(|line| {
            let line = line.trim_end_matches('\r');
            line.strip_prefix("data:")
                .map(|payload| payload.strip_prefix(' ').unwrap_or(payload))
        })
        .filter(|payload| !payload.is_empty())
        .filter_map(parse_payload)
        .collect()
}

fn parse_payload(payload: &str) -> Option<SseEvent> {
    if payload.trim() == DONE_MARKER {
        return Some(SseEvent::Done);
    }

    match serde_json::from_str::<ChunkPayload>(payload) {
        Ok(chunk) => {
            let delta = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta)
                .unwrap_or_default();
            Some(SseEvent::Delta {
                content: delta.content.filter(|s| !s.is_empty()),
                reasoning: delta.reasoning_content.filter(|s| !s.is_empty()),
            })
        }
        Err(e) => {
            warn!("Skipping unparsable stream payload: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(s: &str) -> SseEvent {
        SseEvent::Delta {
            content: Some(s.to_string()),
            reasoning: None,
        }
    }

    #[test]
    fn test_single_chunk_with_two_frames() {
        let mut decoder = SseDecoder::new();
        let body = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n";

        let events = decoder.push(body);

        assert_eq!(events, vec![content("Hel"), content("lo")]);
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = SseDecoder::new();

        let first = decoder.push(b"data: {\"choices\":[{\"delta\":{\"cont");
        let second = decoder.push(b"ent\":\"Hi\"}}]}\n");
        let third = decoder.push(b"\n");

        assert!(first.is_empty());
        assert!(second.is_empty());
        assert_eq!(third, vec![content("Hi")]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"}}]}\n\n".as_bytes();
        let split = body.iter().position(|&b| b >= 0x80).unwrap() + 1;

        let mut events = decoder.push(&body[..split]);
        events.extend(decoder.push(&body[split..]));

        assert_eq!(events, vec![content("你好")]);
    }

    #[test]
    fn test_done_marker() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: [DONE]\n\n");
        assert_eq!(events, vec![SseEvent::Done]);
    }

    #[test]
    fn test_reasoning_content() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(
            b"data: {\"choices\":[{\"delta\":{\"content\":null,\"reasoning_content\":\"think\"}}]}\n\n",
        );

        assert_eq!(
            events,
            vec![SseEvent::Delta {
                content: None,
                reasoning: Some("think".to_string()),
            }]
        );
    }

    #[test]
    fn test_crlf_terminators() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\r\n\r\ndata: [DONE]\r\n\r\n");
        assert_eq!(events, vec![content("a"), SseEvent::Done]);
    }

    #[test]
    fn test_invalid_json_is_skipped() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {not json\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n");
        assert_eq!(events, vec![content("ok")]);
    }

    #[test]
    fn test_comments_and_keepalives_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keep-alive\n\nevent: ping\n\n");
        assert!(events.is_empty());
    }

    #[test]
    fn test_finish_flushes_unterminated_frame() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}").is_empty());

        assert_eq!(decoder.finish(), vec![content("tail")]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_empty_choices() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"choices\":[]}\n\n");
        assert_eq!(
            events,
            vec![SseEvent::Delta {
                content: None,
                reasoning: None
            }]
        );
    }
}
