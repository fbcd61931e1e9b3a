/// Streaming response assembler: turns decoded stream events into
/// throttled render snapshots and a final outcome.
use crate::sse::SseEvent;

/// Minimum spacing between two render snapshots, in milliseconds
pub const DEFAULT_THROTTLE_MS: f64 = 32.0;

/// Snapshot of everything received so far
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderFrame {
    pub content: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    Completed,
    Cancelled,
}

/// What a finished stream leaves behind
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOutcome {
    pub content: String,
    pub reasoning: String,
    pub finish: Finish,
}

impl StreamOutcome {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.reasoning.is_empty()
    }
}

#[derive(Debug)]
pub struct StreamAssembler {
    content: String,
    reasoning: String,
    include_reasoning: bool,
    throttle_ms: f64,
    last_frame_at: Option<f64>,
    dirty: bool,
    done: bool,
}

impl StreamAssembler {
    pub fn new(include_reasoning: bool, throttle_ms: f64) -> Self {
        StreamAssembler {
            content: String::new(),
            reasoning: String::new(),
            include_reasoning,
            throttle_ms,
            last_frame_at: None,
            dirty: false,
            done: false,
        }
    }

    pub fn apply(&mut self, event: SseEvent) {
        if self.done {
            return;
        }

        match event {
            SseEvent::Delta { content, reasoning } => {
                if let Some(text) = content {
                    self.content.push_str(&text);
                    self.dirty = true;
                }
                if let Some(text) = reasoning.filter(|_| self.include_reasoning) {
                    self.reasoning.push_str(&text);
                    self.dirty = true;
                }
            }
            SseEvent::Done => self.done = true,
        }
    }

    /// True once the server sent its end-of-stream marker
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Emit a snapshot if there is something new and the throttle window passed
    pub fn poll_frame(&mut self, now_ms: f64) -> Option<RenderFrame> {
        if !self.dirty {
            return None;
        }
        let due = self
            .last_frame_at
            .map_or(true, |last| now_ms - last >= self.throttle_ms);
        if !due {
            return None;
        }

        self.last_frame_at = Some(now_ms);
        self.take_frame()
    }

    /// Emit the pending snapshot regardless of the throttle
    pub fn flush(&mut self) -> Option<RenderFrame> {
        if self.dirty { self.take_frame() } else { None }
    }

    pub fn finish(self, finish: Finish) -> StreamOutcome {
        StreamOutcome {
            content: self.content,
            reasoning: self.reasoning,
            finish,
        }
    }

    fn take_frame(&mut self) -> Option<RenderFrame> {
        self.dirty = false;
        Some(RenderFrame {
            content: self.content.clone(),
            reasoning: self.reasoning.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(content: &str) -> SseEvent {
        SseEvent::Delta {
            content: Some(content.to_string()),
            reasoning: None,
        }
    }

    #[test]
    fn test_concatenates_content() {
        let mut assembler = StreamAssembler::new(false, DEFAULT_THROTTLE_MS);
        assembler.apply(delta("Hello"));
        assembler.apply(delta(", world"));

        let frame = assembler.flush().unwrap();
        assert_eq!(frame.content, "Hello, world");
    }

    #[test]
    fn test_throttles_frames() {
        let mut assembler = StreamAssembler::new(false, 32.0);

        assembler.apply(delta("a"));
        assert_eq!(assembler.poll_frame(0.0).unwrap().content, "a");

        assembler.apply(delta("b"));
        assert!(assembler.poll_frame(10.0).is_none());

        assembler.apply(delta("c"));
        assert_eq!(assembler.poll_frame(40.0).unwrap().content, "abc");
    }

    #[test]
    fn test_no_frame_without_changes() {
        let mut assembler = StreamAssembler::new(false, 32.0);
        assert!(assembler.poll_frame(100.0).is_none());

        assembler.apply(delta("x"));
        assert!(assembler.flush().is_some());
        assert!(assembler.flush().is_none());
    }

    #[test]
    fn test_reasoning_only_when_enabled() {
        let event = SseEvent::Delta {
            content: None,
            reasoning: Some("thinking".to_string()),
        };

        let mut chat = StreamAssembler::new(false, 32.0);
        chat.apply(event.clone());
        assert!(chat.flush().is_none());

        let mut reasoner = StreamAssembler::new(true, 32.0);
        reasoner.apply(event);
        assert_eq!(reasoner.flush().unwrap().reasoning, "thinking");
    }

    #[test]
    fn test_events_after_done_are_ignored() {
        let mut assembler = StreamAssembler::new(false, 32.0);
        assembler.apply(delta("final"));
        assembler.apply(SseEvent::Done);
        assembler.apply(delta(" extra"));

        assert!(assembler.is_done());
        let outcome = assembler.finish(Finish::Completed);
        assert_eq!(outcome.content, "final");
    }

    #[test]
    fn test_cancel_keeps_partial_output() {
        let mut assembler = StreamAssembler::new(true, 32.0);
        assembler.apply(SseEvent::Delta {
            content: Some("partial".to_string()),
            reasoning: Some("why".to_string()),
        });

        let outcome = assembler.finish(Finish::Cancelled);

        assert_eq!(outcome.finish, Finish::Cancelled);
        assert_eq!(outcome.content, "partial");
        assert_eq!(outcome.reasoning, "why");
        assert!(!outcome.is_empty());
    }
}
