/// Auto-scroll state for the response container.
///
/// Streaming output keeps the view pinned to the bottom until the user
/// scrolls away; scrolling back near the bottom re-enables it.
use std::collections::VecDeque;

/// Distance from the bottom that still counts as "at the bottom"
pub const SCROLL_THRESHOLD: f64 = 30.0;
/// Extra space scrolled past the content so the answer's action row stays visible
pub const EXTRA_SCROLL_SPACE: f64 = 40.0;
pub const COOLDOWN_MS: f64 = 150.0;
/// px per ms
pub const VELOCITY_THRESHOLD: f64 = 0.5;
pub const MAX_MOMENTUM_SAMPLES: usize = 5;

/// The three numbers every decision depends on
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn distance_from_bottom(&self) -> f64 {
        self.scroll_height - (self.scroll_top + self.client_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    position: f64,
    timestamp: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollState {
    allow_auto_scroll: bool,
    manual_scrolling: bool,
    last_scroll_time: f64,
    at_bottom: bool,
    saved_position: f64,
    samples: VecDeque<Sample>,
    velocity: f64,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollState {
    pub fn new() -> Self {
        ScrollState {
            allow_auto_scroll: true,
            manual_scrolling: false,
            last_scroll_time: f64::NEG_INFINITY,
            at_bottom: true,
            saved_position: 0.0,
            samples: VecDeque::with_capacity(MAX_MOMENTUM_SAMPLES + 1),
            velocity: 0.0,
        }
    }

    pub fn allow_auto_scroll(&self) -> bool {
        self.allow_auto_scroll
    }

    pub fn is_manual_scrolling(&self) -> bool {
        self.manual_scrolling
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Wheel, touch or scroll event from the user
    pub fn on_user_scroll(&mut self, metrics: ScrollMetrics, now: f64) {
        self.manual_scrolling = true;
        self.last_scroll_time = now;
        self.save_position(metrics, now);
        self.update_allow_auto_scroll(metrics);
    }

    /// Called once the scroll has been quiet for the cooldown period
    pub fn settle(&mut self, now: f64) {
        if now - self.last_scroll_time >= COOLDOWN_MS {
            self.manual_scrolling = false;
        }
    }

    pub fn update_allow_auto_scroll(&mut self, metrics: ScrollMetrics) {
        self.allow_auto_scroll =
            metrics.distance_from_bottom() - EXTRA_SCROLL_SPACE < SCROLL_THRESHOLD;
    }

    pub fn is_rapid_scrolling(&self) -> bool {
        self.velocity.abs() > VELOCITY_THRESHOLD
    }

    pub fn in_cooldown(&self, now: f64) -> bool {
        now - self.last_scroll_time < COOLDOWN_MS || self.is_rapid_scrolling()
    }

    pub fn is_near_bottom(metrics: ScrollMetrics) -> bool {
        metrics.distance_from_bottom() <= SCROLL_THRESHOLD
    }

    /// Remember where the view was before a resize
    pub fn save_position(&mut self, metrics: ScrollMetrics, now: f64) {
        self.at_bottom = Self::is_near_bottom(metrics);
        self.saved_position = metrics.scroll_top;
        self.record_sample(metrics.scroll_top, now);
    }

    /// Where to put the view after a resize
    pub fn restore_target(&self, metrics: ScrollMetrics, generating: bool) -> f64 {
        if self.at_bottom || generating {
            bottom_target(metrics)
        } else {
            self.saved_position
        }
    }

    pub fn reset(&mut self) {
        *self = ScrollState::new();
    }

    fn record_sample(&mut self, position: f64, timestamp: f64) {
        self.samples.push_back(Sample {
            position,
            timestamp,
        });
        while self.samples.len() > MAX_MOMENTUM_SAMPLES {
            self.samples.pop_front();
        }

        if let (Some(oldest), Some(newest)) = (self.samples.front(), self.samples.back()) {
            let elapsed = newest.timestamp - oldest.timestamp;
            if elapsed > 0.0 {
                self.velocity = (newest.position - oldest.position) / elapsed;
            }
        }
    }
}

/// scrollTop that shows the very bottom plus the action-row margin
pub fn bottom_target(metrics: ScrollMetrics) -> f64 {
    (metrics.scroll_height - metrics.client_height).max(0.0) + EXTRA_SCROLL_SPACE
}
