/// Guards against re-entrant popup creation and the selection listener
/// firing while the selection icon is being clicked.
///
/// Each flag is a deadline on the page clock instead of a boolean that a
/// timer has to remember to clear.

/// How long a creation or icon click suppresses further events
pub const GUARD_WINDOW_MS: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PopupGuard {
    creating_until: f64,
    icon_click_until: f64,
    visible: bool,
}

impl Default for PopupGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl PopupGuard {
    pub fn new() -> Self {
        PopupGuard {
            creating_until: f64::NEG_INFINITY,
            icon_click_until: f64::NEG_INFINITY,
            visible: false,
        }
    }

    /// Claim the creation slot; false while another creation is in flight
    pub fn try_begin_create(&mut self, now: f64) -> bool {
        if self.is_creating(now) {
            return false;
        }
        self.creating_until = now + GUARD_WINDOW_MS;
        true
    }

    pub fn is_creating(&self, now: f64) -> bool {
        now < self.creating_until
    }

    pub fn begin_icon_click(&mut self, now: f64) {
        self.icon_click_until = now + GUARD_WINDOW_MS;
    }

    pub fn handling_icon_click(&self, now: f64) -> bool {
        now < self.icon_click_until
    }

    /// Whether a mouseup may show the selection icon
    pub fn accepts_selection(&self, now: f64) -> bool {
        !self.is_creating(now) && !self.handling_icon_click(now)
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn reset(&mut self) {
        *self = PopupGuard::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_reentrant_creation() {
        let mut guard = PopupGuard::new();

        assert!(guard.try_begin_create(1000.0));
        assert!(!guard.try_begin_create(1050.0));
        assert!(guard.try_begin_create(1100.0));
    }

    #[test]
    fn test_icon_click_window() {
        let mut guard = PopupGuard::new();
        guard.begin_icon_click(500.0);

        assert!(guard.handling_icon_click(550.0));
        assert!(!guard.accepts_selection(550.0));
        assert!(!guard.handling_icon_click(600.0));
        assert!(guard.accepts_selection(600.0));
    }

    #[test]
    fn test_visibility_and_reset() {
        let mut guard = PopupGuard::new();
        guard.set_visible(true);
        guard.try_begin_create(0.0);
        assert!(guard.is_visible());

        guard.reset();

        assert!(!guard.is_visible());
        assert!(guard.accepts_selection(1.0));
    }
}
