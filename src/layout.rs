/// Popup geometry: initial placement next to the selection, size limits, dragging, resizing

pub const DEFAULT_WIDTH: f64 = 580.0;
pub const DEFAULT_HEIGHT: f64 = 380.0;
pub const MIN_WIDTH: f64 = 300.0;
pub const MAX_WIDTH: f64 = 900.0;
pub const MIN_HEIGHT: f64 = 200.0;
pub const MAX_HEIGHT: f64 = 800.0;
/// Above anything the host page stacks
pub const POPUP_Z_INDEX: u32 = 2_147_483_647;

/// Client rect of the selection (viewport coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

/// Page coordinates of the popup's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub left: f64,
    pub top: f64,
}

impl Position {
    pub fn to_style(self) -> String {
        format!("left: {}px; top: {}px;", self.left.round(), self.top.round())
    }
}

/// Anchor used when nothing is selected: centered, popup-height/2 above middle
pub fn centered_anchor(viewport: &Viewport) -> Rect {
    Rect {
        left: viewport.width / 2.0,
        top: viewport.height / 2.0 - DEFAULT_HEIGHT / 2.0,
        width: 0.0,
        height: 0.0,
    }
}

/// Center under the selection, flip above if there is no room below, then
/// clamp into the visible part of the page
pub fn initial_position(anchor: &Rect, viewport: &Viewport) -> Position {
    let mut left = anchor.left + viewport.scroll_x + anchor.width / 2.0 - DEFAULT_WIDTH / 2.0;
    let mut top = anchor.top + viewport.scroll_y + anchor.height;

    if top + DEFAULT_HEIGHT > viewport.height + viewport.scroll_y {
        top = anchor.top + viewport.scroll_y - DEFAULT_HEIGHT;
    }

    let max_left = viewport.width + viewport.scroll_x - DEFAULT_WIDTH;
    let max_top = viewport.height + viewport.scroll_y - DEFAULT_HEIGHT;
    left = left.min(max_left).max(viewport.scroll_x);
    top = top.min(max_top).max(viewport.scroll_y);

    Position { left, top }
}

/// Clamp a requested size to the resize limits
pub fn clamp_size(width: f64, height: f64) -> (f64, f64) {
    (
        width.clamp(MIN_WIDTH, MAX_WIDTH),
        height.clamp(MIN_HEIGHT, MAX_HEIGHT),
    )
}

/// Inline style of the popup box. It is absolutely positioned in page
/// coordinates and clips its own content.
pub fn popup_style(position: Position, width: f64, height: f64) -> String {
    format!(
        "position: absolute; z-index: {}; overflow: hidden; {} width: {}px; height: {}px; \
         min-width: {}px; max-width: {}px; min-height: {}px; max-height: {}px;",
        POPUP_Z_INDEX,
        position.to_style(),
        width.round(),
        height.round(),
        MIN_WIDTH,
        MAX_WIDTH,
        MIN_HEIGHT,
        MAX_HEIGHT
    )
}

/// An in-progress drag of the popup by its handle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    start_x: f64,
    start_y: f64,
    origin: Position,
}

impl DragState {
    pub fn start(pointer_x: f64, pointer_y: f64, origin: Position) -> DragState {
        DragState {
            start_x: pointer_x,
            start_y: pointer_y,
            origin,
        }
    }

    pub fn position_for(&self, pointer_x: f64, pointer_y: f64) -> Position {
        Position {
            left: self.origin.left + (pointer_x - self.start_x),
            top: (self.origin.top + (pointer_y - self.start_y)).max(0.0),
        }
    }
}

/// An in-progress resize from the bottom-right corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeState {
    start_x: f64,
    start_y: f64,
    width: f64,
    height: f64,
}

impl ResizeState {
    pub fn start(pointer_x: f64, pointer_y: f64, width: f64, height: f64) -> ResizeState {
        ResizeState {
            start_x: pointer_x,
            start_y: pointer_y,
            width,
            height,
        }
    }

    pub fn size_for(&self, pointer_x: f64, pointer_y: f64) -> (f64, f64) {
        clamp_size(
            self.width + (pointer_x - self.start_x),
            self.height + (pointer_y - self.start_y),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport {
            width: 1280.0,
            height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }

    #[test]
    fn test_places_below_selection() {
        let anchor = Rect {
            left: 500.0,
            top: 100.0,
            width: 100.0,
            height: 20.0,
        };
        let pos = initial_position(&anchor, &viewport());

        assert_eq!(pos.left, 550.0 - DEFAULT_WIDTH / 2.0);
        assert_eq!(pos.top, 120.0);
    }

    #[test]
    fn test_flips_above_near_bottom() {
        let anchor = Rect {
            left: 500.0,
            top: 700.0,
            width: 100.0,
            height: 20.0,
        };
        let pos = initial_position(&anchor, &viewport());

        assert_eq!(pos.top, 700.0 - DEFAULT_HEIGHT);
    }

    #[test]
    fn test_clamps_to_viewport_edges() {
        let anchor = Rect {
            left: 5.0,
            top: 10.0,
            width: 10.0,
            height: 10.0,
        };
        let pos = initial_position(&anchor, &viewport());
        assert_eq!(pos.left, 0.0);

        let anchor = Rect {
            left: 1270.0,
            ..anchor
        };
        let pos = initial_position(&anchor, &viewport());
        assert_eq!(pos.left, 1280.0 - DEFAULT_WIDTH);
    }

    #[test]
    fn test_accounts_for_page_scroll() {
        let vp = Viewport {
            scroll_y: 2000.0,
            ..viewport()
        };
        let anchor = Rect {
            left: 500.0,
            top: 100.0,
            width: 0.0,
            height: 20.0,
        };
        let pos = initial_position(&anchor, &vp);
        assert_eq!(pos.top, 2120.0);
    }

    #[test]
    fn test_centered_anchor() {
        let anchor = centered_anchor(&viewport());
        let pos = initial_position(&anchor, &viewport());

        assert_eq!(pos.left, 640.0 - DEFAULT_WIDTH / 2.0);
        assert_eq!(pos.top, 400.0 - DEFAULT_HEIGHT / 2.0);
    }

    #[test]
    fn test_clamp_size() {
        assert_eq!(clamp_size(100.0, 100.0), (MIN_WIDTH, MIN_HEIGHT));
        assert_eq!(clamp_size(2000.0, 2000.0), (MAX_WIDTH, MAX_HEIGHT));
        assert_eq!(clamp_size(600.0, 400.0), (600.0, 400.0));
    }

    #[test]
    fn test_drag() {
        let drag = DragState::start(100.0, 100.0, Position { left: 50.0, top: 60.0 });
        assert_eq!(drag.position_for(130.0, 90.0), Position { left: 80.0, top: 50.0 });
        assert_eq!(drag.position_for(100.0, 0.0).top, 0.0);
    }

    #[test]
    fn test_resize() {
        let resize = ResizeState::start(200.0, 200.0, 580.0, 380.0);
        assert_eq!(resize.size_for(250.0, 180.0), (630.0, 360.0));
        assert_eq!(resize.size_for(-400.0, -400.0), (MIN_WIDTH, MIN_HEIGHT));
        assert_eq!(resize.size_for(900.0, 900.0), (MAX_WIDTH, MAX_HEIGHT));
    }

    #[test]
    fn test_position_style() {
        let style = Position { left: 10.4, top: 20.6 }.to_style();
        assert_eq!(style, "left: 10px; top: 21px;");

        let popup = popup_style(Position { left: 10.4, top: 20.6 }, 580.0, 380.0);
        assert!(popup.starts_with("position: absolute; z-index: 2147483647; overflow: hidden;"));
        assert!(popup.contains("left: 10px; top: 21px;"));
        assert!(popup.contains("width: 580px; height: 380px;"));
        assert!(popup.contains("min-width: 300px; max-width: 900px;"));
    }
}
