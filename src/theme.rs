/// Light/dark detection from the host page's computed background
use regex::Regex;
use std::sync::OnceLock;

pub const DARK_CLASS: &str = "dark-mode";

const DARK_BRIGHTNESS: f64 = 128.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    /// Perceived brightness, 0..=255
    pub fn brightness(&self) -> f64 {
        (self.r as f64 * 299.0 + self.g as f64 * 587.0 + self.b as f64 * 114.0) / 1000.0
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0.0
    }
}

fn color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*rgba?\(\s*(\d{1,3})[\s,]+(\d{1,3})[\s,]+(\d{1,3})(?:\s*[,/]\s*([\d.]+%?))?\s*\)\s*$")
            .expect("valid regex")
    })
}

/// Parse a computed `rgb()`/`rgba()` value; anything else yields None
pub fn parse_css_color(value: &str) -> Option<Rgba> {
    let caps = color_pattern().captures(value)?;
    let channel = |i: usize| caps.get(i)?.as_str().parse::<u16>().ok().map(|v| v.min(255) as u8);

    let a = match caps.get(4) {
        Some(m) => {
            let raw = m.as_str();
            match raw.strip_suffix('%') {
                Some(pct) => pct.parse::<f64>().ok()? / 100.0,
                None => raw.parse::<f64>().ok()?,
            }
        }
        None => 1.0,
    };

    Some(Rgba {
        r: channel(1)?,
        g: channel(2)?,
        b: channel(3)?,
        a,
    })
}

/// Body background wins unless it is transparent; then the root's.
/// Unknown or fully transparent backgrounds count as light.
pub fn is_dark_background(body: &str, html: &str) -> bool {
    let body_color = parse_css_color(body);
    let effective = match body_color {
        Some(color) if color.is_transparent() => parse_css_color(html),
        other => other,
    };

    match effective {
        Some(color) if !color.is_transparent() => color.brightness() < DARK_BRIGHTNESS,
        _ => false,
    }
}

fn background_of(window: &web_sys::Window, element: Option<web_sys::Element>) -> String {
    element
        .and_then(|el| window.get_computed_style(&el).ok().flatten())
        .and_then(|style| style.get_property_value("background-color").ok())
        .unwrap_or_default()
}

/// Read the host page's computed backgrounds
pub fn page_is_dark() -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    let Some(document) = window.document() else {
        return false;
    };
    let body = background_of(&window, document.body().map(Into::into));
    let html = background_of(&window, document.document_element());
    is_dark_background(&body, &html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgb() {
        assert_eq!(
            parse_css_color("rgb(18, 18, 18)"),
            Some(Rgba { r: 18, g: 18, b: 18, a: 1.0 })
        );
    }

    #[test]
    fn test_parse_rgba() {
        let color = parse_css_color("rgba(0, 0, 0, 0)").unwrap();
        assert!(color.is_transparent());

        let color = parse_css_color("rgba(255, 255, 255, 0.5)").unwrap();
        assert_eq!(color.a, 0.5);
    }

    #[test]
    fn test_parse_space_separated() {
        let color = parse_css_color("rgb(10 20 30 / 50%)").unwrap();
        assert_eq!((color.r, color.g, color.b), (10, 20, 30));
        assert_eq!(color.a, 0.5);
    }

    #[test]
    fn test_parse_rejects_other_formats() {
        assert_eq!(parse_css_color("transparent"), None);
        assert_eq!(parse_css_color("#ffffff"), None);
    }

    #[test]
    fn test_brightness() {
        let white = Rgba { r: 255, g: 255, b: 255, a: 1.0 };
        assert_eq!(white.brightness(), 255.0);
    }

    #[test]
    fn test_dark_body() {
        assert!(is_dark_background("rgb(30, 30, 30)", "rgb(255, 255, 255)"));
        assert!(!is_dark_background("rgb(250, 250, 250)", "rgb(0, 0, 0)"));
    }

    #[test]
    fn test_transparent_body_falls_back_to_html() {
        assert!(is_dark_background("rgba(0, 0, 0, 0)", "rgb(20, 20, 20)"));
    }

    #[test]
    fn test_all_transparent_is_light() {
        assert!(!is_dark_background("rgba(0, 0, 0, 0)", "rgba(0, 0, 0, 0)"));
        assert!(!is_dark_background("", ""));
    }
}
