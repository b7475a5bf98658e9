//! Gesture event names and markup scanning.
//!
//! Event detection is name-based over `(event)=` bindings. That is
//! best-effort by design: a binding named like a gesture event is treated as
//! one, and anything else is ignored.

use std::sync::LazyLock;

use regex::Regex;
use unhammer_core::recorder::Span;

/// Events HammerJS provides out of the box.
pub const STANDARD_GESTURE_EVENTS: &[&str] = &[
    "pan",
    "panstart",
    "panmove",
    "panend",
    "pancancel",
    "panleft",
    "panright",
    "panup",
    "pandown",
    "pinch",
    "pinchstart",
    "pinchmove",
    "pinchend",
    "pinchcancel",
    "pinchin",
    "pinchout",
    "press",
    "pressup",
    "rotate",
    "rotatestart",
    "rotatemove",
    "rotateend",
    "rotatecancel",
    "swipe",
    "swipeleft",
    "swiperight",
    "swipeup",
    "swipedown",
    "tap",
];

/// Events only the library gesture config defines.
pub const CUSTOM_GESTURE_EVENTS: &[&str] = &[
    "longpress",
    "slide",
    "slidestart",
    "slideend",
    "slideleft",
    "slideright",
];

/// Gesture events found in one or more templates.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TemplateUsage {
    pub standard: Vec<String>,
    pub custom: Vec<String>,
}

impl TemplateUsage {
    pub fn is_empty(&self) -> bool {
        self.standard.is_empty() && self.custom.is_empty()
    }

    pub fn merge(&mut self, other: TemplateUsage) {
        for event in other.standard {
            if !self.standard.contains(&event) {
                self.standard.push(event);
            }
        }
        for event in other.custom {
            if !self.custom.contains(&event) {
                self.custom.push(event);
            }
        }
    }
}

static EVENT_BINDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([a-zA-Z]+)\)\s*=").unwrap());

/// Classify every `(event)=` binding in a template.
pub fn scan_template(markup: &str) -> TemplateUsage {
    let mut usage = TemplateUsage::default();
    for cap in EVENT_BINDING.captures_iter(markup) {
        let name = cap[1].to_ascii_lowercase();
        if CUSTOM_GESTURE_EVENTS.contains(&name.as_str()) {
            if !usage.custom.contains(&name) {
                usage.custom.push(name);
            }
        } else if STANDARD_GESTURE_EVENTS.contains(&name.as_str()) && !usage.standard.contains(&name)
        {
            usage.standard.push(name);
        }
    }
    usage
}

static HAMMER_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)[ \t]*<script[^>]*src\s*=\s*["'][^"']*hammer[^"']*["'][^>]*>\s*</script>[ \t]*\r?\n?"#)
        .unwrap()
});

/// Spans of `<script src="...hammer...">` elements in an HTML document,
/// including surrounding indentation and the trailing line break.
pub fn find_hammer_scripts(html: &str) -> Vec<Span> {
    HAMMER_SCRIPT
        .find_iter(html)
        .map(|m| Span::new(m.start(), m.end()))
        .collect()
}
