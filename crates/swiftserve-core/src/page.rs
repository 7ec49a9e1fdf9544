//! Document readiness.

use tracing::debug;

/// `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    /// Parse the DOM string. Unknown values are treated as parsed.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "loading" => Self::Loading,
            "interactive" => Self::Interactive,
            _ => Self::Complete,
        }
    }

    /// Whether the body has been parsed, so elements can be queried.
    pub fn is_parsed(&self) -> bool {
        !matches!(self, Self::Loading)
    }
}

/// Run `task` once the document is parsed.
///
/// When it already is, `task` runs now. Otherwise it is handed to `defer`,
/// which must run it on `DOMContentLoaded`.
pub fn when_parsed(
    state: ReadyState,
    task: impl FnOnce() + 'static,
    defer: impl FnOnce(Box<dyn FnOnce()>),
) {
    if state.is_parsed() {
        task();
    } else {
        debug!("document still loading; deferring page setup");
        defer(Box::new(task));
    }
}
