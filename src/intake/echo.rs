//! Echo preference store and echo text shaping.

use std::collections::HashMap;

use tokio::sync::Mutex;

/// Maximum number of characters echoed back before truncation.
pub const ECHO_MAX_CHARS: usize = 1000;

/// Marker appended when the echoed text was truncated.
pub const ECHO_TRUNCATION_MARKER: &str = "...";

/// Per-user echo toggle. Enabled by default; lives for the process
/// lifetime, independent of session state.
pub struct EchoPrefs {
    inner: Mutex<HashMap<String, bool>>,
}

impl EchoPrefs {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Whether echo is enabled for the user (true when never toggled).
    pub async fn is_enabled(&self, user_id: &str) -> bool {
        let prefs = self.inner.lock().await;
        prefs.get(user_id).copied().unwrap_or(true)
    }

    /// Set the user's echo preference.
    pub async fn set(&self, user_id: &str, enabled: bool) {
        let mut prefs = self.inner.lock().await;
        prefs.insert(user_id.to_string(), enabled);
    }
}

impl Default for EchoPrefs {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate echo text to [`ECHO_MAX_CHARS`] characters, appending the
/// truncation marker when anything was cut.
pub fn truncate_echo(text: &str) -> String {
    match text.char_indices().nth(ECHO_MAX_CHARS) {
        Some((byte_offset, _)) => format!("{}{ECHO_TRUNCATION_MARKER}", &text[..byte_offset]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_defaults_to_enabled() {
        let prefs = EchoPrefs::new();
        assert!(prefs.is_enabled("u1").await);
    }

    #[tokio::test]
    async fn toggling_is_per_user() {
        let prefs = EchoPrefs::new();
        prefs.set("u1", false).await;

        assert!(!prefs.is_enabled("u1").await);
        assert!(prefs.is_enabled("u2").await);

        prefs.set("u1", true).await;
        assert!(prefs.is_enabled("u1").await);
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_echo("hello"), "hello");
    }

    #[test]
    fn text_at_limit_is_untouched() {
        let text = "a".repeat(ECHO_MAX_CHARS);
        assert_eq!(truncate_echo(&text), text);
    }

    #[test]
    fn long_text_is_cut_with_marker() {
        let text = "a".repeat(ECHO_MAX_CHARS + 1);
        let echoed = truncate_echo(&text);
        assert_eq!(echoed.chars().count(), ECHO_MAX_CHARS + ECHO_TRUNCATION_MARKER.len());
        assert!(echoed.ends_with(ECHO_TRUNCATION_MARKER));
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let text = "é".repeat(ECHO_MAX_CHARS + 10);
        let echoed = truncate_echo(&text);
        assert!(echoed.ends_with(ECHO_TRUNCATION_MARKER));
        let body = echoed.trim_end_matches(ECHO_TRUNCATION_MARKER);
        assert_eq!(body.chars().count(), ECHO_MAX_CHARS);
    }
}
