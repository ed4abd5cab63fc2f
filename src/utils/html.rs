// src/utils/html.rs

/// Strips dangerous markup from user-supplied text with ammonia's whitelist.
///
/// Safe formatting tags survive, `<script>` disappears along with its content,
/// and event-handler attributes are dropped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitizes and trims an optional field. Text that is empty after cleaning becomes `None`.
pub fn clean_optional(input: Option<String>) -> Option<String> {
    input
        .map(|s| clean_html(s.trim()))
        .filter(|s| !s.is_empty())
}
