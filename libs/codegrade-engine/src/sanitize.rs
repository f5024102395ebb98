/// Maximum characters of user-controlled text that reach a log line.
const PREVIEW_LIMIT: usize = 100;

/// Single-line preview of user-controlled text for logging.
///
/// Strips newlines and control characters, drops angle brackets and caps the
/// length so submission output cannot forge or flood log records.
pub fn log_preview(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() && *c != '<' && *c != '>')
        .take(PREVIEW_LIMIT)
        .collect()
}

/// First non-blank line of `text`, sanitized for logging.
pub fn first_line_preview(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    log_preview(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_preview_strips_control_characters() {
        assert_eq!(log_preview("a\r\nb\x1b[31mc"), "ab[31mc");
        assert_eq!(log_preview("<script>"), "script");
    }

    #[test]
    fn test_log_preview_caps_length() {
        let long = "x".repeat(500);
        assert_eq!(log_preview(&long).chars().count(), PREVIEW_LIMIT);
    }

    #[test]
    fn test_first_line_preview() {
        assert_eq!(first_line_preview("\n\n  error: boom\nmore"), "  error: boom");
        assert_eq!(first_line_preview(""), "");
    }
}
