use anyhow::Result;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix epoch in seconds. The one clock helper for the crate;
/// do not duplicate it in other modules.
pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Clamp `input` to at most `max_chars` Unicode characters, dropping
/// control characters and appending `…` when anything was cut. Used to
/// bound upstream error bodies before they reach logs or responses.
pub fn truncate_with_ellipsis(input: &str, max_chars: usize) -> String {
    let clean: String = input.chars().filter(|c| !c.is_control()).collect();
    if clean.chars().count() > max_chars {
        let mut s: String = clean.chars().take(max_chars).collect();
        s.push('…');
        s
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_with_ellipsis;

    #[test]
    fn truncate_with_ellipsis_keeps_short_input_intact() {
        assert_eq!(truncate_with_ellipsis("short", 16), "short");
    }

    #[test]
    fn truncate_with_ellipsis_strips_control_characters() {
        let got = truncate_with_ellipsis("a\u{0}b\tc", 16);
        assert_eq!(got, "abc");
    }

    #[test]
    fn truncate_with_ellipsis_appends_marker_when_cut() {
        let got = truncate_with_ellipsis("0123456789", 4);
        assert_eq!(got, "0123…");
    }
}
