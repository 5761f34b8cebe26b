//! Size accounting for chunk and prompt budgets.
//!
//! The unit of measure is the whitespace-delimited word. Chunk budgets and
//! answer-prompt budgets all use this same unit; do not mix it with
//! character or subword-token counts elsewhere. Splitting only at
//! whitespace keeps truncation well-formed for any Unicode input (Thai
//! prose has no intra-word boundaries to corrupt).

/// Number of budget units in `text`.
pub fn measure(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Keep at most the first `max_units` words of `text`.
///
/// A no-op when `text` is already within budget, so the original spacing
/// survives; otherwise words are rejoined with single spaces. Idempotent.
pub fn truncate(text: &str, max_units: usize) -> String {
    if measure(text) <= max_units {
        return text.to_string();
    }
    text.split_whitespace()
        .take(max_units)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{measure, truncate};

    #[test]
    fn measure_counts_whitespace_delimited_words() {
        assert_eq!(measure("one two  three\nfour"), 4);
        assert_eq!(measure(""), 0);
        assert_eq!(measure("   "), 0);
    }

    #[test]
    fn truncate_never_exceeds_the_budget() {
        let text = "alpha beta gamma delta epsilon";
        for budget in 0..8 {
            assert!(measure(&truncate(text, budget)) <= budget);
        }
    }

    #[test]
    fn truncate_is_a_noop_under_budget() {
        let text = "keep  original\tspacing";
        assert_eq!(truncate(text, 10), text);
    }

    #[test]
    fn truncate_is_idempotent() {
        let text = "a b c d e f g";
        let once = truncate(text, 3);
        assert_eq!(truncate(&once, 3), once);
    }

    #[test]
    fn truncate_keeps_thai_words_whole() {
        let text = "สวัสดี ครับ วันนี้ อากาศ ดี";
        let got = truncate(text, 2);
        assert_eq!(got, "สวัสดี ครับ");
        assert_eq!(measure(&got), 2);
    }
}
