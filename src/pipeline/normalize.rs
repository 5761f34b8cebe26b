/// Collapse extracted text into a single clean line of prose.
///
/// Embedded NUL characters are dropped, every whitespace run (newlines and
/// tabs included) becomes one ASCII space, and the result is trimmed.
/// Idempotent and total: empty input yields an empty string.
pub fn normalize(raw: &str) -> String {
    raw.replace('\u{0}', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn normalize_collapses_whitespace_runs_to_single_spaces() {
        let got = normalize("  one\t\ttwo\n\n\nthree  four ");
        assert_eq!(got, "one two three four");
    }

    #[test]
    fn normalize_strips_embedded_nul_characters() {
        let got = normalize("page\u{0} one\u{0}\u{0} end");
        assert!(!got.contains('\u{0}'));
        assert_eq!(got, "page one end");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(" a\u{0}\n b \t c ");
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_of_empty_input_is_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t "), "");
    }

    #[test]
    fn normalize_output_never_has_adjacent_whitespace() {
        let got = normalize("mixed \r\n content\u{0}   with\tnoise");
        assert!(!got.contains("  "));
        assert!(!got.contains('\n'));
        assert!(!got.contains('\t'));
    }
}
