//! Builds the grounded question-answering prompt under a word budget.

use crate::pipeline::tokens;

/// Share of the remaining budget given to the raw document context.
const CONTEXT_SHARE_PERCENT: usize = 30;
/// Share given to the summary, which is denser and answers most questions.
const SUMMARY_SHARE_PERCENT: usize = 70;

fn render(context: &str, summary: &str, question: &str) -> String {
    format!(
        "Answer the question using only the source document and its summary below.\n\n\
         Source document:\n{context}\n\n\
         Summary:\n{summary}\n\n\
         Question: {question}\nAnswer:"
    )
}

/// Render the answer prompt, truncating context and summary when the naive
/// rendering would exceed `budget_words`.
///
/// The fixed overhead (the template with empty context and summary) is
/// measured first; whatever budget remains is split 30/70 between context
/// and summary with floor division, and each part is truncated
/// independently. The result never exceeds the budget by more than the
/// fixed overhead itself.
pub fn build_answer_prompt(
    context: &str,
    summary: &str,
    question: &str,
    budget_words: usize,
) -> String {
    let naive = render(context, summary, question);
    if tokens::measure(&naive) <= budget_words {
        return naive;
    }

    let overhead = tokens::measure(&render("", "", question));
    let available = budget_words.saturating_sub(overhead);
    let context_budget = available * CONTEXT_SHARE_PERCENT / 100;
    let summary_budget = available * SUMMARY_SHARE_PERCENT / 100;
    render(
        &tokens::truncate(context, context_budget),
        &tokens::truncate(summary, summary_budget),
        question,
    )
}

#[cfg(test)]
mod tests {
    use super::{build_answer_prompt, render};
    use crate::pipeline::tokens;

    fn words(n: usize, tag: &str) -> String {
        (0..n).map(|i| format!("{tag}{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn prompt_is_untouched_when_under_budget() {
        let context = words(10, "c");
        let summary = words(5, "s");
        let got = build_answer_prompt(&context, &summary, "what is it?", 500);
        assert_eq!(got, render(&context, &summary, "what is it?"));
    }

    #[test]
    fn over_budget_prompt_is_truncated_to_the_budget() {
        let context = words(400, "c");
        let summary = words(400, "s");
        let budget = 120;
        let got = build_answer_prompt(&context, &summary, "what is it?", budget);
        assert!(tokens::measure(&got) <= budget);
    }

    #[test]
    fn truncation_splits_the_remaining_budget_thirty_seventy() {
        let context = words(1000, "c");
        let summary = words(1000, "s");
        let question = "what is it?";
        let budget = 220;
        let got = build_answer_prompt(&context, &summary, question, budget);

        let overhead = tokens::measure(&render("", "", question));
        let available = budget - overhead;
        let context_kept = got
            .split_whitespace()
            .filter(|word| word.starts_with('c') && word[1..].chars().all(|ch| ch.is_ascii_digit()))
            .count();
        let summary_kept = got
            .split_whitespace()
            .filter(|word| word.starts_with('s') && word[1..].chars().all(|ch| ch.is_ascii_digit()))
            .count();
        assert_eq!(context_kept, available * 30 / 100);
        assert_eq!(summary_kept, available * 70 / 100);
    }

    #[test]
    fn question_is_embedded_verbatim() {
        let got = build_answer_prompt("ctx", "sum", "ทำไมฟ้าเป็นสีฟ้า?", 400);
        assert!(got.contains("ทำไมฟ้าเป็นสีฟ้า?"));
    }

    #[test]
    fn empty_summary_still_renders_a_complete_template() {
        let got = build_answer_prompt("some context here", "", "q?", 400);
        assert!(got.contains("Source document:"));
        assert!(got.contains("Summary:"));
        assert!(got.ends_with("Answer:"));
    }
}
