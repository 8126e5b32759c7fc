//! Strips retrieval citation markers from assistant output.

use regex::Regex;
use std::sync::LazyLock;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    let rule = |pattern: &str, replacement| Rule {
        pattern: Regex::new(pattern).expect("citation pattern is valid"),
        replacement,
    };
    // Order matters: later rules clean up what earlier ones leave behind.
    vec![
        // [CALL summary], [call conversation], [Chunk 3], [Chunks 1-2]
        rule(r"(?i)\[(?:call|chunk)[^\]]*\]", ""),
        // 【CALL summary】 and anything else in full-width brackets
        rule(r"【[^】]*】", ""),
        rule(r" {2,}", " "),
        rule(r#""\s*""#, ""),
        rule(r"\.(?:\s*\.)+", "."),
    ]
});

/// Remove citation markers and the whitespace/punctuation debris they leave.
///
/// Only meant for assistant text; user input is displayed as typed.
pub fn filter_citations(content: &str) -> String {
    let mut current = content.to_string();
    loop {
        let next = apply_rules(&current);
        // every rule only shrinks the text, so this settles
        if next == current {
            return next;
        }
        current = next;
    }
}

fn apply_rules(content: &str) -> String {
    let mut text = content.to_string();
    for rule in RULES.iter() {
        text = rule.pattern.replace_all(&text, rule.replacement).into_owned();
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_call_marker() {
        assert_eq!(
            filter_citations("Revenue grew [CALL summary] fast."),
            "Revenue grew fast."
        );
    }

    #[test]
    fn test_removes_chunk_markers_any_case() {
        assert_eq!(
            filter_citations("Pricing [Chunk 3] was raised [chunks 4-5] twice [CHUNK 9]."),
            "Pricing was raised twice ."
        );
    }

    #[test]
    fn test_removes_full_width_brackets() {
        assert_eq!(
            filter_citations("They liked the demo【CALL conversation】."),
            "They liked the demo."
        );
        assert_eq!(filter_citations("A【4:0†source】 B"), "A B");
    }

    #[test]
    fn test_keeps_other_brackets() {
        let text = "See [the deck](https://example.com) and [notes].";
        assert_eq!(filter_citations(text), text);
    }

    #[test]
    fn test_cleans_empty_quotes_and_periods() {
        assert_eq!(filter_citations("He said \"[CALL summary]\" today."), "He said today.");
        assert_eq!(filter_citations("Done. [Chunk 2]."), "Done.");
        assert_eq!(filter_citations("Wait..."), "Wait.");
    }

    #[test]
    fn test_trims() {
        assert_eq!(filter_citations("  [CALL x] hello  "), "hello");
        assert_eq!(filter_citations(""), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "Revenue grew [CALL summary] fast.",
            "a \"\" b",
            "x [Chunk 1] \" \" [CALL y] . . . z",
            "【a】【b】  [call]  ..  \"\"  ",
            "**Pricing**\n- too high [Chunk 2]",
            "[[CALL nested]] done",
            "plain text with no markers",
        ];
        for input in inputs {
            let once = filter_citations(input);
            assert_eq!(filter_citations(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_preserves_newlines() {
        assert_eq!(
            filter_citations("**Pricing** [CALL a]\n- too high"),
            "**Pricing** \n- too high"
        );
    }
}
