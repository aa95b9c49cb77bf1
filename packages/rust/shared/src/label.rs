//! Navigation label → filesystem stem sanitization.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// How aggressively labels are cleaned before becoming file stems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPolicy {
    /// Whitespace runs become `_`. Used for configured label lists.
    Whitespace,
    /// Additionally drops everything outside word characters, `-` and `_`.
    /// Used for labels read from the page, which carry arbitrary glyphs.
    Strict,
}

/// Turn a label into a file stem.
///
/// Path separators are always replaced so a label can never escape the output
/// directory. Applying this twice yields the same result as applying it once.
pub fn sanitize_label(label: &str, policy: LabelPolicy) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
    static NON_WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\w\-]").expect("valid regex"));

    let stem = WS_RE
        .replace_all(label.trim(), "_")
        .replace(['/', '\\'], "_");

    match policy {
        LabelPolicy::Whitespace => stem,
        LabelPolicy::Strict => NON_WORD_RE.replace_all(&stem, "").into_owned(),
    }
}

/// Sanitize an ordered label list into run-unique stems.
///
/// Empty stems fall back to `target_<ordinal>`; later duplicates get their
/// ordinal appended.
pub fn unique_stems<S: AsRef<str>>(labels: &[S], policy: LabelPolicy) -> Vec<String> {
    let mut seen = HashSet::with_capacity(labels.len());
    let mut stems = Vec::with_capacity(labels.len());

    for (ordinal, label) in labels.iter().enumerate() {
        let mut stem = sanitize_label(label.as_ref(), policy);
        if stem.is_empty() {
            stem = format!("target_{ordinal}");
        }
        while seen.contains(&stem) {
            stem = format!("{stem}_{ordinal}");
        }
        seen.insert(stem.clone());
        stems.push(stem);
    }

    stems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_runs_become_underscores() {
        assert_eq!(
            sanitize_label("System Architecture", LabelPolicy::Whitespace),
            "System_Architecture"
        );
        assert_eq!(
            sanitize_label("AI-Powered  \t Analysis", LabelPolicy::Whitespace),
            "AI-Powered_Analysis"
        );
        assert_eq!(sanitize_label("  Overview\n", LabelPolicy::Whitespace), "Overview");
    }

    #[test]
    fn strict_policy_drops_punctuation() {
        assert_eq!(
            sanitize_label("1.2 Data Flow (v2)!", LabelPolicy::Strict),
            "12_Data_Flow_v2"
        );
        assert_eq!(sanitize_label("股票 监控", LabelPolicy::Strict), "股票_监控");
    }

    #[test]
    fn separators_never_survive() {
        assert_eq!(sanitize_label("I/O", LabelPolicy::Whitespace), "I_O");
        assert_eq!(sanitize_label("..\\up", LabelPolicy::Whitespace), ".._up");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let labels = [
            "Overview",
            "  Stock   Data Sources ",
            "1.2 Data Flow (v2)!",
            "a/b\\c",
            "股票 监控",
            "",
            "-_-",
            "tab\tand\nnewline",
        ];
        for policy in [LabelPolicy::Whitespace, LabelPolicy::Strict] {
            for label in labels {
                let once = sanitize_label(label, policy);
                assert_eq!(sanitize_label(&once, policy), once, "label {label:?}");
            }
        }
    }

    #[test]
    fn duplicates_get_ordinal_suffix() {
        let stems = unique_stems(&["Intro", "Setup", "Intro", "Intro!"], LabelPolicy::Strict);
        assert_eq!(stems, vec!["Intro", "Setup", "Intro_2", "Intro_3"]);
    }

    #[test]
    fn empty_labels_fall_back_to_ordinal() {
        let stems = unique_stems(&["", "→", "Next"], LabelPolicy::Strict);
        assert_eq!(stems, vec!["target_0", "target_1", "Next"]);
    }
}
