//! Markup → plain text flattening.

use std::sync::LazyLock;

use regex::Regex;

/// Flatten markup to plain text.
///
/// Removes `<style>` and `<script>` subtrees, strips every remaining tag,
/// collapses runs of two or more newlines to one, and trims. Entities are left
/// encoded. Idempotent: `flatten(&flatten(x)) == flatten(x)`.
pub fn flatten(html: &str) -> String {
    static STYLE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<style.*?</style>").expect("valid regex"));
    static SCRIPT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<script.*?</script>").expect("valid regex"));
    static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
    static NEWLINES_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));

    let text = STYLE_RE.replace_all(html, "");
    let text = SCRIPT_RE.replace_all(&text, "");
    let text = TAG_RE.replace_all(&text, "");
    let text = NEWLINES_RE.replace_all(&text, "\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_keeps_text() {
        let html = "<h1>Overview</h1>\n\n\n<p>The <b>monitor</b> polls quotes.</p>";
        assert_eq!(flatten(html), "Overview\nThe monitor polls quotes.");
    }

    #[test]
    fn removes_style_and_script_subtrees() {
        let html = r#"<style type="text/css">.x { color: red }</style>
<p>Kept</p>
<SCRIPT>window.track("<p>not text</p>")</SCRIPT>
<script src="/a.js"></script>"#;
        assert_eq!(flatten(html), "Kept");
    }

    #[test]
    fn multiline_script_is_removed() {
        let html = "<p>a</p><script>\nconst x = 1;\n\nconsole.log(x);\n</script><p>b</p>";
        assert_eq!(flatten(html), "ab");
    }

    #[test]
    fn collapses_blank_runs_and_trims() {
        let html = "\n\n  <div>one</div>\n\n\n\n<div>two</div>\n  ";
        assert_eq!(flatten(html), "one\ntwo");
    }

    #[test]
    fn entities_stay_encoded() {
        assert_eq!(flatten("<p>a &lt; b &amp;&amp; c</p>"), "a &lt; b &amp;&amp; c");
    }

    #[test]
    fn flatten_is_idempotent() {
        let inputs = [
            "<main><h1>T</h1>\n\n<p>x</p><img src=\"/a.png\"></main>",
            "<<b>>bold</b>",
            "a <> b",
            "<sty<style></style>le>x</style>",
            "\n\n\n",
            "plain text\n\n\nwith gaps  ",
            "<p>unterminated <span",
        ];
        for input in inputs {
            let once = flatten(input);
            assert_eq!(flatten(&once), once, "input {input:?}");
        }
    }
}
