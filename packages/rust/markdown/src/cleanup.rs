//! Post-conversion cleanup passes for Markdown output.
//!
//! Each pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Run every cleanup pass over raw `htmd` output.
pub(crate) fn run_pipeline(md: &str, base_url: &Url) -> String {
    let mut result = collapse_blank_lines(md);
    result = strip_container_tags(&result);
    result = absolutize_links(&result, base_url);
    result = trim_line_ends(&result);
    single_trailing_newline(&result)
}

/// Collapse runs of 3+ blank lines into exactly 2.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n\n").into_owned()
}

/// Remove layout-only HTML tags `htmd` passed through, outside fenced code.
fn strip_container_tags(md: &str) -> String {
    static CONTAINER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|details|summary)(?:\s[^>]*)?>",
        )
        .expect("valid regex")
    });

    let mut in_fence = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                return line.to_string();
            }
            if in_fence {
                line.to_string()
            } else {
                CONTAINER_RE.replace_all(line, "").into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve relative link and image targets against the site's base URL.
///
/// Anchors, absolute URLs, `mailto:` and `data:` targets are left alone.
fn absolutize_links(md: &str, base: &Url) -> String {
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(!?)\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"));

    LINK_RE
        .replace_all(md, |caps: &regex::Captures| {
            let bang = &caps[1];
            let text = &caps[2];
            let href = &caps[3];

            let keep = href.starts_with('#')
                || href.starts_with("mailto:")
                || href.starts_with("data:")
                || Url::parse(href).is_ok();
            if keep {
                return caps[0].to_string();
            }

            match base.join(href) {
                Ok(resolved) => format!("{bang}[{text}]({resolved})"),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn trim_line_ends(md: &str) -> String {
    md.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

/// Ensure the document ends with exactly one newline.
fn single_trailing_newline(md: &str) -> String {
    format!("{}\n", md.trim_end_matches('\n'))
}
