/*!
 * Comment Sanitizer
 * Cleans rich-text comment submissions and drops the editor's outer block
 */

/// Block elements the rich-text editor wraps a whole submission in.
const BLOCK_WRAPPERS: &[&str] = &["p", "div"];

/// Whitelist-clean `raw` with ammonia, then remove enclosing `<p>`/`<div>`
/// pairs that span the entire fragment. Inner markup that survives the
/// whitelist is kept as is. Applying it twice gives the same result.
pub fn sanitize_comment(raw: &str) -> String {
    let cleaned = ammonia::clean(raw);
    let mut html = cleaned.trim();

    while let Some(inner) = strip_single_wrapper(html) {
        html = inner.trim();
    }

    html.to_string()
}

fn strip_single_wrapper(html: &str) -> Option<&str> {
    BLOCK_WRAPPERS.iter().find_map(|tag| {
        let open = format!("<{tag}>");
        let close = format!("</{tag}>");
        let inner = html.strip_prefix(open.as_str())?.strip_suffix(close.as_str())?;
        is_balanced(inner, tag).then_some(inner)
    })
}

/// True when every `<tag ...>` in `inner` is closed inside it, i.e. the
/// prefix and suffix we stripped belonged to the same element.
fn is_balanced(inner: &str, tag: &str) -> bool {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut depth: i32 = 0;
    let mut rest = inner;

    // ammonia escapes text, so every '<' left starts a tag.
    while let Some(pos) = rest.find('<') {
        let tail = &rest[pos..];
        if tail.starts_with(close.as_str()) {
            depth -= 1;
            if depth < 0 {
                return false;
            }
            rest = &tail[close.len()..];
        } else if tail.starts_with(open.as_str())
            && tail[open.len()..].starts_with(|c: char| c == '>' || c.is_whitespace())
        {
            depth += 1;
            rest = &tail[open.len()..];
        } else {
            rest = &tail[1..];
        }
    }

    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_editor_paragraph_and_line_break() {
        assert_eq!(sanitize_comment("<p>Nice post!</p>\r\n"), "Nice post!");
    }

    #[test]
    fn test_keeps_inner_markup() {
        assert_eq!(
            sanitize_comment("<p>Hello <strong>world</strong></p>"),
            "Hello <strong>world</strong>"
        );
    }

    #[test]
    fn test_multiple_paragraphs_left_intact() {
        assert_eq!(
            sanitize_comment("<p>one</p><p>two</p>"),
            "<p>one</p><p>two</p>"
        );
    }

    #[test]
    fn test_sibling_divs_not_mistaken_for_wrapper() {
        assert_eq!(
            sanitize_comment("<div>a</div><div>b</div>"),
            "<div>a</div><div>b</div>"
        );
    }

    #[test]
    fn test_nested_wrappers_fully_removed() {
        assert_eq!(sanitize_comment("<div><p>deep</p></div>"), "deep");
    }

    #[test]
    fn test_script_removed() {
        let out = sanitize_comment("<p>hi<script>alert(1)</script></p>");
        assert_eq!(out, "hi");
    }

    #[test]
    fn test_event_handlers_removed() {
        let out = sanitize_comment(r#"<p><img src="x.png" onerror="alert(1)"></p>"#);
        assert!(!out.contains("onerror"));
        assert!(out.contains("<img"));
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(sanitize_comment("  just text  "), "just text");
    }

    #[test]
    fn test_entities_preserved() {
        assert_eq!(sanitize_comment("<p>1 &lt; 2</p>"), "1 &lt; 2");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "<p>Nice post!</p>\r\n",
            "<p>Hello <em>there</em></p>",
            "<p>one</p><p>two</p>",
            "<div><div>x</div></div>",
            "<p>a &amp; b</p>",
            "<p><a href=\"https://example.com\">link</a></p>",
        ];
        for input in inputs {
            let once = sanitize_comment(input);
            assert_eq!(sanitize_comment(&once), once, "input: {input}");
        }
    }

    #[test]
    fn test_empty_wrapper_yields_empty() {
        assert_eq!(sanitize_comment("<p></p>\r\n"), "");
    }
}
