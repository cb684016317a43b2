//! Markdown to HTML rendering for partially streamed text.
//!
//! The text handed to [`render_markdown`] is usually cut off mid-token. Before
//! rendering it is patched so that a half-finished document still renders the way
//! the finished one will: an open code fence is closed, a dangling list marker or
//! bare heading marker on the last line is dropped.

use pulldown_cmark::{html, Options, Parser};

/// Render Markdown to HTML, tolerating syntactically incomplete input.
pub fn render_markdown(text: &str) -> String {
    let source = close_incomplete(text);
    let parser = Parser::new_ext(&source, markdown_options());
    let mut output = String::with_capacity(source.len() + source.len() / 2);
    html::push_html(&mut output, parser);
    output
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Best-effort completion of a truncated Markdown document.
pub fn close_incomplete(text: &str) -> String {
    let mut source = text.to_string();

    let last_line_start = source.rfind('\n').map_or(0, |i| i + 1);
    if is_dangling_marker(&source[last_line_start..]) {
        source.truncate(last_line_start);
    }

    if let Some(fence) = open_fence(&source) {
        if !source.ends_with('\n') {
            source.push('\n');
        }
        source.push_str(&fence);
        source.push('\n');
    }

    source
}

/// A last line holding only a list or heading marker, e.g. `- `, `12.`, `##`.
fn is_dangling_marker(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    if matches!(trimmed, "-" | "*" | "+") {
        return true;
    }
    if trimmed.chars().all(|c| c == '#') && trimmed.len() <= 6 {
        return true;
    }
    let digits = trimmed.trim_end_matches(['.', ')']);
    digits.len() + 1 == trimmed.len()
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
}

/// The fence string that closes the last unterminated code block, if any.
fn open_fence(text: &str) -> Option<String> {
    let mut open: Option<(char, usize)> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();
        let Some(marker) = trimmed.chars().next().filter(|c| *c == '`' || *c == '~') else {
            continue;
        };
        let run = trimmed.chars().take_while(|c| *c == marker).count();
        if run < 3 {
            continue;
        }
        match open {
            None => open = Some((marker, run)),
            Some((open_marker, open_run)) => {
                let rest = &trimmed[run..];
                if marker == open_marker && run >= open_run && rest.trim().is_empty() {
                    open = None;
                }
            }
        }
    }

    open.map(|(marker, run)| marker.to_string().repeat(run))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_basic_markdown() {
        let html = render_markdown("# Title\n\nSome **bold** text");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_closes_unbalanced_code_fence() {
        let source = close_incomplete("Intro\n```rust\nfn main() {");
        assert!(source.ends_with("```\n"));

        let html = render_markdown("Intro\n```rust\nfn main() {");
        assert!(html.contains("<pre><code class=\"language-rust\">fn main() {"));
        assert!(html.contains("</code></pre>"));
    }

    #[test]
    fn test_balanced_fences_untouched() {
        let text = "```\ncode\n```\nafter";
        assert_eq!(close_incomplete(text), text);
    }

    #[test]
    fn test_tilde_fence_needs_matching_marker() {
        let source = close_incomplete("~~~~\n```\ninside");
        assert!(source.ends_with("~~~~\n"));
    }

    #[test]
    fn test_drops_trailing_partial_list_marker() {
        assert_eq!(close_incomplete("- one\n- two\n-"), "- one\n- two\n");
        assert_eq!(close_incomplete("1. one\n2."), "1. one\n");
        assert_eq!(close_incomplete("Heading next\n##"), "Heading next\n");
    }

    #[test]
    fn test_keeps_unterminated_heading_text() {
        let html = render_markdown("## Partial head");
        assert!(html.contains("<h2>Partial head</h2>"));
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        assert_eq!(render_markdown(""), "");
        assert_eq!(close_incomplete("text\n"), "text\n");
    }
}
