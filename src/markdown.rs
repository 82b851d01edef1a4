use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};

use crate::theme::theme;

/// Render the small markdown subset the NetRouter backend emits into styled
/// text: fenced code blocks, `**bold**`, `` `inline code` `` and newlines.
///
/// Rules apply in that order and compose left-to-right within a line.
/// Unterminated delimiters are kept as literal text. Output is built from
/// spans, so nothing in the input can inject markup of any kind.
pub fn render_markdown(input: &str) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut in_code_block = false;

    for line in input.lines() {
        if line.trim_start().starts_with("```") {
            // Opening fence may carry a language tag; both fences are dropped.
            in_code_block = !in_code_block;
            continue;
        }

        if in_code_block {
            lines.push(Line::from(Span::styled(
                format!("  {}", line),
                theme().code_block,
            )));
        } else {
            lines.push(parse_inline(line));
        }
    }

    if input.ends_with('\n') || lines.is_empty() {
        lines.push(Line::default());
    }

    Text::from(lines)
}

/// Parse one line, converting `**bold**` and `` `code` `` runs to styled
/// spans and leaving everything else raw.
fn parse_inline(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current = String::new();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();

                let mut bold = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == '*' && chars.peek() == Some(&'*') {
                        chars.next();
                        closed = true;
                        break;
                    }
                    bold.push(c);
                }

                if closed && !bold.is_empty() {
                    if !current.is_empty() {
                        spans.push(Span::raw(std::mem::take(&mut current)));
                    }
                    spans.push(Span::styled(
                        bold,
                        Style::default().add_modifier(Modifier::BOLD),
                    ));
                } else {
                    // No closing **, keep as literal
                    current.push_str("**");
                    current.push_str(&bold);
                }
            }
            '`' => {
                let mut code = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '`' {
                        closed = true;
                        break;
                    }
                    code.push(c);
                }

                if closed {
                    if !current.is_empty() {
                        spans.push(Span::raw(std::mem::take(&mut current)));
                    }
                    spans.push(Span::styled(code, theme().code));
                } else {
                    current.push('`');
                    current.push_str(&code);
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        spans.push(Span::raw(current));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn bold_becomes_bold_span() {
        let text = render_markdown("**hi**");
        let line = &text.lines[0];
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "hi");
        assert!(line.spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn inline_code_becomes_code_span() {
        let text = render_markdown("run `show ip route` now");
        let line = &text.lines[0];
        assert_eq!(line_text(line), "run show ip route now");
        assert_eq!(line.spans[1].content, "show ip route");
        assert_eq!(line.spans[1].style, theme().code);
    }

    #[test]
    fn fenced_block_strips_fences() {
        let text = render_markdown("```bash\ncode\n```");
        assert_eq!(text.lines.len(), 1);
        assert_eq!(line_text(&text.lines[0]), "  code");
        assert_eq!(text.lines[0].spans[0].style, theme().code_block);
    }

    #[test]
    fn newline_splits_lines() {
        let text = render_markdown("one\ntwo");
        assert_eq!(text.lines.len(), 2);
        assert_eq!(line_text(&text.lines[0]), "one");
        assert_eq!(line_text(&text.lines[1]), "two");
    }

    #[test]
    fn rules_compose_within_a_line() {
        let text = render_markdown("**bold** then `code`");
        let line = &text.lines[0];
        assert_eq!(line_text(line), "bold then code");
        assert!(line.spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(line.spans[2].style, theme().code);
    }

    #[test]
    fn unterminated_delimiters_stay_literal() {
        let text = render_markdown("**open and `half");
        assert_eq!(line_text(&text.lines[0]), "**open and `half");
    }

    #[test]
    fn empty_input_yields_one_blank_line() {
        let text = render_markdown("");
        assert_eq!(text.lines.len(), 1);
    }
}
