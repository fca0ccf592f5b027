use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// A reply is rendered as a sequence of tagged segments rather than a full
/// markdown tree: fenced code blocks get their own styling, everything else
/// goes through the inline parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Code { language: String, text: String },
}

/// Split reply text on ``` fences. An unclosed fence (which happens
/// routinely mid-reveal) keeps the rest of the text as code.
pub fn split_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut language = String::new();
    let mut in_code = false;

    for line in text.lines() {
        if let Some(rest) = line.trim_end().strip_prefix("```") {
            if in_code {
                segments.push(Segment::Code {
                    language: std::mem::take(&mut language),
                    text: std::mem::take(&mut current),
                });
            } else {
                if !current.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut current)));
                }
                language = rest.trim().to_string();
            }
            in_code = !in_code;
            continue;
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        if in_code {
            segments.push(Segment::Code {
                language,
                text: current,
            });
        } else {
            segments.push(Segment::Text(current));
        }
    }

    segments
}

/// Parse a line of text and convert **bold** markdown to styled spans
pub fn parse_inline(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut current_text = String::new();

    while let Some((_, c)) = chars.next() {
        if c == '*' {
            // Check for ** (bold)
            if chars.peek().map(|(_, c)| *c) == Some('*') {
                // Consume the second *
                chars.next();

                // Push any accumulated plain text
                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }

                // Find closing **
                let mut bold_text = String::new();
                let mut found_close = false;

                while let Some((_, c)) = chars.next() {
                    if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
                        chars.next(); // consume second *
                        found_close = true;
                        break;
                    }
                    bold_text.push(c);
                }

                if found_close && !bold_text.is_empty() {
                    spans.push(Span::styled(
                        bold_text,
                        Style::default().add_modifier(Modifier::BOLD),
                    ));
                } else {
                    // No closing **, treat as literal
                    current_text.push_str("**");
                    current_text.push_str(&bold_text);
                }
            } else {
                // Single * - could be italic, but for now treat as literal
                current_text.push(c);
            }
        } else {
            current_text.push(c);
        }
    }

    // Push any remaining text
    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Render a full assistant reply into transcript lines.
pub fn render_reply(text: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for segment in split_segments(text) {
        match segment {
            Segment::Text(body) => {
                for line in body.lines() {
                    lines.push(parse_inline(line));
                }
            }
            Segment::Code { language, text } => {
                let label = if language.is_empty() {
                    "┌ código".to_string()
                } else {
                    format!("┌ {}", language)
                };
                lines.push(Line::from(Span::styled(
                    label,
                    Style::default().fg(Color::DarkGray),
                )));
                for line in text.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("│ {}", line),
                        Style::default().fg(Color::Green),
                    )));
                }
                lines.push(Line::from(Span::styled(
                    "└".to_string(),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_one_segment() {
        let segments = split_segments("hola\nmundo");
        assert_eq!(segments, vec![Segment::Text("hola\nmundo".to_string())]);
    }

    #[test]
    fn test_fenced_block_captures_language() {
        let segments = split_segments("antes\n```rust\nfn main() {}\n```\ndespués");
        assert_eq!(
            segments,
            vec![
                Segment::Text("antes".to_string()),
                Segment::Code {
                    language: "rust".to_string(),
                    text: "fn main() {}".to_string(),
                },
                Segment::Text("después".to_string()),
            ]
        );
    }

    #[test]
    fn test_unclosed_fence_stays_code() {
        let segments = split_segments("```python\nprint(1)");
        assert_eq!(
            segments,
            vec![Segment::Code {
                language: "python".to_string(),
                text: "print(1)".to_string(),
            }]
        );
    }

    #[test]
    fn test_fence_without_language() {
        let segments = split_segments("```\nx\n```");
        assert_eq!(
            segments,
            vec![Segment::Code {
                language: String::new(),
                text: "x".to_string(),
            }]
        );
    }

    #[test]
    fn test_bold_becomes_styled_span() {
        let line = parse_inline("hay **negrita** aquí");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "negrita");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_unclosed_bold_is_literal() {
        let line = parse_inline("sin **cierre");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "sin **cierre");
    }

    #[test]
    fn test_render_reply_mixes_text_and_code() {
        let lines = render_reply("hola\n```rust\nlet x = 1;\n```");
        // text line + label + one code line + closing rule
        assert_eq!(lines.len(), 4);
    }
}
