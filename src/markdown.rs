//! Markdown to styled terminal lines for assistant replies.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

struct Renderer {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    // One entry per open list: the next ordinal for numbered lists
    lists: Vec<Option<u64>>,
    // Raw text of the fenced or indented block being read
    code: Option<String>,
}

impl Renderer {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            current: Vec::new(),
            styles: vec![Style::default()],
            lists: Vec::new(),
            code: None,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, patch: Style) {
        let next = self.style().patch(patch);
        self.styles.push(next);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn push_text(&mut self, text: &str) {
        let style = self.style();
        self.current.push(Span::styled(text.to_string(), style));
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.current)));
        }
    }

    /// Separate top-level blocks with a single blank line
    fn end_block(&mut self) {
        self.flush();
        if self.lists.is_empty() && self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn start_item(&mut self) {
        self.flush();
        let depth = self.lists.len().saturating_sub(1);
        let bullet = match self.lists.last_mut() {
            Some(Some(n)) => {
                let label = format!("{}. ", n);
                *n += 1;
                label
            }
            _ => "• ".to_string(),
        };
        self.current.push(Span::raw("  ".repeat(depth)));
        self.current.push(Span::styled(bullet, Style::default().fg(Color::Yellow)));
    }

    /// Emit a finished code block line by line. Blank lines stay blank and
    /// leading whitespace is kept.
    fn end_code_block(&mut self, code: &str) {
        let style = Style::default().fg(Color::Green);
        let body = code.strip_suffix('\n').unwrap_or(code);
        for line in body.split('\n') {
            if line.is_empty() {
                self.lines.push(Line::default());
            } else {
                self.lines.push(Line::from(Span::styled(format!("  {}", line), style)));
            }
        }
    }

    fn event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
                Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
                Tag::Strikethrough => self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT)),
                Tag::Heading { .. } => {
                    self.flush();
                    self.push_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
                }
                Tag::CodeBlock(kind) => {
                    self.flush();
                    self.code = Some(String::new());
                    if let CodeBlockKind::Fenced(lang) = kind {
                        if !lang.is_empty() {
                            self.lines.push(Line::from(Span::styled(
                                format!("  [{}]", lang),
                                Style::default().fg(Color::DarkGray),
                            )));
                        }
                    }
                }
                Tag::List(start) => {
                    self.flush();
                    self.lists.push(start);
                }
                Tag::Item => self.start_item(),
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough => self.pop_style(),
                TagEnd::Heading(_) => {
                    self.pop_style();
                    self.end_block();
                }
                TagEnd::Paragraph => self.end_block(),
                TagEnd::CodeBlock => {
                    if let Some(code) = self.code.take() {
                        self.end_code_block(&code);
                    }
                    self.end_block();
                }
                TagEnd::List(_) => {
                    self.lists.pop();
                    self.end_block();
                }
                TagEnd::Item => self.flush(),
                _ => {}
            },
            Event::Text(text) => match self.code.as_mut() {
                Some(code) => code.push_str(&text),
                None => self.push_text(&text),
            },
            Event::Code(code) => {
                let style = self.style().fg(Color::Green);
                self.current.push(Span::styled(code.to_string(), style));
            }
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(20),
                    Style::default().fg(Color::DarkGray),
                )));
                self.end_block();
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut renderer = Renderer::new();
    for event in Parser::new_ext(text, options) {
        renderer.event(event);
    }
    renderer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_plain_paragraph() {
        let lines = render_markdown("hi there");
        assert_eq!(lines.len(), 1);
        assert_eq!(plain(&lines[0]), "hi there");
    }

    #[test]
    fn test_bold_span_is_styled() {
        let lines = render_markdown("This is **bold** text.");
        let bold = lines[0]
            .spans
            .iter()
            .find(|s| s.content == "bold")
            .unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(plain(&lines[0]), "This is bold text.");
    }

    #[test]
    fn test_paragraphs_separated_by_blank_line() {
        let lines = render_markdown("first\n\nsecond");
        let texts: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(texts, vec!["first", "", "second"]);
    }

    #[test]
    fn test_lists() {
        let bullets: Vec<String> = render_markdown("- one\n- two").iter().map(plain).collect();
        assert_eq!(bullets, vec!["• one", "• two"]);

        let numbered: Vec<String> = render_markdown("1. a\n2. b").iter().map(plain).collect();
        assert_eq!(numbered, vec!["1. a", "2. b"]);
    }

    #[test]
    fn test_code_block_keeps_lines() {
        let lines = render_markdown("```rust\nfn main() {}\nlet x = 1;\n```");
        let texts: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(texts, vec!["  [rust]", "  fn main() {}", "  let x = 1;"]);
    }

    #[test]
    fn test_code_block_keeps_blank_lines_and_indent() {
        let lines = render_markdown("```\nfn main() {\n\n    run();\n}\n```\n\nafter");
        let texts: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(
            texts,
            vec!["  fn main() {", "", "      run();", "  }", "", "after"]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(render_markdown("").is_empty());
    }
}
