use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};

/// Turns assistant markdown into styled terminal text.
///
/// Injected into the transcript so tests can swap in a stub.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> Text<'static>;
}

/// pulldown-cmark backed renderer with a fixed configuration: soft line breaks
/// become hard breaks, GitHub-flavored extensions are on, headings get no
/// identifiers and text is emitted without entity mangling.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalMarkdown;

impl TerminalMarkdown {
    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_GFM);
        options
    }
}

impl MarkdownRenderer for TerminalMarkdown {
    fn render(&self, markdown: &str) -> Text<'static> {
        let mut builder = TextBuilder::default();
        for event in Parser::new_ext(markdown, Self::options()) {
            builder.handle(event);
        }
        builder.finish()
    }
}

const CODE_STYLE: Style = Style::new().fg(Color::Cyan);
const LINK_STYLE: Style = Style::new().fg(Color::DarkGray);
const QUOTE_STYLE: Style = Style::new().fg(Color::Gray).add_modifier(Modifier::ITALIC);

#[derive(Default)]
struct TextBuilder {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    // Next ordinal for ordered lists, None for bullets.
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    in_code_block: bool,
    table_cell: usize,
    link: Option<(String, String)>,
}

impl TextBuilder {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.finish_line();
                self.push_span(format!("{} ", "#".repeat(level as usize)));
                self.styles
                    .push(Style::new().add_modifier(Modifier::BOLD | Modifier::UNDERLINED));
            }
            Event::End(TagEnd::Heading(_)) => {
                self.styles.pop();
                self.finish_line();
                self.gap();
            }
            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                self.finish_line();
                if self.lists.is_empty() {
                    self.gap();
                }
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.finish_line();
                self.in_code_block = true;
                self.styles.push(CODE_STYLE);
            }
            Event::End(TagEnd::CodeBlock) => {
                self.finish_line();
                self.in_code_block = false;
                self.styles.pop();
                self.gap();
            }
            Event::Start(Tag::BlockQuote(_)) => {
                self.finish_line();
                self.quote_depth += 1;
                self.styles.push(QUOTE_STYLE);
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                self.finish_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.styles.pop();
                self.gap();
            }
            Event::Start(Tag::List(start)) => {
                self.finish_line();
                self.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.finish_line();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.gap();
                }
            }
            Event::Start(Tag::Item) => {
                self.finish_line();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let marker = format!("{}{}. ", indent, next);
                        *next += 1;
                        marker
                    }
                    _ => format!("{}• ", indent),
                };
                self.spans.push(Span::raw(marker));
            }
            Event::End(TagEnd::Item) => self.finish_line(),
            Event::TaskListMarker(checked) => {
                self.push_span(if checked { "[x] " } else { "[ ] " }.to_string());
            }
            Event::Start(Tag::Table(_)) => self.finish_line(),
            Event::End(TagEnd::Table) => {
                self.finish_line();
                self.gap();
            }
            Event::Start(Tag::TableHead) => {
                self.table_cell = 0;
                self.styles.push(Style::new().add_modifier(Modifier::BOLD));
            }
            Event::End(TagEnd::TableHead) => {
                self.styles.pop();
                self.finish_line();
            }
            Event::Start(Tag::TableRow) => self.table_cell = 0,
            Event::End(TagEnd::TableRow) => self.finish_line(),
            Event::Start(Tag::TableCell) => {
                if self.table_cell > 0 {
                    self.spans.push(Span::styled(" │ ", LINK_STYLE));
                }
                self.table_cell += 1;
            }
            Event::Start(Tag::Emphasis) => {
                self.styles.push(Style::new().add_modifier(Modifier::ITALIC));
            }
            Event::Start(Tag::Strong) => {
                self.styles.push(Style::new().add_modifier(Modifier::BOLD));
            }
            Event::Start(Tag::Strikethrough) => {
                self.styles.push(Style::new().add_modifier(Modifier::CROSSED_OUT));
            }
            Event::End(TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough) => {
                self.styles.pop();
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                self.link = Some((dest_url.to_string(), String::new()));
                self.styles.push(Style::new().add_modifier(Modifier::UNDERLINED));
            }
            Event::End(TagEnd::Link) => {
                self.styles.pop();
                if let Some((url, text)) = self.link.take() {
                    if url != text {
                        self.spans.push(Span::styled(format!(" ({})", url), LINK_STYLE));
                    }
                }
            }
            Event::Text(text) => self.push_text(&text),
            Event::Html(html) | Event::InlineHtml(html) => self.push_lines(&html),
            Event::End(TagEnd::HtmlBlock) => {
                self.finish_line();
                self.gap();
            }
            Event::Code(code) => {
                let style = self.style().patch(CODE_STYLE);
                self.spans.push(Span::styled(code.to_string(), style));
            }
            Event::SoftBreak | Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.finish_line();
                self.spans.push(Span::styled("─".repeat(24), LINK_STYLE));
                self.finish_line();
                self.gap();
            }
            _ => {}
        }
    }

    fn style(&self) -> Style {
        self.styles
            .iter()
            .fold(Style::default(), |acc, style| acc.patch(*style))
    }

    fn push_span(&mut self, content: String) {
        let style = self.style();
        self.spans.push(Span::styled(content, style));
    }

    fn push_text(&mut self, text: &str) {
        if let Some((_, link_text)) = self.link.as_mut() {
            link_text.push_str(text);
        }

        if self.in_code_block {
            self.push_lines(text);
        } else {
            self.push_span(text.to_string());
        }
    }

    // Keeps the source line breaks, for code and raw HTML.
    fn push_lines(&mut self, text: &str) {
        for (index, part) in text.split('\n').enumerate() {
            if index > 0 {
                self.flush_line();
            }
            if !part.is_empty() {
                self.push_span(part.to_string());
            }
        }
    }

    fn flush_line(&mut self) {
        let mut spans = Vec::with_capacity(self.spans.len() + 1);
        if self.quote_depth > 0 {
            spans.push(Span::styled("│ ".repeat(self.quote_depth), QUOTE_STYLE));
        }
        spans.append(&mut self.spans);
        self.lines.push(Line::from(spans));
    }

    fn finish_line(&mut self) {
        if !self.spans.is_empty() {
            self.flush_line();
        }
    }

    fn gap(&mut self) {
        if self.lines.last().is_some_and(|line| line.width() > 0) {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Text<'static> {
        self.finish_line();
        while self.lines.last().is_some_and(|line| line.width() == 0) {
            self.lines.pop();
        }
        Text::from(self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> Text<'static> {
        TerminalMarkdown.render(markdown)
    }

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    fn find_span<'a>(text: &'a Text<'static>, content: &str) -> Option<&'a Span<'static>> {
        text.lines
            .iter()
            .flat_map(|line| line.spans.iter())
            .find(|span| span.content == content)
    }

    #[test]
    fn plain_text_is_single_line() {
        let text = render("Hello world");
        assert_eq!(text.lines.len(), 1);
        assert_eq!(line_text(&text.lines[0]), "Hello world");
    }

    #[test]
    fn bold_text_is_bold() {
        let text = render("**hi**");
        let span = find_span(&text, "hi").expect("bold span");
        assert!(span.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn italic_and_strikethrough() {
        let text = render("*soft* and ~~gone~~");
        assert!(
            find_span(&text, "soft")
                .unwrap()
                .style
                .add_modifier
                .contains(Modifier::ITALIC)
        );
        assert!(
            find_span(&text, "gone")
                .unwrap()
                .style
                .add_modifier
                .contains(Modifier::CROSSED_OUT)
        );
    }

    #[test]
    fn soft_breaks_become_line_breaks() {
        let text = render("Line one\nLine two");
        assert_eq!(text.lines.len(), 2);
        assert_eq!(line_text(&text.lines[0]), "Line one");
        assert_eq!(line_text(&text.lines[1]), "Line two");
    }

    #[test]
    fn paragraphs_are_separated_by_blank_line() {
        let text = render("First\n\nSecond");
        assert_eq!(text.lines.len(), 3);
        assert_eq!(text.lines[1].width(), 0);
    }

    #[test]
    fn headings_are_bold_without_identifiers() {
        let text = render("## Pricing {#plans}");
        assert_eq!(text.lines.len(), 1);
        assert!(line_text(&text.lines[0]).contains("{#plans}"));
        let span = text.lines[0]
            .spans
            .iter()
            .find(|span| span.content.contains("Pricing"))
            .expect("heading span");
        assert!(span.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn fenced_code_keeps_lines() {
        let text = render("```rust\nfn main() {}\nlet x = 1;\n```");
        assert_eq!(text.lines.len(), 2);
        assert_eq!(line_text(&text.lines[0]), "fn main() {}");
        assert_eq!(text.lines[1].spans[0].style.fg, Some(Color::Cyan));
    }

    #[test]
    fn inline_code_is_coloured() {
        let text = render("Run `cargo test` now");
        let span = find_span(&text, "cargo test").unwrap();
        assert_eq!(span.style.fg, Some(Color::Cyan));
    }

    #[test]
    fn lists_get_markers() {
        let text = render("- one\n- two\n\n1. first\n2. second");
        let rendered: Vec<String> = text.lines.iter().map(line_text).collect();
        assert!(rendered.contains(&"• one".to_string()));
        assert!(rendered.contains(&"• two".to_string()));
        assert!(rendered.contains(&"1. first".to_string()));
        assert!(rendered.contains(&"2. second".to_string()));
    }

    #[test]
    fn task_list_markers() {
        let text = render("- [x] Done\n- [ ] Todo");
        let rendered: Vec<String> = text.lines.iter().map(line_text).collect();
        assert_eq!(rendered, vec!["• [x] Done", "• [ ] Todo"]);
    }

    #[test]
    fn tables_render_cells_on_one_line() {
        let text = render("| A | B |\n|---|---|\n| 1 | 2 |");
        let rendered: Vec<String> = text.lines.iter().map(line_text).collect();
        assert_eq!(rendered, vec!["A │ B", "1 │ 2"]);
    }

    #[test]
    fn links_show_destination() {
        let text = render("Visit [Rust](https://rust-lang.org)");
        assert_eq!(
            line_text(&text.lines[0]),
            "Visit Rust (https://rust-lang.org)"
        );
    }

    #[test]
    fn blockquote_is_prefixed() {
        let text = render("> quoted");
        assert_eq!(line_text(&text.lines[0]), "│ quoted");
    }

    #[test]
    fn html_block_keeps_its_lines() {
        let text = render("<div>\nhello\n</div>");
        let rendered: Vec<String> = text.lines.iter().map(line_text).collect();
        assert_eq!(rendered, vec!["<div>", "hello", "</div>"]);
    }

    #[test]
    fn entities_are_not_mangled() {
        let text = render("mail me at hello@example.com & co");
        assert_eq!(
            line_text(&text.lines[0]),
            "mail me at hello@example.com & co"
        );
    }
}
