use crate::markdown::MarkdownRenderer;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Paragraph, Wrap};

const USER_AVATAR: &str = "👤";
const ASSISTANT_AVATAR: &str = "🤖";
const TYPING_DOTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    fn avatar(self) -> &'static str {
        match self {
            Sender::User => USER_AVATAR,
            Sender::Assistant => ASSISTANT_AVATAR,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "Assistant",
        }
    }

    fn color(self) -> Color {
        match self {
            Sender::User => Color::Blue,
            Sender::Assistant => Color::Yellow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u64);

/// Token for a rendered typing indicator, handed back to remove it.
#[derive(Debug, PartialEq, Eq)]
pub struct TypingHandle(BlockId);

#[derive(Debug, Clone)]
pub enum BlockKind {
    Message {
        sender: Sender,
        body: Text<'static>,
        is_error: bool,
    },
    Typing,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
}

impl Block {
    fn lines(&self, frame: usize) -> Vec<Line<'static>> {
        match &self.kind {
            BlockKind::Message {
                sender,
                body,
                is_error,
            } => {
                let mut lines = vec![header_line(*sender)];
                let error_style = Style::default().fg(Color::Red);
                for line in &body.lines {
                    let mut spans = vec![Span::raw("  ")];
                    spans.extend(line.spans.iter().cloned().map(|mut span| {
                        if *is_error {
                            span.style = span.style.patch(error_style);
                        }
                        span
                    }));
                    lines.push(Line::from(spans));
                }
                lines
            }
            BlockKind::Typing => {
                let lit = frame % TYPING_DOTS;
                let mut spans = vec![Span::raw("  ")];
                for dot in 0..TYPING_DOTS {
                    let style = if dot == lit {
                        Style::default().fg(Color::Yellow)
                    } else {
                        Style::default().fg(Color::DarkGray)
                    };
                    spans.push(Span::styled("● ", style));
                }
                vec![header_line(Sender::Assistant), Line::from(spans)]
            }
        }
    }
}

fn header_line(sender: Sender) -> Line<'static> {
    Line::from(Span::styled(
        format!("{} {}", sender.avatar(), sender.label()),
        Style::default()
            .fg(sender.color())
            .add_modifier(Modifier::BOLD),
    ))
}

/// One-time greeting shown until the first message is sent.
#[derive(Debug, Clone)]
pub struct Welcome {
    pub title: String,
    pub quick_replies: Vec<String>,
}

impl Welcome {
    fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![
            Line::from(Span::styled(
                self.title.clone(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::default(),
        ];
        if !self.quick_replies.is_empty() {
            lines.push(Line::from(Span::styled(
                "Quick replies:",
                Style::default().fg(Color::Gray),
            )));
            for (index, reply) in self.quick_replies.iter().enumerate() {
                lines.push(Line::from(vec![
                    Span::styled(format!("  F{} ", index + 1), Style::default().fg(Color::Cyan)),
                    Span::raw(reply.clone()),
                ]));
            }
        }
        lines
    }
}

/// Append-only conversation container. Blocks are keyed by id so the typing
/// indicator can be removed later through its handle.
pub struct Transcript {
    renderer: Box<dyn MarkdownRenderer>,
    welcome: Option<Welcome>,
    blocks: Vec<Block>,
    next_id: u64,
    // Lines scrolled up from the newest content; 0 means pinned to the bottom.
    scroll_back: u16,
}

impl Transcript {
    pub fn new(renderer: Box<dyn MarkdownRenderer>, welcome: Option<Welcome>) -> Self {
        Self {
            renderer,
            welcome,
            blocks: Vec::new(),
            next_id: 0,
            scroll_back: 0,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn has_welcome(&self) -> bool {
        self.welcome.is_some()
    }

    pub fn has_typing_indicator(&self) -> bool {
        self.blocks
            .iter()
            .any(|block| matches!(block.kind, BlockKind::Typing))
    }

    pub fn remove_welcome(&mut self) {
        if self.has_welcome() {
            self.welcome = None;
            self.scroll_to_bottom();
        }
    }

    /// Assistant text goes through the markdown renderer; user text is kept
    /// literal so typed markup is never interpreted.
    pub fn render_message(&mut self, text: &str, sender: Sender, is_error: bool) -> BlockId {
        let body = match sender {
            Sender::Assistant => self.renderer.render(text),
            Sender::User => Text::from(
                text.lines()
                    .map(|line| Line::from(Span::raw(line.to_string())))
                    .collect::<Vec<_>>(),
            ),
        };

        self.push(BlockKind::Message {
            sender,
            body,
            is_error,
        })
    }

    pub fn render_typing_indicator(&mut self) -> TypingHandle {
        TypingHandle(self.push(BlockKind::Typing))
    }

    /// No-op when the indicator is already gone.
    pub fn remove_typing_indicator(&mut self, handle: TypingHandle) {
        let before = self.blocks.len();
        self.blocks.retain(|block| block.id != handle.0);
        if self.blocks.len() != before {
            self.scroll_to_bottom();
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_back = 0;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_back = self.scroll_back.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    pub fn lines(&self, frame: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        if let Some(welcome) = &self.welcome {
            lines.extend(welcome.lines());
            lines.push(Line::default());
        }
        for block in &self.blocks {
            lines.extend(block.lines(frame));
            lines.push(Line::default());
        }
        lines
    }

    /// Word-wrapped view of the conversation for a `width` x `height` area,
    /// scrolled so the newest line is visible unless the user scrolled back.
    pub fn view(&mut self, frame: usize, width: u16, height: u16) -> Paragraph<'static> {
        let lines = self.lines(frame);
        let content_height = wrapped_height(&lines, width);
        let offset = self.scroll_offset(content_height, height);

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((offset, 0))
    }

    /// Top row to show for a viewport of `height` rows, given the content's
    /// wrapped height. Clamps manual scrolling to the oldest content.
    pub fn scroll_offset(&mut self, content_height: u16, height: u16) -> u16 {
        let max = content_height.saturating_sub(height);
        self.scroll_back = self.scroll_back.min(max);
        max - self.scroll_back
    }

    fn push(&mut self, kind: BlockKind) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        self.blocks.push(Block { id, kind });
        self.scroll_to_bottom();
        id
    }
}

/// Rows the lines occupy once word-wrapped to `width` columns, measured with
/// the same wrapper `view` draws with.
pub fn wrapped_height(lines: &[Line<'static>], width: u16) -> u16 {
    let rows = Paragraph::new(lines.to_vec())
        .wrap(Wrap { trim: false })
        .line_count(width.max(1));
    rows.min(u16::MAX as usize) as u16
}
