use crate::client::{ChatClient, TransportError};
use crate::input::{InputAction, action_for_key};
use crate::protocol::{ChatResponse, HealthStatus};
use crate::session::SessionId;
use crate::transcript::TypingHandle;
use crate::widget::{ChatWidget, Effect};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io;
use std::io::Write;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

type TuiTerminal = Terminal<CrosstermBackend<io::Stdout>>;
type UiResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const INPUT_HEIGHT: u16 = 6;
const ANIMATION_STEP: Duration = Duration::from_millis(300);

// Restores terminal settings even if the loop exits early.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Self {
        Self
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = io::stdout().flush();
    }
}

#[derive(Debug)]
pub enum UiEvent {
    Reply {
        handle: TypingHandle,
        result: Result<ChatResponse, TransportError>,
    },
    Health(Result<HealthStatus, String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BackendStatus {
    Checking,
    Up(String),
    Unreachable,
}

pub struct App {
    widget: ChatWidget,
    client: ChatClient,
    session_id: SessionId,
    backend: BackendStatus,
    should_quit: bool,
    sender: mpsc::Sender<UiEvent>,
    receiver: mpsc::Receiver<UiEvent>,
    started: Instant,
}

impl App {
    pub fn new(widget: ChatWidget, client: ChatClient, session_id: SessionId) -> Self {
        let (sender, receiver) = mpsc::channel(100);

        Self {
            widget,
            client,
            session_id,
            backend: BackendStatus::Checking,
            should_quit: false,
            sender,
            receiver,
            started: Instant::now(),
        }
    }

    fn frame_index(&self) -> usize {
        (self.started.elapsed().as_millis() / ANIMATION_STEP.as_millis()) as usize
    }

    fn header(&self) -> Line<'static> {
        let dim = Style::default().fg(Color::DarkGray);
        let (backend, backend_style) = match &self.backend {
            BackendStatus::Checking => ("backend: checking".to_string(), dim),
            BackendStatus::Up(status) => (
                format!("backend: {}", status),
                Style::default().fg(Color::Green),
            ),
            BackendStatus::Unreachable => (
                "backend: unreachable".to_string(),
                Style::default().fg(Color::Red),
            ),
        };

        let mut spans = vec![
            Span::styled(
                " parley ",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("{} · ", self.session_id), dim),
            Span::styled(backend, backend_style),
        ];
        if self.widget.lead_captured() {
            spans.push(Span::styled(" · lead captured", Style::default().fg(Color::Green)));
        }
        Line::from(spans)
    }

    fn draw(&mut self, f: &mut Frame) {
        let [header_area, chat_area, input_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(INPUT_HEIGHT),
        ])
        .areas(f.area());

        f.render_widget(Paragraph::new(self.header()), header_area);

        let frame = self.frame_index();
        let inner_width = chat_area.width.saturating_sub(2);
        let inner_height = chat_area.height.saturating_sub(2);

        let chat_title = if self.widget.transcript().has_typing_indicator() {
            " Conversation (PgUp/PgDn to scroll) [typing...] "
        } else {
            " Conversation (PgUp/PgDn to scroll) "
        };
        let chat = self
            .widget
            .transcript_mut()
            .view(frame, inner_width, inner_height)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(chat_title)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(chat, chat_area);

        let locked = self.widget.is_locked();
        let title = if locked {
            " Input (Esc to quit) [Waiting for reply...] "
        } else {
            " Input (Enter to send, Shift+Enter newline, F1-F9 quick replies, Esc to quit) "
        };
        let border_color = if locked { Color::DarkGray } else { Color::Gray };

        let mut input_block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(border_color));
        if let Some(hint) = self.widget.quick_reply_hint().filter(|_| !locked) {
            input_block = input_block.title_bottom(Line::from(Span::styled(
                format!(" {} ", hint),
                Style::default().fg(Color::DarkGray),
            )));
        }

        let input_paragraph = Paragraph::new(self.widget.input().render(locked))
            .block(input_block)
            .wrap(Wrap { trim: false });
        f.render_widget(input_paragraph, input_area);

        if self.widget.is_focused() && !locked {
            let (cursor_x, cursor_y) = self.widget.input().cursor();
            let right = input_area.x + input_area.width.saturating_sub(2);
            let bottom = input_area.y + input_area.height.saturating_sub(2);
            let x = (input_area.x + 1 + cursor_x as u16).min(right);
            let y = (input_area.y + 1 + cursor_y as u16).min(bottom);
            f.set_cursor_position((x, y));
        }
    }

    fn spawn_health_check(&self) {
        let client = self.client.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let result = client.health().await.map_err(|e| e.to_string());
            let _ = sender.send(UiEvent::Health(result)).await;
        });
    }

    fn spawn_send(&self, message: String, handle: TypingHandle) {
        let client = self.client.clone();
        let session_id = self.session_id.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let result = client.post_message(&message, &session_id).await;
            let _ = sender.send(UiEvent::Reply { handle, result }).await;
        });
    }

    /// Applies whatever background tasks reported since the last frame.
    fn drain_events(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            match event {
                UiEvent::Reply { handle, result } => {
                    self.widget.settle(handle, result);
                }
                UiEvent::Health(Ok(health)) => {
                    tracing::info!(status = %health.status, "backend health check");
                    self.backend = BackendStatus::Up(health.status);
                }
                UiEvent::Health(Err(err)) => {
                    tracing::warn!("backend health check failed: {}", err);
                    self.backend = BackendStatus::Unreachable;
                }
            }
        }
    }

    /// Returns false once the user asked to quit.
    fn handle_action(&mut self, action: InputAction) -> bool {
        match self.widget.handle(action) {
            Effect::Send(pending) => self.spawn_send(pending.message, pending.handle),
            Effect::Quit => {
                self.should_quit = true;
                return false;
            }
            Effect::None => {}
        }
        true
    }

    fn handle_events(&mut self) -> UiResult<bool> {
        self.drain_events();

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(true);
                }

                let Some(action) = action_for_key(key) else {
                    return Ok(true);
                };

                return Ok(self.handle_action(action));
            }
        }

        Ok(true)
    }
}

pub fn run_tui(mut app: App) -> UiResult<()> {
    enable_raw_mode()?;
    let _guard = TerminalGuard::new();
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal: TuiTerminal = Terminal::new(backend)?;

    tracing::info!(
        session_id = %app.session_id,
        endpoint = %app.client.endpoint(),
        "chat session started"
    );
    app.spawn_health_check();

    terminal.draw(|f| app.draw(f))?;

    while !app.should_quit {
        if !app.handle_events()? {
            break;
        }

        terminal.draw(|f| app.draw(f))?;

        std::thread::sleep(Duration::from_millis(10));
    }

    tracing::info!("chat session ended");
    Ok(())
}
