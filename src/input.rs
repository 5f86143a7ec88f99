use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};

/// What a key press asks the widget to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Submit,
    QuickReply(usize),
    NewLine,
    Insert(char),
    Backspace,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    ScrollUp,
    ScrollDown,
    Quit,
}

impl InputAction {
    /// Actions that change the text box or send from it.
    pub fn edits_input(self) -> bool {
        !matches!(
            self,
            InputAction::ScrollUp | InputAction::ScrollDown | InputAction::Quit
        )
    }
}

pub fn action_for_key(key: KeyEvent) -> Option<InputAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(InputAction::Quit),
            KeyCode::Char('s') => Some(InputAction::Submit),
            _ => None,
        };
    }

    let action = match key.code {
        KeyCode::Esc => InputAction::Quit,
        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            InputAction::NewLine
        }
        KeyCode::Enter => InputAction::Submit,
        KeyCode::F(n @ 1..=9) => InputAction::QuickReply(n as usize - 1),
        KeyCode::Char(c) => InputAction::Insert(c),
        KeyCode::Backspace => InputAction::Backspace,
        KeyCode::Left => InputAction::Left,
        KeyCode::Right => InputAction::Right,
        KeyCode::Up => InputAction::Up,
        KeyCode::Down => InputAction::Down,
        KeyCode::Home => InputAction::Home,
        KeyCode::End => InputAction::End,
        KeyCode::PageUp => InputAction::ScrollUp,
        KeyCode::PageDown => InputAction::ScrollDown,
        _ => return None,
    };
    Some(action)
}

/// Multi-line text box. Cursor positions count chars, not bytes.
pub struct InputBuffer {
    lines: Vec<String>,
    cursor_x: usize,
    cursor_y: usize,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor_x: 0,
            cursor_y: 0,
        }
    }

    pub fn clear(&mut self) {
        self.lines = vec![String::new()];
        self.cursor_x = 0;
        self.cursor_y = 0;
    }

    pub fn set_text(&mut self, text: &str) {
        self.lines = text.split('\n').map(str::to_string).collect();
        self.cursor_y = self.lines.len() - 1;
        self.cursor_x = self.line_len(self.cursor_y);
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_x, self.cursor_y)
    }

    pub fn apply(&mut self, action: InputAction) {
        match action {
            InputAction::Insert(c) => self.insert_char(c),
            InputAction::NewLine => self.new_line(),
            InputAction::Backspace => self.delete_char(),
            InputAction::Left => self.move_left(),
            InputAction::Right => self.move_right(),
            InputAction::Up => self.move_up(),
            InputAction::Down => self.move_down(),
            InputAction::Home => self.cursor_x = 0,
            InputAction::End => self.cursor_x = self.line_len(self.cursor_y),
            _ => {}
        }
    }

    fn line_len(&self, y: usize) -> usize {
        self.lines[y].chars().count()
    }

    fn byte_index(&self, y: usize, x: usize) -> usize {
        self.lines[y]
            .char_indices()
            .nth(x)
            .map(|(index, _)| index)
            .unwrap_or(self.lines[y].len())
    }

    fn insert_char(&mut self, c: char) {
        let index = self.byte_index(self.cursor_y, self.cursor_x);
        self.lines[self.cursor_y].insert(index, c);
        self.cursor_x += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor_x > 0 {
            let index = self.byte_index(self.cursor_y, self.cursor_x - 1);
            self.lines[self.cursor_y].remove(index);
            self.cursor_x -= 1;
        } else if self.cursor_y > 0 {
            let removed = self.lines.remove(self.cursor_y);
            self.cursor_y -= 1;
            self.cursor_x = self.line_len(self.cursor_y);
            self.lines[self.cursor_y].push_str(&removed);
        }
    }

    fn new_line(&mut self) {
        let index = self.byte_index(self.cursor_y, self.cursor_x);
        let remaining = self.lines[self.cursor_y].split_off(index);
        self.lines.insert(self.cursor_y + 1, remaining);
        self.cursor_y += 1;
        self.cursor_x = 0;
    }

    fn move_left(&mut self) {
        if self.cursor_x > 0 {
            self.cursor_x -= 1;
        } else if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.cursor_x = self.line_len(self.cursor_y);
        }
    }

    fn move_right(&mut self) {
        if self.cursor_x < self.line_len(self.cursor_y) {
            self.cursor_x += 1;
        } else if self.cursor_y < self.lines.len() - 1 {
            self.cursor_y += 1;
            self.cursor_x = 0;
        }
    }

    fn move_up(&mut self) {
        if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.cursor_x = self.cursor_x.min(self.line_len(self.cursor_y));
        }
    }

    fn move_down(&mut self) {
        if self.cursor_y < self.lines.len() - 1 {
            self.cursor_y += 1;
            self.cursor_x = self.cursor_x.min(self.line_len(self.cursor_y));
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }

    pub fn render(&self, locked: bool) -> Text<'static> {
        if locked {
            return Text::from(Span::styled(
                "Waiting for a reply...",
                Style::default().fg(Color::DarkGray),
            ));
        }
        if self.is_empty() {
            return Text::from(Span::styled(
                "Type your message here...",
                Style::default().fg(Color::DarkGray),
            ));
        }
        Text::from(
            self.lines
                .iter()
                .map(|l| Line::from(l.clone()))
                .collect::<Vec<_>>(),
        )
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(buffer: &mut InputBuffer, text: &str) {
        for ch in text.chars() {
            buffer.apply(InputAction::Insert(ch));
        }
    }

    #[test]
    fn input_buffer_shift_enter_inserts_new_line() {
        let mut buffer = InputBuffer::new();
        type_text(&mut buffer, "hello");
        buffer.apply(InputAction::NewLine);
        type_text(&mut buffer, "world");

        assert_eq!(buffer.text(), "hello\nworld");
        assert_eq!(buffer.lines.len(), 2);
        assert_eq!(buffer.cursor(), (5, 1));
    }

    #[test]
    fn editing_handles_multibyte_chars() {
        let mut buffer = InputBuffer::new();
        type_text(&mut buffer, "héllo");
        buffer.apply(InputAction::Left);
        buffer.apply(InputAction::Left);
        buffer.apply(InputAction::Backspace);
        type_text(&mut buffer, "L");

        assert_eq!(buffer.text(), "héLlo");
    }

    #[test]
    fn backspace_at_line_start_joins_lines() {
        let mut buffer = InputBuffer::new();
        buffer.set_text("ab\ncd");
        buffer.apply(InputAction::Home);
        buffer.apply(InputAction::Backspace);

        assert_eq!(buffer.text(), "abcd");
        assert_eq!(buffer.cursor(), (2, 0));
    }

    #[test]
    fn set_text_places_cursor_at_end() {
        let mut buffer = InputBuffer::new();
        buffer.set_text("Tell me about pricing");

        assert_eq!(buffer.cursor(), (21, 0));
        assert!(!buffer.is_empty());
    }

    #[test]
    fn enter_submits_and_shift_enter_breaks_line() {
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        let shift_enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT);

        assert_eq!(action_for_key(enter), Some(InputAction::Submit));
        assert_eq!(action_for_key(shift_enter), Some(InputAction::NewLine));
    }

    #[test]
    fn function_keys_pick_quick_replies() {
        let f1 = KeyEvent::new(KeyCode::F(1), KeyModifiers::NONE);
        let f12 = KeyEvent::new(KeyCode::F(12), KeyModifiers::NONE);

        assert_eq!(action_for_key(f1), Some(InputAction::QuickReply(0)));
        assert_eq!(action_for_key(f12), None);
    }

    #[test]
    fn control_keys() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let ctrl_s = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);

        assert_eq!(action_for_key(ctrl_c), Some(InputAction::Quit));
        assert_eq!(action_for_key(ctrl_s), Some(InputAction::Submit));
        assert!(!InputAction::Quit.edits_input());
        assert!(InputAction::Submit.edits_input());
    }
}
