use crate::client::TransportError;
use crate::input::{InputAction, InputBuffer};
use crate::protocol::ChatResponse;
use crate::transcript::{Sender, Transcript, TypingHandle};

pub const ERROR_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

const SCROLL_STEP: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Idle,
    Sending,
}

/// A message accepted by `submit` whose request has not settled yet.
#[derive(Debug)]
pub struct PendingSend {
    pub message: String,
    pub handle: TypingHandle,
}

#[derive(Debug)]
pub enum Effect {
    None,
    Send(PendingSend),
    Quit,
}

/// Input controller and send pipeline over a transcript.
///
/// A send moves the widget Idle -> Sending -> Idle. While Sending the text box
/// and every trigger are locked, so at most one request is ever in flight.
pub struct ChatWidget {
    input: InputBuffer,
    transcript: Transcript,
    state: WidgetState,
    focused: bool,
    quick_replies: Vec<String>,
    lead_captured: bool,
}

impl ChatWidget {
    pub fn new(transcript: Transcript, quick_replies: Vec<String>) -> Self {
        Self {
            input: InputBuffer::new(),
            transcript,
            state: WidgetState::Idle,
            focused: true,
            quick_replies,
            lead_captured: false,
        }
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state() == WidgetState::Sending
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn lead_captured(&self) -> bool {
        self.lead_captured
    }

    /// One-line key legend for the quick replies, e.g. `F1 Hi · F2 Pricing`.
    pub fn quick_reply_hint(&self) -> Option<String> {
        if self.quick_replies.is_empty() {
            return None;
        }
        let hint = self
            .quick_replies
            .iter()
            .enumerate()
            .map(|(index, reply)| format!("F{} {}", index + 1, reply))
            .collect::<Vec<_>>()
            .join(" · ");
        Some(hint)
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn handle(&mut self, action: InputAction) -> Effect {
        if self.is_locked() && action.edits_input() {
            tracing::debug!(?action, "input locked, ignoring");
            return Effect::None;
        }

        match action {
            InputAction::Quit => Effect::Quit,
            InputAction::Submit => self.submit().map_or(Effect::None, Effect::Send),
            InputAction::QuickReply(index) => match self.quick_replies.get(index).cloned() {
                Some(reply) => self
                    .prefill_and_submit(&reply)
                    .map_or(Effect::None, Effect::Send),
                None => Effect::None,
            },
            InputAction::ScrollUp => {
                self.transcript.scroll_up(SCROLL_STEP);
                Effect::None
            }
            InputAction::ScrollDown => {
                self.transcript.scroll_down(SCROLL_STEP);
                Effect::None
            }
            other => {
                self.input.apply(other);
                Effect::None
            }
        }
    }

    /// Runs the pipeline up to the request: validates, locks, clears the box,
    /// drops the welcome section and renders the user message plus a typing
    /// indicator. Returns `None` for blank input or while a send is running.
    pub fn submit(&mut self) -> Option<PendingSend> {
        if self.is_locked() {
            return None;
        }

        let message = self.input.text().trim().to_string();
        if message.is_empty() {
            return None;
        }

        self.state = WidgetState::Sending;
        self.focused = false;
        self.input.clear();
        self.transcript.remove_welcome();
        self.transcript.render_message(&message, Sender::User, false);
        let handle = self.transcript.render_typing_indicator();

        tracing::debug!(chars = message.chars().count(), "message submitted");
        Some(PendingSend { message, handle })
    }

    pub fn prefill_and_submit(&mut self, text: &str) -> Option<PendingSend> {
        if self.is_locked() {
            return None;
        }
        self.input.set_text(text);
        self.submit()
    }

    /// Finishes a send: swaps the typing indicator for the reply or the
    /// fallback error, then unlocks input whatever the outcome.
    pub fn settle(&mut self, handle: TypingHandle, result: Result<ChatResponse, TransportError>) {
        self.transcript.remove_typing_indicator(handle);

        match result {
            Ok(reply) => {
                tracing::info!(
                    intent = reply.intent.as_deref().unwrap_or("unknown"),
                    lead_captured = reply.lead_captured,
                    session_id = reply.session_id.as_deref().unwrap_or("-"),
                    "reply received"
                );
                if reply.lead_captured && !self.lead_captured {
                    tracing::info!("backend reported lead captured");
                    self.lead_captured = true;
                }
                self.transcript
                    .render_message(&reply.response, Sender::Assistant, false);
            }
            Err(err) => {
                tracing::warn!("chat request failed: {}", err);
                self.transcript
                    .render_message(ERROR_MESSAGE, Sender::Assistant, true);
            }
        }

        self.state = WidgetState::Idle;
        self.focused = true;
        tracing::debug!(blocks = self.transcript.blocks().len(), "send settled");
    }
}
