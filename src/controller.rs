use std::time::{Duration, Instant};
use tracing::trace;

use crate::domain::{ListConfig, ListError, Message, Route, SortKey};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

/// Turns terminal events into [`Message`]s for the model.
pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &ListConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Waits for the next event. A poll without input yields [`Message::Tick`]
    /// so a pending search can settle; the wait is cut short when its deadline
    /// is closer than the poll interval.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, ListError> {
        let timeout = self.poll_timeout(model, Instant::now());
        if !event::poll(timeout)? {
            return Ok(Some(Message::Tick));
        }

        match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                Ok(self.handle_key(model, key))
            }
            Event::Resize(width, height) => {
                Ok(Some(Message::Resize(width as usize, height as usize)))
            }
            _ => Ok(None),
        }
    }

    fn poll_timeout(&self, model: &Model, now: Instant) -> Duration {
        let poll = Duration::from_millis(self.event_poll_time);
        match model.next_deadline(now) {
            Some(remaining) => poll.min(remaining),
            None => poll,
        }
    }

    pub fn handle_key(&self, model: &Model, key: event::KeyEvent) -> Option<Message> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Message::Quit);
        }
        if model.raw_keyevents() {
            return Some(Message::RawKey(key));
        }

        let message = if model.show_help() {
            match key.code {
                KeyCode::Char('q') => Some(Message::Quit),
                KeyCode::Char('?') => Some(Message::Help),
                KeyCode::Esc | KeyCode::Enter => Some(Message::Exit),
                _ => None,
            }
        } else {
            match model.route() {
                Route::Login => Self::login_key(key.code),
                Route::Edit => Self::edit_key(key.code),
            }
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    fn login_key(code: KeyCode) -> Option<Message> {
        match code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Char('e') | KeyCode::Enter => Some(Message::Navigate(Route::Edit)),
            _ => None,
        }
    }

    fn edit_key(code: KeyCode) -> Option<Message> {
        match code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Char('b') => Some(Message::Navigate(Route::Login)),
            KeyCode::Char('/') => Some(Message::FocusSearch),
            KeyCode::Enter => Some(Message::SubmitSearch),
            KeyCode::Char('s') => Some(Message::CycleSort),
            KeyCode::Char('N') => Some(Message::Sort(SortKey::Name)),
            KeyCode::Char('E') => Some(Message::Sort(SortKey::Email)),
            KeyCode::Char('P') => Some(Message::Sort(SortKey::Phone)),
            KeyCode::Char('D') => Some(Message::Sort(SortKey::Address)),
            KeyCode::Char('T') => Some(Message::Sort(SortKey::Status)),
            KeyCode::Char('a') => Some(Message::Filter(Some("Active".to_string()))),
            KeyCode::Char('i') => Some(Message::Filter(Some("Inactive".to_string()))),
            KeyCode::Char('x') => Some(Message::Filter(None)),
            KeyCode::Char('r') => Some(Message::Reset),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::PreviousPage),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::NextPage),
            KeyCode::Home | KeyCode::Char('g') => Some(Message::FirstPage),
            KeyCode::End | KeyCode::Char('G') => Some(Message::LastPage),
            KeyCode::Char(c @ '1'..='9') => c
                .to_digit(10)
                .map(|d| Message::GoToPage(d as usize - 1)),
            _ => None,
        }
    }
}
