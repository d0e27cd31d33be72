//! Terminal input for the dashboard.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Terminal events the dashboard reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Key press.
    Key(KeyEvent),
    /// Terminal resize.
    Resize(u16, u16),
}

/// What a key press asks the dashboard to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Stop the dashboard.
    Quit,
    /// Show the view with this index.
    SelectView(usize),
    /// Show the next view, wrapping around.
    NextView,
    /// Show the previous view, wrapping around.
    PrevView,
    /// Move the cursor one row up.
    Up,
    /// Move the cursor one row down.
    Down,
    /// Move the cursor one column left.
    Left,
    /// Move the cursor one column right.
    Right,
    /// Jump to the first data row.
    First,
    /// Jump to the last data row.
    Last,
}

/// Map a key to a dashboard input. Releases and unbound keys map to `None`.
#[must_use]
pub fn classify_key(key: KeyEvent) -> Option<Input> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let input = match key.code {
        KeyCode::Char('q' | 'Q') => Input::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Input::Quit,
        KeyCode::F(n @ 1..=12) => Input::SelectView(usize::from(n) - 1),
        KeyCode::Char(c @ '1'..='9') => Input::SelectView(c as usize - '1' as usize),
        KeyCode::Tab => Input::NextView,
        KeyCode::BackTab => Input::PrevView,
        KeyCode::Up | KeyCode::Char('k') => Input::Up,
        KeyCode::Down | KeyCode::Char('j') => Input::Down,
        KeyCode::Left | KeyCode::Char('h') => Input::Left,
        KeyCode::Right | KeyCode::Char('l') => Input::Right,
        KeyCode::Home | KeyCode::Char('g') => Input::First,
        KeyCode::End | KeyCode::Char('G') => Input::Last,
        _ => return None,
    };
    Some(input)
}

/// Reads terminal events on a blocking thread and hands them to the UI task.
///
/// The reader owns the only sender. When it stops, for whatever reason,
/// [`EventHandler::next`] returns `None`.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    /// Start reading terminal events, checking for shutdown every `poll_interval`.
    pub fn new(poll_interval: Duration) -> Self {
        let (tx, handler) = Self::channel();

        tokio::task::spawn_blocking(move || {
            read_terminal(&tx, poll_interval);
            debug!("terminal reader stopped");
        });

        handler
    }

    /// A handler fed only through the returned sender.
    ///
    /// The handler ends once every clone of the sender is dropped.
    pub fn channel() -> (mpsc::UnboundedSender<AppEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Wait for the next terminal event. `None` once input has ended.
    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

fn read_terminal(tx: &mpsc::UnboundedSender<AppEvent>, poll_interval: Duration) {
    while !tx.is_closed() {
        match event::poll(poll_interval) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(err) => {
                warn!(error = %err, "terminal input unavailable");
                return;
            }
        }

        let forwarded = match event::read() {
            Ok(Event::Key(key)) => tx.send(AppEvent::Key(key)),
            Ok(Event::Resize(w, h)) => tx.send(AppEvent::Resize(w, h)),
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(error = %err, "failed to read terminal event");
                continue;
            }
        };
        if forwarded.is_err() {
            return;
        }
    }
}
