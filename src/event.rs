use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};

pub enum AppEvent {
    Key(KeyEvent),
    /// No input arrived within one tick period.
    Tick,
    Resize,
}

/// Terminal input read on a background thread and delivered over a channel,
/// with a `Tick` whenever the terminal stays quiet for `tick_rate`.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || pump(&tx, tick_rate));
        Self { rx }
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        Ok(self.rx.recv()?)
    }
}

/// Runs until the receiving side hangs up.
fn pump(tx: &mpsc::Sender<AppEvent>, tick_rate: Duration) {
    loop {
        let event = if event::poll(tick_rate).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                Ok(Event::Resize(_, _)) => AppEvent::Resize,
                _ => continue,
            }
        } else {
            AppEvent::Tick
        };
        if tx.send(event).is_err() {
            return;
        }
    }
}
