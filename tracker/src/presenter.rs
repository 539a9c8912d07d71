use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};

use session_tracker_lib::SessionDisplay;

/// Whatever shows the session to the user.
pub trait Presenter: Send {
    fn render(&mut self, display: &SessionDisplay);

    /// Things the user should know about that aren't part of the session, e.g. GPS trouble.
    fn notify(&mut self, message: &str);
}

pub struct ConsolePresenter<W: Write + Send> {
    out: W,
}

impl ConsolePresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Presenter for ConsolePresenter<W> {
    fn render(&mut self, display: &SessionDisplay) {
        if let Err(err) = writeln!(self.out, "{display}").and_then(|_| self.out.flush()) {
            tracing::warn!("Failed to render display: {err}");
        }
    }

    fn notify(&mut self, message: &str) {
        if let Err(err) = writeln!(self.out, "! {message}").and_then(|_| self.out.flush()) {
            tracing::warn!("Failed to show notification: {err}");
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Presented {
    Display(SessionDisplay),
    Notification(String),
}

/// Keeps everything it was given. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    log: Arc<Mutex<Vec<Presented>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Presented> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    pub fn last_display(&self) -> Option<SessionDisplay> {
        self.entries().into_iter().rev().find_map(|entry| match entry {
            Presented::Display(display) => Some(display),
            Presented::Notification(_) => None,
        })
    }

    pub fn notifications(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                Presented::Notification(message) => Some(message),
                Presented::Display(_) => None,
            })
            .collect()
    }

    fn push(&self, entry: Presented) {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(entry);
    }
}

impl Presenter for RecordingPresenter {
    fn render(&mut self, display: &SessionDisplay) {
        self.push(Presented::Display(display.clone()));
    }

    fn notify(&mut self, message: &str) {
        self.push(Presented::Notification(message.to_string()));
    }
}
