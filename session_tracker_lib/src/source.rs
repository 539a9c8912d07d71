use std::collections::VecDeque;

use thiserror::Error;

use crate::position_sample::PositionSample;

/// Failures of the thing producing samples. The tracker itself never sees these,
/// they are for the collaborator to surface to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("location permission was denied")]
    PermissionDenied,
    #[error("location is not available: {0}")]
    Unavailable(String),
    #[error("timed out waiting for a position")]
    Timeout,
    #[error("malformed position data: {0}")]
    Malformed(String),
    #[error("i/o error: {0}")]
    Io(String),
}

impl SourceError {
    /// Errors after which the watch can't produce anything more.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::PermissionDenied | SourceError::Unavailable(_))
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => SourceError::PermissionDenied,
            std::io::ErrorKind::TimedOut => SourceError::Timeout,
            _ => SourceError::Io(err.to_string()),
        }
    }
}

/// Something that watches the device location and pushes samples.
#[async_trait::async_trait]
pub trait PositionSource: Send {
    /// Waits for the next sample. `Ok(None)` means the watch has ended.
    async fn next_sample(&mut self) -> Result<Option<PositionSample>, SourceError>;

    /// Drop the underlying watch. Called when the session is stopped.
    async fn release(&mut self) {}

    fn name(&self) -> &str;
}

/// Plays back a fixed list of results, then ends.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: VecDeque<Result<PositionSample, SourceError>>,
    released: bool,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Result<PositionSample, SourceError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            released: false,
        }
    }

    pub fn from_samples(samples: impl IntoIterator<Item = PositionSample>) -> Self {
        Self::new(samples.into_iter().map(Ok))
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

#[async_trait::async_trait]
impl PositionSource for ScriptedSource {
    async fn next_sample(&mut self) -> Result<Option<PositionSample>, SourceError> {
        match self.script.pop_front() {
            Some(Ok(sample)) => Ok(Some(sample)),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    async fn release(&mut self) {
        self.released = true;
        self.script.clear();
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
