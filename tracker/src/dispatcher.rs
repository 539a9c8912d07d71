use std::time::Duration;

use session_tracker_lib::{Clock, PositionSample, PositionSource, SampleOutcome, SessionDisplay, SessionTracker, SourceError};
use tokio::{
    sync::mpsc,
    time::{Instant, MissedTickBehavior},
};

use crate::{acquisition::AcquisitionPolicy, presenter::Presenter};

/// What the UI can ask for. These are the start and stop buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Shutdown,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub sessions: usize,
    pub samples_accepted: usize,
    pub samples_stale: usize,
    pub timeouts: usize,
    /// Distance of the last session, at the moment it was stopped.
    pub last_session_meters: f64,
}

#[derive(Debug)]
pub enum Exit {
    /// Shutdown was requested, or every command sender went away.
    Shutdown,
    /// The source has nothing more to give.
    SourceEnded,
    /// The source can't continue, e.g. location permission was taken away.
    SourceFailed(SourceError),
}

/// The event loop. It owns the tracker and is the only thing that touches it, feeding it
/// samples from the source and rendering it on every tick.
pub struct Dispatcher<S: PositionSource, P: Presenter, C: Clock> {
    tracker: SessionTracker<C>,
    source: S,
    presenter: P,
    policy: AcquisitionPolicy,
    tick: Duration,
    summary: RunSummary,
}

impl<S: PositionSource, P: Presenter, C: Clock> Dispatcher<S, P, C> {
    pub fn new(tracker: SessionTracker<C>, source: S, presenter: P, policy: AcquisitionPolicy, tick: Duration) -> Self {
        Self {
            tracker,
            source,
            presenter,
            policy,
            tick,
            summary: RunSummary::default(),
        }
    }

    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> (Exit, RunSummary) {
        tracing::info!("Dispatcher running with source {}", self.source.name());
        if self.policy.high_accuracy {
            tracing::debug!("High accuracy requested, {} has no accuracy setting", self.source.name());
        }

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut timeout_at = Instant::now() + self.policy.sample_timeout();

        self.presenter.render(&SessionDisplay::initial());

        let exit = loop {
            let watching = self.tracker.is_running();

            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Start) => {
                        if !watching {
                            self.tracker.start();
                            self.summary.sessions += 1;
                            timeout_at = Instant::now() + self.policy.sample_timeout();
                            ticker.reset();
                            self.render();
                        }
                    },
                    Some(Command::Stop) => self.stop().await,
                    Some(Command::Shutdown) | None => break Exit::Shutdown,
                },

                res = self.source.next_sample(), if watching => {
                    timeout_at = Instant::now() + self.policy.sample_timeout();
                    match res {
                        Ok(Some(sample)) => self.handle_sample(&sample),
                        Ok(None) => {
                            tracing::info!("Source {} ended", self.source.name());
                            break Exit::SourceEnded;
                        },
                        Err(err) if err.is_fatal() => {
                            tracing::error!("Source {} failed: {}", self.source.name(), err);
                            self.presenter.notify(&format!("Unable to access GPS: {err}"));
                            break Exit::SourceFailed(err);
                        },
                        Err(err) => {
                            tracing::warn!("Source {} reported: {}", self.source.name(), err);
                            self.presenter.notify(&err.to_string());
                        },
                    }
                },

                _ = tokio::time::sleep_until(timeout_at), if watching => {
                    self.summary.timeouts += 1;
                    tracing::warn!("No position from {} in {:?}", self.source.name(), self.policy.sample_timeout());
                    self.presenter.notify(&SourceError::Timeout.to_string());
                    timeout_at = Instant::now() + self.policy.sample_timeout();
                },

                _ = ticker.tick(), if watching => self.render(),
            }
        };

        self.stop().await;
        tracing::info!("Dispatcher finished: {:?}", self.summary);

        (exit, self.summary)
    }

    fn handle_sample(&mut self, sample: &PositionSample) {
        if !self.policy.is_fresh(sample, self.tracker.clock().now()) {
            self.summary.samples_stale += 1;
            tracing::debug!("Dropping stale sample from {}", sample.timestamp);
            return;
        }

        if let SampleOutcome::Accepted { .. } = self.tracker.on_sample(sample) {
            self.summary.samples_accepted += 1;
            self.render();
        }
    }

    /// Stops the session before anything else is read from the source.
    async fn stop(&mut self) {
        if !self.tracker.is_running() {
            return;
        }

        self.summary.last_session_meters = self.tracker.state().total_distance_meters();
        self.tracker.stop();
        self.source.release().await;
        self.presenter.render(&SessionDisplay::initial());
    }

    fn render(&mut self) {
        let display = SessionDisplay::snapshot(&self.tracker);
        self.presenter.render(&display);
    }
}
