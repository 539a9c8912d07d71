pub mod acquisition;
pub mod config;
pub mod dispatcher;
pub mod presenter;
pub mod sources;

use std::io::BufRead;

use session_tracker_lib::{PositionSource, SessionTracker, SystemClock};
use tokio::sync::mpsc;

use crate::{
    config::TrackerConfig,
    dispatcher::{Command, Dispatcher, Exit, RunSummary},
    presenter::Presenter,
};

/// Runs one dispatcher against `source` until it exits. Nothing is tracked until a
/// `Command::Start` arrives.
pub async fn run_tracker<S, P>(source: S, presenter: P, config: &TrackerConfig, commands: mpsc::Receiver<Command>) -> (Exit, RunSummary)
where
    S: PositionSource,
    P: Presenter,
{
    let tracker = SessionTracker::with_clock(SystemClock);
    let dispatcher = Dispatcher::new(tracker, source, presenter, config.acquisition, config.tick_interval());
    dispatcher.run(commands).await
}

/// Turns typed lines into commands: `start`, `stop` and `quit`.
pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "start" | "s" => Some(Command::Start),
        "stop" | "x" => Some(Command::Stop),
        "quit" | "q" | "exit" => Some(Command::Shutdown),
        _ => None,
    }
}

/// Reads commands line by line until the input ends or the dispatcher is gone.
/// This blocks, so give it a thread of its own rather than a runtime worker.
pub fn forward_commands<R: BufRead>(input: R, commands: mpsc::Sender<Command>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!("Failed to read command: {err}");
                break;
            }
        };

        let Some(command) = parse_command(&line) else {
            if !line.trim().is_empty() {
                tracing::warn!("Unknown command {:?}, expected start, stop or quit", line.trim());
            }
            continue;
        };

        if commands.blocking_send(command).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufReader, Read},
        sync::mpsc as std_mpsc,
    };

    use crate::presenter::RecordingPresenter;

    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("start"), Some(Command::Start));
        assert_eq!(parse_command("  STOP \n"), Some(Command::Stop));
        assert_eq!(parse_command("q"), Some(Command::Shutdown));
        assert_eq!(parse_command("pause"), None);
    }

    #[test]
    fn forwards_known_commands_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let input: &[u8] = b"start\nnonsense\n\nstop\nquit\n";

        forward_commands(input, tx);

        assert_eq!(rx.blocking_recv(), Some(Command::Start));
        assert_eq!(rx.blocking_recv(), Some(Command::Stop));
        assert_eq!(rx.blocking_recv(), Some(Command::Shutdown));
        assert_eq!(rx.blocking_recv(), None);
    }

    /// A terminal that hands over whatever was typed and otherwise waits.
    struct Keyboard(std_mpsc::Receiver<&'static [u8]>);

    impl Read for Keyboard {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.recv() {
                Ok(keys) => {
                    let n = keys.len().min(buf.len());
                    buf[..n].copy_from_slice(&keys[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }

    #[test]
    fn runtime_shuts_down_while_input_is_still_open() {
        let (keys, keyboard) = std_mpsc::channel::<&'static [u8]>();
        let (tx, rx) = mpsc::channel(4);
        let reader = std::thread::spawn(move || forward_commands(BufReader::new(Keyboard(keyboard)), tx));

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let (_sample_tx, source) = sources::channel(4, "idle");
        keys.send(b"start\nquit\n").unwrap();

        let (exit, summary) = runtime.block_on(run_tracker(source, RecordingPresenter::new(), &TrackerConfig::default(), rx));
        drop(runtime);

        assert!(matches!(exit, Exit::Shutdown));
        assert_eq!(summary.sessions, 1);
        // Still parked in read(), waiting for the next line
        assert!(!reader.is_finished());

        drop(keys);
        reader.join().unwrap();
    }
}
