use std::io::Write;

use session_tracker_lib::{SessionDisplay, SystemClock};
use tokio::sync::mpsc;
use tracker::{
    config::TrackerConfig,
    dispatcher::{Command, Exit},
    presenter::RecordingPresenter,
    run_tracker,
    sources::GpxReplaySource,
};

const RIVERSIDE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="tracker-tests" xmlns="http://www.topografix.com/GPX/1/1">
  <metadata><name>Riverside</name></metadata>
  <trk>
    <trkseg>
      <trkpt lat="0.0000" lon="30.0000"><time>2024-06-01T08:00:00Z</time></trkpt>
      <trkpt lat="0.0010" lon="30.0000"><time>2024-06-01T08:00:05Z</time></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="0.0020" lon="30.0000"><time>2024-06-01T08:00:12Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

#[tokio::test(start_paused = true)]
async fn replayed_track_is_measured() {
    let mut file = tempfile::Builder::new().suffix(".gpx").tempfile().unwrap();
    file.write_all(RIVERSIDE.as_bytes()).unwrap();

    let config = TrackerConfig {
        replay_speedup: 5.0,
        ..Default::default()
    };
    let source = GpxReplaySource::open(file.path(), config.replay_speedup, SystemClock).unwrap();
    assert_eq!(source.len(), 3);

    let presenter = RecordingPresenter::new();
    let (tx, rx) = mpsc::channel(4);
    tx.send(Command::Start).await.unwrap();

    let (exit, summary) = run_tracker(source, presenter.clone(), &config, rx).await;

    assert!(matches!(exit, Exit::SourceEnded));
    assert_eq!(summary.samples_accepted, 3);
    assert_eq!(summary.samples_stale, 0);
    assert_eq!(summary.timeouts, 0);
    assert!((summary.last_session_meters - 222.39).abs() < 0.1, "got {}", summary.last_session_meters);
    assert_eq!(presenter.last_display(), Some(SessionDisplay::initial()));
    assert!(presenter.notifications().is_empty());
}

#[test]
fn missing_file_is_an_error() {
    let res = GpxReplaySource::open(std::path::Path::new("/no/such/track.gpx"), 1.0, SystemClock);
    assert!(res.is_err());
}
