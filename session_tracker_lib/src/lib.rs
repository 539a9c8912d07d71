pub mod clock;
pub mod display;
pub mod geo;
pub mod position_sample;
pub mod session;
pub mod source;

pub use clock::{Clock, ManualClock, SystemClock};
pub use display::SessionDisplay;
pub use position_sample::{Coordinates, PositionSample};
pub use session::{SampleOutcome, SessionState, SessionTracker};
pub use source::{PositionSource, ScriptedSource, SourceError};
