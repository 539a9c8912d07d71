mod channel;
pub mod device_endpoint;
pub mod gpx_replay;

pub use channel::{channel, ChannelSource, SampleSender};
pub use device_endpoint::DeviceEndpoint;
pub use gpx_replay::GpxReplaySource;
