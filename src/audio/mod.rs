pub mod output;
pub mod player;
pub mod processing;
pub mod sample;
pub mod timeline;

pub use output::{OutputContext, PlaybackError};
pub use player::{PlaybackController, PlaybackProgress, ProgressSink};
pub use sample::AudioSample;
pub use timeline::{format_timestamp, Timeline};
