// Rolling per-channel buffers behind the live plot.
pub mod buffer;
pub mod channel;
pub mod config;
pub mod view;

pub use channel::WaveformPipeline;
pub use config::TimeWindow;
pub use view::WaveformView;
