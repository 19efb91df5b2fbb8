#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePoint {
    /// Seconds; absolute (Unix) inside buffers, window-relative inside views.
    pub time: f64,
    /// Volts.
    pub value: f64,
}

#[derive(Debug)]
pub struct ChannelView {
    pub index: usize,
    pub min: f64,
    pub max: f64,
    pub latest: f64,
    pub samples: Vec<SamplePoint>,
}

impl ChannelView {
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.samples.iter().map(|s| [s.time, s.value]).collect()
    }
}

#[derive(Debug)]
pub struct WaveformView {
    pub window_secs: f64,
    pub channels: Vec<ChannelView>,
}

impl WaveformView {
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
