#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeWindow {
    pub seconds: f64,
}

impl TimeWindow {
    pub fn new(seconds: f64) -> Self {
        Self {
            seconds: seconds.max(0.1),
        }
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow { seconds: 10.0 }
    }
}
