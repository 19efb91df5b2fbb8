use super::{
    buffer::SampleBuffer,
    config::TimeWindow,
    view::{ChannelView, SamplePoint, WaveformView},
};
use crate::drivers::{ParsedLine, ProtocolError};

struct ChannelState {
    index: usize,
    enabled: bool,
    buffer: SampleBuffer,
}

impl ChannelState {
    fn new(index: usize, time_window: TimeWindow) -> Self {
        Self {
            index,
            enabled: false,
            buffer: SampleBuffer::new(time_window.seconds),
        }
    }

    fn ingest(&mut self, timestamp_secs: f64, volts: f64) -> bool {
        if !self.enabled {
            return false;
        }
        self.buffer.push(SamplePoint {
            time: timestamp_secs,
            value: volts,
        });
        true
    }

    fn view(&self, now_secs: f64, window_secs: f64) -> Option<ChannelView> {
        if !self.enabled || self.buffer.is_empty() {
            return None;
        }
        let oldest = now_secs - window_secs;
        let mut samples = Vec::with_capacity(self.buffer.len());
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for s in self.buffer.iter().filter(|s| s.time >= oldest) {
            min = min.min(s.value);
            max = max.max(s.value);
            // Newest sample lands at the right edge of [0, window].
            samples.push(SamplePoint {
                time: s.time - now_secs + window_secs,
                value: s.value,
            });
        }
        let latest = samples.last()?.value;
        Some(ChannelView {
            index: self.index,
            min,
            max,
            latest,
            samples,
        })
    }
}

/// Per-channel rolling buffers fed from parsed reading lines.
pub struct WaveformPipeline {
    time_window: TimeWindow,
    channels: Vec<ChannelState>,
}

impl WaveformPipeline {
    /// Channels start disabled, matching the unchecked boxes in the UI.
    pub fn new(channel_count: usize, time_window: TimeWindow) -> Self {
        let channels = (0..channel_count)
            .map(|idx| ChannelState::new(idx, time_window))
            .collect();
        Self {
            time_window,
            channels,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn time_window(&self) -> TimeWindow {
        self.time_window
    }

    pub fn set_time_window(&mut self, window: TimeWindow) {
        self.time_window = window;
        for channel in &mut self.channels {
            channel.buffer.set_window(window.seconds);
        }
    }

    pub fn set_channel_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(ch) = self.channels.get_mut(index) {
            ch.enabled = enabled;
        }
    }

    pub fn is_channel_enabled(&self, index: usize) -> bool {
        self.channels.get(index).map_or(false, |ch| ch.enabled)
    }

    pub fn enabled_mask(&self) -> Vec<bool> {
        self.channels.iter().map(|ch| ch.enabled).collect()
    }

    /// Tokens of checked channels that failed to parse.
    pub fn malformed_tokens<'a>(
        &'a self,
        line: &'a ParsedLine,
    ) -> impl Iterator<Item = (usize, &'a str, &'a ProtocolError)> + 'a {
        line.errors()
            .filter(move |(position, _, _)| self.is_channel_enabled(*position))
    }

    /// Appends every valid voltage of an enabled channel; returns how many were kept.
    ///
    /// Malformed tokens of enabled channels are logged and skipped.
    pub fn ingest(&mut self, timestamp_secs: f64, line: &ParsedLine) -> usize {
        for (position, raw, err) in self.malformed_tokens(line) {
            log::warn!("Error processing channel {position}: {err} (raw data: {raw:?})");
        }
        let mut kept = 0;
        for (position, volts) in line.voltages() {
            if let Some(channel) = self.channels.get_mut(position) {
                if channel.ingest(timestamp_secs, volts) {
                    kept += 1;
                }
            }
        }
        kept
    }

    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.buffer.clear();
        }
    }

    pub fn view(&self, now_secs: f64) -> WaveformView {
        let window_secs = self.time_window.seconds;
        let channels = self
            .channels
            .iter()
            .filter_map(|ch| ch.view(now_secs, window_secs))
            .collect();
        WaveformView {
            window_secs,
            channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::parse_line;

    fn pipeline_with(enabled: &[usize]) -> WaveformPipeline {
        let mut pipeline = WaveformPipeline::new(4, TimeWindow::new(10.0));
        for &idx in enabled {
            pipeline.set_channel_enabled(idx, true);
        }
        pipeline
    }

    #[test]
    fn only_enabled_channels_are_buffered() {
        let mut pipeline = pipeline_with(&[1, 3]);
        let line = parse_line("CH_0: 1.0V, CH_1: 2.0V, CH_2: 3.0V, CH_3: 4.0V");
        assert_eq!(pipeline.ingest(1000.0, &line), 2);
        let view = pipeline.view(1000.0);
        let indices: Vec<usize> = view.channels.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert_eq!(view.channels[1].latest, 4.0);
    }

    #[test]
    fn extra_and_malformed_tokens_are_ignored() {
        let mut pipeline = pipeline_with(&[0, 1, 2, 3]);
        let line = parse_line("CH_0: 1.0V, CH_1: oopsV, CH_2: 3.0V, CH_3: 4.0V, CH_4: 5.0V");
        assert_eq!(pipeline.ingest(5.0, &line), 3);
        assert!(pipeline.view(5.0).channels.iter().all(|c| c.index != 1));
    }

    #[test]
    fn window_trims_old_samples_and_maps_time_axis() {
        let mut pipeline = pipeline_with(&[0]);
        for (t, v) in [(100.0, 0.5), (104.0, 1.0), (111.0, 1.5), (113.0, 2.0)] {
            pipeline.ingest(t, &parse_line(&format!("CH_0: {v}V")));
        }
        let view = pipeline.view(113.0);
        let channel = &view.channels[0];
        // 100.0 fell out of the 10 s window ending at 113.0
        let points = channel.points();
        assert_eq!(points, vec![[1.0, 1.0], [8.0, 1.5], [10.0, 2.0]]);
        assert_eq!((channel.min, channel.max), (1.0, 2.0));
    }

    #[test]
    fn malformed_tokens_only_reported_for_checked_channels() {
        let pipeline = pipeline_with(&[2]);
        let line = parse_line("CH_0: xV, CH_1: 1.0V, CH_2: yV, garbage");
        let bad: Vec<_> = pipeline
            .malformed_tokens(&line)
            .map(|(position, raw, _)| (position, raw))
            .collect();
        assert_eq!(bad, vec![(2, "CH_2: yV")]);
    }

    #[test]
    fn view_hides_samples_that_aged_out_without_new_data() {
        let mut pipeline = pipeline_with(&[0]);
        pipeline.ingest(50.0, &parse_line("CH_0: 1.0V"));
        assert_eq!(pipeline.view(55.0).channels.len(), 1);
        assert!(pipeline.view(61.0).is_empty());
    }

    #[test]
    fn disabling_keeps_data_but_hides_it() {
        let mut pipeline = pipeline_with(&[2]);
        pipeline.ingest(1.0, &parse_line("CH_0: 0V, CH_1: 0V, CH_2: 2.5V"));
        pipeline.set_channel_enabled(2, false);
        assert!(!pipeline.is_channel_enabled(2));
        assert!(pipeline.view(1.0).is_empty());
        pipeline.set_channel_enabled(2, true);
        assert_eq!(pipeline.view(1.0).channels[0].latest, 2.5);
    }

    #[test]
    fn changing_window_prunes_existing_samples() {
        let mut pipeline = WaveformPipeline::new(1, TimeWindow::new(30.0));
        pipeline.set_channel_enabled(0, true);
        for t in 0..=30 {
            pipeline.ingest(t as f64, &parse_line("CH_0: 1V"));
        }
        assert_eq!(pipeline.view(30.0).channels[0].samples.len(), 31);
        pipeline.set_time_window(TimeWindow::new(20.0));
        assert_eq!(pipeline.time_window().seconds, 20.0);
        assert_eq!(pipeline.view(30.0).channels[0].samples.len(), 21);
        pipeline.clear();
        assert!(pipeline.view(30.0).is_empty());
    }
}
