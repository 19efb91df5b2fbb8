use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use crate::drivers::error::DaqError;
use crate::waveform::WaveformView;

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
    /// Caption, axis labels and legend. Needs a system font.
    pub annotate: bool,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: WHITE,
            palette: vec![RED, BLUE, GREEN, MAGENTA],
            annotate: true,
        }
    }
}

/// Renders the plot window (time axis `[0, window]`) to PNG bytes.
pub fn render_waveform_png(view: &WaveformView, style: PlotStyle) -> Result<Vec<u8>, DaqError> {
    if view.is_empty() {
        return Err(DaqError::Plot("no channel has samples in the window".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let (y_min, y_max) = view
            .channels
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), c| (lo.min(c.min), hi.max(c.max)));
        let pad = ((y_max - y_min) * 0.1).max(0.1);
        let mut builder = ChartBuilder::on(&root);
        builder.margin(10);
        if style.annotate {
            builder
                .caption("Voltage vs Time", ("sans-serif", 20).into_font().color(&BLACK))
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 40);
        }
        let mut chart =
            builder.build_cartesian_2d(0f64..view.window_secs, (y_min - pad)..(y_max + pad))?;
        if style.annotate {
            chart
                .configure_mesh()
                .x_desc("Time (s)")
                .y_desc("Voltage (V)")
                .light_line_style(&BLACK.mix(0.05))
                .draw()?;
        }
        for channel in &view.channels {
            let color = style
                .palette
                .get(channel.index % style.palette.len().max(1))
                .copied()
                .unwrap_or(BLACK);
            let series = channel.samples.iter().map(|s| (s.time, s.value));
            let drawn = chart.draw_series(LineSeries::new(series, &color))?;
            if style.annotate {
                drawn
                    .label(format!("Channel {}", channel.index + 1))
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
            }
        }
        if style.annotate {
            chart
                .configure_series_labels()
                .border_style(&BLACK.mix(0.3))
                .background_style(&style.background)
                .draw()?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, DaqError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| DaqError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::parse_line;
    use crate::waveform::{TimeWindow, WaveformPipeline};

    #[test]
    fn renders_png_snapshot_of_window() {
        let mut pipeline = WaveformPipeline::new(2, TimeWindow::new(10.0));
        pipeline.set_channel_enabled(0, true);
        pipeline.set_channel_enabled(1, true);
        for i in 0..20 {
            let t = i as f64 * 0.5;
            pipeline.ingest(t, &parse_line(&format!("CH_0: {}V, CH_1: {}V", t.sin(), t.cos())));
        }
        let style = PlotStyle {
            width: 200,
            height: 100,
            annotate: false,
            ..PlotStyle::default()
        };
        let png = render_waveform_png(&pipeline.view(9.5), style).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn empty_palette_draws_in_black() {
        let mut pipeline = WaveformPipeline::new(1, TimeWindow::new(10.0));
        pipeline.set_channel_enabled(0, true);
        pipeline.ingest(1.0, &parse_line("CH_0: 1.0V"));
        pipeline.ingest(2.0, &parse_line("CH_0: 2.0V"));
        let style = PlotStyle {
            width: 120,
            height: 80,
            palette: Vec::new(),
            annotate: false,
            ..PlotStyle::default()
        };
        let png = render_waveform_png(&pipeline.view(2.0), style).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn empty_view_is_rejected() {
        let pipeline = WaveformPipeline::new(4, TimeWindow::default());
        assert!(matches!(
            render_waveform_png(&pipeline.view(0.0), PlotStyle::default()),
            Err(DaqError::Plot(_))
        ));
    }
}
