// PNG chart of recorded vs forecast capacity
use crate::application::chart_renderer::ChartRenderer;
use crate::domain::forecast::PredictedPoint;
use crate::domain::telemetry::{MonthKey, Sample};
use anyhow::Context;
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

const BACKGROUND: Rgb<u8> = Rgb([0x02, 0x06, 0x17]);
const GRID: Rgb<u8> = Rgb([0x1e, 0x29, 0x3b]);
const AXIS: Rgb<u8> = Rgb([0x47, 0x55, 0x69]);
const ACTUAL: Rgb<u8> = Rgb([0x38, 0xbd, 0xf8]);
const PREDICTED: Rgb<u8> = Rgb([0xea, 0xb3, 0x08]);

const MARGIN: u32 = 24;
const GRID_LINES: u32 = 4;
const DASH: usize = 6;

/// Dark-theme line chart, 4.2 x 2.3 in at 120 dpi by default
#[derive(Debug, Clone, Copy)]
pub struct PngChartRenderer {
    width: u32,
    height: u32,
}

impl Default for PngChartRenderer {
    fn default() -> Self {
        Self::new(504, 276)
    }
}

impl PngChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(4 * MARGIN),
            height: height.max(4 * MARGIN),
        }
    }
}

/// Maps (month, capacity) onto pixel coordinates inside the plot area
struct Frame {
    origin: MonthKey,
    months: f64,
    y_min: f64,
    y_max: f64,
    width: u32,
    height: u32,
}

impl Frame {
    fn project(&self, month: MonthKey, capacity: f64) -> (i64, i64) {
        let plot_w = f64::from(self.width - 2 * MARGIN);
        let plot_h = f64::from(self.height - 2 * MARGIN);
        let x = f64::from(MARGIN) + month.months_since(self.origin) as f64 / self.months * plot_w;
        let y = f64::from(MARGIN) + (self.y_max - capacity) / (self.y_max - self.y_min) * plot_h;
        (x.round() as i64, y.round() as i64)
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham line, two pixels thick; `dashed` skips every other run of pixels
fn line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>, dashed: bool) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut step = 0usize;

    loop {
        if !dashed || (step / DASH) % 2 == 0 {
            put(img, x, y, color);
            put(img, x, y + 1, color);
        }
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
        step += 1;
    }
}

fn polyline(img: &mut RgbImage, points: &[(i64, i64)], color: Rgb<u8>, dashed: bool) {
    match points {
        [] => {}
        [single] => put(img, single.0, single.1, color),
        _ => {
            for pair in points.windows(2) {
                line(img, pair[0], pair[1], color, dashed);
            }
        }
    }
}

impl ChartRenderer for PngChartRenderer {
    fn render(&self, actual: &[Sample], predicted: &[PredictedPoint], model_label: &str) -> anyhow::Result<Bytes> {
        let points: Vec<(MonthKey, f64)> = actual
            .iter()
            .map(|s| (s.month, s.capacity))
            .chain(predicted.iter().map(|p| (p.month, p.capacity)))
            .collect();

        let origin = points.iter().map(|(m, _)| *m).min().context("nothing to plot")?;
        let last = points.iter().map(|(m, _)| *m).max().context("nothing to plot")?;
        if points.iter().any(|(_, c)| !c.is_finite()) {
            anyhow::bail!("cannot plot non-finite capacity for {}", model_label);
        }

        let lo = points.iter().map(|(_, c)| *c).fold(f64::INFINITY, f64::min);
        let hi = points.iter().map(|(_, c)| *c).fold(f64::NEG_INFINITY, f64::max);
        let pad = ((hi - lo) * 0.05).max(0.5);
        let frame = Frame {
            origin,
            months: (last.months_since(origin) as f64).max(1.0),
            y_min: lo - pad,
            y_max: hi + pad,
            width: self.width,
            height: self.height,
        };

        let mut img = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        let (left, right) = (i64::from(MARGIN), i64::from(self.width - MARGIN));
        let (top, bottom) = (i64::from(MARGIN), i64::from(self.height - MARGIN));

        for i in 0..=GRID_LINES {
            let y = top + (bottom - top) * i64::from(i) / i64::from(GRID_LINES);
            line(&mut img, (left, y), (right, y), GRID, false);
        }
        line(&mut img, (left, top), (left, bottom), AXIS, false);
        line(&mut img, (left, bottom), (right, bottom), AXIS, false);

        let actual_px: Vec<(i64, i64)> = actual.iter().map(|s| frame.project(s.month, s.capacity)).collect();
        polyline(&mut img, &actual_px, ACTUAL, false);

        let predicted_px: Vec<(i64, i64)> = predicted.iter().map(|p| frame.project(p.month, p.capacity)).collect();
        polyline(&mut img, &predicted_px, PREDICTED, true);

        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .with_context(|| format!("Failed to encode {} chart", model_label))?;

        tracing::debug!(bytes = png.len(), model = model_label, "chart rendered");
        Ok(Bytes::from(png))
    }
}
