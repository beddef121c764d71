use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb as Pixel, RgbImage};

use super::{oblique, ChartData, ChartKind, Series};
use crate::color::{self, ColorMap, Rgb};
use crate::config::RenderConfig;
use crate::error::{AnalysisError, Result};

/// A chart drawn to a PNG.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Turns chart data into a static image.
pub trait ChartRenderer {
    fn render(&self, chart: &ChartData) -> Result<RenderedImage>;
}

// ---------------------------------------------------------------------------
// Raster renderer
// ---------------------------------------------------------------------------

const MARGIN: u32 = 40;
const WHITE: Rgb = [255, 255, 255];
const BLACK: Rgb = [0, 0, 0];
const BLUE: Rgb = [31, 119, 180];

/// Draws charts on a white canvas with the `image` crate. No text is drawn;
/// titles travel as captions next to the image.
#[derive(Debug, Clone)]
pub struct RasterRenderer {
    width: u32,
    height: u32,
}

impl RasterRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            width: config.width.max(2 * MARGIN + 16),
            height: config.height.max(2 * MARGIN + 16),
        }
    }
}

impl Default for RasterRenderer {
    fn default() -> Self {
        Self::new(&RenderConfig::default())
    }
}

impl ChartRenderer for RasterRenderer {
    fn render(&self, chart: &ChartData) -> Result<RenderedImage> {
        if chart.series.is_empty() {
            return Err(AnalysisError::Render(format!(
                "'{}' has no data to draw",
                chart.title
            )));
        }

        let mut canvas = Canvas::new(self.width, self.height);
        canvas.axes();
        match &chart.series {
            Series::Histogram(bins) => {
                let counts: Vec<f64> = bins.iter().map(|b| b.count as f64).collect();
                canvas.bars(&counts, |_| BLUE);
            }
            Series::Categories(cats) => {
                let labels: Vec<&str> = cats.iter().map(|c| c.label.as_str()).collect();
                let colors = ColorMap::new(&labels);
                let counts: Vec<f64> = cats.iter().map(|c| c.count as f64).collect();
                canvas.bars(&counts, |i| colors.color_for(labels[i]));
            }
            Series::Points(points) => {
                let frame = Frame::fit(points.iter().map(|p| (p[0], p[1])))?;
                let pixels: Vec<(i64, i64)> =
                    points.iter().map(|p| canvas.project(&frame, p[0], p[1])).collect();
                if chart.kind == ChartKind::Line {
                    canvas.polyline(&pixels, BLUE);
                }
                for &(x, y) in &pixels {
                    canvas.dot(x, y, 2, BLUE);
                }
            }
            Series::Points3d(points) => {
                let z_range = Frame::fit(points.iter().map(|p| (p[2], p[2])))?;
                let flat: Vec<(f64, f64, Rgb)> = points
                    .iter()
                    .map(|p| {
                        let [x, y] = oblique(*p);
                        (x, y, color::gradient(z_range.unit_x(p[2])))
                    })
                    .collect();
                let frame = Frame::fit(flat.iter().map(|(x, y, _)| (*x, *y)))?;
                let pixels: Vec<(i64, i64, Rgb)> = flat
                    .iter()
                    .map(|(x, y, c)| {
                        let (px, py) = canvas.project(&frame, *x, *y);
                        (px, py, *c)
                    })
                    .collect();
                if chart.kind == ChartKind::Line3d {
                    let path: Vec<(i64, i64)> = pixels.iter().map(|(x, y, _)| (*x, *y)).collect();
                    canvas.polyline(&path, color::GRAY);
                }
                let radius = if chart.kind == ChartKind::Surface3d { 4 } else { 2 };
                for &(x, y, c) in &pixels {
                    canvas.dot(x, y, radius, c);
                }
            }
            Series::Boxes(boxes) => {
                let frame = Frame::fit(boxes.iter().flat_map(|b| {
                    let span = [b.lower_whisker, b.upper_whisker];
                    span.into_iter()
                        .chain(b.outliers.iter().copied())
                        .map(|v| (0.0, v))
                }))?;
                let colors = ColorMap::new(&boxes.iter().map(|b| b.label.as_str()).collect::<Vec<_>>());
                let slot = canvas.plot_width() / boxes.len() as f64;
                for (i, b) in boxes.iter().enumerate() {
                    let left = canvas.left() + (i as f64 + 0.2) * slot;
                    let right = canvas.left() + (i as f64 + 0.8) * slot;
                    let mid = (left + right) / 2.0;
                    let [q1, median, q3, low, high] =
                        [b.q1, b.median, b.q3, b.lower_whisker, b.upper_whisker]
                            .map(|v| canvas.project_y(&frame, v));
                    let outliers: Vec<i64> =
                        b.outliers.iter().map(|&o| canvas.project_y(&frame, o)).collect();
                    let (left, right, mid) = (left as i64, right as i64, mid as i64);
                    canvas.fill_rect(left, q3, right, q1, colors.color_for(&b.label));
                    canvas.line(left, median, right, median, BLACK);
                    canvas.line(mid, q3, mid, high, BLACK);
                    canvas.line(mid, q1, mid, low, BLACK);
                    for o in outliers {
                        canvas.dot(mid, o, 2, BLACK);
                    }
                }
            }
        }

        canvas.encode()
    }
}

// ---------------------------------------------------------------------------
// Drawing helpers
// ---------------------------------------------------------------------------

/// Data-space bounds.
struct Frame {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
}

impl Frame {
    fn fit(points: impl Iterator<Item = (f64, f64)>) -> Result<Self> {
        let mut f = Frame {
            x0: f64::INFINITY,
            x1: f64::NEG_INFINITY,
            y0: f64::INFINITY,
            y1: f64::NEG_INFINITY,
        };
        for (x, y) in points {
            f.x0 = f.x0.min(x);
            f.x1 = f.x1.max(x);
            f.y0 = f.y0.min(y);
            f.y1 = f.y1.max(y);
        }
        if !(f.x0.is_finite() && f.x1.is_finite() && f.y0.is_finite() && f.y1.is_finite()) {
            return Err(AnalysisError::Render("data range is not finite".into()));
        }
        if f.x0 == f.x1 {
            f.x0 -= 0.5;
            f.x1 += 0.5;
        }
        if f.y0 == f.y1 {
            f.y0 -= 0.5;
            f.y1 += 0.5;
        }
        Ok(f)
    }

    fn unit_x(&self, x: f64) -> f64 {
        (x - self.x0) / (self.x1 - self.x0)
    }

    fn unit_y(&self, y: f64) -> f64 {
        (y - self.y0) / (self.y1 - self.y0)
    }
}

struct Canvas {
    img: RgbImage,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            img: RgbImage::from_pixel(width, height, Pixel(WHITE)),
        }
    }

    fn left(&self) -> f64 {
        MARGIN as f64
    }

    fn bottom(&self) -> f64 {
        (self.img.height() - MARGIN) as f64
    }

    fn plot_width(&self) -> f64 {
        (self.img.width() - 2 * MARGIN) as f64
    }

    fn plot_height(&self) -> f64 {
        (self.img.height() - 2 * MARGIN) as f64
    }

    fn project(&self, frame: &Frame, x: f64, y: f64) -> (i64, i64) {
        let px = self.left() + frame.unit_x(x) * self.plot_width();
        (px.round() as i64, self.project_y(frame, y))
    }

    fn project_y(&self, frame: &Frame, y: f64) -> i64 {
        (self.bottom() - frame.unit_y(y) * self.plot_height()).round() as i64
    }

    fn put(&mut self, x: i64, y: i64, c: Rgb) {
        if x >= 0 && y >= 0 && (x as u32) < self.img.width() && (y as u32) < self.img.height() {
            self.img.put_pixel(x as u32, y as u32, Pixel(c));
        }
    }

    fn axes(&mut self) {
        let (l, b) = (self.left() as i64, self.bottom() as i64);
        let r = l + self.plot_width() as i64;
        let t = b - self.plot_height() as i64;
        self.line(l, b, r, b, BLACK);
        self.line(l, b, l, t, BLACK);
    }

    /// Bresenham.
    fn line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, c: Rgb) {
        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.put(x, y, c);
            if x == x1 && y == y1 {
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
        }
    }

    fn polyline(&mut self, points: &[(i64, i64)], c: Rgb) {
        for pair in points.windows(2) {
            self.line(pair[0].0, pair[0].1, pair[1].0, pair[1].1, c);
        }
    }

    fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, c: Rgb) {
        for y in y0.min(y1)..=y0.max(y1) {
            for x in x0.min(x1)..=x0.max(x1) {
                self.put(x, y, c);
            }
        }
    }

    fn dot(&mut self, x: i64, y: i64, radius: i64, c: Rgb) {
        self.fill_rect(x - radius, y - radius, x + radius, y + radius, c);
    }

    /// Evenly spaced bars from the x axis, scaled to the tallest.
    fn bars(&mut self, heights: &[f64], color_of: impl Fn(usize) -> Rgb) {
        let tallest = heights.iter().copied().fold(0.0, f64::max).max(1.0);
        let slot = self.plot_width() / heights.len() as f64;
        let bottom = self.bottom() as i64;
        for (i, h) in heights.iter().enumerate() {
            let left = self.left() + i as f64 * slot + 1.0;
            let right = self.left() + (i + 1) as f64 * slot - 1.0;
            let top = self.bottom() - h / tallest * self.plot_height();
            if *h > 0.0 {
                self.fill_rect(left as i64, top as i64, right as i64, bottom - 1, color_of(i));
            }
        }
    }

    fn encode(self) -> Result<RenderedImage> {
        let (width, height) = self.img.dimensions();
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(self.img)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| AnalysisError::Render(e.to_string()))?;
        Ok(RenderedImage { width, height, png })
    }
}
