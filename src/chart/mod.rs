//! Chart data derivation and rasterisation.
//!
//! [`builder::build`] turns a [`ChartRequest`] into kind-tagged [`ChartData`]
//! that any rendering layer can consume; [`render::RasterRenderer`] draws that
//! data into a PNG for reports.

pub mod builder;
pub mod render;

use std::fmt;

use serde::Serialize;

use crate::data::Table;
use crate::error::Result;

pub use builder::{build, build_all};
pub use render::{ChartRenderer, RasterRenderer, RenderedImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Scatter,
    Line,
    Bar,
    Histogram,
    Box,
    Scatter3d,
    Line3d,
    Surface3d,
}

impl ChartKind {
    pub const ALL: [ChartKind; 8] = [
        ChartKind::Scatter,
        ChartKind::Line,
        ChartKind::Bar,
        ChartKind::Histogram,
        ChartKind::Box,
        ChartKind::Scatter3d,
        ChartKind::Line3d,
        ChartKind::Surface3d,
    ];

    pub fn is_3d(self) -> bool {
        matches!(
            self,
            ChartKind::Scatter3d | ChartKind::Line3d | ChartKind::Surface3d
        )
    }

    pub fn needs_y(self) -> bool {
        matches!(self, ChartKind::Scatter | ChartKind::Line) || self.is_3d()
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Scatter => "Scatter",
            ChartKind::Line => "Line",
            ChartKind::Bar => "Bar",
            ChartKind::Histogram => "Histogram",
            ChartKind::Box => "Box",
            ChartKind::Scatter3d => "3D Scatter",
            ChartKind::Line3d => "3D Line",
            ChartKind::Surface3d => "3D Surface",
        };
        write!(f, "{name}")
    }
}

/// A chart kind plus up to three axis column references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub x: Option<String>,
    pub y: Option<String>,
    pub z: Option<String>,
    /// Histogram bin override.
    pub bins: Option<usize>,
}

impl ChartRequest {
    pub fn new(kind: ChartKind, x: impl Into<String>) -> Self {
        Self {
            kind,
            x: Some(x.into()),
            y: None,
            z: None,
            bins: None,
        }
    }

    pub fn with_y(mut self, y: impl Into<String>) -> Self {
        self.y = Some(y.into());
        self
    }

    pub fn with_z(mut self, z: impl Into<String>) -> Self {
        self.z = Some(z.into());
        self
    }

    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = Some(bins);
        self
    }

    /// Histogram for a numeric column, bar chart of counts otherwise.
    pub fn auto(table: &Table, column: &str) -> Result<Self> {
        let kind = if table.require(column)?.is_numeric() {
            ChartKind::Histogram
        } else {
            ChartKind::Bar
        };
        Ok(Self::new(kind, column))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub label: String,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Series {
    Histogram(Vec<HistogramBin>),
    Categories(Vec<CategoryCount>),
    Points(Vec<[f64; 2]>),
    Points3d(Vec<[f64; 3]>),
    Boxes(Vec<BoxSummary>),
}

impl Series {
    pub fn is_empty(&self) -> bool {
        match self {
            Series::Histogram(v) => v.is_empty(),
            Series::Categories(v) => v.is_empty(),
            Series::Points(v) => v.is_empty(),
            Series::Points3d(v) => v.is_empty(),
            Series::Boxes(v) => v.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: Option<String>,
    pub z_label: Option<String>,
    pub series: Series,
}

/// Oblique projection of a 3-D point onto the page: y recedes up and to the
/// right.
pub fn oblique(p: [f64; 3]) -> [f64; 2] {
    [p[0] + 0.5 * p[1], p[2] + 0.3 * p[1]]
}
