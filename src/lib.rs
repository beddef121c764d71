//! Spreadsheet analysis core: load a table, describe it, chart it, and fit a
//! regression model on it.
//!
//! ```text
//!  data::loader ──► stats      (describe / correlate)
//!        │     ├──► chart      (ChartRequest → ChartData → PNG)
//!        │     └──► training   (split → standardize → fit → score)
//!        ▼
//!     report  (cover page + one page per chart)
//! ```

pub mod chart;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod i18n;
pub mod report;
pub mod stats;
pub mod training;

pub use error::{AnalysisError, Result};
