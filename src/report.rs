use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::chart::{ChartData, ChartRenderer, RenderedImage};
use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ReportMetadata {
    pub title: String,
    pub author: String,
    /// Shown verbatim on the cover page.
    pub date: String,
    pub abstract_text: String,
}

impl Default for ReportMetadata {
    fn default() -> Self {
        Self {
            title: "Excel Data Analysis Report".to_string(),
            author: "Author Name".to_string(),
            date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            abstract_text: "This report contains the analysis of Excel data.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Cover(ReportMetadata),
    Chart {
        caption: String,
        image: RenderedImage,
    },
}

/// A chart that could not be rendered and was left out.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedChart {
    pub index: usize,
    pub title: String,
    pub error: AnalysisError,
}

/// Cover page followed by one page per rendered chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub pages: Vec<Page>,
    pub skipped: Vec<SkippedChart>,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Build the report. A chart that fails to render is logged and skipped; the
/// document is produced regardless.
pub fn export(charts: &[ChartData], metadata: &ReportMetadata, renderer: &dyn ChartRenderer) -> Document {
    let mut pages = vec![Page::Cover(metadata.clone())];
    let mut skipped = Vec::new();

    for (idx, chart) in charts.iter().enumerate() {
        match renderer.render(chart) {
            Ok(image) => pages.push(Page::Chart {
                caption: format!("Chart {}: {}", idx + 1, chart.title),
                image,
            }),
            Err(error) => {
                log::error!("Skipping chart {} ('{}'): {error}", idx + 1, chart.title);
                skipped.push(SkippedChart {
                    index: idx,
                    title: chart.title.clone(),
                    error,
                });
            }
        }
    }

    log::info!(
        "Assembled report with {} pages ({} charts skipped)",
        pages.len(),
        skipped.len()
    );
    Document { pages, skipped }
}

impl Document {
    pub fn chart_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p, Page::Chart { .. }))
            .count()
    }

    /// Printable HTML, one page per section, referencing `chart-NN.png` files.
    pub fn to_html(&self) -> String {
        let mut html = String::from(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n\
             .page { page-break-after: always; padding: 1in; font-family: sans-serif; }\n\
             .page img { max-width: 100%; }\n\
             </style>\n</head>\n<body>\n",
        );
        let mut chart_no = 0;
        for page in &self.pages {
            match page {
                Page::Cover(meta) => {
                    let _ = write!(
                        html,
                        "<section class=\"page\">\n<h1>{}</h1>\n<p>Date: {}</p>\n<p>Author: {}</p>\n<p>{}</p>\n</section>\n",
                        escape(&meta.title),
                        escape(&meta.date),
                        escape(&meta.author),
                        escape(&meta.abstract_text),
                    );
                }
                Page::Chart { caption, .. } => {
                    chart_no += 1;
                    let _ = write!(
                        html,
                        "<section class=\"page\">\n<h2>{}</h2>\n<img src=\"{}\">\n</section>\n",
                        escape(caption),
                        chart_file_name(chart_no),
                    );
                }
            }
        }
        html.push_str("</body>\n</html>\n");
        html
    }

    /// Write `report.html` and one PNG per chart into `dir`.
    pub fn save(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let images = self.pages.iter().filter_map(|p| match p {
            Page::Chart { image, .. } => Some(image),
            Page::Cover(_) => None,
        });
        for (i, image) in images.enumerate() {
            let path = dir.join(chart_file_name(i + 1));
            std::fs::write(&path, &image.png).with_context(|| format!("writing {}", path.display()))?;
        }
        let index = dir.join("report.html");
        std::fs::write(&index, self.to_html())
            .with_context(|| format!("writing {}", index.display()))?;
        log::info!("Saved report to {}", index.display());
        Ok(index)
    }
}

fn chart_file_name(n: usize) -> String {
    format!("chart-{n:02}.png")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
