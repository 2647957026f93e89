//! # Rendering
//!
//! The orchestrator describes what to draw as a backend-independent [`Figure`]
//! and hands it to a [`Renderer`]. [`SvgRenderer`] draws with plotters;
//! [`MemoryRenderer`] keeps figures in memory for tests and dry runs.

mod decimate;
mod memory;
mod svg;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::axis::TimeAxis;

pub use decimate::decimate;
pub use memory::MemoryRenderer;
pub use svg::SvgRenderer;

/// Errors raised while rendering a figure.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Output file or scratch directory could not be created
    #[error("I/O error writing {}: {source}", .path.display())]
    Io {
        /// Target path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Drawing backend failure
    #[error("failed to draw {}: {reason}", .path.display())]
    Backend {
        /// Target path
        path: PathBuf,
        /// Backend message
        reason: String,
    },

    /// Figure without panels
    #[error("figure '{0}' has no panels")]
    EmptyFigure(String),
}

/// One line of a panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    /// Legend label
    pub label: String,
    /// `(x, y)` points in x order
    pub points: Vec<(f64, f64)>,
}

impl Series {
    /// Build a series from parallel x and y slices.
    pub fn from_xy(label: impl Into<String>, x: &[f64], y: &[f64]) -> Self {
        Self {
            label: label.into(),
            points: x.iter().copied().zip(y.iter().copied()).collect(),
        }
    }
}

/// Logic level of one clock line over the plotted range, as a step function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockLine {
    /// Clock line name
    pub name: String,
    /// Step corners `(x, level)`
    pub points: Vec<(f64, f64)>,
}

/// Clock levels drawn under the traces as an annotation track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockTrack {
    /// Lines from top to bottom
    pub lines: Vec<ClockLine>,
}

impl ClockTrack {
    /// Clock levels of a sequence-backed axis. `None` for a sample-index axis
    /// or a program that drives no clocks.
    pub fn from_axis(axis: &TimeAxis) -> Option<Self> {
        let program = axis.program()?;
        if program.clocks.is_empty() {
            return None;
        }
        let spans = axis.phase_spans();
        let lines = program
            .clocks
            .iter()
            .map(|clock| {
                let mut points = Vec::with_capacity(spans.len() * 2);
                for span in &spans {
                    let level = program.intervals[span.interval]
                        .level(clock)
                        .unwrap_or(0) as f64;
                    points.push((axis.position(span.start), level));
                    points.push((axis.position(span.end), level));
                }
                ClockLine {
                    name: clock.clone(),
                    points,
                }
            })
            .collect();
        Some(Self { lines })
    }
}

/// One chart of a figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    /// Chart caption
    pub title: String,
    /// X axis description
    pub x_label: String,
    /// Y axis description
    pub y_label: String,
    /// Overlaid series, drawn in order
    pub series: Vec<Series>,
    /// Optional clock annotation track
    pub clock_track: Option<ClockTrack>,
}

impl Panel {
    /// Empty panel with a caption
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_label: "sample".to_string(),
            y_label: "ADU".to_string(),
            series: Vec::new(),
            clock_track: None,
        }
    }

    /// Set the x axis description
    pub fn with_x_label(mut self, label: impl Into<String>) -> Self {
        self.x_label = label.into();
        self
    }

    /// Add a series
    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    /// Whether nothing is drawn in the panel
    pub fn is_blank(&self) -> bool {
        self.series.is_empty()
    }
}

/// A rendered unit: a grid of panels written as one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    /// File stem of the output
    pub name: String,
    /// Figure title
    pub title: String,
    /// Panel grid as (rows, columns)
    pub grid: (usize, usize),
    /// Panels in row-major order
    pub panels: Vec<Panel>,
}

impl Figure {
    /// Figure with one panel per row.
    pub fn stacked(name: impl Into<String>, title: impl Into<String>, panels: Vec<Panel>) -> Self {
        let rows = panels.len().max(1);
        Self {
            name: name.into(),
            title: title.into(),
            grid: (rows, 1),
            panels,
        }
    }

    /// Figure with panels laid out on a fixed grid.
    pub fn grid(
        name: impl Into<String>,
        title: impl Into<String>,
        grid: (usize, usize),
        panels: Vec<Panel>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            grid,
            panels,
        }
    }

    /// Output file name for this figure.
    pub fn file_name(&self) -> String {
        let stem: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || "-_.".contains(c) { c } else { '_' })
            .collect();
        format!("{}.svg", stem)
    }
}

/// A figure written for interactive viewing in the session scratch directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderHandle {
    /// Figure title
    pub title: String,
    /// Scratch file
    pub path: PathBuf,
}

/// A figure written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileArtifact {
    /// Figure title
    pub title: String,
    /// Output file
    pub path: PathBuf,
}

/// Result of rendering one figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RenderOutput {
    /// Displayed interactively
    Displayed(RenderHandle),
    /// Written to a file (batch mode)
    File(FileArtifact),
}

impl RenderOutput {
    /// Path of the rendered file
    pub fn path(&self) -> &Path {
        match self {
            RenderOutput::Displayed(handle) => &handle.path,
            RenderOutput::File(artifact) => &artifact.path,
        }
    }

    /// Figure title
    pub fn title(&self) -> &str {
        match self {
            RenderOutput::Displayed(handle) => &handle.title,
            RenderOutput::File(artifact) => &artifact.title,
        }
    }
}

/// A figure rendering backend.
pub trait Renderer {
    /// Render one figure, interactively or to a file.
    fn plot(&mut self, figure: &Figure, interactive: bool) -> Result<RenderOutput, RenderError>;
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn plot(&mut self, figure: &Figure, interactive: bool) -> Result<RenderOutput, RenderError> {
        (**self).plot(figure, interactive)
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn plot(&mut self, figure: &Figure, interactive: bool) -> Result<RenderOutput, RenderError> {
        (**self).plot(figure, interactive)
    }
}
