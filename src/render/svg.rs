use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{debug, info};
use plotters::coord::Shift;
use plotters::prelude::*;
use tempfile::TempDir;

use super::{
    decimate, ClockTrack, FileArtifact, Figure, Panel, RenderError, RenderHandle, RenderOutput,
    Renderer,
};
use crate::config::DEFAULT_MAX_POINTS;

/// Pixel size of one panel
pub const DEFAULT_PANEL_SIZE: (u32, u32) = (900, 380);

const TITLE_HEIGHT: u32 = 40;

const PALETTE: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(214, 39, 40),
    RGBColor(44, 160, 44),
    RGBColor(255, 127, 14),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(23, 190, 207),
];

/// Renders figures to SVG files with plotters.
///
/// Batch renders go to the output directory. Interactive renders go to a
/// scratch directory owned by the renderer, created on first use and removed
/// when the renderer is dropped.
pub struct SvgRenderer {
    output_dir: PathBuf,
    max_points: usize,
    panel_size: (u32, u32),
    scratch: Option<TempDir>,
}

impl SvgRenderer {
    /// Create a renderer writing batch output to `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_points: DEFAULT_MAX_POINTS,
            panel_size: DEFAULT_PANEL_SIZE,
            scratch: None,
        }
    }

    /// Limit the points drawn per series
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    /// Set the pixel size of one panel
    pub fn with_panel_size(mut self, width: u32, height: u32) -> Self {
        self.panel_size = (width, height);
        self
    }

    /// Scratch directory of interactive renders, once created
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(|dir| dir.path())
    }

    fn target_dir(&mut self, interactive: bool) -> Result<PathBuf, RenderError> {
        if !interactive {
            std::fs::create_dir_all(&self.output_dir).map_err(|source| RenderError::Io {
                path: self.output_dir.clone(),
                source,
            })?;
            return Ok(self.output_dir.clone());
        }
        if let Some(dir) = &self.scratch {
            return Ok(dir.path().to_path_buf());
        }
        let dir = tempfile::Builder::new()
            .prefix("raftscope-")
            .tempdir()
            .map_err(|source| RenderError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
        debug!("Interactive scratch directory {}", dir.path().display());
        let path = dir.path().to_path_buf();
        self.scratch = Some(dir);
        Ok(path)
    }
}

impl Renderer for SvgRenderer {
    fn plot(&mut self, figure: &Figure, interactive: bool) -> Result<RenderOutput, RenderError> {
        if figure.panels.is_empty() {
            return Err(RenderError::EmptyFigure(figure.name.clone()));
        }
        let dir = self.target_dir(interactive)?;
        let path = dir.join(figure.file_name());
        let rows = figure.grid.0.max(1);
        let cols = figure.grid.1.max(1);
        let size = (
            self.panel_size.0 * cols as u32,
            self.panel_size.1 * rows as u32 + TITLE_HEIGHT,
        );

        {
            let root = SVGBackend::new(&path, size).into_drawing_area();
            draw_figure(&root, figure, (rows, cols), self.max_points).map_err(|e| {
                RenderError::Backend {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        info!("Rendered '{}' to {}", figure.title, path.display());

        let title = figure.title.clone();
        Ok(if interactive {
            RenderOutput::Displayed(RenderHandle { title, path })
        } else {
            RenderOutput::File(FileArtifact { title, path })
        })
    }
}

type PanelResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &Figure,
    grid: (usize, usize),
    max_points: usize,
) -> PanelResult<DB> {
    root.fill(&WHITE)?;
    let body = root.titled(&figure.title, ("sans-serif", 24))?;
    let areas = body.split_evenly(grid);
    for (area, panel) in areas.iter().zip(&figure.panels) {
        draw_panel(area, panel, max_points)?;
    }
    root.present()?;
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    max_points: usize,
) -> PanelResult<DB> {
    if panel.is_blank() {
        area.draw(&Text::new(panel.title.clone(), (24, 24), ("sans-serif", 16)))?;
        return Ok(());
    }

    let series: Vec<(&str, Vec<(f64, f64)>)> = panel
        .series
        .iter()
        .map(|s| (s.label.as_str(), finite(&decimate(&s.points, max_points))))
        .collect();
    let x_range = padded(extent(series.iter().flat_map(|(_, p)| p.iter().map(|p| p.0))), 0.0);
    let y_range = padded(extent(series.iter().flat_map(|(_, p)| p.iter().map(|p| p.1))), 0.05);

    let (trace_area, clock) = match &panel.clock_track {
        Some(track) if !track.lines.is_empty() => {
            let (_, height) = area.dim_in_pixel();
            let (top, bottom) = area.split_vertically(height as i32 * 7 / 10);
            (top, Some((bottom, track)))
        }
        _ => (area.clone(), None),
    };

    let mut chart = ChartBuilder::on(&trace_area)
        .caption(&panel.title, ("sans-serif", 16))
        .margin(8)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), y_range)?;
    chart
        .configure_mesh()
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .draw()?;

    for (i, (label, points)) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(1)))?
            .label(*label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    if let Some((clock_area, track)) = clock {
        draw_clock_track(&clock_area, track, x_range, &panel.x_label, max_points)?;
    }
    Ok(())
}

fn draw_clock_track<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    track: &ClockTrack,
    x_range: Range<f64>,
    x_label: &str,
    max_points: usize,
) -> PanelResult<DB> {
    let lines = track.lines.len();
    let x_start = x_range.start;
    let mut chart = ChartBuilder::on(area)
        .margin(8)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, 0f64..(lines as f64 * 1.5))?;
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(0)
        .x_desc(x_label)
        .draw()?;

    for (i, line) in track.lines.iter().enumerate() {
        let offset = (lines - 1 - i) as f64 * 1.5 + 0.2;
        let color = PALETTE[(i + 3) % PALETTE.len()];
        let points = decimate(&line.points, max_points);
        chart.draw_series(LineSeries::new(
            points.iter().map(|&(x, level)| (x, offset + level)),
            color.stroke_width(1),
        ))?;
        chart.draw_series(std::iter::once(Text::new(
            line.name.clone(),
            (x_start, offset + 1.1),
            ("sans-serif", 11),
        )))?;
    }
    Ok(())
}

fn finite(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    points
        .iter()
        .copied()
        .filter(|p| p.0.is_finite() && p.1.is_finite())
        .collect()
}

fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn padded(extent: Option<(f64, f64)>, margin: f64) -> Range<f64> {
    match extent {
        None => 0.0..1.0,
        Some((lo, hi)) if lo == hi => (lo - 0.5)..(hi + 0.5),
        Some((lo, hi)) => {
            let pad = (hi - lo) * margin;
            (lo - pad)..(hi + pad)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Series;
    use tempfile::tempdir;

    fn figure() -> Figure {
        let x: Vec<f64> = (0..500).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| (v / 20.0).sin()).collect();
        Figure::grid(
            "00_c3",
            "CCD 00 channel 3",
            (1, 2),
            vec![
                Panel::new("c3").with_series(Series::from_xy("first", &x, &y)),
                Panel::new("11 (missing)"),
            ],
        )
    }

    #[test]
    fn test_batch_render_writes_svg() {
        let dir = tempdir().unwrap();
        let mut renderer = SvgRenderer::new(dir.path().join("plots")).with_max_points(100);

        let output = renderer.plot(&figure(), false).unwrap();
        assert!(matches!(output, RenderOutput::File(_)));
        assert_eq!(output.path(), dir.path().join("plots").join("00_c3.svg"));

        let svg = std::fs::read_to_string(output.path()).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("CCD 00 channel 3"));
        assert!(renderer.scratch_dir().is_none());
    }

    #[test]
    fn test_interactive_render_uses_scratch_dir() {
        let dir = tempdir().unwrap();
        let mut renderer = SvgRenderer::new(dir.path());

        let output = renderer.plot(&figure(), true).unwrap();
        let scratch = renderer.scratch_dir().unwrap().to_path_buf();
        assert!(matches!(output, RenderOutput::Displayed(_)));
        assert!(output.path().starts_with(&scratch));
        assert!(output.path().exists());

        drop(renderer);
        assert!(!scratch.exists());
    }

    #[test]
    fn test_empty_figure_rejected() {
        let mut renderer = SvgRenderer::new(".");
        let figure = Figure::stacked("nothing", "nothing", Vec::new());
        assert!(matches!(
            renderer.plot(&figure, false),
            Err(RenderError::EmptyFigure(_))
        ));
    }

    #[test]
    fn test_padded_ranges() {
        assert_eq!(padded(None, 0.1), 0.0..1.0);
        assert_eq!(padded(Some((2.0, 2.0)), 0.1), 1.5..2.5);
        assert_eq!(padded(Some((0.0, 10.0)), 0.1), -1.0..11.0);
    }
}
