//! # Display Orchestrator
//!
//! Runs [`DisplayRequest`]s against a [`ScopeConfig`] and a [`Renderer`].
//! Every request goes through the same pipeline:
//!
//! 1. resolve source paths against the data directory
//! 2. sniff container formats (a comparison never mixes formats)
//! 3. extract the selected channels
//! 4. build time axes from the sequence file, when one is configured
//! 5. align the traces onto a common extent
//! 6. render one or more figures
//!
//! There is no retry; the first error aborts the request. The exception is a
//! grid request, where a missing or unreadable raft position is skipped and
//! reported in the [`DisplayReport`].
//!
//! ```rust,no_run
//! use raftscope::config::ScopeConfig;
//! use raftscope::display::{DisplayRequest, GridOutput, ScopeSession};
//! use raftscope::layout::ChannelSelection;
//! use raftscope::render::SvgRenderer;
//!
//! let config = ScopeConfig::new("/data/RTM1new_mod50").with_output_dir("plots");
//! let renderer = SvgRenderer::new(&config.output_dir);
//! let mut session = ScopeSession::new(config, renderer);
//!
//! let report = session.run(&DisplayRequest::Grid {
//!     pattern: "00_RTM1new_mod50_1s-scan.fits".to_string(),
//!     output: GridOutput::Mosaic,
//!     channels: ChannelSelection::all(),
//! })?;
//! for skip in &report.skipped {
//!     println!("skipped {}: {}", skip.ccd, skip.reason);
//! }
//! # Ok::<(), raftscope::display::DisplayError>(())
//! ```

mod error;
mod figures;
mod report;
mod request;


use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

pub use error::DisplayError;
pub use report::{DisplayReport, SkippedPosition};
pub use request::{expand_pattern, DisplayRequest, GridOutput, RequestFile, CCD_PLACEHOLDER};

use crate::align::{align, AlignOptions, AlignedTraceSet, AxisBasis};
use crate::config::ScopeConfig;
use crate::container::ContainerError;
use crate::extract::{extract, extract_channels, probe_formats};
use crate::layout::{CcdPosition, ChannelSelection, RAFT_COLUMNS, RAFT_ROWS};
use crate::render::{Figure, Renderer};
use crate::sequence::{SequenceCache, SequenceProgram};
use crate::trace::ChannelTrace;

/// A display session: configuration, render backend, and parsed-sequence cache.
pub struct ScopeSession<R: Renderer> {
    config: ScopeConfig,
    renderer: R,
    sequences: SequenceCache,
}

impl<R: Renderer> ScopeSession<R> {
    /// Create a session
    pub fn new(config: ScopeConfig, renderer: R) -> Self {
        Self {
            config,
            renderer,
            sequences: SequenceCache::new(),
        }
    }

    /// Session configuration
    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    /// Render backend
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Consume the session, returning the render backend
    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Run one display request.
    pub fn run(&mut self, request: &DisplayRequest) -> Result<DisplayReport, DisplayError> {
        info!("Running {}", request);
        let report = match request {
            DisplayRequest::Combined {
                first,
                second,
                channels,
                ccd,
                sequence,
            } => self.run_combined(first, second, *channels, *ccd, sequence.as_deref())?,
            DisplayRequest::Scan { source, channels } => self.run_scan(source, *channels)?,
            DisplayRequest::Grid {
                pattern,
                output,
                channels,
            } => self.run_grid(pattern, *output, *channels)?,
            DisplayRequest::Multi {
                sources,
                labels,
                sequences,
                channels,
            } => self.run_multi(sources, labels, sequences, *channels)?,
        };
        info!(
            "{}: {} figure(s), {} skipped, {} warning(s)",
            request.mode(),
            report.outputs.len(),
            report.skipped.len(),
            report.warnings.len()
        );
        Ok(report)
    }

    fn options(&self) -> AlignOptions {
        AlignOptions::with_normalization(self.config.normalization)
    }

    /// Parse (or fetch from cache) a sequence file, falling back to the session's.
    fn program(
        &mut self,
        override_path: Option<&Path>,
    ) -> Result<Option<Arc<SequenceProgram>>, DisplayError> {
        let path = match (override_path, &self.config.sequence_file) {
            (Some(path), _) => path.to_path_buf(),
            (None, Some(path)) => path.clone(),
            (None, None) => return Ok(None),
        };
        self.load_program(&path).map(Some)
    }

    fn load_program(&mut self, path: &Path) -> Result<Arc<SequenceProgram>, DisplayError> {
        let path = self.config.resolve(path);
        let function = self.config.sequence_function.as_deref();
        Ok(self.sequences.get_or_parse(&path, function)?)
    }

    fn shared_basis(program: &Option<Arc<SequenceProgram>>) -> AxisBasis {
        match program {
            Some(program) => AxisBasis::SharedSequence(Arc::clone(program)),
            None => AxisBasis::SampleIndex,
        }
    }

    fn render(&mut self, figure: &Figure, report: &mut DisplayReport) -> Result<(), DisplayError> {
        let output = self.renderer.plot(figure, self.config.interactive)?;
        report.outputs.push(output);
        Ok(())
    }

    fn run_combined(
        &mut self,
        first: &Path,
        second: &Path,
        channels: ChannelSelection,
        ccd: Option<CcdPosition>,
        sequence: Option<&Path>,
    ) -> Result<DisplayReport, DisplayError> {
        let paths = [self.config.resolve(first), self.config.resolve(second)];
        probe_formats(&paths)?;
        let program = self.program(sequence)?;
        let normalization = self.config.normalization;

        let mut report = DisplayReport::default();
        for channel in channels.channels() {
            let mut traces = Vec::with_capacity(paths.len());
            for path in &paths {
                let trace = extract(path, channel)?;
                traces.push(match ccd {
                    Some(ccd) => trace.with_ccd(ccd),
                    None => trace,
                });
            }
            let title = match traces[0].ccd {
                Some(ccd) => format!("CCD {} channel {}", ccd, channel),
                None => format!("channel {}", channel),
            };
            let name = format!("combined_{}_c{:02}", figures::slug(&file_stem(&paths[0])), channel);
            let set = align(traces, Self::shared_basis(&program), &self.options())?;

            let panel = figures::source_panel(title.clone(), &set, normalization, true);
            let figure = Figure::stacked(name, title, vec![panel]);
            self.render(&figure, &mut report)?;
            report.warnings.extend(set.warnings);
        }
        Ok(report)
    }

    fn run_scan(
        &mut self,
        source: &Path,
        channels: ChannelSelection,
    ) -> Result<DisplayReport, DisplayError> {
        let path = self.config.resolve(source);
        let program = self.program(None)?;
        let traces = extract_channels(&path, &channels.channels())?;
        let set = align(traces, Self::shared_basis(&program), &self.options())?;

        let stem = file_stem(&path);
        let panel = figures::channel_panel(stem.clone(), &set, self.config.normalization);
        let figure = Figure::stacked(format!("scan_{}", stem), format!("Scan {}", stem), vec![panel]);

        let mut report = DisplayReport::default();
        self.render(&figure, &mut report)?;
        report.warnings.extend(set.warnings);
        Ok(report)
    }

    fn run_grid(
        &mut self,
        pattern: &str,
        output: GridOutput,
        channels: ChannelSelection,
    ) -> Result<DisplayReport, DisplayError> {
        let mut expanded = Vec::new();
        for ccd in CcdPosition::all() {
            expanded.push((ccd, self.config.resolve(&expand_pattern(pattern, ccd)?)));
        }
        let program = self.program(None)?;
        let channel_list = channels.channels();

        let mut report = DisplayReport::default();
        let mut sets: Vec<(CcdPosition, AlignedTraceSet)> = Vec::new();
        for (ccd, path) in expanded {
            let traces = match grid_position(&path, &channel_list) {
                Ok(traces) => traces,
                Err(reason) => {
                    warn!("Skipping CCD {} ({}): {}", ccd, path.display(), reason);
                    report.skipped.push(SkippedPosition { ccd, path, reason });
                    continue;
                }
            };
            let traces = traces.into_iter().map(|t| t.with_ccd(ccd)).collect();
            let set = align(traces, Self::shared_basis(&program), &self.options())?;
            debug!("CCD {}: {} channels aligned", ccd, set.len());
            sets.push((ccd, set));
        }

        if sets.is_empty() {
            return Err(DisplayError::NothingToRender {
                pattern: pattern.to_string(),
            });
        }

        let stem = grid_stem(pattern);
        let normalization = self.config.normalization;
        match output {
            GridOutput::PerCcd => {
                for (ccd, set) in &sets {
                    let panel = figures::channel_panel(format!("CCD {}", ccd), set, normalization);
                    let figure = Figure::stacked(
                        format!("raft_{}_{}", ccd, figures::slug(&stem)),
                        format!("CCD {}: {}", ccd, stem),
                        vec![panel],
                    );
                    self.render(&figure, &mut report)?;
                }
            }
            GridOutput::Mosaic => {
                check_mosaic_formats(&sets)?;
                let present = sets
                    .iter()
                    .map(|(ccd, set)| {
                        (*ccd, figures::channel_panel(format!("CCD {}", ccd), set, normalization))
                    })
                    .collect();
                let figure = Figure::grid(
                    format!("raft_mosaic_{}", figures::slug(&stem)),
                    format!("Raft: {}", stem),
                    (usize::from(RAFT_ROWS), usize::from(RAFT_COLUMNS)),
                    figures::mosaic_panels(present),
                );
                self.render(&figure, &mut report)?;
            }
        }
        for (_, set) in sets {
            report.warnings.extend(set.warnings);
        }
        Ok(report)
    }

    fn run_multi(
        &mut self,
        sources: &[PathBuf],
        labels: &[String],
        sequences: &[PathBuf],
        channels: ChannelSelection,
    ) -> Result<DisplayReport, DisplayError> {
        if labels.len() != sources.len() {
            return Err(DisplayError::LabelCountMismatch {
                sources: sources.len(),
                labels: labels.len(),
            });
        }
        if sources.is_empty() {
            return Err(DisplayError::InvalidRequest(
                "multi request without sources".to_string(),
            ));
        }
        if sequences.len() > 1 && sequences.len() != sources.len() {
            return Err(DisplayError::InvalidRequest(format!(
                "{} sequence files for {} sources: give none, one, or one per source",
                sequences.len(),
                sources.len()
            )));
        }

        let paths: Vec<PathBuf> = sources.iter().map(|s| self.config.resolve(s)).collect();
        probe_formats(&paths)?;

        let basis = match sequences {
            [] | [_] => {
                let program = self.program(sequences.first().map(PathBuf::as_path))?;
                Self::shared_basis(&program)
            }
            many => {
                let mut programs = Vec::with_capacity(many.len());
                for path in many {
                    programs.push(self.load_program(path)?);
                }
                AxisBasis::PerTraceSequence(programs)
            }
        };

        let normalization = self.config.normalization;
        let mut panels = Vec::new();
        let mut warnings = Vec::new();
        for channel in channels.channels() {
            let mut traces = Vec::with_capacity(paths.len());
            for (path, label) in paths.iter().zip(labels) {
                traces.push(extract(path, channel)?.with_label(label.as_str()));
            }
            let set = align(traces, basis.clone(), &self.options())?;
            panels.push(figures::source_panel(
                format!("channel {}", channel),
                &set,
                normalization,
                false,
            ));
            warnings.extend(set.warnings);
        }

        let figure = Figure::stacked(
            format!("compare_{}", figures::slug(&labels.join("_"))),
            format!("Compare {}", labels.join(" / ")),
            panels,
        );
        let mut report = DisplayReport::default();
        self.render(&figure, &mut report)?;
        report.warnings = warnings;
        Ok(report)
    }
}

/// Extract the channels of one grid position, or say why it is skipped.
fn grid_position(path: &Path, channels: &[usize]) -> Result<Vec<ChannelTrace>, String> {
    if !path.is_file() {
        return Err("file not found".to_string());
    }
    extract_channels(path, channels).map_err(|e| e.to_string())
}

/// Fail with [`ContainerError::MixedFormat`] unless every mosaic position was
/// read from the same container format.
fn check_mosaic_formats(sets: &[(CcdPosition, AlignedTraceSet)]) -> Result<(), ContainerError> {
    let mut sources = sets
        .iter()
        .filter_map(|(_, set)| set.members.first())
        .map(|member| (&member.trace.source.path, member.trace.metadata.format));
    let Some((first, first_format)) = sources.next() else {
        return Ok(());
    };
    match sources.find(|(_, format)| *format != first_format) {
        Some((other, other_format)) => Err(ContainerError::MixedFormat {
            first: first.clone(),
            first_format,
            other: other.clone(),
            other_format,
        }),
        None => Ok(()),
    }
}

/// Pattern file stem without the raft position.
fn grid_stem(pattern: &str) -> String {
    let stem = file_stem(Path::new(&pattern.replace(CCD_PLACEHOLDER, "")));
    let stem = match CcdPosition::from_file_prefix(&stem) {
        Some(_) => &stem[3..],
        None => stem.as_str(),
    };
    stem.trim_matches(|c| c == '_' || c == '-').to_string()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
