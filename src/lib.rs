//! # raftscope - Scan-mode trace comparison for CCD rafts
//!
//! `raftscope` turns scan-mode acquisitions from a CCD raft test stand into
//! oscilloscope-style figures. A scan-mode file samples the video output of every
//! amplifier channel at each sequencer tick, so one readout cycle of the clock
//! sequence shows up as a repeating waveform. Overlaying those waveforms across
//! acquisitions, channels or CCDs is how readout problems are diagnosed.
//!
//! ## Pipeline
//!
//! - **Sequence Model** ([`sequence`]): parses sequencer files into the ordered
//!   intervals and clock levels of one readout cycle.
//! - **Channel Extractor** ([`extract`], [`container`]): reads one amplifier's
//!   samples out of a FITS or legacy REB raw container.
//! - **Time-Axis Reconstructor** ([`axis`]): maps sample indices onto readout
//!   cycles and the phase of the sequence.
//! - **Trace Aligner** ([`align`]): truncates traces to a common whole-cycle
//!   extent and optionally normalizes them.
//! - **Display Orchestrator** ([`display`]): runs combined, scan, raft grid and
//!   multi-file comparison requests and hands figures to a [`render::Renderer`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use raftscope::prelude::*;
//!
//! let config = ScopeConfig::new("/data/RTM1new_mod50")
//!     .with_sequence("seq/scan_mode.seq")
//!     .with_output_dir("plots");
//! let renderer = SvgRenderer::new(&config.output_dir);
//! let mut session = ScopeSession::new(config, renderer);
//!
//! let report = session.run(&DisplayRequest::Combined {
//!     first: "00_RTM1new_mod50_1s-scan.fits".into(),
//!     second: "00_RTM1new_mod50_2s-scan.fits".into(),
//!     channels: ChannelSelection::Single(3),
//!     ccd: None,
//!     sequence: None,
//! })?;
//! for output in &report.outputs {
//!     println!("{}", output.path().display());
//! }
//! # Ok::<(), raftscope::display::DisplayError>(())
//! ```
//!
//! ## Raft layout
//!
//! A raft is a 2 x 3 grid of CCDs addressed by a two-digit `RC` code (`00` to
//! `12`), each read out through 16 amplifier channels. Files of one raft share a
//! naming pattern that differs only in the `RC` prefix, written `{ccd}` in grid
//! requests.

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![allow(clippy::too_many_arguments)]

pub mod align;
pub mod axis;
pub mod config;
pub mod container;
pub mod demo;
pub mod display;
pub mod extract;
pub mod layout;
pub mod render;
pub mod sequence;
mod trace;

pub use trace::{ChannelTrace, SourceId, TraceMetadata};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::align::{
        align, AlignError, AlignOptions, AlignedTrace, AlignedTraceSet, AlignmentWarning,
        AxisBasis, Normalization,
    };
    pub use crate::axis::{build_axis, AxisPoint, TimeAxis};
    pub use crate::config::{ConfigFile, ScopeConfig};
    pub use crate::container::{ContainerError, ContainerFormat, ScanContainer};
    pub use crate::display::{
        DisplayError, DisplayReport, DisplayRequest, GridOutput, RequestFile, ScopeSession,
    };
    pub use crate::extract::{extract, extract_channels};
    pub use crate::layout::{CcdPosition, ChannelSelection};
    pub use crate::render::{
        Figure, MemoryRenderer, Panel, RenderOutput, Renderer, Series, SvgRenderer,
    };
    pub use crate::sequence::{SequenceError, SequenceProgram};
    pub use crate::{ChannelTrace, SourceId, TraceMetadata};
}
