//! # Trace Aligner
//!
//! Brings traces from different files, channels, or sequencer configurations
//! onto a common footing before they are overlaid.
//!
//! Acquisitions rarely cover the same number of readout cycles. The aligner
//! finds the largest number of cycles every trace covers (the *common extent*)
//! and truncates each trace to it. The comparison is done in cycles, not raw
//! samples, so traces taken with sequences of different cycle lengths are
//! compared cycle for cycle. The shortest trace is always kept whole.
//!
//! Truncation is never an error; each truncated trace produces an
//! [`AlignmentWarning`] and a `warn!` log record.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use raftscope::align::{align, AlignOptions, AxisBasis};
//! # fn demo(a: raftscope::ChannelTrace, b: raftscope::ChannelTrace,
//! #         program: raftscope::sequence::SequenceProgram) -> Result<(), raftscope::align::AlignError> {
//! let set = align(vec![a, b], AxisBasis::SharedSequence(Arc::new(program)), &AlignOptions::default())?;
//! for warning in &set.warnings {
//!     println!("{}", warning);
//! }
//! # Ok(())
//! # }
//! ```

mod normalize;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

pub use normalize::Normalization;

use crate::axis::TimeAxis;
use crate::sequence::SequenceProgram;
use crate::trace::{ChannelTrace, SourceId};

/// Errors raised by [`align`].
#[derive(Debug, Error)]
pub enum AlignError {
    /// Nothing to align
    #[error("no traces to align")]
    Empty,

    /// Per-trace basis with the wrong number of programs
    #[error("{programs} sequence programs given for {traces} traces")]
    SequenceCountMismatch {
        /// Number of traces
        traces: usize,
        /// Number of programs
        programs: usize,
    },

    /// A program whose cycle has no ticks cannot define an axis
    #[error("sequence program '{name}' has a zero-length cycle")]
    EmptyCycle {
        /// Program name
        name: String,
    },
}

/// How sample positions are interpreted.
#[derive(Debug, Clone)]
pub enum AxisBasis {
    /// No clock sequence: positions are sample indices
    SampleIndex,
    /// One program shared by every trace
    SharedSequence(Arc<SequenceProgram>),
    /// One program per trace, in trace order
    PerTraceSequence(Vec<Arc<SequenceProgram>>),
}

impl AxisBasis {
    /// The basis without its programs.
    pub fn kind(&self) -> BasisKind {
        match self {
            AxisBasis::SampleIndex => BasisKind::SampleIndex,
            AxisBasis::SharedSequence(_) => BasisKind::SharedSequence,
            AxisBasis::PerTraceSequence(_) => BasisKind::PerTraceSequence,
        }
    }
}

/// Discriminant of [`AxisBasis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BasisKind {
    /// Sample-index axis
    SampleIndex,
    /// Shared program
    SharedSequence,
    /// Program per trace
    PerTraceSequence,
}

/// Alignment options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlignOptions {
    /// Normalization applied after truncation
    pub normalization: Normalization,
}

impl AlignOptions {
    /// Options with the given normalization.
    pub fn with_normalization(normalization: Normalization) -> Self {
        Self { normalization }
    }
}

/// Non-fatal alignment events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AlignmentWarning {
    /// A trace was shortened to the common extent
    Truncated {
        /// Source of the truncated trace
        source: SourceId,
        /// Samples before truncation
        original_len: usize,
        /// Samples kept
        kept_len: usize,
        /// Readout cycles dropped; `None` for a sample-index axis
        discarded_cycles: Option<f64>,
    },
}

impl fmt::Display for AlignmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentWarning::Truncated {
                source,
                original_len,
                kept_len,
                discarded_cycles,
            } => {
                write!(
                    f,
                    "{} truncated from {} to {} samples",
                    source, original_len, kept_len
                )?;
                if let Some(cycles) = discarded_cycles {
                    write!(f, " ({:.2} readout cycles discarded)", cycles)?;
                }
                Ok(())
            }
        }
    }
}

/// Common extent of an aligned set, as the exact ratio `samples / cycle_ticks`
/// of its limiting trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommonExtent {
    /// Samples of the limiting trace
    pub samples: usize,
    /// Cycle length of the limiting trace in ticks (1 for a sample-index axis)
    pub cycle_ticks: u64,
}

impl CommonExtent {
    /// Extent in readout cycles (samples for a sample-index axis).
    pub fn cycles(&self) -> f64 {
        self.samples as f64 / self.cycle_ticks as f64
    }

    /// Whether `len / cycle` is strictly smaller than this extent.
    fn exceeds(&self, len: usize, cycle: u64) -> bool {
        (len as u128) * (self.cycle_ticks as u128) < (self.samples as u128) * (cycle as u128)
    }

    /// Samples a trace with the given cycle length keeps:
    /// `floor(samples * cycle / cycle_ticks)`.
    fn keep_for(&self, cycle: u64) -> usize {
        ((self.samples as u128 * cycle as u128) / self.cycle_ticks as u128) as usize
    }
}

/// A trace truncated to the common extent, with its time axis.
#[derive(Debug, Clone)]
pub struct AlignedTrace {
    /// The truncated (and possibly normalized) trace
    pub trace: ChannelTrace,
    /// Axis of the kept samples
    pub axis: TimeAxis,
    /// Length before truncation
    pub original_len: usize,
}

impl AlignedTrace {
    /// Plot x coordinate of every kept sample.
    pub fn x_values(&self) -> Vec<f64> {
        self.axis.positions()
    }

    /// Whether the trace lost samples during alignment.
    pub fn was_truncated(&self) -> bool {
        self.trace.sample_count() < self.original_len
    }
}

/// Traces aligned onto a common extent.
#[derive(Debug, Clone)]
pub struct AlignedTraceSet {
    /// Aligned traces, in input order
    pub members: Vec<AlignedTrace>,
    /// Basis the axes were built on
    pub basis_kind: BasisKind,
    /// Common extent
    pub common_extent: CommonExtent,
    /// Truncation warnings, in input order
    pub warnings: Vec<AlignmentWarning>,
}

impl AlignedTraceSet {
    /// Axis shared by every member, when all axes are interchangeable.
    pub fn shared_axis(&self) -> Option<&TimeAxis> {
        let first = &self.members.first()?.axis;
        self.members
            .iter()
            .all(|m| m.axis.same_as(first))
            .then_some(first)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the set is empty. Never true for a set returned by [`align`].
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Find the member from a given source.
    pub fn member(&self, source: &SourceId) -> Option<&AlignedTrace> {
        self.members.iter().find(|m| &m.trace.source == source)
    }
}

/// Align traces onto a common extent.
///
/// The result is independent of trace order up to the order of members.
pub fn align(
    traces: Vec<ChannelTrace>,
    basis: AxisBasis,
    options: &AlignOptions,
) -> Result<AlignedTraceSet, AlignError> {
    if traces.is_empty() {
        return Err(AlignError::Empty);
    }
    let basis_kind = basis.kind();
    let programs: Vec<Option<Arc<SequenceProgram>>> = match basis {
        AxisBasis::SampleIndex => vec![None; traces.len()],
        AxisBasis::SharedSequence(program) => vec![Some(program); traces.len()],
        AxisBasis::PerTraceSequence(programs) => {
            if programs.len() != traces.len() {
                return Err(AlignError::SequenceCountMismatch {
                    traces: traces.len(),
                    programs: programs.len(),
                });
            }
            programs.into_iter().map(Some).collect()
        }
    };

    let cycles = programs
        .iter()
        .map(|program| match program {
            None => Ok(1u64),
            Some(p) => match p.total_ticks() {
                0 => Err(AlignError::EmptyCycle {
                    name: p.name.clone(),
                }),
                ticks => Ok(ticks),
            },
        })
        .collect::<Result<Vec<u64>, AlignError>>()?;

    let mut extent = CommonExtent {
        samples: traces[0].sample_count(),
        cycle_ticks: cycles[0],
    };
    for (trace, &cycle) in traces.iter().zip(&cycles).skip(1) {
        if extent.exceeds(trace.sample_count(), cycle) {
            extent = CommonExtent {
                samples: trace.sample_count(),
                cycle_ticks: cycle,
            };
        }
    }
    debug!(
        "Aligning {} traces on {:?} basis, common extent {:.3}",
        traces.len(),
        basis_kind,
        extent.cycles()
    );

    let mut members = Vec::with_capacity(traces.len());
    let mut warnings = Vec::new();
    for ((mut trace, program), cycle) in traces.into_iter().zip(programs).zip(cycles) {
        let original_len = trace.sample_count();
        let kept_len = extent.keep_for(cycle).min(original_len);
        if kept_len < original_len {
            trace.samples.truncate(kept_len);
            let discarded_cycles = program
                .as_ref()
                .map(|_| (original_len - kept_len) as f64 / cycle as f64);
            let warning = AlignmentWarning::Truncated {
                source: trace.source.clone(),
                original_len,
                kept_len,
                discarded_cycles,
            };
            warn!("{}", warning);
            warnings.push(warning);
        }
        options.normalization.apply(&mut trace.samples);

        let axis = match program {
            Some(program) => TimeAxis::from_sequence(program, kept_len),
            None => TimeAxis::sample_index(kept_len),
        };
        members.push(AlignedTrace {
            trace,
            axis,
            original_len,
        });
    }

    Ok(AlignedTraceSet {
        members,
        basis_kind,
        common_extent: extent,
        warnings,
    })
}
