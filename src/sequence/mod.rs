//! # Sequence Model
//!
//! Parses REB readout sequencer files into a [`SequenceProgram`]: the ordered
//! list of named logic-level intervals that make up one readout cycle of a
//! sequencer function.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use raftscope::sequence;
//!
//! let program = sequence::parse(Path::new("TS8_ITL_RTM1new_mod50.seq"), Some("ReadPixel"))?;
//! println!("{}: {} ticks per cycle", program.name, program.total_ticks());
//! for interval in &program.intervals {
//!     println!("  {} ({} ticks)", interval.name, interval.duration_ticks);
//! }
//! # Ok::<(), raftscope::sequence::SequenceError>(())
//! ```

mod cache;
mod error;
mod parser;
mod program;

#[cfg(test)]
mod tests;

pub use cache::SequenceCache;
pub use error::SequenceError;
pub use parser::{parse, parse_file, SequenceFile, DEFAULT_FUNCTION};
pub use program::{Interval, SequenceProgram, DEFAULT_TICK_PERIOD_NS, MAX_CYCLE_TICKS};
