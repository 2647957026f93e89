use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use super::error::SequenceError;
use super::parser::parse;
use super::program::SequenceProgram;

/// Per-session memo of parsed programs, keyed by file and function.
///
/// Parsing is deterministic, so a cached program is indistinguishable from a
/// fresh parse of the same file.
#[derive(Debug, Default)]
pub struct SequenceCache {
    programs: HashMap<(PathBuf, Option<String>), Arc<SequenceProgram>>,
}

impl SequenceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached program or parse it.
    pub fn get_or_parse(
        &mut self,
        path: &Path,
        function: Option<&str>,
    ) -> Result<Arc<SequenceProgram>, SequenceError> {
        let key = (path.to_path_buf(), function.map(str::to_string));
        if let Some(program) = self.programs.get(&key) {
            debug!("Sequence cache hit: {}", path.display());
            return Ok(Arc::clone(program));
        }
        let program = Arc::new(parse(path, function)?);
        self.programs.insert(key, Arc::clone(&program));
        Ok(program)
    }

    /// Number of cached programs
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
