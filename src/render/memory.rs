use std::path::PathBuf;

use super::{FileArtifact, Figure, RenderError, RenderHandle, RenderOutput, Renderer};

/// Renderer that keeps figures in memory instead of drawing them.
///
/// Used for dry runs and tests. Output paths are what [`super::SvgRenderer`]
/// would have produced under `output_dir`.
#[derive(Debug, Default)]
pub struct MemoryRenderer {
    output_dir: PathBuf,
    figures: Vec<Figure>,
}

impl MemoryRenderer {
    /// Create an empty renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Report output paths under `dir`
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Figures received so far, in order
    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }

    /// Take the recorded figures, leaving the renderer empty
    pub fn take(&mut self) -> Vec<Figure> {
        std::mem::take(&mut self.figures)
    }
}

impl Renderer for MemoryRenderer {
    fn plot(&mut self, figure: &Figure, interactive: bool) -> Result<RenderOutput, RenderError> {
        if figure.panels.is_empty() {
            return Err(RenderError::EmptyFigure(figure.name.clone()));
        }
        let path = self.output_dir.join(figure.file_name());
        let title = figure.title.clone();
        self.figures.push(figure.clone());
        Ok(if interactive {
            RenderOutput::Displayed(RenderHandle { title, path })
        } else {
            RenderOutput::File(FileArtifact { title, path })
        })
    }
}
