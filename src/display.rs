//! Output surfaces that completed overlays are published to.

use std::path::PathBuf;

use crate::image::{Image, Resolution};

/// Somewhere a finished overlay can be shown.
///
/// The pump calls [`resize`][Self::resize] exactly once per surface, when the
/// source's real dimensions first become known, and [`write`][Self::write]
/// once per completed render.
pub trait DisplaySurface {
    /// Adjusts the surface to the given pixel dimensions.
    fn resize(&mut self, resolution: Resolution) -> anyhow::Result<()>;

    /// Publishes a finished overlay.
    fn write(&mut self, overlay: &Image) -> anyhow::Result<()>;
}

/// A surface that saves the most recent overlay to a PNG file.
///
/// Headless stand-in for a real display: each write replaces the file, so the
/// path always holds the newest overlay.
pub struct PngSurface {
    path: PathBuf,
    resolution: Option<Resolution>,
}

impl PngSurface {
    /// Creates a surface writing to `path` (which should end in `.png`).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            resolution: None,
        }
    }

    /// Returns the dimensions the surface was sized to, if it has been.
    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }
}

impl DisplaySurface for PngSurface {
    fn resize(&mut self, resolution: Resolution) -> anyhow::Result<()> {
        log::debug!("sizing '{}' to {}", self.path.display(), resolution);
        self.resolution = Some(resolution);
        Ok(())
    }

    fn write(&mut self, overlay: &Image) -> anyhow::Result<()> {
        overlay.save(&self.path)
    }
}
