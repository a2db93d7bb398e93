//! Frame sources the pump can acquire from.

pub mod webcam;

use crate::image::{Image, Resolution};

/// A source of video frames.
///
/// A source exposes the dimensions of its frames and hands out a copy of the
/// *current* frame on demand. Sources are allowed to report an
/// [empty][Resolution::is_empty] resolution until their first real frame
/// exists; the pump will not admit frames until real dimensions are known.
pub trait VideoSource {
    /// Returns the dimensions of the source's frames.
    fn resolution(&self) -> Resolution;

    /// Copies the current frame into `into`.
    ///
    /// May block until a frame is available (a webcam waits for its next
    /// capture), but must not wait on anything downstream of the source.
    fn grab(&mut self, into: &mut Image) -> anyhow::Result<()>;
}

impl<V: VideoSource + ?Sized> VideoSource for Box<V> {
    fn resolution(&self) -> Resolution {
        (**self).resolution()
    }

    fn grab(&mut self, into: &mut Image) -> anyhow::Result<()> {
        (**self).grab(into)
    }
}

/// A source that yields the same image forever.
///
/// This is the "sample image" path: pointing a pump at a still picture
/// produces exactly the same pipeline behavior the live feed gets.
pub struct StillSource {
    image: Image,
}

impl StillSource {
    pub fn new(image: Image) -> Self {
        Self { image }
    }

    /// Loads the still from an image file.
    pub fn open(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        Ok(Self::new(Image::load(path)?))
    }
}

impl VideoSource for StillSource {
    fn resolution(&self) -> Resolution {
        self.image.resolution()
    }

    fn grab(&mut self, into: &mut Image) -> anyhow::Result<()> {
        into.copy_from(&self.image);
        Ok(())
    }
}
