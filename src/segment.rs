//! The inference boundary: label buffers, segmenter configuration, and the
//! asynchronous submission stage driven by the frame pump.
//!
//! The segmentation model itself is outside this crate. Anything that can
//! turn an [`Image`] into a [`PartSegmentation`] implements [`PartSegmenter`]
//! and is treated as a black box; [`SegmentWorker`] moves it onto its own
//! thread so the acquisition loop never waits on it.

use std::{io, sync::Arc};

use once_cell::sync::OnceCell;

use crate::{
    image::{Image, Resolution},
    worker::{promise, Promise, PromiseHandle, Worker},
};

/// A per-pixel body-part label.
///
/// Valid values are `NO_DETECTION` or an index into the active
/// [`ColorTable`][crate::body::ColorTable].
pub type Label = i32;

/// The label value for pixels where no body part was detected.
pub const NO_DETECTION: Label = -1;

/// The result of one inference call: a row-major, per-pixel label buffer with
/// the dimensions it was produced at.
///
/// Immutable once produced; owned by whoever received it from the segmenter.
#[derive(Debug, Clone)]
pub struct PartSegmentation {
    resolution: Resolution,
    labels: Box<[Label]>,
}

impl PartSegmentation {
    /// Creates a segmentation result from a label buffer.
    ///
    /// # Panics
    ///
    /// `labels` must hold exactly `resolution.num_pixels()` entries.
    pub fn new(resolution: Resolution, labels: impl Into<Box<[Label]>>) -> Self {
        let labels = labels.into();
        assert_eq!(
            labels.len() as u64,
            resolution.num_pixels(),
            "label buffer holds {} labels, expected {} for a {} segmentation",
            labels.len(),
            resolution.num_pixels(),
            resolution,
        );
        Self { resolution, labels }
    }

    /// Returns the dimensions the labels were produced at.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Returns the row-major per-pixel labels.
    #[inline]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }
}

/// Which network architecture the model should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    MobileNetV1,
    ResNet50,
}

/// The resolution the model downscales its input to before inference.
///
/// Higher tiers trade speed for finer part boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalResolution {
    Low,
    Medium,
    High,
    Full,
}

/// Model and inference configuration, forwarded to the segmenter unchanged.
///
/// The pipeline never interprets these values; they exist so a fixed
/// configuration can be handed to whatever [`PartSegmenter`] is plugged in.
#[derive(Debug, Clone)]
pub struct SegmenterOptions {
    architecture: Architecture,
    output_stride: u8,
    multiplier: f32,
    quant_bytes: u8,
    segmentation_threshold: f32,
    flip_horizontal: bool,
    internal_resolution: InternalResolution,
}

/// The defaults favor precision over speed: a high internal resolution and a
/// 0.9 confidence threshold to keep false positives down.
impl Default for SegmenterOptions {
    fn default() -> Self {
        Self {
            architecture: Architecture::MobileNetV1,
            output_stride: 16,
            multiplier: 0.75,
            quant_bytes: 4,
            segmentation_threshold: 0.9,
            flip_horizontal: false,
            internal_resolution: InternalResolution::High,
        }
    }
}

impl SegmenterOptions {
    /// Sets the network architecture to load.
    #[inline]
    pub fn with_architecture(self, architecture: Architecture) -> Self {
        Self {
            architecture,
            ..self
        }
    }

    /// Sets the model's output stride.
    #[inline]
    pub fn with_output_stride(self, output_stride: u8) -> Self {
        Self {
            output_stride,
            ..self
        }
    }

    /// Sets the model's depth multiplier.
    #[inline]
    pub fn with_multiplier(self, multiplier: f32) -> Self {
        Self { multiplier, ..self }
    }

    /// Sets the weight quantization width, in bytes.
    #[inline]
    pub fn with_quant_bytes(self, quant_bytes: u8) -> Self {
        Self {
            quant_bytes,
            ..self
        }
    }

    /// Sets the confidence a pixel needs before it is assigned a part label
    /// (`0.0` to `1.0`).
    #[inline]
    pub fn with_segmentation_threshold(self, segmentation_threshold: f32) -> Self {
        Self {
            segmentation_threshold,
            ..self
        }
    }

    /// Mirrors frames horizontally before inference (for front cameras).
    #[inline]
    pub fn with_flip_horizontal(self, flip_horizontal: bool) -> Self {
        Self {
            flip_horizontal,
            ..self
        }
    }

    /// Sets the resolution tier the model runs at internally.
    #[inline]
    pub fn with_internal_resolution(self, internal_resolution: InternalResolution) -> Self {
        Self {
            internal_resolution,
            ..self
        }
    }

    #[inline]
    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    #[inline]
    pub fn output_stride(&self) -> u8 {
        self.output_stride
    }

    #[inline]
    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    #[inline]
    pub fn quant_bytes(&self) -> u8 {
        self.quant_bytes
    }

    #[inline]
    pub fn segmentation_threshold(&self) -> f32 {
        self.segmentation_threshold
    }

    #[inline]
    pub fn flip_horizontal(&self) -> bool {
        self.flip_horizontal
    }

    #[inline]
    pub fn internal_resolution(&self) -> InternalResolution {
        self.internal_resolution
    }
}

/// A body-part segmentation model.
///
/// Implementations may take arbitrarily long and fail arbitrarily; the
/// pipeline treats both as opaque. The returned segmentation is expected to
/// match the input frame's dimensions, but the renderer re-checks this rather
/// than trusting the model.
pub trait PartSegmenter {
    /// Runs part segmentation on `frame`.
    fn segment_parts(
        &mut self,
        frame: &Image,
        options: &SegmenterOptions,
    ) -> anyhow::Result<PartSegmentation>;
}

/// A shareable "model loaded" latch.
///
/// Starts out not-ready and transitions to ready exactly once; it never
/// reverts. Clones observe the same underlying state, so a loader thread can
/// flip the latch while the pump queries it.
#[derive(Debug, Clone, Default)]
pub struct Readiness {
    ready: Arc<OnceCell<()>>,
}

impl Readiness {
    /// Creates a latch in the not-ready state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latches to ready. Calling this more than once has no further effect.
    pub fn set_ready(&self) {
        self.ready.set(()).ok();
    }

    /// Returns whether the latch has fired.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }
}

/// Handle to an in-flight segmentation.
pub type SegmentHandle = PromiseHandle<anyhow::Result<PartSegmentation>>;

/// The asynchronous seam between the frame pump and a segmenter.
///
/// The pump submits at most one frame at a time and polls the returned handle;
/// implementations must not require the caller to block.
pub trait SegmentStage {
    /// Whether the stage can accept submissions yet.
    fn is_ready(&self) -> bool;

    /// Starts segmenting `frame`, returning a handle that resolves when the
    /// inference completes or fails.
    fn submit(&mut self, frame: Image) -> SegmentHandle;
}

struct SegmentJob {
    frame: Image,
    reply: Promise<anyhow::Result<PartSegmentation>>,
}

/// A [`SegmentStage`] that runs a [`PartSegmenter`] on a dedicated worker
/// thread.
///
/// The segmenter is constructed *on* the worker thread (model loads can take a
/// while), and the stage's [`Readiness`] latches once construction succeeds.
/// If construction fails, the failure is logged and the stage stays not-ready
/// forever; submissions against it resolve to a dropped promise.
pub struct SegmentWorker {
    worker: Worker<SegmentJob>,
    readiness: Readiness,
}

impl SegmentWorker {
    /// Spawns the worker thread and begins loading the segmenter.
    ///
    /// `factory` runs on the worker thread, so the segmenter itself does not
    /// need to be [`Send`] — only the factory does. `options` are forwarded to
    /// every [`PartSegmenter::segment_parts`] call unchanged.
    pub fn spawn<S, F>(factory: F, options: SegmenterOptions) -> io::Result<Self>
    where
        S: PartSegmenter + 'static,
        F: FnOnce() -> anyhow::Result<S> + Send + 'static,
    {
        let readiness = Readiness::new();
        let ready = readiness.clone();
        let worker = Worker::builder().name("segmenter").spawn(
            move || {
                let segmenter = factory()?;
                ready.set_ready();
                Ok((segmenter, options))
            },
            |(segmenter, options): &mut (S, SegmenterOptions), job: SegmentJob| {
                let SegmentJob { frame, reply } = job;
                reply.fulfill(segmenter.segment_parts(&frame, options));
            },
        )?;

        Ok(Self { worker, readiness })
    }

    /// Returns the stage's ready-state latch.
    ///
    /// Clone it to observe model-load completion from elsewhere.
    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }
}

impl SegmentStage for SegmentWorker {
    fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    fn submit(&mut self, frame: Image) -> SegmentHandle {
        let (reply, handle) = promise();
        self.worker.send(SegmentJob { frame, reply });
        handle
    }
}
