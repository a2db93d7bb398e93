//! Body-part segmentation overlay pipeline.
//!
//! `bodypaint` takes frames from a live video source, runs them through a
//! body-part segmentation model, and recolors every matched pixel by part
//! category. It is built from two cooperating pieces:
//!
//! - The [frame pump][pump::FramePump] drives acquisition: it admits at most
//!   one frame into the inference stage at a time, copies each admitted frame
//!   into an off-screen buffer, and silently drops frames that arrive while
//!   an inference is still running.
//! - The [overlay renderer][overlay::render] maps an inference's per-pixel
//!   label buffer onto an RGBA [`Image`][image::Image] using a fixed
//!   [`ColorTable`][body::ColorTable], producing transparent pixels where
//!   nothing was detected.
//!
//! The segmentation model itself is not part of this crate; implement
//! [`PartSegmenter`][segment::PartSegmenter] to plug one in.
//!
//! # Environment Variables
//!
//! * `BODYPAINT_WEBCAM_NAME`: Forces the device to use for [`Webcam`]s created
//!   without an explicit device name. If unset, the first device that supports
//!   a compatible image format will be used.
//!
//! [`Webcam`]: video::webcam::Webcam

use log::LevelFilter;

pub mod body;
pub mod display;
pub mod image;
pub mod overlay;
pub mod pump;
pub mod segment;
pub mod timer;
pub mod video;
pub mod worker;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and `bodypaint` will log at *debug* level; `RUST_LOG`
/// can override this.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
