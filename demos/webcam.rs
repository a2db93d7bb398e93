//! Live overlay demo: pumps webcam frames through a toy segmenter and writes
//! the newest overlay to `overlay.png`.
//!
//! Pass an image path to run against a still picture instead of a camera.

use std::{env, time::Duration};

use bodypaint::{
    body::{BodyPart, ColorTable},
    display::PngSurface,
    image::Image,
    pump::FramePump,
    segment::{PartSegmentation, PartSegmenter, SegmentWorker, SegmenterOptions, NO_DETECTION},
    video::{
        webcam::{Webcam, WebcamOptions},
        StillSource, VideoSource,
    },
};

/// Toy stand-in for a real model: bright pixels count as "person" and are
/// binned into parts by row, so the overlay shows a recognizable silhouette.
struct LumaBand;

impl PartSegmenter for LumaBand {
    fn segment_parts(
        &mut self,
        frame: &Image,
        options: &SegmenterOptions,
    ) -> anyhow::Result<PartSegmentation> {
        let res = frame.resolution();
        let cutoff = (options.segmentation_threshold() * 255.0) as u16;
        let mut labels = Vec::with_capacity(res.num_pixels() as usize);
        for (i, px) in frame.data().chunks_exact(4).enumerate() {
            let [r, g, b] = [u16::from(px[0]), u16::from(px[1]), u16::from(px[2])];
            // Integer Rec. 601 luma.
            let luma = (r * 77 + g * 150 + b * 29) >> 8;
            if luma < cutoff {
                labels.push(NO_DETECTION);
                continue;
            }
            let row = i as u32 / res.width();
            let part = match row * 4 / res.height() {
                0 => BodyPart::LeftFace,
                1 => BodyPart::TorsoFront,
                2 => BodyPart::LeftUpperLegFront,
                _ => BodyPart::LeftFoot,
            };
            labels.push(part as i32);
        }
        Ok(PartSegmentation::new(res, labels))
    }
}

fn main() -> anyhow::Result<()> {
    bodypaint::init_logger!();

    let source: Box<dyn VideoSource + Send> = match env::args_os().nth(1) {
        Some(path) => Box::new(StillSource::open(path)?),
        None => Box::new(Webcam::open(WebcamOptions::default())?),
    };

    let options = SegmenterOptions::default().with_segmentation_threshold(0.5);
    let stage = SegmentWorker::spawn(|| Ok(LumaBand), options)?;
    let pump = FramePump::new(stage, PngSurface::new("overlay.png"), ColorTable::default());
    let driver = pump.drive(source, Duration::from_millis(33))?;

    println!("writing overlays to overlay.png; press Enter to stop");
    std::io::stdin().read_line(&mut String::new())?;
    driver.stop();

    Ok(())
}
