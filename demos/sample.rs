//! One-shot demo: segments a single image and saves the recolored overlay.

use std::{path::PathBuf, process};

use bodypaint::{
    body::{BodyPart, ColorTable},
    image::Image,
    overlay,
    segment::{PartSegmentation, PartSegmenter, SegmenterOptions, NO_DETECTION},
    timer::Timer,
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

    let mut args = std::env::args_os().skip(1);
    let path = match args.next() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: sample <image> [out.png]");
            process::exit(1);
        }
    };
    let out = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("overlay.png"));

    let image = Image::load(&path)?;
    let options = SegmenterOptions::default().with_segmentation_threshold(0.5);

    let t_segment = Timer::new("segment");
    let segmentation = t_segment.time(|| LumaBand.segment_parts(&image, &options))?;

    let mut target = Image::new(image.resolution());
    let t_render = Timer::new("render");
    t_render.time(|| overlay::render(&segmentation, &ColorTable::default(), &mut target))?;

    target.save(&out)?;
    log::info!("{}, {}", t_segment, t_render);
    println!("wrote {}", out.display());

    Ok(())
}
