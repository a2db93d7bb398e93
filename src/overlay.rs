//! The overlay renderer: recolors a raster buffer from a label buffer.

use crate::{
    body::ColorTable,
    image::Image,
    segment::{PartSegmentation, NO_DETECTION},
};

/// A precondition violation detected while rendering an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The label buffer and the target raster buffer disagree on pixel count.
    ///
    /// Nothing has been written to the target.
    #[error("label buffer holds {labels} labels but render target has {pixels} pixels")]
    DimensionMismatch { labels: usize, pixels: usize },

    /// A label value was outside `[-1, len)` for the active color table.
    ///
    /// This is a data-integrity fault in the segmenter's output, not a
    /// condition to paper over with a fallback color. The render is aborted
    /// where the label was found; the target's contents are unspecified.
    #[error("label {label} at pixel {index} is outside the color table ({parts} parts)")]
    OutOfRangeLabel {
        label: i32,
        index: usize,
        parts: usize,
    },
}

/// Rewrites every pixel of `target` according to `segmentation` and `colors`.
///
/// Pixels labeled [`NO_DETECTION`] become fully transparent black; every other
/// pixel is overwritten with its label's table color, all four channels,
/// without blending. One pass, no per-pixel allocation, and idempotent: the
/// same inputs always produce the same target, no matter what it held before.
pub fn render(
    segmentation: &PartSegmentation,
    colors: &ColorTable,
    target: &mut Image,
) -> Result<(), RenderError> {
    let labels = segmentation.labels();
    let pixels = target.resolution().num_pixels() as usize;
    if labels.len() != pixels {
        return Err(RenderError::DimensionMismatch {
            labels: labels.len(),
            pixels,
        });
    }

    let rgba = target.data_mut().chunks_exact_mut(4);
    for (index, (&label, pixel)) in labels.iter().zip(rgba).enumerate() {
        if label == NO_DETECTION {
            pixel.copy_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        match colors.color(label) {
            Some(color) => pixel.copy_from_slice(&color.to_rgba8()),
            None => {
                return Err(RenderError::OutOfRangeLabel {
                    label,
                    index,
                    parts: colors.len(),
                })
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Color, Resolution};

    fn arbitrary_image(res: Resolution) -> Image {
        let mut image = Image::new(res);
        for byte in image.data_mut() {
            *byte = fastrand::u8(..);
        }
        image
    }

    fn two_part_table() -> ColorTable {
        ColorTable::new([
            Color::from_rgba8(244, 67, 54, 255),
            Color::from_rgba8(183, 28, 28, 255),
        ])
    }

    #[test]
    fn maps_labels_and_clears_background() {
        let seg = PartSegmentation::new(Resolution::new(4, 1), vec![-1, 0, 1, -1]);
        let mut target = arbitrary_image(Resolution::new(4, 1));

        render(&seg, &two_part_table(), &mut target).unwrap();

        #[rustfmt::skip]
        assert_eq!(
            target.data(),
            &[
                0, 0, 0, 0,
                244, 67, 54, 255,
                183, 28, 28, 255,
                0, 0, 0, 0,
            ],
        );
    }

    #[test]
    fn copies_alpha_from_the_table() {
        let table = ColorTable::new([Color::from_rgba8(10, 20, 30, 40)]);
        let seg = PartSegmentation::new(Resolution::new(1, 1), vec![0]);
        let mut target = arbitrary_image(Resolution::new(1, 1));

        render(&seg, &table, &mut target).unwrap();

        assert_eq!(target.data(), &[10, 20, 30, 40]);
    }

    #[test]
    fn render_is_idempotent() {
        let seg = PartSegmentation::new(Resolution::new(2, 2), vec![1, -1, 0, 1]);
        let table = two_part_table();

        let mut once = arbitrary_image(Resolution::new(2, 2));
        render(&seg, &table, &mut once).unwrap();
        let mut twice = once.clone();
        render(&seg, &table, &mut twice).unwrap();

        assert_eq!(once.data(), twice.data());
    }

    #[test]
    fn rejects_dimension_mismatch_without_writing() {
        let seg = PartSegmentation::new(Resolution::new(2, 1), vec![0, 1]);
        let mut target = arbitrary_image(Resolution::new(2, 2));
        let before = target.data().to_vec();

        let err = render(&seg, &two_part_table(), &mut target).unwrap_err();

        assert_eq!(
            err,
            RenderError::DimensionMismatch {
                labels: 2,
                pixels: 4,
            },
        );
        assert_eq!(target.data(), &before[..]);
    }

    #[test]
    fn rejects_labels_past_the_table() {
        let seg = PartSegmentation::new(Resolution::new(2, 1), vec![0, 2]);
        let mut target = Image::new(Resolution::new(2, 1));

        let err = render(&seg, &two_part_table(), &mut target).unwrap_err();

        assert_eq!(
            err,
            RenderError::OutOfRangeLabel {
                label: 2,
                index: 1,
                parts: 2,
            },
        );
    }

    #[test]
    fn rejects_labels_below_no_detection() {
        let seg = PartSegmentation::new(Resolution::new(1, 1), vec![-2]);
        let mut target = Image::new(Resolution::new(1, 1));

        let err = render(&seg, &two_part_table(), &mut target).unwrap_err();

        assert_eq!(
            err,
            RenderError::OutOfRangeLabel {
                label: -2,
                index: 0,
                parts: 2,
            },
        );
    }

    #[test]
    fn full_default_palette_end_to_end() {
        use crate::body::BodyPart;

        let table = ColorTable::default();
        let labels: Vec<i32> = (-1..BodyPart::COUNT as i32).collect();
        let res = Resolution::new(labels.len() as u32, 1);
        let seg = PartSegmentation::new(res, labels);
        let mut target = arbitrary_image(res);

        render(&seg, &table, &mut target).unwrap();

        let first = &target.data()[..8];
        assert_eq!(first, &[0, 0, 0, 0, 244, 67, 54, 255]);
        let last = &target.data()[target.data().len() - 4..];
        assert_eq!(last, &[255, 193, 7, 255]);
    }
}
