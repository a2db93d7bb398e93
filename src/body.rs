//! Body-part categories and the fixed part→color map.

use crate::image::Color;

/// A body-part category, in the label order the segmentation model emits.
///
/// The discriminant of each variant is the label value that selects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPart {
    LeftFace = 0,
    RightFace = 1,
    LeftUpperArmFront = 2,
    LeftUpperArmBack = 3,
    RightUpperArmFront = 4,
    RightUpperArmBack = 5,
    LeftLowerArmFront = 6,
    LeftLowerArmBack = 7,
    RightLowerArmFront = 8,
    RightLowerArmBack = 9,
    LeftHand = 10,
    RightHand = 11,
    TorsoFront = 12,
    TorsoBack = 13,
    LeftUpperLegFront = 14,
    LeftUpperLegBack = 15,
    RightUpperLegFront = 16,
    RightUpperLegBack = 17,
    LeftLowerLegFront = 18,
    LeftLowerLegBack = 19,
    RightLowerLegFront = 20,
    RightLowerLegBack = 21,
    LeftFoot = 22,
    RightFoot = 23,
}

impl BodyPart {
    /// The number of body-part categories.
    pub const COUNT: usize = 24;
}

/// Highlight colors for each body part, indexed by label value.
///
/// Arms and legs share hues per limb segment, with front faces brighter than
/// back faces, so mirrored parts read as one limb on screen.
const PART_COLORS: [Color; BodyPart::COUNT] = [
    Color::from_rgba8(244, 67, 54, 255),  // left face
    Color::from_rgba8(183, 28, 28, 255),  // right face
    Color::from_rgba8(233, 30, 99, 255),  // left upper arm front
    Color::from_rgba8(136, 14, 79, 255),  // left upper arm back
    Color::from_rgba8(233, 30, 99, 255),  // right upper arm front
    Color::from_rgba8(136, 14, 79, 255),  // right upper arm back
    Color::from_rgba8(233, 30, 99, 255),  // left lower arm front
    Color::from_rgba8(136, 14, 79, 255),  // left lower arm back
    Color::from_rgba8(233, 30, 99, 255),  // right lower arm front
    Color::from_rgba8(136, 14, 79, 255),  // right lower arm back
    Color::from_rgba8(156, 39, 176, 255), // left hand
    Color::from_rgba8(156, 39, 176, 255), // right hand
    Color::from_rgba8(63, 81, 181, 255),  // torso front
    Color::from_rgba8(26, 35, 126, 255),  // torso back
    Color::from_rgba8(33, 150, 243, 255), // left upper leg front
    Color::from_rgba8(13, 71, 161, 255),  // left upper leg back
    Color::from_rgba8(33, 150, 243, 255), // right upper leg front
    Color::from_rgba8(13, 71, 161, 255),  // right upper leg back
    Color::from_rgba8(0, 188, 212, 255),  // left lower leg front
    Color::from_rgba8(0, 96, 100, 255),   // left lower leg back
    Color::from_rgba8(0, 188, 212, 255),  // right lower leg front
    Color::from_rgba8(0, 188, 212, 255),  // right lower leg back
    Color::from_rgba8(255, 193, 7, 255),  // left foot
    Color::from_rgba8(255, 193, 7, 255),  // right foot
];

/// An ordered label→color mapping, shared read-only by all renders.
#[derive(Debug, Clone)]
pub struct ColorTable {
    colors: Box<[Color]>,
}

impl ColorTable {
    /// Creates a color table from an ordered list of colors.
    ///
    /// The color at position `i` is used for label value `i`.
    pub fn new(colors: impl Into<Box<[Color]>>) -> Self {
        Self {
            colors: colors.into(),
        }
    }

    /// Returns the number of labels this table covers.
    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Looks up the color for a label value.
    ///
    /// Returns `None` for labels outside `[0, len)` (including the "no
    /// detection" label `-1`).
    #[inline]
    pub fn color(&self, label: i32) -> Option<Color> {
        usize::try_from(label)
            .ok()
            .and_then(|i| self.colors.get(i))
            .copied()
    }

    /// Looks up the color for a [`BodyPart`].
    #[inline]
    pub fn color_of(&self, part: BodyPart) -> Option<Color> {
        self.color(part as i32)
    }
}

/// The default table maps all 24 [`BodyPart`]s to the highlight palette.
impl Default for ColorTable {
    fn default() -> Self {
        Self::new(PART_COLORS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_covers_every_part() {
        let table = ColorTable::default();
        assert_eq!(table.len(), BodyPart::COUNT);
        assert_eq!(table.color(0), Some(Color::from_rgba8(244, 67, 54, 255)));
        assert_eq!(
            table.color_of(BodyPart::RightFoot),
            Some(Color::from_rgba8(255, 193, 7, 255)),
        );
    }

    #[test]
    fn out_of_range_labels_have_no_color() {
        let table = ColorTable::default();
        assert_eq!(table.color(-1), None);
        assert_eq!(table.color(BodyPart::COUNT as i32), None);
        assert_eq!(table.color(i32::MIN), None);
    }
}
