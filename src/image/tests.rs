use super::*;
use Color as C;

fn mkimage<const W: usize, const H: usize>(data: [[Color; W]; H]) -> Image {
    let data = data
        .into_iter()
        .flat_map(|row| row.into_iter())
        .flat_map(|col| col.0)
        .collect::<Vec<_>>();
    Image::from_rgba8(Resolution::new(W as u32, H as u32), &data)
}

#[test]
fn new_image_is_transparent() {
    let image = Image::new(Resolution::new(2, 2));
    assert!(image.data().iter().all(|&b| b == 0));
}

#[test]
fn from_rgba8_round_trips() {
    let image = mkimage([[C::WHITE, C::BLACK], [C::NONE, C::from_rgb8(1, 2, 3)]]);
    assert_eq!(image.resolution(), Resolution::new(2, 2));
    assert_eq!(
        image.data(),
        &[255, 255, 255, 255, 0, 0, 0, 255, 0, 0, 0, 0, 1, 2, 3, 255],
    );
}

#[test]
#[should_panic]
fn from_rgba8_rejects_short_buffer() {
    Image::from_rgba8(Resolution::new(2, 2), &[0; 12]);
}

#[test]
fn clear_overwrites_every_pixel() {
    let mut image = mkimage([[C::WHITE, C::BLACK]]);
    image.clear(C::from_rgba8(9, 8, 7, 6));
    assert_eq!(image.data(), &[9, 8, 7, 6, 9, 8, 7, 6]);
}

#[test]
fn copy_from_reuses_matching_allocation() {
    let src = mkimage([[C::WHITE, C::BLACK]]);
    let mut dest = Image::new(Resolution::new(2, 1));
    let ptr = dest.data().as_ptr();
    dest.copy_from(&src);
    assert_eq!(dest.data(), src.data());
    assert_eq!(dest.data().as_ptr(), ptr);
}

#[test]
fn copy_from_resizes_on_mismatch() {
    let src = mkimage([[C::WHITE], [C::BLACK]]);
    let mut dest = Image::new(Resolution::new(3, 3));
    dest.copy_from(&src);
    assert_eq!(dest.resolution(), Resolution::new(1, 2));
    assert_eq!(dest.data(), src.data());
}

#[test]
fn data_mut_writes_through() {
    let mut image = Image::new(Resolution::new(1, 1));
    image.data_mut().copy_from_slice(&[1, 2, 3, 4]);
    assert_eq!(image.data(), &[1, 2, 3, 4]);
}
