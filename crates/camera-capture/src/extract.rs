//! Frame extraction: raw YUV frame to upright, mirrored JPEG

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgb, RgbImage};
use tracing::trace;

use crate::frame::{EncodedImage, Frame, Rotation};
use crate::ExtractError;

/// JPEG quality used for every transmitted frame
pub const JPEG_QUALITY: u8 = 90;

/// Turns camera frames into images suitable for transmission
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    mirror: bool,
    quality: u8,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::front_facing()
    }
}

impl FrameExtractor {
    /// Create an extractor; `mirror` flips every frame horizontally
    pub fn new(mirror: bool) -> Self {
        Self {
            mirror,
            quality: JPEG_QUALITY,
        }
    }

    /// Extractor for a front-facing sensor (always mirrors)
    pub fn front_facing() -> Self {
        Self::new(true)
    }

    /// Whether frames are mirrored
    pub fn mirrors(&self) -> bool {
        self.mirror
    }

    /// Convert, rotate, mirror and encode a frame.
    ///
    /// The frame is consumed; its planes are released before encoding starts.
    pub fn extract(&self, frame: Frame) -> Result<EncodedImage, ExtractError> {
        let rotation = Rotation::try_from(frame.rotation_degrees)?;
        let sequence = frame.sequence;

        let nv21 = frame.to_nv21()?;
        let (width, height) = (frame.width, frame.height);
        drop(frame);

        let rgb = nv21_to_rgb(&nv21, width, height)?;
        let upright = self.orient(&rgb, rotation);
        let bytes = encode_jpeg(&upright, self.quality)?;

        trace!(
            "Extracted frame {} ({}x{}, rot {}) into {} bytes",
            sequence,
            upright.width(),
            upright.height(),
            rotation.degrees(),
            bytes.len()
        );

        Ok(EncodedImage {
            bytes,
            width: upright.width(),
            height: upright.height(),
            sequence,
        })
    }

    /// Apply the sensor rotation, then the mirror if enabled
    pub fn orient(&self, image: &RgbImage, rotation: Rotation) -> RgbImage {
        let rotated = rotate(image, rotation);
        if self.mirror {
            mirror(&rotated)
        } else {
            rotated
        }
    }
}

/// Rotate clockwise
pub fn rotate(image: &RgbImage, rotation: Rotation) -> RgbImage {
    match rotation {
        Rotation::Deg0 => image.clone(),
        Rotation::Deg90 => imageops::rotate90(image),
        Rotation::Deg180 => imageops::rotate180(image),
        Rotation::Deg270 => imageops::rotate270(image),
    }
}

/// Flip left to right
pub fn mirror(image: &RgbImage) -> RgbImage {
    imageops::flip_horizontal(image)
}

/// Convert an NV21 buffer to RGB using full-range BT.601 (JFIF) coefficients
pub fn nv21_to_rgb(nv21: &[u8], width: u32, height: u32) -> Result<RgbImage, ExtractError> {
    if width == 0 || height == 0 {
        return Err(ExtractError::EmptyFrame { width, height });
    }

    let (w, h) = (width as usize, height as usize);
    let (cw, ch) = crate::frame::chroma_dimensions(width, height);
    let luma_len = w * h;
    let expected = luma_len + 2 * cw * ch;
    if nv21.len() < expected {
        return Err(ExtractError::PlaneTooSmall {
            plane: "NV21",
            expected,
            actual: nv21.len(),
        });
    }

    let (luma, chroma) = nv21.split_at(luma_len);

    Ok(RgbImage::from_fn(width, height, |x, y| {
        let (col, row) = (x as usize, y as usize);
        let c = (row / 2) * cw * 2 + (col / 2) * 2;

        let l = luma[row * w + col] as f32;
        let cr = chroma[c] as f32 - 128.0;
        let cb = chroma[c + 1] as f32 - 128.0;

        Rgb([
            clamp_u8(l + 1.402 * cr),
            clamp_u8(l - 0.344_136 * cb - 0.714_136 * cr),
            clamp_u8(l + 1.772 * cb),
        ])
    }))
}

#[inline]
fn clamp_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ExtractError> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder.encode_image(image)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use proptest::prelude::*;

    const PATTERN_W: u32 = 48;
    const PATTERN_H: u32 = 32;
    const MARKER: u32 = 16;

    /// Upright pattern: white block in the top-left corner on black
    fn upright_pattern() -> GrayImage {
        GrayImage::from_fn(PATTERN_W, PATTERN_H, |x, y| {
            if x < MARKER && y < MARKER {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// What a front sensor mounted at `rotation` delivers for the upright pattern
    fn sensor_view(rotation: Rotation) -> GrayImage {
        let unmirrored = imageops::flip_horizontal(&upright_pattern());
        match rotation {
            Rotation::Deg0 => unmirrored,
            Rotation::Deg90 => imageops::rotate270(&unmirrored),
            Rotation::Deg180 => imageops::rotate180(&unmirrored),
            Rotation::Deg270 => imageops::rotate90(&unmirrored),
        }
    }

    fn gray_frame(luma: &GrayImage, rotation: Rotation) -> Frame {
        let (w, h) = luma.dimensions();
        let (cw, ch) = crate::frame::chroma_dimensions(w, h);
        let mut data = luma.as_raw().clone();
        data.extend(std::iter::repeat(128u8).take(2 * cw * ch));
        Frame::from_i420(&data, w, h)
            .unwrap()
            .with_rotation(rotation.degrees())
            .with_sequence(7, 0)
    }

    fn mean_luma(image: &GrayImage, x0: u32, y0: u32, size: u32) -> f32 {
        let mut sum = 0u32;
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                sum += image.get_pixel(x, y)[0] as u32;
            }
        }
        sum as f32 / (size * size) as f32
    }

    #[test]
    fn test_output_is_upright_for_every_rotation() {
        let extractor = FrameExtractor::front_facing();

        for rotation in [
            Rotation::Deg0,
            Rotation::Deg90,
            Rotation::Deg180,
            Rotation::Deg270,
        ] {
            let frame = gray_frame(&sensor_view(rotation), rotation);
            let encoded = extractor.extract(frame).unwrap();

            assert_eq!(encoded.width, PATTERN_W, "rotation {:?}", rotation);
            assert_eq!(encoded.height, PATTERN_H, "rotation {:?}", rotation);
            assert_eq!(encoded.sequence, 7);

            let decoded = image::load_from_memory(&encoded.bytes).unwrap().to_luma8();
            let top_left = mean_luma(&decoded, 2, 2, 10);
            let top_right = mean_luma(&decoded, PATTERN_W - 12, 2, 10);
            let bottom_right = mean_luma(&decoded, PATTERN_W - 12, PATTERN_H - 12, 10);

            assert!(top_left > 200.0, "rotation {:?}: {}", rotation, top_left);
            assert!(top_right < 50.0, "rotation {:?}: {}", rotation, top_right);
            assert!(bottom_right < 50.0, "rotation {:?}: {}", rotation, bottom_right);
        }
    }

    #[test]
    fn test_output_is_jpeg() {
        let frame = gray_frame(&upright_pattern(), Rotation::Deg0);
        let encoded = FrameExtractor::front_facing().extract(frame).unwrap();
        assert_eq!(&encoded.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_mirror_can_be_disabled() {
        let extractor = FrameExtractor::new(false);
        let image = RgbImage::from_fn(2, 1, |x, _| Rgb([x as u8, 0, 0]));

        let oriented = extractor.orient(&image, Rotation::Deg0);
        assert_eq!(oriented, image);
    }

    #[test]
    fn test_neutral_chroma_is_gray() {
        let nv21 = vec![100, 100, 100, 100, 128, 128];
        let rgb = nv21_to_rgb(&nv21, 2, 2).unwrap();
        for pixel in rgb.pixels() {
            assert_eq!(pixel.0, [100, 100, 100]);
        }
    }

    #[test]
    fn test_swapped_chroma_changes_colour() {
        // Strong red: high Cr, low Cb
        let red = vec![76, 76, 76, 76, 255, 85];
        let swapped = vec![76, 76, 76, 76, 85, 255];

        let rgb = nv21_to_rgb(&red, 2, 2).unwrap();
        let wrong = nv21_to_rgb(&swapped, 2, 2).unwrap();

        let p = rgb.get_pixel(0, 0).0;
        assert!(p[0] > 200 && p[2] < 60, "{:?}", p);
        assert_ne!(rgb.get_pixel(0, 0), wrong.get_pixel(0, 0));
    }

    #[test]
    fn test_truncated_buffer_is_rejected() {
        assert!(matches!(
            nv21_to_rgb(&[0; 5], 2, 2),
            Err(ExtractError::PlaneTooSmall { .. })
        ));
    }

    #[test]
    fn test_bad_rotation_drops_frame() {
        let frame = gray_frame(&upright_pattern(), Rotation::Deg0).with_rotation(45);
        assert!(matches!(
            FrameExtractor::front_facing().extract(frame),
            Err(ExtractError::UnsupportedRotation(45))
        ));
    }

    fn rgb_image() -> impl Strategy<Value = RgbImage> {
        (1u32..12, 1u32..12).prop_flat_map(|(w, h)| {
            proptest::collection::vec(any::<u8>(), (w * h * 3) as usize)
                .prop_map(move |raw| RgbImage::from_raw(w, h, raw).unwrap())
        })
    }

    fn is_horizontal_palindrome(image: &RgbImage) -> bool {
        let w = image.width();
        image
            .enumerate_pixels()
            .all(|(x, y, p)| p == image.get_pixel(w - 1 - x, y))
    }

    proptest! {
        #[test]
        fn prop_mirror_twice_is_identity(image in rgb_image()) {
            prop_assert_eq!(mirror(&mirror(&image)), image);
        }

        #[test]
        fn prop_mirror_reorders_asymmetric_rows(image in rgb_image()) {
            prop_assume!(!is_horizontal_palindrome(&image));
            prop_assert_ne!(mirror(&image), image);
        }

        #[test]
        fn prop_four_quarter_turns_are_identity(image in rgb_image()) {
            let mut turned = image.clone();
            for _ in 0..4 {
                turned = rotate(&turned, Rotation::Deg90);
            }
            prop_assert_eq!(turned, image);
        }
    }
}
