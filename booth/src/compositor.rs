use image::{imageops, ImageReader, RgbaImage};
use lovelens_common::filter::FilterKind;
use lovelens_common::frame::CapturedFrame;
use std::io::Cursor;

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("source frame not ready")]
    FrameNotReady,
    #[error("failed to decode frame: {0}")]
    Decode(image::ImageError),
    #[error("failed to encode still: {0}")]
    Encode(image::ImageError),
}

/// A square, filter-applied still. Pixels stay lossless in memory; PNG
/// encoding happens on demand for delivery and export.
#[derive(Debug, Clone)]
pub struct StillImage {
    pixels: RgbaImage,
}

impl StillImage {
    pub fn size_px(&self) -> u32 {
        self.pixels.width()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, ComposeError> {
        let mut out = Cursor::new(Vec::new());
        self.pixels
            .write_to(&mut out, image::ImageFormat::Png)
            .map_err(ComposeError::Encode)?;
        Ok(out.into_inner())
    }
}

/// Decode a camera frame and produce the square, filtered still.
pub fn compose(frame: &CapturedFrame, filter: FilterKind) -> Result<StillImage, ComposeError> {
    let img = ImageReader::new(Cursor::new(&frame.data))
        .with_guessed_format()
        .map_err(|e| ComposeError::Decode(image::ImageError::IoError(e)))?
        .decode()
        .map_err(ComposeError::Decode)?;
    compose_rgba(img.to_rgba8(), filter)
}

/// Center-crop to the largest square and apply the filter. The crop side is
/// `min(w, h)`; offsets are `(w - size) / 2` and `(h - size) / 2`, so the
/// crop is centered within one pixel for odd differences.
pub fn compose_rgba(img: RgbaImage, filter: FilterKind) -> Result<StillImage, ComposeError> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(ComposeError::FrameNotReady);
    }
    let size = w.min(h);
    let x_offset = (w - size) / 2;
    let y_offset = (h - size) / 2;

    let mut square = imageops::crop_imm(&img, x_offset, y_offset, size, size).to_image();
    if filter != FilterKind::None {
        for px in square.pixels_mut() {
            px.0 = filter.apply_pixel(px.0);
        }
    }
    Ok(StillImage { pixels: square })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Test frame where every pixel encodes its source coordinates, so crop
    /// offsets are observable in the output.
    fn coordinate_image(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    #[test]
    fn landscape_frame_is_center_cropped() {
        // 1280x720 -> 720x720 at x-offset 280, y-offset 0.
        let still = compose_rgba(coordinate_image(1280, 720), FilterKind::None).unwrap();
        assert_eq!(still.size_px(), 720);
        assert_eq!(still.pixels().height(), 720);
        assert_eq!(still.pixels().get_pixel(0, 0).0[0], (280 % 256) as u8);
        assert_eq!(still.pixels().get_pixel(719, 0).0[0], ((280 + 719) % 256) as u8);
        assert_eq!(still.pixels().get_pixel(0, 719).0[1], (719 % 256) as u8);
    }

    #[test]
    fn portrait_frame_is_center_cropped() {
        // 720x1280 -> 720x720 at y-offset 280.
        let still = compose_rgba(coordinate_image(720, 1280), FilterKind::None).unwrap();
        assert_eq!(still.size_px(), 720);
        assert_eq!(still.pixels().get_pixel(0, 0).0[1], (280 % 256) as u8);
    }

    #[test]
    fn odd_difference_centers_within_one_pixel() {
        // 5x4 -> size 4, x-offset (5-4)/2 = 0.
        let still = compose_rgba(coordinate_image(5, 4), FilterKind::None).unwrap();
        assert_eq!(still.size_px(), 4);
        assert_eq!(still.pixels().get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn none_filter_is_identity_on_pixels() {
        let img = coordinate_image(64, 64);
        let still = compose_rgba(img.clone(), FilterKind::None).unwrap();
        assert_eq!(still.pixels().as_raw(), img.as_raw());
    }

    #[test]
    fn monochrome_output_is_desaturated() {
        let still = compose_rgba(coordinate_image(1280, 720), FilterKind::Monochrome).unwrap();
        assert_eq!(still.size_px(), 720);
        for px in still.pixels().pixels() {
            assert_eq!(px.0[0], px.0[1]);
            assert_eq!(px.0[1], px.0[2]);
        }
    }

    #[test]
    fn zero_dimension_frame_is_not_ready() {
        let img = RgbaImage::new(0, 720);
        assert!(matches!(
            compose_rgba(img, FilterKind::None),
            Err(ComposeError::FrameNotReady)
        ));
    }

    #[test]
    fn compose_decodes_encoded_frames() {
        let mut png = Cursor::new(Vec::new());
        coordinate_image(300, 200)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();
        let frame = CapturedFrame::new(png.into_inner(), 0, 0);
        let still = compose(&frame, FilterKind::None).unwrap();
        assert_eq!(still.size_px(), 200);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let frame = CapturedFrame::new(vec![0xDE, 0xAD, 0xBE, 0xEF], 0, 0);
        assert!(matches!(
            compose(&frame, FilterKind::None),
            Err(ComposeError::Decode(_))
        ));
    }

    #[test]
    fn encode_png_round_trips_dimensions() {
        let still = compose_rgba(coordinate_image(64, 48), FilterKind::Soft).unwrap();
        let png = still.encode_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 48);
        assert_eq!(decoded.height(), 48);
    }
}
