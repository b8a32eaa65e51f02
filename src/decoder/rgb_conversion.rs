use super::{DecodeOptions, DecodedFrame, PixelOrder};
use crate::model::{AlphaType, Bitmap, ColorType, ImageError};

/// Multiply color channels of interleaved RGBA8 pixels by their alpha, in place
pub fn premultiply_rgba8(rgba: &mut [u8]) {
    for pixel in rgba.chunks_exact_mut(4) {
        let alpha = pixel[3] as u16;
        if alpha == 255 {
            continue;
        }
        for channel in &mut pixel[..3] {
            *channel = ((*channel as u16 * alpha + 127) / 255) as u8;
        }
    }
}

/// Swap the first and third byte of every 4-byte pixel (RGBA <-> BGRA)
pub fn swap_red_blue(pixels: &mut [u8]) {
    for pixel in pixels.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
}

/// Convert a decoded RGBA8 frame into the bitmap layout `options` asks for
pub fn frame_to_bitmap(frame: DecodedFrame, options: &DecodeOptions) -> Result<Bitmap, ImageError> {
    let mut pixels = frame.rgba_data;

    if options.premultiply {
        premultiply_rgba8(&mut pixels);
    }

    let color_type = match options.pixel_order {
        PixelOrder::Rgba => ColorType::Rgba8888,
        PixelOrder::Bgra => {
            swap_red_blue(&mut pixels);
            ColorType::Bgra8888
        }
    };

    let alpha_type = if options.premultiply {
        AlphaType::Premul
    } else {
        AlphaType::Unpremul
    };

    Bitmap::new(
        pixels,
        frame.width,
        frame.height,
        frame.width as usize * 4,
        color_type,
        alpha_type,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premultiply_half_alpha() {
        let mut rgba = vec![200, 100, 50, 128];
        premultiply_rgba8(&mut rgba);
        assert_eq!(rgba, vec![100, 50, 25, 128]);
    }

    #[test]
    fn test_premultiply_extremes() {
        let mut rgba = vec![10, 20, 30, 255, 10, 20, 30, 0];
        premultiply_rgba8(&mut rgba);
        assert_eq!(rgba, vec![10, 20, 30, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn test_swap_red_blue() {
        let mut pixels = vec![1, 2, 3, 4, 5, 6, 7, 8];
        swap_red_blue(&mut pixels);
        assert_eq!(pixels, vec![3, 2, 1, 4, 7, 6, 5, 8]);
    }

    #[test]
    fn test_frame_to_bgra_bitmap() {
        let frame = DecodedFrame {
            rgba_data: vec![255, 0, 0, 255],
            width: 1,
            height: 1,
            duration_ms: 0,
        };
        let options = DecodeOptions {
            pixel_order: PixelOrder::Bgra,
            ..DecodeOptions::default()
        };

        let bitmap = frame_to_bitmap(frame, &options).unwrap();
        assert_eq!(bitmap.color_type(), ColorType::Bgra8888);
        assert_eq!(bitmap.alpha_type(), AlphaType::Premul);
        assert_eq!(bitmap.pixels(), &[0, 0, 255, 255]);
    }

    #[test]
    fn test_frame_without_premultiply() {
        let frame = DecodedFrame {
            rgba_data: vec![200, 100, 50, 128],
            width: 1,
            height: 1,
            duration_ms: 0,
        };
        let options = DecodeOptions {
            premultiply: false,
            ..DecodeOptions::default()
        };

        let bitmap = frame_to_bitmap(frame, &options).unwrap();
        assert_eq!(bitmap.alpha_type(), AlphaType::Unpremul);
        assert_eq!(bitmap.pixels(), &[200, 100, 50, 128]);
    }
}
