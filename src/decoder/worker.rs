use super::playback::PlaybackBitmap;
use super::rgb_conversion::frame_to_bitmap;
use super::{DecodeOptions, DecodeResult, DecodedFrame, Playback};
use crate::model::ImageResult;
use anyhow::Result;
use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{imageops, AnimationDecoder, Frame, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

/// Unified decode function that automatically handles both single frames and animations.
///
/// `target` is the requested size; `(0, 0)` or a size larger than the image
/// leaves the frames untouched.
pub fn decode_image(
    bytes: &[u8],
    target: (u32, u32),
    options: &DecodeOptions,
) -> Result<DecodeResult> {
    let start = Instant::now();

    let format = image::guess_format(bytes)?;
    log::info!("Decoding {:?} image ({} bytes)", format, bytes.len());

    if let Some(frames) = animation_frames(bytes, format)? {
        if frames.len() > 1 {
            log::info!("Detected animation, {} frames", frames.len());

            let frames: Vec<DecodedFrame> = frames
                .into_iter()
                .map(|frame| {
                    let (numer, denom) = frame.delay().numer_denom_ms();
                    let duration_ms = if denom == 0 { 0 } else { numer / denom };
                    rgba_frame(frame.into_buffer(), target, options, duration_ms)
                })
                .collect();

            log::info!("Decoded all {} frames in {:?}", frames.len(), start.elapsed());

            return Ok(DecodeResult::Animation(frames));
        }
    }

    // Single frame (also covers animated containers holding one frame)
    let buffer = image::load_from_memory_with_format(bytes, format)?.to_rgba8();
    let frame = rgba_frame(buffer, target, options, 0);

    log::info!("Decoded {}x{} in {:?}", frame.width, frame.height, start.elapsed());

    Ok(DecodeResult::SingleFrame(frame))
}

/// All frames of an animated GIF, WebP or APNG. `None` for formats or files
/// without animation support.
fn animation_frames(bytes: &[u8], format: ImageFormat) -> Result<Option<Vec<Frame>>> {
    let cursor = Cursor::new(bytes);

    let frames = match format {
        ImageFormat::Gif => GifDecoder::new(cursor)?.into_frames().collect_frames()?,
        ImageFormat::WebP => {
            let decoder = WebPDecoder::new(cursor)?;
            if !decoder.has_animation() {
                return Ok(None);
            }
            decoder.into_frames().collect_frames()?
        }
        ImageFormat::Png => {
            let decoder = PngDecoder::new(cursor)?;
            if !decoder.is_apng()? {
                return Ok(None);
            }
            decoder.apng()?.into_frames().collect_frames()?
        }
        _ => return Ok(None),
    };

    Ok(Some(frames))
}

fn rgba_frame(
    buffer: RgbaImage,
    target: (u32, u32),
    options: &DecodeOptions,
    duration_ms: u32,
) -> DecodedFrame {
    let fitted = if options.resize_to_fit {
        fit_within(buffer.width(), buffer.height(), target)
    } else {
        None
    };

    let buffer = match fitted {
        Some((width, height)) => imageops::thumbnail(&buffer, width, height),
        None => buffer,
    };

    let (width, height) = buffer.dimensions();
    DecodedFrame {
        rgba_data: buffer.into_raw(),
        width,
        height,
        duration_ms,
    }
}

/// Largest size with the same aspect ratio that fits inside `target`, or
/// `None` when no shrinking is needed
fn fit_within(width: u32, height: u32, target: (u32, u32)) -> Option<(u32, u32)> {
    let (target_width, target_height) = target;
    let unbounded = target_width == 0 || target_height == 0;
    if unbounded || (width <= target_width && height <= target_height) {
        return None;
    }

    let scale =
        (target_width as f64 / width as f64).min(target_height as f64 / height as f64);
    let fitted_width = ((width as f64 * scale).round() as u32).max(1);
    let fitted_height = ((height as f64 * scale).round() as u32).max(1);
    Some((fitted_width, fitted_height))
}

/// Turn decoded frames into the result handed to the bridge
pub fn into_image_result(result: DecodeResult, options: &DecodeOptions) -> Result<ImageResult> {
    match result {
        DecodeResult::SingleFrame(frame) => {
            Ok(ImageResult::single(frame_to_bitmap(frame, options)?))
        }
        DecodeResult::Animation(frames) => {
            let delays_ms: Vec<u32> = frames.iter().map(|frame| frame.duration_ms).collect();
            let bitmaps = frames
                .into_iter()
                .map(|frame| frame_to_bitmap(frame, options))
                .collect::<Result<Vec<_>, _>>()?;

            match options.playback {
                Playback::Frames => {
                    let duration = delays_ms.iter().map(|&ms| ms as f64).sum::<f64>() / 1000.0;
                    Ok(ImageResult::sequence(bitmaps, duration)?)
                }
                Playback::SingleBitmap => {
                    let playback = PlaybackBitmap::new(bitmaps, delays_ms)?;
                    Ok(ImageResult::animated(Arc::new(playback)))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Rgba};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let buffer = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        buffer
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn gif_bytes(frame_count: usize, delay_ms: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            let frames = (0..frame_count).map(|i| {
                let buffer = RgbaImage::from_pixel(4, 4, Rgba([(i * 60) as u8, 0, 0, 255]));
                Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(delay_ms, 1))
            });
            encoder.encode_frames(frames).unwrap();
        }
        bytes
    }

    /// Size of the first frame and the number of frames
    fn shape(result: &DecodeResult) -> (u32, u32, usize) {
        match result {
            DecodeResult::SingleFrame(frame) => (frame.width, frame.height, 1),
            DecodeResult::Animation(frames) => (frames[0].width, frames[0].height, frames.len()),
        }
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(200, 100, (0, 0)), None);
        assert_eq!(fit_within(200, 100, (400, 400)), None);
        assert_eq!(fit_within(200, 100, (100, 100)), Some((100, 50)));
        assert_eq!(fit_within(1000, 1, (10, 10)), Some((10, 1)));
    }

    #[test]
    fn test_decode_static_png() {
        let options = DecodeOptions::default();
        let result = decode_image(&png_bytes(8, 6), (0, 0), &options).unwrap();
        assert!(matches!(result, DecodeResult::SingleFrame(_)));
        assert_eq!(shape(&result), (8, 6, 1));

        let image = into_image_result(result, &options).unwrap();
        assert_eq!(image.frame_count(), 1);
        assert_eq!(image.duration(), 0.0);
        assert!(image.is_premultiplied());
    }

    #[test]
    fn test_decode_shrinks_to_target() {
        let result = decode_image(&png_bytes(40, 20), (10, 10), &DecodeOptions::default()).unwrap();
        assert_eq!(shape(&result), (10, 5, 1));
    }

    #[test]
    fn test_decode_keeps_size_without_resize() {
        let options = DecodeOptions {
            resize_to_fit: false,
            ..DecodeOptions::default()
        };
        let result = decode_image(&png_bytes(40, 20), (10, 10), &options).unwrap();
        assert_eq!(shape(&result), (40, 20, 1));
    }

    #[test]
    fn test_decode_gif_animation() {
        let options = DecodeOptions::default();
        let result = decode_image(&gif_bytes(3, 100), (0, 0), &options).unwrap();
        assert!(matches!(result, DecodeResult::Animation(_)));
        assert_eq!(shape(&result), (4, 4, 3));

        let image = into_image_result(result, &options).unwrap();
        assert_eq!(image.frame_count(), 3);
        assert_eq!(image.bitmap_count(), 3);
        assert!((image.duration() - 0.3).abs() < 1e-9);
        assert!(!image.is_single_bitmap_animated());
    }

    #[test]
    fn test_decode_gif_as_single_bitmap() {
        let options = DecodeOptions {
            playback: Playback::SingleBitmap,
            ..DecodeOptions::default()
        };
        let result = decode_image(&gif_bytes(2, 50), (0, 0), &options).unwrap();
        let image = into_image_result(result, &options).unwrap();

        assert!(image.is_single_bitmap_animated());
        assert_eq!(image.bitmap_count(), 1);
        assert_eq!(image.frame_count(), 2);
        assert!((image.duration() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let garbage = b"definitely not an image";
        assert!(decode_image(garbage, (0, 0), &DecodeOptions::default()).is_err());
    }
}
