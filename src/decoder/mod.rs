//! Reference adapter: fetches bytes, decodes them with the `image` crate and
//! reports the result through the bridge.

pub mod adapter;
pub mod fetch;
pub mod playback;
pub mod rgb_conversion;
pub mod worker;

pub use adapter::{CancelHandle, DecodingAdapter};
pub use playback::PlaybackBitmap;

use crate::adapter::StringMap;

/// Result of a frame decode operation
#[derive(Clone)]
pub struct DecodedFrame {
    pub rgba_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub duration_ms: u32, // Frame duration for animations
}

/// Result of decoding an image (single or animated)
pub enum DecodeResult {
    SingleFrame(DecodedFrame),
    Animation(Vec<DecodedFrame>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelOrder {
    Rgba,
    Bgra,
}

/// How an animation is handed back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    /// Every frame as its own bitmap
    Frames,
    /// One buffer the adapter keeps updating between `start` and `stop`
    SingleBitmap,
}

/// Decode options read from request parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub premultiply: bool,
    pub pixel_order: PixelOrder,
    pub resize_to_fit: bool,
    pub playback: Playback,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            premultiply: true, // Premultiply alpha for better compositing
            pixel_order: PixelOrder::Rgba,
            resize_to_fit: true,
            playback: Playback::Frames,
        }
    }
}

impl DecodeOptions {
    /// Recognized keys: `premultiply`, `color`, `resize`, `playback`.
    /// Unrecognized values keep the default.
    pub fn from_parameters(parameters: &StringMap) -> Self {
        let mut options = Self::default();

        if let Some(value) = parameters.get("premultiply") {
            match value.as_str() {
                "true" => options.premultiply = true,
                "false" => options.premultiply = false,
                other => log::warn!("Unknown premultiply value {:?}", other),
            }
        }

        if let Some(value) = parameters.get("color") {
            match value.as_str() {
                "rgba" => options.pixel_order = PixelOrder::Rgba,
                "bgra" => options.pixel_order = PixelOrder::Bgra,
                other => log::warn!("Unknown color value {:?}", other),
            }
        }

        if let Some(value) = parameters.get("resize") {
            match value.as_str() {
                "fit" => options.resize_to_fit = true,
                "none" => options.resize_to_fit = false,
                other => log::warn!("Unknown resize value {:?}", other),
            }
        }

        if let Some(value) = parameters.get("playback") {
            match value.as_str() {
                "frames" => options.playback = Playback::Frames,
                "single-bitmap" => options.playback = Playback::SingleBitmap,
                other => log::warn!("Unknown playback value {:?}", other),
            }
        }

        options
    }
}
