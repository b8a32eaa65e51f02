//! Adapter image bridge.
//!
//! Lets a host engine hand image requests to a pluggable [`ImageAdapter`]
//! and get decoded bitmaps back. The [`Bridge`] tracks pending requests,
//! forwards cancellation and turns each adapter completion into a
//! [`FinishNotification`] for the native side. [`DecodingAdapter`] is a
//! ready-made adapter that loads files and URLs with the `image` crate.

pub mod adapter;
pub mod bridge;
pub mod decoder;
pub mod model;
pub mod native;

pub use adapter::{ImageAdapter, LogLevel, RequestHandle, RequestInfo, StringMap};
pub use bridge::{Bridge, BridgeConfig, FinishListener, FinishNotification, ResponseSink};
pub use decoder::{DecodeOptions, DecodingAdapter};
pub use model::{AlphaType, AnimatedBitmap, Bitmap, ColorType, ImageError, ImageResult};
pub use native::{NativeImageProvider, PlatformImage};
