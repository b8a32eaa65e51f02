//! Decoded image results handed from an adapter back to the bridge.
//!
//! An adapter builds one [`ImageResult`] per finished request. Three shapes
//! exist (a single frame, a sequence of frames, and a live animated bitmap
//! that decodes progressively into one buffer) and all of them answer the
//! same questions: how many frames, how many bitmaps, how long, animated or not.

pub mod bitmap;

pub use bitmap::{AlphaType, Bitmap, ColorType};

use std::fmt;
use std::slice;
use std::sync::Arc;

/// Errors raised while building image results
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("frame sequence must contain at least one bitmap")]
    EmptySequence,
    #[error("row of {bytes_per_row} bytes is shorter than the {required} bytes a row needs")]
    RowTooShort { bytes_per_row: usize, required: usize },
    #[error("pixel buffer holds {actual} bytes but {required} are required")]
    BufferTooSmall { actual: usize, required: usize },
}

/// An adapter-owned bitmap whose frames are decoded progressively into a
/// single buffer.
///
/// The adapter is responsible for scheduling frames between `start` and
/// `stop`; consumers only read the current buffer.
pub trait AnimatedBitmap: Send + Sync {
    fn buffer_bitmap(&self) -> Bitmap;
    /// Total duration in seconds
    fn duration(&self) -> f64;
    fn frame_count(&self) -> u32;
    fn start(&self);
    fn stop(&self);
}

/// An ordered, non-empty list of fully decoded frames
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<Bitmap>,
    duration: f64,
}

impl FrameSequence {
    /// A negative `duration` is replaced by one second.
    pub fn new(frames: Vec<Bitmap>, duration: f64) -> Result<Self, ImageError> {
        if frames.is_empty() {
            return Err(ImageError::EmptySequence);
        }

        let duration = if duration < 0.0 { 1.0 } else { duration };
        Ok(Self { frames, duration })
    }

    pub fn frames(&self) -> &[Bitmap] {
        &self.frames
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

/// A live [`AnimatedBitmap`] plus the snapshot and metrics captured when the
/// result was built
#[derive(Clone)]
pub struct AnimatedImage {
    source: Arc<dyn AnimatedBitmap>,
    snapshot: Bitmap,
    duration: f64,
    frame_count: u32,
}

impl AnimatedImage {
    pub fn new(source: Arc<dyn AnimatedBitmap>) -> Self {
        let snapshot = source.buffer_bitmap();
        let duration = source.duration();
        let frame_count = source.frame_count();
        Self {
            source,
            snapshot,
            duration,
            frame_count,
        }
    }

    pub fn snapshot(&self) -> &Bitmap {
        &self.snapshot
    }

    pub fn source(&self) -> &Arc<dyn AnimatedBitmap> {
        &self.source
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }
}

impl fmt::Debug for AnimatedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimatedImage")
            .field("snapshot", &self.snapshot)
            .field("duration", &self.duration)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

/// A finished image request
#[derive(Debug, Clone)]
pub enum ImageResult {
    Single(Bitmap),
    Sequence(FrameSequence),
    Animated(AnimatedImage),
}

impl ImageResult {
    pub fn single(bitmap: Bitmap) -> Self {
        ImageResult::Single(bitmap)
    }

    pub fn sequence(frames: Vec<Bitmap>, duration: f64) -> Result<Self, ImageError> {
        FrameSequence::new(frames, duration).map(ImageResult::Sequence)
    }

    pub fn animated(source: Arc<dyn AnimatedBitmap>) -> Self {
        ImageResult::Animated(AnimatedImage::new(source))
    }

    /// Bitmaps carried by this result. The animated variant exposes its
    /// snapshot only.
    pub fn bitmaps(&self) -> &[Bitmap] {
        match self {
            ImageResult::Single(bitmap) => slice::from_ref(bitmap),
            ImageResult::Sequence(sequence) => sequence.frames(),
            ImageResult::Animated(animated) => slice::from_ref(animated.snapshot()),
        }
    }

    pub fn bitmap_count(&self) -> usize {
        self.bitmaps().len()
    }

    pub fn bitmap(&self, index: usize) -> Option<&Bitmap> {
        self.bitmaps().get(index)
    }

    pub fn first_bitmap(&self) -> Option<&Bitmap> {
        self.bitmap(0)
    }

    pub fn frame_count(&self) -> u32 {
        match self {
            ImageResult::Single(_) => 1,
            ImageResult::Sequence(sequence) => sequence.frames().len() as u32,
            ImageResult::Animated(animated) => animated.frame_count(),
        }
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        match self {
            ImageResult::Single(_) => 0.0,
            ImageResult::Sequence(sequence) => sequence.duration(),
            ImageResult::Animated(animated) => animated.duration(),
        }
    }

    pub fn is_multiframe(&self) -> bool {
        self.frame_count() > 1
    }

    pub fn is_single_bitmap_animated(&self) -> bool {
        matches!(self, ImageResult::Animated(_))
    }

    pub fn is_premultiplied(&self) -> bool {
        self.first_bitmap().is_some_and(Bitmap::is_premultiplied)
    }

    pub fn start(&self) {
        if let ImageResult::Animated(animated) = self {
            animated.source().start();
        }
    }

    pub fn stop(&self) {
        if let ImageResult::Animated(animated) = self {
            animated.source().stop();
        }
    }
}
