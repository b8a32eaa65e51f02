use crate::model::{AnimatedBitmap, Bitmap, ImageError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

const MIN_FRAME_MS: u32 = 16; // Minimum 16ms (60fps)

struct Inner {
    frames: Vec<Bitmap>,
    delays_ms: Vec<u32>,
    current: Mutex<usize>,
    running: AtomicBool,
    generation: AtomicU64,
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }

    fn current_delay(&self) -> Duration {
        let index = *self.current.lock();
        let delay_ms = self.delays_ms.get(index).copied().unwrap_or(100);
        Duration::from_millis(delay_ms.max(MIN_FRAME_MS) as u64)
    }

    fn advance(&self) {
        let mut current = self.current.lock();
        *current = (*current + 1) % self.frames.len();
    }
}

/// An animation played back into a single buffer.
///
/// While started, a ticker thread advances the buffer to the next frame
/// after each frame's delay. The thread exits on `stop` or once the last
/// handle to the bitmap is dropped.
#[derive(Clone)]
pub struct PlaybackBitmap {
    inner: Arc<Inner>,
}

impl PlaybackBitmap {
    pub fn new(frames: Vec<Bitmap>, delays_ms: Vec<u32>) -> Result<Self, ImageError> {
        if frames.is_empty() {
            return Err(ImageError::EmptySequence);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                frames,
                delays_ms,
                current: Mutex::new(0),
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        })
    }

    pub fn current_frame(&self) -> usize {
        *self.inner.current.lock()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }
}

impl AnimatedBitmap for PlaybackBitmap {
    fn buffer_bitmap(&self) -> Bitmap {
        let index = *self.inner.current.lock();
        self.inner.frames[index].clone()
    }

    fn duration(&self) -> f64 {
        self.inner.delays_ms.iter().map(|&ms| ms as f64).sum::<f64>() / 1000.0
    }

    fn frame_count(&self) -> u32 {
        self.inner.frames.len() as u32
    }

    fn start(&self) {
        if self.inner.frames.len() < 2 || self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::downgrade(&self.inner);
        let spawned = thread::Builder::new()
            .name("adapter-image-playback".to_string())
            .spawn(move || run_playback(inner, generation));

        match spawned {
            Ok(_) => {
                log::debug!("Animation playback: PLAYING ({} frames)", self.inner.frames.len())
            }
            Err(e) => {
                log::error!("Failed to start playback thread: {}", e);
                self.inner.running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn stop(&self) {
        if self.inner.running.swap(false, Ordering::SeqCst) {
            log::debug!("Animation playback: PAUSED at frame {}", self.current_frame());
        }
    }
}

fn run_playback(inner: Weak<Inner>, generation: u64) {
    loop {
        let delay = match inner.upgrade() {
            Some(inner) if inner.is_current(generation) => inner.current_delay(),
            _ => return,
        };

        thread::sleep(delay);

        match inner.upgrade() {
            Some(inner) if inner.is_current(generation) => inner.advance(),
            _ => return,
        }
    }
}
