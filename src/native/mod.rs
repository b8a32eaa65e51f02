//! The engine side of the bridge.
//!
//! The engine identifies requests by numeric id and wants a callback per
//! request. [`NativeImageProvider`] maps those onto the string ids the
//! bridge uses, drains finish notifications and turns each into a
//! [`PlatformImage`] the engine can decode frames from.

use crate::adapter::RequestInfo;
use crate::bridge::{encode_params, Bridge, FinishNotification};
use crate::model::{Bitmap, ImageResult};
use parking_lot::Mutex;
use smallvec::SmallVec;
use smol::channel::Receiver;
use std::collections::HashMap;
use std::sync::Arc;

pub type RequestId = u32;

pub const INFINITE_LOOP: i32 = -1;

/// Invoked once per request with the delivered image, or `None` on failure
pub type RequestCallback = Box<dyn FnOnce(Option<PlatformImage>) + Send>;

enum PlatformSource {
    Frames(SmallVec<[Bitmap; 1]>),
    /// Started on delivery, stopped when the platform image is dropped
    Animated(ImageResult),
}

/// A delivered image as the engine sees it
pub struct PlatformImage {
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
    pub repetition_count: i32,
    pub duration_ms: u32,
    pub is_premultiplied: bool,
    source: PlatformSource,
}

impl PlatformImage {
    /// `None` for failures and for shapes the engine cannot display
    fn from_notification(notification: FinishNotification) -> Option<Self> {
        let FinishNotification {
            id,
            image,
            bitmaps,
            frame_count,
            duration,
            is_single_bitmap_animated,
            is_premultiplied,
            ..
        } = notification;

        let image = image?;
        let first = bitmaps.first()?;
        let (width, height) = (first.width(), first.height());

        let source = if is_single_bitmap_animated {
            if bitmaps.len() != 1 {
                log::error!(
                    "Animated image {} carries {} bitmaps, expected one",
                    id,
                    bitmaps.len()
                );
                return None;
            }
            image.start();
            PlatformSource::Animated(image)
        } else {
            PlatformSource::Frames(bitmaps)
        };

        let (frame_count, duration_ms) = if frame_count > 1 {
            (frame_count, (duration * 1000.0) as u32)
        } else {
            (1, 0)
        };

        Some(Self {
            width,
            height,
            frame_count,
            repetition_count: INFINITE_LOOP,
            duration_ms,
            is_premultiplied,
            source,
        })
    }

    pub fn is_single_bitmap_animated(&self) -> bool {
        matches!(self.source, PlatformSource::Animated(_))
    }

    /// Pixels for `frame_index`.
    ///
    /// Animated images return a private copy of the current buffer. Other
    /// images return the requested frame, or the first frame when the index
    /// is out of range.
    pub fn decode(&self, frame_index: usize) -> Option<Bitmap> {
        match &self.source {
            PlatformSource::Animated(ImageResult::Animated(animated)) => {
                Some(animated.source().buffer_bitmap().deep_copy())
            }
            PlatformSource::Animated(_) => None,
            PlatformSource::Frames(frames) => {
                frames.get(frame_index).or_else(|| frames.first()).cloned()
            }
        }
    }
}

impl Drop for PlatformImage {
    fn drop(&mut self) {
        if let PlatformSource::Animated(image) = &self.source {
            image.stop();
        }
    }
}

/// Engine-facing front of a [`Bridge`]
pub struct NativeImageProvider {
    bridge: Arc<Bridge>,
    receiver: Receiver<FinishNotification>,
    callbacks: Mutex<HashMap<RequestId, RequestCallback>>,
}

impl NativeImageProvider {
    /// `receiver` must be the other end of the channel `bridge` notifies
    pub fn new(bridge: Arc<Bridge>, receiver: Receiver<FinishNotification>) -> Self {
        Self {
            bridge,
            receiver,
            callbacks: Mutex::new(HashMap::new()),
        }
    }

    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }

    /// Returns `false`, and drops `callback` without calling it, when the
    /// bridge rejects the request.
    pub fn request(&self, rid: RequestId, info: &RequestInfo, callback: RequestCallback) -> bool {
        self.callbacks.lock().insert(rid, callback);

        let accepted = self.bridge.request(
            &rid.to_string(),
            &info.url,
            info.target_width,
            info.target_height,
            &encode_params(&info.parameters),
            &encode_params(&info.extra_info),
        );

        if !accepted {
            log::warn!("Image request {} for {} rejected", rid, info.url);
            self.callbacks.lock().remove(&rid);
        }
        accepted
    }

    /// The callback for `rid` is dropped without being called
    pub fn cancel(&self, rid: RequestId) {
        self.bridge.cancel(&rid.to_string());
        self.callbacks.lock().remove(&rid);
    }

    /// Callbacks still waiting for a notification
    pub fn pending_count(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Handle every notification already queued, without waiting.
    /// Returns how many were handled.
    pub fn dispatch_pending(&self) -> usize {
        let mut handled = 0;
        while let Ok(notification) = self.receiver.try_recv() {
            self.dispatch(notification);
            handled += 1;
        }
        handled
    }

    /// Wait for the next notification and handle it. Returns `false` once
    /// the channel is closed.
    pub async fn dispatch_next(&self) -> bool {
        match self.receiver.recv().await {
            Ok(notification) => {
                self.dispatch(notification);
                true
            }
            Err(_) => false,
        }
    }

    /// Dispatch notifications until no callback is waiting or the channel
    /// closes
    pub async fn run(&self) {
        while self.pending_count() > 0 {
            if !self.dispatch_next().await {
                break;
            }
        }
    }

    fn dispatch(&self, notification: FinishNotification) {
        let rid = match notification.id.parse::<RequestId>() {
            Ok(rid) => rid,
            Err(_) => {
                log::warn!("Ignoring notification for foreign request id {:?}", notification.id);
                return;
            }
        };

        let Some(callback) = self.callbacks.lock().remove(&rid) else {
            log::debug!("No callback for request {}, already cancelled", rid);
            return;
        };

        callback(PlatformImage::from_notification(notification));
    }
}
