use crate::model::{Bitmap, ImageResult};
use smallvec::SmallVec;
use smol::channel::{Sender, TrySendError};

/// What the native caller learns when a request finishes
#[derive(Debug, Clone)]
pub struct FinishNotification {
    pub id: String,
    pub image: Option<ImageResult>,
    /// Most results carry a single bitmap
    pub bitmaps: SmallVec<[Bitmap; 1]>,
    pub bitmap_count: usize,
    pub frame_count: u32,
    /// Seconds
    pub duration: f64,
    pub is_single_bitmap_animated: bool,
    pub is_premultiplied: bool,
}

impl FinishNotification {
    /// A missing image yields zero bitmaps, one frame, no duration, not
    /// animated and not premultiplied.
    pub fn new(id: impl Into<String>, image: Option<ImageResult>) -> Self {
        let id = id.into();
        match image {
            Some(image) => Self {
                id,
                bitmaps: image.bitmaps().iter().cloned().collect(),
                bitmap_count: image.bitmap_count(),
                frame_count: image.frame_count(),
                duration: image.duration(),
                is_single_bitmap_animated: image.is_single_bitmap_animated(),
                is_premultiplied: image.is_premultiplied(),
                image: Some(image),
            },
            None => Self {
                id,
                image: None,
                bitmaps: SmallVec::new(),
                bitmap_count: 0,
                frame_count: 1,
                duration: 0.0,
                is_single_bitmap_animated: false,
                is_premultiplied: false,
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        self.image.is_none()
    }
}

/// One-way delivery of finish notifications to the native side.
///
/// Called from whichever thread the adapter finishes on; must not block.
pub trait FinishListener: Send + Sync {
    fn on_finish(&self, notification: FinishNotification);
}

impl FinishListener for Sender<FinishNotification> {
    fn on_finish(&self, notification: FinishNotification) {
        match self.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(notification)) => {
                log::warn!("Finish channel full, dropping notification for {}", notification.id);
            }
            Err(TrySendError::Closed(notification)) => {
                log::debug!("Finish channel closed, dropping notification for {}", notification.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AlphaType;

    #[test]
    fn test_failure_defaults() {
        let notification = FinishNotification::new("t1", None);
        assert!(notification.is_failure());
        assert!(notification.bitmaps.is_empty());
        assert_eq!(notification.bitmap_count, 0);
        assert_eq!(notification.frame_count, 1);
        assert_eq!(notification.duration, 0.0);
        assert!(!notification.is_single_bitmap_animated);
        assert!(!notification.is_premultiplied);
    }

    #[test]
    fn test_sequence_fields() {
        let frame = Bitmap::from_rgba8(vec![0u8; 16], 2, 2, AlphaType::Premul).unwrap();
        let image = ImageResult::sequence(vec![frame; 3], 0.5).unwrap();
        let notification = FinishNotification::new("t1", Some(image));

        assert_eq!(notification.bitmap_count, 3);
        assert_eq!(notification.bitmaps.len(), 3);
        assert_eq!(notification.frame_count, 3);
        assert_eq!(notification.duration, 0.5);
        assert!(notification.is_premultiplied);
        assert!(!notification.is_single_bitmap_animated);
    }

    #[test]
    fn test_closed_channel_drops_quietly() {
        let (sender, receiver) = smol::channel::unbounded();
        drop(receiver);
        sender.on_finish(FinishNotification::new("t1", None));
    }
}
