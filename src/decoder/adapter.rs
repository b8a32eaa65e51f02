use super::{fetch, worker, DecodeOptions};
use crate::adapter::{ImageAdapter, RequestHandle, StringMap};
use crate::bridge::ResponseSink;
use crate::model::ImageResult;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cancellation flag shared between the bridge and a decode thread
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl RequestHandle for CancelHandle {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Adapter that fetches and decodes every request on smol's blocking pool.
///
/// Cancellation is checked between fetching and decoding and once more
/// before finishing; a cancelled request finishes with no image.
#[derive(Debug, Default)]
pub struct DecodingAdapter;

impl DecodingAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ImageAdapter for DecodingAdapter {
    fn request(
        &self,
        url: &str,
        target_width: i32,
        target_height: i32,
        parameters: StringMap,
        extra_info: StringMap,
        response: ResponseSink,
    ) -> Box<dyn RequestHandle> {
        let handle = CancelHandle::default();
        let cancelled = handle.clone();
        let options = DecodeOptions::from_parameters(&parameters);
        let target = (target_width.max(0) as u32, target_height.max(0) as u32);
        let url = url.to_owned();

        if !extra_info.is_empty() {
            log::debug!("Request {} context: {:?}", response.id(), extra_info);
        }

        // Blocking fetch and decode run on smol's thread pool. A panic in
        // the job drops `response`, which reports a failure.
        smol::unblock(move || {
            let image = run_request(&url, target, &options, &cancelled);
            response.finish(image);
        })
        .detach();

        Box::new(handle)
    }
}

fn run_request(
    url: &str,
    target: (u32, u32),
    options: &DecodeOptions,
    cancelled: &CancelHandle,
) -> Option<ImageResult> {
    let start = Instant::now();

    match load_image(url, target, options, cancelled) {
        Ok(Some(image)) => {
            log::info!(
                "Loaded {} ({} frames) in {:?}",
                url,
                image.frame_count(),
                start.elapsed()
            );
            Some(image)
        }
        Ok(None) => {
            log::info!("Request for {} cancelled", url);
            None
        }
        Err(e) => {
            log::error!("Failed to load image {}: {:#}", url, e);
            None
        }
    }
}

/// `Ok(None)` means the request was cancelled along the way
fn load_image(
    url: &str,
    target: (u32, u32),
    options: &DecodeOptions,
    cancelled: &CancelHandle,
) -> Result<Option<ImageResult>> {
    if cancelled.is_cancelled() {
        return Ok(None);
    }

    let bytes = fetch::fetch_bytes(url)?;
    if cancelled.is_cancelled() {
        return Ok(None);
    }

    let decoded = worker::decode_image(&bytes, target, options)?;
    if cancelled.is_cancelled() {
        return Ok(None);
    }

    worker::into_image_result(decoded, options).map(Some)
}
