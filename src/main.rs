//! adapter-image - load images through the adapter bridge and report what came back

use adapter_image::{Bridge, DecodingAdapter, NativeImageProvider, PlatformImage, RequestInfo};
use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

const USAGE: &str = "usage: adapter-image [--key=value]... <url-or-path>...";

fn main() -> Result<()> {
    env_logger::init();

    // `--key=value` arguments become request parameters for every image
    let mut info = RequestInfo::new("");
    let mut locations = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.strip_prefix("--") {
            Some(option) => {
                let Some((key, value)) = option.split_once('=') else {
                    anyhow::bail!("Malformed option {:?}\n{}", arg, USAGE);
                };
                info = info.with_parameter(key, value);
            }
            None => locations.push(arg),
        }
    }

    if locations.is_empty() {
        anyhow::bail!(USAGE);
    }

    let (sender, receiver) = smol::channel::unbounded();
    let bridge = Arc::new(Bridge::new(sender));
    bridge.install_adapter(Arc::new(DecodingAdapter::new()));
    let provider = NativeImageProvider::new(bridge.clone(), receiver);

    let start = Instant::now();
    let summaries: Arc<Mutex<Vec<(u32, String)>>> = Arc::new(Mutex::new(Vec::new()));

    for (rid, location) in (0u32..).zip(locations.iter()) {
        let request = RequestInfo {
            url: location.clone(),
            ..info.clone()
        };
        let summaries = summaries.clone();
        let location = location.clone();
        let accepted = provider.request(
            rid,
            &request,
            Box::new(move |image| {
                summaries.lock().push((rid, summarize(&location, image.as_ref())));
            }),
        );
        if !accepted {
            log::error!("Request for {} was rejected", request.url);
        }
    }

    smol::block_on(provider.run());

    let mut summaries = summaries.lock();
    summaries.sort_by_key(|(rid, _)| *rid);
    for (_, line) in summaries.iter() {
        println!("{}", line);
    }
    log::info!("Handled {} images in {:?}", summaries.len(), start.elapsed());

    bridge.shutdown();
    Ok(())
}

fn summarize(location: &str, image: Option<&PlatformImage>) -> String {
    match image {
        None => format!("{}: failed", location),
        Some(image) if image.frame_count > 1 => format!(
            "{}: {}x{}, {} frames, {} ms{}",
            location,
            image.width,
            image.height,
            image.frame_count,
            image.duration_ms,
            if image.is_single_bitmap_animated() { ", single bitmap" } else { "" }
        ),
        Some(image) => format!("{}: {}x{}", location, image.width, image.height),
    }
}
