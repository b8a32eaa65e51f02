use adapter_image::{Bridge, DecodingAdapter, NativeImageProvider, PlatformImage, RequestInfo};
use image::codecs::gif::GifEncoder;
use image::{Delay, Frame, ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

fn write_png(path: &Path, width: u32, height: u32) {
    RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 128]))
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

fn write_gif(path: &Path, frame_count: u32, delay_ms: u32) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = GifEncoder::new(file);
    let frames = (0..frame_count).map(|i| {
        let buffer = RgbaImage::from_pixel(6, 6, Rgba([(i * 40) as u8, 0, 0, 255]));
        Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(delay_ms, 1))
    });
    encoder.encode_frames(frames).unwrap();
}

fn provider() -> NativeImageProvider {
    let (sender, receiver) = smol::channel::unbounded();
    let bridge = Arc::new(Bridge::new(sender));
    bridge.install_adapter(Arc::new(DecodingAdapter::new()));
    NativeImageProvider::new(bridge, receiver)
}

/// Request `info` and block until its callback has run
fn load(provider: &NativeImageProvider, info: RequestInfo) -> Option<PlatformImage> {
    let slot = Arc::new(Mutex::new(None));
    let writer = slot.clone();
    assert!(provider.request(1, &info, Box::new(move |image| *writer.lock() = Some(image))));

    smol::block_on(provider.run());

    let delivered = slot.lock().take();
    delivered.expect("callback ran")
}

#[test]
fn loads_png_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("still.png");
    write_png(&path, 8, 4);

    let image = load(&provider(), RequestInfo::new(path.to_string_lossy())).unwrap();
    assert_eq!((image.width, image.height), (8, 4));
    assert_eq!(image.frame_count, 1);
    assert!(image.is_premultiplied);

    // 128 alpha halves the color channels
    let pixels = image.decode(0).unwrap();
    assert_eq!(&pixels.pixels()[..4], &[100, 50, 25, 128]);
}

#[test]
fn honours_target_size_and_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.png");
    write_png(&path, 40, 20);

    let info = RequestInfo::new(format!("file://{}", path.to_string_lossy()))
        .with_target_size(10, 10)
        .with_parameter("premultiply", "false");
    let image = load(&provider(), info).unwrap();

    assert_eq!((image.width, image.height), (10, 5));
    assert!(!image.is_premultiplied);
}

#[test]
fn loads_gif_animation_as_frames() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("anim.gif");
    write_gif(&path, 3, 100);

    let image = load(&provider(), RequestInfo::new(path.to_string_lossy())).unwrap();
    assert_eq!(image.frame_count, 3);
    assert_eq!(image.duration_ms, 300);
    assert!(!image.is_single_bitmap_animated());
    assert!(image.decode(2).is_some());
}

#[test]
fn loads_gif_animation_as_single_bitmap() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("anim.gif");
    write_gif(&path, 2, 50);

    let info = RequestInfo::new(path.to_string_lossy()).with_parameter("playback", "single-bitmap");
    let image = load(&provider(), info).unwrap();
    assert!(image.is_single_bitmap_animated());
    assert_eq!(image.frame_count, 2);
    assert_eq!(image.duration_ms, 100);
    assert_eq!((image.width, image.height), (6, 6));
}

#[test]
fn missing_file_delivers_failure() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.png");
    assert!(load(&provider(), RequestInfo::new(missing.to_string_lossy())).is_none());
}

#[test]
fn cancelled_request_never_calls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("still.png");
    write_png(&path, 8, 8);

    let provider = provider();
    let called = Arc::new(Mutex::new(false));
    let flag = called.clone();
    provider.request(
        5,
        &RequestInfo::new(path.to_string_lossy()),
        Box::new(move |_| *flag.lock() = true),
    );
    provider.cancel(5);

    // The decode thread still finishes its sink; the callback is gone.
    smol::block_on(provider.dispatch_next());
    assert!(!*called.lock());
    assert_eq!(provider.pending_count(), 0);
}

#[test]
fn burst_of_requests_all_complete() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("still.png");
    write_png(&path, 4, 4);
    let missing = dir.path().join("missing.png");

    let provider = provider();
    let delivered = Arc::new(Mutex::new(Vec::new()));
    for rid in 0..64u32 {
        let location = if rid % 2 == 0 { &path } else { &missing };
        let delivered = delivered.clone();
        assert!(provider.request(
            rid,
            &RequestInfo::new(location.to_string_lossy()),
            Box::new(move |image| delivered.lock().push((rid, image.is_some()))),
        ));
    }

    smol::block_on(provider.run());

    let delivered = delivered.lock();
    assert_eq!(delivered.len(), 64);
    assert!(delivered.iter().all(|&(rid, loaded)| loaded == (rid % 2 == 0)));
}
