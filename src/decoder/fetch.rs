use anyhow::{Context, Result};

/// Load the raw bytes behind `url`.
///
/// `http://` and `https://` are downloaded, `file://` URLs and bare paths
/// are read from disk.
pub fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        log::info!("Downloading image from URL: {}", url);

        let response = reqwest::blocking::get(url)?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP error: {}", response.status());
        }

        let bytes = response.bytes()?;
        log::info!("Downloaded {} bytes from {}", bytes.len(), url);
        return Ok(bytes.to_vec());
    }

    let path = url.strip_prefix("file://").unwrap_or(url);
    if path.trim().is_empty() {
        anyhow::bail!("Empty image location");
    }

    std::fs::read(path).with_context(|| format!("Failed to read {}", path))
}
