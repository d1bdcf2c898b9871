// ~/Sentinel/sentinel-addons/display/src/wallpaper_source.rs
//
// Turns streamed or remote wallpapers into files the desktop can load.

use std::{
    io::{Read, Write},
    time::Duration,
};

use reqwest::Url;
use tempfile::NamedTempFile;

use crate::{
    error::{DisplayError, Result},
    info, DEBUG_NAME,
};

const TEMP_PREFIX: &str = "sentinel-wallpaper-";
const FALLBACK_EXTENSION: &str = "img";

/// Parses `raw` and accepts only http and https. Runs before any network access.
pub fn check_url_scheme(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|_| DisplayError::UnsupportedScheme(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DisplayError::UnsupportedScheme(other.to_string())),
    }
}

/// Blocking fetch of the whole body.
pub fn download(url: &Url, timeout: Duration) -> Result<Vec<u8>> {
    info!("[{}][WALLPAPER] Downloading {}", DEBUG_NAME, url);

    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DisplayError::Network(format!("client setup failed: {e}")))?;

    let response = client
        .get(url.clone())
        .send()
        .map_err(|e| DisplayError::Network(format!("request to {url} failed: {e}")))?;

    if !response.status().is_success() {
        return Err(DisplayError::Network(format!(
            "{url} answered HTTP {}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .map_err(|e| DisplayError::Network(format!("reading {url} failed: {e}")))?;
    Ok(bytes.to_vec())
}

/// Copies `reader` into a temporary file named after the sniffed image type.
/// The file is removed when the returned handle drops, including when this
/// function fails half way through writing it.
pub fn materialize(mut reader: impl Read) -> Result<NamedTempFile> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    materialize_bytes(&bytes)
}

pub fn materialize_bytes(bytes: &[u8]) -> Result<NamedTempFile> {
    let extension = sniff_extension(bytes);
    let mut file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(&format!(".{extension}"))
        .tempfile()?;

    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

pub fn sniff_extension(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or(FALLBACK_EXTENSION)
}
