use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use reqwest::Response;
use tokio::{fs::File, io::AsyncWriteExt};

/// Streams the response body into a file at `path`
///
/// The file is created, or truncated if it already exists, and receives the
/// body byte-for-byte. Returns the number of bytes written.
pub async fn save(mut response: Response, path: &Path) -> Result<u64> {
    let mut file = File::create(path).await.context("create output file")?;
    let mut written = 0u64;

    while let Some(chunk) = response.chunk().await.context("read response body")? {
        file.write_all(&chunk).await.context("write output file")?;
        written += chunk.len() as u64;
    }

    file.flush().await.context("write output file")?;
    debug!("Wrote {} bytes to {}", written, path.display());

    Ok(written)
}
