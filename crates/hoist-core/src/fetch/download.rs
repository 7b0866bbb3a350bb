//! Single-stream HTTP GET into a local file.
//!
//! Writes the response body sequentially to the destination path. Runs on the
//! current thread; call from `spawn_blocking` when used from async code.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::FetchOptions;

/// Downloads `url` into `dest` with a single GET. A redirect from the artifact
/// host is followed once; anything deeper fails. Returns bytes written.
pub fn to_file(url: &str, dest: &Path, options: &FetchOptions) -> Result<u64> {
    let mut file = File::create(dest)
        .with_context(|| format!("failed to create {}", dest.display()))?;
    let written = Arc::new(AtomicU64::new(0));
    let written_cb = Arc::clone(&written);

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.follow_location(true)?;
    easy.max_redirections(1)?;
    easy.useragent(&options.user_agent)?;
    easy.connect_timeout(options.connect_timeout)?;
    easy.timeout(options.transfer_timeout)?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(move |data| {
            match file.write_all(data) {
                Ok(()) => {
                    written_cb.fetch_add(data.len() as u64, Ordering::Relaxed);
                    Ok(data.len())
                }
                Err(e) => {
                    tracing::warn!("artifact write failed: {}", e);
                    Ok(0) // abort transfer
                }
            }
        })?;
        transfer.perform().context("GET request failed")?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }

    Ok(written.load(Ordering::Relaxed))
}
