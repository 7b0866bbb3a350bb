//! HEAD existence probe.
//!
//! Most candidate repositories do not have a given artifact, so fetching is
//! two-phase: a cheap metadata-only probe rejects absent mirrors before any
//! transfer happens. Runs on the current thread; call from `spawn_blocking`
//! when used from async code.

use anyhow::{Context, Result};

use super::FetchOptions;

/// True if `url` answers the HEAD probe with 200 or 202. Redirects are not
/// followed — a mirror answering 3xx is not an authoritative "exists".
pub fn exists(url: &str, options: &FetchOptions) -> Result<bool> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.nobody(true)?; // HEAD request
    easy.follow_location(false)?;
    easy.useragent(&options.user_agent)?;
    easy.connect_timeout(options.connect_timeout)?;
    easy.timeout(options.probe_timeout)?;

    easy.perform().context("HEAD request failed")?;
    let code = easy.response_code().context("no response code")?;
    Ok(code == 200 || code == 202)
}
