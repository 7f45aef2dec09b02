//! Installer version resolution.
//!
//! A pinned version is used as given. Otherwise the latest release is found
//! by requesting the repository's `releases/latest` URL with redirects
//! disabled and reading the tag from the `Location` header.

use projenv_core::{Error, Result};
use regex::Regex;
use reqwest::Client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use std::sync::LazyLock;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::source::ReleaseSource;

static VERSION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"/v([^/]+)/?$").expect("version tag pattern is valid")
});

/// Resolves the installer version once per session.
#[derive(Debug)]
pub struct VersionResolver {
    client: Client,
    source: ReleaseSource,
    pinned: Option<String>,
    resolved: OnceCell<String>,
}

impl VersionResolver {
    /// Create a resolver. `pinned` short-circuits any network lookup.
    pub fn new(source: ReleaseSource, pinned: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("projenv/", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::none())
            .build()
            .map_err(|e| Error::network(source.latest_url(), e.to_string()))?;

        Ok(Self {
            client,
            source,
            pinned: pinned.filter(|v| !v.trim().is_empty()),
            resolved: OnceCell::new(),
        })
    }

    /// The pinned version, if any.
    #[must_use]
    pub fn pinned(&self) -> Option<&str> {
        self.pinned.as_deref()
    }

    /// Version to install. Later calls return the first answer.
    pub async fn resolve_version(&self) -> Result<String> {
        if let Some(pinned) = &self.pinned {
            debug!(version = %pinned, "Using pinned installer version");
            return Ok(pinned.clone());
        }

        self.resolved
            .get_or_try_init(|| self.fetch_latest())
            .await
            .cloned()
    }

    async fn fetch_latest(&self) -> Result<String> {
        let url = self.source.latest_url();
        debug!(%url, "Looking up latest installer release");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::network(&url, e.to_string()))?;

        let status = response.status();
        if !status.is_redirection() {
            return Err(Error::version_resolution(format!(
                "expected a redirect from {url}, got HTTP {status}"
            )));
        }

        let location = response
            .headers()
            .get(LOCATION)
            .ok_or_else(|| {
                Error::version_resolution(format!("redirect from {url} has no Location header"))
            })?
            .to_str()
            .map_err(|e| Error::version_resolution(format!("unreadable Location header: {e}")))?;

        let version = version_from_location(location).ok_or_else(|| {
            Error::version_resolution(format!(
                "Location '{location}' does not end in a version tag"
            ))
        })?;

        info!(%version, "Resolved latest installer version");
        Ok(version)
    }
}

/// Extract `1.2.3` from a URL ending in `/v1.2.3`.
///
/// A query string or fragment after the tag is ignored.
#[must_use]
pub fn version_from_location(location: &str) -> Option<String> {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    VERSION_TAG
        .captures(path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
