//! CSRF token resolution.
//!
//! The panel page exposes its token in one of three places:
//!
//! ```html
//! <meta name="csrf-token" content="TOKEN">
//! <input type="hidden" name="_csrf_token" value="TOKEN">
//! <script>window.csrf_token = "TOKEN";</script>
//! ```
//!
//! They are tried in that order and the first hit wins.  Outside a page the
//! token may also be configured directly or read from the environment; see
//! [`CsrfSource`].

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::domain::{CsrfSource, PanelConfig};

/// Header carried by every mutating request.
pub const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Error)]
pub enum CsrfError {
    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("no CSRF token found in {0}")]
    NotFound(String),

    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// A resolved token.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Never print the secret itself.
impl std::fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CsrfToken(..)")
    }
}

/// Extracts the token from panel HTML.
pub fn extract_from_html(html: &str) -> Option<CsrfToken> {
    // Attribute order varies between templates, so each pattern accepts both.
    const PATTERNS: [&str; 5] = [
        r#"<meta[^>]*name=["']csrf-token["'][^>]*content=["']([^"']+)["']"#,
        r#"<meta[^>]*content=["']([^"']+)["'][^>]*name=["']csrf-token["']"#,
        r#"<input[^>]*name=["']_csrf_token["'][^>]*value=["']([^"']+)["']"#,
        r#"<input[^>]*value=["']([^"']+)["'][^>]*name=["']_csrf_token["']"#,
        r#"window\.csrf_token\s*=\s*["']([^"']+)["']"#,
    ];
    PATTERNS.iter().find_map(|pattern| {
        Regex::new(pattern)
            .ok()?
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| CsrfToken::new(m.as_str()))
    })
}

/// Resolves the configured token source.
///
/// Returns `Ok(None)` for [`CsrfSource::None`].
///
/// # Errors
///
/// [`CsrfError`] when the configured source does not yield a token.
pub async fn resolve(
    config: &PanelConfig,
    client: &reqwest::Client,
) -> Result<Option<CsrfToken>, CsrfError> {
    match &config.csrf {
        CsrfSource::None => Ok(None),
        CsrfSource::Static { token } => Ok(Some(CsrfToken::new(token.clone()))),
        CsrfSource::Env { var } => std::env::var(var)
            .map(|t| Some(CsrfToken::new(t)))
            .map_err(|_| CsrfError::MissingEnv(var.clone())),
        CsrfSource::Page { path } => {
            let url = config.url(path);
            let fetch = |source| CsrfError::Fetch {
                url: url.clone(),
                source,
            };
            let html = client
                .get(&url)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(fetch)?
                .text()
                .await
                .map_err(fetch)?;
            let token = extract_from_html(&html).ok_or_else(|| CsrfError::NotFound(url.clone()))?;
            debug!(%url, "CSRF token scraped from page");
            Ok(Some(token))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
