use regex::Regex;
use reqwest::Url;
use tracing::{debug, info};

use super::transport::{Transport, SHORT_TIMEOUT};
use super::version::NodeVersion;
use super::{ARCHIVE_EXT, PLATFORM};
use crate::error::{Error, Result};

/// The archive chosen for one install attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub url: Url,
    pub file_name: String,
}

/// Finds the platform archive on a release index page.
///
/// Index pages are plain generated directory listings, so anchors are found
/// with a narrow text match rather than an HTML parser. A strict pattern
/// (`node-v<digits>...-<platform>.<ext>`) is tried first, then a loose one
/// (OS and arch anywhere, any extension containing `zip`). Within a tier the
/// first anchor in document order wins.
pub struct ArtifactResolver {
    origin: Url,
    strict: Regex,
    loose: Regex,
}

impl ArtifactResolver {
    pub fn new(origin: Url) -> Self {
        let (os, arch) = PLATFORM.split_once('-').unwrap_or((PLATFORM, ""));
        let strict = format!(
            r#"href\s*=\s*"([^"]*?node-v[0-9.]+[^"/]*-{}\.{})""#,
            regex::escape(PLATFORM),
            regex::escape(ARCHIVE_EXT),
        );
        let loose = format!(
            r#"(?i)href\s*=\s*["']([^"']*{}[^"']*{}[^"']*\.[^"'/.]*zip[^"'/.]*)["']"#,
            regex::escape(os),
            regex::escape(arch),
        );

        Self {
            origin,
            strict: Regex::new(&strict).expect("strict artifact pattern is valid"),
            loose: Regex::new(&loose).expect("loose artifact pattern is valid"),
        }
    }

    /// The listing page for one version, `<origin>/v<version>/`.
    pub fn index_url(&self, version: &NodeVersion) -> Result<Url> {
        self.origin
            .join(&format!("{}/", version.tag()))
            .map_err(|_| Error::InvalidFormat(version.to_string()))
    }

    pub fn find_href<'a>(&self, html: &'a str) -> Option<&'a str> {
        [&self.strict, &self.loose].into_iter().find_map(|pattern| {
            pattern
                .captures(html)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
        })
    }

    pub fn resolve(&self, version: &NodeVersion, transport: &dyn Transport) -> Result<Artifact> {
        let index = self.index_url(version)?;
        info!(%index, "Looking up release index");

        let html = match transport.get(&index, SHORT_TIMEOUT).and_then(|body| body.text(&index)) {
            Ok(html) => html,
            Err(err) if err.is_not_found() => return Err(Error::VersionNotFound(version.tag())),
            Err(err) => return Err(err.into()),
        };

        let no_build = || Error::NoPlatformBuild {
            version: version.tag(),
            platform: PLATFORM.to_string(),
        };

        let href = self.find_href(&html).ok_or_else(no_build)?;
        let url = resolve_href(&index, href).ok_or_else(no_build)?;
        let file_name = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string)
            .ok_or_else(no_build)?;

        debug!(%href, %url, "Matched artifact");
        Ok(Artifact { url, file_name })
    }
}

/// Standard relative reference resolution against the index page.
pub fn resolve_href(index: &Url, href: &str) -> Option<Url> {
    index.join(href).ok()
}
