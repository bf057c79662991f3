use colored::Colorize;
use tracing::debug;

use crate::commands::install::Pipeline;
use crate::error::Result;
use crate::utils::resolve::Artifact;
use crate::utils::version::NodeVersion;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub artifact: Artifact,
    pub status: u16,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        self.status == 200
    }
}

/// Resolves the artifact and probes it with HEAD, downloading nothing.
pub fn probe(pipeline: &Pipeline, raw: &str) -> Result<Availability> {
    let version = NodeVersion::parse(raw)?;
    let artifact = pipeline.resolver().resolve(&version, pipeline.transport())?;
    let status = pipeline.transport().head(&artifact.url)?;
    debug!(url = %artifact.url, status, "Probed artifact");
    Ok(Availability { artifact, status })
}

pub fn execute(pipeline: &Pipeline, version: &str) -> Result<bool> {
    println!("Checking whether Node.js {} exists...", version);
    let availability = probe(pipeline, version)?;

    if availability.is_available() {
        println!("{} {}", "Available:".green(), availability.artifact.url);
    } else {
        println!(
            "{} {} answered HTTP {}",
            "Unavailable:".red(),
            availability.artifact.url,
            availability.status
        );
    }
    Ok(availability.is_available())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeFetcherDirs;
    use crate::error::Error;
    use crate::utils::resolve::ArtifactResolver;
    use crate::utils::transport::testing::{FakeTransport, Reply};
    use reqwest::Url;

    const INDEX: &str = "https://host/v20.9.0/";
    const ARCHIVE: &str = "https://host/v20.9.0/node-v20.9.0-win-x64.zip";

    fn pipeline<'a>(transport: &'a FakeTransport, base: &std::path::Path) -> Pipeline<'a> {
        Pipeline::new(
            transport,
            ArtifactResolver::new(Url::parse("https://host/").unwrap()),
            NodeFetcherDirs::new(base),
        )
    }

    fn index() -> Reply {
        Reply::Ok(br#"<a href="node-v20.9.0-win-x64.zip">zip</a>"#.to_vec(), None)
    }

    #[test]
    fn available_when_head_is_ok() {
        let transport = FakeTransport::new()
            .with(INDEX, index())
            .with(ARCHIVE, Reply::Ok(Vec::new(), None));
        let base = tempfile::tempdir().unwrap();

        let availability = probe(&pipeline(&transport, base.path()), "20.9.0").unwrap();
        assert!(availability.is_available());
        assert_eq!(
            *transport.calls.borrow(),
            [format!("GET {INDEX}"), format!("HEAD {ARCHIVE}")]
        );
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    }

    #[test]
    fn unavailable_when_head_fails() {
        let transport = FakeTransport::new().with(INDEX, index());
        let base = tempfile::tempdir().unwrap();

        let availability = probe(&pipeline(&transport, base.path()), "20.9.0").unwrap();
        assert!(!availability.is_available());
        assert_eq!(availability.status, 404);
    }

    #[test]
    fn invalid_version_is_rejected_before_network() {
        let transport = FakeTransport::new();
        let base = tempfile::tempdir().unwrap();

        let err = probe(&pipeline(&transport, base.path()), "latest").unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
        assert_eq!(transport.call_count(), 0);
    }
}
