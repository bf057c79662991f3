use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;

use tempfile::TempPath;
use tracing::{debug, info};

use super::resolve::Artifact;
use super::transport::{Transport, ARCHIVE_TIMEOUT};
use super::ARCHIVE_EXT;
use crate::error::{Error, Result};

const CHUNK_SIZE: usize = 8192;

/// Bytes received so far, and the expected total when the server sent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub received: u64,
    pub total: Option<u64>,
}

impl Progress {
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some(self.received as f64 * 100.0 / total as f64),
            _ => None,
        }
    }
}

/// Streams artifacts into uniquely named files under a staging directory.
pub struct Downloader<'a> {
    transport: &'a dyn Transport,
    staging_dir: PathBuf,
}

impl<'a> Downloader<'a> {
    pub fn new(transport: &'a dyn Transport, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            staging_dir: staging_dir.into(),
        }
    }

    /// Downloads `artifact` chunk by chunk, calling `on_progress` after each one.
    ///
    /// The returned path deletes the file when dropped. On failure the partial
    /// file is removed the same way.
    pub fn fetch_to_temp(
        &self,
        artifact: &Artifact,
        on_progress: &mut dyn FnMut(Progress),
    ) -> Result<TempPath> {
        fs::create_dir_all(&self.staging_dir).map_err(Error::io(&self.staging_dir))?;

        let mut body = self.transport.get(&artifact.url, ARCHIVE_TIMEOUT)?;
        let total = body.content_length();

        let suffix = format!(".{ARCHIVE_EXT}");
        let stem = artifact
            .file_name
            .strip_suffix(&suffix)
            .unwrap_or(&artifact.file_name);
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{stem}-"))
            .suffix(&suffix)
            .tempfile_in(&self.staging_dir)
            .map_err(Error::io(&self.staging_dir))?;
        debug!(path = %file.path().display(), ?total, "Staging download");

        let mut buf = [0u8; CHUNK_SIZE];
        let mut received = 0u64;
        loop {
            let n = match body.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(Error::Download {
                        url: artifact.url.to_string(),
                        source,
                    })
                }
            };
            file.write_all(&buf[..n]).map_err(Error::io(file.path()))?;
            received += n as u64;
            on_progress(Progress { received, total });
        }

        file.flush().map_err(Error::io(file.path()))?;
        info!(bytes = received, file = %artifact.file_name, "Download complete");
        Ok(file.into_temp_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::transport::testing::{FakeTransport, Reply};
    use reqwest::Url;

    fn artifact() -> Artifact {
        Artifact {
            url: Url::parse("https://host/v1.2.3/node-v1.2.3-win-x64.zip").unwrap(),
            file_name: "node-v1.2.3-win-x64.zip".into(),
        }
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn writes_every_chunk_and_reports_monotonic_progress() {
        let data = payload(CHUNK_SIZE * 3 + 17);
        let transport = FakeTransport::new().with(
            artifact().url.as_str(),
            Reply::Ok(data.clone(), Some(data.len() as u64)),
        );
        let staging = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(&transport, staging.path());

        let mut seen = Vec::new();
        let path = downloader
            .fetch_to_temp(&artifact(), &mut |p| seen.push(p))
            .unwrap();

        assert_eq!(fs::read(&path).unwrap(), data);
        assert_eq!(fs::metadata(&path).unwrap().len(), data.len() as u64);
        assert!(seen.windows(2).all(|w| w[0].received <= w[1].received));
        let last = seen.last().unwrap();
        assert_eq!(last.received, data.len() as u64);
        assert_eq!(last.total, Some(data.len() as u64));
        assert_eq!(last.percent(), Some(100.0));

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("node-v1.2.3-win-x64-"));
        assert!(name.ends_with(&format!(".{ARCHIVE_EXT}")));
        assert!(!name.contains(".zip-"), "extension is not repeated in the stem");
    }

    #[test]
    fn unknown_total_has_no_percentage() {
        let data = payload(1000);
        let transport =
            FakeTransport::new().with(artifact().url.as_str(), Reply::Ok(data.clone(), Some(0)));
        let staging = tempfile::tempdir().unwrap();

        let mut seen = Vec::new();
        let path = Downloader::new(&transport, staging.path())
            .fetch_to_temp(&artifact(), &mut |p| seen.push(p))
            .unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 1000);
        assert!(seen.iter().all(|p| p.total.is_none() && p.percent().is_none()));
        assert_eq!(seen.last().unwrap().received, 1000);
    }

    #[test]
    fn dropping_the_path_removes_the_file() {
        let transport =
            FakeTransport::new().with(artifact().url.as_str(), Reply::Ok(payload(10), None));
        let staging = tempfile::tempdir().unwrap();

        let path = Downloader::new(&transport, staging.path())
            .fetch_to_temp(&artifact(), &mut |_| {})
            .unwrap();
        let on_disk = path.to_path_buf();
        assert!(on_disk.exists());
        drop(path);
        assert!(!on_disk.exists());
    }

    #[test]
    fn interrupted_stream_is_a_download_error_and_leaves_nothing() {
        let transport = FakeTransport::new().with(
            artifact().url.as_str(),
            Reply::Truncated(payload(CHUNK_SIZE + 5), 1_000_000),
        );
        let staging = tempfile::tempdir().unwrap();

        let mut seen = Vec::new();
        let err = Downloader::new(&transport, staging.path())
            .fetch_to_temp(&artifact(), &mut |p| seen.push(p))
            .unwrap_err();

        assert!(matches!(err, Error::Download { .. }));
        assert!(!seen.is_empty());
        assert_eq!(fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[test]
    fn http_failure_before_streaming_is_a_transport_error() {
        let transport = FakeTransport::new().with(artifact().url.as_str(), Reply::Status(500));
        let staging = tempfile::tempdir().unwrap();

        let err = Downloader::new(&transport, staging.path())
            .fetch_to_temp(&artifact(), &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
