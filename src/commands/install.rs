use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::config::NodeFetcherDirs;
use crate::error::Result;
use crate::utils::download::{Downloader, Progress};
use crate::utils::extract::{InstallReport, Installer};
use crate::utils::lock::VersionLock;
use crate::utils::resolve::{Artifact, ArtifactResolver};
use crate::utils::transport::Transport;
use crate::utils::version::NodeVersion;
use crate::utils::ENTRY_POINT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Resolving,
    AlreadyInstalled,
    Downloading,
    Extracting,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    AlreadyInstalled {
        version: NodeVersion,
        dir: PathBuf,
    },
    Installed {
        version: NodeVersion,
        dir: PathBuf,
        artifact: Artifact,
        report: InstallReport,
    },
}

/// Validate, resolve, download, extract: one version per call.
pub struct Pipeline<'a> {
    transport: &'a dyn Transport,
    resolver: ArtifactResolver,
    dirs: NodeFetcherDirs,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        resolver: ArtifactResolver,
        dirs: NodeFetcherDirs,
    ) -> Self {
        Self {
            transport,
            resolver,
            dirs,
        }
    }

    pub fn resolver(&self) -> &ArtifactResolver {
        &self.resolver
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport
    }

    pub fn install_version(
        &self,
        raw: &str,
        on_progress: &mut dyn FnMut(Progress),
    ) -> Result<Outcome> {
        enter(Stage::Validating);
        let version = NodeVersion::parse(raw)?;
        let dir = self.dirs.version_dir(&version);
        debug!(%version, prefixed = version.was_prefixed(), dir = %dir.display(), "Validated");

        // Held until return so a concurrent install of the same version waits,
        // then sees it installed.
        let _lock = VersionLock::acquire(&self.dirs.lock_path(&version))?;

        if is_installed(&dir) {
            enter(Stage::AlreadyInstalled);
            enter(Stage::Done);
            return Ok(Outcome::AlreadyInstalled { version, dir });
        }

        enter(Stage::Resolving);
        let artifact = self.resolver.resolve(&version, self.transport)?;

        enter(Stage::Downloading);
        let staging = self.dirs.staging_dir();
        let archive =
            Downloader::new(self.transport, &staging).fetch_to_temp(&artifact, on_progress)?;

        enter(Stage::Extracting);
        let report = Installer::new(&staging).install(&archive, &dir)?;
        drop(archive);

        enter(Stage::Done);
        Ok(Outcome::Installed {
            version,
            dir,
            artifact,
            report,
        })
    }
}

fn enter(stage: Stage) {
    debug!(?stage, "Install stage");
}

pub fn is_installed(dir: &Path) -> bool {
    dir.join(ENTRY_POINT).is_file()
}

pub fn execute(pipeline: &Pipeline, version: &str) -> Result<()> {
    println!("Installing Node.js {}", version.green());

    let mut bar: Option<ProgressBar> = None;
    let result = pipeline.install_version(version, &mut |progress| {
        let bar = bar.get_or_insert_with(|| new_bar(progress.total));
        bar.set_position(progress.received);
        if let Some(percent) = progress.percent() {
            bar.set_message(format!("{percent:.0}%"));
        }
    });
    if let Some(bar) = bar {
        if result.is_ok() {
            bar.finish_with_message("Download complete");
        } else {
            bar.abandon();
        }
    }

    match result? {
        Outcome::AlreadyInstalled { version, dir } => {
            println!(
                "Node.js {} is already installed in {}",
                version.to_string().green(),
                dir.display()
            );
        }
        Outcome::Installed {
            version,
            dir,
            artifact,
            report,
        } => {
            println!("Fetched {}", artifact.file_name);
            println!(
                "Successfully installed Node.js {} in {} ({} entries)",
                version.to_string().green(),
                dir.display(),
                report.entries.len()
            );
        }
    }

    Ok(())
}

fn new_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) => {
            let bar = ProgressBar::new(total);
            let style = ProgressStyle::default_bar()
                .template(concat!(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] ",
                    "{bytes}/{total_bytes} {msg} ({eta})"
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            bar.set_style(style);
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            let style = ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            bar.set_style(style);
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        }
    }
}
