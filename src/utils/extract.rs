use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// What an install moved into the final directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub payload: String,
    pub entries: Vec<String>,
}

/// Unpacks a release archive and lays its payload directory out flat in a
/// version directory.
pub struct Installer {
    staging_dir: PathBuf,
}

impl Installer {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    /// Extracts `archive` into scratch space, then moves each entry of its single
    /// top-level directory into `final_dir`, replacing same-named entries.
    ///
    /// Nothing under `final_dir` changes unless extraction fully succeeds. The
    /// archive is deleted on success and kept on failure.
    pub fn install(&self, archive: &Path, final_dir: &Path) -> Result<InstallReport> {
        fs::create_dir_all(&self.staging_dir).map_err(Error::io(&self.staging_dir))?;
        let scratch = tempfile::Builder::new()
            .prefix("extract-")
            .tempdir_in(&self.staging_dir)
            .map_err(Error::io(&self.staging_dir))?;

        info!(archive = %archive.display(), "Extracting archive");
        extract_zip(archive, scratch.path())?;

        let payload = find_payload(scratch.path())?;
        let payload_name = payload
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(payload = %payload_name, "Moving payload contents");

        fs::create_dir_all(final_dir).map_err(Error::io(final_dir))?;

        let mut entries = Vec::new();
        for source in read_sorted(&payload)? {
            let name = match source.file_name() {
                Some(name) => name.to_owned(),
                None => continue,
            };
            let dest = final_dir.join(&name);
            replace_entry(&source, &dest)?;
            entries.push(name.to_string_lossy().into_owned());
        }

        // The install is complete at this point; leftovers only cost disk space.
        if let Err(e) = scratch.close() {
            warn!(error = %e, "Could not remove extraction scratch directory");
        }
        discard_archive(archive);

        info!(dir = %final_dir.display(), entries = entries.len(), "Installed");
        Ok(InstallReport {
            payload: payload_name,
            entries,
        })
    }
}

fn discard_archive(archive: &Path) {
    if let Err(e) = fs::remove_file(archive) {
        warn!(error = %e, archive = %archive.display(), "Could not remove downloaded archive");
    }
}

fn extract_zip(archive_path: &Path, extract_dir: &Path) -> Result<()> {
    let corrupt = |source: zip::result::ZipError| Error::CorruptArchive {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = fs::File::open(archive_path).map_err(Error::io(archive_path))?;
    let mut archive = zip::ZipArchive::new(file).map_err(corrupt)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(corrupt)?;
        let relative = match entry.enclosed_name() {
            Some(path) => path.to_owned(),
            None => return Err(Error::UnsafeEntry(entry.name().to_string())),
        };
        let outpath = extract_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath).map_err(Error::io(&outpath))?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent).map_err(Error::io(parent))?;
            }
            let mut outfile = fs::File::create(&outpath).map_err(Error::io(&outpath))?;
            io::copy(&mut entry, &mut outfile).map_err(Error::io(&outpath))?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))
                    .map_err(Error::io(&outpath))?;
            }
        }
    }

    Ok(())
}

/// Picks the payload directory: the first top-level directory by name.
/// Loose top-level files are ignored.
fn find_payload(extract_dir: &Path) -> Result<PathBuf> {
    let dirs: Vec<PathBuf> = read_sorted(extract_dir)?
        .into_iter()
        .filter(|p| p.is_dir())
        .collect();

    if dirs.len() > 1 {
        warn!(
            count = dirs.len(),
            chosen = %dirs[0].display(),
            "Archive has several top-level directories, using the first"
        );
    }

    dirs.into_iter().next().ok_or(Error::MissingPayload)
}

fn read_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)
        .map_err(Error::io(dir))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()
        .map_err(Error::io(dir))?;
    paths.sort();
    Ok(paths)
}

/// Removes whatever is at `dest`, then renames `source` into place, copying
/// instead when the rename crosses filesystems.
fn replace_entry(source: &Path, dest: &Path) -> Result<()> {
    match fs::symlink_metadata(dest) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(dest).map_err(Error::io(dest))?,
        Ok(_) => fs::remove_file(dest).map_err(Error::io(dest))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io(dest)(e)),
    }

    if let Err(e) = fs::rename(source, dest) {
        debug!(error = %e, source = %source.display(), "Rename failed, copying instead");
        copy_recursive(source, dest)?;
    }
    Ok(())
}

fn copy_recursive(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            Error::Io {
                path,
                source: e.into(),
            }
        })?;
        let relative = entry.path().strip_prefix(source).unwrap_or(Path::new(""));
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(Error::io(&target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(Error::io(&target))?;
        }
    }
    Ok(())
}
