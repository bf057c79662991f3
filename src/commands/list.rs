use anyhow::Result;
use colored::Colorize;
use std::fs;
use std::io;

use crate::commands::install::is_installed;
use crate::config::NodeFetcherDirs;
use crate::utils::version::NodeVersion;

/// Installed versions, newest first, each with whether its entry point exists.
pub fn installed_versions(dirs: &NodeFetcherDirs) -> io::Result<Vec<(NodeVersion, bool)>> {
    let entries = match fs::read_dir(&dirs.versions_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with('.') || !name.starts_with('v') {
            continue;
        }
        if let Ok(version) = NodeVersion::parse(name) {
            versions.push((version, is_installed(&entry.path())));
        }
    }

    versions.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(versions)
}

pub fn execute(dirs: &NodeFetcherDirs) -> Result<()> {
    println!("Installed Node.js versions in {}:", dirs.versions_dir.display());

    let versions = installed_versions(dirs)?;
    if versions.is_empty() {
        println!("  No versions installed");
        return Ok(());
    }

    for (version, complete) in versions {
        if complete {
            println!("* {}", version.to_string().green());
        } else {
            println!("  {} {}", version, "(incomplete)".yellow());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_version_dirs_newest_first() {
        let base = tempfile::tempdir().unwrap();
        for name in ["v9.1.0", "v18.17.0", "v18.2.0"] {
            fs::create_dir_all(base.path().join(name)).unwrap();
            fs::write(base.path().join(name).join("node.exe"), "").unwrap();
        }
        fs::create_dir_all(base.path().join("v20.0.0")).unwrap();
        fs::create_dir_all(base.path().join(".staging")).unwrap();
        fs::create_dir_all(base.path().join("misc")).unwrap();
        fs::write(base.path().join("v1.0.0"), "a file").unwrap();

        let listed: Vec<(String, bool)> = installed_versions(&NodeFetcherDirs::new(base.path()))
            .unwrap()
            .into_iter()
            .map(|(v, complete)| (v.to_string(), complete))
            .collect();

        assert_eq!(
            listed,
            [
                ("20.0.0".to_string(), false),
                ("18.17.0".to_string(), true),
                ("18.2.0".to_string(), true),
                ("9.1.0".to_string(), true),
            ]
        );
    }

    #[test]
    fn missing_base_dir_is_empty() {
        let base = tempfile::tempdir().unwrap();
        let dirs = NodeFetcherDirs::new(base.path().join("nope"));
        assert!(installed_versions(&dirs).unwrap().is_empty());
    }
}
