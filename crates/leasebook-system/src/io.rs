// # Config File I/O
//
// Two ways to get bytes into the shared configuration files.
//
// ## LocalConfigIo
//
// Direct filesystem access for processes that can already write the target
// (running as root, or a lab setup with relaxed ownership). Writes go
// through a temporary file in the target directory and an atomic rename, so
// a reader never observes a torn file.
//
// ## SudoConfigIo
//
// For the usual case: the files are root-owned and the tool is not. The new
// content is staged in a private temp file and installed with `sudo cp`;
// reads go through `sudo cat`. `cp` truncates-and-writes in place rather
// than renaming, which matches how the stock tooling edits these files and
// keeps the target's owner and mode untouched.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use leasebook_core::error::{Error, Result};
use leasebook_core::traits::ConfigIo;

/// Direct filesystem access with atomic replace writes
#[derive(Debug, Default, Clone)]
pub struct LocalConfigIo;

impl LocalConfigIo {
    /// Create a new direct I/O handle
    pub fn new() -> Self {
        Self
    }

    fn temp_path(path: &Path) -> PathBuf {
        let mut temp = path.to_path_buf();
        let mut name = temp
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        temp.set_file_name(name);
        temp
    }
}

#[async_trait]
impl ConfigIo for LocalConfigIo {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        // Write to a sibling temp file, then rename over the target. The
        // temp file must live on the same filesystem for the rename to be
        // atomic.
        let temp = Self::temp_path(path);
        {
            let mut file = tokio::fs::File::create(&temp).await?;
            file.write_all(contents.as_bytes()).await?;
            file.flush().await?;
        }
        tokio::fs::rename(&temp, path).await?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    async fn remove_tree(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Privileged file access staged through `sudo`
#[derive(Debug, Default, Clone)]
pub struct SudoConfigIo;

impl SudoConfigIo {
    /// Create a new sudo-mediated I/O handle
    pub fn new() -> Self {
        Self
    }

    fn stage_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("config");
        std::env::temp_dir().join(format!("leasebook-{}.{}", name, std::process::id()))
    }
}

#[async_trait]
impl ConfigIo for SudoConfigIo {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        let output = Command::new("sudo")
            .arg("cat")
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(Error::Other(format!(
                "sudo cat {} failed: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|_| Error::Other(format!("{} is not valid UTF-8", path.display())))
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let stage = Self::stage_path(path);
        tokio::fs::write(&stage, contents).await?;

        let status = Command::new("sudo")
            .arg("cp")
            .arg(&stage)
            .arg(path)
            .stdin(Stdio::null())
            .status()
            .await;

        if let Err(e) = tokio::fs::remove_file(&stage).await {
            warn!("could not remove staging file {}: {e}", stage.display());
        }

        match status {
            Ok(status) if status.success() => {
                debug!("installed {}", path.display());
                Ok(())
            }
            Ok(status) => Err(Error::Other(format!(
                "sudo cp to {} exited with {status}",
                path.display()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_tree(&self, path: &Path) -> Result<()> {
        // A tree path must have both a parent and a final component.
        if path.parent().is_none() || path.file_name().is_none() {
            return Err(Error::validation(format!(
                "refusing to remove non-tree path {}",
                path.display()
            )));
        }
        let output = Command::new("sudo")
            .args(["rm", "-rf", "--"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(Error::Other(format!(
                "sudo rm -rf {} failed: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
