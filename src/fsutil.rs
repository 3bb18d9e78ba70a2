//! Filesystem collaborator: directory creation, attribute handling and file
//! writing used when extracting archives to disk.
//!
//! Kept apart from the archive model, which only ever sees in-memory buffers.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MZipError, Result};

/// Default permission bits for written files (0666)
const DEFAULT_FILE_MODE: u32 = 0o666;

/// Create a directory path component by component.
///
/// A plain file occupying one of the components is reported as
/// `FileInTheWay`, distinct from an ordinary I/O failure.
pub fn make_dir(path: &Path) -> Result<()> {
    let mut current = PathBuf::new();
    for component in path.components() {
        current.push(component);
        match fs::metadata(&current) {
            Ok(meta) if meta.is_file() => {
                return Err(MZipError::FileInTheWay(current.display().to_string()));
            }
            Ok(_) => {}
            Err(_) => fs::create_dir(&current)?,
        }
    }
    Ok(())
}

/// Write `content` to `path`, creating parent directories as needed.
///
/// Returns `Ok(false)` without touching anything when the target exists and
/// `overwrite` is not set, or when the target is a directory. Permission
/// bits default to 0666.
pub fn write_file_to(
    path: &Path,
    content: &[u8],
    overwrite: bool,
    attr: Option<u32>,
) -> Result<bool> {
    if let Ok(meta) = fs::metadata(path) {
        if !overwrite || meta.is_dir() {
            return Ok(false);
        }
    }
    if let Some(folder) = path.parent() {
        if !folder.as_os_str().is_empty() && !folder.exists() {
            make_dir(folder)?;
        }
    }
    fs::write(path, content)?;
    set_attributes(path, attr.unwrap_or(DEFAULT_FILE_MODE))?;
    Ok(true)
}

/// Async form of `write_file_to`
#[cfg(feature = "async")]
pub async fn write_file_to_async(
    path: &Path,
    content: &[u8],
    overwrite: bool,
    attr: Option<u32>,
) -> Result<bool> {
    if let Ok(meta) = tokio::fs::metadata(path).await {
        if !overwrite || meta.is_dir() {
            return Ok(false);
        }
    }
    if let Some(folder) = path.parent() {
        if !folder.as_os_str().is_empty() && !folder.exists() {
            make_dir(folder)?;
        }
    }
    tokio::fs::write(path, content).await?;
    set_attributes(path, attr.unwrap_or(DEFAULT_FILE_MODE))?;
    Ok(true)
}

/// Permission bits of a path (0 on platforms without unix modes)
pub fn get_attributes(path: &Path) -> Result<u32> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Ok(fs::metadata(path)?.permissions().mode())
    }
    #[cfg(not(unix))]
    {
        let _ = fs::metadata(path)?;
        Ok(0)
    }
}

/// Apply permission bits to a path (no-op on platforms without unix modes)
pub fn set_attributes(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }
    Ok(())
}

/// Recursively list every file and directory below `dir`
pub fn find_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(find_files(&path)?);
            files.push(path);
        } else {
            files.push(path);
        }
    }
    Ok(files)
}
