use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::error::CliError;

/// `<dir>/<stem><suffix>.<ext>` next to the input.
pub fn output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    input.with_file_name(name)
}

// ═══════════════════════════════════════════════════════════════
//  StagedOutput
// ═══════════════════════════════════════════════════════════════

/// Hidden temporary file in the target's directory. `commit` renames it over
/// the target; anything else removes it, so a failed run never leaves a
/// partial output under the final name.
pub struct StagedOutput {
    target: PathBuf,
    temp: NamedTempFile,
}

impl StagedOutput {
    pub fn create(target: &Path) -> Result<Self, CliError> {
        let dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let temp = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".partial")
            .tempfile_in(dir)
            .map_err(|source| CliError::Output {
                path: target.display().to_string(),
                source,
            })?;

        Ok(Self {
            target: target.to_path_buf(),
            temp,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Independent handle to the staged file, for the writer to own.
    pub fn file(&self) -> Result<File, CliError> {
        self.temp.as_file().try_clone().map_err(|source| CliError::Output {
            path: self.temp.path().display().to_string(),
            source,
        })
    }

    pub fn commit(self) -> Result<(), CliError> {
        let target = self.target;
        self.temp.persist(&target).map_err(|e| CliError::Output {
            path: target.display().to_string(),
            source: e.error,
        })?;
        Ok(())
    }

    pub fn discard(self) {
        let path = self.temp.path().to_path_buf();
        if let Err(e) = self.temp.close() {
            tracing::warn!(path = %path.display(), error = %e, "cannot remove partial output");
        }
    }
}
