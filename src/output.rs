//! Writing rendered artifacts to disk

use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::template::TemplateKind;

/// Errors that can occur while writing artifacts
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One rendered file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: TemplateKind,
    pub path: PathBuf,
    pub text: String,
}

/// Write every artifact, creating parent directories as needed
pub fn write_artifacts(artifacts: &[Artifact]) -> Result<(), OutputError> {
    for artifact in artifacts {
        if let Some(parent) = artifact.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| OutputError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&artifact.path, &artifact.text).map_err(|source| OutputError::Write {
            path: artifact.path.clone(),
            source,
        })?;
        info!(kind = %artifact.kind, path = %artifact.path.display(), "wrote artifact");
    }
    Ok(())
}

/// Print artifacts with a header line per file instead of writing them
pub fn print_artifacts<W: Write>(artifacts: &[Artifact], out: &mut W) -> io::Result<()> {
    for artifact in artifacts {
        writeln!(out, "# ==> {} ({})", artifact.path.display(), artifact.kind)?;
        writeln!(out, "{}", artifact.text)?;
    }
    Ok(())
}
