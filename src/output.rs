//! Delivery of export artifacts into an output directory.
use crate::error::ResultMessage;
use crate::error::SweeperError;
use crate::export::ExportArtifact;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum OutputError {
    /// The artifact would replace one of the files being processed
    #[error("Not writing '{0}': it is one of the input files")]
    WouldOverwriteInput(String),

    /// Another file of the same run already produced this artifact
    #[error("Not writing '{0}': another file of this run was already written there")]
    AlreadyWritten(String),
}

/// Writes artifacts into one directory without replacing the inputs of the run
/// or an artifact written earlier in the run.
pub struct OutputDirectory {
    dir: PathBuf,
    inputs: HashSet<PathBuf>,
    written: HashSet<PathBuf>,
}

impl OutputDirectory {
    /// Input paths that cannot be resolved are ignored; they were never read.
    pub fn new<P: AsRef<Path>>(dir: &Path, inputs: &[P]) -> Self {
        let inputs = inputs
            .iter()
            .filter_map(|input| fs::canonicalize(input).ok())
            .collect();
        OutputDirectory {
            dir: dir.to_owned(),
            inputs,
            written: HashSet::new(),
        }
    }

    /// Writes the artifact under its file name and returns the path written.
    /// The directory is created on first use.
    pub fn write(&mut self, artifact: &ExportArtifact) -> Result<PathBuf, SweeperError> {
        let target = fs::create_dir_all(&self.dir)
            .and_then(|()| fs::canonicalize(&self.dir))
            .map_err(SweeperError::from)
            .with_prefix(&format!("Create output directory '{}' failed", self.dir.display()))?
            .join(&artifact.filename);
        // An existing target may be a link to an input
        let resolved = fs::canonicalize(&target).unwrap_or_else(|_| target.to_owned());
        if self.inputs.contains(&resolved) {
            return Err(OutputError::WouldOverwriteInput(target.display().to_string()).into());
        }
        if !self.written.insert(resolved) {
            return Err(OutputError::AlreadyWritten(target.display().to_string()).into());
        }
        fs::write(&target, &artifact.bytes)
            .map_err(SweeperError::from)
            .with_prefix(&format!("Write '{}' failed", target.display()))?;
        info!("wrote {} ({} bytes, {})", target.display(), artifact.bytes.len(), artifact.mime_type);
        Ok(target)
    }
}
