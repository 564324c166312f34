use crate::job::JobId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const FALLBACK_UPLOAD_NAME: &str = "upload";

/// `{dir}/{job_id}_{client_name}`, keeping only the final path component of
/// the client-supplied name.
#[must_use]
pub fn input_artifact_path(dir: &Path, job_id: &JobId, client_name: &str) -> PathBuf {
	let name = Path::new(client_name)
		.file_name()
		.and_then(|name| name.to_str())
		.filter(|name| !name.is_empty())
		.unwrap_or(FALLBACK_UPLOAD_NAME);

	dir.join(format!("{job_id}_{name}"))
}

/// `{dir}/{job_id}_response.{extension}`
#[must_use]
pub fn output_artifact_path(dir: &Path, job_id: &JobId, extension: &str) -> PathBuf {
	dir.join(format!("{job_id}_response.{extension}"))
}

/// Deletes the file it guards when dropped.
///
/// Held for the duration of a stage call so the artifact goes away on every
/// exit path, panics included.
#[derive(Debug)]
pub struct ArtifactGuard {
	path: PathBuf,
}

impl ArtifactGuard {
	#[must_use]
	pub const fn new(path: PathBuf) -> Self {
		Self { path }
	}
}

impl Drop for ArtifactGuard {
	fn drop(&mut self) {
		match std::fs::remove_file(&self.path) {
			Ok(()) => debug!(path = %self.path.display(), "Removed artifact"),
			Err(e) if e.kind() == ErrorKind::NotFound => {}
			Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove artifact"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_input_path_strips_directories() {
		let path = input_artifact_path(Path::new("shared_data"), &"J1".into(), "../../etc/a.wav");
		assert_eq!(path, PathBuf::from("shared_data/J1_a.wav"));
	}

	#[test]
	fn test_input_path_falls_back_for_empty_name() {
		let path = input_artifact_path(Path::new("shared_data"), &"J1".into(), "");
		assert_eq!(path, PathBuf::from("shared_data/J1_upload"));
	}

	#[test]
	fn test_output_path_convention() {
		let path = output_artifact_path(Path::new("output"), &"J1".into(), "wav");
		assert_eq!(path.display().to_string(), "output/J1_response.wav");
	}

	#[test]
	fn test_guard_removes_file_on_drop() -> std::io::Result<()> {
		let dir = tempfile::tempdir()?;
		let path = dir.path().join("J1_a.wav");
		std::fs::write(&path, b"RIFF")?;

		{
			let _guard = ArtifactGuard::new(path.clone());
			assert!(path.exists());
		}

		assert!(!path.exists());
		Ok(())
	}

	#[test]
	fn test_guard_ignores_missing_file() {
		drop(ArtifactGuard::new(PathBuf::from("does/not/exist.wav")));
	}
}
