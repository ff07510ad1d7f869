//! Local staging area for rendered output.

use crate::publish::PublishError;
use std::fs;
use std::path::Path;
use vaultpress_types::OutputFile;

/// Write every output file below `dir`, creating directories as needed
///
/// Returns the staged paths relative to `dir`, in input order.
pub fn stage_outputs(dir: &Path, files: &[OutputFile]) -> Result<Vec<String>, PublishError> {
    fs::create_dir_all(dir).map_err(|source| PublishError::io(dir, source))?;

    let mut staged = Vec::with_capacity(files.len());
    for file in files {
        let target = dir.join(&file.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| PublishError::io(parent, source))?;
        }
        fs::write(&target, &file.content).map_err(|source| PublishError::io(&target, source))?;
        tracing::debug!("Staged {:?}", target);
        staged.push(file.path.clone());
    }

    tracing::info!("Staged {} files to {:?}", staged.len(), dir);
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_outputs_creates_directories() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("site");
        let files = vec![
            OutputFile::new("index.html", "<html></html>"),
            OutputFile::new("nested/page.html", "page"),
        ];

        let staged = stage_outputs(&out, &files)?;
        assert_eq!(staged, vec!["index.html", "nested/page.html"]);
        assert_eq!(fs::read_to_string(out.join("index.html"))?, "<html></html>");
        assert_eq!(fs::read_to_string(out.join("nested/page.html"))?, "page");
        Ok(())
    }

    #[test]
    fn test_stage_into_file_path_fails() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("site");
        fs::write(&blocker, "not a directory")?;

        let err = stage_outputs(&blocker, &[OutputFile::new("index.html", "x")]).unwrap_err();
        assert!(matches!(err, PublishError::Io { .. }));
        Ok(())
    }
}
