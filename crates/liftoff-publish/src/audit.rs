use std::path::{Path, PathBuf};

use tracing::debug;

use liftoff_types::DirectoryManifest;

use crate::error::{PipelineResult, PublishError};

/// Audit file name for a published directory: `{basename}.json`.
///
/// Paths without a final component (such as `/`) fall back to `root`.
pub fn audit_file_name(dir: &Path) -> String {
    let base = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .or_else(|| {
            dir.canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|name| name.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "root".into());
    format!("{base}.json")
}

/// Write the manifest of `dir` as pretty JSON into `audit_dir`.
pub async fn write_audit(
    audit_dir: &Path,
    dir: &Path,
    manifest: &DirectoryManifest,
) -> PipelineResult<PathBuf> {
    tokio::fs::create_dir_all(audit_dir)
        .await
        .map_err(|e| PublishError::io(audit_dir, e))?;
    let target = audit_dir.join(audit_file_name(dir));
    let json = manifest.to_audit_json()?;
    tokio::fs::write(&target, json)
        .await
        .map_err(|e| PublishError::io(&target, e))?;
    debug!(path = %target.display(), entries = manifest.len(), "audit written");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use liftoff_types::ContentId;

    #[test]
    fn file_name_from_base() {
        assert_eq!(audit_file_name(Path::new("site/assets")), "assets.json");
        assert_eq!(audit_file_name(Path::new("/")), "root.json");
    }

    #[test]
    fn file_name_resolves_parent_components() {
        let tmp = tempfile::tempdir().unwrap();
        let site = tmp.path().join("site");
        std::fs::create_dir_all(site.join("assets")).unwrap();
        assert_eq!(audit_file_name(&site.join("assets").join("..")), "site.json");
    }

    #[tokio::test]
    async fn writes_readable_manifest() {
        let out = tempfile::tempdir().unwrap();
        let mut manifest = DirectoryManifest::new();
        manifest
            .insert(
                "index.html",
                ContentId::parse("bafybeihdxnfgloqg26ztcaawxijkbibgyt6uykhhdtyk4spuamub2tgnfm").unwrap(),
            )
            .unwrap();

        let path = write_audit(&out.path().join("audit"), Path::new("site"), &manifest)
            .await
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "site.json");

        let written = std::fs::read(&path).unwrap();
        assert!(String::from_utf8_lossy(&written).contains("\n    \"index.html\""));
        assert_eq!(DirectoryManifest::from_audit_json(&written).unwrap(), manifest);
    }
}
