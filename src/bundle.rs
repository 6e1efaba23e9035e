//! The bundle loader (§1, §5): an external boundary that unpacks a
//! zipped scene file into a `TreeDoc` and a models directory. Archive
//! format specifics are not the target of testing effort here (§1
//! deliberately treats this as `LoadBundle(path) -> (TreeDoc, ModelsDir)`).

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, WebkinError};
use crate::tree::TreeDoc;

/// Owns the temporary directory the bundle was unpacked into; removed
/// on drop and whenever a new bundle is loaded (§5 "Resources").
pub struct Bundle {
    pub doc: TreeDoc,
    temp_dir: PathBuf,
    models_dir: PathBuf,
}

impl Bundle {
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }
}

impl Drop for Bundle {
    fn drop(&mut self) {
        if self.temp_dir.exists() {
            if let Err(err) = fs::remove_dir_all(&self.temp_dir) {
                tracing::warn!(error = %err, dir = %self.temp_dir.display(), "failed to clean up bundle temp dir");
            }
        }
    }
}

/// `LoadBundle(path) -> (TreeDoc, ModelsDir)`: extracts a `.k3d` zip
/// archive into a fresh temp directory, expecting a `tree.json` at its
/// root and a `models/` subdirectory alongside it.
pub fn load_bundle(path: &Path) -> Result<Bundle> {
    let file = fs::File::open(path).map_err(WebkinError::Io)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| WebkinError::Bundle(format!("{}: {e}", path.display())))?;

    let temp_dir = std::env::temp_dir().join(format!("webkin-bundle-{}", std::process::id()));
    fs::create_dir_all(&temp_dir).map_err(WebkinError::Io)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| WebkinError::Bundle(e.to_string()))?;
        let Some(enclosed) = entry.enclosed_name() else { continue };
        let out_path = temp_dir.join(enclosed);
        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(WebkinError::Io)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).map_err(WebkinError::Io)?;
            }
            let mut out = fs::File::create(&out_path).map_err(WebkinError::Io)?;
            std::io::copy(&mut entry, &mut out).map_err(WebkinError::Io)?;
        }
    }

    let tree_json_path = temp_dir.join("tree.json");
    let tree_json = fs::read_to_string(&tree_json_path).map_err(WebkinError::Io)?;
    let doc: TreeDoc = serde_json::from_str(&tree_json).map_err(WebkinError::Json)?;

    let models_dir = temp_dir.join("models");
    Ok(Bundle { doc, temp_dir, models_dir })
}

/// A minimal fallback tree served when no bundle is configured or the
/// configured bundle fails to load (§4.7: "server starts anyway with
/// fallback tree").
pub fn fallback_tree_doc() -> TreeDoc {
    TreeDoc {
        name: "root".to_string(),
        node_type: "transform".to_string(),
        pose: crate::tree::doc::WirePose {
            position: [0.0, 0.0, 0.0],
            orientation: [0.0, 0.0, 0.0, 1.0],
        },
        axis: None,
        axis_offset: None,
        axis_scale: None,
        slider_min: None,
        slider_max: None,
        model: serde_json::Value::Null,
        children: vec![],
    }
}
