use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::image_handle::ImageHandle;
use crate::session::HistoryEntry;

pub const HISTORY_MANIFEST_FILE: &str = "history.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedEntry {
    pub id: String,
    pub prompt: String,
    pub created_at_ms: i64,
    pub file: String,
}

/// `lumina-edit-<millis>.<ext>`, the name the download action uses.
pub fn default_export_name(handle: &ImageHandle, stamp_ms: i64) -> String {
    format!("lumina-edit-{stamp_ms}.{}", handle.file_extension())
}

pub fn save_image(handle: &ImageHandle, path: &Path) -> anyhow::Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let bytes = handle.decode_bytes()?;
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Writes every entry as `<index>-<id>.<ext>` plus a `history.json` manifest,
/// newest first like the session history.
pub fn export_history(history: &[HistoryEntry], dir: &Path) -> anyhow::Result<Vec<ExportedEntry>> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let mut rows = Vec::with_capacity(history.len());
    for (idx, entry) in history.iter().enumerate() {
        let file = format!(
            "{:02}-{}.{}",
            idx,
            sanitize_file_stem(&entry.id),
            entry.image.file_extension()
        );
        save_image(&entry.image, &dir.join(&file))?;
        rows.push(ExportedEntry {
            id: entry.id.clone(),
            prompt: entry.prompt.clone(),
            created_at_ms: entry.created_at_ms,
            file,
        });
    }
    let manifest_path = dir.join(HISTORY_MANIFEST_FILE);
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&rows)?)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;
    Ok(rows)
}

fn sanitize_file_stem(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .take(48)
        .collect();
    if cleaned.is_empty() {
        "entry".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::Value;

    use super::{default_export_name, export_history, save_image, HISTORY_MANIFEST_FILE};
    use crate::image_handle::ImageHandle;
    use crate::session::HistoryEntry;

    fn entry(id: &str, bytes: &[u8], mime: &str) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            image: ImageHandle::from_bytes(bytes, mime).expect("handle"),
            prompt: format!("prompt for {id}"),
            created_at_ms: 42,
        }
    }

    #[test]
    fn default_name_uses_mime_extension() -> anyhow::Result<()> {
        let jpeg = ImageHandle::from_bytes(b"x", "image/jpeg")?;
        assert_eq!(default_export_name(&jpeg, 1700), "lumina-edit-1700.jpg");
        Ok(())
    }

    #[test]
    fn save_image_writes_decoded_bytes() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let handle = ImageHandle::from_bytes(b"png-bytes", "image/png")?;
        let path = save_image(&handle, &temp.path().join("nested/out.png"))?;
        assert_eq!(fs::read(path)?, b"png-bytes");
        Ok(())
    }

    #[test]
    fn export_history_writes_files_and_manifest() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let history = vec![
            entry("b/2", b"second", "image/webp"),
            entry("a1", b"first", "image/png"),
        ];
        let rows = export_history(&history, temp.path())?;
        assert_eq!(rows[0].file, "00-b_2.webp");
        assert_eq!(rows[1].file, "01-a1.png");
        assert_eq!(fs::read(temp.path().join("01-a1.png"))?, b"first");

        let manifest: Value =
            serde_json::from_str(&fs::read_to_string(temp.path().join(HISTORY_MANIFEST_FILE))?)?;
        assert_eq!(manifest[0]["id"], Value::from("b/2"));
        assert_eq!(manifest[1]["prompt"], Value::from("prompt for a1"));
        Ok(())
    }
}
