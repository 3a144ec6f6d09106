//! Object key conventions.

use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Build an object key under `prefix`, sanitising the file name.
pub fn object_key(prefix: &str, file_name: &str) -> StorageResult<String> {
    let name = sanitize_segment(file_name);
    if name.is_empty() || name.chars().all(|c| c == '.') {
        return Err(StorageError::InvalidKey(file_name.to_string()));
    }

    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        Ok(name)
    } else {
        Ok(format!("{}/{}", prefix, name))
    }
}

/// Unique file name for a scene's generated visual.
pub fn scene_asset_key(scene_id: &str, extension: &str) -> String {
    format!(
        "scenes/{}-{}.{}",
        sanitize_segment(scene_id),
        Uuid::new_v4().simple(),
        extension.trim_start_matches('.')
    )
}

/// Unique file name for a scene's narration audio.
pub fn narration_key(scene_id: &str) -> String {
    format!(
        "narration/{}-{}.wav",
        sanitize_segment(scene_id),
        Uuid::new_v4().simple()
    )
}

fn sanitize_segment(raw: &str) -> String {
    raw.trim()
        .split('/')
        .map(|segment| {
            segment
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                        c
                    } else {
                        '-'
                    }
                })
                .collect::<String>()
        })
        .filter(|segment| !segment.is_empty() && segment != "." && segment != "..")
        .collect::<Vec<_>>()
        .join("/")
}
