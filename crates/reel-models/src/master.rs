//! Stitched master video.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::asset_url::AssetUrl;

/// The single video stitched from every scene of a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterArtifact {
    pub url: AssetUrl,
    /// Number of scene clips stitched; always equals the script's scene count
    pub scene_count: usize,
    pub created_at: DateTime<Utc>,
}

impl MasterArtifact {
    pub fn new(url: AssetUrl, scene_count: usize) -> Self {
        Self {
            url,
            scene_count,
            created_at: Utc::now(),
        }
    }
}
