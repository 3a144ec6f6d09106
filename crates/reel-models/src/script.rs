//! Script model and the script JSON contract.
//!
//! The text model is asked for a JSON object shaped like [`Script`]. Its output
//! is parsed and validated by [`Script::from_provider_json`] immediately after
//! the text-generation call, before any scene work starts.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::scene::{Scene, SceneId, SceneUpdate};
use crate::style::AssetType;

/// A generated short-form video script. Scene order defines video order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Script {
    pub topic: String,
    pub hook: String,
    pub body: String,
    pub outro: String,
    pub scenes: Vec<Scene>,
}

const REQUIRED_SCRIPT_FIELDS: &[&str] = &["topic", "hook", "body", "outro"];
const REQUIRED_SCENE_FIELDS: &[&str] = &["id", "timestamp", "text", "visualPrompt", "assetType"];

impl Script {
    /// Parse and validate raw text-model output.
    ///
    /// Markdown code fences around the JSON are tolerated. Any parse failure,
    /// missing field or invalid scene list yields `InvalidScriptFormat`.
    pub fn from_provider_json(raw: &str) -> ModelResult<Script> {
        let text = strip_code_fence(raw);
        if text.is_empty() {
            return Err(ModelError::invalid_script("empty response"));
        }

        let value: Value = serde_json::from_str(text)
            .map_err(|e| ModelError::invalid_script(format!("not valid JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| ModelError::invalid_script("top-level value is not an object"))?;

        for field in REQUIRED_SCRIPT_FIELDS {
            match object.get(*field) {
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(ModelError::invalid_script(format!(
                        "field '{}' must be a string",
                        field
                    )))
                }
                None => {
                    return Err(ModelError::invalid_script(format!(
                        "missing field '{}'",
                        field
                    )))
                }
            }
        }

        let scenes = object
            .get("scenes")
            .ok_or_else(|| ModelError::invalid_script("missing field 'scenes'"))?
            .as_array()
            .ok_or_else(|| ModelError::invalid_script("field 'scenes' must be an array"))?;

        for (index, scene) in scenes.iter().enumerate() {
            let scene = scene.as_object().ok_or_else(|| {
                ModelError::invalid_script(format!("scene {} is not an object", index + 1))
            })?;
            for field in REQUIRED_SCENE_FIELDS {
                if !scene.contains_key(*field) {
                    return Err(ModelError::invalid_script(format!(
                        "scene {} is missing field '{}'",
                        index + 1,
                        field
                    )));
                }
            }
        }

        let script: Script = serde_json::from_value(value)
            .map_err(|e| ModelError::invalid_script(e.to_string()))?;
        script.validate()?;
        Ok(script)
    }

    /// Check the structural invariants of a script.
    pub fn validate(&self) -> ModelResult<()> {
        if self.scenes.is_empty() {
            return Err(ModelError::invalid_script("script has no scenes"));
        }

        let mut seen = HashSet::with_capacity(self.scenes.len());
        for (index, scene) in self.scenes.iter().enumerate() {
            if scene.id.as_str().trim().is_empty() {
                return Err(ModelError::invalid_script(format!(
                    "scene {} has an empty id",
                    index + 1
                )));
            }
            if !seen.insert(scene.id.as_str()) {
                return Err(ModelError::invalid_script(format!(
                    "duplicate scene id '{}'",
                    scene.id
                )));
            }
        }

        Ok(())
    }

    pub fn scene(&self, id: &SceneId) -> Option<&Scene> {
        self.scenes.iter().find(|s| &s.id == id)
    }

    pub fn scene_mut(&mut self, id: &SceneId) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| &s.id == id)
    }

    /// Merge pipeline deltas into the matching scenes.
    pub fn apply_updates<'a>(&mut self, updates: impl IntoIterator<Item = &'a SceneUpdate>) {
        for update in updates {
            if let Some(scene) = self.scene_mut(&update.scene_id) {
                scene.apply_update(update);
            }
        }
    }

    /// Scenes that have a remote, stitchable video asset.
    pub fn resolved_video_count(&self) -> usize {
        self.scenes
            .iter()
            .filter(|s| s.asset_type == AssetType::Video && s.remote_asset_url().is_some())
            .count()
    }
}

/// JSON schema of the script contract.
pub fn script_json_schema() -> Value {
    serde_json::to_value(schemars::schema_for!(Script)).unwrap_or(Value::Null)
}

/// Strip a surrounding Markdown code fence (```json ... ```).
fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```JSON"))
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}
