//! Video style, engine and asset type definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Visual style applied to every generated scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStyle {
    #[default]
    Cinematic,
    Gritty,
    Meme,
    Watercolor,
    Anime,
}

impl VideoStyle {
    pub const ALL: &'static [VideoStyle] = &[
        VideoStyle::Cinematic,
        VideoStyle::Gritty,
        VideoStyle::Meme,
        VideoStyle::Watercolor,
        VideoStyle::Anime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStyle::Cinematic => "cinematic",
            VideoStyle::Gritty => "gritty",
            VideoStyle::Meme => "meme",
            VideoStyle::Watercolor => "watercolor",
            VideoStyle::Anime => "anime",
        }
    }

    /// Keyword sentence appended to video prompts for this style.
    pub fn keywords(&self) -> &'static str {
        match self {
            VideoStyle::Cinematic => "Cinematic, hyper-realistic, 8k textures, anamorphic lens flares, dramatic lighting, high-end film production.",
            VideoStyle::Gritty => "Gritty, handheld camera, high contrast, film grain, raw historical footage look, muted colors, intense atmosphere.",
            VideoStyle::Meme => "Meme-style, vibrant colors, slightly exaggerated character expressions, fast-paced action, high-energy visuals.",
            VideoStyle::Watercolor => "Artistic watercolor painting style, soft edges, flowing textures, historical illustration feel, elegant and evocative.",
            VideoStyle::Anime => "High-quality anime style, detailed backgrounds, expressive characters, dynamic action lines, cinematic cel-shaded look.",
        }
    }
}

impl fmt::Display for VideoStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VideoStyle {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        VideoStyle::ALL
            .iter()
            .copied()
            .find(|style| style.as_str() == lower)
            .ok_or_else(|| ModelError::UnknownVariant {
                kind: "video style",
                value: s.to_string(),
            })
    }
}

/// Which video provider renders a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoEngine {
    /// KIE AI hosted Veo (task id + record-info polling)
    #[default]
    #[serde(alias = "kie")]
    KieVeo,
    /// Gemini API Veo (long-running operation, content fetched as a blob)
    #[serde(alias = "veo")]
    GeminiVeo,
}

impl VideoEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoEngine::KieVeo => "kie_veo",
            VideoEngine::GeminiVeo => "gemini_veo",
        }
    }

    /// The other engine, used by the fallback chain.
    pub fn alternate(&self) -> VideoEngine {
        match self {
            VideoEngine::KieVeo => VideoEngine::GeminiVeo,
            VideoEngine::GeminiVeo => VideoEngine::KieVeo,
        }
    }
}

impl fmt::Display for VideoEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VideoEngine {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kie_veo" | "kie" => Ok(VideoEngine::KieVeo),
            "gemini_veo" | "veo" => Ok(VideoEngine::GeminiVeo),
            _ => Err(ModelError::UnknownVariant {
                kind: "video engine",
                value: s.to_string(),
            }),
        }
    }
}

/// Kind of asset a scene carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Image,
    #[default]
    Video,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Image => "image",
            AssetType::Video => "video",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parsing() {
        assert_eq!("Gritty".parse::<VideoStyle>().unwrap(), VideoStyle::Gritty);
        assert_eq!(" anime ".parse::<VideoStyle>().unwrap(), VideoStyle::Anime);
        assert!("noir".parse::<VideoStyle>().is_err());
        assert_eq!(VideoStyle::default(), VideoStyle::Cinematic);
    }

    #[test]
    fn test_engine_serde_aliases() {
        let engine: VideoEngine = serde_json::from_str("\"veo\"").unwrap();
        assert_eq!(engine, VideoEngine::GeminiVeo);
        let engine: VideoEngine = serde_json::from_str("\"kie_veo\"").unwrap();
        assert_eq!(engine, VideoEngine::KieVeo);
        assert_eq!(engine.alternate(), VideoEngine::GeminiVeo);
    }

    #[test]
    fn test_asset_type_wire_names() {
        assert_eq!(serde_json::to_string(&AssetType::Video).unwrap(), "\"video\"");
        let t: AssetType = serde_json::from_str("\"image\"").unwrap();
        assert_eq!(t, AssetType::Image);
    }
}
