//! Topic research results.

use serde::{Deserialize, Serialize};

/// One researched fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Facts and grounding sources gathered for a topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Research {
    pub facts: Vec<Fact>,
    /// Raw grounding chunks as returned by the search tool
    #[serde(default)]
    pub grounding_sources: Vec<serde_json::Value>,
}

impl Research {
    /// Facts flattened into the text block fed to the script prompt.
    pub fn facts_text(&self) -> String {
        self.facts
            .iter()
            .map(|f| f.content.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
