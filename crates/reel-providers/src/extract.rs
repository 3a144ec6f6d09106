//! Declarative field extraction for provider responses.
//!
//! Providers do not agree on field names, and some change them between API
//! versions. Each adapter declares an ordered list of [`ExtractRule`]s for the
//! values it needs; the first rule yielding a non-empty value wins.

use serde_json::Value;

/// One place a value may live in a response body.
///
/// Paths are dot-separated object keys; numeric segments index into arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractRule {
    /// A string (or number) at the path.
    Field(&'static str),
    /// The first element of an array at the path.
    FirstElement(&'static str),
}

impl ExtractRule {
    pub fn path(&self) -> &'static str {
        match self {
            ExtractRule::Field(p) | ExtractRule::FirstElement(p) => p,
        }
    }

    /// Apply the rule to a response body.
    pub fn apply(&self, body: &Value) -> Option<String> {
        match self {
            ExtractRule::Field(path) => lookup(body, path).and_then(scalar_text),
            ExtractRule::FirstElement(path) => lookup(body, path)
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .and_then(scalar_text),
        }
    }
}

/// First non-empty value produced by `rules`, in order.
pub fn first_match(rules: &[ExtractRule], body: &Value) -> Option<String> {
    rules.iter().find_map(|rule| rule.apply(body))
}

/// Resolve a dotted path.
pub fn lookup<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(body, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

use ExtractRule::{Field, FirstElement};

/// KIE AI: video URL in a synchronous submission response.
pub const KIE_IMMEDIATE_URL: &[ExtractRule] = &[
    Field("videoUrl"),
    Field("video_url"),
    Field("url"),
    Field("downloadUrl"),
    Field("download_url"),
    Field("video"),
    Field("fileUrl"),
    Field("file_url"),
    Field("data.videoUrl"),
    Field("data.url"),
    Field("data.video"),
    Field("result.videoUrl"),
    Field("result.url"),
    Field("result.video"),
];

/// KIE AI: task identifier in a submission response.
pub const KIE_JOB_ID: &[ExtractRule] = &[
    Field("taskId"),
    Field("task_id"),
    Field("id"),
    Field("data.taskId"),
    Field("data.id"),
    Field("requestId"),
    Field("request_id"),
    Field("jobId"),
    Field("job_id"),
    Field("task"),
    Field("job"),
    Field("result.taskId"),
    Field("result.id"),
];

/// KIE AI: result URL in a record-info response. The first array element is
/// authoritative.
pub const KIE_RECORD_URL: &[ExtractRule] = &[
    FirstElement("data.response.resultUrls"),
    FirstElement("data.response.originUrls"),
];

/// Gemini Veo: content URI of a finished long-running operation.
pub const VEO_VIDEO_URI: &[ExtractRule] = &[
    Field("response.generateVideoResponse.generatedSamples.0.video.uri"),
    Field("response.generatedVideos.0.video.uri"),
];

/// fal.ai queue: request identifier.
pub const FAL_REQUEST_ID: &[ExtractRule] =
    &[Field("request_id"), Field("requestId"), Field("id")];

/// fal.ai queue: status string.
pub const FAL_STATUS: &[ExtractRule] = &[Field("status"), Field("state")];

/// fal.ai queue: output video URL.
pub const FAL_RESULT_URL: &[ExtractRule] = &[
    Field("video.url"),
    Field("response.video.url"),
    Field("response.video_url"),
    Field("response.url"),
    Field("response.output_url"),
    Field("response.merged_video_url"),
    Field("video_url"),
    Field("url"),
    Field("output_url"),
];

/// fal.ai queue: error text of a failed request.
pub const FAL_ERROR: &[ExtractRule] =
    &[Field("error"), Field("message"), Field("response.error")];

/// fal.ai storage: URL of an uploaded file.
pub const FAL_STORAGE_URL: &[ExtractRule] =
    &[Field("url"), Field("file_url"), Field("file_path")];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Build `{"a": {"b": value}}` for path `a.b`, using arrays for numeric
    /// segments.
    fn nest(path: &str, leaf: Value) -> Value {
        path.split('.').rev().fold(leaf, |inner, segment| {
            if segment.parse::<usize>().is_ok() {
                Value::Array(vec![inner])
            } else {
                let mut map = serde_json::Map::new();
                map.insert(segment.to_string(), inner);
                Value::Object(map)
            }
        })
    }

    fn place(rule: &ExtractRule, url: &str) -> Value {
        match rule {
            Field(path) => nest(path, json!(url)),
            FirstElement(path) => nest(path, json!([url, "https://other.example/x.mp4"])),
        }
    }

    #[test]
    fn test_every_alias_yields_the_same_url() {
        let url = "https://cdn.example/scene.mp4";
        for rules in [
            KIE_IMMEDIATE_URL,
            KIE_RECORD_URL,
            VEO_VIDEO_URI,
            FAL_RESULT_URL,
            FAL_STORAGE_URL,
        ] {
            for rule in rules {
                let body = place(rule, url);
                assert_eq!(
                    first_match(rules, &body).as_deref(),
                    Some(url),
                    "alias {} not extracted",
                    rule.path()
                );
            }
        }
    }

    #[test]
    fn test_every_job_id_alias() {
        for rules in [KIE_JOB_ID, FAL_REQUEST_ID] {
            for rule in rules {
                let body = place(rule, "job-42");
                assert_eq!(first_match(rules, &body).as_deref(), Some("job-42"));
            }
        }
    }

    #[test]
    fn test_order_and_empty_values() {
        let body = json!({ "videoUrl": "  ", "url": "https://b.example/v.mp4", "data": { "url": "https://c.example/v.mp4" } });
        assert_eq!(
            first_match(KIE_IMMEDIATE_URL, &body).as_deref(),
            Some("https://b.example/v.mp4")
        );
    }

    #[test]
    fn test_numeric_ids_and_non_scalars() {
        assert_eq!(first_match(KIE_JOB_ID, &json!({ "id": 1234 })).as_deref(), Some("1234"));
        assert_eq!(first_match(KIE_JOB_ID, &json!({ "task": { "nested": true } })), None);
        assert_eq!(first_match(KIE_RECORD_URL, &json!({ "data": { "response": { "resultUrls": [] } } })), None);
    }

    #[test]
    fn test_lookup_indexes_arrays() {
        let body = json!({ "a": [ { "b": "x" } ] });
        assert_eq!(lookup(&body, "a.0.b"), Some(&json!("x")));
        assert_eq!(lookup(&body, "a.1.b"), None);
        assert_eq!(lookup(&body, "a.b"), None);
    }
}
