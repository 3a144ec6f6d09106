//! KIE AI hosted Veo video generation.
//!
//! Submit returns either a finished video URL or a task id; task ids are
//! polled through `record-info` until `successFlag == 1`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reel_models::{SceneUpdate, VideoEngine};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::adapter::{GeneratedAsset, GenerationRequest, VideoGenerator};
use crate::credentials::{CredentialKey, CredentialProvider};
use crate::error::{ProviderError, ProviderResult};
use crate::extract::{self, first_match};
use crate::http;
use crate::poller::{AsyncJobPoller, JobContext, PollPolicy, PollStatus, Submission};

const PROVIDER: &str = "kie_veo";

/// Configuration for the KIE AI client.
#[derive(Debug, Clone)]
pub struct KieConfig {
    pub base_url: String,
    pub model: String,
    pub aspect_ratio: String,
    pub timeout: Duration,
    pub poll: PollPolicy,
    /// `successFlag` values treated as terminal failure
    pub failure_flags: Vec<i64>,
}

impl Default for KieConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.kie.ai".to_string(),
            model: "veo3_fast".to_string(),
            aspect_ratio: "9:16".to_string(),
            timeout: Duration::from_secs(60),
            poll: PollPolicy::VIDEO_GENERATION,
            failure_flags: vec![2, 3],
        }
    }
}

impl KieConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    aspect_ratio: &'a str,
    enable_fallback: bool,
    enable_translation: bool,
    generation_type: &'a str,
}

/// KIE AI Veo client.
pub struct KieVeoClient {
    http: Client,
    config: KieConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl KieVeoClient {
    pub fn new(config: KieConfig, credentials: Arc<dyn CredentialProvider>) -> ProviderResult<Self> {
        Ok(Self {
            http: http::build_client(PROVIDER, config.timeout)?,
            config,
            credentials,
        })
    }

    fn api_key(&self) -> ProviderResult<String> {
        self.credentials.require(CredentialKey::KieAi, PROVIDER)
    }

    fn poller(&self) -> AsyncJobPoller {
        AsyncJobPoller::new(PROVIDER, self.config.poll).with_label("Rendering")
    }

    async fn submit(&self, api_key: &str, prompt: &str) -> ProviderResult<Submission<GeneratedAsset>> {
        let url = http::endpoint(&self.config.base_url, "/api/v1/veo/generate");
        let body = GenerateRequest {
            prompt,
            model: &self.config.model,
            aspect_ratio: &self.config.aspect_ratio,
            enable_fallback: false,
            enable_translation: true,
            generation_type: "TEXT_2_VIDEO",
        };

        debug!("Submitting KIE generation ({} prompt chars)", prompt.len());
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e))?;

        let data = http::read_json(PROVIDER, response).await?;
        interpret_submission(&data)
    }

    async fn poll_once(&self, api_key: &str, task_id: &str) -> ProviderResult<PollStatus<GeneratedAsset>> {
        let url = http::endpoint(&self.config.base_url, "/api/v1/veo/record-info");
        let response = self
            .http
            .get(&url)
            .query(&[("taskId", task_id)])
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e))?;

        let data = http::read_json(PROVIDER, response).await?;
        match interpret_record(&data, &self.config.failure_flags) {
            // A finished task with an unusable URL will not get better
            PollStatus::Done(raw) => match http::remote_url(PROVIDER, &raw) {
                Ok(url) => Ok(PollStatus::Done(GeneratedAsset::new(url, task_id))),
                Err(e) => Ok(PollStatus::Failed(e.to_string())),
            },
            PollStatus::Pending(message) => Ok(PollStatus::Pending(message)),
            PollStatus::Failed(reason) => Ok(PollStatus::Failed(reason)),
        }
    }

    /// Single status lookup for a known task id.
    pub async fn fetch_status(&self, task_id: &str) -> ProviderResult<PollStatus<GeneratedAsset>> {
        let api_key = self.api_key()?;
        self.poll_once(&api_key, task_id).await
    }
}

#[async_trait]
impl VideoGenerator for KieVeoClient {
    fn engine(&self) -> VideoEngine {
        VideoEngine::KieVeo
    }

    async fn generate(&self, request: &GenerationRequest, ctx: &JobContext) -> ProviderResult<GeneratedAsset> {
        let api_key = self.api_key()?;
        let prompt = request.enhanced_prompt();

        ctx.progress.status("Initiating scene generation with KIE AI...");
        let asset = self
            .poller()
            .run(
                self.submit(&api_key, &prompt),
                |task_id| {
                    let api_key = api_key.clone();
                    async move { self.poll_once(&api_key, &task_id).await }
                },
                ctx,
            )
            .await?;

        info!(job_id = %asset.job_id, "KIE video ready");
        Ok(asset)
    }

    async fn resume(&self, job_id: &str, ctx: &JobContext) -> ProviderResult<GeneratedAsset> {
        let api_key = self.api_key()?;

        ctx.progress.status("Fetching video from KIE AI...");
        // One immediate lookup so a finished job resolves without a poll delay
        match self.fetch_status(job_id).await {
            Ok(PollStatus::Done(asset)) => return Ok(asset),
            Ok(PollStatus::Failed(reason)) => {
                return Err(ProviderError::generation_failed(PROVIDER, reason))
            }
            Ok(PollStatus::Pending(_)) | Err(_) => {}
        }

        self.poller()
            .wait(
                job_id,
                |task_id| {
                    let api_key = api_key.clone();
                    async move { self.poll_once(&api_key, &task_id).await }
                },
                ctx,
            )
            .await
    }
}

/// Classify a submission response.
fn interpret_submission(data: &Value) -> ProviderResult<Submission<GeneratedAsset>> {
    let job_id = first_match(extract::KIE_JOB_ID, data);

    if let Some(raw) = first_match(extract::KIE_IMMEDIATE_URL, data) {
        let url = http::remote_url(PROVIDER, &raw)?;
        let job_id = job_id.unwrap_or_else(|| SceneUpdate::IMMEDIATE_JOB_ID.to_string());
        return Ok(Submission::Immediate(GeneratedAsset::new(url, job_id)));
    }

    match job_id {
        Some(id) => Ok(Submission::Pending(id)),
        None => Err(ProviderError::no_job_id(PROVIDER, http::snippet(&data.to_string()))),
    }
}

/// Classify a record-info response.
///
/// Done when `successFlag == 1` with a result URL. Failed on a non-zero
/// `errorCode` or a `successFlag` in `failure_flags`. Anything else,
/// including envelope codes other than 200, is still pending.
fn interpret_record(data: &Value, failure_flags: &[i64]) -> PollStatus<String> {
    let record = data.get("data");
    let code = data.get("code").and_then(Value::as_i64);
    let success_flag = record.and_then(|r| r.get("successFlag")).and_then(Value::as_i64);
    let error_code = record
        .and_then(|r| r.get("errorCode"))
        .and_then(|c| c.as_i64().or_else(|| c.as_str().and_then(|s| s.trim().parse().ok())))
        .filter(|c| *c != 0);
    let error_message = record
        .and_then(|r| r.get("errorMessage"))
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .or_else(|| data.get("msg").and_then(Value::as_str));

    if let Some(error_code) = error_code {
        return PollStatus::Failed(format!(
            "{} (errorCode {})",
            error_message.unwrap_or("Video generation failed"),
            error_code
        ));
    }

    if code.is_some_and(|c| c != 200) {
        return PollStatus::Pending(Some(format!(
            "Status: {}",
            error_message.unwrap_or("Unknown error")
        )));
    }

    match success_flag {
        Some(1) => match first_match(extract::KIE_RECORD_URL, data) {
            Some(url) => PollStatus::Done(url),
            None => PollStatus::Pending(Some("Video ready but URL not found".to_string())),
        },
        Some(flag) if failure_flags.contains(&flag) => PollStatus::Failed(
            error_message
                .unwrap_or("Video generation failed")
                .to_string(),
        ),
        _ => {
            let line = if record.and_then(|r| r.get("response")).is_some_and(|r| !r.is_null()) {
                "Processing"
            } else {
                "Waiting for video"
            };
            PollStatus::Pending(Some(line.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::LayeredCredentials;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> KieVeoClient {
        let creds = LayeredCredentials::configured_only().with(CredentialKey::KieAi, "kie-key");
        let config = KieConfig::default()
            .with_base_url(server.uri())
            .with_poll(PollPolicy::new(Duration::from_millis(5), 10));
        KieVeoClient::new(config, Arc::new(creds)).unwrap()
    }

    #[test]
    fn test_record_classification() {
        let flags = [2, 3];
        let done = json!({"code": 200, "data": {"successFlag": 1, "response": {"resultUrls": ["https://cdn.example/1.mp4"]}}});
        assert_eq!(interpret_record(&done, &flags), PollStatus::Done("https://cdn.example/1.mp4".into()));

        let origin = json!({"code": 200, "data": {"successFlag": 1, "response": {"resultUrls": [], "originUrls": ["https://cdn.example/o.mp4"]}}});
        assert_eq!(interpret_record(&origin, &flags), PollStatus::Done("https://cdn.example/o.mp4".into()));

        let generating = json!({"code": 200, "data": {"successFlag": 0, "errorCode": null}});
        assert!(matches!(interpret_record(&generating, &flags), PollStatus::Pending(_)));

        let zero_error = json!({"code": 200, "data": {"successFlag": 0, "errorCode": 0}});
        assert!(matches!(interpret_record(&zero_error, &flags), PollStatus::Pending(_)));

        let failed = json!({"code": 200, "data": {"successFlag": 0, "errorCode": 400, "errorMessage": "prompt rejected"}});
        assert!(matches!(interpret_record(&failed, &flags), PollStatus::Failed(r) if r.contains("prompt rejected")));

        let flagged = json!({"code": 200, "data": {"successFlag": 3}});
        assert!(matches!(interpret_record(&flagged, &flags), PollStatus::Failed(_)));
        assert!(matches!(interpret_record(&flagged, &[]), PollStatus::Pending(_)));

        let envelope = json!({"code": 500, "msg": "busy"});
        assert_eq!(interpret_record(&envelope, &flags), PollStatus::Pending(Some("Status: busy".into())));
    }

    #[test]
    fn test_submission_classification() {
        let immediate = json!({"data": {"videoUrl": "https://cdn.example/now.mp4"}});
        match interpret_submission(&immediate).unwrap() {
            Submission::Immediate(asset) => {
                assert_eq!(asset.url.as_str(), "https://cdn.example/now.mp4");
                assert_eq!(asset.job_id, SceneUpdate::IMMEDIATE_JOB_ID);
            }
            other => panic!("unexpected {other:?}"),
        }

        let pending = json!({"code": 200, "data": {"taskId": "task-1"}});
        assert_eq!(interpret_submission(&pending).unwrap(), Submission::Pending("task-1".into()));

        let neither = json!({"code": 200, "msg": "success"});
        assert!(matches!(
            interpret_submission(&neither),
            Err(ProviderError::NoJobIdentifierFound { .. })
        ));

        let bad_url = json!({"url": "not a url"});
        assert!(matches!(
            interpret_submission(&bad_url),
            Err(ProviderError::InvalidAssetUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_generate_polls_until_done() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/veo/generate"))
            .and(header("authorization", "Bearer kie-key"))
            .and(body_partial_json(json!({
                "model": "veo3_fast",
                "aspectRatio": "9:16",
                "enableFallback": false,
                "enableTranslation": true,
                "generationType": "TEXT_2_VIDEO"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200, "data": {"taskId": "task-7"}})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/veo/record-info"))
            .and(query_param("taskId", "task-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"successFlag": 1, "response": {"resultUrls": ["https://cdn.example/7.mp4"]}}
            })))
            .mount(&server)
            .await;

        let ctx = JobContext::default();
        let mut rx = ctx.progress.subscribe();
        let asset = client(&server)
            .generate(&GenerationRequest::new("emus"), &ctx)
            .await
            .unwrap();

        assert_eq!(asset.url.as_str(), "https://cdn.example/7.mp4");
        assert_eq!(asset.job_id, "task-7");

        let mut saw_job = false;
        while let Ok(event) = rx.try_recv() {
            if let crate::progress::ProgressKind::JobSubmitted { job_id, .. } = event.kind {
                saw_job = job_id == "task-7";
            }
        }
        assert!(saw_job);
    }

    #[tokio::test]
    async fn test_unauthorized_submit_is_auth_expired() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/veo/generate"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .mount(&server)
            .await;

        let err = client(&server)
            .generate(&GenerationRequest::new("emus"), &JobContext::default())
            .await
            .unwrap_err();
        assert!(err.is_auth_expired());
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let server = MockServer::start().await;
        let config = KieConfig::default().with_base_url(server.uri());
        let client = KieVeoClient::new(config, Arc::new(LayeredCredentials::configured_only())).unwrap();

        let err = client
            .generate(&GenerationRequest::new("emus"), &JobContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn test_resume_does_not_resubmit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/veo/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskId": "new"})))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/veo/record-info"))
            .and(query_param("taskId", "task-old"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"successFlag": 1, "response": {"resultUrls": ["https://cdn.example/old.mp4"]}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let asset = client(&server)
            .resume("task-old", &JobContext::default())
            .await
            .unwrap();
        assert_eq!(asset.url.as_str(), "https://cdn.example/old.mp4");
        assert_eq!(asset.job_id, "task-old");
    }

    #[tokio::test]
    async fn test_transient_poll_errors_then_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/veo/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskId": "task-8"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/veo/record-info"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/veo/record-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"successFlag": 0, "errorCode": 501, "errorMessage": "Generation failed"}
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .generate(&GenerationRequest::new("emus"), &JobContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::GenerationFailed { .. }));
    }

    #[tokio::test]
    async fn test_finished_task_with_bad_url_fails_on_first_poll() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/veo/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskId": "task-9"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/veo/record-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"successFlag": 1, "response": {"resultUrls": ["not a url"]}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .generate(&GenerationRequest::new("emus"), &JobContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::GenerationFailed { .. }));
    }

    #[tokio::test]
    async fn test_fetch_status_single_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/veo/record-info"))
            .and(query_param("taskId", "task-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"successFlag": 0, "errorCode": null}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let status = client(&server).fetch_status("task-3").await.unwrap();
        assert!(matches!(status, PollStatus::Pending(_)));
    }

    #[tokio::test]
    async fn test_resume_of_failed_task_fails_without_waiting() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/veo/record-info"))
            .and(query_param("taskId", "task-dead"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"successFlag": 3, "errorMessage": "content policy"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .resume("task-dead", &JobContext::default())
            .await
            .unwrap_err();
        match err {
            ProviderError::GenerationFailed { reason, .. } => assert_eq!(reason, "content policy"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
