//! Master assembly tests against in-process providers.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::*;
use reel_models::{AssetType, Script, SceneId, VideoEngine};
use reel_pipeline::{MasterAssembler, PipelineConfig, PipelineError, RenderStage, SceneRenderer};
use reel_providers::{JobContext, ProgressKind, ProgressReporter};
use tokio_util::sync::CancellationToken;

fn context() -> JobContext {
    JobContext::new(ProgressReporter::new(), CancellationToken::new())
}

#[tokio::test]
async fn test_assemble_stitches_scenes_in_order() {
    let kie = FakeGenerator::new(VideoEngine::KieVeo);
    let stitcher = FakeStitcher::new();
    let assembler = assembler(renderer(PipelineConfig::default(), &[kie.clone()]), stitcher.clone());

    let ctx = context();
    let mut rx = ctx.progress.subscribe();
    let outcome = assembler.assemble(&script(3), &ctx).await.unwrap();

    assert_eq!(outcome.master.url.as_str(), MASTER_URL);
    assert_eq!(outcome.master.scene_count, 3);
    assert_eq!(outcome.updates.len(), 3);
    assert!(outcome.warnings.is_empty());

    let calls = stitcher.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![vec![
            "https://cdn.example/kie_veo/p1.mp4".to_string(),
            "https://cdn.example/kie_veo/p2.mp4".to_string(),
            "https://cdn.example/kie_veo/p3.mp4".to_string(),
        ]]
    );

    let events = drain(&mut rx);
    let updated: Vec<SceneId> = events
        .iter()
        .filter_map(|e| match &e.kind {
            ProgressKind::SceneUpdated(update) => Some(update.scene_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(updated, vec![SceneId::new("1"), SceneId::new("2"), SceneId::new("3")]);

    let messages: Vec<&str> = events.iter().filter_map(|e| e.message()).collect();
    assert!(messages.contains(&"Processing Scene 2 of 3..."));
    assert!(messages.contains(&"✓ All 3 videos ready. Preparing to stitch..."));
    assert_eq!(messages.last(), Some(&"✓ Master video stitched successfully!"));
}

#[tokio::test]
async fn test_scene_failure_aborts_before_stitching() {
    let kie = FakeGenerator::new(VideoEngine::KieVeo);
    kie.answer("p2", Outcome::Fail("content policy".into()));
    let stitcher = FakeStitcher::new();
    let assembler = assembler(renderer(PipelineConfig::default(), &[kie.clone()]), stitcher.clone());

    let err = assembler.assemble(&script(3), &context()).await.unwrap_err();

    match &err {
        PipelineError::SceneFailed {
            scene_index,
            scene_id,
            stage,
            ..
        } => {
            assert_eq!(*scene_index, 2);
            assert_eq!(scene_id.as_str(), "2");
            assert_eq!(*stage, RenderStage::GeneratingVisual);
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("Scene 2 (2)"));
    assert!(message.contains("content policy"));

    assert_eq!(stitcher.call_count(), 0);
    assert_eq!(kie.generated.lock().unwrap().clone(), vec!["p1", "p2"]);
}

#[tokio::test]
async fn test_resolved_scenes_are_not_regenerated() {
    let kie = FakeGenerator::new(VideoEngine::KieVeo);
    let stitcher = FakeStitcher::new();
    let assembler = assembler(renderer(PipelineConfig::default(), &[kie.clone()]), stitcher.clone());

    let mut script = script(2);
    let first = assembler.assemble(&script, &context()).await.unwrap();
    script.apply_updates(&first.updates);
    assert_eq!(script.resolved_video_count(), 2);

    let second = assembler.assemble(&script, &context()).await.unwrap();

    assert_eq!(kie.generate_count(), 2);
    assert!(second.updates.is_empty());
    assert_eq!(stitcher.call_count(), 2);
    let calls = stitcher.calls.lock().unwrap();
    assert_eq!(calls[0], calls[1]);
}

#[tokio::test]
async fn test_pending_job_is_resumed_not_resubmitted() {
    let kie = FakeGenerator::new(VideoEngine::KieVeo);
    let assembler = assembler(renderer(PipelineConfig::default(), &[kie.clone()]), FakeStitcher::new());

    let mut script = script(1);
    script.scenes[0].provider_job_id = Some("task-42".into());

    let outcome = assembler.assemble(&script, &context()).await.unwrap();

    assert_eq!(kie.generate_count(), 0);
    assert_eq!(kie.resumed.lock().unwrap().clone(), vec!["task-42"]);
    assert_eq!(
        outcome.updates[0].asset_url.as_deref(),
        Some("https://cdn.example/resumed/task-42.mp4")
    );
}

#[tokio::test]
async fn test_cancelled_assembly_does_no_work() {
    let kie = FakeGenerator::new(VideoEngine::KieVeo);
    let stitcher = FakeStitcher::new();
    let assembler = assembler(renderer(PipelineConfig::default(), &[kie.clone()]), stitcher.clone());

    let ctx = context();
    ctx.cancel.cancel();
    let err = assembler.assemble(&script(2), &ctx).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(kie.generate_count(), 0);
    assert_eq!(stitcher.call_count(), 0);
}

#[tokio::test]
async fn test_local_video_cannot_be_stitched() {
    let kie = FakeGenerator::new(VideoEngine::KieVeo);
    kie.answer("p1", Outcome::LocalVideo);
    let stitcher = FakeStitcher::new();
    let assembler = assembler(renderer(PipelineConfig::default(), &[kie]), stitcher.clone());

    let err = assembler.assemble(&script(2), &context()).await.unwrap_err();

    assert!(matches!(err, PipelineError::SceneValidation { scene_index: 1, .. }));
    assert_eq!(stitcher.call_count(), 0);
}

#[tokio::test]
async fn test_local_master_url_is_rejected() {
    let kie = FakeGenerator::new(VideoEngine::KieVeo);
    let stitcher = FakeStitcher::returning("blob:reel/master");
    let assembler = assembler(renderer(PipelineConfig::default(), &[kie]), stitcher);

    let err = assembler.assemble(&script(1), &context()).await.unwrap_err();

    assert!(matches!(err, PipelineError::StitchingFailed { source: None, .. }));
}

#[tokio::test]
async fn test_invalid_script_fails_before_generation() {
    let kie = FakeGenerator::new(VideoEngine::KieVeo);
    let assembler = assembler(renderer(PipelineConfig::default(), &[kie.clone()]), FakeStitcher::new());

    let empty = Script {
        scenes: Vec::new(),
        ..script(1)
    };
    let err = tokio_test::assert_err!(assembler.assemble(&empty, &context()).await);

    assert!(err.is_script_format());
    assert_eq!(kie.generate_count(), 0);
}

#[tokio::test]
async fn test_missing_credential_without_fallback_names_scene() {
    let kie = FakeGenerator::new(VideoEngine::KieVeo);
    kie.answer("p1", Outcome::MissingKey);
    let veo = FakeGenerator::new(VideoEngine::GeminiVeo);
    let assembler = assembler(
        renderer(PipelineConfig::default(), &[kie, veo.clone()]),
        FakeStitcher::new(),
    );

    let err = assembler.assemble(&script(1), &context()).await.unwrap_err();

    assert_eq!(err.scene().map(|(i, id)| (i, id.as_str())), Some((1, "1")));
    assert!(!err.is_auth_expired());
    assert_eq!(veo.generate_count(), 0);
}

#[tokio::test]
async fn test_image_scene_is_rendered_as_video() {
    let kie = FakeGenerator::new(VideoEngine::KieVeo);
    let assembler = MasterAssembler::new(
        Arc::new(SceneRenderer::new(PipelineConfig::default()).with_generator(kie.clone())),
        FakeStitcher::new(),
    );

    let mut script = script(1);
    script.scenes[0].asset_type = AssetType::Image;
    script.scenes[0].asset_url = Some("https://cdn.example/storyboard/1.png".into());

    let outcome = assembler.assemble(&script, &context()).await.unwrap();

    assert_eq!(kie.generate_count(), 1);
    assert_eq!(kie.polls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.updates[0].asset_type, Some(AssetType::Video));
    script.apply_updates(&outcome.updates);
    assert_eq!(script.scenes[0].asset_type, AssetType::Video);
    assert_eq!(script.resolved_video_count(), 1);
}
