//! # Pipeline Coordinator
//!
//! Drives one topic through Outline → Content → Image → Build.
//!
//! Outline and Build failures end the run. Content and Image failures are
//! per slide: content keeps the outline's slide, image leaves the path
//! unset. Slides are handled one at a time, in order.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::a2a::{HttpProviderClient, ProviderClient};
use crate::config::CoordinatorConfig;
use crate::discovery::CapabilityResolver;
use crate::state::{
    ContentRequest, GenerationRequest, ImageReply, ImageRequest, PresentationPlan, SlideSpec,
};

use super::events::{ProgressEvent, ProgressSink};
use super::pipeline::{Pipeline, PipelineState};
use super::stage::{Stage, StageExecutor};

/// How a run ended
#[derive(Debug, Clone)]
pub struct RunReport {
    pub pipeline: Pipeline,
    /// Last plan the run held; `None` if the outline never arrived
    pub plan: Option<PresentationPlan>,
    /// Build provider's artifact reference
    pub artifact: Option<String>,
    pub error: Option<String>,
    /// Slides whose content or image step failed
    pub degraded_slides: Vec<u32>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.pipeline.is_success()
    }
}

/// The pipeline coordinator. Holds no per-run state; share it freely.
#[derive(Clone)]
pub struct Coordinator {
    executor: StageExecutor,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        resolver: CapabilityResolver,
        client: Arc<dyn ProviderClient>,
    ) -> Self {
        Self {
            executor: StageExecutor::new(resolver, client, Arc::new(config)),
        }
    }

    /// Coordinator wired to the HTTP directory and A2A providers
    pub fn from_config(config: CoordinatorConfig) -> Self {
        let resolver = config.build_resolver();
        Self::new(config, resolver, Arc::new(HttpProviderClient::new()))
    }

    /// Run the pipeline, streaming progress into `tx`
    pub async fn run_with_channel(
        &self,
        request: GenerationRequest,
        tx: mpsc::UnboundedSender<ProgressEvent>,
    ) -> RunReport {
        self.run(request, &ProgressSink::new(tx)).await
    }

    /// Run the pipeline for one request.
    ///
    /// Always emits exactly one final event, last.
    #[tracing::instrument(skip(self, request, sink), fields(topic = %request.topic, slides = request.num_slides))]
    pub async fn run(&self, request: GenerationRequest, sink: &ProgressSink) -> RunReport {
        let mut report = RunReport {
            pipeline: Pipeline::new(),
            plan: None,
            artifact: None,
            error: None,
            degraded_slides: Vec::new(),
        };

        sink.emit(ProgressEvent::new(format!(
            "Project started: generating a presentation on '{}'",
            request.topic
        )));

        // Step 1: outline
        sink.emit(step_event(Stage::Outline, "planning the outline"));
        let outlined = self
            .executor
            .run_stage(
                Stage::Outline,
                PresentationPlan::new(request.topic.clone(), Vec::new()),
                |_| serde_json::to_string(&request),
                |text| PresentationPlan::from_wire(text).map_err(|e| e.to_string()),
                |seed, outlined| {
                    if outlined.topic.trim().is_empty() {
                        PresentationPlan {
                            topic: seed.topic,
                            ..outlined
                        }
                    } else {
                        outlined
                    }
                },
            )
            .await;
        if !outlined.succeeded {
            return self.fail(report, Stage::Outline, outlined.raw_error, sink);
        }
        let mut plan = match outlined.payload {
            Some(plan) => plan,
            None => return self.fail(report, Stage::Outline, None, sink),
        };
        report.pipeline.advance();
        sink.emit(
            ProgressEvent::new(format!("Outline ready: {} slides", plan.slides.len()))
                .with_stage(Stage::Outline),
        );

        // Step 2: content
        sink.emit(step_event(Stage::Content, "writing slide content"));
        let total = plan.slides.len();
        let (written, updated) = self.write_content(&plan, sink, &mut report).await;
        plan.replace_slides(written);
        sink.emit(
            ProgressEvent::new(format!("Content written ({}/{} slides updated)", updated, total))
                .with_stage(Stage::Content),
        );
        report.pipeline.advance();

        // Step 3: images
        sink.emit(step_event(Stage::Image, "generating images"));
        let wanted = plan.image_candidates();
        let (illustrated, attached) = self.attach_images(&plan, sink, &mut report).await;
        plan.replace_slides(illustrated);
        sink.emit(
            ProgressEvent::new(format!("Images attached ({}/{} slides)", attached, wanted))
                .with_stage(Stage::Image),
        );
        report.pipeline.advance();
        report.plan = Some(plan.clone());

        // Step 4: build
        sink.emit(step_event(Stage::Build, "assembling the presentation"));
        let mut artifact = None;
        let built = self
            .executor
            .run_stage(
                Stage::Build,
                plan,
                |plan| plan.to_wire(),
                |text| Ok(text.to_string()),
                |plan, reference: String| {
                    artifact = Some(reference);
                    plan
                },
            )
            .await;
        let artifact = match (built.succeeded, artifact) {
            (true, Some(artifact)) => artifact,
            _ => return self.fail(report, Stage::Build, built.raw_error, sink),
        };

        report.pipeline.advance();
        debug_assert_eq!(report.pipeline.state, PipelineState::Built);
        sink.emit(
            ProgressEvent::new(format!("Presentation ready: {}", artifact))
                .with_stage(Stage::Build)
                .finished(),
        );
        report.pipeline.advance();
        report.artifact = Some(artifact);
        report
    }

    /// Content stage. Every slide comes back; failed ones unchanged.
    /// Also returns how many slides the provider rewrote.
    async fn write_content(
        &self,
        plan: &PresentationPlan,
        sink: &ProgressSink,
        report: &mut RunReport,
    ) -> (Vec<SlideSpec>, usize) {
        let provider = match self.executor.resolve(Stage::Content).await {
            Ok(provider) => provider,
            Err(e) => {
                tracing::warn!("Content stage skipped, keeping outline slides: {}", e);
                sink.emit(
                    ProgressEvent::new(format!("Content provider unavailable, keeping outline: {}", e))
                        .with_stage(Stage::Content),
                );
                report
                    .degraded_slides
                    .extend(plan.slides.iter().map(|s| s.page_number));
                return (plan.slides.clone(), 0);
            }
        };

        let total = plan.slides.len();
        let mut updated = 0;
        let mut slides = Vec::with_capacity(total);
        for (i, slide) in plan.slides.iter().enumerate() {
            sink.emit(
                ProgressEvent::new(format!("Writing slide {} of {}: {}", i + 1, total, slide.title))
                    .with_stage(Stage::Content)
                    .with_slide(i + 1, total),
            );

            let outcome = self
                .executor
                .run_with(
                    Stage::Content,
                    &provider,
                    slide.clone(),
                    |slide| {
                        serde_json::to_string(&ContentRequest {
                            slide,
                            topic: &plan.topic,
                        })
                    },
                    |text| serde_json::from_str::<SlideSpec>(text).map_err(|e| e.to_string()),
                    |prior, written| prior.merge_content(written),
                )
                .await;

            if !outcome.succeeded {
                tracing::warn!(
                    slide = slide.page_number,
                    "Keeping outline version of slide: {}",
                    outcome.raw_error.as_deref().unwrap_or("unknown error")
                );
                report.degraded_slides.push(slide.page_number);
            } else {
                updated += 1;
            }
            slides.push(outcome.payload.unwrap_or_else(|| slide.clone()));
        }
        (slides, updated)
    }

    /// Image stage. Only slides with a non-blank image prompt are sent.
    /// Also returns how many slides got an image.
    async fn attach_images(
        &self,
        plan: &PresentationPlan,
        sink: &ProgressSink,
        report: &mut RunReport,
    ) -> (Vec<SlideSpec>, usize) {
        let total = plan.image_candidates();
        if total == 0 {
            sink.emit(ProgressEvent::new("No slides need images").with_stage(Stage::Image));
            return (plan.slides.clone(), 0);
        }

        let provider = match self.executor.resolve(Stage::Image).await {
            Ok(provider) => provider,
            Err(e) => {
                tracing::warn!("Image stage skipped: {}", e);
                sink.emit(
                    ProgressEvent::new(format!("Image provider unavailable, skipping images: {}", e))
                        .with_stage(Stage::Image),
                );
                return (plan.slides.clone(), 0);
            }
        };

        let mut done = 0;
        let mut attached = 0;
        let mut slides = Vec::with_capacity(plan.slides.len());
        for slide in &plan.slides {
            let prompt = match slide.usable_image_prompt() {
                Some(prompt) => prompt,
                None => {
                    slides.push(slide.clone());
                    continue;
                }
            };
            done += 1;
            sink.emit(
                ProgressEvent::new(format!("Generating image {} of {}: {}", done, total, slide.title))
                    .with_stage(Stage::Image)
                    .with_slide(done, total),
            );

            let outcome = self
                .executor
                .run_with(
                    Stage::Image,
                    &provider,
                    slide.clone(),
                    |slide| {
                        serde_json::to_string(&ImageRequest {
                            prompt,
                            title: &slide.title,
                        })
                    },
                    parse_image_reply,
                    |mut slide, reply| {
                        slide.image_path = Some(reply.image_path);
                        slide
                    },
                )
                .await;

            if !outcome.succeeded {
                tracing::warn!(
                    slide = slide.page_number,
                    "No image for slide: {}",
                    outcome.raw_error.as_deref().unwrap_or("unknown error")
                );
                report.degraded_slides.push(slide.page_number);
            } else {
                attached += 1;
            }
            slides.push(outcome.payload.unwrap_or_else(|| slide.clone()));
        }
        (slides, attached)
    }

    fn fail(
        &self,
        mut report: RunReport,
        stage: Stage,
        error: Option<String>,
        sink: &ProgressSink,
    ) -> RunReport {
        let error = error.unwrap_or_else(|| format!("{} stage produced no result", stage));
        tracing::error!(stage = %stage, "Run failed: {}", error);
        report.pipeline.fail(stage);
        sink.emit(
            ProgressEvent::new(format!("Presentation generation failed at the {} stage: {}", stage, error))
                .with_stage(stage)
                .finished(),
        );
        report.error = Some(error);
        report
    }
}

fn step_event(stage: Stage, what: &str) -> ProgressEvent {
    ProgressEvent::new(format!(
        "Step {} of {}: {}",
        stage.step(),
        Stage::ALL.len(),
        what
    ))
    .with_stage(stage)
}

fn parse_image_reply(text: &str) -> Result<ImageReply, String> {
    let reply: ImageReply = serde_json::from_str(text).map_err(|e| e.to_string())?;
    if reply.image_path.trim().is_empty() {
        return Err("image_path is empty".to_string());
    }
    Ok(reply)
}
