//! Query orchestrator: validates a request, dispatches it by modality, and
//! records the outcome in the session ledger.

use std::path::Path;
use std::sync::Arc;

use medimind_core::{BackendError, Error, HealthCategory, Language, Modality, Result};
use medimind_gateway::{Attachment, BackendGateway};
use medimind_ledger::{Interaction, SessionLedger};
use tracing::{debug, info, warn};

use crate::prompts;
use crate::types::{
    Answer, AttachmentRef, Dispatch, ModalInput, OrchestrationResult, PartialResult,
    QueryRequest, SynthesisPolicy, HEALTH_DISCLAIMER,
};

/// Turns one `QueryRequest` into gateway calls and one ledger entry.
///
/// Stateless between requests; safe to share across concurrent handlers.
pub struct QueryOrchestrator {
    gateway: Arc<BackendGateway>,
    ledger: Arc<SessionLedger>,
    policy: SynthesisPolicy,
}

impl QueryOrchestrator {
    pub fn new(gateway: Arc<BackendGateway>, ledger: Arc<SessionLedger>) -> Self {
        Self {
            gateway,
            ledger,
            policy: SynthesisPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SynthesisPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn gateway(&self) -> &Arc<BackendGateway> {
        &self.gateway
    }

    pub fn ledger(&self) -> &Arc<SessionLedger> {
        &self.ledger
    }

    pub fn policy(&self) -> SynthesisPolicy {
        self.policy
    }

    /// Handle one query end to end.
    ///
    /// Exactly one interaction is appended to the ledger, success or
    /// failure, including for requests rejected during validation.
    pub async fn handle(&self, request: QueryRequest) -> OrchestrationResult {
        let modalities = request.modalities();
        let inputs = request.raw_inputs();
        let mut calls = 0u32;

        match self.run(&request, &mut calls).await {
            Ok(mut answer) => {
                let interaction = Interaction::success(
                    modalities,
                    request.language.as_str(),
                    inputs,
                    answer.response.as_str(),
                    calls,
                );
                answer.interaction_id = interaction.id.clone();
                answer.gateway_calls = calls;
                self.ledger.append(interaction);
                info!(
                    "Query answered: {} in {} ({} gateway calls)",
                    answer.modalities.label(),
                    answer.language,
                    calls
                );
                Ok(answer)
            }
            Err(e) => {
                warn!(
                    "Query failed ({}): {} [{} gateway calls]",
                    e.kind(),
                    e,
                    calls
                );
                self.ledger.append(Interaction::failure(
                    modalities,
                    request.language.as_str(),
                    inputs,
                    &e,
                    calls,
                ));
                Err(e)
            }
        }
    }

    /// Five tips for `category` (or general wellness). One gateway call,
    /// not recorded in the ledger.
    pub async fn health_tips(&self, category: Option<&str>, language: &str) -> Result<String> {
        let category = category
            .filter(|c| !c.trim().is_empty())
            .map(str::parse::<HealthCategory>)
            .transpose()?;
        let language: Language = language.parse()?;

        let prompt = prompts::tips_prompt(category, language);
        let tips = self.gateway.invoke(&prompt, None).await?;
        debug!(
            "Health tips generated: {} in {}",
            category.map(|c| c.name()).unwrap_or("General"),
            language
        );
        Ok(with_disclaimer(&tips))
    }

    async fn run(&self, request: &QueryRequest, calls: &mut u32) -> Result<Answer> {
        let (language, dispatch) = plan(request)?;
        let modalities = request.modalities();
        let description = request.raw_inputs().description;

        let (text, partials) = match dispatch {
            Dispatch::Single(input) => {
                debug!("Single {} dispatch", input.modality());
                let text = self
                    .analyze(&input, description.as_deref(), language, calls)
                    .await?;
                (text, Vec::new())
            }
            Dispatch::Combined(inputs) => {
                debug!("Combined dispatch over {}", modalities.label());
                let mut partials = Vec::with_capacity(inputs.len());
                for input in &inputs {
                    let result = self
                        .analyze(input, description.as_deref(), language, calls)
                        .await;
                    if let Err(e) = &result {
                        warn!("{} analysis failed: {}", input.modality(), e);
                    }
                    partials.push(PartialResult::from_result(input.modality(), result));
                }

                if self.policy == SynthesisPolicy::RequireOnePartial
                    && !partials.iter().any(PartialResult::is_success)
                {
                    return Err(Error::SynthesisFailure(
                        "every per-modality analysis failed".into(),
                    ));
                }

                let context = prompts::combined_context(&partials);
                let prompt = prompts::synthesis_prompt(&modalities, language, &context);
                let text = self
                    .invoke(&prompt, None, calls)
                    .await
                    .map_err(|e| Error::SynthesisFailure(e.to_string()))?;
                (text, partials)
            }
        };

        Ok(Answer {
            interaction_id: String::new(),
            response: with_disclaimer(&text),
            modalities,
            language,
            partials,
            gateway_calls: *calls,
        })
    }

    /// One modality-specific call. Attachments are read just before the
    /// call; a read failure skips the call.
    async fn analyze(
        &self,
        input: &ModalInput,
        description: Option<&str>,
        language: Language,
        calls: &mut u32,
    ) -> std::result::Result<String, BackendError> {
        match input {
            ModalInput::Text(text) => {
                let prompt = prompts::text_prompt(text, language);
                self.invoke(&prompt, None, calls).await
            }
            ModalInput::Image(file) => {
                let attachment = Attachment::load(&file.path, file.mime_type).await?;
                let prompt = prompts::image_prompt(description, language);
                self.invoke(&prompt, Some(&attachment), calls).await
            }
            ModalInput::Audio(file) => {
                let attachment = Attachment::load(&file.path, file.mime_type).await?;
                let prompt = prompts::audio_prompt(language);
                self.invoke(&prompt, Some(&attachment), calls).await
            }
        }
    }

    async fn invoke(
        &self,
        prompt: &str,
        attachment: Option<&Attachment>,
        calls: &mut u32,
    ) -> std::result::Result<String, BackendError> {
        *calls += 1;
        self.gateway.invoke(prompt, attachment).await
    }
}

/// Validate `request` and choose how to dispatch it.
///
/// Checks run in a fixed order: presence of any input, then language, then
/// the image attachment, then the audio attachment.
pub fn plan(request: &QueryRequest) -> Result<(Language, Dispatch)> {
    if request.modalities().is_empty() {
        return Err(Error::EmptyRequest);
    }
    let language: Language = request.language.parse()?;

    let text = request
        .text_input()
        .map(|t| ModalInput::Text(t.to_string()));
    let image = request
        .image_input()
        .map(|p| attachment_ref(Modality::Image, p))
        .transpose()?
        .map(ModalInput::Image);
    let audio = request
        .audio_input()
        .map(|p| attachment_ref(Modality::Audio, p))
        .transpose()?
        .map(ModalInput::Audio);

    let dispatch = match (text, image, audio) {
        (None, None, None) => return Err(Error::EmptyRequest),
        (Some(one), None, None) | (None, Some(one), None) | (None, None, Some(one)) => {
            Dispatch::Single(one)
        }
        (text, image, audio) => {
            Dispatch::Combined([text, image, audio].into_iter().flatten().collect())
        }
    };
    Ok((language, dispatch))
}

fn attachment_ref(modality: Modality, path: &Path) -> Result<AttachmentRef> {
    let mime_type = modality.validate_attachment(path)?;
    Ok(AttachmentRef {
        path: path.to_path_buf(),
        mime_type,
    })
}

fn with_disclaimer(text: &str) -> String {
    format!("{}\n\n{}", text.trim_end(), HEALTH_DISCLAIMER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medimind_core::ErrorKind;
    use medimind_gateway::{Backend, RateLimitConfig, RateLimiter};
    use medimind_ledger::Outcome;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use std::time::Duration;

    type Reply = Box<
        dyn Fn(&str, Option<&Attachment>) -> std::result::Result<String, BackendError>
            + Send
            + Sync,
    >;

    fn script(
        f: impl Fn(&str, Option<&Attachment>) -> std::result::Result<String, BackendError>
            + Send
            + Sync
            + 'static,
    ) -> Reply {
        Box::new(f)
    }

    /// Records (prompt, mime type) per call and answers via a closure.
    struct ScriptedBackend {
        calls: Mutex<Vec<(String, Option<String>)>>,
        reply: Reply,
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        async fn generate(
            &self,
            prompt: &str,
            attachment: Option<&Attachment>,
        ) -> std::result::Result<String, BackendError> {
            self.calls
                .lock()
                .push((prompt.to_string(), attachment.map(|a| a.mime_type.clone())));
            (self.reply)(prompt, attachment)
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn is_synthesis(prompt: &str) -> bool {
        prompt.contains("Individual Analyses:")
    }

    fn setup(reply: Reply) -> (QueryOrchestrator, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend {
            calls: Mutex::new(Vec::new()),
            reply,
        });
        let limiter = RateLimiter::new(RateLimitConfig {
            window: Duration::from_secs(1),
            max_calls: 1000,
        })
        .unwrap();
        let gateway = Arc::new(BackendGateway::new(
            backend.clone(),
            limiter,
            Duration::from_secs(5),
        ));
        let ledger = Arc::new(SessionLedger::new());
        (QueryOrchestrator::new(gateway, ledger), backend)
    }

    fn echo() -> Reply {
        script(|prompt, attachment| {
            Ok(match (is_synthesis(prompt), attachment) {
                (true, _) => "Combined advice.".to_string(),
                (false, Some(a)) => format!("Saw {}.", a.mime_type),
                (false, None) => "Drink water.".to_string(),
            })
        })
    }

    struct Fixtures {
        _dir: tempfile::TempDir,
        image: PathBuf,
        audio: PathBuf,
    }

    fn fixtures() -> Fixtures {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("rash.PNG");
        let audio = dir.path().join("cough.wav");
        std::fs::write(&image, b"\x89PNG fake").unwrap();
        std::fs::write(&audio, b"RIFF fake").unwrap();
        Fixtures {
            _dir: dir,
            image,
            audio,
        }
    }

    #[tokio::test]
    async fn test_empty_request_records_failure_without_calls() {
        let (orch, backend) = setup(echo());
        let err = orch
            .handle(QueryRequest {
                text: Some("  ".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EmptyRequest);
        assert!(backend.calls.lock().is_empty());
        let recorded = orch.ledger().interactions();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].outcome, Outcome::Failure);
        assert_eq!(recorded[0].gateway_calls, 0);
    }

    #[tokio::test]
    async fn test_validation_order() {
        let (orch, backend) = setup(echo());

        let err = orch
            .handle(QueryRequest::text("fever").in_language("xx"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedLanguage);

        // Language is checked before attachments.
        let err = orch
            .handle(QueryRequest::text("fever").with_image("missing.jpg").in_language("fr"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedLanguage);

        let err = orch
            .handle(QueryRequest::text("fever").with_image("missing.jpg"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAttachment);

        let summary = orch.ledger().summarize();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.by_language.get("xx"), Some(&1));
        assert!(backend.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_extension_is_invalid_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "hello").unwrap();

        let (orch, _) = setup(echo());
        let err = orch
            .handle(QueryRequest::default().with_audio(&notes))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAttachment);
    }

    #[tokio::test]
    async fn test_text_only_is_one_call() {
        let (orch, backend) = setup(echo());
        let answer = orch
            .handle(QueryRequest::text("I have a headache").in_language("es"))
            .await
            .unwrap();

        assert_eq!(answer.gateway_calls, 1);
        assert!(answer.partials.is_empty());
        assert!(answer.response.starts_with("Drink water."));
        assert!(answer.response.ends_with(HEALTH_DISCLAIMER));

        let calls = backend.calls.lock();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("I have a headache"));
        assert!(calls[0].0.contains("Spanish"));

        let recorded = orch.ledger().interactions();
        assert_eq!(recorded[0].id, answer.interaction_id);
        assert_eq!(recorded[0].response.as_deref(), Some(answer.response.as_str()));
    }

    #[tokio::test]
    async fn test_single_image_sends_attachment() {
        let fx = fixtures();
        let (orch, backend) = setup(echo());
        let answer = orch
            .handle(
                QueryRequest::default()
                    .with_image(&fx.image)
                    .with_description("red spots on arm"),
            )
            .await
            .unwrap();

        assert!(answer.response.starts_with("Saw image/png."));
        let calls = backend.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.as_deref(), Some("image/png"));
        assert!(calls[0].0.contains("red spots on arm"));
    }

    #[tokio::test]
    async fn test_all_modalities_call_order() {
        let fx = fixtures();
        let (orch, backend) = setup(echo());
        let answer = orch
            .handle(
                QueryRequest::text("Is this serious?")
                    .with_image(&fx.image)
                    .with_audio(&fx.audio),
            )
            .await
            .unwrap();

        assert_eq!(answer.gateway_calls, 4);
        assert_eq!(answer.modalities.label(), "text+image+audio");
        assert!(answer.response.starts_with("Combined advice."));
        let order: Vec<_> = answer.partials.iter().map(|p| p.modality).collect();
        assert_eq!(order, vec![Modality::Text, Modality::Image, Modality::Audio]);

        let calls = backend.calls.lock();
        let mimes: Vec<_> = calls.iter().map(|(_, m)| m.as_deref()).collect();
        assert_eq!(mimes, vec![None, Some("image/png"), Some("audio/wav"), None]);
        assert!(is_synthesis(&calls[3].0));
        assert!(calls[3].0.contains("Text Analysis: Drink water."));
        assert!(calls[3].0.contains("Audio Analysis: Saw audio/wav."));
        assert_eq!(orch.ledger().interactions()[0].gateway_calls, 4);
    }

    #[tokio::test]
    async fn test_image_failure_between_text_and_audio() {
        for synthesis_ok in [true, false] {
            let fx = fixtures();
            let (orch, backend) = setup(script(move |prompt, attachment| {
                match attachment.map(|a| a.mime_type.as_str()) {
                    Some("image/png") => {
                        Err(BackendError::UnsupportedInput("unreadable image".into()))
                    }
                    Some(_) => Ok("Dry cough.".into()),
                    None if is_synthesis(prompt) && synthesis_ok => Ok("Merged advice.".into()),
                    None if is_synthesis(prompt) => {
                        Err(BackendError::QuotaOrTransportFailure("503".into()))
                    }
                    None => Ok("Likely a cold.".into()),
                }
            }));

            let result = orch
                .handle(
                    QueryRequest::text("cough and rash")
                        .with_image(&fx.image)
                        .with_audio(&fx.audio),
                )
                .await;

            let calls = backend.calls.lock();
            assert_eq!(calls.len(), 4);
            let synthesis = &calls[3].0;
            assert!(is_synthesis(synthesis));
            assert!(synthesis.contains("Text Analysis: Likely a cold."));
            assert!(synthesis.contains("Image Analysis: [analysis failed (unsupported_input)"));
            assert!(synthesis.contains("Audio Analysis: Dry cough."));

            let recorded = orch.ledger().interactions();
            assert_eq!(recorded.len(), 1);
            assert_eq!(recorded[0].gateway_calls, 4);
            match result {
                Ok(answer) => {
                    assert!(synthesis_ok);
                    assert!(answer.response.starts_with("Merged advice."));
                    assert_eq!(
                        answer.partials[1].error_kind,
                        Some(ErrorKind::UnsupportedInput)
                    );
                    assert_eq!(recorded[0].outcome, Outcome::Success);
                    assert_eq!(recorded[0].id, answer.interaction_id);
                }
                Err(err) => {
                    assert!(!synthesis_ok);
                    assert_eq!(err.kind(), ErrorKind::SynthesisFailure);
                    assert_eq!(recorded[0].outcome, Outcome::Failure);
                    assert_eq!(recorded[0].error_kind, Some(ErrorKind::SynthesisFailure));
                }
            }
        }
    }

    #[tokio::test]
    async fn test_failed_sub_call_still_synthesizes() {
        let fx = fixtures();
        let (orch, backend) = setup(script(|prompt, attachment| match attachment {
            Some(_) => Err(BackendError::UnsupportedInput("unreadable image".into())),
            None if is_synthesis(prompt) => Ok("Merged.".into()),
            None => Ok("Text ok.".into()),
        }));

        let answer = orch
            .handle(QueryRequest::text("rash").with_image(&fx.image))
            .await
            .unwrap();

        assert_eq!(answer.gateway_calls, 3);
        assert!(answer.partials[0].is_success());
        assert_eq!(
            answer.partials[1].error_kind,
            Some(ErrorKind::UnsupportedInput)
        );
        let calls = backend.calls.lock();
        assert!(calls[2]
            .0
            .contains("Image Analysis: [analysis failed (unsupported_input)"));
    }

    #[tokio::test]
    async fn test_unreadable_attachment_skips_call() {
        let fx = fixtures();
        let (orch, backend) = setup(echo());
        std::fs::write(&fx.audio, b"").unwrap();

        let answer = orch
            .handle(QueryRequest::text("cough").with_audio(&fx.audio))
            .await
            .unwrap();

        // Text sub-call plus synthesis. The empty audio never reaches the backend.
        assert_eq!(answer.gateway_calls, 2);
        assert_eq!(backend.calls.lock().len(), 2);
        assert!(!answer.partials[1].is_success());
    }

    #[tokio::test]
    async fn test_synthesis_failure() {
        let fx = fixtures();
        let (orch, _) = setup(script(|prompt, _| {
            if is_synthesis(prompt) {
                Err(BackendError::QuotaOrTransportFailure("503".into()))
            } else {
                Ok("partial".into())
            }
        }));

        let err = orch
            .handle(QueryRequest::text("dizzy").with_audio(&fx.audio))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SynthesisFailure);

        let recorded = orch.ledger().interactions();
        assert_eq!(recorded[0].error_kind, Some(ErrorKind::SynthesisFailure));
        assert_eq!(recorded[0].gateway_calls, 3);
    }

    #[tokio::test]
    async fn test_single_call_failure_passes_classification() {
        let fx = fixtures();
        let (orch, _) = setup(script(|_, _| {
            Err(BackendError::AuthenticationFailure("expired token".into()))
        }));
        let err = orch
            .handle(QueryRequest::default().with_image(&fx.image))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
        assert_eq!(orch.ledger().summarize().success_count, 0);
    }

    #[tokio::test]
    async fn test_require_one_partial_policy() {
        let fx = fixtures();
        let (orch, backend) = setup(script(|_, _| {
            Err(BackendError::QuotaOrTransportFailure("429".into()))
        }));
        assert_eq!(orch.policy(), SynthesisPolicy::Always);
        let orch = orch.with_policy(SynthesisPolicy::RequireOnePartial);
        assert_eq!(orch.policy(), SynthesisPolicy::RequireOnePartial);

        let err = orch
            .handle(QueryRequest::text("pain").with_image(&fx.image))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SynthesisFailure);
        // No synthesis call was made.
        assert_eq!(backend.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_health_tips() {
        let (orch, backend) = setup(script(|_, _| Ok("1. Sleep well.".into())));

        let err = orch
            .health_tips(Some("Astrology"), "en")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCategory);

        let tips = orch.health_tips(Some("nutrition"), "hi").await.unwrap();
        assert!(tips.starts_with("1. Sleep well."));
        assert!(tips.ends_with(HEALTH_DISCLAIMER));

        let calls = backend.calls.lock();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("Nutrition"));
        assert!(calls[0].0.contains("Hindi"));
        assert!(orch.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_handles_each_record_once() {
        let (orch, _) = setup(echo());
        let orch = Arc::new(orch);

        let tasks: Vec<_> = (0..6)
            .map(|i| {
                let orch = orch.clone();
                tokio::spawn(async move { orch.handle(QueryRequest::text(format!("q{}", i))).await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        assert_eq!(orch.ledger().len(), 6);
        assert_eq!(orch.gateway().calls(), 6);
    }

    #[test]
    fn test_plan_dispatch_table() {
        let fx = fixtures();
        let (_, dispatch) = plan(&QueryRequest::default().with_audio(&fx.audio)).unwrap();
        assert!(matches!(dispatch, Dispatch::Single(ModalInput::Audio(_))));

        let request = QueryRequest::default()
            .with_image(&fx.image)
            .with_audio(&fx.audio);
        let (_, dispatch) = plan(&request).unwrap();
        match dispatch {
            Dispatch::Combined(inputs) => {
                let kinds: Vec<_> = inputs.iter().map(ModalInput::modality).collect();
                assert_eq!(kinds, vec![Modality::Image, Modality::Audio]);
            }
            other => panic!("expected combined dispatch, got {:?}", other),
        }
    }
}
