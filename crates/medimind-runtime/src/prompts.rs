//! Prompt templates for each call the orchestrator makes.

use medimind_core::{HealthCategory, Language, ModalitySet};

use crate::types::PartialResult;

fn respond_in(language: Language) -> String {
    format!(
        "Respond in {} (language code: {}).",
        language.display_name(),
        language.code()
    )
}

pub fn text_prompt(text: &str, language: Language) -> String {
    format!(
        "You are a helpful health assistant. Provide informative and helpful responses \
to health-related questions, and say when a healthcare professional should be consulted.

User Query ({code}): {text}

Please provide:
1. A helpful response to the query
2. Relevant health information
3. When to seek professional medical help
4. General wellness tips if applicable

This is for educational purposes only and not a substitute for medical advice.
{respond}",
        code = language.code(),
        text = text,
        respond = respond_in(language),
    )
}

pub fn image_prompt(description: Option<&str>, language: Language) -> String {
    format!(
        "You are a health assistant analyzing an image. Describe what you observe, \
especially anything health-related (symptoms, medications, medical devices).

User Description: {description}

Please provide:
1. What you observe in the image
2. Potential health implications (if any)
3. General advice (if applicable)
4. When to seek professional medical help

This analysis is for educational purposes only. Always consult healthcare \
professionals for proper diagnosis and treatment.
{respond}",
        description = description.unwrap_or("(none)"),
        respond = respond_in(language),
    )
}

pub fn audio_prompt(language: Language) -> String {
    format!(
        "You are a health assistant analyzing audio content. Respond to the health-related \
questions or concerns mentioned in the recording.

Expected Language: {name}

Please provide:
1. A summary of the health concern described
2. Helpful information and advice
3. When to seek professional medical help
4. General wellness recommendations if applicable

This analysis is for educational purposes only. Always consult healthcare \
professionals for proper diagnosis and treatment.
{respond}",
        name = language.display_name(),
        respond = respond_in(language),
    )
}

/// Merge per-modality results, in order, into one context block. Failed
/// sub-calls appear as a visible failure note.
pub fn combined_context(partials: &[PartialResult]) -> String {
    partials
        .iter()
        .map(|p| match (&p.response, &p.error) {
            (Some(text), _) => format!("{}: {}", p.modality.label(), text.trim()),
            (None, error) => format!(
                "{}: [analysis failed ({}): {}]",
                p.modality.label(),
                p.error_kind.map(|k| k.as_str()).unwrap_or("unknown"),
                error.as_deref().unwrap_or("no detail")
            ),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn synthesis_prompt(modalities: &ModalitySet, language: Language, context: &str) -> String {
    format!(
        "You are a comprehensive health assistant. Below are analyses from different types \
of inputs (text, image, audio). Provide a unified, helpful response that integrates all \
of the information. Some analyses may have failed; work with what is available and \
mention what could not be analyzed.

Inputs Processed: {inputs}
Language: {name}

Individual Analyses:
{context}

Please provide:
1. A comprehensive summary of all inputs
2. Integrated health insights and recommendations
3. Priority actions to take
4. When to seek professional medical help
5. General wellness advice

This is for educational purposes only. Always consult healthcare professionals for \
proper diagnosis and treatment.
{respond}",
        inputs = modalities.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", "),
        name = language.display_name(),
        context = context,
        respond = respond_in(language),
    )
}

pub fn tips_prompt(category: Option<HealthCategory>, language: Language) -> String {
    match category {
        Some(c) => format!(
            "Provide 5 helpful health tips about {} in {}.",
            c.name(),
            language.display_name()
        ),
        None => format!(
            "Provide 5 general wellness tips in {}.",
            language.display_name()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medimind_core::{BackendError, Modality};

    #[test]
    fn test_context_keeps_order_and_notes_failures() {
        let partials = vec![
            PartialResult::from_result(Modality::Text, Ok("Hydrate.".into())),
            PartialResult::from_result(
                Modality::Image,
                Err(BackendError::QuotaOrTransportFailure("503".into())),
            ),
            PartialResult::from_result(Modality::Audio, Ok(" Rest. ".into())),
        ];
        let ctx = combined_context(&partials);
        let text_at = ctx.find("Text Analysis: Hydrate.").unwrap();
        let image_at = ctx
            .find("Image Analysis: [analysis failed (quota_or_transport_failure)")
            .unwrap();
        let audio_at = ctx.find("Audio Analysis: Rest.").unwrap();
        assert!(text_at < image_at && image_at < audio_at);
    }

    #[test]
    fn test_prompts_name_language() {
        assert!(text_prompt("cough", Language::Es).contains("Respond in Spanish"));
        assert!(image_prompt(Some("red rash"), Language::En).contains("User Description: red rash"));
        assert!(audio_prompt(Language::Hi).contains("Expected Language: Hindi"));
        assert_eq!(
            tips_prompt(Some(HealthCategory::Nutrition), Language::En),
            "Provide 5 helpful health tips about Nutrition in English."
        );
    }
}
