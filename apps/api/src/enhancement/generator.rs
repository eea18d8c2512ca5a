//! CV generation — the seam between the orchestrator and the text-generation service.
//!
//! `CvGenerator` is the only thing the orchestrator knows about generation.
//! Default: `LlmCvGenerator` (Claude via `llm_client`). Tests plug in fakes.
//!
//! `AppState` holds an `Arc<dyn CvGenerator>`, chosen at startup.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::enhancement::language::Language;
use crate::enhancement::prompts::{ENHANCE_PROMPT_TEMPLATE, ENHANCE_SYSTEM};
use crate::llm_client::prompts::{FACTUALITY_INSTRUCTION, PLAIN_DOCUMENT_INSTRUCTION};
use crate::llm_client::{LlmClient, LlmError};

/// Any failure from a generator backend. The orchestrator logs it and shows
/// the user a fixed message, so the variants exist for diagnostics only.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),
}

/// Turns a CV plus role context into rewritten CV text.
///
/// Implementations receive all four fields unmodified and return the text to
/// show the user; callers treat that text as opaque.
#[async_trait]
pub trait CvGenerator: Send + Sync {
    async fn generate(
        &self,
        original_cv: &str,
        job_title: &str,
        position: &str,
        language: Language,
    ) -> Result<String, GenerationError>;
}

/// Claude-backed generator.
pub struct LlmCvGenerator {
    llm: LlmClient,
}

impl LlmCvGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl CvGenerator for LlmCvGenerator {
    async fn generate(
        &self,
        original_cv: &str,
        job_title: &str,
        position: &str,
        language: Language,
    ) -> Result<String, GenerationError> {
        let prompt = build_enhancement_prompt(original_cv, job_title, position, language);
        debug!("Enhancement prompt built ({} chars)", prompt.len());

        let text = self.llm.complete(&prompt, ENHANCE_SYSTEM).await?;

        info!(
            "Enhanced CV generated: {} chars in, {} chars out ({})",
            original_cv.len(),
            text.len(),
            language
        );
        Ok(text)
    }
}

/// Fills the enhancement template in a single pass, so placeholder-looking
/// text inside user fields is copied through literally.
fn build_enhancement_prompt(
    original_cv: &str,
    job_title: &str,
    position: &str,
    language: Language,
) -> String {
    fill_template(
        ENHANCE_PROMPT_TEMPLATE,
        &[
            ("factuality_instruction", FACTUALITY_INSTRUCTION),
            ("plain_document_instruction", PLAIN_DOCUMENT_INSTRUCTION),
            ("language_name", language.display_name()),
            ("language_tag", language.tag()),
            ("job_title", job_title),
            ("position", position),
            ("original_cv", original_cv),
        ],
    )
}

/// Substitutes `{key}` occurrences in `template`. Unknown `{...}` sequences are kept.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];

        let hit = values
            .iter()
            .find(|(key, _)| tail.starts_with(key) && tail[key.len()..].starts_with('}'));

        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}
