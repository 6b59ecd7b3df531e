//! Cover-letter generation from a stored resume and job description.

pub mod handlers;
pub mod prompts;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::document::{JobRow, ResumeRow};
use prompts::{COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_SYSTEM};

/// Resume text sent to the model is capped; the letter only needs highlights.
const MAX_PROMPT_RESUME_CHARS: usize = 12_000;
const MAX_PROMPT_JOB_CHARS: usize = 8_000;

/// Everything a writer needs about the applicant and the role.
pub struct CoverLetterInput<'a> {
    pub candidate_name: &'a str,
    pub resume: &'a ResumeRow,
    pub job: &'a JobRow,
}

#[async_trait]
pub trait CoverLetterWriter: Send + Sync {
    async fn write(&self, input: CoverLetterInput<'_>) -> Result<String, AppError>;
}

/// Default writer backed by the shared `LlmClient`.
pub struct LlmCoverLetterWriter {
    llm: LlmClient,
}

impl LlmCoverLetterWriter {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl CoverLetterWriter for LlmCoverLetterWriter {
    async fn write(&self, input: CoverLetterInput<'_>) -> Result<String, AppError> {
        let prompt = build_prompt(&input);
        self.llm
            .complete(COVER_LETTER_SYSTEM, &prompt)
            .await
            .map_err(|e| match e {
                LlmError::Empty => AppError::Llm("Cover letter generation returned no text".to_string()),
                other => AppError::Llm(format!("Cover letter generation failed: {other}")),
            })
    }
}

pub fn build_prompt(input: &CoverLetterInput<'_>) -> String {
    let or_unspecified = |value: &str| {
        if value.trim().is_empty() {
            "Not specified".to_string()
        } else {
            value.trim().to_string()
        }
    };

    COVER_LETTER_PROMPT_TEMPLATE
        .replace("{title}", &or_unspecified(&input.job.title))
        .replace("{company}", &or_unspecified(&input.job.company))
        .replace(
            "{location}",
            &or_unspecified(input.job.location.as_deref().unwrap_or_default()),
        )
        .replace(
            "{job_description}",
            &truncate_chars(&input.job.raw_content, MAX_PROMPT_JOB_CHARS),
        )
        .replace(
            "{resume_content}",
            &truncate_chars(&input.resume.extracted_text, MAX_PROMPT_RESUME_CHARS),
        )
        .replace("{candidate_name}", input.candidate_name)
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
