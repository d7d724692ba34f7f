//! HTTP client for the hosted extraction service, plus the mock used
//! across the pipeline tests.

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::parser::{parse_extraction_response, recover_extraction_lenient};
use super::prompt::build_extraction_prompt;
use super::{ExtractionError, InvoiceExtractor};
use crate::models::enums::PromptVariant;
use crate::models::extraction::{Document, ExtractionResult};

/// Thin client for a Gemini-style document-understanding endpoint.
///
/// Posts the document bytes inline (base64) with the variant's prompt and
/// expects a JSON body back. Transport only — retry policy lives in the
/// extraction stage, not here.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    /// Enable the lenient markdown-recovery path when the strict parse
    /// fails. The strict parse is always the primary contract.
    lenient_recovery: bool,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
            lenient_recovery: true,
        }
    }

    pub fn with_lenient_recovery(mut self, enabled: bool) -> Self {
        self.lenient_recovery = enabled;
        self
    }

    fn request_body(&self, document: &Document, variant: PromptVariant) -> GenerateRequest {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&document.content);
        GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: build_extraction_prompt(variant),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "application/pdf".into(),
                            data: encoded,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".into(),
            },
        }
    }

    fn classify_http_failure(status: u16, body: &str) -> ExtractionError {
        let lower = body.to_lowercase();
        if status == 429 || lower.contains("quota") {
            return ExtractionError::RateLimited(format!("status {status}: {body}"));
        }
        // "no pages" means a broken or empty document — retrying cannot help.
        if lower.contains("no pages") {
            return ExtractionError::UnreadableDocument(body.to_string());
        }
        if status == 400 && lower.contains("document") {
            return ExtractionError::RejectedFormat(body.to_string());
        }
        ExtractionError::Http(format!("status {status}: {body}"))
    }
}

impl InvoiceExtractor for GeminiClient {
    fn extract(
        &self,
        document: &Document,
        variant: PromptVariant,
    ) -> Result<ExtractionResult, ExtractionError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(document, variant))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Http(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    ExtractionError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Self::classify_http_failure(status.as_u16(), &body));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                ExtractionError::MalformedResponse("Response contained no candidates".into())
            })?;

        match parse_extraction_response(&text) {
            Ok(result) => Ok(result),
            Err(strict_err) if self.lenient_recovery => {
                tracing::warn!(
                    error = %strict_err,
                    "Strict extraction parse failed, attempting lenient recovery"
                );
                recover_extraction_lenient(&text).ok_or(strict_err)
            }
            Err(strict_err) => Err(strict_err),
        }
    }
}

// -- Wire types for the generateContent endpoint ----------------------------

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

// -- Mock -------------------------------------------------------------------

/// Mock extractor for testing — returns a configured result or error kind.
pub struct MockExtractor {
    result: ExtractionResult,
}

impl MockExtractor {
    pub fn new(result: ExtractionResult) -> Self {
        Self { result }
    }
}

impl InvoiceExtractor for MockExtractor {
    fn extract(
        &self,
        _document: &Document,
        _variant: PromptVariant,
    ) -> Result<ExtractionResult, ExtractionError> {
        Ok(self.result.clone())
    }
}
