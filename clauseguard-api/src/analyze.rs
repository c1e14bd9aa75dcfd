//! Analysis invoker
//!
//! Builds the fixed instruction contract, submits the extracted document
//! text to the generative backend, and validates the response before
//! anything downstream may trust it. The backend is untrusted and
//! non-deterministic: its output is parsed and checked field by field,
//! and a contract violation is terminal for the request. Transient
//! transport failures are retried a bounded number of times with
//! backoff; format violations are never retried.

use crate::extract::ExtractedText;
use async_trait::async_trait;
use clauseguard_common::config::AnalysisConfig;
use clauseguard_common::types::{ContractAnalysis, RiskFlag};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Maximum number of risk flags a valid response may carry
pub const MAX_RISKS: usize = 5;

/// Maximum clause excerpt length in words before ellipsis truncation
pub const MAX_CLAUSE_WORDS: usize = 120;

/// First retry delay; doubles per attempt
const BACKOFF_BASE_MS: u64 = 500;

/// Ceiling on a single retry delay, whatever the attempt number
const BACKOFF_CAP_MS: u64 = 30_000;

/// Instruction contract sent as the system message on every call
const SYSTEM_PROMPT: &str = r#"You are an expert contract analyst built for small and mid-sized businesses.
Given any contract or official document - real estate, legal, lease, healthcare, finance, public accounting, or other regulated industry - your job is to:

1. Produce a one-page (~300-word) executive summary highlighting obligations, rights, and risk posture.
2. Identify the top five highest-risk clauses, pasting each verbatim with its page number. Page numbers refer to the [Page N] markers in the input.
3. For each flagged clause, cite publicly available official sources (statutes, regulations, case law, industry guidance) to justify the risk.
4. Suggest potential blind-spots the user may have overlooked.
5. Operate with zero setup - assume a PDF upload and return a self-contained JSON response.

Return only valid JSON:
{
  "summary": string,
  "risks": [up to 5 of { "title": string, "clause": string, "page": number, "citations": [string, ...], "blindSpot": string }]
}"#;

/// Failure talking to the generative backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned {status}: {detail}")]
    Api { status: u16, detail: String },
}

impl BackendError {
    /// Transient failures worth another attempt: transport errors,
    /// rate limiting, and backend 5xx. Anything else is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Transport(_) => true,
            BackendError::Api { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// Invoker failure after all attempts
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Response text violated the output contract
    #[error("format violation: {0}")]
    Format(String),

    /// Backend unreachable or failing after bounded retries
    #[error("backend unavailable: {0}")]
    Upstream(String),
}

/// Boundary to the generative backend: document text in, raw response
/// text out. Implementations perform exactly one attempt; retry policy
/// belongs to the invoker.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze(&self, document_text: &str) -> Result<String, BackendError>;
}

/// Submit extracted text for analysis and validate the result.
///
/// Retries transient backend failures up to `max_retries` additional
/// times with exponential backoff. A response that arrives but violates
/// the contract is rejected immediately; re-asking a non-deterministic
/// backend to fix its format is explicitly out of policy.
pub async fn invoke(
    backend: &dyn AnalysisBackend,
    max_retries: u32,
    extracted: &ExtractedText,
) -> Result<ContractAnalysis, AnalysisError> {
    let body = extracted.prompt_body();
    let mut attempt: u32 = 0;

    loop {
        tracing::debug!(attempt, "Submitting document to analysis backend");
        match backend.analyze(&body).await {
            Ok(raw) => return parse_analysis(&raw).map_err(AnalysisError::Format),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = backoff_delay(attempt);
                tracing::warn!(attempt, "Analysis backend failed ({}), retrying in {:?}", e, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(AnalysisError::Upstream(e.to_string())),
        }
    }
}

/// Exponential backoff capped at [`BACKOFF_CAP_MS`]; saturates rather
/// than overflowing for large attempt numbers.
fn backoff_delay(attempt: u32) -> Duration {
    let millis = BACKOFF_BASE_MS
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(BACKOFF_CAP_MS);
    Duration::from_millis(millis)
}

/// Parse and validate raw backend text against the output contract.
///
/// Required shape: an object with `summary` (non-empty string) and
/// `risks` (array of at most five objects, each with `title`, `clause`,
/// `page` >= 1, at least one string citation, and `blindSpot`). Missing
/// or mistyped fields are rejected; nothing is fabricated or repaired.
/// The single permitted coercion is clause truncation to 120 words.
pub fn parse_analysis(raw: &str) -> Result<ContractAnalysis, String> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| format!("response is not valid JSON: {}", e))?;

    let obj = value
        .as_object()
        .ok_or_else(|| "response is not a JSON object".to_string())?;

    let summary = obj
        .get("summary")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing or non-string 'summary'".to_string())?;
    if summary.trim().is_empty() {
        return Err("'summary' is empty".to_string());
    }

    let risks_value = obj
        .get("risks")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing or non-array 'risks'".to_string())?;
    if risks_value.len() > MAX_RISKS {
        return Err(format!(
            "'risks' has {} entries, contract allows at most {}",
            risks_value.len(),
            MAX_RISKS
        ));
    }

    let mut risks = Vec::with_capacity(risks_value.len());
    for (i, risk) in risks_value.iter().enumerate() {
        risks.push(parse_risk(risk).map_err(|e| format!("risks[{}]: {}", i, e))?);
    }

    Ok(ContractAnalysis {
        summary: summary.to_string(),
        risks,
    })
}

fn parse_risk(value: &Value) -> Result<RiskFlag, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "entry is not an object".to_string())?;

    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing or non-string 'title'".to_string())?;

    let clause = obj
        .get("clause")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing or non-string 'clause'".to_string())?;

    let page = obj
        .get("page")
        .and_then(Value::as_u64)
        .ok_or_else(|| "missing or non-integer 'page'".to_string())?;
    if page < 1 || page > u32::MAX as u64 {
        return Err(format!("'page' {} is not a 1-based page number", page));
    }

    let citations_value = obj
        .get("citations")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing or non-array 'citations'".to_string())?;
    if citations_value.is_empty() {
        return Err("'citations' is empty".to_string());
    }
    let mut citations = Vec::with_capacity(citations_value.len());
    for citation in citations_value {
        citations.push(
            citation
                .as_str()
                .ok_or_else(|| "non-string entry in 'citations'".to_string())?
                .to_string(),
        );
    }

    let blind_spot = obj
        .get("blindSpot")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing or non-string 'blindSpot'".to_string())?;

    Ok(RiskFlag {
        title: title.to_string(),
        clause: truncate_clause(clause),
        page: page as u32,
        citations,
        blind_spot: blind_spot.to_string(),
    })
}

/// Truncate a clause excerpt to 120 words, appending an ellipsis.
pub fn truncate_clause(clause: &str) -> String {
    let words: Vec<&str> = clause.split_whitespace().collect();
    if words.len() <= MAX_CLAUSE_WORDS {
        return clause.to_string();
    }
    let mut truncated = words[..MAX_CLAUSE_WORDS].join(" ");
    truncated.push('…');
    truncated
}

/// OpenAI-compatible analysis backend (chat completions, JSON mode)
pub struct OpenAiAnalyzer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiAnalyzer {
    pub fn new(config: &AnalysisConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl AnalysisBackend for OpenAiAnalyzer {
    async fn analyze(&self, document_text: &str) -> Result<String, BackendError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: document_text,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(self.chat_completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::Transport("response carried no content".to_string()))
    }
}
