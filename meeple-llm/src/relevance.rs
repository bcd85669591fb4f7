//! LLM-backed relevance oracle.
//!
//! The model is shown the description and every candidate as a
//! `Name / Year / Description` block and asked for `Name,LLM_Score` CSV.
//! Models wrap, quote and decorate CSV freely, so [`parse_score_csv`]
//! reads it with a flexible `csv` reader and drops what it cannot use.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord};
use meeple_core::config::LlmConfig;
use meeple_core::{Candidate, ItemId, OracleError, RelevanceOracle};
use regex::Regex;
use tracing::debug;

use crate::client::LlmClient;
use crate::prompt::{PromptEngine, PromptId, render_template};
use crate::types::LlmRequest;

/// Scores candidates by asking an LLM.
#[derive(Debug, Clone)]
pub struct LlmRelevanceOracle {
    client: Arc<LlmClient>,
    prompts: PromptEngine,
    temperature: f32,
    timeout_ms: u64,
}

impl LlmRelevanceOracle {
    /// Create an oracle using the built-in prompts and the `[llm]` settings.
    #[must_use]
    pub fn new(client: Arc<LlmClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            prompts: PromptEngine::builtin(),
            temperature: config.scoring_temperature,
            timeout_ms: config.request_timeout_ms,
        }
    }

    /// Use a different prompt set.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptEngine) -> Self {
        self.prompts = prompts;
        self
    }

    /// Build the scoring request for `description` over `candidates`.
    ///
    /// # Errors
    /// Returns [`OracleError::Unavailable`] if the scoring prompt is not
    /// loaded.
    pub fn build_request(
        &self,
        description: &str,
        candidates: &[Candidate],
    ) -> Result<LlmRequest, OracleError> {
        let template = self
            .prompts
            .get(PromptId::RelevanceScoring)
            .ok_or_else(|| OracleError::Unavailable("relevance scoring prompt not loaded".into()))?;

        let listing = format_candidates(candidates);
        let vars = [("description", description), ("candidates", listing.as_str())];
        Ok(LlmRequest::scoring(
            render_template(&template.system, &vars),
            render_template(&template.user, &vars),
        )
        .with_temperature(self.temperature)
        .with_max_tokens(template.max_tokens)
        .with_timeout(self.timeout_ms))
    }
}

#[async_trait]
impl RelevanceOracle for LlmRelevanceOracle {
    async fn score(
        &self,
        description: &str,
        candidates: &[Candidate],
    ) -> Result<HashMap<ItemId, f32>, OracleError> {
        let request = self.build_request(description, candidates)?;
        let response = self.client.generate(&request).await?;

        let rows = parse_score_csv(&response.text);
        if rows.is_empty() {
            return Err(OracleError::Malformed(format!(
                "no score rows in {} characters of output",
                response.text.len()
            )));
        }

        let mut by_name: HashMap<&str, ItemId> = HashMap::with_capacity(candidates.len());
        for c in candidates {
            by_name.entry(c.name.as_str()).or_insert(c.id);
        }

        let mut scores = HashMap::with_capacity(rows.len());
        for (name, score) in &rows {
            match by_name.get(name.as_str()) {
                Some(&id) => {
                    scores.insert(id, *score);
                }
                None => debug!(name = name.as_str(), "LLM scored a game that is not a candidate"),
            }
        }

        debug!(
            candidates = candidates.len(),
            parsed = rows.len(),
            matched = scores.len(),
            latency_ms = response.latency_ms,
            "LLM relevance scores received"
        );
        Ok(scores)
    }
}

/// Render the candidate listing embedded in the scoring prompt.
#[must_use]
pub fn format_candidates(candidates: &[Candidate]) -> String {
    candidates
        .iter()
        .map(|c| format!("Name: {}\nYear: {}\nDescription: {}", c.name, c.year, c.description))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First unsigned decimal in a score cell, e.g. `0.7` in `score: 0.7 (good)`.
static SCORE_NUMBER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"[0-9]*\.?[0-9]+"));

/// Parse `Name,Score` rows out of free-form model output.
///
/// - lines starting with a code fence are dropped,
/// - rows with a single cell are dropped,
/// - with more than two cells, the last is the score and the rest is the
///   name (names may contain unquoted commas),
/// - standard CSV quoting is honoured, then stray quotes and whitespace
///   around the name are trimmed,
/// - a `name` header row is skipped,
/// - the first decimal number in the score cell is used, clamped to
///   \[0, 1\]; rows without one are dropped.
#[must_use]
pub fn parse_score_csv(text: &str) -> Vec<(String, f32)> {
    let body = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    reader
        .records()
        .filter_map(|record| match record {
            Ok(record) => score_row(&record),
            Err(e) => {
                debug!(error = %e, "unreadable CSV row in LLM output");
                None
            }
        })
        .collect()
}

fn score_row(record: &StringRecord) -> Option<(String, f32)> {
    let cells = record.len();
    if cells < 2 {
        return None;
    }
    let name = record.iter().take(cells - 1).collect::<Vec<_>>().join(",");
    let name = name.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace());
    if name.is_empty() || name.eq_ignore_ascii_case("name") {
        return None;
    }
    let score = first_number(record.get(cells - 1)?)?;
    score.is_finite().then(|| (name.to_string(), score.clamp(0.0, 1.0)))
}

fn first_number(cell: &str) -> Option<f32> {
    let pattern = SCORE_NUMBER.as_ref().ok()?;
    pattern.find(cell)?.as_str().parse().ok()
}
