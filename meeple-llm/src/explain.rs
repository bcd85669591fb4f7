//! Friendly explanations of a finished recommendation list.
//!
//! Purely cosmetic: any failure yields `None` and the caller shows the
//! ranking without prose.

use std::sync::Arc;

use meeple_core::config::LlmConfig;
use meeple_core::{ItemCatalog, ItemId, RecommendationRequest, Recommendations};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::client::LlmClient;
use crate::prompt::{PromptEngine, PromptId, render_template};
use crate::types::LlmRequest;

/// Most rows shown to the model.
pub const MAX_EXPLAINED: usize = 5;

/// Writes a short, conversational "why these games" paragraph.
#[derive(Debug, Clone)]
pub struct Explainer {
    client: Arc<LlmClient>,
    prompts: PromptEngine,
    temperature: f32,
    timeout_ms: u64,
}

impl Explainer {
    /// Create an explainer using the built-in prompts and the `[llm]` settings.
    #[must_use]
    pub fn new(client: Arc<LlmClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            prompts: PromptEngine::builtin(),
            temperature: config.explain_temperature,
            timeout_ms: config.request_timeout_ms,
        }
    }

    /// Use a different prompt set.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptEngine) -> Self {
        self.prompts = prompts;
        self
    }

    /// Structured context handed to the model: what the user asked for and
    /// the top rows.
    #[must_use]
    pub fn payload(
        request: &RecommendationRequest,
        catalog: &ItemCatalog,
        recommendations: &Recommendations,
    ) -> Value {
        let names = |ids: &[ItemId]| -> Vec<String> {
            ids.iter()
                .filter_map(|&id| catalog.item(id).ok().map(|item| item.name.clone()))
                .collect()
        };

        let top: Vec<Value> = recommendations
            .rows()
            .iter()
            .take(MAX_EXPLAINED)
            .map(|row| {
                json!({
                    "name": row.name,
                    "categories": row.item.categories,
                    "mechanics": row.item.mechanics,
                    "score": row.score,
                    "players_min": row.item.players.0,
                    "players_max": row.item.players.1,
                })
            })
            .collect();

        json!({
            "user_preferences": {
                "liked": names(&request.liked),
                "disliked": names(&request.disliked),
                "filters": request.filters,
                "description": request.description,
                "alpha": request.alpha,
                "beta": request.beta,
            },
            "top_recommendations": top,
        })
    }

    /// Explain `recommendations` for `request`.
    ///
    /// Returns `None` when there is nothing to explain, the prompt cannot
    /// be built, or the model call fails or comes back empty.
    pub async fn explain(
        &self,
        request: &RecommendationRequest,
        catalog: &ItemCatalog,
        recommendations: &Recommendations,
    ) -> Option<String> {
        if recommendations.is_empty() {
            return None;
        }

        let template = self.prompts.get(PromptId::Explanation)?;
        let payload = Self::payload(request, catalog, recommendations);
        let payload = serde_json::to_string_pretty(&payload).ok()?;
        let vars = [("payload", payload.as_str())];
        let llm_request = LlmRequest::explanation(
            render_template(&template.system, &vars),
            render_template(&template.user, &vars),
        )
        .with_temperature(self.temperature)
        .with_max_tokens(template.max_tokens)
        .with_timeout(self.timeout_ms);

        match self.client.generate(&llm_request).await {
            Ok(response) if !response.text.is_empty() => {
                debug!(latency_ms = response.latency_ms, "recommendation explanation generated");
                Some(response.text)
            }
            Ok(_) => {
                debug!("LLM returned an empty explanation");
                None
            }
            Err(e) => {
                warn!(error = %e, "recommendation explanation unavailable");
                None
            }
        }
    }
}
