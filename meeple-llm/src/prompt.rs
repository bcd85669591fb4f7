//! Prompt templates for meeple LLM operations.
//!
//! Every prompt is a versioned, testable artifact. The built-in templates
//! below are used unless a deployment ships its own TOML overrides.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::LlmError;

/// Relevance scoring system prompt.
pub const RELEVANCE_SYSTEM: &str =
    "You are an expert board game recommender that outputs structured data.";

/// Relevance scoring user prompt. `{candidates}` is a blank-line separated
/// list of `Name: / Year: / Description:` blocks.
pub const RELEVANCE_USER: &str = r#"The user described their ideal board game as follows:
"{description}"

You are given a list of candidate board games.
For each game, assign a relevance score between 0 and 1 that reflects how well it matches the user's description.
Respond *only* in CSV format with two columns: Name, LLM_Score.
Example:
Name,LLM_Score
Game A,0.92
Game B,0.74

Games:
{candidates}"#;

/// Recommendation explanation system prompt.
pub const EXPLAIN_SYSTEM: &str = "You are a helpful, upbeat friend who explains \
    recommendations directly to the user. Be conversational and positive, avoid \
    sounding corporate.";

/// Recommendation explanation user prompt. `{payload}` is pretty-printed
/// JSON with the user's preferences and the top recommendations.
pub const EXPLAIN_USER: &str = "You are chatting inside a board game recommender app. \
Using the structured data below, talk directly to the user in a friendly tone \
and explain in 2-3 sentences why these games should click for them. \
Call out specific mechanics, themes, or player counts that match their preferences, \
and keep the explanation casual and encouraging.

{payload}";

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

// ---------------------------------------------------------------------------
// PromptEngine — Versioned TOML Template Loader
// ---------------------------------------------------------------------------

/// Identifies a prompt template by purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Candidate relevance scoring.
    RelevanceScoring,
    /// Recommendation explanation.
    Explanation,
}

impl PromptId {
    /// Returns the TOML filename (without path) for this prompt.
    #[must_use]
    pub fn filename(self) -> &'static str {
        match self {
            Self::RelevanceScoring => "relevance_scoring.toml",
            Self::Explanation => "explanation.toml",
        }
    }

    /// All prompt IDs.
    #[must_use]
    pub fn all() -> &'static [PromptId] {
        &[Self::RelevanceScoring, Self::Explanation]
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RelevanceScoring => "relevance_scoring",
            Self::Explanation => "explanation",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PromptId {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevance_scoring" => Ok(Self::RelevanceScoring),
            "explanation" => Ok(Self::Explanation),
            _ => Err(LlmError::ConfigError(format!("unknown prompt id: '{s}'"))),
        }
    }
}

/// Metadata and templates parsed from a TOML prompt file.
#[derive(Debug, Clone, Deserialize)]
struct TomlPromptFile {
    prompt: TomlPromptData,
}

/// Inner `[prompt]` section of a TOML file.
#[derive(Debug, Clone, Deserialize)]
struct TomlPromptData {
    version: String,
    max_tokens: u32,
    system: String,
    user: String,
}

/// A loaded, ready-to-render prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Prompt version string (e.g., "1.0").
    pub version: String,
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// System prompt template (contains `{key}` placeholders).
    pub system: String,
    /// User prompt template (contains `{key}` placeholders).
    pub user: String,
}

/// Engine that loads versioned TOML prompt templates and renders them.
///
/// # Example
///
/// ```no_run
/// use meeple_llm::prompt::{PromptEngine, PromptId};
///
/// let engine = PromptEngine::from_directory("prompts/v1")?;
/// let (system, user) = engine.render(
///     PromptId::RelevanceScoring,
///     &[("description", "co-op fantasy"), ("candidates", "Name: Gloomhaven")],
/// )?;
/// # Ok::<(), meeple_llm::LlmError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PromptEngine {
    templates: HashMap<PromptId, PromptTemplate>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptEngine {
    /// Create a `PromptEngine` pre-loaded with the built-in constant templates.
    #[must_use]
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();

        templates.insert(PromptId::RelevanceScoring, PromptTemplate {
            version: "builtin".into(),
            max_tokens: 4096,
            system: RELEVANCE_SYSTEM.into(),
            user: RELEVANCE_USER.into(),
        });

        templates.insert(PromptId::Explanation, PromptTemplate {
            version: "builtin".into(),
            max_tokens: 300,
            system: EXPLAIN_SYSTEM.into(),
            user: EXPLAIN_USER.into(),
        });

        Self { templates }
    }

    /// Load prompt templates from a directory of TOML files, on top of the
    /// built-in ones.
    ///
    /// Each TOML file must match a known [`PromptId`] filename; unknown
    /// files are ignored.
    ///
    /// # Errors
    /// Returns [`LlmError::ConfigError`] if the directory holds no prompt
    /// file, or a prompt file cannot be read or parsed.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, LlmError> {
        let dir = dir.as_ref();
        let mut engine = Self::builtin();
        let mut loaded = 0usize;

        for id in PromptId::all() {
            let path: PathBuf = dir.join(id.filename());
            if path.exists() {
                let shown = path.display();
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    LlmError::ConfigError(format!("failed to read {shown}: {e}"))
                })?;
                let parsed: TomlPromptFile = toml::from_str(&content).map_err(|e| {
                    LlmError::ConfigError(format!("failed to parse {shown}: {e}"))
                })?;

                let d = parsed.prompt;
                engine.templates.insert(*id, PromptTemplate {
                    version: d.version,
                    max_tokens: d.max_tokens,
                    system: d.system,
                    user: d.user,
                });
                loaded += 1;
            }
        }

        if loaded == 0 {
            return Err(LlmError::ConfigError(format!(
                "no prompt templates found in directory: {}",
                dir.display()
            )));
        }

        Ok(engine)
    }

    /// Get a loaded prompt template by ID.
    #[must_use]
    pub fn get(&self, id: PromptId) -> Option<&PromptTemplate> {
        self.templates.get(&id)
    }

    /// Render both system and user prompts for a given ID.
    ///
    /// Returns `(system_prompt, user_prompt)` with all `{key}` placeholders
    /// replaced.
    ///
    /// # Errors
    /// Returns an error if the prompt ID is not loaded.
    pub fn render(
        &self,
        id: PromptId,
        vars: &[(&str, &str)],
    ) -> Result<(String, String), LlmError> {
        let tpl = self
            .get(id)
            .ok_or_else(|| LlmError::ConfigError(format!("prompt template '{id}' not loaded")))?;

        let system = render_template(&tpl.system, vars);
        let user = render_template(&tpl.user, vars);
        Ok((system, user))
    }

    /// Number of loaded templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no templates are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
