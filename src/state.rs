//! Application state: the quiz store, known languages, prompts, and the optional OpenAI client.
//!
//! Nothing submission-specific lives here; every submission builds and drops its
//! own tree inside `logic`.

use tracing::{info, instrument};

use crate::config::{load_quiz_config_from_env, Prompts, QuizConfig};
use crate::domain::Language;
use crate::openai::OpenAI;
use crate::seeds::{default_languages, demo_test};
use crate::store::QuizStore;

pub struct AppState {
    pub store: QuizStore,
    pub languages: Vec<Language>,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, seed the store, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_quiz_config_from_env().unwrap_or_default();

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "quizsmith_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "quizsmith_backend", "OpenAI disabled (no OPENAI_API_KEY). Generation endpoint will return 503.");
        }

        Self::from_config(cfg, openai)
    }

    pub fn from_config(cfg: QuizConfig, openai: Option<OpenAI>) -> Self {
        let languages = if cfg.languages.is_empty() { default_languages() } else { cfg.languages };
        let store = QuizStore::with_tests(vec![demo_test()]);
        info!(target: "quizsmith_backend", languages = languages.len(), "Store seeded with demo test");

        Self { store, languages, openai, prompts: cfg.prompts }
    }
}

impl Default for AppState {
    fn default() -> Self { Self::from_config(QuizConfig::default(), None) }
}
