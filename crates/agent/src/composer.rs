//! Response composer: turns retrieved knowledge and recent history into a
//! single grounded prompt and asks the provider for an answer.
//!
//! Prompt layout:
//!
//! ```text
//! <system prompt>
//!
//! Conversation history:
//! User: ...
//! Ledgerwise: ...
//!
//!
//! Query: <query>
//!
//! Relevant financial knowledge:
//! - <term>: <definition>
//! ```

use ledgerwise_config::AppConfig;
use ledgerwise_core::error::ProviderError;
use ledgerwise_core::knowledge::RankedTerm;
use ledgerwise_core::provider::{Provider, ProviderRequest};
use ledgerwise_core::session::ConversationTurn;
use ledgerwise_knowledge::KnowledgeStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name the assistant uses for itself in history lines.
pub const ASSISTANT_NAME: &str = "Ledgerwise";

/// Default number of past turns rendered into the prompt.
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

const SYSTEM_PROMPT: &str = "You are Ledgerwise, a friendly financial guide who explains money topics in simple language.
Your goal is to make personal finance approachable and easy to understand.
Use the provided financial knowledge to inform your answers, but explain
everything in plain, jargon-free words. Reach for everyday analogies and short
examples when a concept is abstract. Keep the tone conversational.
If you are not sure about something, say so honestly. Never invent financial facts, figures, or products.";

pub struct ResponseComposer {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    history_window: usize,
}

impl ResponseComposer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    /// Build from the top-level generation defaults and `[sessions]` window.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider, config.generation_model())
            .with_temperature(config.default_temperature)
            .with_max_tokens(Some(config.default_max_tokens))
            .with_history_window(config.sessions.history_window)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Assemble the full prompt. Pure; no provider call.
    ///
    /// Only the last `history_window` turns are rendered. Ranked terms with
    /// no definition in `store` are skipped.
    pub fn build_prompt(
        &self,
        query: &str,
        history: &[ConversationTurn],
        ranked: &[RankedTerm],
        store: &KnowledgeStore,
    ) -> String {
        let start = history.len().saturating_sub(self.history_window);
        let mut history_block = String::new();
        for turn in &history[start..] {
            history_block.push_str(&format!("User: {}\n", turn.user_text));
            if let Some(bot) = &turn.bot_text {
                history_block.push_str(&format!("{ASSISTANT_NAME}: {bot}\n"));
            }
        }

        let mut knowledge_block = String::new();
        for ranked_term in ranked {
            match store.definition(&ranked_term.term) {
                Some(definition) => {
                    knowledge_block.push_str(&format!("- {}: {}\n", ranked_term.term, definition));
                }
                None => warn!(term = %ranked_term.term, "Ranked term missing from knowledge store"),
            }
        }

        format!(
            "{}\n\nConversation history:\n{}\n\nQuery: {}\n\nRelevant financial knowledge:\n{}",
            SYSTEM_PROMPT, history_block, query, knowledge_block
        )
    }

    /// Build the prompt and return the provider's text verbatim.
    pub async fn compose(
        &self,
        query: &str,
        history: &[ConversationTurn],
        ranked: &[RankedTerm],
        store: &KnowledgeStore,
    ) -> Result<String, ProviderError> {
        let prompt = self.build_prompt(query, history, ranked, store);

        let mut request = ProviderRequest::new(&self.model, prompt);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            prompt_len = request.prompt.len(),
            "Composing response"
        );

        let response = self.provider.complete(request).await?;
        Ok(response.text)
    }
}
