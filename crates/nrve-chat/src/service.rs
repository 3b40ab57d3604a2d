use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use nrve_core::{JournalStore, LanguageModel, NrveError, NrveResult, PromptKind};

use crate::context::{select_context, ContextLimits};
use crate::prompt::{chat_prompt, guided_prompt, CANNED_REPLIES, EMPTY_REPLY};

#[derive(Debug, Clone, Copy, Default)]
pub struct ChatSettings {
    pub context: ContextLimits,
    /// Extra attempts after a failed model call. 0 means a single attempt.
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub reply: String,
    /// True when the model failed and a canned reply was substituted.
    pub degraded: bool,
}

/// Chat and guided-prompt replies. Model failures never reach the caller:
/// they are logged, counted, and replaced by a canned reply.
pub struct ChatService<S> {
    store: Arc<S>,
    model: Option<Arc<dyn LanguageModel>>,
    settings: ChatSettings,
    upstream_failures: AtomicU64,
}

impl<S: JournalStore> ChatService<S> {
    pub fn new(
        store: Arc<S>,
        model: Option<Arc<dyn LanguageModel>>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            store,
            model,
            settings,
            upstream_failures: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn upstream_failures(&self) -> u64 {
        self.upstream_failures.load(Ordering::Relaxed)
    }

    pub fn reply(&self, message: &str) -> NrveResult<ChatReply> {
        if message.trim().is_empty() {
            return Err(NrveError::Validation("message required".into()));
        }

        let limits = &self.settings.context;
        let block = match select_context(self.store.as_ref(), message, limits) {
            Ok(ctx) => ctx.map(|c| {
                debug!(source = ?c.source, entries = c.entries.len(), "journal context");
                c.render(limits.excerpt_chars)
            }),
            Err(e) => {
                warn!("journal context unavailable: {e}");
                None
            }
        };

        Ok(self.complete(&chat_prompt(message, block.as_deref())))
    }

    pub fn guided(&self, kind: PromptKind, input: &str) -> NrveResult<ChatReply> {
        if input.trim().is_empty() {
            return Err(NrveError::Validation("input required".into()));
        }
        Ok(self.complete(&guided_prompt(kind, input)))
    }

    fn complete(&self, prompt: &str) -> ChatReply {
        match self.generate(prompt) {
            Ok(text) => {
                let text = text.trim();
                let reply = if text.is_empty() { EMPTY_REPLY } else { text };
                ChatReply {
                    reply: reply.to_string(),
                    degraded: false,
                }
            }
            Err(e) => {
                self.upstream_failures.fetch_add(1, Ordering::Relaxed);
                warn!("model call failed, using canned reply: {e}");
                ChatReply {
                    reply: canned_reply().to_string(),
                    degraded: true,
                }
            }
        }
    }

    fn generate(&self, prompt: &str) -> NrveResult<String> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| NrveError::Upstream("no language model configured".into()))?;

        let mut attempt = 0;
        loop {
            match model.generate(prompt) {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.settings.max_retries => {
                    attempt += 1;
                    debug!(model = model.name(), attempt, "retrying model call: {e}");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

pub fn canned_reply() -> &'static str {
    CANNED_REPLIES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(CANNED_REPLIES[0])
}
