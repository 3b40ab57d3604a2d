use crate::error::NrveResult;

/// A generative language model reached through a plain prompt-in, text-out
/// contract.
pub trait LanguageModel: Send + Sync {
    fn generate(&self, prompt: &str) -> NrveResult<String>;
    fn name(&self) -> &str;
}
