// CV enhancement: input holder, submission orchestrator and the generation seam.
// All LLM calls go through llm_client — no direct Anthropic calls here.

pub mod generator;
pub mod handlers;
pub mod language;
pub mod orchestrator;
pub mod prompts;
pub mod registry;
pub mod session;
