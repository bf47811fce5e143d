// Plan generation core.
// Flow: builder → llm_client → sanitizer → validator → normalizer, driven by pipeline.
// All LLM calls go through llm_client — nothing here talks to the provider directly.

pub mod builder;
pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
pub mod sanitizer;
pub mod validator;
