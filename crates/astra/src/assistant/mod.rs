//! Chat assistant: free-form answers, intent classification, and delegated actions.

pub mod domain;
mod intent;
pub mod router;
pub mod service;


pub use domain::{
    ActionOutcome, AssistantAction, ChatReply, ChatRequest, Intent, IntentAnalysis, IntentRequest,
};
pub use router::assistant_router;
pub use service::AssistantService;
