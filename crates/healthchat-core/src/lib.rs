pub mod ai;
pub mod config;
pub mod engine;
pub mod reveal;
pub mod state;

// Re-export main types for convenience
pub use ai::{Prediction, ReplyClient, ReplyError, ReplyService, SymptomClient};
pub use config::{Config, ConfigUpdate};
pub use engine::{ConversationEngine, EngineSettings, SERVER_ERROR};
pub use reveal::{reveal, RevealContext, RevealStep, RevealStream};
pub use state::{ChatEntry, ChatLog, ChatRole, RequestId};
