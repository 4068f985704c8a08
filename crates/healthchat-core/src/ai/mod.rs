pub mod reply;
pub mod symptoms;

pub use reply::{build_prompt, ReplyClient, ReplyError, ReplyService, NO_RESPONSE};
pub use symptoms::{Prediction, SymptomClient};
