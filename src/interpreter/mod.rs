pub mod apply;
pub mod reply;

pub use apply::{apply_reply, AppliedChange, ApplyReport};
pub use reply::{parse_response, AssistantReply, FileOperation};
