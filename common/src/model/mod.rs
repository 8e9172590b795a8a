pub mod chunk;
pub mod privacy;
pub mod request;
pub mod response;
pub mod source;

pub use chunk::{Chunk, RelevanceScore, SourceRef};
pub use privacy::PrivacyLevel;
pub use request::ContextRequest;
pub use response::ContextResponse;
pub use source::{Source, SourceType};
