pub mod config;
pub mod error;
pub mod model;

pub use config::{get_config, AppConfig};
pub use error::AppError;
pub use model::{
    Chunk, ContextRequest, ContextResponse, PrivacyLevel, RelevanceScore, Source, SourceRef,
    SourceType,
};
