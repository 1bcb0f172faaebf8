//! Label generator collaborator: short human-readable names for clusters.
//!
//! [`ChatLabeler`] asks an OpenAI-compatible chat-completions endpoint;
//! [`StubLabeler`] works offline. Both also produce single-document titles.
//! Pick one from config with [`Labeler::from_config`].

pub mod config;
mod error;

mod chat;
mod prompt;
mod stub;

use async_trait::async_trait;

pub use crate::chat::ChatLabeler;
pub use crate::config::NamingConfig;
pub use crate::error::NamingError;
pub use crate::stub::StubLabeler;

/// Names one cluster from a handful of its member snippets.
#[async_trait]
pub trait LabelGenerator: Send + Sync {
    /// `samples` are `"{title}: {summary}"` snippets of one cluster's members.
    async fn generate_label(&self, samples: &[String]) -> Result<String, NamingError>;
}

/// Titles a single summary, in the summary's own language.
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    async fn generate_title(&self, summary: &str) -> Result<String, NamingError>;
}

/// The generator selected by [`NamingConfig::mode`].
#[derive(Debug, Clone)]
pub enum Labeler {
    Chat(ChatLabeler),
    Stub(StubLabeler),
}

impl Labeler {
    pub fn from_config(cfg: &NamingConfig) -> Result<Self, NamingError> {
        cfg.validate()?;
        match cfg.mode.as_str() {
            "stub" => Ok(Labeler::Stub(StubLabeler)),
            _ => ChatLabeler::new(cfg.clone()).map(Labeler::Chat),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Labeler::Chat(_) => "chat",
            Labeler::Stub(_) => "stub",
        }
    }
}

#[async_trait]
impl LabelGenerator for Labeler {
    async fn generate_label(&self, samples: &[String]) -> Result<String, NamingError> {
        match self {
            Labeler::Chat(inner) => inner.generate_label(samples).await,
            Labeler::Stub(inner) => inner.generate_label(samples).await,
        }
    }
}

#[async_trait]
impl TitleGenerator for Labeler {
    async fn generate_title(&self, summary: &str) -> Result<String, NamingError> {
        match self {
            Labeler::Chat(inner) => inner.generate_title(summary).await,
            Labeler::Stub(inner) => inner.generate_title(summary).await,
        }
    }
}
