use crate::streaming::Service;
use thiserror::Error;

/// Failures the playback sequencer reports back to its caller.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("playlist is empty")]
    EmptyPlaylist,

    #[error(transparent)]
    Output(#[from] anyhow::Error),
}

/// Failures raised by the streaming resolvers.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The service lacks credentials; its operations stay disabled.
    #[error("{service} integration is not configured")]
    ConfigurationMissing { service: Service },

    #[error("{service} could not resolve the request: {reason}")]
    Resolution { service: Service, reason: String },

    #[error("{service} does not recognise {url}")]
    UnsupportedUrl { service: Service, url: String },
}

impl ResolveError {
    pub fn resolution(service: Service, reason: impl Into<String>) -> Self {
        Self::Resolution {
            service,
            reason: reason.into(),
        }
    }

    pub fn service(&self) -> Service {
        match self {
            Self::ConfigurationMissing { service }
            | Self::Resolution { service, .. }
            | Self::UnsupportedUrl { service, .. } => *service,
        }
    }
}

pub type PlayerResult<T> = std::result::Result<T, PlayerError>;
