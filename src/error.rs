use thiserror::Error;

/// Library error type for carousel operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The selector matched nothing, or the supplied node cannot host a carousel.
    #[error("an invalid selector or non-DOM node has been provided: {0}")]
    InvalidTarget(String),

    /// Resolved options violate an invariant (e.g. zero visible slides).
    #[error("invalid carousel options: {0}")]
    InvalidOptions(String),

    /// The carousel was torn down; no further commands are accepted.
    #[error("carousel has been destroyed")]
    Destroyed,

    /// A jump named a slide the carousel does not have.
    #[error("slide {index} is out of range for a carousel of {len}")]
    SlideOutOfRange { index: usize, len: usize },

    /// A command arrived before `initialize`.
    #[error("carousel has not been initialized")]
    NotInitialized,

    /// The display surface refused an update.
    #[error("display surface error: {0}")]
    Surface(anyhow::Error),

    /// The configuration file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid YAML for [`crate::config::Configuration`].
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}
