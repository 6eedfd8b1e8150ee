use thiserror::Error;

/// Errors talking to an external engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to start engine {path:?}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The process closed its output
    #[error("Engine exited unexpectedly")]
    Closed,

    #[error("Engine did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Engine protocol error: {0}")]
    Protocol(String),

    /// Every attempt produced an unusable move
    #[error("Engine gave no legal move after {attempts} attempts")]
    NoLegalMove { attempts: u32 },
}

pub type EngineResult<T> = Result<T, EngineError>;
