use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Failed to bind {role} listener on {addr}: {source}")]
    Bind {
        role: &'static str,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
