use thiserror::Error;

use crate::client::ClientId;

#[derive(Error, Debug)]
pub enum BroadcasterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Client {0} is closed")]
    Closed(ClientId),
}

pub type Result<T> = std::result::Result<T, BroadcasterError>;
