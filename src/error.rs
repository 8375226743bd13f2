#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Invalid channel map configuration.
    #[error("Invalid channel map: {0}")]
    ChannelMap(String),
}

pub type Result<T> = std::result::Result<T, Error>;
