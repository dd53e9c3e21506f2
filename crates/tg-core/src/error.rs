use thiserror::Error;

pub type TgResult<T> = Result<T, TgError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TgError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Cannot convert '{value}' to {expected}")]
    Conversion {
        value: String,
        expected: &'static str,
    },

    #[error("Invalid tile size {width}x{height}")]
    InvalidTileSize { width: u32, height: u32 },
}
