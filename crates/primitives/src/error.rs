use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitivesError {
    #[error("Size error: {context} (size: {size}, limit: {limit})")]
    Size {
        context: &'static str,
        size: usize,
        limit: usize,
    },

    #[error("Invalid chunk format: {0}")]
    Format(&'static str),

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

pub type Result<T> = std::result::Result<T, PrimitivesError>;

impl PrimitivesError {
    pub fn size(context: &'static str, size: usize, limit: usize) -> Self {
        Self::Size {
            context,
            size,
            limit,
        }
    }

    pub fn format(msg: &'static str) -> Self {
        Self::Format(msg)
    }
}
