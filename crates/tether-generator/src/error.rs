use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeneratorError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("invalid alphabet: {0}")]
    InvalidAlphabet(String),
    #[error("code length must be between {min} and {max}, got {got}")]
    InvalidLength { min: usize, max: usize, got: usize },
    #[error("symbol '{0}' is not part of the alphabet")]
    UnknownSymbol(char),
    #[error("cannot decode an empty code")]
    Empty,
    #[error("decoded value does not fit in 64 bits")]
    Overflow,
}
