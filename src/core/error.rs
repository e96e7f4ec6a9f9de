use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    Config,
    NotFound,
    Syntax,
    ModelMismatch,
    Protocol,
    IndexAccess,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    /// Query syntax error; aborts the offending query only.
    pub fn syntax(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Syntax, context.into())
    }

    /// An operator received a retrieval model it does not support.
    pub fn model_mismatch(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::ModelMismatch, context.into())
    }

    /// DAAT iteration protocol violation. These indicate programming
    /// bugs, not bad input.
    pub fn protocol(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Protocol, context.into())
    }

    /// Failure to obtain postings or statistics from the index.
    pub fn index_access(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::IndexAccess, context.into())
    }

    pub fn config(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Config, context.into())
    }

    pub fn not_found(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::NotFound, context.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: err.to_string(),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
