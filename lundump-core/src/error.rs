use std::borrow::Cow;
use std::fmt;

/// Decoding failure.
///
/// Every decode step either succeeds completely or returns one of these; there
/// is no partial result. Steps wrap the errors of their sub-steps in
/// [`Error::Context`], so the message reads like a path into the chunk
/// (`prototype[2]: constant[5]: string payload: ...`).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("short read of {what} at offset 0x{offset:X}: expected {expected} bytes, got {actual}")]
    ShortRead {
        what: &'static str,
        offset: u64,
        expected: u64,
        actual: u64,
    },

    #[error("invalid format at offset 0x{offset:X}: {message}")]
    InvalidFormat { offset: u64, message: String },

    #[error("unsupported {field}: {value}")]
    UnsupportedDeclaration { field: &'static str, value: u64 },

    #[error("function prototypes nested deeper than {limit} levels")]
    StructuralLimitExceeded { limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{step}: {source}")]
    Context {
        step: Cow<'static, str>,
        #[source]
        source: Box<Error>,
    },
}

/// The root cause of an [`Error`], with all context layers stripped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    ShortRead,
    InvalidFormat,
    UnsupportedDeclaration,
    StructuralLimitExceeded,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ShortRead => "short read",
            ErrorKind::InvalidFormat => "invalid format",
            ErrorKind::UnsupportedDeclaration => "unsupported declaration",
            ErrorKind::StructuralLimitExceeded => "structural limit exceeded",
            ErrorKind::Io => "i/o error",
        };
        f.write_str(s)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Error::ShortRead { .. } => ErrorKind::ShortRead,
            Error::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            Error::UnsupportedDeclaration { .. } => ErrorKind::UnsupportedDeclaration,
            Error::StructuralLimitExceeded { .. } => ErrorKind::StructuralLimitExceeded,
            Error::Io(_) => ErrorKind::Io,
            Error::Context { .. } => unreachable!("root() never returns a context layer"),
        }
    }

    /// The innermost error, skipping every [`Error::Context`] layer.
    pub fn root(&self) -> &Error {
        let mut err = self;
        while let Error::Context { source, .. } = err {
            err = source;
        }
        err
    }

    /// Context steps from the outermost to the innermost.
    pub fn steps(&self) -> Vec<&str> {
        let mut steps = Vec::new();
        let mut err = self;
        while let Error::Context { step, source } = err {
            steps.push(step.as_ref());
            err = source;
        }
        steps
    }

    pub(crate) fn invalid(offset: u64, message: impl Into<String>) -> Self {
        Error::InvalidFormat {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn context(self, step: impl Into<Cow<'static, str>>) -> Self {
        Error::Context {
            step: step.into(),
            source: Box::new(self),
        }
    }
}

/// Attach the name of the failing step to an error, in the manner of
/// `anyhow::Context`.
pub trait ResultExt<T> {
    fn step(self, step: &'static str) -> Result<T>;

    fn with_step<S, F>(self, f: F) -> Result<T>
    where
        S: Into<Cow<'static, str>>,
        F: FnOnce() -> S;
}

impl<T> ResultExt<T> for Result<T> {
    fn step(self, step: &'static str) -> Result<T> {
        self.map_err(|e| e.context(step))
    }

    fn with_step<S, F>(self, f: F) -> Result<T>
    where
        S: Into<Cow<'static, str>>,
        F: FnOnce() -> S,
    {
        self.map_err(|e| e.context(f()))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_looks_through_context() {
        let err = Error::StructuralLimitExceeded { limit: 3 }
            .context("prototype[0]")
            .context("main function");
        assert_eq!(err.kind(), ErrorKind::StructuralLimitExceeded);
        assert_eq!(err.steps(), vec!["main function", "prototype[0]"]);
        assert_eq!(
            err.to_string(),
            "main function: prototype[0]: function prototypes nested deeper than 3 levels"
        );
    }

    #[test]
    fn with_step_formats_lazily() {
        let res: Result<()> = Err(Error::invalid(4, "bad"));
        let err = res.with_step(|| format!("constant[{}]", 7)).unwrap_err();
        assert_eq!(err.steps(), vec!["constant[7]"]);
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }
}
