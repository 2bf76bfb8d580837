use backtrace::Backtrace;
use parking_lot::Mutex;
use serde::{de, ser};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for filter engine operations.
///
/// Each kind names one category of failure so callers can tell a malformed
/// query apart from a foreign pagination token or an adapter limitation.
///
/// # Examples
///
/// ```rust
/// use telemetra::errors::{ErrorKind, TelemetraError, TelemetraResult};
///
/// fn example() -> TelemetraResult<()> {
///     Err(TelemetraError::new("unknown operator '_foo'", ErrorKind::ParseError))
/// }
///
/// assert_eq!(example().unwrap_err().kind(), &ErrorKind::ParseError);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// Malformed wire JSON, unknown operator or wrong value shape
    ParseError,
    /// A value cannot be classified, or two compared values have incompatible types
    TypeError,
    /// Invalid path shape, such as indexing into a scalar or an unknown event field
    FieldPathError,
    /// An adapter was asked to evaluate a node variant it does not support
    UnsupportedOperation,
    /// A resume cursor disagrees with the ordering of the current query
    CursorMismatch,
    /// Error encoding or decoding a transport token
    EncodingError,
    /// Invalid engine configuration
    ConfigError,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ParseError => write!(f, "Parse error"),
            ErrorKind::TypeError => write!(f, "Type error"),
            ErrorKind::FieldPathError => write!(f, "Field path error"),
            ErrorKind::UnsupportedOperation => write!(f, "Unsupported operation"),
            ErrorKind::CursorMismatch => write!(f, "Cursor mismatch"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::ConfigError => write!(f, "Configuration error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type of the filter engine.
///
/// `TelemetraError` carries a human readable message, an [`ErrorKind`], an
/// optional cause and a lazily resolved backtrace.
///
/// # Examples
///
/// ```rust
/// use telemetra::errors::{ErrorKind, TelemetraError};
///
/// let cause = TelemetraError::new("unsupported value type null", ErrorKind::TypeError);
/// let err = TelemetraError::new_with_cause("invalid '_eq' value", ErrorKind::ParseError, cause);
/// assert_eq!(err.cause().map(|c| c.kind().clone()), Some(ErrorKind::TypeError));
/// ```
#[derive(Clone)]
pub struct TelemetraError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<TelemetraError>>,
    backtrace: Arc<Mutex<Backtrace>>,
}

impl TelemetraError {
    /// Creates a new error with the specified message and kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        TelemetraError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Mutex::new(Backtrace::new_unresolved())),
        }
    }

    /// Creates a new error that wraps an underlying cause.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    /// * `cause` - The underlying error that caused this error
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: TelemetraError) -> Self {
        TelemetraError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Mutex::new(Backtrace::new_unresolved())),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&TelemetraError> {
        self.cause.as_deref()
    }
}

impl Display for TelemetraError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Debug for TelemetraError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} ({})\nCaused by: {:?}", self.message, self.error_kind, cause),
            None => {
                let mut backtrace = self.backtrace.lock();
                backtrace.resolve();
                write!(f, "{} ({})\n{:?}", self.message, self.error_kind, *backtrace)
            }
        }
    }
}

impl Error for TelemetraError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for filter engine operations.
pub type TelemetraResult<T> = Result<T, TelemetraError>;

impl de::Error for TelemetraError {
    fn custom<T: Display>(msg: T) -> Self {
        TelemetraError::new(&msg.to_string(), ErrorKind::ParseError)
    }
}

impl ser::Error for TelemetraError {
    fn custom<T: Display>(msg: T) -> Self {
        TelemetraError::new(&msg.to_string(), ErrorKind::EncodingError)
    }
}

impl From<serde_json::Error> for TelemetraError {
    fn from(err: serde_json::Error) -> Self {
        let error_kind = if err.is_io() {
            ErrorKind::EncodingError
        } else {
            ErrorKind::ParseError
        };
        TelemetraError::new(&format!("JSON error: {}", err), error_kind)
    }
}

impl From<base64::DecodeError> for TelemetraError {
    fn from(err: base64::DecodeError) -> Self {
        TelemetraError::new(&format!("Base64 error: {}", err), ErrorKind::EncodingError)
    }
}

impl From<regex::Error> for TelemetraError {
    fn from(err: regex::Error) -> Self {
        TelemetraError::new(&format!("Invalid regex pattern: {}", err), ErrorKind::ParseError)
    }
}
