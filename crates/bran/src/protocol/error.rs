use std::fmt;

/// The request did not complete, or completed with a non-success status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be encoded.
    Encode(String),
    Network(String),
    Status(u16),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(message) => write!(f, "event request could not be encoded: {message}"),
            Self::Network(message) => write!(f, "event request failed: {message}"),
            Self::Status(status) => write!(f, "event request returned status {status}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// The response body is not a valid event response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl From<serde_json::Error> for ParseError {
    fn from(error: serde_json::Error) -> Self {
        Self {
            message: error.to_string(),
            line: error.line(),
            column: error.column(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid event response: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Markup that cannot be turned into a mountable component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MountError {
    pub message: String,
    /// Rendered source report pointing at the offending markup.
    pub report: String,
}


impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.report.is_empty() {
            write!(f, "template could not be mounted: {}", self.message)
        } else {
            write!(f, "template could not be mounted: {}\n{}", self.message, self.report)
        }
    }
}

impl std::error::Error for MountError {}

/// The mount point is missing at startup. Fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingRootError {
    pub id: String,
}

impl fmt::Display for MissingRootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} required", self.id)
    }
}

impl std::error::Error for MissingRootError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeError {
    Transport(TransportError),
    Parse(ParseError),
    Mount(MountError),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(error) => error.fmt(f),
            Self::Parse(error) => error.fmt(f),
            Self::Mount(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(error) => Some(error),
            Self::Parse(error) => Some(error),
            Self::Mount(error) => Some(error),
        }
    }
}

impl From<TransportError> for RuntimeError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl From<ParseError> for RuntimeError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<MountError> for RuntimeError {
    fn from(error: MountError) -> Self {
        Self::Mount(error)
    }
}
