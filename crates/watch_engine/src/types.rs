use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("page {page}: {kind}: {message}")]
pub struct PageError {
    pub page: u32,
    pub kind: PageFailureKind,
    pub message: String,
}

impl PageError {
    pub(crate) fn new(page: u32, kind: PageFailureKind, message: impl Into<String>) -> Self {
        Self {
            page,
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Decode,
    Network,
}

impl fmt::Display for PageFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageFailureKind::InvalidUrl => write!(f, "invalid url"),
            PageFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            PageFailureKind::Timeout => write!(f, "timeout"),
            PageFailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            PageFailureKind::Decode => write!(f, "undecodable body"),
            PageFailureKind::Network => write!(f, "network error"),
        }
    }
}
