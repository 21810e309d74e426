//! Error types for the CDR client.

use std::fmt;
use thiserror::Error;

/// CDR client errors.
///
/// Remote failures are carried through as received: a SOAP Fault keeps the
/// service's own code and text, transport failures keep the reqwest error.
#[derive(Error, Debug)]
pub enum FfiecError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} from service: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("SOAP fault: {0}")]
    Fault(SoapFault),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FfiecError {
    /// The SOAP Fault, if this error came from one.
    pub fn as_fault(&self) -> Option<&SoapFault> {
        match self {
            Self::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

/// A SOAP 1.1 Fault returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    /// `faultcode`, e.g. `soap:Client`
    pub code: String,
    /// `faultstring`
    pub message: String,
    /// Text content of `detail`, if any
    pub detail: Option<String>,
}

impl SoapFault {
    /// Create a fault without detail.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            detail: None,
        }
    }
}

impl fmt::Display for SoapFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref detail) = self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}
