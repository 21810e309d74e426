//! Client for the FFIEC Central Data Repository Public Web Service
//!
//! Wraps the CDR retrieval service (SOAP 1.1 with a WS-Security username
//! token) in one blocking method per remote operation.
//!
//! # Features
//!
//! - Credential resolution from explicit arguments or `~/.ffiec`
//!   (overridable with `FFIEC_USER_CONF`), saved on first use
//! - Facsimile retrieval (PDF, XBRL, SDF) to memory or file
//! - Filer lists, panel of reporters and reporting periods
//! - UBPR reporting periods and XBRL facsimiles
//! - SOAP Faults surfaced with the service's own text
//!
//! # Example
//!
//! ```no_run
//! use ffiec_cdr::{Credentials, FacsimileOutput, FacsimileRequest, FfiecClient};
//!
//! let client = FfiecClient::new(Some(Credentials::new("jdoe", "token")))?;
//! client.retrieve_facsimile(
//!     &FacsimileRequest::default(),
//!     &FacsimileOutput::to_file("call-report.pdf"),
//! )?;
//! # Ok::<(), ffiec_cdr::FfiecError>(())
//! ```

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod parser;
pub mod service;
pub mod transport;

pub use client::{FacsimileOutput, FfiecClient};
pub use config::{Credentials, ServiceConfig};
pub use error::{FfiecError, SoapFault};
pub use service::{
    FacsimileFormat, FacsimileRequest, FilerSubmission, FilersSinceRequest,
    FinancialInstitutionIdType, PanelRequest, RemoteCall, ReportingDataSeriesName,
    ReportingFinancialInstitution, UbprFacsimileRequest,
};
pub use transport::{HttpTransport, SoapTransport};
