//! CDR retrieval service client.
//!
//! Each retrieval method maps to exactly one service operation. Arguments are
//! forwarded as given; the service is the only validator.

use crate::config::{resolve_credentials, user_conf_path, Credentials, ServiceConfig};
use crate::envelope::build_envelope;
use crate::error::FfiecError;
use crate::parser::{parse_operation_result, XmlElement};
use crate::service::{
    decode_binary, decode_bool, decode_filer_submissions, decode_int_array, decode_panel,
    decode_string_array, FacsimileRequest, FilerSubmission, FilersSinceRequest, PanelRequest,
    RemoteCall, ReportingDataSeriesName, ReportingFinancialInstitution, UbprFacsimileRequest,
};
use crate::transport::{HttpTransport, SoapTransport};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What to do with a retrieved facsimile.
#[derive(Debug, Clone)]
pub struct FacsimileOutput {
    /// Write the facsimile here, replacing any existing file
    pub outfile: Option<PathBuf>,
    /// Hand the facsimile back to the caller
    pub return_result: bool,
}

impl Default for FacsimileOutput {
    fn default() -> Self {
        Self {
            outfile: None,
            return_result: true,
        }
    }
}

impl FacsimileOutput {
    /// Write to `path` without returning the bytes.
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            outfile: Some(path.into()),
            return_result: false,
        }
    }

    fn deliver(&self, facsimile: Vec<u8>) -> Result<Option<Vec<u8>>, FfiecError> {
        if let Some(ref path) = self.outfile {
            std::fs::write(path, &facsimile)?;
            info!(path = %path.display(), bytes = facsimile.len(), "Wrote facsimile");
        }
        Ok(self.return_result.then_some(facsimile))
    }
}

/// Client for the FFIEC CDR Public Web Service.
pub struct FfiecClient<T = HttpTransport> {
    config: ServiceConfig,
    credentials: Option<Credentials>,
    user_conf: PathBuf,
    transport: T,
}

impl FfiecClient<HttpTransport> {
    /// Create a client against the public service, taking the credentials
    /// file location from `FFIEC_USER_CONF` or the home directory.
    pub fn new(credentials: Option<Credentials>) -> Result<Self, FfiecError> {
        Self::with_config(ServiceConfig::default(), credentials, user_conf_path())
    }

    /// Create a client with explicit settings and credentials file location.
    pub fn with_config(
        config: ServiceConfig,
        credentials: Option<Credentials>,
        user_conf: impl Into<PathBuf>,
    ) -> Result<Self, FfiecError> {
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, credentials, user_conf, transport)
    }
}

impl<T: SoapTransport> FfiecClient<T> {
    /// Create a client over an arbitrary transport.
    ///
    /// Credentials are resolved once here; see
    /// [`resolve_credentials`](crate::config::resolve_credentials).
    pub fn with_transport(
        config: ServiceConfig,
        credentials: Option<Credentials>,
        user_conf: impl Into<PathBuf>,
        transport: T,
    ) -> Result<Self, FfiecError> {
        let user_conf = user_conf.into();
        let credentials = resolve_credentials(credentials, &user_conf)?;

        debug!(
            wsdl = %config.wsdl,
            endpoint = %config.endpoint_url(),
            authenticated = credentials.is_some(),
            "Client initialized"
        );

        Ok(Self {
            config,
            credentials,
            user_conf,
            transport,
        })
    }

    /// Location of the service description this client is bound to.
    pub fn wsdl(&self) -> &str {
        &self.config.wsdl
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn user_conf_path(&self) -> &Path {
        &self.user_conf
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Invoke an operation and return its raw result element.
    pub fn invoke(&self, call: &RemoteCall) -> Result<XmlElement, FfiecError> {
        debug!(operation = %call.operation(), "Invoking operation");

        let envelope = build_envelope(call, self.credentials.as_ref());
        let response = self.transport.post(&call.soap_action(), envelope)?;

        match parse_operation_result(&response.body, call.operation()) {
            Ok(result) => Ok(result),
            Err(e @ FfiecError::Fault(_)) => Err(e),
            Err(_) if !response.is_success() => Err(FfiecError::HttpStatus {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            }),
            Err(e) => Err(e),
        }
    }

    /// `RetrieveFacsimile`: a report for one institution and period.
    pub fn retrieve_facsimile(
        &self,
        request: &FacsimileRequest,
        output: &FacsimileOutput,
    ) -> Result<Option<Vec<u8>>, FfiecError> {
        let result = self.invoke(&request.to_call())?;
        output.deliver(decode_binary(&result)?)
    }

    /// `RetrieveFilersSinceDate`: ids of institutions whose filings changed
    /// on or after `last_update`.
    pub fn retrieve_filers_since_date(
        &self,
        request: &FilersSinceRequest,
    ) -> Result<Vec<i64>, FfiecError> {
        let result = self.invoke(&request.to_since_date_call())?;
        decode_int_array(&result)
    }

    /// `RetrieveFilersSubmissionDateTime`: like
    /// [`retrieve_filers_since_date`](Self::retrieve_filers_since_date), with
    /// submission timestamps.
    pub fn retrieve_filers_submission_datetime(
        &self,
        request: &FilersSinceRequest,
    ) -> Result<Vec<FilerSubmission>, FfiecError> {
        let result = self.invoke(&request.to_submission_datetime_call())?;
        decode_filer_submissions(&result)
    }

    /// `RetrievePanelOfReporters`
    pub fn retrieve_panel_of_reporters(
        &self,
        request: &PanelRequest,
    ) -> Result<Vec<ReportingFinancialInstitution>, FfiecError> {
        let result = self.invoke(&request.to_call())?;
        decode_panel(&result)
    }

    /// `RetrieveReportingPeriods`
    pub fn retrieve_reporting_periods(
        &self,
        data_series: ReportingDataSeriesName,
    ) -> Result<Vec<String>, FfiecError> {
        let result = self.invoke(&RemoteCall::retrieve_reporting_periods(data_series))?;
        Ok(decode_string_array(&result))
    }

    /// `RetrieveUBPRReportingPeriods`
    pub fn retrieve_ubpr_reporting_periods(&self) -> Result<Vec<String>, FfiecError> {
        let result = self.invoke(&RemoteCall::retrieve_ubpr_reporting_periods())?;
        Ok(decode_string_array(&result))
    }

    /// `RetrieveUBPRXBRLFacsimile`: the UBPR for one institution as XBRL.
    pub fn retrieve_ubpr_xbrl_facsimile(
        &self,
        request: &UbprFacsimileRequest,
        output: &FacsimileOutput,
    ) -> Result<Option<Vec<u8>>, FfiecError> {
        let result = self.invoke(&request.to_call())?;
        output.deliver(decode_binary(&result)?)
    }

    /// `TestUserAccess`: whether the current credentials are accepted.
    pub fn test_user_access(&self) -> Result<bool, FfiecError> {
        let result = self.invoke(&RemoteCall::test_user_access())?;
        decode_bool(&result)
    }
}
