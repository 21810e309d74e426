//! HTTP transport for SOAP requests.

use crate::config::ServiceConfig;
use crate::error::FfiecError;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

/// Raw HTTP response to a SOAP request.
#[derive(Debug, Clone)]
pub struct SoapResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl SoapResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Delivers a rendered envelope and returns whatever came back.
///
/// Non-2xx responses are returned, not raised: SOAP 1.1 services report
/// Faults with HTTP 500.
pub trait SoapTransport {
    fn post(&self, soap_action: &str, envelope: String) -> Result<SoapResponse, FfiecError>;
}

/// Blocking reqwest transport posting to a fixed endpoint.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(config: &ServiceConfig) -> Result<Self, FfiecError> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint_url(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SoapTransport for HttpTransport {
    fn post(&self, soap_action: &str, envelope: String) -> Result<SoapResponse, FfiecError> {
        debug!(endpoint = %self.endpoint, soap_action = %soap_action, "Posting SOAP request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{}\"", soap_action))
            .body(envelope)
            .send()?;

        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();

        debug!(status = status, bytes = body.len(), "Received SOAP response");
        Ok(SoapResponse { status, body })
    }
}
