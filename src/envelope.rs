//! SOAP 1.1 request envelopes.

use crate::config::Credentials;
use crate::parser::SOAP_11_NS;
use crate::service::{RemoteCall, SERVICE_NS};

/// WS-Security extension namespace.
pub const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";

/// `Type` of a plain-text `wsse:Password`.
pub const PASSWORD_TEXT_TYPE: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";

/// Render the request envelope for `call`. The WS-Security header is only
/// present when credentials are known.
pub fn build_envelope(call: &RemoteCall, credentials: Option<&Credentials>) -> String {
    let header = credentials.map(security_header).unwrap_or_default();

    let params = call
        .params()
        .iter()
        .map(|(name, value)| format!("      <{0}>{1}</{0}>", name, xml_escape(value)))
        .collect::<Vec<_>>()
        .join("\n");

    let operation = if params.is_empty() {
        format!("    <{} xmlns=\"{}\" />", call.operation(), SERVICE_NS)
    } else {
        format!(
            "    <{0} xmlns=\"{1}\">\n{2}\n    </{0}>",
            call.operation(),
            SERVICE_NS,
            params
        )
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="{}">
{}  <soap:Body>
{}
  </soap:Body>
</soap:Envelope>"#,
        SOAP_11_NS, header, operation
    )
}

fn security_header(credentials: &Credentials) -> String {
    format!(
        r#"  <soap:Header>
    <wsse:Security xmlns:wsse="{}" soap:mustUnderstand="1">
      <wsse:UsernameToken>
        <wsse:Username>{}</wsse:Username>
        <wsse:Password Type="{}">{}</wsse:Password>
      </wsse:UsernameToken>
    </wsse:Security>
  </soap:Header>
"#,
        WSSE_NS,
        xml_escape(credentials.username()),
        PASSWORD_TEXT_TYPE,
        xml_escape(credentials.password())
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
