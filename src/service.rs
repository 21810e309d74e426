//! Retrieval service operations, enumerations and result records.
//!
//! Operation and parameter names follow the service description exactly;
//! the service rejects requests whose element names differ.

use crate::error::FfiecError;
use crate::parser::XmlElement;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target namespace of the retrieval service.
pub const SERVICE_NS: &str = "http://cdr.ffiec.gov/public/services";

/// Default reporting period used by the request types.
pub const DEFAULT_REPORTING_PERIOD: &str = "3/31/2017";

/// Default institution identifier used by the request types.
pub const DEFAULT_FI_ID: i64 = 64150;

/// `ReportingDataSeriesName`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReportingDataSeriesName {
    /// Consolidated Reports of Condition and Income
    #[default]
    Call,
}

impl ReportingDataSeriesName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "Call",
        }
    }
}

impl FromStr for ReportingDataSeriesName {
    type Err = FfiecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Call" => Ok(Self::Call),
            other => Err(unknown_value("ReportingDataSeriesName", other)),
        }
    }
}

/// `FinancialInstitutionIDType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FinancialInstitutionIdType {
    #[default]
    #[serde(rename = "ID_RSSD")]
    IdRssd,
    #[serde(rename = "FDICCertNumber")]
    FdicCertNumber,
    #[serde(rename = "OCCChartNumber")]
    OccChartNumber,
    #[serde(rename = "OTSDockNumber")]
    OtsDockNumber,
}

impl FinancialInstitutionIdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdRssd => "ID_RSSD",
            Self::FdicCertNumber => "FDICCertNumber",
            Self::OccChartNumber => "OCCChartNumber",
            Self::OtsDockNumber => "OTSDockNumber",
        }
    }
}

impl FromStr for FinancialInstitutionIdType {
    type Err = FfiecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ID_RSSD" => Ok(Self::IdRssd),
            "FDICCertNumber" => Ok(Self::FdicCertNumber),
            "OCCChartNumber" => Ok(Self::OccChartNumber),
            "OTSDockNumber" => Ok(Self::OtsDockNumber),
            other => Err(unknown_value("FinancialInstitutionIDType", other)),
        }
    }
}

/// `FacsimileFormat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FacsimileFormat {
    #[default]
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "XBRL")]
    Xbrl,
    #[serde(rename = "SDF")]
    Sdf,
}

impl FacsimileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Xbrl => "XBRL",
            Self::Sdf => "SDF",
        }
    }
}

impl FromStr for FacsimileFormat {
    type Err = FfiecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PDF" => Ok(Self::Pdf),
            "XBRL" => Ok(Self::Xbrl),
            "SDF" => Ok(Self::Sdf),
            other => Err(unknown_value("FacsimileFormat", other)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(ReportingDataSeriesName, FinancialInstitutionIdType, FacsimileFormat);

fn unknown_value(type_name: &str, value: &str) -> FfiecError {
    FfiecError::Config(format!("'{}' is not a valid {}", value, type_name))
}

/// A single operation invocation: the operation name plus its parameters in
/// the order the service declares them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    operation: &'static str,
    params: Vec<(&'static str, String)>,
}

impl RemoteCall {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            params: Vec::new(),
        }
    }

    /// Append a parameter.
    pub fn param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.push((name, value.to_string()));
        self
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Value of the `SOAPAction` HTTP header.
    pub fn soap_action(&self) -> String {
        format!("{}/{}", SERVICE_NS, self.operation)
    }

    pub fn retrieve_reporting_periods(data_series: ReportingDataSeriesName) -> Self {
        Self::new("RetrieveReportingPeriods").param("dataSeries", data_series)
    }

    pub fn retrieve_ubpr_reporting_periods() -> Self {
        Self::new("RetrieveUBPRReportingPeriods")
    }

    pub fn test_user_access() -> Self {
        Self::new("TestUserAccess")
    }
}

/// Parameters of `RetrieveFacsimile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacsimileRequest {
    pub data_series: ReportingDataSeriesName,
    pub reporting_period_end: String,
    pub id_type: FinancialInstitutionIdType,
    pub id: i64,
    pub format: FacsimileFormat,
}

impl Default for FacsimileRequest {
    fn default() -> Self {
        Self {
            data_series: ReportingDataSeriesName::Call,
            reporting_period_end: DEFAULT_REPORTING_PERIOD.to_string(),
            id_type: FinancialInstitutionIdType::IdRssd,
            id: DEFAULT_FI_ID,
            format: FacsimileFormat::Pdf,
        }
    }
}

impl FacsimileRequest {
    pub fn to_call(&self) -> RemoteCall {
        RemoteCall::new("RetrieveFacsimile")
            .param("dataSeries", self.data_series)
            .param("reportingPeriodEndDate", &self.reporting_period_end)
            .param("fiIDType", self.id_type)
            .param("fiID", self.id)
            .param("facsimileFormat", self.format)
    }
}

/// Parameters shared by `RetrieveFilersSinceDate` and
/// `RetrieveFilersSubmissionDateTime`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilersSinceRequest {
    pub data_series: ReportingDataSeriesName,
    pub reporting_period_end: String,
    /// Only filers updated on or after this date are listed
    pub last_update: String,
}

impl Default for FilersSinceRequest {
    fn default() -> Self {
        Self {
            data_series: ReportingDataSeriesName::Call,
            reporting_period_end: DEFAULT_REPORTING_PERIOD.to_string(),
            last_update: DEFAULT_REPORTING_PERIOD.to_string(),
        }
    }
}

impl FilersSinceRequest {
    fn to_call(&self, operation: &'static str) -> RemoteCall {
        RemoteCall::new(operation)
            .param("dataSeries", self.data_series)
            .param("reportingPeriodEndDate", &self.reporting_period_end)
            .param("lastUpdateDateTime", &self.last_update)
    }

    pub fn to_since_date_call(&self) -> RemoteCall {
        self.to_call("RetrieveFilersSinceDate")
    }

    pub fn to_submission_datetime_call(&self) -> RemoteCall {
        self.to_call("RetrieveFilersSubmissionDateTime")
    }
}

/// Parameters of `RetrievePanelOfReporters`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRequest {
    pub data_series: ReportingDataSeriesName,
    pub reporting_period_end: String,
}

impl Default for PanelRequest {
    fn default() -> Self {
        Self {
            data_series: ReportingDataSeriesName::Call,
            reporting_period_end: DEFAULT_REPORTING_PERIOD.to_string(),
        }
    }
}

impl PanelRequest {
    pub fn to_call(&self) -> RemoteCall {
        RemoteCall::new("RetrievePanelOfReporters")
            .param("dataSeries", self.data_series)
            .param("reportingPeriodEndDate", &self.reporting_period_end)
    }
}

/// Parameters of `RetrieveUBPRXBRLFacsimile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UbprFacsimileRequest {
    pub reporting_period_end: String,
    pub id_type: FinancialInstitutionIdType,
    pub id: i64,
}

impl Default for UbprFacsimileRequest {
    fn default() -> Self {
        Self {
            reporting_period_end: DEFAULT_REPORTING_PERIOD.to_string(),
            id_type: FinancialInstitutionIdType::IdRssd,
            id: DEFAULT_FI_ID,
        }
    }
}

impl UbprFacsimileRequest {
    pub fn to_call(&self) -> RemoteCall {
        RemoteCall::new("RetrieveUBPRXBRLFacsimile")
            .param("reportingPeriodEndDate", &self.reporting_period_end)
            .param("fiIDType", self.id_type)
            .param("fiID", self.id)
    }
}

/// An institution and the time of its latest submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilerSubmission {
    pub id_rssd: i64,
    /// Submission timestamp as reported by the service
    pub date_time: String,
}

impl FilerSubmission {
    fn from_element(element: &XmlElement) -> Result<Self, FfiecError> {
        Ok(Self {
            id_rssd: required_int(element, "ID_RSSD")?,
            date_time: element.child_text("DateTime").unwrap_or_default().to_string(),
        })
    }
}

/// A member of the panel of reporters for a reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingFinancialInstitution {
    pub id_rssd: i64,
    pub fdic_cert_number: Option<i64>,
    pub occ_chart_number: Option<i64>,
    pub ots_dock_number: Option<i64>,
    pub primary_aba_rout_number: Option<i64>,
    pub name: String,
    pub state: String,
    pub city: String,
    pub address: String,
    pub zip: String,
    pub filing_type: String,
    pub has_filed_for_reporting_period: bool,
}

impl ReportingFinancialInstitution {
    fn from_element(element: &XmlElement) -> Result<Self, FfiecError> {
        let text = |name: &str| element.child_text(name).unwrap_or_default().to_string();
        Ok(Self {
            id_rssd: required_int(element, "ID_RSSD")?,
            fdic_cert_number: optional_int(element, "FDICCertNumber")?,
            occ_chart_number: optional_int(element, "OCCChartNumber")?,
            ots_dock_number: optional_int(element, "OTSDockNumber")?,
            primary_aba_rout_number: optional_int(element, "PrimaryABARoutNumber")?,
            name: text("Name"),
            state: text("State"),
            city: text("City"),
            address: text("Address"),
            zip: text("ZIP"),
            filing_type: text("FilingType"),
            has_filed_for_reporting_period: match element.child_text("HasFiledForReportingPeriod") {
                Some(value) => parse_bool(value)?,
                None => false,
            },
        })
    }
}

fn parse_int(name: &str, value: &str) -> Result<i64, FfiecError> {
    value.trim().parse().map_err(|_| {
        FfiecError::UnexpectedResponse(format!("{} is not an integer: '{}'", name, value))
    })
}

fn required_int(element: &XmlElement, name: &str) -> Result<i64, FfiecError> {
    let value = element.child_text(name).ok_or_else(|| {
        FfiecError::UnexpectedResponse(format!("{} missing from {}", name, element.name))
    })?;
    parse_int(name, value)
}

/// Absent and empty elements both decode to `None`.
fn optional_int(element: &XmlElement, name: &str) -> Result<Option<i64>, FfiecError> {
    match element.child_text(name) {
        Some(value) if !value.trim().is_empty() => parse_int(name, value).map(Some),
        _ => Ok(None),
    }
}

fn parse_bool(value: &str) -> Result<bool, FfiecError> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(FfiecError::UnexpectedResponse(format!(
            "expected a boolean, got '{}'",
            other
        ))),
    }
}

/// Decode a `base64Binary` result.
pub fn decode_binary(result: &XmlElement) -> Result<Vec<u8>, FfiecError> {
    let compact: String = result.text.split_whitespace().collect();
    Ok(STANDARD.decode(compact)?)
}

/// Decode an `ArrayOfInt` result.
pub fn decode_int_array(result: &XmlElement) -> Result<Vec<i64>, FfiecError> {
    result
        .children_named("int")
        .map(|item| parse_int("int", &item.text))
        .collect()
}

/// Decode an `ArrayOfString` result.
pub fn decode_string_array(result: &XmlElement) -> Vec<String> {
    result
        .children_named("string")
        .map(|item| item.text.clone())
        .collect()
}

/// Decode a `boolean` result.
pub fn decode_bool(result: &XmlElement) -> Result<bool, FfiecError> {
    parse_bool(&result.text)
}

/// Decode an `ArrayOfRetrieveFilersDateTime` result.
pub fn decode_filer_submissions(result: &XmlElement) -> Result<Vec<FilerSubmission>, FfiecError> {
    result
        .children
        .iter()
        .map(FilerSubmission::from_element)
        .collect()
}

/// Decode an `ArrayOfReportingFinancialInstitution` result.
pub fn decode_panel(result: &XmlElement) -> Result<Vec<ReportingFinancialInstitution>, FfiecError> {
    result
        .children
        .iter()
        .map(ReportingFinancialInstitution::from_element)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, text: &str) -> XmlElement {
        XmlElement {
            name: name.to_string(),
            text: text.to_string(),
            children: Vec::new(),
        }
    }

    fn node(name: &str, children: Vec<XmlElement>) -> XmlElement {
        XmlElement {
            name: name.to_string(),
            text: String::new(),
            children,
        }
    }

    #[test]
    fn test_enum_tags() {
        assert_eq!(FinancialInstitutionIdType::IdRssd.as_str(), "ID_RSSD");
        assert_eq!(
            "OCCChartNumber".parse::<FinancialInstitutionIdType>().unwrap(),
            FinancialInstitutionIdType::OccChartNumber
        );
        assert_eq!("XBRL".parse::<FacsimileFormat>().unwrap(), FacsimileFormat::Xbrl);
        assert_eq!(ReportingDataSeriesName::Call.to_string(), "Call");
        assert!("pdf".parse::<FacsimileFormat>().is_err());
        assert!("Thrift".parse::<ReportingDataSeriesName>().is_err());
    }

    #[test]
    fn test_facsimile_call_defaults() {
        let call = FacsimileRequest::default().to_call();
        assert_eq!(call.operation(), "RetrieveFacsimile");
        assert_eq!(
            call.params(),
            &[
                ("dataSeries", "Call".to_string()),
                ("reportingPeriodEndDate", "3/31/2017".to_string()),
                ("fiIDType", "ID_RSSD".to_string()),
                ("fiID", "64150".to_string()),
                ("facsimileFormat", "PDF".to_string()),
            ]
        );
        assert_eq!(
            call.soap_action(),
            "http://cdr.ffiec.gov/public/services/RetrieveFacsimile"
        );
    }

    #[test]
    fn test_filers_calls_share_params() {
        let request = FilersSinceRequest {
            last_update: "4/15/2017".to_string(),
            ..Default::default()
        };
        let since = request.to_since_date_call();
        let submissions = request.to_submission_datetime_call();
        assert_eq!(since.operation(), "RetrieveFilersSinceDate");
        assert_eq!(submissions.operation(), "RetrieveFilersSubmissionDateTime");
        assert_eq!(since.params(), submissions.params());
        assert_eq!(since.params()[2], ("lastUpdateDateTime", "4/15/2017".to_string()));
    }

    #[test]
    fn test_parameterless_calls() {
        assert!(RemoteCall::test_user_access().params().is_empty());
        assert!(RemoteCall::retrieve_ubpr_reporting_periods().params().is_empty());
        assert_eq!(
            UbprFacsimileRequest::default().to_call().params().len(),
            3
        );
    }

    #[test]
    fn test_decode_binary_ignores_line_breaks() {
        let result = leaf("RetrieveFacsimileResult", "JVBERi0x\nLjQK");
        assert_eq!(decode_binary(&result).unwrap(), b"%PDF-1.4\n");
    }

    #[test]
    fn test_decode_binary_invalid() {
        let result = leaf("RetrieveFacsimileResult", "not base64!");
        assert!(matches!(decode_binary(&result), Err(FfiecError::Decode(_))));
    }

    #[test]
    fn test_decode_arrays() {
        let ints = node("Result", vec![leaf("int", "37"), leaf("int", "242")]);
        assert_eq!(decode_int_array(&ints).unwrap(), vec![37, 242]);

        let strings = node("Result", vec![leaf("string", "3/31/2017"), leaf("string", "12/31/2016")]);
        assert_eq!(decode_string_array(&strings), vec!["3/31/2017", "12/31/2016"]);

        assert!(decode_int_array(&node("Result", vec![])).unwrap().is_empty());
        assert!(decode_int_array(&node("Result", vec![leaf("int", "x")])).is_err());
    }

    #[test]
    fn test_decode_bool() {
        assert!(decode_bool(&leaf("TestUserAccessResult", "true")).unwrap());
        assert!(!decode_bool(&leaf("TestUserAccessResult", "false")).unwrap());
        assert!(decode_bool(&leaf("TestUserAccessResult", "yes")).is_err());
    }

    #[test]
    fn test_decode_filer_submissions() {
        let result = node(
            "Result",
            vec![node(
                "RetrieveFilersDateTime",
                vec![leaf("ID_RSSD", "37"), leaf("DateTime", "4/28/2017 9:12:03 AM")],
            )],
        );
        let filers = decode_filer_submissions(&result).unwrap();
        assert_eq!(
            filers,
            vec![FilerSubmission {
                id_rssd: 37,
                date_time: "4/28/2017 9:12:03 AM".to_string(),
            }]
        );
    }

    #[test]
    fn test_decode_panel() {
        let result = node(
            "Result",
            vec![node(
                "ReportingFinancialInstitution",
                vec![
                    leaf("ID_RSSD", "64150"),
                    leaf("FDICCertNumber", "8299"),
                    leaf("OCCChartNumber", "0"),
                    leaf("OTSDockNumber", ""),
                    leaf("Name", "WYOMING BANK & TRUST"),
                    leaf("State", "WY"),
                    leaf("City", "CHEYENNE"),
                    leaf("ZIP", "82001"),
                    leaf("FilingType", "041"),
                    leaf("HasFiledForReportingPeriod", "true"),
                ],
            )],
        );
        let panel = decode_panel(&result).unwrap();
        assert_eq!(panel.len(), 1);
        let bank = &panel[0];
        assert_eq!(bank.id_rssd, 64150);
        assert_eq!(bank.fdic_cert_number, Some(8299));
        assert_eq!(bank.occ_chart_number, Some(0));
        assert_eq!(bank.ots_dock_number, None);
        assert_eq!(bank.primary_aba_rout_number, None);
        assert_eq!(bank.name, "WYOMING BANK & TRUST");
        assert_eq!(bank.address, "");
        assert!(bank.has_filed_for_reporting_period);
    }

    #[test]
    fn test_decode_panel_requires_id() {
        let result = node(
            "Result",
            vec![node("ReportingFinancialInstitution", vec![leaf("Name", "X")])],
        );
        assert!(matches!(
            decode_panel(&result),
            Err(FfiecError::UnexpectedResponse(_))
        ));
    }
}
