//! Configuration and credential handling for the CDR client.
//!
//! Credentials live in a small INI file (`~/.ffiec` unless `FFIEC_USER_CONF`
//! points elsewhere):
//!
//! ```ini
//! [wsse]
//! username = jdoe
//! password = 0123abcd
//! ```
//!
//! Values are stored verbatim: no quoting or escaping is applied on either
//! side, so files written by other INI tools keep their exact tokens.

use crate::error::FfiecError;
use ini::{EscapePolicy, Ini, ParseOption, WriteOption};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Location of the retrieval service description.
pub const DEFAULT_WSDL: &str =
    "https://cdr.ffiec.gov/Public/PWS/WebServices/RetrievalService.asmx?WSDL";

/// Environment variable overriding the credentials file location.
pub const USER_CONF_ENV: &str = "FFIEC_USER_CONF";

/// File name of the credentials file in the home directory.
pub const DEFAULT_USER_CONF: &str = ".ffiec";

/// INI section holding the credentials.
pub const CONF_SECTION: &str = "wsse";

const USERNAME_KEY: &str = "username";
const PASSWORD_KEY: &str = "password";

/// Service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service description location
    pub wsdl: String,

    /// Endpoint override; derived from `wsdl` when unset
    pub endpoint: Option<String>,

    /// User-Agent sent with each request
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            wsdl: DEFAULT_WSDL.to_string(),
            endpoint: None,
            user_agent: format!("ffiec-cdr/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ServiceConfig {
    /// The URL requests are posted to: the explicit endpoint, or the WSDL
    /// location with its query string removed.
    pub fn endpoint_url(&self) -> String {
        match self.endpoint {
            Some(ref endpoint) => endpoint.clone(),
            None => self
                .wsdl
                .split_once('?')
                .map(|(base, _)| base)
                .unwrap_or(&self.wsdl)
                .to_string(),
        }
    }
}

/// WS-Security username token credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The security token issued for web service access.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl<U: Into<String>, P: Into<String>> From<(U, P)> for Credentials {
    fn from((username, password): (U, P)) -> Self {
        Self::new(username, password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resolve the credentials file path from an optional override and the
/// user's home directory. Falls back to the working directory when no home
/// directory is known.
pub fn resolve_user_conf_path(override_path: Option<OsString>, home: Option<PathBuf>) -> PathBuf {
    match override_path {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => home.unwrap_or_default().join(DEFAULT_USER_CONF),
    }
}

/// Credentials file path for this process: `$FFIEC_USER_CONF`, else `~/.ffiec`.
pub fn user_conf_path() -> PathBuf {
    resolve_user_conf_path(std::env::var_os(USER_CONF_ENV), dirs::home_dir())
}

/// Read credentials from an INI file.
///
/// Returns `Ok(None)` when the file does not exist. A file that exists but
/// cannot be read, does not parse, or lacks the section or keys is an error.
pub fn load_credentials(path: &Path) -> Result<Option<Credentials>, FfiecError> {
    if !path.exists() {
        return Ok(None);
    }

    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let conf = Ini::load_from_file_opt(path, options).map_err(|e| match e {
        ini::Error::Io(io) => FfiecError::Io(io),
        ini::Error::Parse(parse) => {
            FfiecError::Config(format!("{}: {}", path.display(), parse))
        }
    })?;

    let section = conf.section(Some(CONF_SECTION)).ok_or_else(|| {
        FfiecError::Config(format!(
            "{}: missing [{}] section",
            path.display(),
            CONF_SECTION
        ))
    })?;

    let get = |key: &str| {
        section.get(key).map(str::to_string).ok_or_else(|| {
            FfiecError::Config(format!(
                "{}: missing '{}' in [{}]",
                path.display(),
                key,
                CONF_SECTION
            ))
        })
    };

    let credentials = Credentials::new(get(USERNAME_KEY)?, get(PASSWORD_KEY)?);
    debug!(path = %path.display(), username = %credentials.username(), "Loaded credentials");
    Ok(Some(credentials))
}

/// Write credentials to an INI file, replacing any existing content.
///
/// On Unix a newly created file is readable by the owner only.
pub fn store_credentials(path: &Path, credentials: &Credentials) -> Result<(), FfiecError> {
    let mut conf = Ini::new();
    conf.with_section(Some(CONF_SECTION))
        .set(USERNAME_KEY, credentials.username())
        .set(PASSWORD_KEY, credentials.password());

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    conf.write_to_opt(
        &mut file,
        WriteOption {
            escape_policy: EscapePolicy::Nothing,
            kv_separator: " = ",
            ..WriteOption::default()
        },
    )?;
    Ok(())
}

/// Resolve the credentials a client runs with.
///
/// Explicit credentials win. Otherwise the file at `path` is consulted; when
/// that does not exist either, a warning is logged and `None` is returned,
/// leaving authentication to fail at the service. Known credentials are
/// written to `path` if no file exists there yet.
pub fn resolve_credentials(
    explicit: Option<Credentials>,
    path: &Path,
) -> Result<Option<Credentials>, FfiecError> {
    let credentials = match explicit {
        Some(credentials) => Some(credentials),
        None => load_credentials(path)?,
    };

    match credentials {
        Some(ref credentials) if !path.exists() => {
            store_credentials(path, credentials)?;
            info!(path = %path.display(), "Saved credentials");
        }
        Some(_) => {}
        None => {
            warn!(
                path = %path.display(),
                "No credentials given and no credentials file found; \
                 service calls will fail to authenticate"
            );
        }
    }

    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.wsdl, DEFAULT_WSDL);
        assert!(config.endpoint.is_none());
        assert_eq!(
            config.endpoint_url(),
            "https://cdr.ffiec.gov/Public/PWS/WebServices/RetrievalService.asmx"
        );
    }

    #[test]
    fn test_endpoint_override() {
        let config = ServiceConfig {
            endpoint: Some("http://127.0.0.1:8080/soap".to_string()),
            ..Default::default()
        };
        assert_eq!(config.endpoint_url(), "http://127.0.0.1:8080/soap");
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
endpoint: "http://localhost:9000/RetrievalService.asmx"
user_agent: "tests"
"#;
        let config: ServiceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.wsdl, DEFAULT_WSDL);
        assert_eq!(config.user_agent, "tests");
        assert_eq!(config.endpoint_url(), "http://localhost:9000/RetrievalService.asmx");
    }

    #[test]
    fn test_credentials_from_pair() {
        let creds = Credentials::from(("jdoe", "token"));
        assert_eq!(creds.username(), "jdoe");
        assert_eq!(creds.password(), "token");
        assert!(!format!("{:?}", creds).contains("token"));
    }

    #[test]
    fn test_resolve_path_prefers_override() {
        let path = resolve_user_conf_path(
            Some(OsString::from("/tmp/custom.conf")),
            Some(PathBuf::from("/home/jdoe")),
        );
        assert_eq!(path, PathBuf::from("/tmp/custom.conf"));
    }

    #[test]
    fn test_resolve_path_defaults_to_home() {
        let path = resolve_user_conf_path(None, Some(PathBuf::from("/home/jdoe")));
        assert_eq!(path, PathBuf::from("/home/jdoe/.ffiec"));

        let path = resolve_user_conf_path(Some(OsString::new()), Some(PathBuf::from("/home/jdoe")));
        assert_eq!(path, PathBuf::from("/home/jdoe/.ffiec"));

        let path = resolve_user_conf_path(None, None);
        assert_eq!(path, PathBuf::from(".ffiec"));
    }

    #[test]
    fn test_store_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf");
        let creds = Credentials::new("jdoe", "s3cr3t");

        store_credentials(&path, &creds).unwrap();
        let loaded = load_credentials(&path).unwrap();
        assert_eq!(loaded, Some(creds));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("[wsse]"));
        assert!(raw.contains("password = s3cr3t"));
    }

    #[test]
    fn test_load_configparser_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".ffiec");
        std::fs::write(&path, "[wsse]\nusername = jdoe\npassword = tok\n\n").unwrap();

        let creds = resolve_credentials(None, &path).unwrap();
        assert_eq!(creds, Some(Credentials::new("jdoe", "tok")));
    }

    #[test]
    fn test_tokens_stored_verbatim() {
        let dir = TempDir::new().unwrap();

        for token in ["\"quoted\"", "back\\slash", "'single'", "a\\nb"] {
            let path = dir.path().join("conf");
            let creds = Credentials::new("jdoe", token);
            store_credentials(&path, &creds).unwrap();

            let raw = std::fs::read_to_string(&path).unwrap();
            assert!(raw.contains(&format!("password = {}", token)), "{}", raw);
            assert_eq!(load_credentials(&path).unwrap(), Some(creds));
        }
    }

    #[test]
    fn test_load_does_not_unquote() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf");
        std::fs::write(&path, "[wsse]\nusername = jdoe\npassword = \"abc\"\\x\n").unwrap();

        let creds = load_credentials(&path).unwrap().unwrap();
        assert_eq!(creds.password(), "\"abc\"\\x");
    }

    #[cfg(unix)]
    #[test]
    fn test_stored_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf");
        store_credentials(&path, &Credentials::new("a", "b")).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(load_credentials(&dir.path().join("absent")).unwrap().is_none());
    }

    #[test]
    fn test_load_missing_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf");
        std::fs::write(&path, "[other]\nusername = x\npassword = y\n").unwrap();

        let err = load_credentials(&path).unwrap_err();
        assert!(matches!(err, FfiecError::Config(_)));
    }

    #[test]
    fn test_load_missing_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf");
        std::fs::write(&path, "[wsse]\nusername = x\n").unwrap();

        let err = load_credentials(&path).unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_resolve_explicit_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf");

        let creds = resolve_credentials(Some(("jdoe", "tok").into()), &path).unwrap();
        assert_eq!(creds, Some(Credentials::new("jdoe", "tok")));
        assert_eq!(load_credentials(&path).unwrap(), creds);
    }

    #[test]
    fn test_resolve_explicit_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf");
        store_credentials(&path, &Credentials::new("old", "old-token")).unwrap();

        let creds = resolve_credentials(Some(("new", "new-token").into()), &path).unwrap();
        assert_eq!(creds.as_ref().map(Credentials::username), Some("new"));
        assert_eq!(
            load_credentials(&path).unwrap(),
            Some(Credentials::new("old", "old-token"))
        );
    }

    #[test]
    fn test_resolve_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf");
        std::fs::write(&path, "[wsse]\nusername = filer\npassword = abc123\n").unwrap();

        let creds = resolve_credentials(None, &path).unwrap();
        assert_eq!(creds, Some(Credentials::new("filer", "abc123")));
    }

    #[test]
    fn test_resolve_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf");

        let creds = resolve_credentials(None, &path).unwrap();
        assert!(creds.is_none());
        assert!(!path.exists());
    }
}
