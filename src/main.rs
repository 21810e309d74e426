//! FFIEC CDR command-line client.
//!
//! Run with: `ffiec-cdr --username jdoe --password <token> facsimile --id 64150 -o report.pdf`

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use ffiec_cdr::config::{user_conf_path, ServiceConfig, USER_CONF_ENV};
use ffiec_cdr::service::DEFAULT_REPORTING_PERIOD;
use ffiec_cdr::{
    Credentials, FacsimileFormat, FacsimileOutput, FacsimileRequest, FfiecClient,
    FilersSinceRequest, FinancialInstitutionIdType, PanelRequest, ReportingDataSeriesName,
    UbprFacsimileRequest,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Retrieve reports and filer data from the FFIEC Central Data Repository.
///
/// Credentials given on the command line are saved to the credentials file
/// when it does not exist yet; later runs can omit them.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Web service user name
    #[arg(short, long, requires = "password")]
    username: Option<String>,

    /// Web service security token
    #[arg(short, long, requires = "username")]
    password: Option<String>,

    /// Credentials file (defaults to ~/.ffiec)
    #[arg(long, env = USER_CONF_ENV)]
    user_conf: Option<PathBuf>,

    /// Service settings file (YAML)
    #[arg(short, long, default_value = "ffiec.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retrieve a facsimile (RetrieveFacsimile)
    Facsimile {
        #[command(flatten)]
        institution: Institution,

        /// Facsimile format: PDF, XBRL or SDF
        #[arg(short, long, default_value = "PDF")]
        format: FacsimileFormat,

        /// Output file; the facsimile is written to stdout otherwise
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List filers updated since a date (RetrieveFilersSinceDate)
    FilersSince(FilersArgs),

    /// List filers with submission times (RetrieveFilersSubmissionDateTime)
    FilersSubmissions(FilersArgs),

    /// List the panel of reporters (RetrievePanelOfReporters)
    Panel {
        #[command(flatten)]
        period: Period,
    },

    /// List reporting period end dates (RetrieveReportingPeriods)
    Periods {
        #[arg(long, default_value = "Call")]
        data_series: ReportingDataSeriesName,
    },

    /// List UBPR reporting period end dates (RetrieveUBPRReportingPeriods)
    UbprPeriods,

    /// Retrieve a UBPR facsimile as XBRL (RetrieveUBPRXBRLFacsimile)
    UbprXbrl {
        #[command(flatten)]
        institution: Institution,

        /// Output file; the facsimile is written to stdout otherwise
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that the credentials are accepted (TestUserAccess)
    TestAccess,
}

#[derive(ClapArgs, Debug)]
struct Period {
    #[arg(long, default_value = "Call")]
    data_series: ReportingDataSeriesName,

    /// Reporting period end date (M/D/YYYY)
    #[arg(long, default_value = DEFAULT_REPORTING_PERIOD)]
    period: String,
}

#[derive(ClapArgs, Debug)]
struct Institution {
    /// Reporting period end date (M/D/YYYY)
    #[arg(long, default_value = DEFAULT_REPORTING_PERIOD)]
    period: String,

    /// Identifier type: ID_RSSD, FDICCertNumber, OCCChartNumber or OTSDockNumber
    #[arg(long, default_value = "ID_RSSD")]
    id_type: FinancialInstitutionIdType,

    /// Institution identifier
    #[arg(long, default_value_t = ffiec_cdr::service::DEFAULT_FI_ID)]
    id: i64,
}

#[derive(ClapArgs, Debug)]
struct FilersArgs {
    #[command(flatten)]
    period: Period,

    /// Only list filers updated on or after this date
    #[arg(long, default_value = DEFAULT_REPORTING_PERIOD)]
    since: String,
}

impl From<FilersArgs> for FilersSinceRequest {
    fn from(args: FilersArgs) -> Self {
        Self {
            data_series: args.period.data_series,
            reporting_period_end: args.period.period,
            last_update: args.since,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    // Load configuration
    let config = if args.config.exists() {
        let content =
            std::fs::read_to_string(&args.config).context("Failed to read config file")?;
        serde_yaml::from_str(&content).context("Failed to parse config file")?
    } else {
        ServiceConfig::default()
    };

    info!(wsdl = %config.wsdl, endpoint = %config.endpoint_url(), "Configuration loaded");

    let credentials = match (args.username, args.password) {
        (Some(username), Some(password)) => Some(Credentials::new(username, password)),
        _ => None,
    };
    let user_conf = args.user_conf.unwrap_or_else(user_conf_path);

    let client = FfiecClient::with_config(config, credentials, user_conf)
        .context("Failed to create client")?;

    match args.command {
        Command::Facsimile {
            institution,
            format,
            output,
        } => {
            let request = FacsimileRequest {
                data_series: ReportingDataSeriesName::Call,
                reporting_period_end: institution.period,
                id_type: institution.id_type,
                id: institution.id,
                format,
            };
            let facsimile = client.retrieve_facsimile(&request, &facsimile_output(output))?;
            write_stdout(facsimile)?;
        }
        Command::FilersSince(filers) => {
            print_yaml(&client.retrieve_filers_since_date(&filers.into())?)?;
        }
        Command::FilersSubmissions(filers) => {
            print_yaml(&client.retrieve_filers_submission_datetime(&filers.into())?)?;
        }
        Command::Panel { period } => {
            let request = PanelRequest {
                data_series: period.data_series,
                reporting_period_end: period.period,
            };
            print_yaml(&client.retrieve_panel_of_reporters(&request)?)?;
        }
        Command::Periods { data_series } => {
            print_yaml(&client.retrieve_reporting_periods(data_series)?)?;
        }
        Command::UbprPeriods => {
            print_yaml(&client.retrieve_ubpr_reporting_periods()?)?;
        }
        Command::UbprXbrl {
            institution,
            output,
        } => {
            let request = UbprFacsimileRequest {
                reporting_period_end: institution.period,
                id_type: institution.id_type,
                id: institution.id,
            };
            let facsimile =
                client.retrieve_ubpr_xbrl_facsimile(&request, &facsimile_output(output))?;
            write_stdout(facsimile)?;
        }
        Command::TestAccess => {
            let granted = client.test_user_access()?;
            println!("{}", granted);
            if !granted {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn facsimile_output(output: Option<PathBuf>) -> FacsimileOutput {
    match output {
        Some(path) => FacsimileOutput::to_file(path),
        None => FacsimileOutput::default(),
    }
}

fn write_stdout(facsimile: Option<Vec<u8>>) -> Result<()> {
    use std::io::Write;

    if let Some(bytes) = facsimile {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes).context("Failed to write facsimile")?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_yaml<T: Serialize>(value: &T) -> Result<()> {
    print!("{}", serde_yaml::to_string(value).context("Failed to render result")?);
    Ok(())
}
