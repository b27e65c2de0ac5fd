use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use advisory_api::{BASE_URL_ENV, ClientOptions, VariableClient};
use advisory_tui::{WidgetDriver, WidgetError, WidgetView};
use advisory_types::{ConfigSource, InstanceProperties, WidgetStatus};
use advisory_util::attributes::{load_attributes_file, load_default_attributes};
use advisory_util::{expand_tilde, redact_sensitive};
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOG_PATH_ENV: &str = "ADVISORY_LOG_PATH";

/// Display and edit the desktop advisory message.
///
/// Without a subcommand the interactive terminal widget starts.
#[derive(Parser, Debug)]
#[command(name = "advisory", version, about)]
struct Cli {
    #[command(flatten)]
    host: HostArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Instance properties and client options supplied by the host.
#[derive(Args, Debug)]
struct HostArgs {
    /// Bearer token used to call the variable service
    #[arg(long, env = "ADVISORY_BEARER_TOKEN", hide_env_values = true, global = true)]
    bearer_token: Option<String>,

    /// Organization that owns the variable
    #[arg(long, env = "ADVISORY_ORGANIZATION_ID", global = true)]
    organization_id: Option<String>,

    /// Region code selecting the API endpoint (default us1)
    #[arg(long, env = "ADVISORY_DATA_CENTER", global = true)]
    data_center: Option<String>,

    /// Identifier of the variable holding the message
    #[arg(long, env = "ADVISORY_CAD_VAR_ID", global = true)]
    cad_var_id: Option<String>,

    /// "true" enables editing
    #[arg(long, env = "ADVISORY_CAN_EDIT", global = true)]
    can_edit: Option<String>,

    /// Attributes file (JSON object of string attributes)
    #[arg(long = "attributes", value_name = "PATH", global = true)]
    attributes: Option<PathBuf>,

    /// Replace the regional endpoint (localhost or *.cisco.com over https)
    #[arg(long, env = BASE_URL_ENV, global = true)]
    api_base: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 20, global = true)]
    request_timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the variable once and print the widget
    Show {
        /// Print the projection as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save a new message, then print the reconciled widget
    Set {
        message: String,

        /// Print the projection as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.command.is_none())?;

    let source = config_source(&cli.host)?;
    let api = Arc::new(client(&cli.host)?);

    let outcome = match cli.command {
        None => advisory_tui::run(api, source).await.map(|_| ExitCode::SUCCESS),
        Some(Command::Show { json }) => show(api, source, json).await,
        Some(Command::Set { message, json }) => set(api, source, &message, json).await,
    };
    if let Err(error) = &outcome {
        warn!(error = %redact_sensitive(&format!("{error:#}")), "advisory exited with an error");
    }
    outcome
}

/// Logs go to a file while the terminal UI owns the screen, to stderr
/// otherwise so stdout stays machine readable.
fn init_tracing(interactive: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if interactive {
        let path = log_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open log file {}", path.display()))?;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
    Ok(())
}

fn log_path() -> PathBuf {
    if let Ok(path) = std::env::var(LOG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }
    dirs_next::data_local_dir()
        .or_else(dirs_next::config_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("advisory")
        .join("advisory.log")
}

fn config_source(host: &HostArgs) -> Result<ConfigSource> {
    let properties = InstanceProperties {
        bearer_token: host.bearer_token.clone(),
        organization_id: host.organization_id.clone(),
        data_center: host.data_center.clone(),
        cad_var_id: host.cad_var_id.clone(),
        can_edit: host.can_edit.clone(),
    };
    let attributes = match host.attributes.as_deref() {
        Some(path) => load_attributes(path)?,
        None => load_default_attributes(),
    };
    let source = ConfigSource::new(properties, attributes);
    info!(config = ?source.resolve(), "configuration resolved");
    Ok(source)
}

fn load_attributes(path: &Path) -> Result<advisory_types::Attributes> {
    load_attributes_file(path).with_context(|| format!("load attributes from {}", path.display()))
}

fn client(host: &HostArgs) -> Result<VariableClient> {
    VariableClient::new(ClientOptions {
        base_url: host.api_base.clone().filter(|base| !base.trim().is_empty()),
        request_timeout: Duration::from_secs(host.request_timeout_secs),
    })
}

/// Activate, run one fetch cycle, print, deactivate.
async fn show(api: Arc<VariableClient>, source: ConfigSource, json: bool) -> Result<ExitCode> {
    let mut driver = WidgetDriver::new(api, source);
    driver.activate();
    driver.settle().await;
    let view = WidgetView::from_controller(driver.controller());
    driver.deactivate();

    print_view(&view, json)?;
    Ok(exit_code(&view))
}

/// Activate, save `message`, wait for the reconciling fetch, print.
async fn set(api: Arc<VariableClient>, source: ConfigSource, message: &str, json: bool) -> Result<ExitCode> {
    let mut driver = WidgetDriver::new(api, source);
    driver.activate();
    driver.settle().await;

    match driver.save(message) {
        Ok(()) => driver.settle().await,
        // Visible in the printed error line.
        Err(WidgetError::Validation(_) | WidgetError::Api(_)) => {}
        Err(WidgetError::EditNotAllowed) => {
            driver.deactivate();
            bail!("editing is disabled; pass --can-edit true or set canEdit in the attributes file");
        }
        Err(error) => {
            driver.deactivate();
            return Err(error.into());
        }
    }
    let view = WidgetView::from_controller(driver.controller());
    driver.deactivate();

    print_view(&view, json)?;
    Ok(exit_code(&view))
}

fn print_view(view: &WidgetView, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
    } else {
        println!("{}", view.to_text());
    }
    Ok(())
}

fn exit_code(view: &WidgetView) -> ExitCode {
    if view.status == WidgetStatus::Error { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
