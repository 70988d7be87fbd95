use std::fs::{self, File};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod debounce;
mod domain;
mod inputter;
mod model;
mod source;
mod ui;

use controller::Controller;
use domain::{ListConfig, ListError, Message, Route, expand_path};
use model::{Model, Status};
use ui::ListUI;

/// Browse, search, filter and sort the user list served by a REST endpoint.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML config file, `~` and env vars are expanded
    #[arg(short, long)]
    config: Option<String>,

    /// Endpoint returning a JSON array of users
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Read users from a local JSON file instead of the endpoint
    #[arg(short, long)]
    file: Option<String>,

    /// Screen to open on start
    #[arg(short, long, value_enum)]
    route: Option<Route>,

    /// Request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log file, the terminal belongs to the UI
    #[arg(long)]
    log_file: Option<String>,

    /// Log level or filter directive, RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run() -> Result<(), ListError> {
    let args = Args::parse();
    let cfg = build_config(&args)?;
    init_logging(&cfg)?;
    info!("Starting userlist with {cfg:?}");

    let source = source::from_config(&cfg)?;
    let ui = ListUI::new(source.describe());
    let mut model = Model::init(&cfg, source);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &ui, &controller);
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    ui: &ListUI,
    controller: &Controller,
) -> Result<(), ListError> {
    let size = terminal.size()?;
    model.update(
        Some(Message::Resize(size.width as usize, size.height as usize)),
        Instant::now(),
    )?;
    model.update(
        Some(Message::Navigate(model.config().start_route)),
        Instant::now(),
    )?;

    while model.status != Status::Quitting {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(model)?;
        model.update(message, Instant::now())?;
    }

    info!("Quitting userlist");
    Ok(())
}

/// Defaults, then the config file, then command line flags.
fn build_config(args: &Args) -> Result<ListConfig, ListError> {
    let mut cfg = match &args.config {
        Some(path) => ListConfig::from_toml(&fs::read_to_string(expand_path(path)?)?)?,
        None => ListConfig::default(),
    };

    if let Some(endpoint) = &args.endpoint {
        cfg = cfg.endpoint(endpoint.as_str());
    }
    if let Some(file) = &args.file {
        cfg = cfg.data_file(expand_path(file)?);
    }
    if let Some(route) = args.route {
        cfg = cfg.start_route(route);
    }
    if let Some(timeout) = args.timeout_ms {
        cfg = cfg.request_timeout_ms(timeout);
    }
    if let Some(log_file) = &args.log_file {
        cfg = cfg.log_file(expand_path(log_file)?);
    }
    if let Some(level) = &args.log_level {
        cfg = cfg.log_level(level.as_str());
    }
    cfg.validate()
}

fn init_logging(cfg: &ListConfig) -> Result<(), ListError> {
    let file = File::create(&cfg.log_file)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .with(ErrorLayer::default())
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "userlist",
            "--endpoint",
            "http://10.0.0.5:5000/users",
            "--route",
            "edit",
            "--timeout-ms",
            "250",
        ]);
        let cfg = build_config(&args).unwrap();
        assert_eq!(cfg.endpoint, "http://10.0.0.5:5000/users");
        assert_eq!(cfg.start_route, Route::Edit);
        assert_eq!(cfg.request_timeout_ms, 250);
        assert_eq!(cfg.data_file, None);
    }

    #[test]
    fn flags_override_config_file() {
        let path = std::env::temp_dir().join(format!("userlist-{}.toml", std::process::id()));
        fs::write(
            &path,
            "endpoint = \"http://from-file/users\"\nlog_level = \"debug\"\n",
        )
        .unwrap();

        let args = Args::parse_from([
            "userlist",
            "--config",
            path.to_str().unwrap(),
            "--log-level",
            "trace",
        ]);
        let cfg = build_config(&args).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(cfg.endpoint, "http://from-file/users");
        assert_eq!(cfg.log_level, "trace");
    }

    #[test]
    fn data_file_flag_selects_file_source() {
        let args = Args::parse_from(["userlist", "--file", "tests/fixtures/users.json"]);
        let cfg = build_config(&args).unwrap();
        assert_eq!(cfg.data_file, Some(PathBuf::from("tests/fixtures/users.json")));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = Args::parse_from(["userlist", "--config", "/nonexistent/userlist.toml"]);
        assert!(matches!(build_config(&args), Err(ListError::Io(_))));
    }
}
