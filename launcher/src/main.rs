use load_launcher::{Launch, Main};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, reload};

fn main() -> ExitCode {
    // RUST_LOG wins over -X
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_override = from_env.is_some();
    let filter = from_env.unwrap_or_else(|| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let launch = match Main::from_args(std::env::args().skip(1)) {
        Ok(launch) => launch,
        Err(e) => {
            error!("failed to start: {:#}", anyhow::Error::from(e));
            return ExitCode::FAILURE;
        }
    };

    let mut main = match launch {
        Launch::Run(main) => main,
        Launch::Exit { status, message } => {
            print!("{message}");
            return ExitCode::from(status);
        }
    };

    if !env_override {
        let level = main.options().log_level().to_string().to_lowercase();
        if let Err(e) = handle.reload(EnvFilter::new(level)) {
            error!("unable to set log level: {}", e);
        }
    }

    match main.execute() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("load failed: {:#}", anyhow::Error::from(e));
            ExitCode::FAILURE
        }
    }
}
