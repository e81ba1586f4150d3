//! CDN Network Bench - command-line entry point

use cdn_network_bench::{
    app::App,
    cli::Cli,
    config::load_config,
    error::{AppError, ErrorReporter},
    logging::{ErrorEventLogger, LoggerFactory},
    transfer::CancelScope,
};
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();
    let use_color = cli.use_colors();
    let verbose = cli.verbose;

    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => exit_with(&e, use_color, verbose),
    };

    let scope = CancelScope::new();
    watch_signals(scope.clone());

    let loggers = LoggerFactory::new(config.clone());
    let error_logger = ErrorEventLogger::new(&loggers.create_logger("MAIN").await);
    let use_color = config.enable_color;
    let log_errors = config.debug || config.verbose;

    let result = match App::new(config).await {
        Ok(app) => app.run(&scope).await.map(|_| ()),
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        if log_errors {
            error_logger.log_error(&e, Some("session")).await;
        }
        exit_with(&e, use_color, verbose);
    }
}

fn exit_with(error: &AppError, use_color: bool, verbose: bool) -> ! {
    ErrorReporter::new(use_color, verbose).report_error(error);
    process::exit(error.exit_code());
}

/// Cancel the session on Ctrl-C, and on SIGTERM where it exists
fn watch_signals(scope: CancelScope) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        scope.cancel();
    });
}
