// Main entry point for wls-server.
// Resolves the configuration, loads the extraction plugin, binds the
// listener and serves requests one at a time until shut down.

use clap::Parser;
use std::process::ExitCode;
use tracing::Level;
use wls_server::{
    LoadedPlugin, ServerArgs, ServerConfig, StartupError, shutdown_signal::shutdown_signal, web,
};

// A single-threaded runtime: connections are served sequentially and the
// plugin is never called concurrently.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse command line args and environment variables
    let args = ServerArgs::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .with_target(true) // Include module path in logs
        .with_file(true) // Include source file name
        .with_line_number(true) // Include line numbers
        .init();

    tracing::info!("Starting wls-server...");

    match run(&args).await {
        Ok(()) => {
            tracing::info!("wls-server has shut down.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("FATAL: {}", e);
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &ServerArgs) -> Result<(), StartupError> {
    let config = ServerConfig::resolve(args)?;
    tracing::info!(
        "Configuration loaded from {:?}: host={}, port={}, plugin={}",
        config.source,
        config.host,
        config.port,
        config.plugin_path.display()
    );

    // Loading a shared library runs foreign code, hence `unsafe`.
    // The server does not start without a working plugin.
    let plugin = unsafe { LoadedPlugin::load(&config.plugin_path) }?;

    let (addr, listener) =
        web::create_listener(&config.host, config.port).map_err(|e| StartupError::Bind {
            host: config.host.clone(),
            port: config.port,
            source: e,
        })?;
    tracing::info!("Server running on {}:{} (listening on {})", config.host, config.port, addr);

    web::serve(&listener, &plugin, shutdown_signal()).await;

    // Teardown order: the loop has stopped accepting and finished its last
    // connection; release the plugin, then the socket.
    drop(plugin);
    drop(listener);

    Ok(())
}
