use clap::{Parser, Subcommand};
use dap_runtime::config::RuntimeConfig;
use dap_runtime::debugger::Debugger;
use dap_runtime::entity::Location;
use dap_runtime::session::Session;
use dap_runtime::transport::AdapterSpec;
use dap_runtime::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dap_runtime")]
#[command(about = "Headless Debug Adapter Protocol client runtime", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Spawn an adapter over stdio, set one breakpoint, launch, and
    /// report the first stop. A diagnostic harness around the library,
    /// not an editor integration.
    Run {
        /// Adapter executable to spawn.
        #[arg(long)]
        adapter: String,

        /// Arguments passed to the adapter process.
        #[arg(long, value_delimiter = ' ')]
        adapter_args: Vec<String>,

        /// `adapterID` reported in the `initialize` request.
        #[arg(long, default_value = "dap_runtime")]
        adapter_id: String,

        /// Program the adapter should launch, as a JSON `launch`
        /// arguments object.
        #[arg(long)]
        launch_args: String,

        /// `path:line` to set a breakpoint at before configuring done.
        #[arg(long)]
        breakpoint: Option<String>,

        /// Enable verbose logging.
        #[arg(short, long)]
        verbose: bool,

        /// Log level (trace, debug, info, warn, error).
        #[arg(long, default_value = "info")]
        log_level: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            adapter,
            adapter_args,
            adapter_id,
            launch_args,
            breakpoint,
            verbose,
            log_level,
        } => {
            let level = if verbose { "debug" } else { &log_level };
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();

            let launch_args: serde_json::Value = serde_json::from_str(&launch_args)
                .map_err(dap_runtime::Error::from)?;

            let debugger = Debugger::new();

            let mut initial_breakpoints = Vec::new();
            if let Some(spec) = &breakpoint {
                let (path, line) = spec
                    .rsplit_once(':')
                    .ok_or_else(|| {
                        dap_runtime::Error::ProtocolError(
                            "--breakpoint must be path:line".to_string(),
                        )
                    })?;
                let line: i64 = line.parse().map_err(|_| {
                    dap_runtime::Error::ProtocolError("breakpoint line must be an integer".to_string())
                })?;
                debugger
                    .add_breakpoint(Location::new(path, line, None))
                    .await?;
                initial_breakpoints.push((
                    dap_runtime::transport::types::Source {
                        name: None,
                        path: Some(path.to_string()),
                        source_reference: None,
                    },
                    vec![dap_runtime::transport::types::SourceBreakpoint {
                        line,
                        column: None,
                        condition: None,
                        hit_condition: None,
                        log_message: None,
                    }],
                ));
            }

            let session = Session::start(
                adapter_id,
                AdapterSpec::stdio(adapter, adapter_args),
                RuntimeConfig::default(),
                launch_args,
                false,
                initial_breakpoints,
                None,
            )
            .await?;

            let session_id = debugger.register_session(session).await;
            let session = debugger.session(session_id).await?;
            info!(state = ?session.state().await, "session started");
        }
    }

    Ok(())
}
