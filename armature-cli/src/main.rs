use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod echo;

use armature_core::CancellationToken;
use armature_tools::ToolsConfig;
use commands::{CallOptions, CliError};

#[derive(Parser, Debug)]
#[command(name = "armature", version)]
#[command(about = "Armature CLI - discover and call agent tools")]
struct Cli {
    /// Tool configuration file (TOML)
    #[arg(long, global = true, default_value = "armature.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tool registry operations
    Tools {
        #[command(subcommand)]
        tools_command: ToolsCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ToolsCommands {
    /// List the tools every configured source provides
    List {
        /// Include tools marked internal
        #[arg(long)]
        all: bool,
    },
    /// Execute one tool
    Call {
        /// Tool name
        name: String,
        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
        /// Print output as it streams, if the tool supports it
        #[arg(long)]
        stream: bool,
        /// Print Prometheus metrics after the call
        #[arg(long)]
        metrics: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match ToolsConfig::load_from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = armature_observability::init_tracing(&config.observability) {
        eprintln!("Warning: {}", e);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, cancelling");
                on_signal.cancel();
            }
        });

        match run(cli.command, &config, &cancel).await {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(error = %e, "Command failed");
                eprintln!("Error: {}", e);
                1
            }
        }
    });
    std::process::exit(code);
}

async fn run(
    command: Commands,
    config: &ToolsConfig,
    cancel: &CancellationToken,
) -> Result<i32, CliError> {
    match command {
        Commands::Tools { tools_command } => match tools_command {
            ToolsCommands::List { all } => {
                let registry = commands::build_registry(config, false, cancel).await?;
                print!("{}", commands::render_tools(&registry, !all).await);
                Ok(0)
            }
            ToolsCommands::Call {
                name,
                args,
                stream,
                metrics,
            } => {
                let registry = commands::build_registry(config, metrics, cancel).await?;
                let options = CallOptions {
                    args: commands::parse_args(&args)?,
                    stream,
                };
                let mut stdout = commands::StdoutSink::default();
                let result =
                    commands::call_tool(&registry, &name, options, cancel, &mut stdout).await?;

                if stdout.printed() {
                    println!();
                } else if result.success {
                    println!("{}", result.content);
                }
                if !result.success {
                    eprintln!("Tool failed: {}", result.error);
                }
                if let Some(metrics) = registry.metrics() {
                    print!("{}", metrics.gather()?);
                }
                Ok(if result.success { 0 } else { 1 })
            }
        },
    }
}
