//! CLI entry point - the composition root.
//!
//! Parses arguments, bootstraps the context and dispatches to handlers.
//! Errors are printed once here and mapped to an exit code.

use clap::{CommandFactory, Parser};

use md2docx_cli::handlers::convert::{BatchArgs, ConvertArgs};
use md2docx_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers, init_logging};

#[tokio::main]
async fn main() {
    // Load environment variables before clap reads `env` fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::from_cli(&cli);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = bootstrap(config)?;

    match command {
        Commands::Serve => handlers::serve::execute(&ctx).await?,
        Commands::Convert {
            input,
            output_dir,
            output_name,
            template,
            no_template,
        } => {
            let args = ConvertArgs {
                input,
                output_dir,
                output_name,
                template,
                no_template,
            };
            handlers::convert::execute(&ctx, args).await?;
        }
        Commands::Batch {
            inputs,
            output_dir,
            template,
            no_template,
        } => {
            let args = BatchArgs {
                inputs,
                output_dir,
                template,
                no_template,
            };
            handlers::convert::batch(&ctx, args).await?;
        }
        Commands::Config { command } => handlers::config::execute(&ctx, command).await?,
        Commands::Health => handlers::health::execute(&ctx).await?,
        Commands::Settings { command } => handlers::settings::execute(&ctx, command)?,
    }

    Ok(())
}
