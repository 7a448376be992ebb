use anyhow::Result;
use clap::Parser;
use forgepack_cli::Cli;
use forgepack_core::{CommandArgs, Service};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let args = CommandArgs::parse(cli.tokens());
    // leading flags (`forgepack --help`) are not command names
    let command = args.positionals.first().cloned();

    let mut service = Service::new(std::env::current_dir()?)?;
    service.run(command.as_deref(), &args)?;
    Ok(())
}
