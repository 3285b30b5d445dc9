use clap::Parser;
use eyre::Result;
use migrate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .init();

    let paths = cli.paths();
    cli.command.run(&paths).await?;

    Ok(())
}
