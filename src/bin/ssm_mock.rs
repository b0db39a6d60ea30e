use clap::Parser;
use confd_aws::mock::{serve_ssm, ParameterTable, DEFAULT_SSM_MOCK_ADDR};
use confd_aws::utils::logger;

#[derive(Debug, Parser)]
#[command(name = "ssm-mock")]
#[command(about = "In-memory AWS SSM Parameter Store mock for local testing")]
struct Args {
    #[arg(long, default_value = DEFAULT_SSM_MOCK_ADDR)]
    listen: String,

    /// Parameters to preload, as NAME=VALUE.
    #[arg(long = "seed", value_parser = parse_seed)]
    seeds: Vec<(String, String)>,

    #[arg(long, help = "Enable verbose output")]
    verbose: bool,
}

fn parse_seed(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let table = ParameterTable::new();
    for (name, value) in args.seeds {
        table.put(name, value).await;
    }

    serve_ssm(&args.listen, table).await?;
    Ok(())
}
