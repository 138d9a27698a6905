/// gkeops - GKE cluster inspection and authorized network tools
///
/// Lists clusters and node pools for a project location, and re-asserts a
/// cluster's master authorized network through the GKE v1 API.
mod auth;
mod config;
mod gke;
mod utils;

use anyhow::{Context, Result};
use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::Authenticator;
use crate::config::Settings;
use crate::gke::{
    AuthorizedNetworksPatcher, ClusterLister, GkeClient, Location, LocationPath, OperationWaiter,
};

#[derive(Parser, Debug)]
#[command(name = "gkeops")]
#[command(about = "Inspect GKE clusters and their authorized networks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// GKE API base URL (defaults to $GKEOPS_ENDPOINT or the public endpoint)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List clusters and their node pools
    List {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Set the first authorized network CIDR block of the first cluster as its only one
    CidrSet {
        #[command(flatten)]
        target: TargetArgs,

        /// Wait for the update operation to finish
        #[arg(long)]
        wait: bool,

        /// Seconds to wait for the update operation
        #[arg(long, default_value_t = 600, requires = "wait")]
        wait_timeout: u64,
    },
}

/// Project and location shared by every command
#[derive(Args, Debug)]
struct TargetArgs {
    /// Project ID
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    project: String,

    #[command(flatten)]
    location: LocationArgs,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct LocationArgs {
    /// Compute zone
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    zone: Option<String>,

    /// Cluster region
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    region: Option<String>,
}

impl TargetArgs {
    fn location_path(&self) -> Result<LocationPath> {
        let location = Location::from_parts(
            self.location.zone.as_deref(),
            self.location.region.as_deref(),
        )?;
        Ok(LocationPath::new(&self.project, location)?)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Results go to stdout, logs to stderr
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gkeops={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        Commands::List { target } => list_clusters(&cli, target).await,
        Commands::CidrSet {
            target,
            wait,
            wait_timeout,
        } => set_cidr(&cli, target, *wait, *wait_timeout).await,
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Authenticate with ambient credentials and build an API client
async fn connect(cli: &Cli) -> Result<GkeClient> {
    let settings = Settings::from_env(cli.endpoint.as_deref())?;

    let authenticator =
        Authenticator::discover(&settings.auth).context("Could not get authenticated client")?;
    let token = authenticator
        .access_token()
        .await
        .context("Could not get authenticated client")?;
    debug!("Access token expires at {:?}", token.expires_at);

    GkeClient::new(&token.token, settings.endpoint).context("Could not initialize GKE client")
}

/// List clusters and node pools
async fn list_clusters(cli: &Cli, target: &TargetArgs) -> Result<()> {
    let location = target.location_path()?;
    let client = connect(cli).await?;

    let mut stdout = std::io::stdout().lock();
    ClusterLister::new(client).run(&location, &mut stdout).await
}

/// Re-assert the first cluster's authorized network
async fn set_cidr(cli: &Cli, target: &TargetArgs, wait: bool, wait_timeout: u64) -> Result<()> {
    let location = target.location_path()?;
    let client = connect(cli).await?;

    let operation = {
        let mut stdout = std::io::stdout().lock();
        AuthorizedNetworksPatcher::new(client.clone())
            .run(&location, &mut stdout)
            .await?
    };

    if let (true, Some(operation)) = (wait, operation) {
        let done = OperationWaiter::new(client, wait_timeout, 5)
            .wait(&location, &operation)
            .await?;
        info!("✓ Operation {} finished", done.name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("gkeops").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_zone_target() {
        let cli = parse(&["list", "--project", "acme", "--zone", "us-central1-a"]).unwrap();
        let Commands::List { target } = cli.command else {
            panic!("expected list command");
        };

        assert_eq!(
            target.location_path().unwrap().parent(),
            "projects/acme/locations/us-central1-a"
        );
    }

    #[test]
    fn test_region_target_with_wait() {
        let cli = parse(&[
            "cidr-set",
            "--project",
            "acme",
            "--region",
            "us-central1",
            "--wait",
        ])
        .unwrap();
        let Commands::CidrSet {
            target,
            wait,
            wait_timeout,
        } = cli.command
        else {
            panic!("expected cidr-set command");
        };

        assert!(wait);
        assert_eq!(wait_timeout, 600);
        assert_eq!(
            target.location_path().unwrap().parent(),
            "projects/acme/locations/us-central1"
        );
    }

    #[test]
    fn test_missing_project() {
        let err = parse(&["list", "--zone", "us-central1-a"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_empty_project() {
        let err = parse(&["list", "--project", "", "--zone", "us-central1-a"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_zone_and_region_conflict() {
        let err = parse(&[
            "cidr-set",
            "--project",
            "acme",
            "--zone",
            "us-central1-a",
            "--region",
            "us-central1",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_location_required() {
        let err = parse(&["list", "--project", "acme"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_single_dash_long_flags_rejected() {
        let err = parse(&["list", "-project", "acme", "-zone", "us-central1-a"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_empty_zone_rejected() {
        let err = parse(&[
            "list",
            "--project",
            "acme",
            "--zone",
            "",
            "--region",
            "us-central1",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(err.exit_code(), 2);
    }
}
