use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use nhl_data_pull::api::{Endpoints, HttpApi};
use nhl_data_pull::config::Settings;
use nhl_data_pull::database_ops::Db;
use nhl_data_pull::logging::init_tracing;
use nhl_data_pull::util::env as env_util;
use nhl_data_pull::{ingest, PullContext};

#[derive(Parser, Debug)]
#[command(
    name = "nhl_data_pull",
    version,
    about = "Pull teams, rosters, season stats and draft picks from the NHL stats API into Postgres"
)]
struct Cli {
    /// Path to the TOML configuration file.
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_util::init_env();

    let settings = Settings::load(&cli.config)?;
    let general = &settings.general;
    let log_file = init_tracing(&general.log_filter, general.log_dir.as_deref())?;
    info!(
        config = %cli.config.display(),
        season = %settings.general.season,
        log_file = ?log_file,
        "starting nhl data pull"
    );

    let db = Db::connect(&settings.database).await?;
    let api = HttpApi::new(&settings.http).context("building http client")?;
    let endpoints = Endpoints::new(&settings.links, &settings.stats.year_by_year);
    let ctx = PullContext {
        store: &db,
        api: &api,
        endpoints: &endpoints,
        season: &settings.general.season,
        leagues: &settings.stats.leagues,
    };

    let result = ingest::run(&ctx, &settings).await;
    db.close().await;

    match result {
        Ok(summary) => {
            info!(%summary, "done");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "pull aborted");
            Err(err.into())
        }
    }
}
