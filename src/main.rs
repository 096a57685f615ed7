use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use clickseries::config;
use clickseries::query_planner::{Cluster, PlanningContext};
use clickseries::table_catalog::{
    CatalogConfig, ClickHouseMetadataSource, MetadataSource, SqlTypeFactory, TableSeed,
    TimeSeriesSchema, TimeSeriesTable,
};
use dotenvy::dotenv;
use serde::Serialize;

/// ClickSeries - time-series tables over ClickHouse for relational planners
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// ClickHouse HTTP endpoint
    #[arg(long, env = "CLICKHOUSE_URL", default_value = "http://localhost:8123")]
    url: String,

    #[arg(long, env = "CLICKHOUSE_USER")]
    user: Option<String>,

    #[arg(long, env = "CLICKHOUSE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Database whose tables are exposed as data sources
    #[arg(long, env = "CLICKHOUSE_DATABASE", default_value = "default")]
    database: String,

    /// YAML catalog with pre-seeded tables
    #[arg(long, env = "CLICKSERIES_CATALOG")]
    catalog: Option<String>,

    /// Timestamp column for tables not listed in the catalog
    #[arg(long, env = "CLICKSERIES_TIMESTAMP_COLUMN", default_value = "__time")]
    timestamp_column: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the tables of the schema
    List {
        /// Also register every table found in the database
        #[arg(long)]
        discover: bool,
    },
    /// Describe one table and print its translated scan plan
    Describe {
        table: String,
        /// Print the description as JSON
        #[arg(long)]
        json: bool,
    },
}

impl From<&Cli> for config::CliConfig {
    fn from(cli: &Cli) -> Self {
        config::CliConfig {
            clickhouse_url: cli.url.clone(),
            clickhouse_user: cli.user.clone(),
            clickhouse_password: cli.password.clone(),
            database: cli.database.clone(),
            catalog_file: cli.catalog.clone(),
            timestamp_column: cli.timestamp_column.clone(),
        }
    }
}

#[derive(Serialize)]
struct TableDescription<'a> {
    table: &'a str,
    timestamp_column: &'a str,
    metrics: Vec<&'a str>,
    intervals: Vec<String>,
    row_type: clickseries::table_catalog::RowType,
    plan: String,
}

async fn load_schema(
    config: &config::AppConfig,
    source: Arc<dyn MetadataSource>,
) -> anyhow::Result<Arc<TimeSeriesSchema>> {
    match &config.catalog_file {
        Some(path) => {
            let catalog = CatalogConfig::from_yaml_file(path)
                .with_context(|| format!("loading catalog {}", path))?;
            Ok(TimeSeriesSchema::from_config(&catalog, Some(source)).await?)
        }
        None => Ok(TimeSeriesSchema::new(config.database.clone(), Some(source))),
    }
}

async fn table_or_discover(
    schema: &Arc<TimeSeriesSchema>,
    config: &config::AppConfig,
    name: &str,
) -> anyhow::Result<Arc<TimeSeriesTable>> {
    if let Some(table) = schema.table(name) {
        return Ok(table);
    }
    log::info!("Table `{}` not in catalog, discovering it", name);
    let seed = TableSeed {
        timestamp_column: Some(config.timestamp_column.clone()),
        discover: true,
        ..TableSeed::default()
    };
    Ok(schema.add_table(name, seed).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = config::AppConfig::from_cli(config::CliConfig::from(&cli))
        .context("invalid configuration")?;

    let source: Arc<dyn MetadataSource> = Arc::new(ClickHouseMetadataSource::new(
        config.clickhouse_client(),
        config.database.clone(),
    ));
    let schema = load_schema(&config, source).await?;

    match cli.command {
        Command::List { discover } => {
            if discover || config.catalog_file.is_none() {
                schema
                    .discover(Some(config.timestamp_column.as_str()))
                    .await?;
            }
            for name in schema.table_names() {
                println!("{}", name);
            }
        }
        Command::Describe { table, json } => {
            let time_series_table = table_or_discover(&schema, &config, &table).await?;

            let factory = Arc::new(SqlTypeFactory::new());
            let cluster = Cluster::new(factory);
            let handle = schema.table_handle(&table, cluster.type_factory())?;
            let plan = time_series_table.to_rel(&PlanningContext::new(cluster), &handle);

            let description = TableDescription {
                table: handle.name(),
                timestamp_column: time_series_table.timestamp_field_name(),
                metrics: time_series_table
                    .metric_field_names()
                    .iter()
                    .map(String::as_str)
                    .collect(),
                intervals: time_series_table
                    .intervals()
                    .iter()
                    .map(|i| i.to_string())
                    .collect(),
                row_type: handle.row_type().clone(),
                plan: plan.to_string(),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&description)?);
            } else {
                println!("Table:     {}", description.table);
                println!("Row type:  {}", description.row_type);
                println!("Timestamp: {}", description.timestamp_column);
                println!("Metrics:   {}", description.metrics.join(", "));
                println!("Intervals: {}", description.intervals.join(", "));
                println!("\n{}", description.plan);
            }
        }
    }

    Ok(())
}
