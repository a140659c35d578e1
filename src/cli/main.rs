//! Command-line front end for the accessibility map.
//!
//! Fetches facility markers around a point, keeps a refreshing marker
//! session, surveys all categories, and inspects the bundled stop and
//! cluster datasets.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use accessmap::config::Config;
use accessmap::datasets::{ClusterCatalog, StopDirectory};
use accessmap::location::{wait_for_location, FileLocation};
use accessmap::markers::{
    ManagerSettings, MapSession, MarkerSetManager, MarkerSnapshot, SessionCommand, Viewport,
};
use accessmap::overpass::{survey, FacilityGateway, GeoFilterQuery, OverpassClient};
use accessmap::{Annotation, Category, Coordinate, RadiusMultiplier};

#[derive(Parser, Debug)]
#[command(name = "accessmap")]
#[command(about = "Accessibility facility map backed by OpenStreetMap")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct CenterArgs {
    /// Center latitude (defaults to the configured center)
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Center longitude
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,
}

impl CenterArgs {
    fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.lat?, self.lon?))
    }

    fn resolve(&self, config: &Config) -> Result<Coordinate> {
        let center = self.coordinate().unwrap_or(config.view.default_center);
        if !center.is_valid() {
            anyhow::bail!("center {} is outside latitude/longitude bounds", center);
        }
        Ok(center)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one category once and print its markers as JSON
    Fetch {
        #[arg(long)]
        category: Category,

        #[command(flatten)]
        center: CenterArgs,

        /// Radius multiplier (0.5 - 2.0, step 0.5) applied to one mile
        #[arg(long)]
        multiplier: Option<f64>,
    },

    /// Keep categories on the map, refreshing periodically, until Ctrl-C
    Watch {
        /// Comma-separated categories
        #[arg(long, value_delimiter = ',', required = true)]
        categories: Vec<Category>,

        #[command(flatten)]
        center: CenterArgs,

        #[arg(long)]
        multiplier: Option<f64>,

        /// Override the refresh interval
        #[arg(long)]
        interval_secs: Option<u64>,

        /// File with the device's `lat,lon`; the map recenters once it appears
        #[arg(long)]
        location_file: Option<PathBuf>,
    },

    /// Fetch every category around a point and save the result
    Survey {
        #[command(flatten)]
        center: CenterArgs,

        /// Search radius in meters
        #[arg(long, default_value = "5000")]
        radius: f64,

        #[arg(short, long)]
        out: PathBuf,

        #[arg(long, default_value = "4")]
        concurrency: usize,
    },

    /// Nearest transit stops, or the detail sheet of one stop
    Stops {
        #[command(flatten)]
        center: CenterArgs,

        /// Show the detail sheet of this stop id
        #[arg(long)]
        stop: Option<String>,

        #[arg(long, default_value = "5")]
        limit: usize,

        /// Override the configured stops dataset
        #[arg(long)]
        stops_file: Option<PathBuf>,

        /// Override the configured connections dataset
        #[arg(long)]
        connections_file: Option<PathBuf>,
    },

    /// List cluster circles, optionally only those covering the center
    Clusters {
        #[command(flatten)]
        center: CenterArgs,

        /// Override the configured clusters dataset
        #[arg(long, conflicts_with = "rescore")]
        file: Option<PathBuf>,

        /// Clean and score raw cluster data instead of loading circles
        #[arg(long)]
        rescore: Option<PathBuf>,

        /// Save the rescored circles here
        #[arg(long, requires = "rescore")]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries JSON output
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Command::Fetch {
            category,
            center,
            multiplier,
        } => {
            let center = center.resolve(&config)?;
            let multiplier = radius_multiplier(multiplier, &config)?;
            run_fetch(&config, category, center, multiplier).await
        }
        Command::Watch {
            categories,
            center,
            multiplier,
            interval_secs,
            location_file,
        } => {
            let center = center.resolve(&config)?;
            let multiplier = radius_multiplier(multiplier, &config)?;
            let watch = WatchOptions {
                categories,
                center,
                multiplier,
                interval_secs,
                location_file,
            };
            run_watch(&config, watch).await
        }
        Command::Survey {
            center,
            radius,
            out,
            concurrency,
        } => {
            if radius <= 0.0 {
                anyhow::bail!("radius must be positive");
            }
            let center = center.resolve(&config)?;
            let client = OverpassClient::new(&config.overpass)?;
            let report = survey(&client, center, radius, concurrency).await;
            for key in report.failed_categories() {
                warn!("{} could not be surveyed", key);
            }
            info!("Collected {} facilities", report.total_elements());
            report.write_json(&out)
        }
        Command::Stops {
            center,
            stop,
            limit,
            stops_file,
            connections_file,
        } => {
            let stops_path = stops_file
                .or_else(|| config.datasets.stops.clone())
                .context("No stops dataset configured (use --stops-file)")?;
            let connections_path = connections_file.or_else(|| config.datasets.connections.clone());
            let directory = StopDirectory::load(&stops_path, connections_path.as_deref())?;
            let center = center.resolve(&config)?;

            match stop {
                Some(id) => {
                    let detail = directory
                        .detail(&id, Some(center))
                        .with_context(|| format!("Unknown stop '{}'", id))?;
                    print_json(&detail)
                }
                None => {
                    let nearest: Vec<serde_json::Value> = directory
                        .nearest(center, limit)
                        .into_iter()
                        .map(|(stop, distance)| {
                            serde_json::json!({ "stop": stop, "distance_meters": distance.round() })
                        })
                        .collect();
                    print_json(&nearest)
                }
            }
        }
        Command::Clusters {
            center,
            file,
            rescore,
            out,
        } => {
            let catalog = match rescore {
                Some(raw_path) => {
                    let catalog = ClusterCatalog::rescore_file(&raw_path)?;
                    if let Some(out) = out {
                        let file = std::fs::File::create(&out)
                            .with_context(|| format!("Failed to create {}", out.display()))?;
                        serde_json::to_writer_pretty(std::io::BufWriter::new(file), catalog.circles())?;
                        info!("Cleaned clusters written to {}", out.display());
                    }
                    catalog
                }
                None => {
                    let path = file
                        .or_else(|| config.datasets.clusters.clone())
                        .context("No clusters dataset configured (use --file)")?;
                    ClusterCatalog::load(&path)?
                }
            };

            let circles: Vec<_> = match center.coordinate() {
                Some(point) => catalog.containing(point),
                None => catalog.circles().iter().collect(),
            };
            let rows: Vec<serde_json::Value> = circles
                .into_iter()
                .map(|c| {
                    serde_json::json!({
                        "circle": c,
                        "color": c.hex_color(),
                    })
                })
                .collect();
            print_json(&rows)
        }
    }
}

fn radius_multiplier(arg: Option<f64>, config: &Config) -> Result<RadiusMultiplier> {
    match arg {
        Some(value) => Ok(RadiusMultiplier::new(value)?),
        None => Ok(config.view.radius_multiplier),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_fetch(
    config: &Config,
    category: Category,
    center: Coordinate,
    multiplier: RadiusMultiplier,
) -> Result<()> {
    let client = OverpassClient::new(&config.overpass)?;
    let query = GeoFilterQuery::with_multiplier(category, center, multiplier);

    info!(
        "Fetching {} around {} within {:.2}m",
        category, center, query.radius_meters
    );
    let records = client
        .fetch(&query)
        .await
        .with_context(|| format!("Failed to fetch {}", category))?;
    info!("Found {} {}", records.len(), category);

    let annotations: Vec<Annotation> = records.into_iter().map(Annotation::from).collect();
    print_json(&annotations)
}

struct WatchOptions {
    categories: Vec<Category>,
    center: Coordinate,
    multiplier: RadiusMultiplier,
    interval_secs: Option<u64>,
    location_file: Option<PathBuf>,
}

async fn run_watch(config: &Config, options: WatchOptions) -> Result<()> {
    let WatchOptions {
        categories,
        center,
        multiplier,
        interval_secs,
        location_file,
    } = options;

    let client = Arc::new(OverpassClient::new(&config.overpass)?);
    let viewport = Viewport::new(center, multiplier);
    let manager = MarkerSetManager::new(client, viewport, ManagerSettings::from(config));

    let interval = match interval_secs {
        Some(secs) => std::time::Duration::from_secs(secs.max(1)),
        None => config.refresh.interval(),
    };
    let (session, handle) = MapSession::new(manager, interval);
    let session_task = tokio::spawn(session.run());

    for category in categories {
        handle.toggle(category, true).await?;
    }

    if let Some(path) = location_file {
        let provider = FileLocation::new(path);
        let backoff = config.location.backoff();
        let locator = handle.clone();
        tokio::spawn(async move {
            match wait_for_location(&provider, backoff).await {
                Ok(location) => {
                    let _ = locator.send(SessionCommand::Recenter(location)).await;
                }
                Err(e) => warn!("{}; staying at {}", e, center),
            }
        });
    }

    let mut snapshots = handle.subscribe();
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print_summary(&snapshot);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                handle.shutdown().await?;
                break;
            }
        }
    }

    let last = session_task.await.context("Map session panicked")?;
    info!("{}", last.status);
    Ok(())
}

fn print_summary(snapshot: &MarkerSnapshot) {
    let counts: Vec<String> = snapshot
        .categories
        .iter()
        .map(|c| format!("{}={}", c.category.key(), c.count))
        .collect();
    println!(
        "[{}] {} | {} markers | {}",
        snapshot.taken_at.format("%H:%M:%S"),
        snapshot.status,
        snapshot.annotations.len(),
        counts.join(" ")
    );
}
