#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for geoscope.
//!
//! Loads the geodata layers named by the environment (see
//! [`geoscope_config`]) and answers one query per invocation: bundles for
//! locations, surrounding scopes, street spans, or dataset filters.

mod input;
mod services;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use geoscope_config::Settings;
use geoscope_filter::{DatasetService as _, registry};
use geoscope_geography_models::{Bbl, SegmentId};
use geoscope_scope::{ScopeMode, SurroundingOptions, span::span, surrounding_blocking};

use crate::services::Services;

#[derive(Parser)]
#[command(name = "geoscope", about = "NYC parcel scope resolution")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve locations (parcel keys, `lon,lat` pairs, addresses, or
    /// intersections) into geo bundles
    Resolve {
        /// Locations to resolve
        #[arg(required = true)]
        locations: Vec<String>,
        /// Borough for address and intersection text
        #[arg(long, default_value = "Manhattan")]
        borough: String,
    },
    /// Print the surrounding scope of one or more parcels
    Surrounding {
        /// Seed parcel keys
        #[arg(required = true)]
        bbls: Vec<String>,
        /// Scope algorithm: radius, street, or span
        #[arg(long, default_value = "street")]
        mode: ScopeMode,
        /// Radius in feet (radius mode)
        #[arg(long)]
        radius_ft: Option<f64>,
        /// Fixed corridor buffer in feet, overriding the width policy
        #[arg(long)]
        buffer_ft: Option<f64>,
        /// Street name filter (span mode)
        #[arg(long)]
        street: Option<String>,
        /// Keep the seed parcels in the result
        #[arg(long)]
        include_self: bool,
    },
    /// Print the parcels along the street between two parcels
    Span {
        /// Starting parcel key
        from: String,
        /// Ending parcel key
        to: String,
        /// Only walk segments whose name contains this text
        #[arg(long)]
        street: Option<String>,
        /// Fixed corridor buffer in feet
        #[arg(long)]
        buffer_ft: Option<f64>,
        /// Nearest segments considered per endpoint
        #[arg(long)]
        candidates: Option<usize>,
        /// Keep the endpoint parcels in the result
        #[arg(long)]
        include_self: bool,
    },
    /// Build dataset filters for the parcels the locations resolve to
    Filters {
        /// Locations to resolve
        #[arg(required = true)]
        locations: Vec<String>,
        /// Borough for address and intersection text
        #[arg(long, default_value = "Manhattan")]
        borough: String,
        /// Comma-separated dataset ids or names (default: all)
        #[arg(long)]
        datasets: Option<String>,
        /// Fetch the filtered rows and report how many came back
        #[arg(long)]
        fetch: bool,
    },
    /// List configured datasets
    Datasets,
}

fn parse_bbls(values: &[String]) -> Result<Vec<Bbl>, Box<dyn std::error::Error>> {
    values
        .iter()
        .map(|value| value.parse::<Bbl>().map_err(Into::into))
        .collect()
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Datasets) {
        let datasets = registry::all_datasets();
        println!("{:<12} {:<10} NAME", "ID", "UNIT");
        println!("{}", "-".repeat(60));
        for dataset in &datasets {
            let unit = dataset
                .geo_unit
                .map_or_else(|| "-".to_string(), |unit| unit.to_string());
            println!("{:<12} {unit:<10} {}", dataset.id, dataset.name);
        }
        return Ok(());
    }

    let settings = Settings::load()?;
    let services = Services::load(settings).await?;
    let workers = services.settings.workers;

    match cli.command {
        Commands::Datasets => {}
        Commands::Resolve { locations, borough } => {
            let bundles =
                input::resolve_all(&services.bundles, &locations, &borough, workers).await;
            print_json(&bundles)?;
            let stats = services.bundles.cache_stats();
            log::debug!(
                "Bundle cache: {} hits, {} misses, {}/{} entries",
                stats.hits,
                stats.misses,
                stats.size,
                stats.capacity
            );
        }
        Commands::Surrounding {
            bbls,
            mode,
            radius_ft,
            buffer_ft,
            street,
            include_self,
        } => {
            let options = SurroundingOptions {
                mode,
                radius_ft,
                buffer_ft,
                include_self,
                street,
                ..SurroundingOptions::default()
            };
            let index = Arc::clone(services.bundles.resolver().index_handle());
            let keys = surrounding_blocking(index, parse_bbls(&bbls)?, options).await?;
            for key in &keys {
                println!("{key}");
            }
            log::info!("{} parcels in scope", keys.len());
        }
        Commands::Span {
            from,
            to,
            street,
            buffer_ft,
            candidates,
            include_self,
        } => {
            let mut options = SurroundingOptions::span(street.as_deref());
            options.buffer_ft = buffer_ft;
            options.include_self = include_self;
            if let Some(candidates) = candidates {
                options = options.with_candidates(candidates);
            }
            let from: Bbl = from.parse()?;
            let to: Bbl = to.parse()?;
            let index = Arc::clone(services.bundles.resolver().index_handle());
            let scope =
                tokio::task::spawn_blocking(move || span(&index, &from, &to, &options)).await?;

            match scope.tier {
                Some(tier) => println!("tier: {tier}"),
                None => println!("tier: none"),
            }
            let segments: Vec<&str> = scope.segments.iter().map(SegmentId::as_str).collect();
            println!("segments: {}", segments.join(", "));
            for key in &scope.parcels {
                println!("{key}");
            }
        }
        Commands::Filters {
            locations,
            borough,
            datasets,
            fetch,
        } => {
            let configs = match datasets {
                Some(list) => list
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(registry::find_dataset)
                    .collect::<Result<Vec<_>, _>>()?,
                None => registry::all_datasets(),
            };

            let bundles =
                input::resolve_all(&services.bundles, &locations, &borough, workers).await;
            let seeds = geoscope_bundle::seeds(&bundles);
            log::info!("{} locations gave {} seed parcels", locations.len(), seeds.len());

            let filters = services.filters.build_all(&configs, &seeds);
            print_json(&filters)?;

            if fetch {
                let client = services.socrata()?;
                for (config, filter) in configs.iter().zip(&filters) {
                    match client.fetch_filtered(filter).await {
                        Ok(rows) => {
                            println!("{:<12} {:>6} rows ({})", config.id, rows.len(), filter.kind);
                        }
                        Err(e) => log::warn!("{}: fetch failed: {e}", config.name),
                    }
                }
            }
        }
    }

    Ok(())
}
