//! SpeedField CLI - car speed field estimation for street networks

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use speedfield_algorithms::field::{FieldParams, SpatialField};
use speedfield_algorithms::network::{
    apply_to_edges, load_features, AcceptancePolicy, SpeedAttributes, SpeedEdge, KMH_PER_MS,
};
use speedfield_core::io::{read_geojson, write_geojson};
use speedfield_core::vector::geometry_kind;
use speedfield_core::{AttributeValue, Envelope, FeatureCollection};

use geo_types::{Geometry, LineString};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "speedfield")]
#[command(author, version, about = "Directional car speed field for street networks", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a GeoJSON file
    Info {
        /// Input GeoJSON file
        input: PathBuf,
    },
    /// Build a speed field from measured samples and apply it to a network
    Estimate {
        /// GeoJSON with measured speed lines
        samples: PathBuf,
        /// GeoJSON street network (LineString features)
        network: PathBuf,
        /// Output GeoJSON file
        output: PathBuf,
        /// Reference latitude in degrees [default: center of the network]
        #[arg(long)]
        center_lat: Option<f64>,
        /// Sample radius in meters
        #[arg(long, default_value = "50.0")]
        radius: f64,
        /// Speed attribute of the samples
        #[arg(long, default_value = "speed")]
        speed_attr: String,
        /// Direction attribute of the samples (1 forward, -1 reverse, else both)
        #[arg(long, default_value = "direction")]
        direction_attr: String,
        /// Ignore sample directions and treat every sample as two-way
        #[arg(long)]
        two_way: bool,
        /// Speeds (samples, priors and output) are in m/s instead of km/h
        #[arg(long)]
        mps: bool,
        /// Network attribute holding the current speed
        #[arg(long, default_value = "maxspeed")]
        prior_attr: String,
        /// Current speed for network edges without a prior attribute
        #[arg(long, default_value = "50.0")]
        default_speed: f64,
        /// Network attribute receiving the estimated speed
        #[arg(long, default_value = "car_speed")]
        output_attr: String,
        /// Reject estimates above this multiple of the current speed
        #[arg(long, default_value = "1.2")]
        max_ratio: f64,
        /// Accept every estimate
        #[arg(long)]
        no_clamp: bool,
    },
}

// ─── Network edges ──────────────────────────────────────────────────────

/// A street edge backed by a network feature
struct NetworkEdge {
    feature: usize,
    line: LineString<f64>,
    speed: f64,
}

impl SpeedEdge for NetworkEdge {
    fn geometry(&self) -> &LineString<f64> {
        &self.line
    }

    fn current_speed(&self) -> f64 {
        self.speed
    }

    fn set_current_speed(&mut self, speed: f64) {
        self.speed = speed;
    }
}

/// Collect LineString edges with their current speed in m/s
fn network_edges(network: &FeatureCollection, prior_attr: &str, default_mps: f64, unit: f64) -> Vec<NetworkEdge> {
    let mut edges = Vec::with_capacity(network.len());
    let mut skipped = 0usize;
    for (i, feature) in network.iter().enumerate() {
        let line = match &feature.geometry {
            Some(Geometry::LineString(ls)) if ls.0.len() >= 2 => ls.clone(),
            _ => {
                skipped += 1;
                continue;
            }
        };
        let speed = feature
            .get_property(prior_attr)
            .and_then(AttributeValue::as_f64)
            .map(|v| v / unit)
            .unwrap_or(default_mps);
        edges.push(NetworkEdge { feature: i, line, speed });
    }
    if skipped > 0 {
        warn!("Skipped {} network features without a LineString geometry", skipped);
    }
    edges
}

/// Envelope of every edge, in degrees
fn network_envelope(edges: &[NetworkEdge]) -> Option<Envelope> {
    edges
        .iter()
        .filter_map(|e| Envelope::of_line(&e.line))
        .reduce(Envelope::merge)
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_features(path: &Path) -> Result<FeatureCollection> {
    let pb = spinner("Reading features...");
    let features = read_geojson(path).with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    Ok(features)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let features = read_features(&input)?;

            let mut kinds: BTreeMap<&'static str, usize> = BTreeMap::new();
            let mut attributes: BTreeMap<&str, usize> = BTreeMap::new();
            for f in features.iter() {
                *kinds.entry(f.geometry.as_ref().map_or("None", geometry_kind)).or_default() += 1;
                for key in f.properties.keys() {
                    *attributes.entry(key.as_str()).or_default() += 1;
                }
            }

            println!("File: {}", input.display());
            println!("Features: {}", features.len());
            println!("\nGeometries:");
            for (kind, count) in &kinds {
                println!("  {}: {}", kind, count);
            }
            println!("\nAttributes:");
            for (name, count) in &attributes {
                println!("  {}: {} features", name, count);
            }
        }

        Commands::Estimate {
            samples,
            network,
            output,
            center_lat,
            radius,
            speed_attr,
            direction_attr,
            two_way,
            mps,
            prior_attr,
            default_speed,
            output_attr,
            max_ratio,
            no_clamp,
        } => {
            let unit = if mps { 1.0 } else { KMH_PER_MS };
            if !(max_ratio.is_finite() && max_ratio > 0.0) {
                bail!("--max-ratio must be a positive number, got {}", max_ratio);
            }

            let sample_features = read_features(&samples)?;
            let mut network_features = read_features(&network)?;
            let mut edges = network_edges(&network_features, &prior_attr, default_speed / unit, unit);

            let latitude = match center_lat {
                Some(lat) => lat,
                None => network_envelope(&edges)
                    .map(|e| e.center().1)
                    .context("Network has no usable edges; pass --center-lat")?,
            };
            info!("Reference latitude: {:.5}", latitude);

            let start = Instant::now();
            let mut field = SpatialField::new(FieldParams::centered_at(latitude, radius))
                .context("Invalid field parameters")?;

            let attrs = SpeedAttributes {
                speed: speed_attr,
                direction: if two_way { None } else { Some(direction_attr) },
                speed_in_kmh: !mps,
            };
            let pb = spinner("Building speed field...");
            let loaded = load_features(&mut field, sample_features.iter(), &attrs);
            pb.finish_and_clear();
            if loaded.loaded == 0 {
                warn!("No usable speed samples in {}", samples.display());
            }

            let policy = if no_clamp {
                AcceptancePolicy::accept_all()
            } else {
                AcceptancePolicy { max_ratio: Some(max_ratio) }
            };
            let pb = spinner("Estimating speeds...");
            let report = apply_to_edges(&field, &mut edges, &policy);
            pb.finish_and_clear();

            for edge in &edges {
                if let Some(feature) = network_features.features.get_mut(edge.feature) {
                    feature.set_property(output_attr.clone(), AttributeValue::Float(edge.speed * unit));
                }
            }
            let elapsed = start.elapsed();

            let pb = spinner("Writing output...");
            write_geojson(&network_features, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            pb.finish_and_clear();

            println!(
                "Samples: {} from {} features; edges: {} set, {} no speed, {} clamped",
                field.len(),
                loaded.loaded,
                report.set,
                report.no_speed,
                report.clamped
            );
            done("Speed estimates", &output, elapsed);
        }
    }

    Ok(())
}
