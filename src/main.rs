//! cardmap: summary statistics and geo-clustering for marketplace shipment orders
//!
//! Reads a CSV of parsed, geocoded orders and writes four summary tables to
//! the output directory: aggregates by location, by country, by location
//! cluster (for map display), and grand totals.

use anyhow::{Context, Result};
use cardmap::{
    cluster_locations, data, groupby_country, groupby_location, load_orders, summarize, Args,
};
use clap::Parser;
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    if args.verbose {
        println!("cardmap - Order Summaries and Location Clustering");
        println!("=================================================\n");
    }

    run_pipeline(&args)
}

/// Run the full summary pipeline: load, aggregate, cluster, write.
///
/// All tables are computed before anything is written, so a validation
/// failure in any stage leaves the output directory untouched.
fn run_pipeline(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Load the parsed orders
    if args.verbose {
        println!("Step 1: Loading orders from: {}", args.orders);
    }
    let records = load_orders(&args.orders)?;
    println!("✓ Loaded {} orders", records.len());

    // Step 2: Aggregate by location, country and in total
    if args.verbose {
        println!("\nStep 2: Aggregating orders");
    }
    let by_location = groupby_location(&records, args.representative)?;
    let by_country = groupby_country(&records);
    let totals = summarize(&by_country);
    println!(
        "✓ Aggregated into {} locations across {} countries",
        by_location.len(),
        by_country.len()
    );

    // Step 3: Cluster nearby locations for the map
    if args.verbose {
        println!("\nStep 3: Clustering locations");
        println!("  Cut height: {} km", args.height);
    }
    let cluster_start = Instant::now();
    let location_clusters = cluster_locations(&by_location, args.height)?;
    println!("✓ Grouped locations into {} cluster rows", location_clusters.len());
    if args.verbose {
        println!("  Clustering time: {:.2}s", cluster_start.elapsed().as_secs_f64());
    }

    // Step 4: Write the summary tables
    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!("failed to create output directory '{}'", args.output_dir.display())
    })?;

    data::write_table(&args.output_dir.join("orders_by_location.csv"), &by_location)?;
    data::write_table(&args.output_dir.join("orders_by_country.csv"), &by_country)?;
    data::write_totals(&args.output_dir.join("orders_summary.csv"), &totals)?;
    data::write_table(
        &args.output_dir.join("orders_by_location_cluster.csv"),
        &location_clusters,
    )?;

    println!("\n✓ Summaries written to: {}", args.output_dir.display());
    if args.verbose {
        println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    }

    Ok(())
}
