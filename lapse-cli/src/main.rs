//! Lapse CLI
//!
//! Command-line tool for exercising, inspecting, and benchmarking the Lapse TTL cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lapse_cache::{CacheConfig, ManualClock, Sweeper, TtlCache};

/// LAPSE - In-memory TTL cache
#[derive(Parser)]
#[command(name = "lapse")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON cache config (defaults plus LAPSE_* environment overrides otherwise)
    #[arg(long, global = true, env = "LAPSE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective cache configuration
    ShowConfig,

    /// Measure set, get, and prune throughput
    Bench {
        /// Number of entries to insert
        #[arg(short, long, default_value = "100000")]
        count: usize,
        /// TTL for every entry, in milliseconds
        #[arg(short, long, default_value = "1000")]
        ttl_ms: u64,
    },

    /// Watch a background sweeper drain a cache of staggered entries
    Demo {
        /// Number of entries to insert
        #[arg(short, long, default_value = "20")]
        keys: usize,
        /// TTL of the longest-lived entry, in milliseconds
        #[arg(short, long, default_value = "2000")]
        ttl_ms: u64,
        /// Sweep interval, in milliseconds
        #[arg(short, long, default_value = "250")]
        sweep_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "lapse=debug,info"
    } else {
        "lapse=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "Effective cache config");

    match cli.command {
        Commands::ShowConfig => cmd_config(&config),
        Commands::Bench { count, ttl_ms } => cmd_bench(config, count, ttl_ms),
        Commands::Demo { keys, ttl_ms, sweep_ms } => cmd_demo(config, keys, ttl_ms, sweep_ms).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<CacheConfig> {
    match path {
        Some(path) => CacheConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => CacheConfig::from_env().context("Invalid LAPSE_* environment override"),
    }
}

/// Print the effective configuration
fn cmd_config(config: &CacheConfig) -> Result<()> {
    println!("{}", "⚙️  Cache configuration:".cyan().bold());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Run the throughput benchmark
fn cmd_bench(config: CacheConfig, count: usize, ttl_ms: u64) -> Result<()> {
    println!("{} {} entries", "📊 Benchmarking with".cyan().bold(), count);

    let clock = ManualClock::new();
    let cache = TtlCache::with_clock(config.with_initial_capacity(count), clock.clone());
    let ttl = Duration::from_millis(ttl_ms);

    // Insert
    println!("\n{}", "1. Inserting...".dimmed());
    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );
    let start = Instant::now();
    for i in 0..count {
        cache.set_with_ttl(i, i, ttl);
        if i % 1024 == 0 {
            pb.set_position(i as u64);
        }
    }
    pb.finish();
    let set_time = start.elapsed();
    println!("   ✓ Inserted {} entries: {:?} ({})", count, set_time, rate(count, set_time));

    // Read back while fresh
    println!("\n{}", "2. Reading (fresh)...".dimmed());
    let start = Instant::now();
    let hits = (0..count).filter(|i| cache.get(i).is_some()).count();
    let get_time = start.elapsed();
    println!("   ✓ {} / {} hits: {:?} ({})", hits, count, get_time, rate(count, get_time));

    // Let everything expire, then read again
    clock.advance(ttl + Duration::from_millis(1));
    println!("\n{}", "3. Reading (expired)...".dimmed());
    let start = Instant::now();
    let stale_hits = (0..count).filter(|i| cache.get(i).is_some()).count();
    let miss_time = start.elapsed();
    println!("   ✓ {} / {} hits: {:?} ({})", stale_hits, count, miss_time, rate(count, miss_time));

    // Sweep
    println!("\n{}", "4. Pruning...".dimmed());
    let start = Instant::now();
    let removed = cache.prune();
    let prune_time = start.elapsed();
    println!("   ✓ Removed {} entries: {:?}", removed, prune_time);

    let stats = cache.stats();
    println!("\n{}", "✅ Results:".green().bold());
    println!("   {} {:.1}%", "Hit rate:".dimmed(), stats.hit_rate() * 100.0);
    println!("   {} {}", "Evictions:".dimmed(), stats.evictions);
    println!("   {} {}", "Remaining:".dimmed(), stats.total_entries);

    Ok(())
}

/// Run the live sweeper demo
async fn cmd_demo(config: CacheConfig, keys: usize, ttl_ms: u64, sweep_ms: u64) -> Result<()> {
    println!(
        "{} {} keys, longest TTL {}ms, sweep every {}ms",
        "⏳ Demo:".cyan().bold(),
        keys,
        ttl_ms,
        sweep_ms
    );

    let cache: Arc<TtlCache<String, usize>> = Arc::new(TtlCache::with_config(config));
    let keys = keys.max(1);
    for i in 0..keys {
        // Staggered so entries expire one after another
        let ttl = Duration::from_millis(ttl_ms * (i as u64 + 1) / keys as u64);
        cache.set_with_ttl(format!("key-{i}"), i, ttl);
    }

    let sweep = Duration::from_millis(sweep_ms);
    let handle = Sweeper::new(sweep)
        .context("Invalid sweep interval")?
        .spawn(Arc::clone(&cache))?;

    let started = Instant::now();
    let deadline = Duration::from_millis(ttl_ms) + sweep * 2;
    while !cache.is_empty() && started.elapsed() < deadline {
        tokio::time::sleep(sweep).await;
        let stats = cache.stats();
        println!(
            "   {:>6}ms  {} {:<4} {} {:<4}",
            started.elapsed().as_millis(),
            "live".green(),
            stats.valid_entries,
            "stale".yellow(),
            stats.expired_entries,
        );
    }

    let report = handle.stop().await.context("Sweeper did not shut down cleanly")?;
    println!("\n{}", "✅ Sweeper stopped:".green().bold());
    println!("   {} {}", "Sweeps:".dimmed(), report.sweeps);
    println!("   {} {}", "Evicted:".dimmed(), report.evicted);
    if !cache.is_empty() {
        println!("   {} {} entries left", "⚠️".yellow(), cache.len());
    }

    Ok(())
}

fn rate(count: usize, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return "n/a".into();
    }
    format!("{:.0} ops/s", count as f64 / secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_demo_args() {
        let cli = Cli::try_parse_from(["lapse", "-v", "demo", "--keys", "5", "--sweep-ms", "10"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Demo { keys, ttl_ms, sweep_ms } => {
                assert_eq!(keys, 5);
                assert_eq!(ttl_ms, 2000);
                assert_eq!(sweep_ms, 10);
            }
            _ => panic!("expected demo"),
        }
    }

    #[test]
    fn test_rate_formatting() {
        assert_eq!(rate(10, Duration::ZERO), "n/a");
        assert_eq!(rate(10, Duration::from_secs(2)), "5 ops/s");
    }

    #[test]
    fn test_bench_runs() {
        cmd_bench(CacheConfig::default(), 64, 10).unwrap();
    }

    #[tokio::test]
    async fn test_demo_drains_cache() {
        cmd_demo(CacheConfig::default(), 4, 20, 5).await.unwrap();
    }
}
