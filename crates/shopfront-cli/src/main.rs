//! Shopfront migration CLI
//!
//! Operational surface for the store-migration layer:
//! - inspecting phase routing (`phase`)
//! - sampling consistency between the two stores (`verify`)
//! - reading and clearing the replication error log (`errors`)
//! - store statistics (`stats`)
//! - a guided end-to-end migration walkthrough (`demo`)
//!
//! The storage engines are in-process, so every command runs against a
//! freshly seeded sample catalog rather than a long-lived deployment.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use shopfront_core::entity::EntityKind;
use shopfront_core::page::PageRequest;
use shopfront_core::repository::{ProductRepository, Repository};
use shopfront_migration::{ConsistencyReport, MigrationPhase, MigrationRouter, Statistics};

mod seed;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(
    author,
    version,
    about = "Shopfront: phased document-to-wide-column store migration"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how reads and writes are routed under a phase.
    Phase {
        /// Phase name; omit to list all phases.
        name: Option<String>,
    },

    /// Sample both stores and report discrepancies.
    Verify {
        /// Records to compare per kind; 0 compares everything.
        #[arg(long, default_value_t = 10)]
        sample: u32,
        /// Restrict to one entity kind (product, order, user, category).
        #[arg(long)]
        kind: Option<String>,
        /// Skew the document store first to force discrepancies.
        #[arg(long)]
        drift: bool,
    },

    /// Provoke a replication failure and dump the error log.
    Errors,

    /// Store counts and error totals under a phase.
    Stats {
        /// Phase to run the seeded catalog under.
        #[arg(long, default_value = "DUAL_WRITE_DOCUMENT_PRIMARY")]
        phase: String,
    },

    /// Walk the full migration: dual-write, verify, flip primary, cut over.
    Demo {
        #[arg(long, default_value_t = 0)]
        sample: u32,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Phase { name } => cmd_phase(name.as_deref()).await,
        Commands::Verify {
            sample,
            kind,
            drift,
        } => cmd_verify(sample, kind.as_deref(), drift).await,
        Commands::Errors => cmd_errors().await,
        Commands::Stats { phase } => cmd_stats(&phase).await,
        Commands::Demo { sample } => cmd_demo(sample).await,
    }
}

fn parse_kind(value: &str) -> Result<EntityKind> {
    match value.to_ascii_lowercase().as_str() {
        "product" | "products" => Ok(EntityKind::Product),
        "order" | "orders" => Ok(EntityKind::Order),
        "user" | "users" => Ok(EntityKind::User),
        "category" | "categories" => Ok(EntityKind::Category),
        other => Err(anyhow!(
            "unknown kind {other:?}; expected product, order, user or category"
        )),
    }
}

fn routing_line(phase: MigrationPhase) -> String {
    match phase {
        MigrationPhase::DocumentOnly => "reads+writes: document store only".to_string(),
        MigrationPhase::DualWriteDocumentPrimary => {
            "reads: document store; writes: document store, queued to wide-column".to_string()
        }
        MigrationPhase::DualWriteWideColumnPrimary => {
            "reads: wide-column store; writes: wide-column store, queued to document".to_string()
        }
        MigrationPhase::WideColumnOnly => "reads+writes: wide-column store only".to_string(),
    }
}

async fn cmd_phase(name: Option<&str>) -> Result<()> {
    let Some(name) = name else {
        for phase in MigrationPhase::ALL {
            println!("{:<28} {}", phase.as_str().bold(), routing_line(phase));
        }
        return Ok(());
    };

    let phase = MigrationPhase::parse(name)?;
    let router = seed::seeded_router(phase).await?;
    println!("{} {}", "phase".green().bold(), phase.as_str().bold());
    println!("  {}", routing_line(phase));

    let products = router
        .products()
        .find_all(&Default::default(), PageRequest::all())
        .await?;
    println!("  products visible to readers: {}", products.total);
    Ok(())
}

fn print_report(report: &ConsistencyReport) {
    let verdict = if report.is_consistent() {
        "consistent".green().bold()
    } else {
        "inconsistent".red().bold()
    };
    println!(
        "{} {}: sampled {}, matched {}, mismatched {}",
        verdict,
        report.kind.type_tag().bold(),
        report.sampled,
        report.matched,
        report.mismatched
    );
    for discrepancy in &report.discrepancies {
        match serde_json::to_string(discrepancy) {
            Ok(line) => println!("  {line}"),
            Err(_) => println!("  {discrepancy:?}"),
        }
    }
}

async fn cmd_verify(sample: u32, kind: Option<&str>, drift: bool) -> Result<()> {
    let router = seed::seeded_router(MigrationPhase::DualWriteDocumentPrimary).await?;

    if drift {
        // Write while only the document store is live, then return to
        // dual-write; the skipped store is now behind.
        router.set_phase(MigrationPhase::DocumentOnly);
        let products = router
            .products()
            .find_all(&Default::default(), PageRequest::all())
            .await?;
        if let Some(product) = products.items.iter().find(|p| p.stock > 0) {
            router.products().update_stock(&product.id, -1).await?;
        }
        router.set_phase(MigrationPhase::DualWriteDocumentPrimary);
    }

    match kind {
        Some(kind) => {
            let report = router
                .verify_consistency_kind(parse_kind(kind)?, sample)
                .await?;
            print_report(&report);
        }
        None => {
            for report in router.verify_consistency_all(sample).await? {
                print_report(&report);
            }
        }
    }
    Ok(())
}

async fn cmd_errors() -> Result<()> {
    let router = seed::seeded_router(MigrationPhase::DualWriteDocumentPrimary).await?;

    // Delete a product while only the document store is live, then flip to
    // wide-column primary and touch it: the primary write succeeds, the
    // queued document-store write fails on the missing record.
    let victim = router
        .products()
        .find_all(&Default::default(), PageRequest::all())
        .await?
        .items
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("seed produced no products"))?;
    router.set_phase(MigrationPhase::DocumentOnly);
    router.products().delete(&victim.id).await?;
    router.set_phase(MigrationPhase::DualWriteWideColumnPrimary);
    router.products().update_stock(&victim.id, 1).await?;
    router.flush_replication().await;

    let entries = router.error_log();
    if entries.is_empty() {
        println!("{}", "error log empty".green().bold());
        return Ok(());
    }
    println!("{} {} entries", "error log".red().bold(), entries.len());
    for entry in &entries {
        println!(
            "  {} {} {} — {}",
            entry.timestamp.to_rfc3339(),
            entry.operation.bold(),
            entry.arguments,
            entry.message
        );
    }

    router.clear_error_log();
    println!("{}", "cleared".green().bold());
    Ok(())
}

fn print_stats(stats: &Statistics) {
    println!("{} {}", "phase".bold(), stats.phase);
    println!(
        "  document:    products {:>4}  orders {:>4}  users {:>4}  categories {:>4}  (total {})",
        stats.document.products,
        stats.document.orders,
        stats.document.users,
        stats.document.categories,
        stats.document.total()
    );
    println!(
        "  wide-column: products {:>4}  orders {:>4}  users {:>4}  categories {:>4}  (total {})",
        stats.wide_column.products,
        stats.wide_column.orders,
        stats.wide_column.users,
        stats.wide_column.categories,
        stats.wide_column.total()
    );
    println!("  errors: {}", stats.error_count);
}

async fn cmd_stats(phase: &str) -> Result<()> {
    let phase = MigrationPhase::parse(phase)?;
    let router = seed::seeded_router(phase).await?;
    print_stats(&router.statistics().await?);
    Ok(())
}

async fn cmd_demo(sample: u32) -> Result<()> {
    println!("{}", "1. seed under DUAL_WRITE_DOCUMENT_PRIMARY".bold());
    let router = seed::seeded_router(MigrationPhase::DualWriteDocumentPrimary).await?;
    print_stats(&router.statistics().await?);

    println!("\n{}", "2. verify replication".bold());
    for report in router.verify_consistency_all(sample).await? {
        print_report(&report);
    }

    println!("\n{}", "3. live traffic during dual-write".bold());
    let hit = router.products().search("ao thun").await?;
    println!("  search \"ao thun\" -> {} hit(s)", hit.len());
    if let Some(product) = hit.first() {
        let updated = router.products().update_stock(&product.id, -2).await?;
        println!("  sold 2x {} (stock now {})", updated.name, updated.stock);
    }

    println!("\n{}", "4. flip primary to the wide-column store".bold());
    router.set_phase(MigrationPhase::DualWriteWideColumnPrimary);
    let report = router.verify_consistency(sample).await?;
    print_report(&report);

    println!("\n{}", "5. cut over".bold());
    router.set_phase(MigrationPhase::WideColumnOnly);
    print_stats(&router.statistics().await?);

    let errors = router.error_count();
    if errors == 0 {
        println!("\n{}", "migration complete, no replication errors".green().bold());
    } else {
        println!(
            "\n{} {} replication errors, inspect with `shopfront errors`",
            "warning:".yellow().bold(),
            errors
        );
    }
    Ok(())
}
