//! helen-vault: command-line front end for the Helen knowledge store.
//!
//! `list` and `status` are read-only and always exit 0. `seed` only fails when the
//! vector service is unreachable; individual batch failures are printed and skipped.

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use helen_core::{
    AlwaysConfirm, ArchiveManager, ArchiveStatus, BatchStatus, HttpStoreClient, InitialBackup,
    RestoreGate, SeedRun, StoreClient, SystemInitializer, SystemStatus, VaultConfig, VaultError,
};
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[helen-vault] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            if let Some(VaultError::RestoreDeclined) = e.downcast_ref::<VaultError>() {
                println!("Restore cancelled");
            } else {
                eprintln!("❌ {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(&cli)?;
    let client: Arc<dyn StoreClient> =
        Arc::new(HttpStoreClient::from_config(&config).context("building HTTP client")?);

    match cli.command {
        Command::Backup { name } => {
            let archives = ArchiveManager::from_config(&config, client);
            let archive = archives.create(name.as_deref()).await?;
            println!("✅ Backup created: {}", archive.path.display());
            println!(
                "   {} collection(s), {} document(s), {}",
                archive.manifest.collections.len(),
                archive.manifest.total_documents,
                human_size(archive.size_bytes)
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Restore { name, yes } => {
            let archives = ArchiveManager::from_config(&config, client);
            let gate: Box<dyn RestoreGate> = if yes {
                Box::new(AlwaysConfirm)
            } else {
                Box::new(PromptGate)
            };
            let report = archives.restore(&name, gate.as_ref()).await?;
            println!("✅ Restored {}", report.archive.display());
            if let Some(sidecar) = &report.sidecar {
                println!("   Previous storage kept at {}", sidecar.display());
            }
            if !report.storage_restored {
                println!("   ⚠️  Backup held no storage files; live storage left as is");
            }
            if report.ledger_restored {
                println!("   Seed ledger restored");
            }
            println!("   Restart the vector service to pick up the restored data.");
            Ok(ExitCode::SUCCESS)
        }
        Command::List => {
            print_archives(&ArchiveManager::from_config(&config, client));
            Ok(ExitCode::SUCCESS)
        }
        Command::Seed { guide } => {
            let mut config = config;
            if let Some(guide) = guide {
                config.guide_path = guide;
            }
            let run = SystemInitializer::new(config, client).seed_all().await?;
            print_seed_run(&run);
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            let status = SystemInitializer::new(config, client).status().await;
            print_status(&status);
            Ok(ExitCode::SUCCESS)
        }
        Command::Init { no_backup } => {
            let report = SystemInitializer::new(config, client)
                .initialize(!no_backup)
                .await?;
            print_seed_run(&report.seeding);
            print_status(&report.status);
            match &report.backup {
                InitialBackup::Created(archive) => {
                    println!("💾 Initial backup: {}", archive.path.display())
                }
                InitialBackup::AlreadyPresent(path) => {
                    println!("💾 Initial backup already exists: {}", path.display())
                }
                InitialBackup::NotRequested => {}
                InitialBackup::Failed { message, .. } => {
                    println!("⚠️  Initial backup failed: {}", message)
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<VaultConfig> {
    let mut config = match &cli.config {
        Some(path) => VaultConfig::load_from(path),
        None => VaultConfig::load(),
    }
    .context("loading configuration")?;

    if let Some(url) = &cli.service_url {
        config.service_url = url.clone();
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &cli.backup_dir {
        config.backup_dir = dir.clone();
    }
    tracing::debug!(target: "helen::cli", ?config, "Configuration loaded");
    Ok(config)
}

/// Interactive y/N prompt on stdin.
struct PromptGate;

impl RestoreGate for PromptGate {
    fn confirm(&self, archive: &Path) -> bool {
        print!(
            "⚠️  The vector service is running. Restore {} over the live store? [y/N] ",
            archive.display()
        );
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn print_archives(archives: &ArchiveManager) {
    let summaries = archives.list();
    if summaries.is_empty() {
        println!("📁 No backups found in {}", archives.config().backup_dir.display());
        return;
    }
    println!("📁 Available backups ({}):", summaries.len());
    for summary in summaries {
        let detail = match &summary.status {
            ArchiveStatus::Indexed {
                collections,
                total_documents,
                ..
            } => format!("{} collection(s), {} document(s)", collections, total_documents),
            ArchiveStatus::Legacy => "Legacy backup (no metadata)".to_string(),
            ArchiveStatus::Corrupt { reason } => format!("❌ {}", reason),
        };
        println!(
            "  {:<40} {:>10}  {}  {}",
            summary.name,
            human_size(summary.size_bytes),
            summary.modified.format("%Y-%m-%d %H:%M:%S"),
            detail
        );
    }
}

fn print_seed_run(run: &SeedRun) {
    for domain in &run.domains {
        println!("🌱 {}", domain.domain);
        for batch in &domain.batches {
            match &batch.status {
                BatchStatus::Seeded(outcome) => println!(
                    "   ✅ {:<28} +{} new, {} already present",
                    batch.label, outcome.added, outcome.skipped
                ),
                BatchStatus::Failed { message, .. } => {
                    println!("   ❌ {:<28} {}", batch.label, message)
                }
            }
        }
    }
    for skipped in &run.skipped {
        println!("⏭️  {} skipped: {}", skipped.domain, skipped.reason);
    }
    for (collection, after) in &run.counts_after {
        let before = run.counts_before.get(collection).copied().unwrap_or(0);
        println!("   📚 {:<28} {} -> {} document(s)", collection, before, after);
    }
    println!("Added {} item(s), {} failed batch(es)", run.added(), run.failures());
}

fn print_status(status: &SystemStatus) {
    match &status.health {
        Some(health) => println!(
            "🟢 {} is up ({})",
            status.service_url,
            health.status.as_deref().unwrap_or("healthy")
        ),
        None => {
            println!("🔴 {} is not reachable", status.service_url);
            return;
        }
    }
    for collection in &status.collections {
        println!("   📚 {:<28} {} document(s)", collection.name, collection.count);
    }
    println!("   Total: {} document(s)", status.total_documents);
    println!("   💬 Conversation contexts: {}", status.conversation_contexts());
}

fn human_size(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    if bytes as f64 >= MB {
        format!("{:.2} MB", bytes as f64 / MB)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}
