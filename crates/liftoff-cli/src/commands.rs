use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use tracing::info;

use liftoff_crypto::DefaultAddressing;
use liftoff_ledger::{GatewayLedgerClient, LedgerClient, LedgerQueue};
use liftoff_provider::{HttpTransport, UploadProtocol};
use liftoff_publish::{DirectoryPublisher, DirectoryReport, EntryFailure, Pipeline, PublishError};

use crate::cli::{Cli, Command, LaunchArgs};
use crate::config::Settings;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load(&cli.config)?;
    match cli.command {
        Command::Launch(args) => {
            settings.apply(&args);
            cmd_launch(args, settings).await
        }
    }
}

async fn cmd_launch(args: LaunchArgs, settings: Settings) -> anyhow::Result<()> {
    let ledger: Arc<dyn LedgerClient> = Arc::new(
        GatewayLedgerClient::connect(&settings.ledger)
            .await
            .with_context(|| format!("connecting to ledger gateway at {}", settings.ledger.url))?,
    );
    info!(account = ledger.submitter(), "publishing as");

    let queue = Arc::new(LedgerQueue::new(Arc::clone(&ledger), settings.queue.clone()));
    queue.listen();

    let transport = Arc::new(HttpTransport::new(
        settings.upload.request_timeout(),
        settings.upload.route.clone(),
    )?);
    let uploader = Arc::new(UploadProtocol::new(
        Arc::clone(&ledger),
        transport,
        settings.upload.clone(),
    ));
    let pipeline = Arc::new(Pipeline::new(
        Arc::clone(&ledger),
        Arc::clone(&queue),
        Arc::new(DefaultAddressing),
        Arc::clone(&uploader),
        settings.publish.clone(),
    ));

    let outcome = DirectoryPublisher::new(pipeline).publish(&args.dir).await;
    queue.stop();
    let report = match outcome {
        Ok(report) => report,
        Err(PublishError::Directory { source, partial, .. }) => {
            print_failures(&partial.failures);
            return Err(anyhow::Error::new(*source))
                .with_context(|| format!("publishing {}", args.dir.display()));
        }
        Err(e) => return Err(e).with_context(|| format!("publishing {}", args.dir.display())),
    };

    print_report(&report);
    let blacklisted = uploader.registry().blacklisted();
    if !blacklisted.is_empty() {
        info!(count = blacklisted.len(), providers = ?blacklisted, "providers excluded during this run");
    }

    if !report.is_complete() {
        anyhow::bail!("{} entries failed to publish", report.failures.len());
    }
    Ok(())
}

fn print_report(report: &DirectoryReport) {
    println!("Lift Off! 🚀\n");
    println!("You can now view your files at {}", format!("ipfs://{}", report.cid).cyan().bold());
    println!(
        "  {} files, {} folders ({} already stored)",
        report.files.to_string().bold(),
        report.directories.to_string().bold(),
        report.deduplicated
    );
    print_failures(&report.failures);
}

fn print_failures(failures: &[EntryFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("\n{} {} entries were not published:", "✗".red().bold(), failures.len());
    for failure in failures {
        println!("  {} {}", failure.path.display().to_string().yellow(), failure.error);
    }
}
