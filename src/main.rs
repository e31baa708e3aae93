use clap::Parser;
use qa_scan::scan::ScanEvent;
use qa_scan::store::FileReportStore;
use qa_scan::{PageResult, ProjectRef, QaConfig, ScanPhase, Scanner};
use std::sync::Arc;
use tokio::sync::mpsc;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => QaConfig::from_file(path)?,
        None => QaConfig::default(),
    };
    args.apply_to(&mut config);

    let store = Arc::new(FileReportStore::new(&args.store)?);
    let scanner = Scanner::new(config).with_store(store);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = if args.resume {
        scanner.restore()?
    } else {
        scanner.build()?
    };
    let mut orchestrator = orchestrator.with_events(tx);

    // Ctrl-C stops the scan after the chunk in flight; a second one exits
    let cancel = orchestrator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        ::log::warn!("Cancellation requested; finishing the current chunk");
        cancel.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            ::log::error!("Interrupted again; exiting without waiting for the scan");
            std::process::exit(130);
        }
    });

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            report_event(&event);
        }
    });

    let start_time = std::time::Instant::now();
    let phase = if args.resume {
        orchestrator.resume_analysis().await?
    } else {
        let url = args.url.as_deref().ok_or("a beta site URL is required")?;
        let project = ProjectRef::new(&args.project_name(), url, args.live.as_deref());
        ::log::info!("Starting QA scan of {}", url);

        let discovered = orchestrator.select_project(project).await?;
        println!("Discovered {} pages", discovered.len());
        orchestrator.begin_analysis().await?
    };

    let state = orchestrator.state();
    for result in &state.results {
        print_result(result);
    }
    ::log::info!(
        "Scan {:?} - analyzed {} pages in {:.2} seconds",
        phase,
        state.results.len(),
        start_time.elapsed().as_secs_f64()
    );
    if phase == ScanPhase::Cancelled {
        println!("Scan cancelled; run again with --resume to finish the remaining pages.");
    }

    if let (Some(dir), Some(project)) = (&args.export, &state.project) {
        let report = scanner.exporter()?.export(project, &state.results, None).await;
        let path = report.save_to(dir)?;
        println!("Report exported to {}", path.display());
    }

    Ok(())
}

fn report_event(event: &ScanEvent) {
    match event {
        ScanEvent::Progress {
            completed,
            total,
            percent,
        } => ::log::info!("Progress {}% ({}/{})", percent, completed, total),
        ScanEvent::PageAnalyzed { url, status } => ::log::debug!("{:?}: {}", status, url),
        other => ::log::debug!("{:?}", other),
    }
}

fn print_result(result: &PageResult) {
    println!(
        "[{:?}] {} - {} ({} issues)",
        result.status(),
        result.url,
        result.title,
        result.issues().len()
    );
    for issue in result.issues() {
        println!("    {:?} {}: {}", issue.kind, issue.category, issue.message);
    }
}
