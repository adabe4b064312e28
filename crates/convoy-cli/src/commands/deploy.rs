use std::path::Path;

use anyhow::bail;
use tokio::sync::{mpsc, watch};

use convoy_core::StackSpec;
use convoy_engine::Orchestrator;
use convoy_plan::DeploymentPlan;

pub async fn deploy(spec_path: &Path, runtime_kind: &str) -> anyhow::Result<()> {
    let stack = StackSpec::from_file(spec_path)?;
    let plan = DeploymentPlan::resolve(&stack)?;
    let runtime = super::runtime_backend(runtime_kind)?;

    println!(
        "deploying stack {} ({} services, {} waves)",
        stack.name,
        plan.service_count(),
        plan.waves().len()
    );

    // Ctrl-C cancels the run; healthy services are left running.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupt received, cancelling run");
            let _ = cancel_tx.send(true);
        }
    });

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<convoy_engine::TransitionEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            println!("  {}: {} -> {}", event.service, event.from, event.to);
        }
    });

    let orchestrator = Orchestrator::new(runtime).with_events(events_tx);
    let report = orchestrator.converge(&stack, &plan, cancel_rx).await;
    drop(orchestrator); // closes the event channel
    let _ = printer.await;

    for entry in report.entries() {
        println!("{:<24} {}", entry.service, entry.state);
    }
    println!("{report}");

    if !report.succeeded() {
        bail!("convergence failed: {report}");
    }
    Ok(())
}
