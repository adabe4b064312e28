use std::path::Path;

use convoy_core::StackSpec;
use convoy_engine::Orchestrator;
use convoy_plan::DeploymentPlan;

pub async fn down(spec_path: &Path, runtime_kind: &str) -> anyhow::Result<()> {
    let stack = StackSpec::from_file(spec_path)?;
    let plan = DeploymentPlan::resolve(&stack)?;
    let runtime = super::runtime_backend(runtime_kind)?;

    let stopped = Orchestrator::new(runtime).down(&plan).await;
    println!("stack {}: {stopped} instance(s) stopped", stack.name);
    Ok(())
}
