use std::path::Path;

use convoy_core::StackSpec;

pub async fn status(spec_path: &Path, runtime_kind: &str) -> anyhow::Result<()> {
    let stack = StackSpec::from_file(spec_path)?;
    let runtime = super::runtime_backend(runtime_kind)?;

    println!("{:<24} {:<10} {}", "SERVICE", "STATE", "INSTANCE");
    for service in &stack.services {
        match runtime.inspect(&service.name).await {
            Ok(Some(record)) => {
                let state = if record.running { "running" } else { "stopped" };
                // Long runtime ids add nothing at a glance.
                let id: String = record.id.chars().take(12).collect();
                println!("{:<24} {:<10} {}", service.name, state, id);
            }
            Ok(None) => println!("{:<24} {:<10} -", service.name, "absent"),
            Err(e) => println!("{:<24} {:<10} {e}", service.name, "error"),
        }
    }
    Ok(())
}
