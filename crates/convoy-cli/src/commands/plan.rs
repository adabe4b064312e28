use std::fmt::Write as _;
use std::path::Path;

use convoy_core::StackSpec;
use convoy_plan::DeploymentPlan;

/// Resolve and print the plan. Pure dry-run: no runtime calls.
pub fn plan(spec_path: &Path) -> anyhow::Result<()> {
    let stack = StackSpec::from_file(spec_path)?;
    let plan = DeploymentPlan::resolve(&stack)?;
    print!("{}", render(&stack, &plan));
    Ok(())
}

fn render(stack: &StackSpec, plan: &DeploymentPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "stack {}: {} waves", stack.name, plan.waves().len());
    for (i, wave) in plan.waves().iter().enumerate() {
        let _ = writeln!(out, "wave {i}: {}", wave.services.join(", "));
        let networks = plan.networks_for_wave(i);
        if !networks.is_empty() {
            let _ = writeln!(out, "  networks: {}", networks.join(", "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_waves_and_networks() {
        let stack = StackSpec::from_toml(
            r#"
[stack]
name = "demo"

[[networks]]
name = "app-net"

[[services]]
name = "db"
image = "postgres:16"
networks = ["app-net"]

[[services]]
name = "api"
image = "api:1"
networks = ["app-net"]
depends_on = ["db"]
"#,
        )
        .unwrap();
        let plan = DeploymentPlan::resolve(&stack).unwrap();

        let rendered = render(&stack, &plan);
        assert_eq!(
            rendered,
            "stack demo: 2 waves\nwave 0: db\n  networks: app-net\nwave 1: api\n"
        );
    }

    #[test]
    fn dry_run_reads_spec_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.toml");
        std::fs::write(
            &path,
            "[[services]]\nname = \"db\"\nimage = \"postgres:16\"\n",
        )
        .unwrap();

        assert!(plan(&path).is_ok());
        assert!(plan(&dir.path().join("missing.toml")).is_err());
    }
}
