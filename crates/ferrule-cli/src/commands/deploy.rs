use std::path::PathBuf;

use ferrule::{App, DeployOptions, ManifestApp};
use ferrule_core::{Backend, FerruleConfig, TargetOverrides};

use super::{live_deployer, resolve_target};

/// Package, upload and provision the app in the current directory.
pub async fn deploy(options: DeployOptions, overrides: TargetOverrides) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let config = FerruleConfig::load(&project_dir)?;
    let target = resolve_target(&project_dir, &config, &overrides)?;

    println!(
        "Deploying '{}' to {} ({}/{})...",
        target.name(),
        target.backend(),
        target.project(),
        target.location()
    );

    let deployer = live_deployer(target, &project_dir).await?;
    let app = ManifestApp::new(deployer.gcloud(), deployer.target(), &config.handlers);

    if let Err(e) = deployer.deploy(&app, &options, &config).await {
        if e.is_fatal() {
            tracing::error!(error = ?e, "deployment aborted");
            std::process::exit(1);
        }
        return Err(e.into());
    }

    println!();
    let target = deployer.target();
    if target.backend() == Backend::CloudFunction && app.is_http() && !options.skip_function {
        println!("Deployed: {}", target.function_url());
    } else {
        println!("Deploy complete.");
    }

    Ok(())
}
