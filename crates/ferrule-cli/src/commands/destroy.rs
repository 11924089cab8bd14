use std::path::PathBuf;

use ferrule::ManifestApp;
use ferrule_core::{FerruleConfig, TargetOverrides};

use super::{live_deployer, resolve_target};

/// Delete triggers and the function/service; with `all`, also the build
/// leftovers.
pub async fn destroy(all: bool, overrides: TargetOverrides) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let config = FerruleConfig::load(&project_dir)?;
    let target = resolve_target(&project_dir, &config, &overrides)?;

    println!("Destroying '{}' ({})...", target.name(), target.backend());

    let deployer = live_deployer(target, &project_dir).await?;
    let app = ManifestApp::new(deployer.gcloud(), deployer.target(), &config.handlers);
    deployer.destroy(&app, all).await?;

    println!();
    println!("Destroy complete.");

    Ok(())
}
