use std::path::PathBuf;

use ferrule_build::Packager;
use ferrule_core::FerruleConfig;

use super::app_name;

/// Write `.ferrule/{name}.zip` for the project in the current directory.
pub fn package() -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let config = FerruleConfig::load(&project_dir)?;
    let name = app_name(&project_dir, &config)?;

    let artifact = Packager::new(&project_dir, &name).package(&config)?;

    println!(
        "Packaged {} file(s) into {}",
        artifact.members().len(),
        artifact.path().display()
    );
    for member in artifact.members() {
        println!("  {member}");
    }

    Ok(())
}
