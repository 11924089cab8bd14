use std::path::Path;

use ferrule_build::scaffold;

/// Create `<name>/` with a starter app.
pub fn init(name: &str) -> anyhow::Result<()> {
    ferrule_core::validate_name(name)?;

    let project_dir = Path::new(name);
    std::fs::create_dir_all(project_dir)?;

    let created = scaffold::create_project(project_dir, name)?;

    println!("Created project '{name}'");
    for path in &created {
        println!("  {}", path.display());
    }
    println!();
    println!("Next steps:");
    println!("  cd {name}");
    println!("  ferrule deploy --project <gcp-project> --location us-central1");

    Ok(())
}
