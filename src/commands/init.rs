use anyhow::{Context, Result};
use std::path::PathBuf;
use wikiprose::config::{Config, DEFAULT_CONFIG_FILE};

pub fn init_config(path: PathBuf, force: bool) -> Result<()> {
    let config = Config::default();
    let config_path = path.join(DEFAULT_CONFIG_FILE);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    std::fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let toml_content = format!("# wikiprose configuration\n\n{}", config.to_toml()?);
    std::fs::write(&config_path, toml_content)?;
    println!("Created configuration file: {}", config_path.display());

    // Create data and output directories
    for dir in [&config.fetch.data_dir, &config.extract.output_dir] {
        let dir = path.join(dir);
        std::fs::create_dir_all(&dir)?;
        println!("Created directory: {}", dir.display());
    }

    Ok(())
}
