//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use pf_core::config::{self, ProvisionerConfig};

fn resolve(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path)
}

/// Show the configuration file, or the defaults when there is none
pub fn config_show(config_path: Option<&Path>) -> Result<()> {
    let path = resolve(config_path);

    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Using defaults. Run 'panelforge config init' to write them out");
        println!();
        println!("{}", toml::to_string_pretty(&ProvisionerConfig::default())?);
        return Ok(());
    }

    // Parse first so a broken file is reported rather than echoed
    let loaded: ProvisionerConfig = config::load_config(&path)
        .with_context(|| format!("Failed to load config file: {:?}", path))?;

    print_info(&format!("Configuration file: {:?}", path));
    println!();
    println!("{}", toml::to_string_pretty(&loaded)?);

    Ok(())
}

/// Print the path of the configuration file in use
pub fn config_path(config_path: Option<&Path>) -> Result<()> {
    println!("{}", resolve(config_path).display());
    Ok(())
}

/// Write the default configuration
pub fn config_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = resolve(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    config::save_config(&path, &ProvisionerConfig::default())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    print_success(&format!("Created configuration file: {:?}", path));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        config_init(Some(&path), false).unwrap();
        let loaded: ProvisionerConfig = config::load_config(&path).unwrap();
        assert_eq!(loaded.bind_address, "127.0.0.1:4000");
        assert_eq!(loaded.database.name, "ssh_panel");
    }

    #[test]
    fn test_init_keeps_existing_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "bind_address = \"0.0.0.0:9000\"\n").unwrap();

        config_init(Some(&path), false).unwrap();
        let loaded: ProvisionerConfig = config::load_config(&path).unwrap();
        assert_eq!(loaded.bind_address, "0.0.0.0:9000");

        config_init(Some(&path), true).unwrap();
        let loaded: ProvisionerConfig = config::load_config(&path).unwrap();
        assert_eq!(loaded.bind_address, "127.0.0.1:4000");
    }
}
