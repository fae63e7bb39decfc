//! Config command implementations

use std::path::Path;

use anyhow::{Context, Result};

use mctl_core::config::{self, AdminConfig, ClientConfig};

use crate::commands::Paths;
use crate::output::{print_error, print_info, print_success, print_warning};

/// Get a config value by dotted key, e.g. `menu.timings.lookup_settle`
pub fn config_get(paths: &Paths, key: &str) -> Result<()> {
    let table = effective_table(paths)?;

    let mut current = &toml::Value::Table(table);
    for part in key.split('.') {
        match current.as_table().and_then(|t| t.get(part)) {
            Some(v) => current = v,
            None => {
                print_error(&format!("Key not found: {}", key));
                return Ok(());
            }
        }
    }

    match current {
        toml::Value::String(s) => println!("{}", s),
        toml::Value::Integer(i) => println!("{}", i),
        toml::Value::Float(f) => println!("{}", f),
        toml::Value::Boolean(b) => println!("{}", b),
        toml::Value::Array(a) => {
            for item in a {
                println!("{}", item);
            }
        }
        toml::Value::Table(_) => println!("{}", toml::to_string_pretty(current)?),
        toml::Value::Datetime(d) => println!("{}", d),
    }

    Ok(())
}

/// Set a config value by dotted key, creating the file if needed
pub fn config_set(paths: &Paths, key: &str, value: &str) -> Result<()> {
    let path = paths.config();
    let mut table = effective_table(paths)?;

    let parts: Vec<&str> = key.split('.').collect();
    let Some((last_key, parents)) = parts.split_last() else {
        anyhow::bail!("Invalid key: key path cannot be empty");
    };

    let mut current = &mut table;
    for part in parents {
        current = current
            .entry(part.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()))
            .as_table_mut()
            .ok_or_else(|| anyhow::anyhow!("Cannot navigate to key: {}", key))?;
    }

    let toml_value = if value == "true" {
        toml::Value::Boolean(true)
    } else if value == "false" {
        toml::Value::Boolean(false)
    } else if let Ok(i) = value.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = value.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        toml::Value::String(value.to_string())
    };
    current.insert(last_key.to_string(), toml_value);

    // Reject values the client config cannot load
    let content = toml::to_string_pretty(&table)?;
    toml::from_str::<ClientConfig>(&content)
        .with_context(|| format!("Invalid value for {}: {}", key, value))?;

    write_file(&path, &content)?;
    print_success(&format!("Set {} = {}", key, value));
    Ok(())
}

/// Show the configuration files and the effective settings
pub fn config_show(paths: &Paths) -> Result<()> {
    let path = paths.config();
    if path.exists() {
        print_info(&format!("Configuration file: {:?}", path));
    } else {
        print_warning(&format!("No configuration file at {:?}, using defaults", path));
    }
    println!();

    let config = paths.load_client_config()?;
    println!("{}", toml::to_string_pretty(&config)?);

    let admin_path = paths.admin();
    let admin = AdminConfig::load_or_default(&admin_path);
    print_info(&format!("Admin file: {:?}", admin_path));
    println!("blocked_users = {:?}", admin.blocked_users);
    println!("blocked_commands = {:?}", admin.blocked_commands);

    Ok(())
}

/// Write default client and admin configuration files
pub fn config_init(paths: &Paths, force: bool) -> Result<()> {
    let created_client = init_file(&paths.config(), &ClientConfig::default(), force)?;
    let created_admin = init_file(&paths.admin(), &AdminConfig::default(), force)?;

    if !created_client || !created_admin {
        print_info("Use --force to overwrite");
    }
    Ok(())
}

/// Print the configuration directory
pub fn config_path(paths: &Paths) -> Result<()> {
    let dir = paths
        .config()
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_dir);
    println!("{}", dir.display());
    Ok(())
}

fn init_file<T: serde::Serialize>(path: &Path, value: &T, force: bool) -> Result<bool> {
    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        return Ok(false);
    }

    config::save_config(path, value)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    print_success(&format!("Created configuration file: {:?}", path));
    Ok(true)
}

/// Current client settings as a TOML table, defaults filled in
fn effective_table(paths: &Paths) -> Result<toml::Table> {
    let config = paths.load_client_config()?;
    let content = toml::to_string(&config)?;
    Ok(toml::from_str(&content)?)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {:?}", path))
}
