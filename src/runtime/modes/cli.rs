//! CLI mode
//!
//! One-shot operator commands. `serve` is handled by the server mode.

use std::path::Path;

use colored::Colorize;

use crate::api::jwt::get_jwt_service;
use crate::cli::Commands;
use crate::config::StaticConfig;
use crate::errors::{Result, StudioError};
use crate::services::ScheduleImporter;
use crate::storage::StorageFactory;

pub async fn run_cli(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Serve => Err(StudioError::validation(
            "serve is not a CLI command; run it through the server mode",
        )),
        Commands::ImportSchedule { csv, uploaded_by } => import_schedule(&csv, &uploaded_by).await,
        Commands::GenerateConfig { path, force } => generate_config(path, force),
        Commands::IssueToken { user, email } => issue_token(&user, email.as_deref()),
    }
}

async fn import_schedule(csv: &str, uploaded_by: &str) -> Result<()> {
    let config = crate::config::get_config();
    let storage = StorageFactory::create().await?;
    let importer = ScheduleImporter::new(storage, &config.import);

    let report = importer.import_file(Path::new(csv), uploaded_by).await?;
    println!(
        "{} upload #{}: {}/{} rows imported",
        "Schedule import finished:".green(),
        report.upload_id,
        report.processed_classes,
        report.total_classes
    );
    for error in &report.errors {
        println!("  {} {}", "!".yellow(), error);
    }
    Ok(())
}

fn generate_config(path: Option<String>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(|| "config.example.toml".to_string());
    if !force && Path::new(&path).exists() {
        return Err(StudioError::file_operation(format!(
            "{} already exists (use --force to overwrite)",
            path
        )));
    }

    StaticConfig::default()
        .save_to_file(&path)
        .map_err(|e| StudioError::file_operation(format!("Unable to write {}: {}", path, e)))?;
    println!(
        "{} {}",
        "Configuration file generated:".green(),
        path.blue()
    );
    Ok(())
}

fn issue_token(user: &str, email: Option<&str>) -> Result<()> {
    let token = get_jwt_service().issue_token(user, email)?;
    println!("{}", token);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_config_refuses_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_string_lossy().to_string();

        generate_config(Some(path_str.clone()), false).unwrap();
        assert!(path.exists());
        assert!(generate_config(Some(path_str.clone()), false).is_err());
        assert!(generate_config(Some(path_str), true).is_ok());
    }
}
