use clap::Parser;
use colored::Colorize;

use studiopass::cli::{Cli, Commands};
use studiopass::config::{get_config, init_config_from};
use studiopass::runtime::modes::{run_cli, run_server};
use studiopass::system::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // 生成配置不需要加载现有配置
    if let Some(Commands::GenerateConfig { .. }) = &cli.command {
        if let Err(e) = run_cli(cli.command_or_default()).await {
            eprintln!("{}", e.format_colored());
            std::process::exit(1);
        }
        return Ok(());
    }

    init_config_from(&cli.config);
    let config = get_config();
    let _log_guard = init_logging(&config.logging);

    match cli.command_or_default() {
        Commands::Serve => run_server().await,
        cmd => {
            if let Err(e) = run_cli(cmd).await {
                eprintln!("{}", e.format_colored());
                eprintln!("{}", "Command failed".red());
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
