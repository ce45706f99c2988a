mod event;
mod input;
mod io_thread;
mod logging;
mod output;
mod render;
mod state;
mod tui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use terbox_db::Config;

#[derive(Parser, Debug)]
#[command(name = "terbox", version, about = "Tabbed shell sessions in one terminal")]
struct Cli {
    /// Shell to spawn for new tabs (overrides the stored setting)
    #[arg(long)]
    shell: Option<String>,

    /// Color theme: default, dark, light or plain
    #[arg(long)]
    theme: Option<String>,

    /// Settings database (default: ~/.terbox/terbox.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let db_path = match cli.db {
        Some(path) => path,
        None => home_dir()
            .context("could not determine home directory")?
            .join(".terbox")
            .join("terbox.db"),
    };
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let db = terbox_db::open(&db_path)
        .with_context(|| format!("failed to open settings database {}", db_path.display()))?;
    terbox_db::config::seed_defaults(&db).context("failed to seed default settings")?;
    let mut config = Config::load(&db).context("failed to load settings")?;
    drop(db);

    if let Some(shell) = cli.shell {
        config.shell = shell;
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Err(e) = logging::init() {
        eprintln!("warning: logging disabled: {e}");
    }
    log::info!("terbox starting, settings at {}", db_path.display());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(tui::run(config, db_path))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let cli = Cli::parse_from([
            "terbox",
            "--shell",
            "/bin/bash",
            "--theme",
            "dark",
            "--print-config",
        ]);
        assert_eq!(cli.shell.as_deref(), Some("/bin/bash"));
        assert_eq!(cli.theme.as_deref(), Some("dark"));
        assert!(cli.print_config);
        assert!(cli.db.is_none());
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
