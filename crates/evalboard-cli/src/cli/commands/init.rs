use super::exit_codes;
use crate::cli::args::{GlobalArgs, InitArgs};
use anyhow::Result;
use evalboard_core::config::{write_sample_config, DEFAULT_CONFIG_FILE};
use std::path::{Path, PathBuf};

const GITIGNORE_ENTRY: &str = ".evalboard/";

pub fn run(args: &InitArgs, global: &GlobalArgs) -> Result<i32> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if path.exists() && !args.force {
        eprintln!("{} already exists (use --force to overwrite)", path.display());
        return Ok(exit_codes::FAILED);
    }
    if let Err(e) = write_sample_config(&path) {
        eprintln!("config error: {}", e);
        return Ok(exit_codes::CONFIG_ERROR);
    }
    eprintln!("wrote file: {}", path.display());

    if args.gitignore {
        let dir = path.parent().filter(|d| !d.as_os_str().is_empty());
        append_gitignore(&dir.unwrap_or(Path::new(".")).join(".gitignore"))?;
    }
    Ok(exit_codes::OK)
}

fn append_gitignore(path: &Path) -> Result<()> {
    let existing = std::fs::read_to_string(path).unwrap_or_default();
    if existing.lines().any(|l| l.trim() == GITIGNORE_ENTRY) {
        return Ok(());
    }
    let mut body = existing;
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }
    body.push_str(GITIGNORE_ENTRY);
    body.push('\n');
    std::fs::write(path, body)?;
    eprintln!("updated {}", path.display());
    Ok(())
}
