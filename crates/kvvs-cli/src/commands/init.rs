//! `kvvs init` command - write a default configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use kvvs_core::Config;

use crate::output;

/// Run the init command.
pub fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        output::warn(&format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        ));
        return Ok(());
    }

    Config::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    output::success(&format!("Wrote {}", path.display()));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kvvs_core::StorageBackend;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kvvs.toml");

        run(&path, false).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_init_keeps_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kvvs.toml");
        std::fs::write(&path, "[storage]\nbackend = \"keydb\"\n").unwrap();

        run(&path, false).unwrap();
        assert_eq!(Config::load(&path).unwrap().storage.backend, StorageBackend::Keydb);

        run(&path, true).unwrap();
        assert_eq!(Config::load(&path).unwrap().storage.backend, StorageBackend::Memory);
    }
}
