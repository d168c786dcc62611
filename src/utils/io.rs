use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn read_to_string(path: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read input file {}", path))
}

/// Write `content` to `path`, creating missing parent directories.
pub fn write_string(path: &str, content: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write output file {}", path))
}
