use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;

/// Reads the saved device name. The file holds a single line, but if it
/// ever ends up with more, the last non-empty one wins.
pub fn load_port(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut port = None;
    for line in BufReader::new(file).lines() {
        let line = line.ok()?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            port = Some(trimmed.to_string());
        }
    }
    port
}

/// Overwrites the port file with the new device name.
pub fn save_port(path: &Path, port: &str) -> Result<()> {
    std::fs::write(path, port)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Appends one `<key>,<path>` line to the mapping file.
pub fn append_mapping(path: &Path, key: &str, media: &Path) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    writeln!(file, "{},{}", key, media.display())?;
    Ok(())
}

/// Truncates the mapping file.
pub fn clear_mapping(path: &Path) -> Result<()> {
    File::create(path)
        .with_context(|| format!("failed to truncate {}", path.display()))?;
    Ok(())
}

/// The key/file table, in file order. Keys are not required to be unique
/// in storage; lookup resolves collisions last-loaded-wins.
#[derive(Debug, Default, Clone)]
pub struct MediaMap {
    rows: Vec<(String, PathBuf)>,
}

impl MediaMap {
    pub fn load(path: &Path) -> Result<Self> {
        // Missing file just means nothing has been added yet.
        if !path.exists() {
            return Ok(Self::default());
        }
        let file = File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut rows = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // Key is everything up to the first comma; the rest is the
            // path, commas included.
            match line.split_once(',') {
                Some((key, media)) => rows.push((key.to_string(), PathBuf::from(media))),
                None => warn!("skipping malformed mapping line: {line}"),
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[(String, PathBuf)] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Next sequential key handed out by the table editor.
    pub fn next_key(&self) -> String {
        (self.rows.len() + 1).to_string()
    }

    pub fn lookup(&self, key: &str) -> Option<&Path> {
        self.rows
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, media)| media.as_path())
    }
}
