use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

/// Session settings the operator can toggle before starting playback.
/// The port name and the key/file table live in their own flat files
/// (see `store`), not here.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub baud: u32,
    pub loop_playback: bool,
    pub keycheck: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            baud: 9600,
            loop_playback: false,
            keycheck: true,
        }
    }
}

impl AppSettings {
    pub fn load(path: &Path) -> Self {
        File::open(path)
            .ok()
            .and_then(|f| serde_json::from_reader(BufReader::new(f)).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

pub fn config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("cueplay");
    if !path.exists() {
        let _ = std::fs::create_dir_all(&path);
    }
    path
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn port_file() -> PathBuf {
    config_dir().join("configs.txt")
}

pub fn mapping_file() -> PathBuf {
    config_dir().join("files.txt")
}
