use std::io::{BufRead, BufReader};
use std::sync::mpsc::Sender;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};

const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Names of the serial devices currently present on the system.
pub fn available_ports() -> Vec<String> {
    serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|p| p.port_name)
        .collect()
}

pub fn open(port: &str, baud: u32) -> Result<Box<dyn serialport::SerialPort>> {
    serialport::new(port, baud)
        .timeout(READ_TIMEOUT)
        .open()
        .with_context(|| format!("failed to open serial port {port}"))
}

/// Strips line terminators and surrounding whitespace. Blank lines carry
/// no key and are dropped before they ever reach dispatch.
pub fn clean_line(raw: &str) -> Option<String> {
    let key = raw.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Reads newline-framed keys off the port on a background thread and
/// forwards them over `tx`. Read timeouts are routine; the thread stops
/// once the receiving side is gone.
pub fn spawn_reader(port: Box<dyn serialport::SerialPort>, tx: Sender<String>) {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(port);
        let mut line_buf = String::new();
        loop {
            line_buf.clear();
            match reader.read_line(&mut line_buf) {
                Ok(bytes) if bytes > 0 => {
                    let Some(key) = clean_line(&line_buf) else {
                        continue;
                    };
                    debug!("serial rx: {key}");
                    if tx.send(key).is_err() {
                        break;
                    }
                }
                _ => {
                    // timeout or empty read
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        }
        info!("serial reader stopped");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminators_and_whitespace_are_stripped() {
        assert_eq!(clean_line("1\r\n").as_deref(), Some("1"));
        assert_eq!(clean_line("  7  \n").as_deref(), Some("7"));
        assert_eq!(clean_line("go\n").as_deref(), Some("go"));
    }

    #[test]
    fn blank_lines_are_dropped() {
        assert_eq!(clean_line(""), None);
        assert_eq!(clean_line("\n"), None);
        assert_eq!(clean_line("\r\n"), None);
        assert_eq!(clean_line("   \t  \r\n"), None);
    }

    #[test]
    fn interior_whitespace_is_preserved() {
        assert_eq!(clean_line("WORKS 1\r\n").as_deref(), Some("WORKS 1"));
    }
}
