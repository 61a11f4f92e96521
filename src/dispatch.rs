use std::fmt;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::store::MediaMap;

/// What a freshly read key turned into. Every matched, non-suppressed key
/// produces either `Played` or `FileMissing`; everything else is a log-only
/// event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    Played(String, PathBuf),
    FileMissing(String, PathBuf),
    Suppressed(String),
    Unknown(String),
}

impl DispatchEvent {
    pub fn emit(&self) {
        match self {
            DispatchEvent::Played(..) => info!("{self}"),
            DispatchEvent::FileMissing(..) | DispatchEvent::Unknown(..) => warn!("{self}"),
            DispatchEvent::Suppressed(..) => debug!("{self}"),
        }
    }
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchEvent::Played(key, media) => {
                write!(f, "[{key}] playing {}", media.display())
            }
            DispatchEvent::FileMissing(key, media) => {
                write!(f, "[{key}] file not found: {}", media.display())
            }
            DispatchEvent::Suppressed(key) => write!(f, "[{key}] repeated, ignored"),
            DispatchEvent::Unknown(key) => write!(f, "[{key}] no file mapped"),
        }
    }
}

/// Decides whether an incoming key starts playback, is suppressed as a
/// repeat, or is unknown.
///
/// `last_key` tracks the most recently matched key, not the last key that
/// changed the video: it advances on `FileMissing` too, and only a
/// different matched key resets suppression.
#[derive(Debug)]
pub struct Dispatcher {
    last_key: String,
    keycheck: bool,
}

impl Dispatcher {
    pub fn new(keycheck: bool) -> Self {
        Self {
            last_key: String::new(),
            keycheck,
        }
    }

    pub fn dispatch(&mut self, key: &str, map: &MediaMap) -> DispatchEvent {
        let Some(media) = map.lookup(key) else {
            return DispatchEvent::Unknown(key.to_string());
        };
        if !self.keycheck || self.last_key != key {
            self.last_key = key.to_string();
            if media.exists() {
                DispatchEvent::Played(key.to_string(), media.to_path_buf())
            } else {
                DispatchEvent::FileMissing(key.to_string(), media.to_path_buf())
            }
        } else {
            DispatchEvent::Suppressed(key.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{append_mapping, MediaMap};
    use std::path::Path;
    use tempfile::TempDir;

    /// Writes a mapping file in a temp dir; entries flagged `true` get a
    /// real file on disk behind them.
    fn fixture(entries: &[(&str, &str, bool)]) -> (TempDir, MediaMap) {
        let dir = tempfile::tempdir().unwrap();
        let mapping = dir.path().join("files.txt");
        for (key, name, exists) in entries {
            let media = dir.path().join(name);
            if *exists {
                std::fs::write(&media, b"video").unwrap();
            }
            append_mapping(&mapping, key, &media).unwrap();
        }
        let map = MediaMap::load(&mapping).unwrap();
        (dir, map)
    }

    fn played(event: &DispatchEvent) -> Option<&Path> {
        match event {
            DispatchEvent::Played(_, media) => Some(media.as_path()),
            _ => None,
        }
    }

    #[test]
    fn unknown_key_never_touches_state() {
        let (_dir, map) = fixture(&[("1", "intro.mp4", true)]);
        let mut dispatcher = Dispatcher::new(true);

        assert_eq!(
            dispatcher.dispatch("9", &map),
            DispatchEvent::Unknown("9".into())
        );
        assert_eq!(dispatcher.last_key, "");

        // An unknown key between two identical matched keys must not
        // break suppression either.
        assert!(matches!(
            dispatcher.dispatch("1", &map),
            DispatchEvent::Played(..)
        ));
        assert_eq!(
            dispatcher.dispatch("9", &map),
            DispatchEvent::Unknown("9".into())
        );
        assert_eq!(
            dispatcher.dispatch("1", &map),
            DispatchEvent::Suppressed("1".into())
        );
    }

    #[test]
    fn repeat_is_suppressed_when_keycheck_on() {
        let (_dir, map) = fixture(&[("1", "intro.mp4", true)]);
        let mut dispatcher = Dispatcher::new(true);

        assert!(matches!(
            dispatcher.dispatch("1", &map),
            DispatchEvent::Played(..)
        ));
        assert_eq!(
            dispatcher.dispatch("1", &map),
            DispatchEvent::Suppressed("1".into())
        );
    }

    #[test]
    fn repeat_replays_when_keycheck_off() {
        let (_dir, map) = fixture(&[("1", "intro.mp4", true)]);
        let mut dispatcher = Dispatcher::new(false);

        assert!(matches!(
            dispatcher.dispatch("1", &map),
            DispatchEvent::Played(..)
        ));
        assert!(matches!(
            dispatcher.dispatch("1", &map),
            DispatchEvent::Played(..)
        ));
    }

    #[test]
    fn intervening_key_resets_suppression() {
        let (_dir, map) = fixture(&[("A", "a.mp4", true), ("B", "b.mp4", true)]);
        let mut dispatcher = Dispatcher::new(true);

        assert!(matches!(
            dispatcher.dispatch("A", &map),
            DispatchEvent::Played(..)
        ));
        assert!(matches!(
            dispatcher.dispatch("B", &map),
            DispatchEvent::Played(..)
        ));
        // The second A is new again, even though A played two reads ago.
        assert!(matches!(
            dispatcher.dispatch("A", &map),
            DispatchEvent::Played(..)
        ));
    }

    #[test]
    fn mixed_stream_plays_and_suppresses() {
        // mapping {"1": intro, "2": loop}, input 1 1 2 1, keycheck on.
        let (dir, map) = fixture(&[("1", "intro.mp4", true), ("2", "loop.mp4", true)]);
        let mut dispatcher = Dispatcher::new(true);

        let events: Vec<_> = ["1", "1", "2", "1"]
            .iter()
            .map(|key| dispatcher.dispatch(key, &map))
            .collect();

        assert_eq!(played(&events[0]), Some(dir.path().join("intro.mp4").as_path()));
        assert_eq!(events[1], DispatchEvent::Suppressed("1".into()));
        assert_eq!(played(&events[2]), Some(dir.path().join("loop.mp4").as_path()));
        assert_eq!(played(&events[3]), Some(dir.path().join("intro.mp4").as_path()));
    }

    #[test]
    fn missing_file_logs_and_still_advances_last_key() {
        let (_dir, map) = fixture(&[("5", "gone.mp4", false)]);
        let mut dispatcher = Dispatcher::new(true);

        assert!(matches!(
            dispatcher.dispatch("5", &map),
            DispatchEvent::FileMissing(..)
        ));
        assert_eq!(dispatcher.last_key, "5");
        // The repeat is suppressed even though nothing ever played.
        assert_eq!(
            dispatcher.dispatch("5", &map),
            DispatchEvent::Suppressed("5".into())
        );
    }

    #[test]
    fn duplicate_storage_key_plays_last_loaded_path() {
        let (dir, map) = fixture(&[("1", "old.mp4", true), ("1", "new.mp4", true)]);
        let mut dispatcher = Dispatcher::new(true);

        let event = dispatcher.dispatch("1", &map);
        assert_eq!(played(&event), Some(dir.path().join("new.mp4").as_path()));
    }
}
