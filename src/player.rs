use std::path::Path;

use anyhow::{Context, Result};
use libmpv2::Mpv;

/// Embedded mpv surface. Bound to a native window handle at creation and
/// driven with `loadfile`; the kiosk never needs seek/pause control.
pub struct Player {
    mpv: Mpv,
}

impl Player {
    /// `wid` is the raw handle of the window mpv renders into. It has to
    /// be set before mpv initializes, hence the initializer closure.
    pub fn new(wid: i64, loop_playback: bool) -> Result<Self> {
        let mpv = Mpv::with_initializer(|init| {
            init.set_property("wid", wid)?;
            init.set_property("mute", "yes")?;
            init.set_property("osc", "no")?;
            init.set_property("input-default-bindings", "no")?;
            init.set_property("cursor-autohide", "always")?;
            init.set_property("terminal", "no")?;
            init.set_property("hwdec", "auto")?;
            init.set_property("keep-open", "yes")?;
            init.set_property("force-window", "yes")?;
            init.set_property("loop-file", if loop_playback { "inf" } else { "no" })?;
            Ok(())
        })
        .context("failed to create mpv instance")?;
        Ok(Self { mpv })
    }

    /// Starts `media`, replacing whatever is currently playing.
    pub fn play(&self, media: &Path) -> Result<()> {
        let target = media.to_string_lossy();
        self.mpv
            .command("loadfile", &[target.as_ref(), "replace"])
            .with_context(|| format!("failed to load {target}"))?;
        Ok(())
    }
}
