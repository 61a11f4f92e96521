#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod dispatch;
mod gui;
mod player;
mod serial;
mod settings;
mod store;

use anyhow::Result;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Any stray panic ends the session through a visible dialog.
    std::panic::set_hook(Box::new(|info| {
        let msg = info.to_string();
        log::error!("{msg}");
        fltk::dialog::alert_default(&msg);
        std::process::exit(1);
    }));

    gui::run()
}
