use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};

use fltk::{
    app,
    button::{Button, CheckButton},
    dialog,
    enums::{Align, Color, FrameType},
    frame::Frame,
    group::{Flex, Pack, Scroll},
    menu::Choice,
    prelude::*,
    text::{TextBuffer, TextDisplay},
    window::Window,
};

use crate::dispatch::{DispatchEvent, Dispatcher};
use crate::player::Player;
use crate::serial;
use crate::settings::{self, AppSettings, BAUD_RATES};
use crate::store::{self, MediaMap};

const BG_COLOR: Color = Color::from_rgb(1, 1, 1);
const WIDGET_BG: Color = Color::from_rgb(40, 40, 40);
const TEXT_COLOR: Color = Color::White;

fn style_widget<W: WidgetExt>(w: &mut W) {
    w.set_color(WIDGET_BG);
    w.set_label_color(TEXT_COLOR);
    w.set_frame(FrameType::FlatBox);
}

fn style_choice(w: &mut Choice) {
    w.set_color(WIDGET_BG);
    w.set_text_color(TEXT_COLOR);
    w.set_frame(FrameType::FlatBox);
    w.set_selection_color(Color::from_rgb(80, 80, 80));
}

fn fatal(err: &anyhow::Error) -> ! {
    error!("{err:#}");
    dialog::alert_default(&format!("{err:#}"));
    std::process::exit(1);
}

fn populate_ports(choice: &mut Choice, ports: &[String], selected: Option<&str>) {
    choice.clear();
    for port in ports {
        // FLTK menus treat '/' as a submenu separator.
        choice.add_choice(&port.replace('/', "\\/"));
    }
    if let Some(selected) = selected {
        if let Some(idx) = ports.iter().position(|p| p == selected) {
            choice.set_value(idx as i32);
        }
    }
}

fn refresh_table(table_pack: &mut Pack, map: &MediaMap) {
    table_pack.clear();
    table_pack.begin();
    for (key, media) in map.rows() {
        let mut row = Flex::default().row().with_size(0, 28);
        row.set_pad(10);
        let mut lbl_key = Frame::default().with_label(key);
        lbl_key.set_label_color(TEXT_COLOR);
        let mut lbl_path = Frame::default().with_label(&media.display().to_string());
        lbl_path.set_label_color(TEXT_COLOR);
        lbl_path.set_align(Align::Inside | Align::Left);
        row.end();
        let _ = row.fixed(&lbl_key, 50);
    }
    table_pack.end();
    table_pack.redraw();
    if let Some(mut parent) = table_pack.parent() {
        parent.redraw();
    }
}

enum UiMsg {
    Start,
    Quit,
}

/// A running playback session: the full-screen surface, the serial reader
/// feeding `rx`, and the dispatch state. Lives until the process exits.
struct Session {
    map: MediaMap,
    dispatcher: Dispatcher,
    player: Player,
    rx: mpsc::Receiver<String>,
    port_name: String,
    _screen: Window,
}

fn start_session(cfg: &AppSettings) -> Result<Session> {
    let map = MediaMap::load(&settings::mapping_file())?;
    if map.is_empty() {
        warn!("key table is empty; no key will match");
    }
    let port_name =
        store::load_port(&settings::port_file()).context("no serial port configured")?;
    let port = serial::open(&port_name, cfg.baud)?;

    let mut screen = Window::default().with_size(1280, 720).with_label("cueplay");
    screen.set_color(Color::Black);
    screen.set_border(false);
    screen.end();
    // A kiosk screen has no close path; the session ends with the process.
    screen.set_callback(|_| {});
    screen.show();
    screen.fullscreen(true);

    let player = Player::new(screen.raw_handle() as i64, cfg.loop_playback)?;

    let (tx, rx) = mpsc::channel();
    serial::spawn_reader(port, tx);
    info!("listening on {port_name} at {} baud", cfg.baud);

    Ok(Session {
        map,
        dispatcher: Dispatcher::new(cfg.keycheck),
        player,
        rx,
        port_name,
        _screen: screen,
    })
}

pub fn run() -> Result<()> {
    let app = app::App::default();
    let (bg_r, bg_g, bg_b) = BG_COLOR.to_rgb();
    app::set_background_color(bg_r, bg_g, bg_b);
    let (fg_r, fg_g, fg_b) = TEXT_COLOR.to_rgb();
    app::set_foreground_color(fg_r, fg_g, fg_b);
    app::set_font_size(14);

    let cfg = AppSettings::load(&settings::settings_path());
    let port_file = settings::port_file();
    let mapping_file = settings::mapping_file();

    let mut win = Window::default()
        .with_size(480, 680)
        .with_label("cueplay configuration");
    win.set_color(BG_COLOR);

    let mut col = Flex::default().column().with_size(480, 680).center_of_parent();
    col.set_margin(15);
    col.set_pad(10);

    let mut title = Frame::default().with_label("cueplay");
    title.set_label_size(24);

    let mut row_serial = Flex::default().row();
    let lbl_port = Frame::default().with_label("Serial:");
    let mut choice_port = Choice::default();
    style_choice(&mut choice_port);
    let mut choice_baud = Choice::default();
    style_choice(&mut choice_baud);
    for baud in BAUD_RATES {
        choice_baud.add_choice(&baud.to_string());
    }
    let mut btn_scan = Button::default().with_label("Scan");
    style_widget(&mut btn_scan);
    row_serial.end();
    let _ = row_serial.fixed(&lbl_port, 60);
    let _ = row_serial.fixed(&choice_baud, 90);
    let _ = row_serial.fixed(&btn_scan, 60);

    let mut row_table_header = Flex::default().row();
    let mut lbl_table = Frame::default().with_label("Key Files");
    lbl_table.set_label_size(16);
    let mut btn_add = Button::default().with_label("+ Add");
    style_widget(&mut btn_add);
    let mut btn_clear = Button::default().with_label("Clear");
    style_widget(&mut btn_clear);
    row_table_header.end();
    let _ = row_table_header.fixed(&btn_add, 60);
    let _ = row_table_header.fixed(&btn_clear, 60);

    let mut scroll = Scroll::default();
    scroll.set_color(BG_COLOR);
    let mut table_pack = Pack::default().with_size(440, 0);
    table_pack.set_spacing(5);
    table_pack.end();
    scroll.end();

    let row_toggles = Flex::default().row();
    let mut check_loop = CheckButton::default().with_label("Loop playback");
    check_loop.set_label_color(TEXT_COLOR);
    check_loop.set_value(cfg.loop_playback);
    let mut check_keycheck = CheckButton::default().with_label("Ignore repeated keys");
    check_keycheck.set_label_color(TEXT_COLOR);
    check_keycheck.set_value(cfg.keycheck);
    row_toggles.end();

    let mut log_buf = TextBuffer::default();
    let mut log_pane = TextDisplay::default();
    log_pane.set_buffer(log_buf.clone());
    log_pane.set_color(WIDGET_BG);
    log_pane.set_text_color(TEXT_COLOR);

    let row_btns = Flex::default().row();
    let mut btn_start = Button::default().with_label("Start");
    style_widget(&mut btn_start);
    btn_start.set_color(Color::from_rgb(60, 60, 60));
    let mut btn_quit = Button::default().with_label("Quit");
    style_widget(&mut btn_quit);
    row_btns.end();

    col.end();
    let _ = col.fixed(&title, 40);
    let _ = col.fixed(&row_serial, 30);
    let _ = col.fixed(&row_table_header, 30);
    let _ = col.fixed(&row_toggles, 30);
    let _ = col.fixed(&log_pane, 140);
    let _ = col.fixed(&row_btns, 40);

    win.end();
    win.show();

    // Shared state for the callbacks
    let ports_state = Arc::new(Mutex::new(serial::available_ports()));
    let map_state = Arc::new(Mutex::new(
        MediaMap::load(&mapping_file).unwrap_or_else(|err| fatal(&err)),
    ));
    let (ui_tx, ui_rx) = mpsc::channel::<UiMsg>();

    {
        let ports = ports_state.lock().unwrap();
        populate_ports(&mut choice_port, &ports, store::load_port(&port_file).as_deref());
    }
    if let Some(idx) = BAUD_RATES.iter().position(|&b| b == cfg.baud) {
        choice_baud.set_value(idx as i32);
    }
    refresh_table(&mut table_pack, &map_state.lock().unwrap());

    // Callbacks
    {
        let ports_state = ports_state.clone();
        let port_file = port_file.clone();
        choice_port.set_callback(move |c| {
            if c.value() < 0 {
                return;
            }
            let ports = ports_state.lock().unwrap();
            if let Some(port) = ports.get(c.value() as usize) {
                if let Err(err) = store::save_port(&port_file, port) {
                    error!("{err:#}");
                }
            }
        });
    }

    {
        let ports_state = ports_state.clone();
        let port_file = port_file.clone();
        let mut choice_port = choice_port.clone();
        btn_scan.set_callback(move |_| {
            let mut ports = ports_state.lock().unwrap();
            *ports = serial::available_ports();
            populate_ports(&mut choice_port, &ports, store::load_port(&port_file).as_deref());
        });
    }

    {
        let map_state = map_state.clone();
        let mapping_file = mapping_file.clone();
        let mut table_pack = table_pack.clone();
        btn_add.set_callback(move |_| {
            let mut chooser =
                dialog::NativeFileChooser::new(dialog::NativeFileChooserType::BrowseFile);
            chooser.show();
            let media: PathBuf = chooser.filename();
            if media.as_os_str().is_empty() {
                return;
            }
            let mut map = map_state.lock().unwrap();
            let key = map.next_key();
            if let Err(err) = store::append_mapping(&mapping_file, &key, &media) {
                error!("{err:#}");
                dialog::alert_default(&format!("{err:#}"));
                return;
            }
            match MediaMap::load(&mapping_file) {
                Ok(reloaded) => *map = reloaded,
                Err(err) => error!("{err:#}"),
            }
            refresh_table(&mut table_pack, &map);
        });
    }

    {
        let map_state = map_state.clone();
        let mapping_file = mapping_file.clone();
        let mut table_pack = table_pack.clone();
        btn_clear.set_callback(move |_| {
            if let Err(err) = store::clear_mapping(&mapping_file) {
                error!("{err:#}");
                dialog::alert_default(&format!("{err:#}"));
                return;
            }
            let mut map = map_state.lock().unwrap();
            *map = MediaMap::default();
            refresh_table(&mut table_pack, &map);
        });
    }

    {
        let ui_tx = ui_tx.clone();
        btn_start.set_callback(move |_| {
            let _ = ui_tx.send(UiMsg::Start);
        });
    }
    {
        let ui_tx = ui_tx.clone();
        btn_quit.set_callback(move |_| {
            let _ = ui_tx.send(UiMsg::Quit);
        });
    }
    {
        let ui_tx = ui_tx.clone();
        win.set_callback(move |_| {
            let _ = ui_tx.send(UiMsg::Quit);
        });
    }

    let mut session: Option<Session> = None;
    loop {
        app::check();

        if let Ok(msg) = ui_rx.try_recv() {
            match msg {
                UiMsg::Start if session.is_none() => {
                    let session_cfg = AppSettings {
                        baud: choice_baud
                            .choice()
                            .and_then(|s| s.parse().ok())
                            .unwrap_or(cfg.baud),
                        loop_playback: check_loop.value(),
                        keycheck: check_keycheck.value(),
                    };
                    if let Err(err) = session_cfg.save(&settings::settings_path()) {
                        warn!("{err:#}");
                    }
                    match start_session(&session_cfg) {
                        Ok(s) => {
                            log_buf.append(&format!(
                                "listening on {} at {} baud\n",
                                s.port_name, session_cfg.baud
                            ));
                            choice_port.deactivate();
                            choice_baud.deactivate();
                            btn_scan.deactivate();
                            btn_add.deactivate();
                            btn_clear.deactivate();
                            check_loop.deactivate();
                            check_keycheck.deactivate();
                            btn_start.deactivate();
                            session = Some(s);
                        }
                        Err(err) => fatal(&err),
                    }
                }
                UiMsg::Start => {}
                UiMsg::Quit => {
                    app.quit();
                    break;
                }
            }
        }

        if let Some(s) = session.as_mut() {
            // Single consumer: keys are dispatched strictly in arrival
            // order, which the suppression rule depends on.
            while let Ok(key) = s.rx.try_recv() {
                let event = s.dispatcher.dispatch(&key, &s.map);
                event.emit();
                log_buf.append(&format!("{event}\n"));
                if let DispatchEvent::Played(_, media) = &event {
                    if let Err(err) = s.player.play(media) {
                        error!("{err:#}");
                        dialog::alert_default(&format!("{err:#}"));
                    }
                }
            }
        }

        std::thread::sleep(Duration::from_millis(16));
    }
    Ok(())
}
