mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;
use ui::{app::SETTINGS_STORAGE_KEY, PersistedSettings, ReviewApp};

#[derive(Parser, Debug)]
#[command(name = "litreview-gui", about = "Desktop window for the literature review workflow")]
struct Args {
    #[arg(long, env = "LITREVIEW_SERVER_URL", default_value = "http://127.0.0.1:5000")]
    server_url: String,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(args.server_url.clone(), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Systematic Literature Review")
            .with_inner_size([1100.0, 820.0])
            .with_min_inner_size([760.0, 560.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Systematic Literature Review",
        options,
        Box::new(move |cc| {
            let settings = cc.storage.and_then(|storage| {
                storage
                    .get_string(SETTINGS_STORAGE_KEY)
                    .and_then(|text| serde_json::from_str::<PersistedSettings>(&text).ok())
            });
            Ok(Box::new(ReviewApp::new(
                cmd_tx,
                ui_rx,
                args.server_url,
                settings,
            )))
        }),
    )
}
