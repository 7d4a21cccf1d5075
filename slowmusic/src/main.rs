//! slowMusic: a single-file music player for the Slow Computer

mod app;
mod controller;
mod decode;
mod engine;
mod rodio_engine;
mod settings;
mod tags;
mod view;

use app::SlowMusicApp;
use eframe::NativeOptions;
use settings::Settings;

fn main() -> eframe::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load();
    log::debug!("{:?}", settings);

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([420.0, 240.0])
            .with_title("slowMusic"),
        ..Default::default()
    };

    eframe::run_native(
        "slowMusic",
        options,
        Box::new(move |cc| {
            slowcore::SlowTheme::default().apply(&cc.egui_ctx);
            Box::new(SlowMusicApp::new(cc, settings))
        }),
    )
}
