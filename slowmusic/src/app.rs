//! SlowMusic - open one file, play it, pause it, seek through it

use crate::controller::PlaybackController;
use crate::engine::TrackMetadata;
use crate::rodio_engine::RodioEngine;
use crate::settings::Settings;
use crate::tags::display_title;
use crate::view::format_clock;
use egui::{Context, Key, RichText};
use slowcore::storage::FileBrowser;
use slowcore::theme::{menu_bar, SlowColors};
use slowcore::widgets::{status_bar, FileListItem, ProgressTrack, TransportButton, TransportGlyph};
use std::path::PathBuf;
use std::time::Duration;

const AUDIO_EXTENSIONS: [&str; 3] = ["mp3", "m4a", "wav"];
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const TRACK_WIDTH: f32 = 220.0;
const CLOCK_LABELS_WIDTH: f32 = 96.0;
const TRANSPORT_WIDTH: f32 = 132.0;

/// Title size; larger once tags have loaded.
fn title_size(emphasized: bool) -> f32 {
    if emphasized { 20.0 } else { 16.0 }
}

/// Left padding that centres `content` wide items; never negative.
fn centering_space(available: f32, content: f32) -> f32 {
    ((available - content) / 2.0).max(0.0)
}

pub struct SlowMusicApp {
    controller: PlaybackController<RodioEngine>,
    file_browser: FileBrowser,
    show_file_browser: bool,
    show_about: bool,
}

impl SlowMusicApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        let file_browser = FileBrowser::new(settings.start_dir()).with_filter(AUDIO_EXTENSIONS);
        Self {
            controller: PlaybackController::new(RodioEngine::new(), &settings),
            file_browser,
            show_file_browser: false,
            show_about: false,
        }
    }

    fn handle_keys(&mut self, ctx: &Context) {
        slowcore::theme::consume_special_keys(ctx);
        if self.show_file_browser {
            return;
        }
        ctx.input(|i| {
            if i.key_pressed(Key::Space) { self.controller.toggle_play_pause(); }
            if i.key_pressed(Key::ArrowLeft) { self.controller.seek_backward(); }
            if i.key_pressed(Key::ArrowRight) { self.controller.seek_forward(); }
            if i.modifiers.command && i.key_pressed(Key::O) { self.open_prompt(); }
        });
    }

    fn handle_dropped_files(&mut self, ctx: &Context) {
        let dropped: Option<PathBuf> = ctx.input(|i| {
            i.raw.dropped_files.iter().find_map(|file| file.path.clone())
        });
        if let Some(path) = dropped {
            self.show_file_browser = false;
            self.controller.file_selected(Some(path));
        }
    }

    fn open_prompt(&mut self) {
        self.file_browser.refresh();
        self.show_file_browser = true;
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        let view = self.controller.view();
        let progress = view.progress;
        let icon = view.icon;
        let title_text = if !view.title.is_empty() {
            view.title.clone()
        } else {
            // Tags not loaded (or unreadable): name the file instead
            self.controller.source()
                .map(|path| display_title(&TrackMetadata::default(), path))
                .unwrap_or_else(|| "no track".into())
        };
        let mut title = RichText::new(title_text).size(title_size(view.title_emphasized));
        if view.title_emphasized {
            title = title.strong();
        }
        let artist = view.artist.clone();

        let mut seek_target = None;
        let mut pressed = None;
        ui.vertical_centered(|ui| {
            ui.add_space(8.0);
            ui.label(title);
            ui.label(artist);
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                ui.add_space(centering_space(ui.available_width(), TRACK_WIDTH + CLOCK_LABELS_WIDTH));
                ui.label(format_clock(progress.value));
                seek_target = ProgressTrack::new(progress.value, progress.minimum, progress.maximum)
                    .width(TRACK_WIDTH)
                    .show(ui);
                let total = if progress.maximum > 0 { format_clock(progress.maximum) } else { "--:--".into() };
                ui.label(total);
            });
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                ui.add_space(centering_space(ui.available_width(), TRANSPORT_WIDTH));
                let buttons = [(TransportGlyph::Back, 36.0), (icon, 44.0), (TransportGlyph::Forward, 36.0)];
                for (glyph, size) in buttons {
                    if ui.add(TransportButton::new(glyph).size(size)).clicked() {
                        pressed = Some(glyph);
                    }
                }
            });
        });

        if let Some(ms) = seek_target {
            self.controller.seek_to(ms);
        }
        match pressed {
            Some(TransportGlyph::Back) => self.controller.seek_backward(),
            Some(TransportGlyph::Forward) => self.controller.seek_forward(),
            Some(TransportGlyph::Play | TransportGlyph::Pause) => self.controller.toggle_play_pause(),
            None => {}
        }
    }

    fn status_text(&self) -> String {
        match self.controller.source() {
            Some(path) => {
                let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                let state = if self.controller.is_playing() { "playing" } else { "paused" };
                format!("{}  |  {}  |  volume: {}%", name, state, self.controller.volume())
            }
            None => format!("no file  |  volume: {}%  |  ⌘o to open", self.controller.volume()),
        }
    }

    fn render_file_browser(&mut self, ctx: &Context) {
        let mut chosen: Option<Option<PathBuf>> = None;
        egui::Window::new("open").collapsible(false).resizable(false).default_width(380.0)
            .show(ctx, |ui| {
                ui.label(self.file_browser.current_dir.to_string_lossy().to_string());
                ui.separator();
                egui::ScrollArea::vertical().max_height(220.0).show(ui, |ui| {
                    let entries = self.file_browser.entries.clone();
                    for (idx, entry) in entries.iter().enumerate() {
                        let sel = self.file_browser.selected_index == Some(idx);
                        let r = ui.add(FileListItem::new(&entry.name, entry.is_directory).selected(sel));
                        if r.clicked() { self.file_browser.selected_index = Some(idx); }
                        if r.double_clicked() {
                            if entry.is_directory { self.file_browser.navigate_to(entry.path.clone()); }
                            else { chosen = Some(Some(entry.path.clone())); }
                        }
                    }
                });
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("cancel").clicked() { chosen = Some(None); }
                    if ui.button("open").clicked() {
                        match self.file_browser.selected_entry() {
                            Some(e) if e.is_directory => { let p = e.path.clone(); self.file_browser.navigate_to(p); }
                            Some(e) => chosen = Some(Some(e.path.clone())),
                            None => {}
                        }
                    }
                });
            });

        if let Some(selection) = chosen {
            self.show_file_browser = false;
            self.controller.file_selected(selection);
        }
    }

    fn render_warning(&mut self, ctx: &Context) {
        let Some(message) = self.controller.view().warning.clone() else {
            return;
        };
        egui::Window::new("slowMusic").collapsible(false).resizable(false).default_width(280.0)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("ok").clicked() { self.controller.dismiss_warning(); }
                });
            });
    }

    fn render_about(&mut self, ctx: &Context) {
        egui::Window::new("about slowMusic")
            .collapsible(false)
            .resizable(false)
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading("slowMusic");
                    ui.label(format!("version {}", env!("CARGO_PKG_VERSION")));
                    ui.add_space(8.0);
                    ui.label("one file at a time");
                });
                ui.add_space(8.0);
                ui.separator();
                ui.add_space(4.0);
                ui.label("supported formats:");
                ui.label("  MP3, M4A, WAV");
                ui.add_space(4.0);
                ui.label("keys:");
                ui.label("  space  play / pause");
                ui.label("  ← →  seek");
                ui.label("  ⌘o  open");
                ui.add_space(4.0);
                ui.label("frameworks:");
                ui.label("  egui/eframe (MIT), rodio (MIT)");
                ui.label("  symphonia (MPL-2.0), lofty (MIT)");
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("ok").clicked() { self.show_about = false; }
                });
            });
    }
}

impl eframe::App for SlowMusicApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);
        self.handle_keys(ctx);
        self.controller.pump_events();

        // Players report from their own threads; poll while one is bound
        if self.controller.source().is_some() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }

        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            menu_bar(ui, |ui| {
                ui.menu_button("file", |ui| {
                    if ui.button("open...  ⌘o").clicked() { self.open_prompt(); ui.close_menu(); }
                });
                ui.menu_button("help", |ui| {
                    if ui.button("about").clicked() { self.show_about = true; ui.close_menu(); }
                });
            });
        });
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            status_bar(ui, &self.status_text());
        });
        egui::CentralPanel::default().frame(
            egui::Frame::none().fill(SlowColors::WHITE).inner_margin(egui::Margin::same(8.0))
        ).show(ctx, |ui| self.render_controls(ui));

        if self.show_file_browser { self.render_file_browser(ctx); }
        if self.show_about { self.render_about(ctx); }
        self.render_warning(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centering_space() {
        assert_eq!(centering_space(400.0, 132.0), 134.0);
        assert_eq!(centering_space(132.0, 132.0), 0.0);
        // Narrow window: no negative padding
        assert_eq!(centering_space(250.0, TRACK_WIDTH + CLOCK_LABELS_WIDTH), 0.0);
    }

    #[test]
    fn test_loaded_title_is_larger() {
        assert!(title_size(true) > title_size(false));
    }
}
