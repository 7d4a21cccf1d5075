//! Custom widgets: pure black and white

use egui::{Response, Sense, Stroke, Ui, Widget};
use crate::theme::SlowColors;

/// Status bar: white bg, 1px black top border
pub fn status_bar(ui: &mut Ui, text: &str) {
    egui::Frame::none()
        .fill(SlowColors::WHITE)
        .stroke(Stroke::new(1.0, SlowColors::BLACK))
        .inner_margin(egui::Margin::symmetric(8.0, 2.0))
        .show(ui, |ui| {
            ui.label(text);
        });
}

/// File list item for open dialogs. Selected items are drawn inverted.
pub struct FileListItem<'a> {
    name: &'a str,
    is_directory: bool,
    selected: bool,
}

impl<'a> FileListItem<'a> {
    pub fn new(name: &'a str, is_directory: bool) -> Self {
        Self { name, is_directory, selected: false }
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

impl<'a> Widget for FileListItem<'a> {
    fn ui(self, ui: &mut Ui) -> Response {
        let height = 20.0;
        let (rect, response) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), height),
            Sense::click(),
        );

        if ui.is_rect_visible(rect) {
            let painter = ui.painter();
            let (fill, text_color) = if self.selected {
                (SlowColors::BLACK, SlowColors::WHITE)
            } else {
                (SlowColors::WHITE, SlowColors::BLACK)
            };
            painter.rect_filled(rect, 0.0, fill);
            if response.hovered() && !self.selected {
                painter.rect_stroke(rect.shrink(1.0), 0.0, Stroke::new(1.0, SlowColors::BLACK));
            }

            let icon = if self.is_directory { "📁" } else { "📄" };
            painter.text(
                egui::pos2(rect.min.x + 12.0, rect.center().y),
                egui::Align2::CENTER_CENTER,
                icon,
                egui::FontId::proportional(12.0),
                text_color,
            );
            painter.text(
                egui::pos2(rect.min.x + 24.0, rect.center().y),
                egui::Align2::LEFT_CENTER,
                self.name,
                egui::FontId::proportional(12.0),
                text_color,
            );
        }

        response
    }
}

/// Share of `[minimum, maximum]` covered by `value`, in `0.0..=1.0`.
/// An empty or inverted range reads as zero.
pub fn progress_fraction(value: i64, minimum: i64, maximum: i64) -> f32 {
    if maximum <= minimum {
        return 0.0;
    }
    let span = (maximum - minimum) as f64;
    (((value - minimum) as f64) / span).clamp(0.0, 1.0) as f32
}

/// Bounded progress bar: white track, black fill, position marker.
/// Clicking it reports the value under the pointer.
pub struct ProgressTrack {
    value: i64,
    minimum: i64,
    maximum: i64,
    width: f32,
}

impl ProgressTrack {
    pub fn new(value: i64, minimum: i64, maximum: i64) -> Self {
        Self { value, minimum, maximum, width: 200.0 }
    }

    pub fn width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    /// Draw the track. Returns the clicked value, if any.
    pub fn show(self, ui: &mut Ui) -> Option<i64> {
        let (rect, response) = ui.allocate_exact_size(egui::vec2(self.width, 16.0), Sense::click());

        if ui.is_rect_visible(rect) {
            let painter = ui.painter();
            painter.rect_filled(rect, 0.0, SlowColors::WHITE);
            painter.rect_stroke(rect, 0.0, Stroke::new(1.0, SlowColors::BLACK));

            let fill_w = rect.width() * progress_fraction(self.value, self.minimum, self.maximum);
            let fill_rect = egui::Rect::from_min_size(rect.min, egui::vec2(fill_w, rect.height()));
            painter.rect_filled(fill_rect, 0.0, SlowColors::BLACK);

            let marker_x = rect.min.x + fill_w;
            if marker_x < rect.max.x {
                painter.vline(marker_x, rect.y_range(), Stroke::new(2.0, SlowColors::BLACK));
            }
        }

        if !response.clicked() || self.maximum <= self.minimum {
            return None;
        }
        let pos = response.interact_pointer_pos()?;
        let rel = ((pos.x - rect.min.x) / rect.width()).clamp(0.0, 1.0) as f64;
        Some(self.minimum + (rel * (self.maximum - self.minimum) as f64) as i64)
    }
}

/// Glyph drawn on a transport button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportGlyph {
    Play,
    Pause,
    Back,
    Forward,
}

/// Square transport button with a painted glyph.
pub struct TransportButton {
    glyph: TransportGlyph,
    size: f32,
}

impl TransportButton {
    pub fn new(glyph: TransportGlyph) -> Self {
        Self { glyph, size: 36.0 }
    }

    pub fn size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }
}

impl Widget for TransportButton {
    fn ui(self, ui: &mut Ui) -> Response {
        let (rect, response) = ui.allocate_exact_size(egui::vec2(self.size, self.size), Sense::click());
        if !ui.is_rect_visible(rect) {
            return response;
        }

        let pressed = response.is_pointer_button_down_on();
        let (bg, fg) = if pressed {
            (SlowColors::BLACK, SlowColors::WHITE)
        } else {
            (SlowColors::WHITE, SlowColors::BLACK)
        };
        let painter = ui.painter();
        painter.rect_filled(rect, 0.0, bg);
        painter.rect_stroke(rect, 0.0, Stroke::new(1.0, SlowColors::BLACK));
        if response.hovered() && !pressed {
            painter.rect_stroke(rect.shrink(2.0), 0.0, Stroke::new(1.0, SlowColors::BLACK));
        }

        let c = rect.center();
        let r = self.size * 0.25;
        let arrow = |cx: f32, half_width: f32, dir: f32| {
            let points = vec![
                egui::pos2(cx - dir * half_width, c.y - r),
                egui::pos2(cx + dir * half_width, c.y),
                egui::pos2(cx - dir * half_width, c.y + r),
            ];
            egui::Shape::convex_polygon(points, fg, Stroke::NONE)
        };
        match self.glyph {
            TransportGlyph::Play => {
                painter.add(arrow(c.x, r, 1.0));
            }
            TransportGlyph::Pause => {
                let bar = egui::vec2(r * 0.6, r * 2.0);
                for dx in [-r * 0.6, r * 0.6] {
                    let bar_rect = egui::Rect::from_center_size(egui::pos2(c.x + dx, c.y), bar);
                    painter.rect_filled(bar_rect, 0.0, fg);
                }
            }
            TransportGlyph::Back | TransportGlyph::Forward => {
                let dir = if self.glyph == TransportGlyph::Forward { 1.0 } else { -1.0 };
                let half = r * 0.5;
                for cx in [c.x - half, c.x + half] {
                    painter.add(arrow(cx, half, dir));
                }
            }
        }

        response
    }
}
