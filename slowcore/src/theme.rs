//! Slow Computer look: black ink on white, square corners, 1px outlines.

use egui::{Color32, FontFamily, FontId, Rounding, Stroke, Style, TextStyle, Visuals};

/// The whole palette.
pub struct SlowColors;

impl SlowColors {
    pub const WHITE: Color32 = Color32::from_rgb(255, 255, 255);
    pub const BLACK: Color32 = Color32::from_rgb(0, 0, 0);
}

fn outline() -> Stroke {
    Stroke::new(1.0, SlowColors::BLACK)
}

/// Font sizes and spacing, in points.
pub struct SlowTheme {
    pub body: f32,
    pub heading: f32,
    pub small: f32,
    pub margin: f32,
    pub spacing: f32,
}

impl Default for SlowTheme {
    fn default() -> Self {
        Self { body: 14.0, heading: 22.0, small: 11.0, margin: 8.0, spacing: 4.0 }
    }
}

impl SlowTheme {
    pub fn apply(&self, ctx: &egui::Context) {
        let mut style = Style::default();
        let proportional = |size| FontId::new(size, FontFamily::Proportional);
        style.text_styles = [
            (TextStyle::Small, proportional(self.small)),
            (TextStyle::Body, proportional(self.body)),
            (TextStyle::Button, proportional(self.body)),
            (TextStyle::Heading, proportional(self.heading)),
            (TextStyle::Monospace, FontId::new(self.body, FontFamily::Monospace)),
        ]
        .into();
        style.visuals = Self::visuals();
        style.spacing.window_margin = egui::Margin::same(self.margin);
        style.spacing.item_spacing = egui::vec2(self.spacing, self.spacing);
        style.spacing.button_padding = egui::vec2(8.0, 4.0);
        ctx.set_style(style);
    }

    /// Light visuals with every fill white and every stroke black.
    pub fn visuals() -> Visuals {
        let mut v = Visuals::light();
        v.window_fill = SlowColors::WHITE;
        v.panel_fill = SlowColors::WHITE;
        v.faint_bg_color = SlowColors::WHITE;
        v.extreme_bg_color = SlowColors::WHITE;
        v.window_rounding = Rounding::ZERO;
        v.menu_rounding = Rounding::ZERO;
        v.window_stroke = outline();
        v.window_shadow = egui::epaint::Shadow::NONE;
        v.popup_shadow = egui::epaint::Shadow::NONE;
        v.selection.bg_fill = SlowColors::BLACK;
        v.selection.stroke = Stroke::new(1.0, SlowColors::WHITE);

        let w = &mut v.widgets;
        for state in [&mut w.noninteractive, &mut w.inactive, &mut w.hovered, &mut w.active, &mut w.open] {
            state.bg_fill = SlowColors::WHITE;
            state.weak_bg_fill = SlowColors::WHITE;
            state.bg_stroke = outline();
            state.fg_stroke = outline();
            state.rounding = Rounding::ZERO;
        }
        v
    }
}

/// Outlined strip for the top menu.
pub fn menu_bar<R>(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui) -> R) -> egui::InnerResponse<R> {
    let framed = egui::Frame::none()
        .fill(SlowColors::WHITE)
        .stroke(outline())
        .inner_margin(egui::Margin::symmetric(4.0, 2.0))
        .show(ui, |ui| ui.horizontal(add_contents).inner);
    egui::InnerResponse::new(framed.inner, framed.response)
}

/// Tab focus and Cmd +/-/= zoom are swallowed so that Space only ever
/// reaches the app's own shortcut.
fn is_reserved(event: &egui::Event) -> bool {
    match event {
        egui::Event::Key { key: egui::Key::Tab, .. } => true,
        egui::Event::Key { key, modifiers, .. } => {
            modifiers.command && matches!(key, egui::Key::Plus | egui::Key::Minus | egui::Key::Equals)
        }
        _ => false,
    }
}

/// Drop reserved key events before any widget sees them. Call first in `update`.
pub fn consume_special_keys(ctx: &egui::Context) {
    ctx.input_mut(|i| i.events.retain(|event| !is_reserved(event)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{Event, Key, Modifiers};

    fn key(key: Key, modifiers: Modifiers) -> Event {
        Event::Key { key, physical_key: None, pressed: true, repeat: false, modifiers }
    }

    #[test]
    fn test_reserved_keys() {
        assert!(is_reserved(&key(Key::Tab, Modifiers::NONE)));
        assert!(is_reserved(&key(Key::Plus, Modifiers::COMMAND)));
        assert!(is_reserved(&key(Key::Minus, Modifiers::COMMAND)));
        assert!(!is_reserved(&key(Key::Minus, Modifiers::NONE)));
        assert!(!is_reserved(&key(Key::Space, Modifiers::NONE)));
        assert!(!is_reserved(&key(Key::O, Modifiers::COMMAND)));
        assert!(!is_reserved(&Event::Text(" ".into())));
    }

    #[test]
    fn test_visuals_are_two_tone() {
        let v = SlowTheme::visuals();
        assert_eq!(v.panel_fill, SlowColors::WHITE);
        assert_eq!(v.window_fill, SlowColors::WHITE);
        assert_eq!(v.widgets.inactive.bg_fill, SlowColors::WHITE);
        assert_eq!(v.widgets.hovered.fg_stroke.color, SlowColors::BLACK);
        assert_eq!(v.selection.bg_fill, SlowColors::BLACK);
    }
}
