use eframe::egui;

use crate::common::{Message, Role};

const USER_BUBBLE: egui::Color32 = egui::Color32::from_rgb(0, 123, 255);
const ASSISTANT_BUBBLE: egui::Color32 = egui::Color32::from_rgb(233, 236, 239);

pub fn render(ui: &mut egui::Ui, transcript: &[Message]) {
    egui::ScrollArea::vertical()
        .auto_shrink([false; 2])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            if transcript.is_empty() {
                ui.vertical_centered(|ui| {
                    ui.label(
                        egui::RichText::new("Start chatting by typing a message below!").weak(),
                    );
                });
                return;
            }

            for message in transcript {
                bubble(ui, message);
                ui.add_space(8.0);
            }
        });
}

fn bubble(ui: &mut egui::Ui, message: &Message) {
    let (layout, fill, text_color) = match message.role {
        Role::User => (
            egui::Layout::right_to_left(egui::Align::TOP),
            USER_BUBBLE,
            egui::Color32::WHITE,
        ),
        Role::Assistant => (
            egui::Layout::left_to_right(egui::Align::TOP),
            ASSISTANT_BUBBLE,
            egui::Color32::from_rgb(33, 37, 41),
        ),
    };

    let max_width = ui.available_width() * 0.7;
    ui.with_layout(layout, |ui| {
        egui::Frame::new()
            .fill(fill)
            .inner_margin(egui::Margin::symmetric(12, 8))
            .corner_radius(egui::CornerRadius::same(12))
            .show(ui, |ui| {
                ui.set_max_width(max_width);
                ui.add(
                    egui::Label::new(egui::RichText::new(&message.content).color(text_color))
                        .wrap(),
                );
            });
    });
}
