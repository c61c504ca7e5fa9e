use eframe::egui;

use crate::common::Route;
use crate::session::{EntryForm, EntryMode};

pub enum EntryAction {
    Submit,
    Navigate(Route),
}

/// Login or signup form.
pub fn render(ui: &mut egui::Ui, form: &mut EntryForm) -> Option<EntryAction> {
    let mut action = None;
    let mode = form.mode();

    ui.vertical_centered(|ui| {
        ui.set_max_width(400.0);
        ui.add_space(40.0);
        ui.heading(mode.title());
        ui.add_space(12.0);

        if let Some(error) = form.error() {
            ui.colored_label(egui::Color32::RED, error);
            ui.add_space(6.0);
        }

        let submitting = form.is_submitting();
        ui.add_enabled(
            !submitting,
            egui::TextEdit::singleline(&mut form.email).hint_text("Email"),
        );
        let password = ui.add_enabled(
            !submitting,
            egui::TextEdit::singleline(&mut form.password)
                .password(true)
                .hint_text("Password"),
        );
        ui.add_space(6.0);

        let submit_clicked = ui
            .add_enabled(!submitting, egui::Button::new(mode.title()))
            .clicked();
        let enter_pressed =
            password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if submitting {
            ui.spinner();
        } else if submit_clicked || enter_pressed {
            action = Some(EntryAction::Submit);
        }

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            let (prompt, link) = match mode {
                EntryMode::Login => ("Don't have an account?", "Sign Up"),
                EntryMode::Signup => ("Already have an account?", "Log In"),
            };
            ui.label(prompt);
            if ui.link(link).clicked() {
                action = Some(EntryAction::Navigate(mode.alternate()));
            }
        });
    });

    action
}
