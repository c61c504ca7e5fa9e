use eframe::egui;

/// Title bar with the signed-in identity. Returns `true` when "Log Out" was clicked.
pub fn render(ui: &mut egui::Ui, email: Option<&str>, logging_out: bool) -> bool {
    let mut logout = false;
    ui.horizontal(|ui| {
        ui.heading("ChatBot");
        let Some(email) = email else {
            return;
        };
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let label = if logging_out { "Logging Out..." } else { "Log Out" };
            if ui.add_enabled(!logging_out, egui::Button::new(label)).clicked() {
                logout = true;
            }
            ui.label(format!("Logged in as : {email}"));
        });
    });
    logout
}

/// Modal asking to confirm the log out. `Some(answer)` once the user picked.
pub fn confirm_logout(ctx: &egui::Context) -> Option<bool> {
    let mut answer = None;
    egui::Window::new("Log Out")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label("Are you sure you want to log out?");
            ui.horizontal(|ui| {
                if ui.button("Log Out").clicked() {
                    answer = Some(true);
                }
                if ui.button("Cancel").clicked() {
                    answer = Some(false);
                }
            });
        });
    answer
}
