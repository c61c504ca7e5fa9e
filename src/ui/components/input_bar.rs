use eframe::egui;

/// Draft field with a send button. Returns `true` when the user asked to send.
///
/// The field stays editable while `can_send` is false; only the button and
/// Enter are disabled. The controller clears the draft once the reply is in.
pub fn render(ui: &mut egui::Ui, draft: &mut String, can_send: bool) -> bool {
    let mut send = false;
    ui.horizontal(|ui| {
        let field = egui::TextEdit::singleline(draft)
            .hint_text("Type your message...")
            .desired_width(ui.available_width() - 80.0);
        let response = ui.add(field);
        if ui.add_enabled(can_send, egui::Button::new("Send")).clicked() {
            send = true;
        }

        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            send = true;
        }
    });

    send && can_send
}
