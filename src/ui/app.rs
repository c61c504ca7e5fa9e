use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use tokio::runtime::Handle;

use crate::chat::{ChatController, ChatServices};
use crate::common::Route;
use crate::session::{EntryForm, EntryMode, GuardView, IdentityGateway, SessionGuard};

use super::components::{
    chat_area,
    entry_view::{self, EntryAction},
    header, input_bar,
};

pub struct ChatbotApp {
    runtime: Handle,
    services: ChatServices,
    route: Route,
    login: EntryForm,
    signup: EntryForm,
    /// Mounted while the chat route is shown.
    guard: Option<SessionGuard>,
    /// Mounted while the guard lets the chat view through.
    chat: Option<ChatController>,
}

impl ChatbotApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, services: ChatServices, runtime: Handle) -> Self {
        let mut app = Self {
            runtime,
            services,
            route: Route::Login,
            login: EntryForm::new(EntryMode::Login),
            signup: EntryForm::new(EntryMode::Signup),
            guard: None,
            chat: None,
        };
        app.navigate(Route::Chat);
        app
    }

    fn identity(&self) -> Arc<dyn IdentityGateway> {
        self.services.identity.clone()
    }

    fn navigate(&mut self, route: Route) {
        if route == self.route && (route != Route::Chat || self.guard.is_some()) {
            return;
        }
        log::info!("Navigating to {}", route.path());

        // Unmount the chat view; both subscriptions are released here.
        self.chat = None;
        self.guard = None;

        self.route = route;
        if route == Route::Chat {
            self.guard = Some(SessionGuard::mount(self.services.identity.as_ref()));
        }
    }

    fn show_entry(&mut self, ctx: &egui::Context, mode: EntryMode) {
        let identity = self.identity();
        let form = match mode {
            EntryMode::Login => &mut self.login,
            EntryMode::Signup => &mut self.signup,
        };

        let mut next = form.poll();
        egui::CentralPanel::default().show(ctx, |ui| match entry_view::render(ui, form) {
            Some(EntryAction::Submit) => form.submit(identity, &self.runtime),
            Some(EntryAction::Navigate(route)) => next = Some(route),
            None => {}
        });

        if let Some(route) = next {
            self.navigate(route);
        }
    }

    fn show_guarded_chat(&mut self, ctx: &egui::Context) {
        let Some(guard) = self.guard.as_mut() else {
            self.navigate(Route::Chat);
            return;
        };

        let view = guard.poll().clone();
        match view {
            GuardView::Loading => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(40.0);
                        ui.spinner();
                        ui.label("Loading...");
                    });
                });
            }
            GuardView::RedirectToLogin => self.navigate(Route::Login),
            GuardView::Protected(_) => self.show_chat(ctx),
        }
    }

    fn show_chat(&mut self, ctx: &egui::Context) {
        let services = self.services.clone();
        let runtime = self.runtime.clone();
        let chat = self
            .chat
            .get_or_insert_with(|| ChatController::mount(services, runtime));
        chat.poll();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            let email = chat.session().map(|session| session.email.clone());
            if header::render(ui, email.as_deref(), chat.is_logging_out()) {
                chat.request_logout();
            }
        });

        if chat.is_confirming_logout() {
            match header::confirm_logout(ctx) {
                Some(true) => chat.confirm_logout(),
                Some(false) => chat.cancel_logout(),
                None => {}
            }
        }

        egui::TopBottomPanel::bottom("composer").show(ctx, |ui| {
            ui.add_space(8.0);
            let ready = chat.can_edit();
            if input_bar::render(ui, chat.draft_mut(), ready) {
                chat.send_message();
            }
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(ready, egui::Button::new("Clear Chat History"))
                    .clicked()
                {
                    chat.clear_history();
                }
                let load_failed = chat.session().is_some()
                    && !chat.is_loading_history()
                    && !chat.is_history_loaded();
                if load_failed && ui.button("Reload History").clicked() {
                    chat.reload_history();
                }
                if chat.is_sending() || chat.is_loading_history() {
                    ui.spinner();
                }
            });
            if let Some(error) = chat.pending_error().map(str::to_string) {
                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::from_rgb(220, 53, 69), error);
                    if ui.small_button("Dismiss").clicked() {
                        chat.dismiss_error();
                    }
                });
            }
            ui.add_space(8.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            chat_area::render(ui, chat.transcript());
        });

        if let Some(route) = chat.take_navigation() {
            self.navigate(route);
        }
    }
}

impl eframe::App for ChatbotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.route {
            Route::Login => self.show_entry(ctx, EntryMode::Login),
            Route::Signup => self.show_entry(ctx, EntryMode::Signup),
            Route::Chat => self.show_guarded_chat(ctx),
        }

        // Background results arrive over channels; keep polling while idle.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
