use eframe::egui;

use super::controller::{FeedbackController, StatusKind, DESCRIPTION, EXAMPLES, TITLE};
use crate::core::Sentiment;
use crate::pipelines::sentiment_analysis_pipeline::SentimentClassifier;

pub const MIN_VIEWPORT_SIZE: egui::Vec2 = egui::vec2(560.0, 520.0);

/// egui front end over a [`FeedbackController`].
pub struct FeedbackApp<C> {
    controller: FeedbackController<C>,
}

impl<C: SentimentClassifier> FeedbackApp<C> {
    pub fn new(controller: FeedbackController<C>) -> Self {
        Self { controller }
    }

    fn input_section(&mut self, ui: &mut egui::Ui) {
        ui.add(
            egui::TextEdit::multiline(self.controller.input_mut())
                .desired_rows(5)
                .desired_width(f32::INFINITY)
                .hint_text("Write your text here..."),
        );
        ui.horizontal(|ui| {
            if ui.button("Submit").clicked() {
                self.controller.submit();
            }
            if ui.button("Clear").clicked() {
                self.controller.set_input("");
                self.controller.submit();
            }
        });

        ui.add_space(4.0);
        ui.label("Examples");
        for (index, example) in EXAMPLES.iter().enumerate() {
            if ui.link(*example).clicked() {
                self.controller.load_example(index);
            }
        }
    }

    fn result_section(&mut self, ui: &mut egui::Ui) {
        ui.strong("Sentiment result");
        let distribution = self.controller.distribution();
        if distribution.is_empty() {
            ui.weak("No result yet.");
        }
        for (label, score) in distribution {
            ui.horizontal(|ui| {
                ui.add_sized([80.0, 18.0], egui::Label::new(label.display_name()));
                ui.add(
                    egui::ProgressBar::new(score.clamp(0.0, 1.0))
                        .text(format!("{:.1}%", score * 100.0)),
                );
            });
        }
    }

    fn correction_section(&mut self, ui: &mut egui::Ui) {
        if !self.controller.is_correction_open() {
            if ui.button("Wrong prediction? Correct it").clicked() {
                self.controller.open_correction();
            }
            return;
        }

        ui.label("Select the correct sentiment:");
        ui.horizontal(|ui| {
            for label in Sentiment::ALL {
                ui.radio_value(
                    self.controller.selected_correction_mut(),
                    Some(label),
                    label.display_name(),
                );
            }
        });
        if ui.button("Save correction").clicked() {
            self.controller.save_correction();
        }
    }

    fn status_line(&self, ui: &mut egui::Ui) {
        let Some(status) = self.controller.status() else {
            return;
        };
        let color = match status.kind {
            StatusKind::Info => egui::Color32::from_rgb(80, 170, 90),
            StatusKind::Warning => egui::Color32::from_rgb(220, 170, 40),
            StatusKind::Error => egui::Color32::from_rgb(220, 70, 60),
        };
        ui.colored_label(color, &status.text);
    }
}

impl<C: SentimentClassifier> eframe::App for FeedbackApp<C> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.spacing_mut().item_spacing = egui::vec2(8.0, 8.0);
            ui.heading(TITLE);
            ui.label(DESCRIPTION);
            ui.separator();

            self.input_section(ui);
            ui.separator();
            self.result_section(ui);
            ui.separator();
            self.correction_section(ui);
            self.status_line(ui);
        });
    }
}

/// Minimal fallback app to display startup errors.
pub struct LaunchError {
    pub message: String,
}

impl eframe::App for LaunchError {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("Failed to start");
                ui.label(&self.message);
            });
        });
    }
}
