use eframe::egui::{self, Color32, Sense, Stroke};

use crate::canvas::{
    CanvasLayout, GRID_LINE_COLOR, GRID_LINE_WIDTH, MAX_PIXEL_AMOUNT, MIN_PIXEL_AMOUNT,
    SURFACE_BACKGROUND,
};

use super::super::PixelboardApp;

impl PixelboardApp {
    pub(crate) fn render_editor(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let slider = ui.add(
                egui::Slider::new(
                    &mut self.editor.pixel_amount,
                    MIN_PIXEL_AMOUNT..=MAX_PIXEL_AMOUNT,
                )
                .text("Pixels"),
            );
            if slider.changed() {
                // A new grid resolution re-derives the surface from scratch.
                self.canvas.clear();
                self.editor.pointer.release();
            }
            ui.color_edit_button_srgba(&mut self.editor.color);
            ui.checkbox(&mut self.editor.grid_enabled, "Grid");
            if ui.button("Clear").clicked() {
                self.canvas.clear();
            }
        });
        ui.separator();

        self.render_submit_form(ui);
        ui.separator();

        self.render_surface(ui);
    }

    fn render_submit_form(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Author");
            ui.add(
                egui::TextEdit::singleline(&mut self.upload.author_name).desired_width(140.0),
            );
            ui.label("Title");
            ui.add(egui::TextEdit::singleline(&mut self.upload.image_name).desired_width(140.0));

            let can_submit = !self.canvas.is_empty() && !self.upload.submitting;
            if ui
                .add_enabled(can_submit, egui::Button::new("Submit to gallery"))
                .clicked()
            {
                self.spawn_submit_drawing();
            }
            if self.upload.submitting {
                ui.spinner();
            }
        });
        if let Some(err) = &self.upload.error {
            ui.colored_label(Color32::LIGHT_RED, err);
        }
    }

    fn render_surface(&mut self, ui: &mut egui::Ui) {
        let avail = ui.available_size();
        let layout = CanvasLayout::compute(
            avail.x.max(0.0) as u32,
            avail.y.max(0.0) as u32,
            self.editor.pixel_amount,
        );
        let Some(layout) = layout else {
            self.editor.last_layout = None;
            ui.label("Window too small for the canvas.");
            return;
        };
        self.editor.last_layout = Some(layout);

        let size = egui::vec2(layout.surface_w as f32, layout.surface_h as f32);
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, SURFACE_BACKGROUND);

        let cell = layout.cell_size as f32;
        for (&(col, row), &color) in self.canvas.cells() {
            if col < 0 || row < 0 {
                continue;
            }
            let min = rect.min + egui::vec2(col as f32 * cell, row as f32 * cell);
            let cell_rect = egui::Rect::from_min_size(min, egui::vec2(cell, cell));
            if rect.contains_rect(cell_rect) {
                painter.rect_filled(cell_rect, 0.0, color);
            }
        }

        if self.editor.grid_enabled {
            let stroke = Stroke::new(GRID_LINE_WIDTH, GRID_LINE_COLOR);
            for x in layout.line_offsets(layout.surface_w) {
                let x = rect.min.x + x as f32;
                painter.line_segment([egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)], stroke);
            }
            for y in layout.line_offsets(layout.surface_h) {
                let y = rect.min.y + y as f32;
                painter.line_segment([egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)], stroke);
            }
        }

        // Press enters painting, release or leaving the surface returns to
        // idle. Every frame in between paints the cell under the pointer.
        let pointer_pos = response.interact_pointer_pos();
        let on_surface = pointer_pos.is_some_and(|pos| rect.contains(pos));
        self.editor.pointer.update(
            ui.input(|i| i.pointer.any_pressed()),
            response.is_pointer_button_down_on(),
            on_surface,
        );
        if self.editor.pointer.is_painting() {
            if let Some(pos) = pointer_pos {
                let rel = pos - rect.min;
                let target = layout.cell_at(rel.x, rel.y);
                self.canvas.paint_cell(target, self.editor.color);
            }
        }
    }
}
