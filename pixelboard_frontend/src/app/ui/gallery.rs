use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, RichText, Sense};

use crate::models::SortMode;

use super::super::{format_timestamp, PixelboardApp};

/// How far below the viewport the sentinel may sit and still trigger a fetch.
const SENTINEL_LOOKAHEAD_PX: f32 = 200.0;

const THUMBNAIL_MAX_WIDTH: f32 = 150.0;

struct Card {
    id: i64,
    title: String,
    author: Option<String>,
    timestamp: String,
    likes_count: i64,
    liked_by_user: bool,
    like_busy: bool,
    image_url: String,
}

impl PixelboardApp {
    pub(crate) fn render_gallery(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Sort");
            for mode in SortMode::ALL {
                if ui
                    .selectable_label(self.feed.sort == mode, mode.label())
                    .clicked()
                {
                    self.spawn_set_sort(mode);
                }
            }
            if ui.button("Refresh").clicked() {
                let sort = self.feed.sort;
                self.spawn_initial_load(sort);
            }
            if self.feed.loading {
                ui.spinner();
            }
        });

        if let Some(err) = &self.feed.error {
            ui.colored_label(Color32::LIGHT_RED, err);
        }
        if let Some(notice) = self.like_notice.current(Instant::now()) {
            ui.colored_label(Color32::LIGHT_RED, notice);
            // Keep repainting so the notice disappears on schedule.
            ui.ctx().request_repaint_after(Duration::from_millis(250));
        }
        ui.separator();

        // Snapshot the card data so rendering can borrow the app mutably for
        // textures and spawns.
        let cards: Vec<Card> = self
            .feed
            .items
            .iter()
            .map(|item| Card {
                id: item.id,
                title: item
                    .image_name
                    .clone()
                    .unwrap_or_else(|| "(untitled)".to_string()),
                author: item.author_name.clone(),
                timestamp: format_timestamp(&item.created_at),
                likes_count: item.likes_count,
                liked_by_user: item.liked_by_user,
                like_busy: self.feed.like_in_flight(item.id),
                image_url: item.image_url.clone(),
            })
            .collect();

        egui::ScrollArea::vertical().show(ui, |ui| {
            if cards.is_empty() && !self.feed.loading {
                ui.label("No images yet. Draw something and submit it!");
            }

            let mut like_clicked = None;
            for card in &cards {
                egui::Frame::group(ui.style())
                    .fill(ui.visuals().extreme_bg_color)
                    .inner_margin(egui::vec2(12.0, 8.0))
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            self.render_thumbnail(ui, card.id, &card.image_url);
                            ui.vertical(|ui| {
                                ui.label(RichText::new(&card.title).strong());
                                if let Some(author) = &card.author {
                                    ui.label(format!("by {author}"));
                                }
                                ui.label(RichText::new(&card.timestamp).size(10.0));
                                let heart = if card.liked_by_user { "♥" } else { "♡" };
                                let label =
                                    RichText::new(format!("{heart} {}", card.likes_count));
                                let label = if card.liked_by_user {
                                    label.color(Color32::LIGHT_RED)
                                } else {
                                    label
                                };
                                if ui
                                    .add_enabled(!card.like_busy, egui::Button::new(label))
                                    .clicked()
                                {
                                    like_clicked = Some(card.id);
                                }
                            });
                        });
                    });
            }
            if let Some(image_id) = like_clicked {
                self.spawn_toggle_like(image_id);
            }

            // Sentinel: only present while more pages may exist. The fetch
            // fires once when the sentinel enters the lookahead window below
            // the viewport; after a failed page the user has to scroll it out
            // and back in to retry. The in-flight guards live in the feed, so
            // repeated entry events cannot start duplicate fetches.
            let mut sentinel_visible = false;
            if self.feed.has_more && !cards.is_empty() {
                let (sentinel, _) =
                    ui.allocate_exact_size(egui::vec2(ui.available_width(), 1.0), Sense::hover());
                let lookahead = ui
                    .clip_rect()
                    .expand2(egui::vec2(0.0, SENTINEL_LOOKAHEAD_PX));
                sentinel_visible = lookahead.intersects(sentinel);
                if self.feed.loading_more {
                    ui.spinner();
                }
            }
            if self.sentinel.observe(sentinel_visible) {
                self.spawn_load_more();
            }
        });
    }

    fn render_thumbnail(&mut self, ui: &mut egui::Ui, image_id: i64, url: &str) {
        if let Some(texture) = self.thumb_textures.get(&image_id) {
            ui.add(egui::Image::from_texture(texture).max_width(THUMBNAIL_MAX_WIDTH));
        } else if let Some(pending) = self.thumb_pending.remove(&image_id) {
            let color = egui::ColorImage::from_rgba_unmultiplied(pending.size, &pending.pixels);
            let tex = ui.ctx().load_texture(
                format!("thumb_{image_id}"),
                color,
                egui::TextureOptions::NEAREST,
            );
            self.thumb_textures.insert(image_id, tex.clone());
            ui.add(egui::Image::from_texture(&tex).max_width(THUMBNAIL_MAX_WIDTH));
        } else if let Some(err) = self.thumb_errors.get(&image_id) {
            ui.colored_label(Color32::LIGHT_RED, format!("Image failed: {err}"));
        } else {
            if !self.thumb_loading.contains(&image_id) {
                self.spawn_load_thumbnail(image_id, url);
            }
            ui.spinner();
        }
    }
}
