use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use eframe::egui::{self, Context, TextureHandle};
use log::error;

use crate::api::ApiClient;
use crate::canvas::PixelCanvas;
use crate::feed::{FeedState, ScrollSentinel, TransientNotice};
use crate::identity::UserIdentity;
use crate::models::{SortMode, UploadImageInput};

mod messages;
mod state;
mod tasks;
mod ui;

use messages::AppMessage;
use state::{ActiveView, EditorState, LoadedImage, UploadState};

// Maximum number of concurrent thumbnail downloads to avoid overwhelming the
// backend while scrolling.
const MAX_CONCURRENT_DOWNLOADS: usize = 4;

pub struct PixelboardApp {
    api: ApiClient,
    identity: UserIdentity,
    tx: Sender<AppMessage>,
    rx: Receiver<AppMessage>,
    view: ActiveView,
    base_url_input: String,
    info_banner: Option<String>,
    // Canvas view
    canvas: PixelCanvas,
    editor: EditorState,
    upload: UploadState,
    // Gallery view
    feed: FeedState,
    sentinel: ScrollSentinel,
    like_notice: TransientNotice,
    // Thumbnail cache and rate-limited download queue
    thumb_textures: HashMap<i64, TextureHandle>,
    thumb_loading: HashSet<i64>,
    thumb_pending: HashMap<i64, LoadedImage>,
    thumb_errors: HashMap<i64, String>,
    download_queue: VecDeque<(i64, String)>,
    active_downloads: usize,
}

impl PixelboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let default_url = std::env::var("PIXELBOARD_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        let api = ApiClient::new(default_url.clone()).unwrap_or_else(|err| {
            error!("failed to initialise API client: {err}");
            ApiClient::new("http://127.0.0.1:8000").expect("fallback API client")
        });
        let (tx, rx) = mpsc::channel();

        let mut app = Self {
            api,
            identity: UserIdentity::load_or_create(),
            tx,
            rx,
            view: ActiveView::default(),
            base_url_input: default_url,
            info_banner: None,
            canvas: PixelCanvas::new(),
            editor: EditorState::default(),
            upload: UploadState::default(),
            feed: FeedState::new(),
            sentinel: ScrollSentinel::default(),
            like_notice: TransientNotice::default(),
            thumb_textures: HashMap::new(),
            thumb_loading: HashSet::new(),
            thumb_pending: HashMap::new(),
            thumb_errors: HashMap::new(),
            download_queue: VecDeque::new(),
            active_downloads: 0,
        };
        app.spawn_initial_load(SortMode::default());
        app
    }

    fn spawn_initial_load(&mut self, sort: SortMode) {
        let fetch = self.feed.begin_initial_load(sort);
        tasks::load_page(
            self.api.clone(),
            self.tx.clone(),
            self.identity.token().to_string(),
            fetch,
        );
    }

    fn spawn_set_sort(&mut self, sort: SortMode) {
        // No-op when the sort is already active.
        if let Some(fetch) = self.feed.set_sort(sort) {
            tasks::load_page(
                self.api.clone(),
                self.tx.clone(),
                self.identity.token().to_string(),
                fetch,
            );
        }
    }

    fn spawn_load_more(&mut self) {
        if let Some(fetch) = self.feed.begin_load_more() {
            tasks::load_page(
                self.api.clone(),
                self.tx.clone(),
                self.identity.token().to_string(),
                fetch,
            );
        }
    }

    fn spawn_toggle_like(&mut self, image_id: i64) {
        if let Some((snapshot, action)) = self.feed.begin_like(image_id) {
            tasks::set_like(
                self.api.clone(),
                self.tx.clone(),
                self.identity.token().to_string(),
                snapshot,
                action,
            );
        }
    }

    fn spawn_submit_drawing(&mut self) {
        let Some(layout) = self.editor.last_layout else {
            self.upload.error = Some("Nothing to submit yet".into());
            return;
        };
        let png_bytes = match self.canvas.export_png(layout) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.upload.error = Some(err.to_string());
                return;
            }
        };
        let author = self.upload.author_name.trim();
        let name = self.upload.image_name.trim();
        let input = UploadImageInput {
            author_name: (!author.is_empty()).then(|| author.to_string()),
            image_name: (!name.is_empty()).then(|| name.to_string()),
            file_name: "pixel-art.png".into(),
            png_bytes,
        };
        self.upload.submitting = true;
        self.upload.error = None;
        tasks::upload_image(self.api.clone(), self.tx.clone(), input);
    }

    fn spawn_load_thumbnail(&mut self, image_id: i64, url: &str) {
        self.thumb_loading.insert(image_id);
        self.download_queue.push_back((image_id, url.to_string()));
        self.process_download_queue();
    }

    fn process_download_queue(&mut self) {
        while self.active_downloads < MAX_CONCURRENT_DOWNLOADS {
            if let Some((image_id, url)) = self.download_queue.pop_front() {
                self.active_downloads += 1;
                tasks::download_thumbnail(self.api.clone(), self.tx.clone(), image_id, url);
            } else {
                break;
            }
        }
    }

    fn on_download_complete(&mut self) {
        if self.active_downloads > 0 {
            self.active_downloads -= 1;
        }
        self.process_download_queue();
    }

    fn process_messages(&mut self) {
        messages::process_messages(self);
    }

    /// True while any background work could produce a message the UI has to
    /// pick up, so the event loop keeps polling.
    fn work_in_flight(&self) -> bool {
        self.feed.loading
            || self.feed.loading_more
            || self.feed.has_likes_in_flight()
            || self.upload.submitting
            || self.active_downloads > 0
            || !self.download_queue.is_empty()
    }
}

impl eframe::App for PixelboardApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.process_messages();

        egui::TopBottomPanel::top("top_controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.view, ActiveView::Canvas, "Canvas");
                ui.selectable_value(&mut self.view, ActiveView::Gallery, "Gallery");
                ui.separator();
                ui.label("API Base URL");
                ui.text_edit_singleline(&mut self.base_url_input);
                if ui.button("Apply").clicked() {
                    match self.api.set_base_url(self.base_url_input.clone()) {
                        Ok(()) => {
                            self.info_banner = Some("API URL updated".into());
                            let sort = self.feed.sort;
                            self.spawn_initial_load(sort);
                        }
                        Err(err) => {
                            self.info_banner = Some(format!("Failed to update URL: {err}"));
                        }
                    }
                }
            });

            if let Some(message) = self.info_banner.clone() {
                let mut dismiss = false;
                egui::Frame::group(ui.style())
                    .fill(ui.visuals().extreme_bg_color)
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.label(message.as_str());
                            if ui.button("Dismiss").clicked() {
                                dismiss = true;
                            }
                        });
                    });
                if dismiss {
                    self.info_banner = None;
                }
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.view {
            ActiveView::Canvas => self.render_editor(ui),
            ActiveView::Gallery => self.render_gallery(ui),
        });

        if self.work_in_flight() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

// The backend emits naive UTC timestamps; tolerate RFC 3339 ones too.
fn format_timestamp(ts: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return dt
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M UTC")
            .to_string();
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|_| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn timestamps_render_in_utc_with_and_without_offset() {
        assert_eq!(
            format_timestamp("2024-06-01T12:30:00"),
            "2024-06-01 12:30 UTC"
        );
        assert_eq!(
            format_timestamp("2024-06-01T12:30:00+02:00"),
            "2024-06-01 10:30 UTC"
        );
        assert_eq!(format_timestamp("not a date"), "not a date");
    }
}
