use std::time::Instant;

use crate::feed::{FetchPage, LikeSnapshot};
use crate::models::{ImageRecord, LikeResponse};

use super::state::{ActiveView, LoadedImage};
use super::PixelboardApp;

pub enum AppMessage {
    PageLoaded {
        fetch: FetchPage,
        result: Result<Vec<ImageRecord>, anyhow::Error>,
    },
    ImageUploaded(Result<ImageRecord, anyhow::Error>),
    LikeSettled {
        snapshot: LikeSnapshot,
        result: Result<LikeResponse, anyhow::Error>,
    },
    ThumbnailLoaded {
        image_id: i64,
        result: Result<LoadedImage, String>,
    },
}

pub(super) fn process_messages(app: &mut PixelboardApp) {
    while let Ok(message) = app.rx.try_recv() {
        match message {
            AppMessage::PageLoaded { fetch, result } => {
                app.feed
                    .apply_page(fetch, result.map_err(|err| err.to_string()));
            }
            AppMessage::ImageUploaded(result) => {
                app.upload.submitting = false;
                match result {
                    Ok(record) => {
                        let name = record
                            .image_name
                            .as_deref()
                            .unwrap_or(&record.original_filename);
                        app.info_banner = Some(format!("Uploaded \"{name}\""));
                        app.canvas.clear();
                        app.upload.error = None;
                        app.view = ActiveView::Gallery;
                        // Reload so the fresh upload shows up in the feed.
                        let sort = app.feed.sort;
                        app.spawn_initial_load(sort);
                    }
                    Err(err) => {
                        app.upload.error = Some(err.to_string());
                    }
                }
            }
            AppMessage::LikeSettled { snapshot, result } => match result {
                Ok(response) => {
                    app.feed.settle_like_success(
                        snapshot.image_id,
                        response.likes_count,
                        response.liked_by_user,
                    );
                }
                Err(err) => {
                    app.feed.settle_like_failure(snapshot);
                    app.like_notice
                        .set(format!("Could not update like: {err}"), Instant::now());
                }
            },
            AppMessage::ThumbnailLoaded { image_id, result } => {
                app.on_download_complete();
                match result {
                    Ok(loaded) => {
                        app.thumb_pending.insert(image_id, loaded);
                        app.thumb_errors.remove(&image_id);
                    }
                    Err(err) => {
                        app.thumb_errors.insert(image_id, err);
                    }
                }
            }
        }
    }
}
