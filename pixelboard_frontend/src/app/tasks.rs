use std::sync::mpsc::Sender;
use std::thread;

use log::error;

use crate::api::ApiClient;
use crate::feed::{FetchPage, LikeSnapshot, PAGE_SIZE};
use crate::models::{LikeAction, UploadImageInput};

use super::messages::AppMessage;
use super::state::LoadedImage;

pub fn load_page(client: ApiClient, tx: Sender<AppMessage>, user_hash: String, fetch: FetchPage) {
    thread::spawn(move || {
        let result = client.list_images(fetch.page, PAGE_SIZE, fetch.sort, &user_hash);
        if tx.send(AppMessage::PageLoaded { fetch, result }).is_err() {
            error!("failed to send PageLoaded message");
        }
    });
}

pub fn upload_image(client: ApiClient, tx: Sender<AppMessage>, input: UploadImageInput) {
    thread::spawn(move || {
        let result = client.upload_image(&input);
        if tx.send(AppMessage::ImageUploaded(result)).is_err() {
            error!("failed to send ImageUploaded message");
        }
    });
}

pub fn set_like(
    client: ApiClient,
    tx: Sender<AppMessage>,
    user_hash: String,
    snapshot: LikeSnapshot,
    action: LikeAction,
) {
    thread::spawn(move || {
        let result = client.set_like(snapshot.image_id, &user_hash, action);
        if tx.send(AppMessage::LikeSettled { snapshot, result }).is_err() {
            error!("failed to send LikeSettled message");
        }
    });
}

pub fn download_thumbnail(client: ApiClient, tx: Sender<AppMessage>, image_id: i64, url: String) {
    thread::spawn(move || {
        let result = (|| {
            let bytes = client.fetch_bytes(&url).map_err(|err| err.to_string())?;
            let dyn_img = image::load_from_memory(&bytes)
                .map_err(|err| format!("image decode error: {err}"))?;
            let rgba = dyn_img.to_rgba8();
            let size = [dyn_img.width() as usize, dyn_img.height() as usize];
            Ok(LoadedImage {
                size,
                pixels: rgba.as_flat_samples().as_slice().to_vec(),
            })
        })();

        let message = AppMessage::ThumbnailLoaded { image_id, result };
        if tx.send(message).is_err() {
            error!("failed to send ThumbnailLoaded message");
        }
    });
}
