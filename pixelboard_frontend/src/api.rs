use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::Url;

use crate::models::{ImageRecord, LikeAction, LikeRequest, LikeResponse, SortMode, UploadImageInput};

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base = sanitize_base_url(base_url.into())?;
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) -> Result<()> {
        self.base_url = sanitize_base_url(base_url.into())?;
        Ok(())
    }

    /// `GET /images` — one page of the gallery listing. The backend returns at
    /// most `limit` records and no has-more flag; a short page means the end.
    pub fn list_images(
        &self,
        page: u32,
        limit: u32,
        sort: SortMode,
        user_hash: &str,
    ) -> Result<Vec<ImageRecord>> {
        let mut url = self.url("/images")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair("sort", sort.as_query())
            .append_pair("user_hash", user_hash);
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.json()?)
    }

    /// `POST /image` — multipart upload of an exported drawing. A non-2xx
    /// response surfaces its body text as the error message.
    pub fn upload_image(&self, input: &UploadImageInput) -> Result<ImageRecord> {
        let url = self.url("/image")?;
        let part = Part::bytes(input.png_bytes.clone())
            .file_name(input.file_name.clone())
            .mime_str("image/png")
            .context("invalid mime type for upload")?;
        let mut form = Form::new().part("image", part);
        if let Some(author) = &input.author_name {
            form = form.text("authorName", author.clone());
        }
        if let Some(name) = &input.image_name {
            form = form.text("imageName", name.clone());
        }
        let response = self.client.post(url).multipart(form).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("upload failed ({status}): {body}"));
        }
        Ok(response.json()?)
    }

    /// `POST /api/images/{id}/like` — returns the server-authoritative count.
    pub fn set_like(
        &self,
        image_id: i64,
        user_hash: &str,
        action: LikeAction,
    ) -> Result<LikeResponse> {
        let url = self.url(&format!("/api/images/{image_id}/like"))?;
        let payload = LikeRequest {
            user_hash: user_hash.to_string(),
            action: action.as_str().to_string(),
        };
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }

    /// Fetches an absolute URL (thumbnail downloads use the record's
    /// `image_url` as-is).
    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }

    fn url(&self, path: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).context("invalid base URL")?;
        url.set_path(path.trim_start_matches('/'));
        Ok(url)
    }
}

fn sanitize_base_url(mut base: String) -> Result<String> {
    if !base.starts_with("http://") && !base.starts_with("https://") {
        base = format!("http://{base}");
    }
    // Remove trailing slash for consistency
    while base.ends_with('/') {
        base.pop();
    }
    // Validate once
    let _ = Url::parse(&base).context("invalid base URL")?;
    Ok(base)
}
