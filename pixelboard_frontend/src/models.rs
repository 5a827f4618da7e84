use serde::{Deserialize, Serialize};

/// One gallery entry as returned by `GET /images` and `POST /image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub image_name: Option<String>,
    pub original_filename: String,
    pub stored_filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
    pub created_at: String,
    pub likes_count: i64,
    pub liked_by_user: bool,
    pub image_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortMode {
    #[default]
    Recent,
    Popular,
    Trending,
}

impl SortMode {
    pub const ALL: [SortMode; 3] = [SortMode::Recent, SortMode::Popular, SortMode::Trending];

    /// Value sent as the `sort` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            SortMode::Recent => "recent",
            SortMode::Popular => "popular",
            SortMode::Trending => "trending",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortMode::Recent => "Recent",
            SortMode::Popular => "Popular",
            SortMode::Trending => "Trending",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Like,
    Unlike,
}

impl LikeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeAction::Like => "like",
            LikeAction::Unlike => "unlike",
        }
    }
}

/// Body of `POST /api/images/{id}/like`.
#[derive(Debug, Clone, Serialize)]
pub struct LikeRequest {
    pub user_hash: String,
    pub action: String,
}

/// Server-authoritative counts returned by the like endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LikeResponse {
    #[serde(default)]
    pub image_id: Option<i64>,
    pub likes_count: i64,
    pub liked_by_user: bool,
}

/// Multipart payload for `POST /image`.
#[derive(Debug, Clone, Default)]
pub struct UploadImageInput {
    pub author_name: Option<String>,
    pub image_name: Option<String>,
    pub file_name: String,
    pub png_bytes: Vec<u8>,
}
