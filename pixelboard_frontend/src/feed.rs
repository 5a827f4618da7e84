use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::models::{ImageRecord, LikeAction, SortMode};

/// Page size requested from `GET /images`.
pub const PAGE_SIZE: u32 = 20;

/// How long a like failure stays on screen before clearing itself.
pub const TRANSIENT_ERROR_TTL: Duration = Duration::from_secs(4);

/// Descriptor for one page fetch, captured at request time. The generation is
/// compared again when the response arrives so a fetch that outlived a sort
/// change is discarded instead of being applied to the wrong list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPage {
    pub generation: u64,
    pub page: u32,
    pub sort: SortMode,
}

/// Pre-mutation snapshot of the one item a like touches, used to undo the
/// optimistic delta if the server call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeSnapshot {
    pub image_id: i64,
    pub liked_by_user: bool,
    pub likes_count: i64,
}

/// Incremental-loading state for the gallery. Pure state transitions, no I/O:
/// the app captures the returned `FetchPage` descriptors, runs the network
/// call on a worker thread, and feeds the result back through `apply_page`.
pub struct FeedState {
    pub items: Vec<ImageRecord>,
    seen_ids: HashSet<i64>,
    /// Last applied page (1-based); advances only once a response is applied.
    page: u32,
    pub sort: SortMode,
    pub has_more: bool,
    pub loading: bool,
    pub loading_more: bool,
    /// Sticky load error, shown until the next successful load attempt.
    pub error: Option<String>,
    generation: u64,
    likes_in_flight: HashSet<i64>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            seen_ids: HashSet::new(),
            page: 0,
            sort: SortMode::default(),
            has_more: true,
            loading: false,
            loading_more: false,
            error: None,
            generation: 0,
            likes_in_flight: HashSet::new(),
        }
    }
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to page 1 under the given sort mode and hands back the fetch to
    /// run. Items and the dedup set are cleared up front; any response still
    /// in flight carries a stale generation and will be dropped.
    pub fn begin_initial_load(&mut self, sort: SortMode) -> FetchPage {
        self.generation += 1;
        self.sort = sort;
        self.items.clear();
        self.seen_ids.clear();
        self.page = 0;
        self.has_more = true;
        self.loading = true;
        self.loading_more = false;
        self.error = None;
        FetchPage {
            generation: self.generation,
            page: 1,
            sort,
        }
    }

    /// Sort switching: selecting the already-active mode is a no-op.
    pub fn set_sort(&mut self, sort: SortMode) -> Option<FetchPage> {
        if sort == self.sort {
            return None;
        }
        Some(self.begin_initial_load(sort))
    }

    /// Starts fetching the next page unless a load is already in flight or
    /// the feed is exhausted. The guards read the live flags, so repeated
    /// sentinel hits while a fetch runs stay no-ops.
    pub fn begin_load_more(&mut self) -> Option<FetchPage> {
        if self.loading || self.loading_more || !self.has_more {
            return None;
        }
        self.loading_more = true;
        Some(FetchPage {
            generation: self.generation,
            page: self.page + 1,
            sort: self.sort,
        })
    }

    /// Applies a page response. Responses whose generation no longer matches
    /// are discarded entirely; their flags were already taken over by the
    /// reset that bumped the generation.
    pub fn apply_page(&mut self, fetch: FetchPage, result: Result<Vec<ImageRecord>, String>) {
        if fetch.generation != self.generation {
            return;
        }
        // The "finally": the in-flight flag clears on success and failure.
        if fetch.page == 1 {
            self.loading = false;
        } else {
            self.loading_more = false;
        }
        match result {
            Ok(records) => {
                let fetched = records.len() as u32;
                for record in records {
                    if self.seen_ids.insert(record.id) {
                        self.items.push(record);
                    }
                }
                self.page = fetch.page;
                self.has_more = fetched >= PAGE_SIZE;
                self.error = None;
            }
            Err(err) => {
                self.error = Some(err);
            }
        }
    }

    /// Optimistically flips the like state of one item, returning the
    /// snapshot to roll back with and the action to send. `None` when the id
    /// is unknown or a like for the same image is still in flight; likes for
    /// different images may overlap freely.
    pub fn begin_like(&mut self, image_id: i64) -> Option<(LikeSnapshot, LikeAction)> {
        if self.likes_in_flight.contains(&image_id) {
            return None;
        }
        let item = self.items.iter_mut().find(|item| item.id == image_id)?;
        let snapshot = LikeSnapshot {
            image_id,
            liked_by_user: item.liked_by_user,
            likes_count: item.likes_count,
        };
        item.liked_by_user = !item.liked_by_user;
        let action = if item.liked_by_user {
            item.likes_count += 1;
            LikeAction::Like
        } else {
            item.likes_count -= 1;
            LikeAction::Unlike
        };
        self.likes_in_flight.insert(image_id);
        Some((snapshot, action))
    }

    /// The server's counts win over the optimistic guess, which protects
    /// against concurrent likes from other clients.
    pub fn settle_like_success(&mut self, image_id: i64, likes_count: i64, liked_by_user: bool) {
        self.likes_in_flight.remove(&image_id);
        if let Some(item) = self.items.iter_mut().find(|item| item.id == image_id) {
            item.likes_count = likes_count;
            item.liked_by_user = liked_by_user;
        }
    }

    /// Restores the exact pre-mutation state captured in the snapshot.
    pub fn settle_like_failure(&mut self, snapshot: LikeSnapshot) {
        self.likes_in_flight.remove(&snapshot.image_id);
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.id == snapshot.image_id)
        {
            item.liked_by_user = snapshot.liked_by_user;
            item.likes_count = snapshot.likes_count;
        }
    }

    pub fn like_in_flight(&self, image_id: i64) -> bool {
        self.likes_in_flight.contains(&image_id)
    }

    pub fn has_likes_in_flight(&self) -> bool {
        !self.likes_in_flight.is_empty()
    }

    pub fn current_page(&self) -> u32 {
        self.page
    }
}

/// Edge-triggered latch for the load-more sentinel. A fetch is requested
/// once when the sentinel enters the lookahead window; it must leave and
/// re-enter (the user scrolls again) before it can fire another one, so a
/// failed page load is not retried automatically frame after frame.
#[derive(Debug, Default)]
pub struct ScrollSentinel {
    in_view: bool,
}

impl ScrollSentinel {
    /// Feeds one frame of visibility; returns true only on entry.
    pub fn observe(&mut self, visible: bool) -> bool {
        let entered = visible && !self.in_view;
        self.in_view = visible;
        entered
    }
}

/// A self-clearing error banner for like failures.
#[derive(Debug, Default)]
pub struct TransientNotice {
    entry: Option<(String, Instant)>,
}

impl TransientNotice {
    pub fn set(&mut self, message: impl Into<String>, now: Instant) {
        self.entry = Some((message.into(), now + TRANSIENT_ERROR_TTL));
    }

    /// Returns the message while it is still current, dropping it once its
    /// deadline has passed.
    pub fn current(&mut self, now: Instant) -> Option<&str> {
        if let Some((_, deadline)) = &self.entry {
            if now >= *deadline {
                self.entry = None;
            }
        }
        self.entry.as_ref().map(|(message, _)| message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(id: i64) -> ImageRecord {
        ImageRecord {
            id,
            author_name: None,
            image_name: Some(format!("img-{id}")),
            original_filename: "pixel-art.png".into(),
            stored_filename: format!("{id}.png"),
            content_type: Some("image/png".into()),
            size: Some(128),
            created_at: "2024-06-01T12:00:00".into(),
            likes_count: 0,
            liked_by_user: false,
            image_url: format!("http://localhost:8000/images/{id}.png"),
        }
    }

    fn page(ids: std::ops::Range<i64>) -> Vec<ImageRecord> {
        ids.map(record).collect()
    }

    fn full_page(start: i64) -> Vec<ImageRecord> {
        page(start..start + PAGE_SIZE as i64)
    }

    #[test]
    fn initial_load_then_load_more_keeps_order_and_unique_ids() {
        let mut feed = FeedState::new();
        let fetch = feed.begin_initial_load(SortMode::Recent);
        assert!(feed.loading);
        feed.apply_page(fetch, Ok(full_page(1)));
        assert!(!feed.loading);
        assert!(feed.has_more);
        assert_eq!(feed.current_page(), 1);

        let fetch = feed.begin_load_more().unwrap();
        assert_eq!(fetch.page, 2);
        // Overlapping page: ids 15..35, of which 15..21 were already seen.
        feed.apply_page(fetch, Ok(page(15..35)));

        let ids: Vec<i64> = feed.items.iter().map(|item| item.id).collect();
        let expected: Vec<i64> = (1..35).collect();
        assert_eq!(ids, expected);
        assert_eq!(feed.current_page(), 2);
    }

    #[test]
    fn short_page_exhausts_the_feed() {
        let mut feed = FeedState::new();
        let fetch = feed.begin_initial_load(SortMode::Recent);
        feed.apply_page(fetch, Ok(page(1..6)));
        assert!(!feed.has_more);
        // The sentinel may still fire; the guard makes it a no-op.
        assert_eq!(feed.begin_load_more(), None);
    }

    #[test]
    fn load_more_is_guarded_while_a_load_is_in_flight() {
        let mut feed = FeedState::new();
        let fetch = feed.begin_initial_load(SortMode::Recent);
        assert_eq!(feed.begin_load_more(), None); // initial load running
        feed.apply_page(fetch, Ok(full_page(1)));

        let first = feed.begin_load_more();
        assert!(first.is_some());
        assert_eq!(feed.begin_load_more(), None); // duplicate sentinel event
    }

    #[test]
    fn load_failure_is_sticky_and_leaves_items_intact() {
        let mut feed = FeedState::new();
        let fetch = feed.begin_initial_load(SortMode::Recent);
        feed.apply_page(fetch, Ok(full_page(1)));

        let fetch = feed.begin_load_more().unwrap();
        feed.apply_page(fetch, Err("connection refused".into()));
        assert_eq!(feed.error.as_deref(), Some("connection refused"));
        assert_eq!(feed.items.len(), PAGE_SIZE as usize);
        assert!(!feed.loading_more);
        assert_eq!(feed.current_page(), 1);

        // The next successful load clears the sticky error.
        let fetch = feed.begin_load_more().unwrap();
        feed.apply_page(fetch, Ok(full_page(100)));
        assert_eq!(feed.error, None);
    }

    #[test]
    fn stale_generation_response_is_discarded_after_sort_change() {
        let mut feed = FeedState::new();
        let fetch = feed.begin_initial_load(SortMode::Recent);
        feed.apply_page(fetch, Ok(full_page(1)));

        let stale = feed.begin_load_more().unwrap();
        // Sort changes while page 2 is still in flight.
        let fresh = feed.set_sort(SortMode::Popular).unwrap();
        assert!(feed.items.is_empty());

        // The late "recent" page must not land in the "popular" list.
        feed.apply_page(stale, Ok(full_page(50)));
        assert!(feed.items.is_empty());
        assert!(feed.loading);

        feed.apply_page(fresh, Ok(full_page(200)));
        let ids: Vec<i64> = feed.items.iter().map(|item| item.id).collect();
        let expected: Vec<i64> = (200..200 + PAGE_SIZE as i64).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn reset_releases_a_dangling_load_more_flag() {
        let mut feed = FeedState::new();
        let fetch = feed.begin_initial_load(SortMode::Recent);
        feed.apply_page(fetch, Ok(full_page(1)));
        let _stale = feed.begin_load_more().unwrap();

        let fresh = feed.set_sort(SortMode::Trending).unwrap();
        assert!(!feed.loading_more);
        feed.apply_page(fresh, Ok(full_page(1)));
        // The new context can page normally even though the stale response
        // never arrived.
        assert!(feed.begin_load_more().is_some());
    }

    #[test]
    fn selecting_the_active_sort_triggers_no_fetch() {
        let mut feed = FeedState::new();
        let fetch = feed.begin_initial_load(SortMode::Recent);
        feed.apply_page(fetch, Ok(full_page(1)));
        assert_eq!(feed.set_sort(SortMode::Recent), None);
    }

    #[test]
    fn optimistic_like_applies_and_reconciles_with_server_counts() {
        let mut feed = FeedState::new();
        let fetch = feed.begin_initial_load(SortMode::Recent);
        let mut items = page(1..3);
        items[0].likes_count = 5;
        feed.apply_page(fetch, Ok(items));

        let (snapshot, action) = feed.begin_like(1).unwrap();
        assert_eq!(action, LikeAction::Like);
        assert_eq!(snapshot.likes_count, 5);
        assert_eq!(feed.items[0].likes_count, 6);
        assert!(feed.items[0].liked_by_user);
        // Untargeted items stay untouched.
        assert_eq!(feed.items[1].likes_count, 0);

        // Another client liked meanwhile; the server count wins.
        feed.settle_like_success(1, 8, true);
        assert_eq!(feed.items[0].likes_count, 8);
        assert!(!feed.like_in_flight(1));
    }

    #[test]
    fn failed_like_rolls_back_the_exact_delta() {
        let mut feed = FeedState::new();
        let fetch = feed.begin_initial_load(SortMode::Recent);
        let mut items = page(1..2);
        items[0].likes_count = 5;
        feed.apply_page(fetch, Ok(items));

        let (snapshot, _) = feed.begin_like(1).unwrap();
        feed.settle_like_failure(snapshot);
        assert_eq!(feed.items[0].likes_count, 5);
        assert!(!feed.items[0].liked_by_user);
        assert!(!feed.like_in_flight(1));
    }

    #[test]
    fn same_image_cannot_be_double_toggled_while_in_flight() {
        let mut feed = FeedState::new();
        let fetch = feed.begin_initial_load(SortMode::Recent);
        feed.apply_page(fetch, Ok(page(1..3)));

        assert!(feed.begin_like(1).is_some());
        assert_eq!(feed.begin_like(1), None);
        // A different image may proceed concurrently.
        assert!(feed.begin_like(2).is_some());
    }

    #[test]
    fn unlike_sends_the_unlike_action() {
        let mut feed = FeedState::new();
        let fetch = feed.begin_initial_load(SortMode::Recent);
        let mut items = page(1..2);
        items[0].liked_by_user = true;
        items[0].likes_count = 3;
        feed.apply_page(fetch, Ok(items));

        let (_, action) = feed.begin_like(1).unwrap();
        assert_eq!(action, LikeAction::Unlike);
        assert_eq!(feed.items[0].likes_count, 2);
    }

    #[test]
    fn failed_load_more_is_not_retried_while_the_sentinel_stays_visible() {
        let mut feed = FeedState::new();
        let mut sentinel = ScrollSentinel::default();
        let fetch = feed.begin_initial_load(SortMode::Recent);
        feed.apply_page(fetch, Ok(full_page(1)));

        // Sentinel scrolls into the lookahead window: one fetch.
        assert!(sentinel.observe(true));
        let fetch = feed.begin_load_more().unwrap();
        feed.apply_page(fetch, Err("connection refused".into()));
        assert!(feed.has_more);

        // The server kept failing and the sentinel never moved; subsequent
        // frames must not start another fetch on their own.
        assert!(!sentinel.observe(true));
        assert!(!sentinel.observe(true));

        // Scrolling away and back is an explicit re-trigger.
        assert!(!sentinel.observe(false));
        assert!(sentinel.observe(true));
        assert!(feed.begin_load_more().is_some());
    }

    #[test]
    fn likes_in_flight_are_reported_until_settled() {
        let mut feed = FeedState::new();
        let fetch = feed.begin_initial_load(SortMode::Recent);
        feed.apply_page(fetch, Ok(page(1..3)));
        assert!(!feed.has_likes_in_flight());

        let (snapshot, _) = feed.begin_like(1).unwrap();
        feed.begin_like(2).unwrap();
        assert!(feed.has_likes_in_flight());

        feed.settle_like_failure(snapshot);
        assert!(feed.has_likes_in_flight());
        feed.settle_like_success(2, 1, true);
        assert!(!feed.has_likes_in_flight());
    }

    #[test]
    fn transient_notice_expires_after_its_ttl() {
        let mut notice = TransientNotice::default();
        let start = Instant::now();
        notice.set("could not update like", start);
        assert_eq!(notice.current(start), Some("could not update like"));
        assert_eq!(
            notice.current(start + Duration::from_secs(3)),
            Some("could not update like")
        );
        assert_eq!(notice.current(start + TRANSIENT_ERROR_TTL), None);
        assert_eq!(notice.current(start + Duration::from_secs(10)), None);
    }
}
