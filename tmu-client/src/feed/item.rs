use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use tmu_types::{Interaction, Post, Reply};

use super::comments::{CommentLoad, CommentSubmit, CommentThread, ReplyPolicy};
use super::counters::{self, PendingToggle};
use super::view::ViewTracker;
use crate::api::{ApiResult, FeedBackend};
use crate::error::ActionResult;

static NEXT_MOUNT: AtomicU64 = AtomicU64::new(1);

fn next_mount() -> u64 {
    NEXT_MOUNT.fetch_add(1, Ordering::Relaxed)
}

/// A post on screen together with its interaction state.
///
/// Every item gets a fresh mount id. Tickets issued by an item carry that id,
/// so results that come back after the item was replaced are ignored.
#[derive(Debug)]
pub struct FeedItem {
    post: Post,
    mount: u64,
    views: ViewTracker,
    thread: CommentThread,
    in_flight: HashSet<Interaction>,
}

impl FeedItem {
    pub fn new(post: Post) -> Self {
        Self::with_policy(post, ReplyPolicy::default())
    }

    pub fn with_policy(post: Post, policy: ReplyPolicy) -> Self {
        let mount = next_mount();
        let thread = CommentThread::new(post.id.clone(), mount, policy);
        Self {
            post,
            mount,
            views: ViewTracker::new(),
            thread,
            in_flight: HashSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.post.id
    }

    pub fn post(&self) -> &Post {
        &self.post
    }

    pub fn mount(&self) -> u64 {
        self.mount
    }

    pub fn views(&self) -> &ViewTracker {
        &self.views
    }

    pub fn thread(&self) -> &CommentThread {
        &self.thread
    }

    pub fn thread_mut(&mut self) -> &mut CommentThread {
        &mut self.thread
    }

    pub fn is_toggling(&self, kind: Interaction) -> bool {
        self.in_flight.contains(&kind)
    }

    // Like / repost / bookmark

    /// Flip `kind` optimistically. Returns None while the same kind is in flight.
    pub fn begin_toggle(&mut self, kind: Interaction) -> Option<PendingToggle> {
        if !self.in_flight.insert(kind) {
            log_interaction!("{} on {} ignored, request in flight", kind.as_str(), self.post.id);
            return None;
        }
        let pending = counters::apply(&mut self.post, kind, self.mount);
        log_interaction!(
            "{} on {} -> {} (optimistic)",
            kind.as_str(),
            self.post.id,
            pending.optimistic()
        );
        Some(pending)
    }

    /// Settle a toggle: adopt the server flag, or roll back on failure.
    pub fn finish_toggle(&mut self, pending: PendingToggle, result: ApiResult<bool>) -> ActionResult<()> {
        if pending.mount != self.mount {
            log_interaction!("ignoring {} result for replaced item {}", pending.kind.as_str(), pending.post_id);
            return Ok(());
        }
        self.in_flight.remove(&pending.kind);
        match result {
            Ok(server_flag) => {
                if counters::reconcile(&mut self.post, &pending, server_flag) {
                    log_interaction!(
                        "server answered {}={} for {}, overriding",
                        pending.kind.response_field(),
                        server_flag,
                        self.post.id
                    );
                }
                Ok(())
            }
            Err(e) => {
                log::warn!("{} on {} failed, rolling back: {}", pending.kind.as_str(), self.post.id, e);
                counters::rollback(&mut self.post, &pending);
                Err(e.into())
            }
        }
    }

    /// Run both toggle phases around the backend call.
    pub async fn toggle<B: FeedBackend + ?Sized>(&mut self, backend: &B, kind: Interaction) -> ActionResult<()> {
        let Some(pending) = self.begin_toggle(kind) else {
            return Ok(());
        };
        let result = backend.toggle_interaction(&pending.post_id, kind).await;
        self.finish_toggle(pending, result)
    }

    // Views

    /// Feed a visibility ratio. Returns true when this observation counted the view.
    pub fn observe_visibility(&mut self, ratio: f64) -> bool {
        if !self.views.observe(ratio) {
            return false;
        }
        self.post.counters.views = self.post.counters.views.saturating_add(1);
        true
    }

    /// Count the view locally and report it. Reporting failures are swallowed.
    pub async fn record_view<B: FeedBackend + ?Sized>(&mut self, backend: &B, ratio: f64) -> bool {
        if !self.observe_visibility(ratio) {
            return false;
        }
        log_interaction!("view on {}", self.post.id);
        if let Err(e) = backend.track_view(&self.post.id).await {
            log::warn!("Failed to track view on {}: {}", self.post.id, e);
        }
        true
    }

    // Comments

    pub fn expand_comments(&mut self) -> Option<CommentLoad> {
        self.thread.expand()
    }

    pub fn collapse_comments(&mut self) {
        self.thread.collapse();
    }

    pub fn finish_comments(&mut self, load: CommentLoad, result: ApiResult<Vec<tmu_types::Comment>>) -> bool {
        self.thread.finish_load(load, result)
    }

    /// Expand the comment section, loading it on first open.
    pub async fn open_comments<B: FeedBackend + ?Sized>(&mut self, backend: &B) {
        if let Some(load) = self.expand_comments() {
            let result = backend.fetch_comments(&load.post_id).await;
            self.finish_comments(load, result);
        }
    }

    pub fn begin_comment(&mut self, text: &str) -> ActionResult<CommentSubmit> {
        self.thread.begin_submit(text)
    }

    /// Settle a comment submission. On success bumps the counter and returns the reload to run.
    pub fn finish_comment(&mut self, submit: CommentSubmit, result: ApiResult<()>) -> ActionResult<Option<CommentLoad>> {
        if submit.mount != self.mount {
            return Ok(None);
        }
        let reload = self.thread.finish_submit(result)?;
        self.post.counters.comments = self.post.counters.comments.saturating_add(1);
        log_comments!("comment posted on {}", self.post.id);
        Ok(Some(reload))
    }

    /// Post a comment, then reload the thread from the server.
    pub async fn submit_comment<B: FeedBackend + ?Sized>(&mut self, backend: &B, text: &str) -> ActionResult<()> {
        let submit = self.begin_comment(text)?;
        let result = backend.add_comment(&submit.post_id, &submit.content).await;
        if let Some(reload) = self.finish_comment(submit, result)? {
            let comments = backend.fetch_comments(&reload.post_id).await;
            self.finish_comments(reload, comments);
        }
        Ok(())
    }

    /// Add a local reply and count it on the post.
    pub fn submit_reply(&mut self, comment_id: &str, text: &str) -> ActionResult<&Reply> {
        let reply = self.thread.add_local_reply(comment_id, text)?;
        self.post.counters.comments = self.post.counters.comments.saturating_add(1);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;
    use crate::feed::comments::LoadState;
    use crate::test_support::{sample_comment, sample_post, FakeBackend};

    #[tokio::test]
    async fn test_toggle_reconciles_with_server() {
        let backend = FakeBackend::new();
        let mut item = FeedItem::new(sample_post("p1"));

        item.toggle(&backend, Interaction::Like).await.unwrap();
        assert!(item.post().viewer.is_liked);
        assert_eq!(item.post().counters.likes, 1);
        assert_eq!(backend.calls(), vec!["POST /posts/p1/like"]);
    }

    #[tokio::test]
    async fn test_failed_toggle_rolls_back() {
        let backend = FakeBackend::new();
        backend.fail_writes(true);
        let mut post = sample_post("p1");
        post.counters.likes = 4;
        let mut item = FeedItem::new(post);

        let err = item.toggle(&backend, Interaction::Like).await.unwrap_err();
        assert!(matches!(err, ActionError::Api(_)));
        assert!(!item.post().viewer.is_liked);
        assert_eq!(item.post().counters.likes, 4);
        assert!(!item.is_toggling(Interaction::Like));
    }

    #[tokio::test]
    async fn test_server_flag_overrides_optimistic_one() {
        let backend = FakeBackend::new();
        backend.answer_toggles_with(Some(false));
        let mut item = FeedItem::new(sample_post("p1"));

        item.toggle(&backend, Interaction::Repost).await.unwrap();
        assert!(!item.post().viewer.is_reposted);
        assert_eq!(item.post().counters.reposts, 0);
    }

    #[test]
    fn test_same_kind_toggle_is_single_flight() {
        let mut item = FeedItem::new(sample_post("p1"));

        let like = item.begin_toggle(Interaction::Like).unwrap();
        assert!(item.begin_toggle(Interaction::Like).is_none());
        assert_eq!(item.post().counters.likes, 1);

        // Other kinds are independent
        let bookmark = item.begin_toggle(Interaction::Bookmark).unwrap();
        item.finish_toggle(bookmark, Ok(true)).unwrap();
        item.finish_toggle(like, Ok(true)).unwrap();

        assert!(item.begin_toggle(Interaction::Like).is_some());
    }

    #[test]
    fn test_result_for_replaced_item_is_ignored() {
        let mut old = FeedItem::new(sample_post("p1"));
        let pending = old.begin_toggle(Interaction::Like).unwrap();

        let mut fresh = FeedItem::new(sample_post("p1"));
        fresh.finish_toggle(pending, Err(crate::api::ApiError::NotFound("gone".into()))).unwrap();
        assert_eq!(fresh.post().counters.likes, 0);
        assert!(!fresh.post().viewer.is_liked);
    }

    #[test]
    fn test_items_of_the_same_post_do_not_share_tickets() {
        let mut first = FeedItem::new(sample_post("p1"));
        let mut second = FeedItem::new(sample_post("p1"));
        assert_ne!(first.mount(), second.mount());

        let load = first.expand_comments().unwrap();
        assert!(second.expand_comments().is_some());
        assert!(!second.finish_comments(load, Ok(vec![sample_comment("c1", "p1")])));
        assert_eq!(second.thread().state(), LoadState::Loading);
        assert!(second.thread().comments().is_empty());

        let pending = first.begin_toggle(Interaction::Bookmark).unwrap();
        second.finish_toggle(pending, Ok(true)).unwrap();
        assert!(!second.post().viewer.is_bookmarked);
    }

    #[tokio::test]
    async fn test_view_is_tracked_once() {
        let backend = FakeBackend::new();
        let mut item = FeedItem::new(sample_post("p1"));

        assert!(!item.record_view(&backend, 0.2).await);
        assert!(item.record_view(&backend, 0.75).await);
        assert!(!item.record_view(&backend, 1.0).await);

        assert_eq!(item.post().counters.views, 1);
        assert_eq!(backend.calls(), vec!["POST /posts/p1/view"]);
    }

    #[tokio::test]
    async fn test_view_failure_keeps_local_increment() {
        let backend = FakeBackend::new();
        backend.fail_writes(true);
        let mut item = FeedItem::new(sample_post("p1"));

        assert!(item.record_view(&backend, 0.5).await);
        assert_eq!(item.post().counters.views, 1);
    }

    #[tokio::test]
    async fn test_open_comments_loads_once() {
        let backend = FakeBackend::new();
        backend.seed_comments("p1", vec![sample_comment("c1", "p1")]);
        let mut item = FeedItem::new(sample_post("p1"));

        item.open_comments(&backend).await;
        item.collapse_comments();
        item.open_comments(&backend).await;

        assert_eq!(item.thread().comments().len(), 1);
        assert_eq!(backend.calls(), vec!["GET /posts/p1/comments"]);
    }

    #[test]
    fn test_back_to_back_loads_never_duplicate() {
        let mut item = FeedItem::new(sample_post("p1"));
        let first = item.expand_comments().unwrap();
        assert!(item.thread_mut().begin_load().is_none());

        item.finish_comments(first.clone(), Ok(vec![sample_comment("c1", "p1")]));
        item.finish_comments(first, Ok(vec![sample_comment("c1", "p1")]));
        assert_eq!(item.thread().comments().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_comment_reloads_and_counts() {
        let backend = FakeBackend::new();
        let mut item = FeedItem::new(sample_post("p1"));
        item.thread_mut().draft = "First!".into();

        item.submit_comment(&backend, "First!").await.unwrap();

        assert_eq!(item.post().counters.comments, 1);
        assert!(item.thread().draft.is_empty());
        assert_eq!(item.thread().state(), LoadState::Loaded);
        assert_eq!(item.thread().comments().len(), 1);
        assert_eq!(
            backend.calls(),
            vec!["POST /posts/p1/comments", "GET /posts/p1/comments"]
        );
    }

    #[tokio::test]
    async fn test_overlong_comment_sends_nothing() {
        let backend = FakeBackend::new();
        let mut item = FeedItem::new(sample_post("p1"));

        let text = "a".repeat(281);
        assert!(item.submit_comment(&backend, &text).await.is_err());
        assert!(backend.calls().is_empty());
        assert_eq!(item.post().counters.comments, 0);
    }

    #[tokio::test]
    async fn test_failed_comment_leaves_counter() {
        let backend = FakeBackend::new();
        backend.fail_writes(true);
        let mut item = FeedItem::new(sample_post("p1"));

        assert!(item.submit_comment(&backend, "hello").await.is_err());
        assert_eq!(item.post().counters.comments, 0);
        assert!(!item.thread().is_submitting());
    }

    #[tokio::test]
    async fn test_local_reply_counts_then_vanishes_on_reload() {
        let backend = FakeBackend::new();
        backend.seed_comments("p1", vec![sample_comment("c1", "p1")]);
        let mut item = FeedItem::new(sample_post("p1"));
        item.open_comments(&backend).await;

        item.submit_reply("c1", "same here").unwrap();
        assert_eq!(item.post().counters.comments, 1);
        assert_eq!(item.thread().comments()[0].replies.len(), 1);

        item.submit_comment(&backend, "top level").await.unwrap();
        assert!(item.thread().comments().iter().all(|c| c.replies.is_empty()));
        assert_eq!(item.post().counters.comments, 2);
    }

    #[test]
    fn test_disabled_reply_policy_leaves_state() {
        let mut item = FeedItem::with_policy(sample_post("p1"), ReplyPolicy::Disabled);
        let load = item.expand_comments().unwrap();
        item.finish_comments(load, Ok(vec![sample_comment("c1", "p1")]));

        assert!(matches!(item.submit_reply("c1", "hi"), Err(ActionError::RepliesNotPersisted)));
        assert_eq!(item.post().counters.comments, 0);
    }
}
