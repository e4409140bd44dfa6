use std::collections::HashSet;

use tmu_types::{FeedTab, Interaction, PostPage, Reply};

use super::comments::ReplyPolicy;
use super::counters::PendingToggle;
use super::item::FeedItem;
use crate::api::{ApiResult, FeedBackend, PostQuery};
use crate::compose::PostDraft;
use crate::error::{ActionError, ActionResult};

/// Banner shown when a page fails to load
pub const FEED_ERROR: &str = "Could not load posts. Please try again.";

/// Ticket of one page request. Superseded tickets are discarded on arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub query: PostQuery,
    generation: u64,
}

/// Paginated feed of one tab
#[derive(Debug)]
pub struct FeedList {
    items: Vec<FeedItem>,
    tab: FeedTab,
    /// Tab the listed items were fetched for; differs from `tab` until page 1 of a new tab lands
    items_tab: FeedTab,
    page: u32,
    has_more: bool,
    loading: bool,
    error: Option<String>,
    generation: u64,
    reply_policy: ReplyPolicy,
}

impl Default for FeedList {
    fn default() -> Self {
        Self::new(FeedTab::default())
    }
}

impl FeedList {
    pub fn new(tab: FeedTab) -> Self {
        Self {
            items: Vec::new(),
            tab,
            items_tab: tab,
            page: 0,
            has_more: false,
            loading: false,
            error: None,
            generation: 0,
            reply_policy: ReplyPolicy::default(),
        }
    }

    pub fn with_reply_policy(mut self, policy: ReplyPolicy) -> Self {
        self.reply_policy = policy;
        self
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn tab(&self) -> FeedTab {
        self.tab
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn item(&self, post_id: &str) -> ActionResult<&FeedItem> {
        self.items
            .iter()
            .find(|item| item.id() == post_id)
            .ok_or_else(|| ActionError::PostNotFound(post_id.to_string()))
    }

    pub fn item_mut(&mut self, post_id: &str) -> ActionResult<&mut FeedItem> {
        self.items
            .iter_mut()
            .find(|item| item.id() == post_id)
            .ok_or_else(|| ActionError::PostNotFound(post_id.to_string()))
    }

    // Paging

    /// Start fetching page `page`. Page 1 supersedes anything in flight;
    /// later pages are refused while a fetch is running.
    pub fn begin_fetch(&mut self, page: u32) -> Option<PageRequest> {
        let page = page.max(1);
        if page == 1 {
            self.generation += 1;
        } else if self.loading {
            return None;
        }
        self.loading = true;
        self.error = None;
        Some(PageRequest {
            query: PostQuery::new(self.tab, page),
            generation: self.generation,
        })
    }

    /// Apply a page result. Returns false when the request was superseded.
    pub fn finish_fetch(&mut self, request: PageRequest, result: ApiResult<PostPage>) -> bool {
        if request.generation != self.generation || request.query.tab != self.tab {
            log::debug!("discarding stale page {} of {}", request.query.page, request.query.tab.as_str());
            return false;
        }
        self.loading = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Failed to load page {} of {}: {}", request.query.page, self.tab.as_str(), e);
                self.error = Some(FEED_ERROR.to_string());
                if self.items_tab != self.tab {
                    // Old tab's posts stay visible but must not be paged under the new filter
                    self.page = 0;
                    self.has_more = false;
                }
                return true;
            }
        };

        self.has_more = page.has_more();
        self.page = request.query.page;

        if request.query.page == 1 {
            self.items_tab = self.tab;
            self.items = page
                .posts
                .into_iter()
                .map(|post| FeedItem::with_policy(post, self.reply_policy))
                .collect();
        } else {
            let mut seen: HashSet<String> = self.items.iter().map(|i| i.id().to_string()).collect();
            for post in page.posts {
                if seen.insert(post.id.clone()) {
                    self.items.push(FeedItem::with_policy(post, self.reply_policy));
                } else {
                    log::debug!("skipping duplicate post {}", post.id);
                }
            }
        }
        log::debug!(
            "feed {} page {} loaded, {} posts, has_more={}",
            self.tab.as_str(),
            self.page,
            self.items.len(),
            self.has_more
        );
        true
    }

    pub async fn fetch_page<B: FeedBackend + ?Sized>(&mut self, backend: &B, page: u32) -> bool {
        let Some(request) = self.begin_fetch(page) else {
            return false;
        };
        let result = backend.fetch_posts(&request.query).await;
        self.finish_fetch(request, result)
    }

    /// Fetch the next page when there is one and nothing is loading.
    pub async fn load_more<B: FeedBackend + ?Sized>(&mut self, backend: &B) -> bool {
        if !self.has_more || self.loading {
            return false;
        }
        self.fetch_page(backend, self.page + 1).await
    }

    pub async fn refresh<B: FeedBackend + ?Sized>(&mut self, backend: &B) -> bool {
        self.fetch_page(backend, 1).await
    }

    /// Switch tab without fetching. The current list stays until page 1 arrives.
    pub fn set_tab(&mut self, tab: FeedTab) -> Option<PageRequest> {
        if tab == self.tab && !self.items.is_empty() {
            return None;
        }
        self.tab = tab;
        self.begin_fetch(1)
    }

    pub async fn switch_tab<B: FeedBackend + ?Sized>(&mut self, backend: &B, tab: FeedTab) -> bool {
        let Some(request) = self.set_tab(tab) else {
            return false;
        };
        let result = backend.fetch_posts(&request.query).await;
        self.finish_fetch(request, result)
    }

    // Per-post interactions

    pub fn begin_toggle(&mut self, post_id: &str, kind: Interaction) -> ActionResult<Option<PendingToggle>> {
        Ok(self.item_mut(post_id)?.begin_toggle(kind))
    }

    /// Settle a toggle. Results for posts no longer listed are dropped.
    pub fn finish_toggle(&mut self, pending: PendingToggle, result: ApiResult<bool>) -> ActionResult<()> {
        match self.item_mut(&pending.post_id) {
            Ok(item) => item.finish_toggle(pending, result),
            Err(_) => {
                log_interaction!("ignoring {} result for unlisted post {}", pending.kind.as_str(), pending.post_id);
                Ok(())
            }
        }
    }

    pub async fn toggle<B: FeedBackend + ?Sized>(&mut self, backend: &B, post_id: &str, kind: Interaction) -> ActionResult<()> {
        self.item_mut(post_id)?.toggle(backend, kind).await
    }

    pub async fn like<B: FeedBackend + ?Sized>(&mut self, backend: &B, post_id: &str) -> ActionResult<()> {
        self.toggle(backend, post_id, Interaction::Like).await
    }

    pub async fn repost<B: FeedBackend + ?Sized>(&mut self, backend: &B, post_id: &str) -> ActionResult<()> {
        self.toggle(backend, post_id, Interaction::Repost).await
    }

    pub async fn bookmark<B: FeedBackend + ?Sized>(&mut self, backend: &B, post_id: &str) -> ActionResult<()> {
        self.toggle(backend, post_id, Interaction::Bookmark).await
    }

    pub async fn record_view<B: FeedBackend + ?Sized>(&mut self, backend: &B, post_id: &str, ratio: f64) -> ActionResult<bool> {
        Ok(self.item_mut(post_id)?.record_view(backend, ratio).await)
    }

    pub async fn open_comments<B: FeedBackend + ?Sized>(&mut self, backend: &B, post_id: &str) -> ActionResult<()> {
        self.item_mut(post_id)?.open_comments(backend).await;
        Ok(())
    }

    pub async fn submit_comment<B: FeedBackend + ?Sized>(&mut self, backend: &B, post_id: &str, text: &str) -> ActionResult<()> {
        self.item_mut(post_id)?.submit_comment(backend, text).await
    }

    pub fn submit_reply(&mut self, post_id: &str, comment_id: &str, text: &str) -> ActionResult<&Reply> {
        self.item_mut(post_id)?.submit_reply(comment_id, text)
    }

    /// Publish a draft and reload the first page.
    pub async fn create_post<B: FeedBackend + ?Sized>(&mut self, backend: &B, draft: &mut PostDraft) -> ActionResult<()> {
        draft.submit(backend).await?;
        self.refresh(backend).await;
        Ok(())
    }
}
