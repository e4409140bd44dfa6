mod client;
mod error;
mod wire;

pub use client::{ApiClient, AuthGrant, DEFAULT_API_URL};
pub use error::{ApiError, ApiResult};

use async_trait::async_trait;
use tmu_types::*;

/// Posts requested per feed page
pub const PAGE_SIZE: u32 = 20;

/// Query of one feed page. The tab selects the server-side filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostQuery {
    pub page: u32,
    pub limit: u32,
    pub tab: FeedTab,
}

impl PostQuery {
    pub fn new(tab: FeedTab, page: u32) -> Self {
        Self { page, limit: PAGE_SIZE, tab }
    }

    /// Query parameters sent to `GET /posts`
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page.to_string()), ("limit", self.limit.to_string())];
        match self.tab {
            FeedTab::ForYou => {}
            FeedTab::Following => params.push(("following", "true".to_string())),
            FeedTab::Campus => params.push(("type", "official".to_string())),
        }
        params
    }
}

/// Authentication endpoints. Implementors hold the bearer token used by later calls.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    fn set_token(&mut self, token: Option<String>);

    async fn login(&mut self, request: &LoginRequest) -> ApiResult<AuthGrant>;

    async fn register(&mut self, request: &RegisterRequest) -> ApiResult<AuthGrant>;

    /// Resolve the user owning the current token
    async fn me(&self) -> ApiResult<User>;

    async fn logout(&self) -> ApiResult<()>;

    async fn update_password(&self, request: &UpdatePasswordRequest) -> ApiResult<()>;
}

/// Feed and per-post interaction endpoints
#[async_trait]
pub trait FeedBackend: Send + Sync {
    async fn fetch_posts(&self, query: &PostQuery) -> ApiResult<PostPage>;

    async fn create_post(&self, request: &CreatePostRequest) -> ApiResult<Option<Post>>;

    /// Toggle `kind` on the server and return the resulting flag
    async fn toggle_interaction(&self, post_id: &str, kind: Interaction) -> ApiResult<bool>;

    async fn track_view(&self, post_id: &str) -> ApiResult<()>;

    async fn fetch_comments(&self, post_id: &str) -> ApiResult<Vec<Comment>>;

    async fn add_comment(&self, post_id: &str, content: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait ElectionBackend: Send + Sync {
    async fn fetch_elections(&self, status: Option<ElectionStatus>) -> ApiResult<Vec<Election>>;

    async fn vote(&self, election_id: &str, candidate_ids: &[String]) -> ApiResult<()>;
}

#[async_trait]
pub trait AnnouncementBackend: Send + Sync {
    async fn fetch_announcements(&self, filter: AnnouncementFilter) -> ApiResult<Vec<Announcement>>;

    async fn acknowledge(&self, announcement_id: &str) -> ApiResult<()>;
}

/// User profile, follow and own-post management endpoints
#[async_trait]
pub trait ProfileBackend: Send + Sync {
    async fn fetch_user(&self, user_id: &str) -> ApiResult<User>;

    /// Save profile fields. Returns the updated user when the backend echoes it.
    async fn update_profile(&self, request: &UpdateProfileRequest) -> ApiResult<Option<User>>;

    async fn follow(&self, user_id: &str) -> ApiResult<()>;

    async fn unfollow(&self, user_id: &str) -> ApiResult<()>;

    async fn update_post(&self, post_id: &str, content: &str) -> ApiResult<()>;

    async fn delete_post(&self, post_id: &str) -> ApiResult<()>;
}

/// Sidebar statistics endpoints
#[async_trait]
pub trait CampusBackend: Send + Sync {
    async fn stats(&self) -> ApiResult<CampusStats>;

    async fn trending(&self) -> ApiResult<Vec<TrendingTag>>;

    async fn who_to_follow(&self) -> ApiResult<Vec<SuggestedUser>>;
}
