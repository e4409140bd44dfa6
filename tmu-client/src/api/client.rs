use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::wire::*;
use super::{
    AnnouncementBackend, ApiError, ApiResult, AuthBackend, CampusBackend, ElectionBackend,
    FeedBackend, PostQuery, ProfileBackend,
};
use tmu_types::*;

/// Default API root when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// API client for communicating with the TMU Times backend
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// Result of a successful login or registration
#[derive(Debug, Clone)]
pub struct AuthGrant {
    pub token: String,
    pub user: User,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Helper to add the bearer token to a request if available
    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            req.bearer_auth(token)
        } else {
            req
        }
    }

    /// Helper to handle API responses: decode the envelope on success, the `{message}` body otherwise
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            let body = if text.trim().is_empty() { "{}" } else { text.as_str() };
            let envelope: Envelope<T> = serde_json::from_str(body)?;
            return envelope.into_body();
        }

        // Clean up HTML error pages from proxies
        let message = if text.contains("<html>") || text.contains("<!DOCTYPE") {
            format!("Server returned {} error. Please check the server URL.", status.as_u16())
        } else {
            serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.message.or(b.error))
                .unwrap_or_else(|| "API request failed".to_string())
        };

        log_api_call!("request failed with {}: {}", status, message);
        Err(ApiError::from_status(status.as_u16(), message))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        log_api_call!("GET {}", path);
        let response = self.authorize(self.client.get(self.url(path))).send().await?;
        self.handle_response(response).await
    }

    async fn get_with_query<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        log_api_call!("GET {} {:?}", path, query);
        let req = self.client.get(self.url(path)).query(query);
        let response = self.authorize(req).send().await?;
        self.handle_response(response).await
    }

    async fn send_json<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<T> {
        log_api_call!("{} {}", method, path);
        let mut req = self.client.request(method, self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = self.authorize(req).send().await?;
        self.handle_response(response).await
    }

    async fn post_empty(&self, path: &str) -> ApiResult<LooseBody> {
        self.send_json::<(), LooseBody>(reqwest::Method::POST, path, None).await
    }

    // Authentication endpoints

    async fn authenticate<B: serde::Serialize>(&mut self, path: &str, body: &B) -> ApiResult<AuthGrant> {
        let body: AuthBody = self.send_json(reqwest::Method::POST, path, Some(body)).await?;
        let token = body
            .token
            .ok_or_else(|| ApiError::Malformed("authentication response without a token".to_string()))?;
        let user = body
            .user
            .ok_or_else(|| ApiError::Malformed("authentication response without a user".to_string()))?;
        let user = User::try_from(user)?;

        self.token = Some(token.clone());
        Ok(AuthGrant { token, user })
    }

    /// Create a post. Returns the created post when the backend echoes it.
    pub async fn create_post_request(&self, request: &CreatePostRequest) -> ApiResult<Option<Post>> {
        let body: LooseBody = self.send_json(reqwest::Method::POST, "/posts", Some(request)).await?;
        match body.get("post") {
            Some(value) => {
                let raw: RawPost = serde_json::from_value(value.clone())?;
                Ok(Some(Post::try_from(raw)?))
            }
            None => Ok(None),
        }
    }

    /// Update an announcement
    pub async fn update_announcement(&self, id: &str, request: &AnnouncementRequest) -> ApiResult<Announcement> {
        let path = format!("/announcements/{}", urlencoding::encode(id));
        let body: AnnouncementBody = self.send_json(reqwest::Method::PUT, &path, Some(request)).await?;
        Announcement::try_from(body.announcement)
    }

    /// Create an announcement
    pub async fn create_announcement(&self, request: &AnnouncementRequest) -> ApiResult<Announcement> {
        let body: AnnouncementBody = self
            .send_json(reqwest::Method::POST, "/announcements", Some(request))
            .await?;
        Announcement::try_from(body.announcement)
    }

    /// Delete an announcement
    pub async fn delete_announcement(&self, id: &str) -> ApiResult<()> {
        let path = format!("/announcements/{}", urlencoding::encode(id));
        self.send_json::<(), LooseBody>(reqwest::Method::DELETE, &path, None).await?;
        Ok(())
    }

    /// Current vote counts of an election
    pub async fn election_results(&self, election_id: &str) -> ApiResult<Vec<Candidate>> {
        let path = format!("/elections/{}/results", urlencoding::encode(election_id));
        let body: ResultsBody = self.get(&path).await?;
        body.results.into_iter().map(Candidate::try_from).collect()
    }

    /// Add a candidate to an election
    pub async fn add_candidate(&self, election_id: &str, request: &AddCandidateRequest) -> ApiResult<Election> {
        let path = format!("/elections/{}/candidates", urlencoding::encode(election_id));
        let body: ElectionBody = self.send_json(reqwest::Method::POST, &path, Some(request)).await?;
        Election::try_from(body.election)
    }

    /// Remove a candidate from an election
    pub async fn remove_candidate(&self, election_id: &str, candidate_id: &str) -> ApiResult<()> {
        let path = format!(
            "/elections/{}/candidates/{}",
            urlencoding::encode(election_id),
            urlencoding::encode(candidate_id)
        );
        self.send_json::<(), LooseBody>(reqwest::Method::DELETE, &path, None).await?;
        Ok(())
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        let base_url = std::env::var("TMU_SERVER_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(base_url)
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    async fn login(&mut self, request: &LoginRequest) -> ApiResult<AuthGrant> {
        self.authenticate("/auth/login", request).await
    }

    async fn register(&mut self, request: &RegisterRequest) -> ApiResult<AuthGrant> {
        self.authenticate("/auth/register", request).await
    }

    async fn me(&self) -> ApiResult<User> {
        let body: UserBody = self.get("/auth/me").await?;
        User::try_from(body.user)
    }

    async fn logout(&self) -> ApiResult<()> {
        self.post_empty("/auth/logout").await?;
        Ok(())
    }

    async fn update_password(&self, request: &UpdatePasswordRequest) -> ApiResult<()> {
        self.send_json::<_, LooseBody>(reqwest::Method::PUT, "/auth/password", Some(request))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FeedBackend for ApiClient {
    async fn fetch_posts(&self, query: &PostQuery) -> ApiResult<PostPage> {
        let body: PostsBody = self.get_with_query("/posts", &query.params()).await?;
        PostPage::try_from(body)
    }

    async fn create_post(&self, request: &CreatePostRequest) -> ApiResult<Option<Post>> {
        self.create_post_request(request).await
    }

    async fn toggle_interaction(&self, post_id: &str, kind: Interaction) -> ApiResult<bool> {
        let path = format!("/posts/{}/{}", urlencoding::encode(post_id), kind.as_str());
        let body = self.post_empty(&path).await?;
        body.get(kind.response_field())
            .and_then(|v| v.as_bool())
            .ok_or_else(|| {
                ApiError::Malformed(format!("{} response without `{}`", kind.as_str(), kind.response_field()))
            })
    }

    async fn track_view(&self, post_id: &str) -> ApiResult<()> {
        let path = format!("/posts/{}/view", urlencoding::encode(post_id));
        self.post_empty(&path).await?;
        Ok(())
    }

    async fn fetch_comments(&self, post_id: &str) -> ApiResult<Vec<Comment>> {
        let path = format!("/posts/{}/comments", urlencoding::encode(post_id));
        let body: CommentsBody = self.get(&path).await?;
        body.comments
            .into_iter()
            .map(|c| c.into_comment(post_id))
            .collect()
    }

    async fn add_comment(&self, post_id: &str, content: &str) -> ApiResult<()> {
        let path = format!("/posts/{}/comments", urlencoding::encode(post_id));
        let request = CreateCommentRequest { content: content.to_string() };
        self.send_json::<_, LooseBody>(reqwest::Method::POST, &path, Some(&request))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ElectionBackend for ApiClient {
    async fn fetch_elections(&self, status: Option<ElectionStatus>) -> ApiResult<Vec<Election>> {
        let query: Vec<(&str, String)> = status
            .map(|s| vec![("status", s.as_str().to_string())])
            .unwrap_or_default();
        let body: ElectionsBody = self.get_with_query("/elections", &query).await?;
        body.elections.into_iter().map(Election::try_from).collect()
    }

    async fn vote(&self, election_id: &str, candidate_ids: &[String]) -> ApiResult<()> {
        let path = format!("/elections/{}/vote", urlencoding::encode(election_id));
        let request = VoteRequest { candidate_ids: candidate_ids.to_vec() };
        self.send_json::<_, LooseBody>(reqwest::Method::POST, &path, Some(&request))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AnnouncementBackend for ApiClient {
    async fn fetch_announcements(&self, filter: AnnouncementFilter) -> ApiResult<Vec<Announcement>> {
        let query: Vec<(&str, String)> = filter
            .priority_param()
            .map(|p| vec![("priority", p.to_string())])
            .unwrap_or_default();
        let body: AnnouncementsBody = self.get_with_query("/announcements", &query).await?;
        body.announcements
            .into_iter()
            .map(Announcement::try_from)
            .collect()
    }

    async fn acknowledge(&self, announcement_id: &str) -> ApiResult<()> {
        let path = format!("/announcements/{}/acknowledge", urlencoding::encode(announcement_id));
        self.post_empty(&path).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileBackend for ApiClient {
    async fn fetch_user(&self, user_id: &str) -> ApiResult<User> {
        let path = format!("/users/{}", urlencoding::encode(user_id));
        let body: UserBody = self.get(&path).await?;
        User::try_from(body.user)
    }

    async fn update_profile(&self, request: &UpdateProfileRequest) -> ApiResult<Option<User>> {
        let body: LooseBody = self
            .send_json(reqwest::Method::PUT, "/users/profile", Some(request))
            .await?;
        match body.get("user") {
            Some(value) => {
                let raw: RawUser = serde_json::from_value(value.clone())?;
                Ok(Some(User::try_from(raw)?))
            }
            None => Ok(None),
        }
    }

    async fn follow(&self, user_id: &str) -> ApiResult<()> {
        let path = format!("/users/{}/follow", urlencoding::encode(user_id));
        self.post_empty(&path).await?;
        Ok(())
    }

    async fn unfollow(&self, user_id: &str) -> ApiResult<()> {
        let path = format!("/users/{}/follow", urlencoding::encode(user_id));
        self.send_json::<(), LooseBody>(reqwest::Method::DELETE, &path, None)
            .await?;
        Ok(())
    }

    async fn update_post(&self, post_id: &str, content: &str) -> ApiResult<()> {
        let path = format!("/posts/{}", urlencoding::encode(post_id));
        let request = UpdatePostRequest { content: content.to_string() };
        self.send_json::<_, LooseBody>(reqwest::Method::PUT, &path, Some(&request))
            .await?;
        Ok(())
    }

    async fn delete_post(&self, post_id: &str) -> ApiResult<()> {
        let path = format!("/posts/{}", urlencoding::encode(post_id));
        self.send_json::<(), LooseBody>(reqwest::Method::DELETE, &path, None)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CampusBackend for ApiClient {
    async fn stats(&self) -> ApiResult<CampusStats> {
        let body: StatsBody = self.get("/stats").await?;
        Ok(CampusStats::from(body.stats))
    }

    async fn trending(&self) -> ApiResult<Vec<TrendingTag>> {
        let body: TrendingBody = self.get("/stats/trending").await?;
        Ok(body.trending.hashtags)
    }

    async fn who_to_follow(&self) -> ApiResult<Vec<SuggestedUser>> {
        let body: SuggestionsBody = self.get("/stats/who-to-follow").await?;
        body.users.into_iter().map(SuggestedUser::try_from).collect()
    }
}
