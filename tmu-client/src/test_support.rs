//! In-memory backend and fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tmu_types::*;

use crate::api::*;

pub fn sample_post(id: &str) -> Post {
    Post {
        id: id.to_string(),
        author: Author {
            id: Some("u1".to_string()),
            name: "Ada Obi".to_string(),
            handle: "@ada".to_string(),
            avatar: None,
            is_verified: false,
        },
        kind: PostKind::Student,
        content: format!("post {}", id),
        media: Vec::new(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        counters: Counters::default(),
        viewer: ViewerFlags::default(),
    }
}

pub fn sample_comment(id: &str, post_id: &str) -> Comment {
    Comment {
        id: id.to_string(),
        post_id: post_id.to_string(),
        author: Author {
            id: Some("u2".to_string()),
            name: "Ben Kay".to_string(),
            handle: "@ben".to_string(),
            avatar: None,
            is_verified: false,
        },
        content: format!("comment {}", id),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        replies: Vec::new(),
    }
}

/// Page `page` of `pages` holding `count` posts with ids `<prefix>-<n>`
pub fn page_of(prefix: &str, count: usize, page: u32, pages: u32) -> PostPage {
    PostPage {
        posts: (0..count).map(|i| sample_post(&format!("{}-{}", prefix, i))).collect(),
        page,
        pages,
    }
}

pub fn sample_user(id: &str) -> User {
    User {
        id: id.to_string(),
        name: format!("User {}", id),
        email: Some(format!("{}@tmu.ac", id)),
        reg_number: Some(format!("REG-{}", id)),
        handle: Some(format!("@{}", id)),
        avatar: None,
        bio: None,
        department: Some("Computing".to_string()),
        role: Some("student".to_string()),
        is_verified: false,
        followers: 0,
        following: 0,
    }
}

pub fn sample_election(id: &str, candidates: &[(&str, u32)]) -> Election {
    Election {
        id: id.to_string(),
        title: format!("Election {}", id),
        description: String::new(),
        status: ElectionStatus::Active,
        end_date: None,
        candidates: candidates
            .iter()
            .map(|(cid, votes)| Candidate {
                id: cid.to_string(),
                name: format!("Candidate {}", cid),
                manifesto: String::new(),
                votes: *votes,
            })
            .collect(),
        has_voted: false,
    }
}

pub fn sample_announcement(id: &str, priority: Priority, pinned: bool) -> Announcement {
    Announcement {
        id: id.to_string(),
        sender: "Registry".to_string(),
        title: format!("Notice {}", id),
        content: String::new(),
        published_at: None,
        priority,
        icon: "📢".to_string(),
        category: None,
        is_pinned: pinned,
        views: 0,
    }
}

fn server_error() -> ApiError {
    ApiError::Api {
        status: 500,
        message: "Internal server error".to_string(),
    }
}

#[derive(Default)]
struct Failures {
    reads: bool,
    writes: bool,
    prefixes: Vec<String>,
}

/// Backend keeping everything in memory and recording each call as
/// `"<METHOD> <path>[ <params>]"`.
#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<String>>,
    failures: Mutex<Failures>,
    token: Option<String>,
    sessions: Mutex<HashMap<String, User>>,
    accounts: Mutex<HashMap<String, (String, User)>>,
    pages: Mutex<HashMap<(FeedTab, u32), PostPage>>,
    created: Mutex<Vec<CreatePostRequest>>,
    toggle_answer: Mutex<Option<bool>>,
    toggle_state: Mutex<HashMap<(String, Interaction), bool>>,
    comments: Mutex<HashMap<String, Vec<Comment>>>,
    elections: Mutex<Vec<Election>>,
    announcements: Mutex<Vec<Announcement>>,
    users: Mutex<HashMap<String, User>>,
    stats: Mutex<CampusStats>,
    trending: Mutex<Vec<TrendingTag>>,
    suggestions: Mutex<Vec<SuggestedUser>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail_reads(&self, fail: bool) {
        self.failures.lock().unwrap().reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.failures.lock().unwrap().writes = fail;
    }

    /// Fail every call whose record starts with `prefix`
    pub fn fail_calls_starting_with(&self, prefix: &str) {
        self.failures.lock().unwrap().prefixes.push(prefix.to_string());
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn add_account(&self, reg_number: &str, password: &str, user: User) {
        self.accounts
            .lock()
            .unwrap()
            .insert(reg_number.to_string(), (password.to_string(), user));
    }

    /// Accept `token` as belonging to `user` without a login
    pub fn issue_token(&self, token: &str, user: User) {
        self.sessions.lock().unwrap().insert(token.to_string(), user);
    }

    pub fn seed_pages(&self, tab: FeedTab, pages: u32, per_page: usize) {
        let mut map = self.pages.lock().unwrap();
        for page in 1..=pages {
            let prefix = format!("{}-{}", tab.as_str(), page);
            map.insert((tab, page), page_of(&prefix, per_page, page, pages));
        }
    }

    pub fn seed_feed_page(&self, page: PostPage) {
        self.pages.lock().unwrap().insert((FeedTab::ForYou, page.page), page);
    }

    pub fn created_posts(&self) -> Vec<CreatePostRequest> {
        self.created.lock().unwrap().clone()
    }

    /// Answer every toggle with `flag`, or flip per-post server state when None
    pub fn answer_toggles_with(&self, flag: Option<bool>) {
        *self.toggle_answer.lock().unwrap() = flag;
    }

    pub fn seed_comments(&self, post_id: &str, comments: Vec<Comment>) {
        self.comments.lock().unwrap().insert(post_id.to_string(), comments);
    }

    pub fn seed_elections(&self, elections: Vec<Election>) {
        *self.elections.lock().unwrap() = elections;
    }

    pub fn seed_announcements(&self, announcements: Vec<Announcement>) {
        *self.announcements.lock().unwrap() = announcements;
    }

    pub fn seed_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn seed_campus(&self, stats: CampusStats, trending: Vec<TrendingTag>, suggestions: Vec<SuggestedUser>) {
        *self.stats.lock().unwrap() = stats;
        *self.trending.lock().unwrap() = trending;
        *self.suggestions.lock().unwrap() = suggestions;
    }

    fn record(&self, call: String) -> ApiResult<()> {
        let failures = self.failures.lock().unwrap();
        let is_read = call.starts_with("GET");
        let fail = (is_read && failures.reads)
            || (!is_read && failures.writes)
            || failures.prefixes.iter().any(|p| call.starts_with(p.as_str()));
        self.calls.lock().unwrap().push(call);
        if fail {
            Err(server_error())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    async fn login(&mut self, request: &LoginRequest) -> ApiResult<AuthGrant> {
        self.record("POST /auth/login".to_string())?;
        let user = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(&request.reg_number) {
                Some((password, user)) if *password == request.password => user.clone(),
                _ => return Err(ApiError::Unauthorized("Invalid credentials".to_string())),
            }
        };
        let token = format!("token-{}", request.reg_number);
        self.issue_token(&token, user.clone());
        self.token = Some(token.clone());
        Ok(AuthGrant { token, user })
    }

    async fn register(&mut self, request: &RegisterRequest) -> ApiResult<AuthGrant> {
        self.record("POST /auth/register".to_string())?;
        if self.accounts.lock().unwrap().contains_key(&request.reg_number) {
            return Err(ApiError::BadRequest("User already exists".to_string()));
        }
        let mut user = sample_user(&request.reg_number);
        user.name = request.name.clone();
        user.email = Some(request.email.clone());
        self.add_account(&request.reg_number, &request.password, user.clone());

        let token = format!("token-{}", request.reg_number);
        self.issue_token(&token, user.clone());
        self.token = Some(token.clone());
        Ok(AuthGrant { token, user })
    }

    async fn me(&self) -> ApiResult<User> {
        self.record("GET /auth/me".to_string())?;
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| ApiError::Unauthorized("No token".to_string()))?;
        self.sessions
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Invalid token".to_string()))
    }

    async fn logout(&self) -> ApiResult<()> {
        self.record("POST /auth/logout".to_string())
    }

    async fn update_password(&self, request: &UpdatePasswordRequest) -> ApiResult<()> {
        self.record("PUT /auth/password".to_string())?;
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .values_mut()
            .find(|(password, _)| *password == request.current_password)
            .ok_or_else(|| ApiError::BadRequest("Current password is incorrect".to_string()))?;
        account.0 = request.new_password.clone();
        Ok(())
    }
}

#[async_trait]
impl FeedBackend for FakeBackend {
    async fn fetch_posts(&self, query: &PostQuery) -> ApiResult<PostPage> {
        self.record(format!("GET /posts page={} tab={}", query.page, query.tab.as_str()))?;
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(&(query.tab, query.page))
            .cloned()
            .unwrap_or(PostPage { posts: Vec::new(), page: query.page, pages: query.page }))
    }

    async fn create_post(&self, request: &CreatePostRequest) -> ApiResult<Option<Post>> {
        self.record("POST /posts".to_string())?;
        self.created.lock().unwrap().push(request.clone());
        Ok(None)
    }

    async fn toggle_interaction(&self, post_id: &str, kind: Interaction) -> ApiResult<bool> {
        self.record(format!("POST /posts/{}/{}", post_id, kind.as_str()))?;
        if let Some(flag) = *self.toggle_answer.lock().unwrap() {
            return Ok(flag);
        }
        let mut state = self.toggle_state.lock().unwrap();
        let flag = state.entry((post_id.to_string(), kind)).or_insert(false);
        *flag = !*flag;
        Ok(*flag)
    }

    async fn track_view(&self, post_id: &str) -> ApiResult<()> {
        self.record(format!("POST /posts/{}/view", post_id))
    }

    async fn fetch_comments(&self, post_id: &str) -> ApiResult<Vec<Comment>> {
        self.record(format!("GET /posts/{}/comments", post_id))?;
        Ok(self.comments.lock().unwrap().get(post_id).cloned().unwrap_or_default())
    }

    async fn add_comment(&self, post_id: &str, content: &str) -> ApiResult<()> {
        self.record(format!("POST /posts/{}/comments", post_id))?;
        let mut comments = self.comments.lock().unwrap();
        let list = comments.entry(post_id.to_string()).or_default();
        let mut comment = sample_comment(&format!("c{}", list.len() + 100), post_id);
        comment.content = content.to_string();
        list.push(comment);
        Ok(())
    }
}

#[async_trait]
impl ElectionBackend for FakeBackend {
    async fn fetch_elections(&self, status: Option<ElectionStatus>) -> ApiResult<Vec<Election>> {
        let call = match status {
            Some(s) => format!("GET /elections status={}", s.as_str()),
            None => "GET /elections".to_string(),
        };
        self.record(call)?;
        Ok(self
            .elections
            .lock()
            .unwrap()
            .iter()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .cloned()
            .collect())
    }

    async fn vote(&self, election_id: &str, candidate_ids: &[String]) -> ApiResult<()> {
        self.record(format!("POST /elections/{}/vote {}", election_id, candidate_ids.join(",")))?;
        let mut elections = self.elections.lock().unwrap();
        let election = elections
            .iter_mut()
            .find(|e| e.id == election_id)
            .ok_or_else(|| ApiError::NotFound("Election not found".to_string()))?;
        if election.has_voted {
            return Err(ApiError::BadRequest("You have already voted".to_string()));
        }
        for candidate in election.candidates.iter_mut() {
            if candidate_ids.contains(&candidate.id) {
                candidate.votes += 1;
            }
        }
        election.has_voted = true;
        Ok(())
    }
}

#[async_trait]
impl AnnouncementBackend for FakeBackend {
    async fn fetch_announcements(&self, filter: AnnouncementFilter) -> ApiResult<Vec<Announcement>> {
        let call = match filter.priority_param() {
            Some(p) => format!("GET /announcements priority={}", p),
            None => "GET /announcements".to_string(),
        };
        self.record(call)?;
        let wanted = filter.priority_param();
        Ok(self
            .announcements
            .lock()
            .unwrap()
            .iter()
            .filter(|a| wanted.map_or(true, |p| a.priority.as_str() == p))
            .cloned()
            .collect())
    }

    async fn acknowledge(&self, announcement_id: &str) -> ApiResult<()> {
        self.record(format!("POST /announcements/{}/acknowledge", announcement_id))
    }
}

#[async_trait]
impl ProfileBackend for FakeBackend {
    async fn fetch_user(&self, user_id: &str) -> ApiResult<User> {
        self.record(format!("GET /users/{}", user_id))?;
        self.users
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    async fn update_profile(&self, _request: &UpdateProfileRequest) -> ApiResult<Option<User>> {
        self.record("PUT /users/profile".to_string())?;
        Ok(None)
    }

    async fn follow(&self, user_id: &str) -> ApiResult<()> {
        self.record(format!("POST /users/{}/follow", user_id))
    }

    async fn unfollow(&self, user_id: &str) -> ApiResult<()> {
        self.record(format!("DELETE /users/{}/follow", user_id))
    }

    async fn update_post(&self, post_id: &str, _content: &str) -> ApiResult<()> {
        self.record(format!("PUT /posts/{}", post_id))
    }

    async fn delete_post(&self, post_id: &str) -> ApiResult<()> {
        self.record(format!("DELETE /posts/{}", post_id))
    }
}

#[async_trait]
impl CampusBackend for FakeBackend {
    async fn stats(&self) -> ApiResult<CampusStats> {
        self.record("GET /stats".to_string())?;
        Ok(*self.stats.lock().unwrap())
    }

    async fn trending(&self) -> ApiResult<Vec<TrendingTag>> {
        self.record("GET /stats/trending".to_string())?;
        Ok(self.trending.lock().unwrap().clone())
    }

    async fn who_to_follow(&self) -> ApiResult<Vec<SuggestedUser>> {
        self.record("GET /stats/who-to-follow".to_string())?;
        Ok(self.suggestions.lock().unwrap().clone())
    }
}
