//! Backend response shapes and their normalization into `tmu_types`.
//!
//! The backend is loosely typed: records carry `_id` or `id`, populated
//! references may arrive as bare ids, and counts may be numbers or arrays.
//! Everything is resolved here so the rest of the crate only sees the
//! canonical schema.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{ApiError, ApiResult};
use tmu_types::*;

/// Common response envelope: `{ success?, message?, ...body }`
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Envelope<T> {
    /// Unwrap the body, turning `success: false` into a rejection.
    pub fn into_body(self) -> ApiResult<T> {
        if self.success == Some(false) {
            return Err(ApiError::Rejected(
                self.message.unwrap_or_else(|| "API request failed".to_string()),
            ));
        }
        Ok(self.body)
    }
}

/// Error body of non-2xx responses
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn pick_id(id: Option<String>, underscore_id: Option<String>, what: &str) -> ApiResult<String> {
    id.or(underscore_id)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Malformed(format!("{} without an id", what)))
}

/// Id of a reference that is either a bare id string or a populated object.
fn ref_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("id")
            .or_else(|| map.get("_id"))
            .and_then(|v| v.as_str())
            .map(String::from),
        _ => None,
    }
}

/// Count that is either a number or an array of ids.
fn count_of(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n.min(u32::MAX as u64) as u32).unwrap_or(0),
        Value::Array(items) => items.len() as u32,
        _ => 0,
    }
}

fn clamp_count(n: i64) -> u32 {
    n.clamp(0, u32::MAX as i64) as u32
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawAuthor {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    underscore_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    handle: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    is_verified: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawAuthorRef {
    Populated(RawAuthor),
    Id(String),
}

fn author_from(raw: Option<RawAuthorRef>, fallback_name: &str) -> Author {
    match raw {
        Some(RawAuthorRef::Populated(a)) => Author {
            id: a.id.or(a.underscore_id),
            name: a.name.unwrap_or_else(|| fallback_name.to_string()),
            handle: a.handle.unwrap_or_else(|| "@unknown".to_string()),
            avatar: a.avatar,
            is_verified: a.is_verified,
        },
        Some(RawAuthorRef::Id(id)) => Author {
            id: Some(id),
            name: fallback_name.to_string(),
            handle: "@unknown".to_string(),
            avatar: None,
            is_verified: false,
        },
        None => Author {
            id: None,
            name: fallback_name.to_string(),
            handle: "@unknown".to_string(),
            avatar: None,
            is_verified: false,
        },
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMedia {
    #[serde(rename = "type")]
    kind: MediaKind,
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPost {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    underscore_id: Option<String>,
    #[serde(default)]
    author: Option<RawAuthorRef>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    media: Vec<RawMedia>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    like_count: Option<i64>,
    #[serde(default)]
    repost_count: Option<i64>,
    #[serde(default)]
    comment_count: Option<i64>,
    #[serde(default)]
    views: Option<i64>,
    #[serde(default)]
    is_liked: Option<bool>,
    #[serde(default)]
    is_reposted: Option<bool>,
    #[serde(default)]
    is_bookmarked: Option<bool>,
}

impl TryFrom<RawPost> for Post {
    type Error = ApiError;

    fn try_from(raw: RawPost) -> ApiResult<Self> {
        Ok(Post {
            id: pick_id(raw.id, raw.underscore_id, "post")?,
            author: author_from(raw.author, "Unknown"),
            kind: raw.kind.as_deref().map(PostKind::parse).unwrap_or_default(),
            content: raw.content,
            media: raw
                .media
                .into_iter()
                .map(|m| Media { kind: m.kind, url: m.url })
                .collect(),
            created_at: raw.created_at,
            counters: Counters {
                likes: clamp_count(raw.like_count.unwrap_or(0)),
                reposts: clamp_count(raw.repost_count.unwrap_or(0)),
                comments: clamp_count(raw.comment_count.unwrap_or(0)),
                views: clamp_count(raw.views.unwrap_or(0)),
            },
            viewer: ViewerFlags {
                is_liked: raw.is_liked.unwrap_or_default(),
                is_reposted: raw.is_reposted.unwrap_or_default(),
                is_bookmarked: raw.is_bookmarked.unwrap_or_default(),
            },
        })
    }
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostsBody {
    #[serde(default)]
    pub posts: Vec<RawPost>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page")]
    pub pages: u32,
}

impl TryFrom<PostsBody> for PostPage {
    type Error = ApiError;

    fn try_from(body: PostsBody) -> ApiResult<Self> {
        Ok(PostPage {
            posts: body
                .posts
                .into_iter()
                .map(Post::try_from)
                .collect::<ApiResult<Vec<_>>>()?,
            page: body.page,
            pages: body.pages,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostBody {
    pub post: RawPost,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawReply {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    underscore_id: Option<String>,
    #[serde(default)]
    author: Option<RawAuthorRef>,
    #[serde(default)]
    content: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawComment {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    underscore_id: Option<String>,
    #[serde(default)]
    author: Option<RawAuthorRef>,
    #[serde(default)]
    content: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    replies: Vec<RawReply>,
}

impl RawComment {
    /// Normalize a comment fetched for `post_id`.
    pub fn into_comment(self, post_id: &str) -> ApiResult<Comment> {
        let id = pick_id(self.id, self.underscore_id, "comment")?;
        let replies = self
            .replies
            .into_iter()
            .map(|r| {
                Ok(Reply {
                    id: pick_id(r.id, r.underscore_id, "reply")?,
                    comment_id: id.clone(),
                    author: author_from(r.author, "Anonymous"),
                    content: r.content,
                    created_at: r.created_at,
                    local_only: false,
                })
            })
            .collect::<ApiResult<Vec<_>>>()?;
        Ok(Comment {
            id,
            post_id: post_id.to_string(),
            author: author_from(self.author, "Anonymous"),
            content: self.content,
            created_at: self.created_at,
            replies,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentsBody {
    #[serde(default)]
    pub comments: Vec<RawComment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawUser {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    underscore_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    reg_number: Option<String>,
    #[serde(default)]
    handle: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    is_verified: bool,
    #[serde(default)]
    followers: Value,
    #[serde(default)]
    following: Value,
}

impl TryFrom<RawUser> for User {
    type Error = ApiError;

    fn try_from(raw: RawUser) -> ApiResult<Self> {
        Ok(User {
            id: pick_id(raw.id, raw.underscore_id, "user")?,
            name: raw.name.unwrap_or_else(|| "Unknown".to_string()),
            email: raw.email,
            reg_number: raw.reg_number,
            handle: raw.handle,
            avatar: raw.avatar,
            bio: raw.bio,
            department: raw.department,
            role: raw.role,
            is_verified: raw.is_verified,
            followers: count_of(&raw.followers),
            following: count_of(&raw.following),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthBody {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserBody {
    pub user: RawUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawCandidate {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    underscore_id: Option<String>,
    #[serde(default)]
    user: Value,
    #[serde(default)]
    name: String,
    #[serde(default)]
    manifesto: String,
    #[serde(default)]
    votes: Value,
}

impl TryFrom<RawCandidate> for Candidate {
    type Error = ApiError;

    fn try_from(raw: RawCandidate) -> ApiResult<Self> {
        // Candidates without their own id are keyed by the user they represent
        let id = pick_id(raw.id.or(raw.underscore_id), ref_id(&raw.user), "candidate")?;
        Ok(Candidate {
            id,
            name: raw.name,
            manifesto: raw.manifesto,
            votes: count_of(&raw.votes),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawElection {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    underscore_id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    candidates: Vec<RawCandidate>,
    #[serde(default)]
    has_voted: bool,
}

impl TryFrom<RawElection> for Election {
    type Error = ApiError;

    fn try_from(raw: RawElection) -> ApiResult<Self> {
        Ok(Election {
            id: pick_id(raw.id, raw.underscore_id, "election")?,
            title: raw.title,
            description: raw.description,
            status: raw
                .status
                .as_deref()
                .and_then(ElectionStatus::parse)
                .unwrap_or_default(),
            end_date: raw.end_date,
            candidates: raw
                .candidates
                .into_iter()
                .map(Candidate::try_from)
                .collect::<ApiResult<Vec<_>>>()?,
            has_voted: raw.has_voted,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ElectionsBody {
    #[serde(default)]
    pub elections: Vec<RawElection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ElectionBody {
    pub election: RawElection,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResultsBody {
    #[serde(default, alias = "candidates")]
    pub results: Vec<RawCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawAnnouncement {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    underscore_id: Option<String>,
    #[serde(default)]
    author: Option<RawAuthorRef>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    is_pinned: Option<bool>,
    #[serde(default)]
    views: Option<i64>,
}

impl TryFrom<RawAnnouncement> for Announcement {
    type Error = ApiError;

    fn try_from(raw: RawAnnouncement) -> ApiResult<Self> {
        Ok(Announcement {
            id: pick_id(raw.id, raw.underscore_id, "announcement")?,
            sender: author_from(raw.author, "Administration").name,
            title: raw.title,
            content: raw.content,
            published_at: raw.published_at.or(raw.created_at),
            priority: raw
                .priority
                .as_deref()
                .and_then(Priority::parse)
                .unwrap_or_default(),
            icon: raw.icon.unwrap_or_else(|| "📢".to_string()),
            category: raw.category,
            is_pinned: raw.is_pinned.unwrap_or_default(),
            views: clamp_count(raw.views.unwrap_or(0)),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnnouncementsBody {
    #[serde(default)]
    pub announcements: Vec<RawAnnouncement>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnnouncementBody {
    pub announcement: RawAnnouncement,
}

#[derive(Debug, Default, Deserialize)]
struct RawTotal {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    today: u64,
    #[serde(default)]
    active: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEngagement {
    #[serde(default)]
    total_views: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawStats {
    #[serde(default)]
    users: RawTotal,
    #[serde(default)]
    posts: RawTotal,
    #[serde(default)]
    engagement: RawEngagement,
    #[serde(default)]
    elections: RawTotal,
}

impl From<RawStats> for CampusStats {
    fn from(raw: RawStats) -> Self {
        CampusStats {
            users_total: raw.users.total,
            posts_total: raw.posts.total,
            posts_today: raw.posts.today,
            total_views: raw.engagement.total_views,
            active_elections: raw.elections.active,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsBody {
    pub stats: RawStats,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawTrending {
    #[serde(default)]
    pub hashtags: Vec<TrendingTag>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrendingBody {
    #[serde(default)]
    pub trending: RawTrending,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawSuggestedUser {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    underscore_id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    handle: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    is_verified: bool,
}

impl TryFrom<RawSuggestedUser> for SuggestedUser {
    type Error = ApiError;

    fn try_from(raw: RawSuggestedUser) -> ApiResult<Self> {
        Ok(SuggestedUser {
            id: pick_id(raw.id, raw.underscore_id, "user")?,
            name: raw.name,
            handle: raw.handle,
            avatar: raw.avatar,
            bio: raw.bio,
            is_verified: raw.is_verified,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SuggestionsBody {
    #[serde(default)]
    pub users: Vec<RawSuggestedUser>,
}

/// Body of endpoints whose payload is irrelevant or a single flag
pub(crate) type LooseBody = serde_json::Map<String, Value>;
