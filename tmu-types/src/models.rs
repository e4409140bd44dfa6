use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{ElectionStatus, Interaction, MediaKind, PostKind, Priority};

// Custom serde module for DateTime to ensure RFC3339 string format
mod datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = date.to_rfc3339();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom)
    }
}

/// Avatar glyph shown when an author has no emoji avatar.
pub const DEFAULT_AVATAR: &str = "👤";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub handle: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

impl Author {
    /// Emoji avatar for display. Image paths and URLs fall back to the default glyph.
    pub fn avatar_glyph(&self) -> &str {
        match self.avatar.as_deref() {
            Some(a) if !a.is_empty() && !a.starts_with('/') && !a.starts_with("http") => a,
            _ => DEFAULT_AVATAR,
        }
    }

    /// Placeholder author used for replies composed on this device.
    pub fn local_viewer() -> Self {
        Self {
            id: None,
            name: "You".to_string(),
            handle: "@you".to_string(),
            avatar: Some(DEFAULT_AVATAR.to_string()),
            is_verified: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub kind: MediaKind,
    pub url: String,
}

/// Engagement counters of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub likes: u32,
    pub reposts: u32,
    pub comments: u32,
    pub views: u32,
}

/// Per-viewer interaction flags of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerFlags {
    pub is_liked: bool,
    pub is_reposted: bool,
    pub is_bookmarked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author: Author,
    #[serde(default)]
    pub kind: PostKind,
    pub content: String,
    #[serde(default)]
    pub media: Vec<Media>,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub counters: Counters,
    #[serde(default)]
    pub viewer: ViewerFlags,
}

impl Post {
    /// Official campus posts and posts by verified authors get the verified badge.
    pub fn is_official(&self) -> bool {
        self.kind == PostKind::Official || self.author.is_verified
    }

    pub fn flag(&self, kind: Interaction) -> bool {
        match kind {
            Interaction::Like => self.viewer.is_liked,
            Interaction::Repost => self.viewer.is_reposted,
            Interaction::Bookmark => self.viewer.is_bookmarked,
        }
    }

    /// Counter paired with `kind`, if it has one. Bookmarks are flag-only.
    pub fn counter(&self, kind: Interaction) -> Option<u32> {
        match kind {
            Interaction::Like => Some(self.counters.likes),
            Interaction::Repost => Some(self.counters.reposts),
            Interaction::Bookmark => None,
        }
    }

    /// Set the flag for `kind`, moving its paired counter by one when the flag changes.
    ///
    /// Returns whether the flag changed. Counters saturate at zero.
    pub fn set_flag(&mut self, kind: Interaction, value: bool) -> bool {
        if self.flag(kind) == value {
            return false;
        }
        let (flag, counter) = match kind {
            Interaction::Like => (&mut self.viewer.is_liked, Some(&mut self.counters.likes)),
            Interaction::Repost => (&mut self.viewer.is_reposted, Some(&mut self.counters.reposts)),
            Interaction::Bookmark => (&mut self.viewer.is_bookmarked, None),
        };
        *flag = value;
        if let Some(counter) = counter {
            *counter = if value {
                counter.saturating_add(1)
            } else {
                counter.saturating_sub(1)
            };
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: String,
    pub comment_id: String,
    pub author: Author,
    pub content: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    /// Composed on this device and never sent to the backend
    #[serde(default)]
    pub local_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author: Author,
    pub content: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

/// One page of the feed together with the backend's pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub page: u32,
    pub pages: u32,
}

impl PostPage {
    pub fn has_more(&self) -> bool {
        self.page < self.pages
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub manifesto: String,
    #[serde(default)]
    pub votes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ElectionStatus,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Backend's record of whether the current viewer already voted
    #[serde(default)]
    pub has_voted: bool,
}

impl Election {
    pub fn total_votes(&self) -> u32 {
        self.candidates.iter().map(|c| c.votes).sum()
    }

    pub fn candidate(&self, candidate_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == candidate_id)
    }
}

/// Rounded share of `votes` in `total`, 0 when nobody voted.
pub fn vote_percentage(votes: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((votes as f64 / total as f64) * 100.0).round() as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: String,
    pub sender: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    pub icon: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub views: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub reg_number: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub following: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampusStats {
    pub users_total: u64,
    pub posts_total: u64,
    pub posts_today: u64,
    pub total_views: u64,
    pub active_elections: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingTag {
    pub tag: String,
    pub posts: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

// Request types for the API (camelCase on the wire)

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub reg_number: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub reg_number: String,
    pub password: String,
    #[serde(default)]
    pub department: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "student".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPayload {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub media: Vec<MediaPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub candidate_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCandidateRequest {
    pub name: String,
    #[serde(default)]
    pub manifesto: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementRequest {
    pub title: String,
    pub content: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
}
