use serde::{Deserialize, Serialize};

/// Toggleable per-viewer interactions on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interaction {
    Like,
    Repost,
    Bookmark,
}

impl Interaction {
    pub const ALL: [Interaction; 3] = [Interaction::Like, Interaction::Repost, Interaction::Bookmark];

    /// Path segment of the toggle endpoint (`/posts/:id/<segment>`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Interaction::Like => "like",
            Interaction::Repost => "repost",
            Interaction::Bookmark => "bookmark",
        }
    }

    /// Field carrying the server's resulting flag in the toggle response
    pub fn response_field(&self) -> &'static str {
        match self {
            Interaction::Like => "liked",
            Interaction::Repost => "reposted",
            Interaction::Bookmark => "bookmarked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "like" => Some(Interaction::Like),
            "repost" => Some(Interaction::Repost),
            "bookmark" => Some(Interaction::Bookmark),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    #[default]
    Post,
    Student,
    Official,
    #[serde(other)]
    Other,
}

impl PostKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "post" => PostKind::Post,
            "student" => PostKind::Student,
            "official" => PostKind::Official,
            _ => PostKind::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Priority::High),
            "normal" => Some(Priority::Normal),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    Upcoming,
    #[default]
    Active,
    Closed,
}

impl ElectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionStatus::Upcoming => "upcoming",
            ElectionStatus::Active => "active",
            ElectionStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(ElectionStatus::Upcoming),
            "active" => Some(ElectionStatus::Active),
            "closed" | "ended" | "completed" => Some(ElectionStatus::Closed),
            _ => None,
        }
    }
}

/// Feed tabs. Each maps to a server-side filter; loaded data is never re-filtered locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FeedTab {
    #[default]
    ForYou,
    Following,
    Campus,
}

impl FeedTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedTab::ForYou => "forYou",
            FeedTab::Following => "following",
            FeedTab::Campus => "campus",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "forYou" | "for-you" | "foryou" => Some(FeedTab::ForYou),
            "following" => Some(FeedTab::Following),
            "campus" => Some(FeedTab::Campus),
            _ => None,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            FeedTab::ForYou => FeedTab::Following,
            FeedTab::Following => FeedTab::Campus,
            FeedTab::Campus => FeedTab::ForYou,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementFilter {
    #[default]
    All,
    High,
    Normal,
}

impl AnnouncementFilter {
    /// Value of the `priority` query parameter, `None` for no filter
    pub fn priority_param(&self) -> Option<&'static str> {
        match self {
            AnnouncementFilter::All => None,
            AnnouncementFilter::High => Some("high"),
            AnnouncementFilter::Normal => Some("normal"),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(AnnouncementFilter::All),
            "high" | "important" => Some(AnnouncementFilter::High),
            "normal" | "general" => Some(AnnouncementFilter::Normal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_round_trips_through_parse() {
        for kind in Interaction::ALL {
            assert_eq!(Interaction::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(Interaction::parse("LIKE"), Some(Interaction::Like));
        assert_eq!(Interaction::parse("share"), None);
    }

    #[test]
    fn test_unknown_post_kind_deserializes_as_other() {
        let kind: PostKind = serde_json::from_str("\"event\"").unwrap();
        assert_eq!(kind, PostKind::Other);
        let kind: PostKind = serde_json::from_str("\"official\"").unwrap();
        assert_eq!(kind, PostKind::Official);
    }

    #[test]
    fn test_feed_tab_cycles() {
        assert_eq!(FeedTab::ForYou.next(), FeedTab::Following);
        assert_eq!(FeedTab::Campus.next(), FeedTab::ForYou);
        assert_eq!(FeedTab::parse("forYou"), Some(FeedTab::ForYou));
    }

    #[test]
    fn test_announcement_filter_param() {
        assert_eq!(AnnouncementFilter::All.priority_param(), None);
        assert_eq!(AnnouncementFilter::High.priority_param(), Some("high"));
    }
}
