use std::time::Duration;

use tmu_types::{CampusStats, SuggestedUser, TrendingTag};

use crate::api::{CampusBackend, ProfileBackend};
use crate::error::ActionResult;

/// Trending tags shown at once
pub const TRENDING_SHOWN: usize = 5;

/// How often a live sidebar re-fetches
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Campus stats, trending tags and follow suggestions
#[derive(Debug, Clone, Default)]
pub struct CampusSidebar {
    stats: Option<CampusStats>,
    trending: Vec<TrendingTag>,
    suggestions: Vec<SuggestedUser>,
}

impl CampusSidebar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Option<&CampusStats> {
        self.stats.as_ref()
    }

    pub fn top_trending(&self) -> &[TrendingTag] {
        &self.trending[..self.trending.len().min(TRENDING_SHOWN)]
    }

    pub fn suggestions(&self) -> &[SuggestedUser] {
        &self.suggestions
    }

    /// Fetch all three sources concurrently. A failed source keeps its previous value.
    ///
    /// Returns how many sources were updated.
    pub async fn refresh<B: CampusBackend + ?Sized>(&mut self, backend: &B) -> usize {
        let (stats, trending, suggestions) =
            tokio::join!(backend.stats(), backend.trending(), backend.who_to_follow());

        let mut updated = 0;
        match stats {
            Ok(stats) => {
                self.stats = Some(stats);
                updated += 1;
            }
            Err(e) => log::warn!("Failed to load campus stats: {}", e),
        }
        match trending {
            Ok(trending) => {
                self.trending = trending;
                updated += 1;
            }
            Err(e) => log::warn!("Failed to load trending tags: {}", e),
        }
        match suggestions {
            Ok(suggestions) => {
                self.suggestions = suggestions;
                updated += 1;
            }
            Err(e) => log::warn!("Failed to load follow suggestions: {}", e),
        }
        updated
    }

    /// Follow a suggested user and drop them from the suggestions.
    pub async fn follow<B: ProfileBackend + ?Sized>(&mut self, backend: &B, user_id: &str) -> ActionResult<()> {
        backend.follow(user_id).await?;
        self.suggestions.retain(|u| u.id != user_id);
        Ok(())
    }
}
