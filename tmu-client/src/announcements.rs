use std::collections::HashSet;

use tmu_types::{Announcement, AnnouncementFilter, Priority};

use crate::api::AnnouncementBackend;

pub const ANNOUNCEMENTS_LOAD_ERROR: &str = "Could not load announcements. Please try again.";

#[derive(Debug, Clone, Default)]
pub struct AnnouncementBoard {
    announcements: Vec<Announcement>,
    filter: AnnouncementFilter,
    acknowledged: HashSet<String>,
    loading: bool,
    error: Option<String>,
}

impl AnnouncementBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> AnnouncementFilter {
        self.filter
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

    pub fn is_acknowledged(&self, id: &str) -> bool {
        self.acknowledged.contains(id)
    }

    /// Announcements in display order: pinned, then high priority, then as received.
    pub fn sorted(&self) -> Vec<&Announcement> {
        let mut sorted: Vec<&Announcement> = self.announcements.iter().collect();
        // sort_by_key is stable, so ties keep backend order
        sorted.sort_by_key(|a| (!a.is_pinned, a.priority != Priority::High));
        sorted
    }

    pub async fn load<B: AnnouncementBackend + ?Sized>(&mut self, backend: &B) -> bool {
        self.loading = true;
        self.error = None;
        let result = backend.fetch_announcements(self.filter).await;
        self.loading = false;

        match result {
            Ok(announcements) => {
                self.announcements = announcements;
                true
            }
            Err(e) => {
                log::warn!("Failed to load announcements: {}", e);
                self.error = Some(ANNOUNCEMENTS_LOAD_ERROR.to_string());
                false
            }
        }
    }

    /// Change the priority filter and reload.
    pub async fn set_filter<B: AnnouncementBackend + ?Sized>(&mut self, backend: &B, filter: AnnouncementFilter) -> bool {
        self.filter = filter;
        self.load(backend).await
    }

    /// Acknowledge an announcement. Failures are logged and otherwise ignored.
    pub async fn acknowledge<B: AnnouncementBackend + ?Sized>(&mut self, backend: &B, id: &str) -> bool {
        match backend.acknowledge(id).await {
            Ok(()) => {
                self.acknowledged.insert(id.to_string());
                true
            }
            Err(e) => {
                log::warn!("Failed to acknowledge announcement {}: {}", id, e);
                false
            }
        }
    }
}
