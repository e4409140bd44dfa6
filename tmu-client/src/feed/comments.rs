use chrono::Utc;
use tmu_types::{Author, Comment, Reply};
use uuid::Uuid;

use crate::api::ApiResult;
use crate::compose::validate_message;
use crate::error::{ActionError, ActionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// Last load failed; the list was left as it was
    Failed,
}

/// What happens to replies, which the backend does not store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyPolicy {
    /// Append to local state only; lost on the next reload
    #[default]
    LocalOnly,
    /// Reject replies outright
    Disabled,
}

/// Ticket of one comment load. Results of superseded tickets are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLoad {
    pub post_id: String,
    pub(crate) mount: u64,
    generation: u64,
}

/// Ticket of one comment submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentSubmit {
    pub post_id: String,
    pub content: String,
    pub(crate) mount: u64,
}

/// Lazily loaded comment section of a single post
#[derive(Debug)]
pub struct CommentThread {
    post_id: String,
    mount: u64,
    comments: Vec<Comment>,
    state: LoadState,
    generation: u64,
    expanded: bool,
    submitting: bool,
    policy: ReplyPolicy,
    pub draft: String,
}

impl CommentThread {
    pub fn new(post_id: impl Into<String>, mount: u64, policy: ReplyPolicy) -> Self {
        Self {
            post_id: post_id.into(),
            mount,
            comments: Vec::new(),
            state: LoadState::Idle,
            generation: 0,
            expanded: false,
            submitting: false,
            policy,
            draft: String::new(),
        }
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn policy(&self) -> ReplyPolicy {
        self.policy
    }

    /// Open the section. Loads only when nothing is cached yet.
    pub fn expand(&mut self) -> Option<CommentLoad> {
        if self.expanded {
            return None;
        }
        self.expanded = true;
        if self.comments.is_empty() {
            self.begin_load()
        } else {
            None
        }
    }

    pub fn collapse(&mut self) {
        self.expanded = false;
    }

    /// Start a load unless one is already in flight.
    pub fn begin_load(&mut self) -> Option<CommentLoad> {
        if self.state == LoadState::Loading {
            log_comments!("load of {} already in flight", self.post_id);
            return None;
        }
        Some(self.next_load())
    }

    /// Start a load that supersedes any in-flight one.
    pub fn begin_reload(&mut self) -> CommentLoad {
        self.next_load()
    }

    fn next_load(&mut self) -> CommentLoad {
        self.generation += 1;
        self.state = LoadState::Loading;
        CommentLoad {
            post_id: self.post_id.clone(),
            mount: self.mount,
            generation: self.generation,
        }
    }

    /// Apply a load result. Returns false when the ticket was stale.
    ///
    /// A successful result replaces the cached list, dropping local replies.
    pub fn finish_load(&mut self, load: CommentLoad, result: ApiResult<Vec<Comment>>) -> bool {
        if load.mount != self.mount || load.generation != self.generation {
            log_comments!("discarding stale comments for {}", load.post_id);
            return false;
        }
        match result {
            Ok(comments) => {
                log_comments!("loaded {} comments for {}", comments.len(), self.post_id);
                self.comments = comments;
                self.state = LoadState::Loaded;
            }
            Err(e) => {
                log::warn!("Failed to load comments for {}: {}", self.post_id, e);
                self.state = LoadState::Failed;
            }
        }
        true
    }

    /// Validate and mark the thread as submitting.
    pub fn begin_submit(&mut self, text: &str) -> ActionResult<CommentSubmit> {
        if self.submitting {
            return Err(ActionError::Busy);
        }
        let content = validate_message(text)?;
        self.submitting = true;
        Ok(CommentSubmit {
            post_id: self.post_id.clone(),
            content,
            mount: self.mount,
        })
    }

    /// Settle a submission. On success the draft is cleared and a reload is returned.
    pub(crate) fn finish_submit(&mut self, result: ApiResult<()>) -> ActionResult<CommentLoad> {
        self.submitting = false;
        result?;
        self.draft.clear();
        Ok(self.begin_reload())
    }

    /// Append a reply composed on this device. The caller bumps the post's counter.
    pub fn add_local_reply(&mut self, comment_id: &str, text: &str) -> ActionResult<&Reply> {
        if self.policy == ReplyPolicy::Disabled {
            return Err(ActionError::RepliesNotPersisted);
        }
        let content = validate_message(text)?;
        let comment = self
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| ActionError::CommentNotFound(comment_id.to_string()))?;

        comment.replies.push(Reply {
            id: format!("local-{}", Uuid::new_v4()),
            comment_id: comment_id.to_string(),
            author: Author::local_viewer(),
            content,
            created_at: Utc::now(),
            local_only: true,
        });
        log_comments!("local reply on {} in {}", comment_id, self.post_id);

        comment
            .replies
            .last()
            .ok_or_else(|| ActionError::CommentNotFound(comment_id.to_string()))
    }
}
