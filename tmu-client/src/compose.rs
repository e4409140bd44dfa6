use tmu_types::{CreatePostRequest, Media, MediaPayload, Post};

use crate::api::FeedBackend;
use crate::error::{ActionError, ActionResult, ValidationError};

/// Character limit of posts, comments and replies
pub const MAX_CHARS: usize = 280;

/// Check comment or reply text and return it trimmed.
///
/// Length is counted in Unicode scalar values after trimming.
pub fn validate_message(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    let len = trimmed.chars().count();
    if len > MAX_CHARS {
        return Err(ValidationError::TooLong { len, max: MAX_CHARS });
    }
    Ok(trimmed.to_string())
}

/// Characters left before the limit; negative once it is exceeded.
pub fn remaining_chars(text: &str) -> i64 {
    MAX_CHARS as i64 - text.chars().count() as i64
}

/// Draft of a new post
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub content: String,
    pub media: Vec<Media>,
    submitting: bool,
}

impl PostDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn attach(&mut self, media: Media) {
        self.media.push(media);
    }

    pub fn remove_media(&mut self, index: usize) -> Option<Media> {
        (index < self.media.len()).then(|| self.media.remove(index))
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && self.validate().is_ok()
    }

    /// Build the request body. Media-only posts may have empty text.
    pub fn validate(&self) -> Result<CreatePostRequest, ValidationError> {
        let len = self.content.chars().count();
        if len > MAX_CHARS {
            return Err(ValidationError::TooLong { len, max: MAX_CHARS });
        }
        let content = self.content.trim();
        if content.is_empty() && self.media.is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(CreatePostRequest {
            content: content.to_string(),
            kind: "post".to_string(),
            media: self
                .media
                .iter()
                .map(|m| MediaPayload { kind: m.kind, url: m.url.clone() })
                .collect(),
        })
    }

    /// Send the draft and clear it on success. The draft is kept on failure.
    pub async fn submit<B: FeedBackend + ?Sized>(&mut self, backend: &B) -> ActionResult<Option<Post>> {
        if self.submitting {
            return Err(ActionError::Busy);
        }
        let request = self.validate()?;

        self.submitting = true;
        let result = backend.create_post(&request).await;
        self.submitting = false;

        let post = result?;
        self.content.clear();
        self.media.clear();
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBackend;
    use tmu_types::MediaKind;

    #[test]
    fn test_validate_message_trims_and_counts_chars() {
        assert_eq!(validate_message("  hi  ").unwrap(), "hi");
        assert_eq!(validate_message("   "), Err(ValidationError::EmptyContent));

        let exact = "é".repeat(MAX_CHARS);
        assert!(validate_message(&exact).is_ok());

        let over = "a".repeat(MAX_CHARS + 1);
        assert_eq!(
            validate_message(&over),
            Err(ValidationError::TooLong { len: MAX_CHARS + 1, max: MAX_CHARS })
        );
    }

    #[test]
    fn test_remaining_chars() {
        assert_eq!(remaining_chars(""), 280);
        assert_eq!(remaining_chars(&"x".repeat(281)), -1);
    }

    #[test]
    fn test_media_only_draft_is_submittable() {
        let mut draft = PostDraft::new("");
        assert!(!draft.can_submit());
        draft.attach(Media { kind: MediaKind::Image, url: "https://cdn/x.png".into() });
        assert!(draft.can_submit());

        let request = draft.validate().unwrap();
        assert_eq!(request.kind, "post");
        assert_eq!(request.media.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_clears_draft() {
        let backend = FakeBackend::new();
        let mut draft = PostDraft::new("  Exams moved to Friday  ");

        draft.submit(&backend).await.unwrap();

        assert!(draft.content.is_empty());
        let created = backend.created_posts();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].content, "Exams moved to Friday");
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_draft() {
        let backend = FakeBackend::new();
        backend.fail_writes(true);
        let mut draft = PostDraft::new("hello");

        assert!(draft.submit(&backend).await.is_err());
        assert_eq!(draft.content, "hello");
        assert!(!draft.is_submitting());
    }

    #[tokio::test]
    async fn test_overlong_draft_sends_nothing() {
        let backend = FakeBackend::new();
        let mut draft = PostDraft::new("a".repeat(MAX_CHARS + 1));

        let err = draft.submit(&backend).await.unwrap_err();
        assert!(matches!(err, ActionError::Validation(ValidationError::TooLong { .. })));
        assert!(backend.calls().is_empty());
    }
}
