use tmu_types::{FeedTab, Post, UpdateProfileRequest, User};

use crate::api::{FeedBackend, PostQuery, ProfileBackend};
use crate::compose::{validate_message, MAX_CHARS};
use crate::error::{ActionError, ActionResult, ValidationError};

/// Editable profile fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub name: String,
    pub bio: String,
    pub department: String,
    pub avatar: String,
}

impl ProfileForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            bio: user.bio.clone().unwrap_or_default(),
            department: user.department.clone().unwrap_or_default(),
            avatar: user.avatar.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<UpdateProfileRequest, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingFields);
        }
        let len = self.bio.chars().count();
        if len > MAX_CHARS {
            return Err(ValidationError::TooLong { len, max: MAX_CHARS });
        }
        let optional = |s: &str| Some(s.trim().to_string());
        Ok(UpdateProfileRequest {
            name: optional(&self.name),
            bio: optional(&self.bio),
            department: optional(&self.department),
            avatar: Some(self.avatar.trim().to_string()).filter(|a| !a.is_empty()),
        })
    }
}

/// A user's profile page with the viewer's own-post management
#[derive(Debug, Clone, Default)]
pub struct ProfileEditor {
    user: Option<User>,
    posts: Vec<Post>,
    pub form: ProfileForm,
    saving: bool,
}

impl ProfileEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Load a user and their posts from the first feed page.
    pub async fn load<B>(&mut self, backend: &B, user_id: &str) -> ActionResult<()>
    where
        B: ProfileBackend + FeedBackend + ?Sized,
    {
        let user = backend.fetch_user(user_id).await?;
        let page = backend.fetch_posts(&PostQuery::new(FeedTab::ForYou, 1)).await?;

        self.posts = page
            .posts
            .into_iter()
            .filter(|p| p.author.id.as_deref() == Some(user_id))
            .collect();
        self.form = ProfileForm::from_user(&user);
        self.user = Some(user);
        log::debug!("profile {} loaded with {} posts", user_id, self.posts.len());
        Ok(())
    }

    /// Show an already known user, e.g. the signed-in one, without fetching.
    pub fn show(&mut self, user: User) {
        self.form = ProfileForm::from_user(&user);
        self.user = Some(user);
    }

    /// Save the form. Only one save runs at a time.
    pub async fn save<B: ProfileBackend + ?Sized>(&mut self, backend: &B) -> ActionResult<()> {
        if self.saving {
            return Err(ActionError::Busy);
        }
        let request = self.form.validate()?;

        self.saving = true;
        let result = backend.update_profile(&request).await;
        self.saving = false;

        match result? {
            Some(user) => self.user = Some(user),
            None => {
                if let Some(user) = self.user.as_mut() {
                    user.name = request.name.unwrap_or_default();
                    user.bio = request.bio;
                    user.department = request.department;
                    user.avatar = request.avatar.or(user.avatar.take());
                }
            }
        }
        log::info!("Profile saved");
        Ok(())
    }

    pub async fn follow<B: ProfileBackend + ?Sized>(&mut self, backend: &B, user_id: &str) -> ActionResult<()> {
        backend.follow(user_id).await?;
        if let Some(user) = self.user.as_mut().filter(|u| u.id == user_id) {
            user.followers = user.followers.saturating_add(1);
        }
        Ok(())
    }

    pub async fn unfollow<B: ProfileBackend + ?Sized>(&mut self, backend: &B, user_id: &str) -> ActionResult<()> {
        backend.unfollow(user_id).await?;
        if let Some(user) = self.user.as_mut().filter(|u| u.id == user_id) {
            user.followers = user.followers.saturating_sub(1);
        }
        Ok(())
    }

    /// Replace the text of a listed post.
    pub async fn edit_post<B: ProfileBackend + ?Sized>(&mut self, backend: &B, post_id: &str, content: &str) -> ActionResult<()> {
        let content = validate_message(content)?;
        if !self.posts.iter().any(|p| p.id == post_id) {
            return Err(ActionError::PostNotFound(post_id.to_string()));
        }
        backend.update_post(post_id, &content).await?;
        if let Some(post) = self.posts.iter_mut().find(|p| p.id == post_id) {
            post.content = content;
        }
        Ok(())
    }

    pub async fn delete_post<B: ProfileBackend + ?Sized>(&mut self, backend: &B, post_id: &str) -> ActionResult<()> {
        if !self.posts.iter().any(|p| p.id == post_id) {
            return Err(ActionError::PostNotFound(post_id.to_string()));
        }
        backend.delete_post(post_id).await?;
        self.posts.retain(|p| p.id != post_id);
        Ok(())
    }
}
