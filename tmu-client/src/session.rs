use tmu_types::{LoginRequest, RegisterRequest, UpdatePasswordRequest, User};

use crate::api::{AuthBackend, AuthGrant};
use crate::error::{ActionError, ActionResult, ValidationError};
use crate::storage::CredentialStore;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Sign-up form as entered by the user
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub reg_number: String,
    pub password: String,
    pub confirm_password: String,
    pub department: String,
    pub role: Option<String>,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<RegisterRequest, ValidationError> {
        if [&self.name, &self.email, &self.reg_number, &self.password]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(ValidationError::MissingFields);
        }
        check_new_password(&self.password, &self.confirm_password)?;
        Ok(RegisterRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            reg_number: self.reg_number.trim().to_string(),
            password: self.password.clone(),
            department: self.department.trim().to_string(),
            role: self.role.clone().unwrap_or_else(|| "student".to_string()),
        })
    }
}

/// Confirmation must match and the password must be long enough.
pub fn check_new_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort { min: MIN_PASSWORD_LEN });
    }
    Ok(())
}

/// Signed-in state of the client.
///
/// Owns the authenticated backend and the credential store. Created once at
/// startup, restored from the stored token, and cleared on logout.
pub struct Session<B> {
    backend: B,
    store: Box<dyn CredentialStore>,
    user: Option<User>,
}

impl<B: AuthBackend> Session<B> {
    pub fn new(backend: B, store: Box<dyn CredentialStore>) -> Self {
        Self { backend, store, user: None }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn require_user(&self) -> ActionResult<&User> {
        self.user.as_ref().ok_or(ActionError::NotSignedIn)
    }

    /// Resume from the stored token. A token the backend rejects is discarded.
    pub async fn restore(&mut self) -> Option<&User> {
        let token = match self.store.load_token() {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read stored token: {:#}", e);
                return None;
            }
        };

        self.backend.set_token(Some(token));
        match self.backend.me().await {
            Ok(user) => {
                log_session!("restored session for {}", user.id);
                self.user = Some(user);
                self.user.as_ref()
            }
            Err(e) => {
                log_session!("stored token rejected: {}", e);
                self.forget();
                None
            }
        }
    }

    pub async fn login(&mut self, reg_number: &str, password: &str) -> ActionResult<&User> {
        if reg_number.trim().is_empty() || password.is_empty() {
            return Err(ValidationError::MissingFields.into());
        }
        let request = LoginRequest {
            reg_number: reg_number.trim().to_string(),
            password: password.to_string(),
        };
        let grant = self.backend.login(&request).await?;
        Ok(self.adopt(grant))
    }

    pub async fn register(&mut self, form: &RegistrationForm) -> ActionResult<&User> {
        let request = form.validate()?;
        let grant = self.backend.register(&request).await?;
        Ok(self.adopt(grant))
    }

    fn adopt(&mut self, grant: AuthGrant) -> &User {
        if let Err(e) = self.store.save_token(&grant.token) {
            log::warn!("Signed in but could not store the token: {:#}", e);
        }
        self.backend.set_token(Some(grant.token));
        log_session!("signed in as {}", grant.user.id);
        self.user.insert(grant.user)
    }

    /// Sign out. Backend errors are ignored; local state is always cleared.
    pub async fn logout(&mut self) {
        if let Err(e) = self.backend.logout().await {
            log::debug!("logout request failed: {}", e);
        }
        self.forget();
        log_session!("signed out");
    }

    fn forget(&mut self) {
        if let Err(e) = self.store.clear_token() {
            log::warn!("Failed to clear stored token: {:#}", e);
        }
        self.backend.set_token(None);
        self.user = None;
    }

    pub async fn change_password(&self, current: &str, new: &str, confirm: &str) -> ActionResult<()> {
        self.require_user()?;
        if current.is_empty() {
            return Err(ValidationError::MissingFields.into());
        }
        check_new_password(new, confirm)?;
        let request = UpdatePasswordRequest {
            current_password: current.to_string(),
            new_password: new.to_string(),
        };
        self.backend.update_password(&request).await?;
        log_session!("password changed");
        Ok(())
    }
}
