//! User profile and settings records.
//!
//! Both are documents keyed by user id. The profile is created on first sign
//! in (signup) and refreshed on every later sign in; the settings document
//! starts from defaults and is replaced whenever the user saves.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::DocumentStore;
use crate::error::{AccountError, StoreError};

pub const USERS: &str = "users";
pub const SETTINGS: &str = "settings";

pub const DISPLAY_NAME_MAX: usize = 80;
pub const ORGANIZATION_MAX: usize = 120;
pub const JOB_TITLE_MAX: usize = 120;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub display_name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub job_title: String,
    /// Email me when an analysis finds a high-severity issue.
    pub email_alerts: bool,
    pub weekly_digest: bool,
    pub dark_mode: bool,
    /// Keep submitted content in the browser's history view.
    pub save_history: bool,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    fn defaults_for(display_name: &str, now: DateTime<Utc>) -> Self {
        Self {
            display_name: display_name.to_string(),
            organization: String::new(),
            job_title: String::new(),
            email_alerts: true,
            weekly_digest: false,
            dark_mode: true,
            save_history: true,
            updated_at: now,
        }
    }
}

/// Fields the user may change from the settings page.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsUpdate {
    pub display_name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub job_title: String,
    pub email_alerts: bool,
    pub weekly_digest: bool,
    pub dark_mode: bool,
    pub save_history: bool,
}

impl SettingsUpdate {
    pub fn validate(&self) -> Result<(), AccountError> {
        let name_len = self.display_name.trim().chars().count();
        if name_len == 0 {
            return Err(AccountError::Validation {
                field: "displayName",
                message: "is required".to_string(),
            });
        }
        check_max("displayName", &self.display_name, DISPLAY_NAME_MAX)?;
        check_max("organization", &self.organization, ORGANIZATION_MAX)?;
        check_max("jobTitle", &self.job_title, JOB_TITLE_MAX)
    }
}

fn check_max(field: &'static str, value: &str, max: usize) -> Result<(), AccountError> {
    if value.trim().chars().count() > max {
        return Err(AccountError::Validation {
            field,
            message: format!("must be at most {max} characters"),
        });
    }
    Ok(())
}

/// Who signed in, as asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    SignedUp,
    SignedIn,
}

#[derive(Serialize, Debug, Clone)]
pub struct Session {
    pub kind: SessionKind,
    pub profile: UserProfile,
}

/// Profile and settings operations over a [`DocumentStore`].
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn DocumentStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Record a sign in: create the profile and default settings the first
    /// time a user is seen, refresh the profile afterwards.
    pub async fn sign_in(&self, identity: &Identity) -> Result<Session, AccountError> {
        let now = Utc::now();
        let existing: Option<UserProfile> = self.load(USERS, &identity.user_id).await?;

        let (kind, profile) = match existing {
            Some(mut profile) => {
                profile.email = identity.email.clone();
                profile.last_login_at = now;
                profile.updated_at = now;
                (SessionKind::SignedIn, profile)
            }
            None => {
                let display_name = identity
                    .display_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(|n| n.chars().take(DISPLAY_NAME_MAX).collect::<String>())
                    .unwrap_or_else(|| default_display_name(&identity.email));
                let profile = UserProfile {
                    id: identity.user_id.clone(),
                    email: identity.email.clone(),
                    display_name: display_name.clone(),
                    created_at: now,
                    updated_at: now,
                    last_login_at: now,
                };
                self.save(
                    SETTINGS,
                    &identity.user_id,
                    &UserSettings::defaults_for(&display_name, now),
                )
                .await?;
                info!("New account {} ({})", identity.user_id, identity.email);
                (SessionKind::SignedUp, profile)
            }
        };

        self.save(USERS, &identity.user_id, &profile).await?;
        Ok(Session { kind, profile })
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile, AccountError> {
        self.load(USERS, user_id)
            .await?
            .ok_or_else(|| AccountError::NotFound(user_id.to_string()))
    }

    /// The user's settings, or defaults derived from the profile when the
    /// user has never saved any.
    pub async fn settings(&self, user_id: &str) -> Result<UserSettings, AccountError> {
        if let Some(settings) = self.load(SETTINGS, user_id).await? {
            return Ok(settings);
        }
        let profile = self.profile(user_id).await?;
        Ok(UserSettings::defaults_for(
            &profile.display_name,
            profile.created_at,
        ))
    }

    /// Validate and store new settings. The display name is mirrored onto the
    /// profile.
    pub async fn save_settings(
        &self,
        user_id: &str,
        update: SettingsUpdate,
    ) -> Result<UserSettings, AccountError> {
        update.validate()?;
        let mut profile = self.profile(user_id).await?;
        let now = Utc::now();

        let settings = UserSettings {
            display_name: update.display_name.trim().to_string(),
            organization: update.organization.trim().to_string(),
            job_title: update.job_title.trim().to_string(),
            email_alerts: update.email_alerts,
            weekly_digest: update.weekly_digest,
            dark_mode: update.dark_mode,
            save_history: update.save_history,
            updated_at: now,
        };
        self.save(SETTINGS, user_id, &settings).await?;

        if profile.display_name != settings.display_name {
            profile.display_name = settings.display_name.clone();
            profile.updated_at = now;
            self.save(USERS, user_id, &profile).await?;
        }
        Ok(settings)
    }

    async fn load<T: DeserializeOwned>(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        match self.store.get(collection, key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StoreError::Corrupt {
                    collection: collection.to_string(),
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    async fn save<T: Serialize>(
        &self,
        collection: &str,
        key: &str,
        doc: &T,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc).map_err(StoreError::Encode)?;
        self.store.set(collection, key, value).await
    }
}

/// Local part of the email address, used until the user picks a name.
fn default_display_name(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("Analyst")
        .chars()
        .take(DISPLAY_NAME_MAX)
        .collect()
}
