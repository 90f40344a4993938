use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Login used when a legacy token can no longer be resolved to an account
pub const PLACEHOLDER_LOGIN: &str = "default";

/// A saved GitHub identity
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Profile {
    /// Personal access token
    pub token: String,
    /// GitHub account handle, unique within the store
    pub login: String,
    /// Display name used for user.name, may be empty
    #[serde(default)]
    pub name: String,
    /// Commit email used for user.email, may be empty
    #[serde(default)]
    pub email: String,
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("token", &"***")
            .field("login", &self.login)
            .field("name", &self.name)
            .field("email", &self.email)
            .finish()
    }
}

impl Profile {
    /// Name to write into user.name, falling back to the login
    pub fn commit_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.login
        } else {
            &self.name
        }
    }
}

/// Saved profiles plus the pointer to the one used by default
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStore {
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl CredentialStore {
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Logins in stable display order
    pub fn logins(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn get(&self, login: &str) -> Option<&Profile> {
        self.profiles.get(login)
    }

    /// Inserts or replaces the profile keyed by its login.
    /// The first profile ever added becomes the default.
    pub fn upsert(&mut self, profile: Profile) {
        let login = profile.login.clone();
        self.profiles.insert(login.clone(), profile);
        if self.default_profile.is_none() {
            self.default_profile = Some(login);
        }
    }

    /// Removes a profile, moving the default to the first remaining login if needed
    pub fn remove(&mut self, login: &str) -> Option<Profile> {
        let removed = self.profiles.remove(login)?;
        if self.default_profile.as_deref() == Some(login) {
            self.default_profile = self.profiles.keys().next().cloned();
        }
        Some(removed)
    }

    /// Points the default at an existing login
    pub fn set_default(&mut self, login: &str) -> bool {
        if self.profiles.contains_key(login) {
            self.default_profile = Some(login.to_string());
            true
        } else {
            false
        }
    }

    /// Stored default if it still exists, otherwise the first profile
    pub fn default_login(&self) -> Option<&str> {
        match self.default_profile.as_deref() {
            Some(login) if self.profiles.contains_key(login) => Some(login),
            _ => self.profiles.keys().next().map(String::as_str),
        }
    }
}
