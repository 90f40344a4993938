use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::Path,
};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::AppError,
    forge::Forge,
    profile::{CredentialStore, PLACEHOLDER_LOGIN, Profile},
};

/// Single-token file written by earlier releases
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LegacyTokenFile {
    token: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredFile {
    Legacy(LegacyTokenFile),
    Current(CredentialStore),
}

/// Loads the credential store, never failing.
///
/// A missing or unreadable file yields an empty store. A legacy single-token
/// file is migrated to the profile layout and written back before returning.
pub fn load_store<F: Forge + ?Sized>(path: &Path, forge: &F) -> CredentialStore {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "no readable credential file");
            return CredentialStore::default();
        }
    };

    if contents.trim().is_empty() {
        return CredentialStore::default();
    }

    match serde_json::from_str::<StoredFile>(&contents) {
        Ok(StoredFile::Current(store)) => store,
        Ok(StoredFile::Legacy(legacy)) => {
            let store = migrate_legacy(legacy.token, forge);
            if let Err(err) = save_store(path, &store) {
                warn!(error = %err, "failed to write migrated credential file");
            }
            store
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unparseable credential file");
            CredentialStore::default()
        }
    }
}

/// Turns a bare token into a one-profile store keyed by the token's login
fn migrate_legacy<F: Forge + ?Sized>(token: String, forge: &F) -> CredentialStore {
    let identity = match forge.current_user(&token) {
        Ok(identity) => identity,
        Err(err) => {
            warn!(error = %err, "identity lookup failed during migration");
            None
        }
    };

    let profile = match identity {
        Some(identity) => Profile {
            token,
            login: identity.login,
            name: identity.name.unwrap_or_default(),
            email: identity.email.unwrap_or_default(),
        },
        None => Profile {
            token,
            login: PLACEHOLDER_LOGIN.to_string(),
            ..Default::default()
        },
    };
    debug!(login = %profile.login, "migrated legacy token");

    let mut store = CredentialStore::default();
    store.upsert(profile);
    store
}

/// Writes the store and restricts the file to its owner
pub fn save_store(path: &Path, store: &CredentialStore) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json: String = serde_json::to_string_pretty(store)?;

    if path.exists() {
        unlock_for_write(path);
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);

    restrict_to_owner(path);
    debug!(path = %path.display(), profiles = store.profiles.len(), "saved credential file");
    Ok(())
}

/// Clears hidden/read-only state left by a previous save. Best effort.
fn unlock_for_write(path: &Path) {
    #[cfg(windows)]
    {
        let _ = std::process::Command::new("attrib")
            .arg("-H")
            .arg(path)
            .output();
    }

    match fs::metadata(path) {
        Ok(metadata) => {
            let mut perms = metadata.permissions();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                perms.set_mode(0o600);
            }
            #[cfg(not(unix))]
            {
                perms.set_readonly(false);
            }
            if let Err(err) = fs::set_permissions(path, perms) {
                debug!(error = %err, "could not relax credential file permissions");
            }
        }
        Err(err) => debug!(error = %err, "could not stat credential file"),
    }
}

/// Owner-only permissions on unix, hidden attribute on windows. Best effort.
fn restrict_to_owner(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(err) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
            debug!(error = %err, "could not restrict credential file permissions");
        }
    }
    #[cfg(windows)]
    {
        let _ = std::process::Command::new("attrib")
            .arg("+H")
            .arg(path)
            .output();
    }
}
