//! Interactive profile management on top of the credential store.

use std::path::Path;

use tracing::{info, warn};

use crate::{
    error::AppError,
    forge::{Forge, Identity},
    profile::{CredentialStore, PLACEHOLDER_LOGIN, Profile},
    prompt::Prompter,
    storage::save_store,
    ui,
    validation::{
        ProfileChoice, prompt_until_valid, resolve_profile_choice, validate_commit_name,
        validate_input_email, validate_token,
    },
};

/// Where classic tokens with the `repo` scope are generated
pub const NEW_TOKEN_URL: &str =
    "https://github.com/settings/tokens/new?scopes=repo&description=git-autopilot";

const EMAIL_QUESTION: &str = "Which email should your saves (commits) use?";

/// Asks for a token until GitHub accepts one, then saves it as a profile.
///
/// Returns the new profile's login. Nothing is written unless the lookup succeeds.
pub fn add_profile<F, P>(
    store: &mut CredentialStore,
    path: &Path,
    forge: &F,
    prompter: &mut P,
) -> Result<String, AppError>
where
    F: Forge + ?Sized,
    P: Prompter + ?Sized,
{
    ui::header("GITHUB LOGIN");
    ui::plain("To save files to GitHub we need a Personal Access Token (PAT) from your account.");
    ui::plain(&format!("1. Open this link: {NEW_TOKEN_URL}"));
    ui::plain("2. Scroll to the bottom and click 'Generate token'.");
    ui::plain("3. Copy the token and paste it below.\n");

    let (token, identity) = loop {
        let Some(raw) = prompter.secret("Paste your token (PAT) here:")? else {
            return Err(AppError::Cancelled);
        };
        let token = match validate_token(&raw) {
            Ok(token) => token,
            Err(AppError::Validation(msg)) => {
                ui::failure(&msg);
                continue;
            }
            Err(err) => return Err(err),
        };

        ui::info("Checking token...");
        match forge.current_user(&token) {
            Ok(Some(identity)) => break (token, identity),
            Ok(None) => ui::failure(
                "That token didn't work. Make sure you copied the whole thing and try again.",
            ),
            Err(err) => {
                warn!(error = %err, "identity lookup failed");
                ui::failure(&format!("Couldn't reach GitHub: {err}"));
            }
        }
    };

    let email = resolve_email(&identity, prompter)?;
    let login = identity.login.clone();
    store.upsert(Profile {
        token,
        login: login.clone(),
        name: identity.name.unwrap_or_default(),
        email,
    });
    save_store(path, store)?;

    info!(%login, "saved profile");
    ui::success(&format!("Welcome {login}! Your token is saved for next time."));
    Ok(login)
}

/// Uses the public email when GitHub has one, otherwise asks (defaulting to the no-reply address)
fn resolve_email<P: Prompter + ?Sized>(
    identity: &Identity,
    prompter: &mut P,
) -> Result<String, AppError> {
    if let Some(email) = identity.email.as_deref().filter(|e| !e.trim().is_empty()) {
        return Ok(email.to_string());
    }
    let fallback = identity.noreply_email();
    prompt_until_valid(prompter, EMAIL_QUESTION, Some(&fallback), validate_input_email)
}

/// Fills in the author name and email commits need when the profile lacks them.
///
/// Profiles migrated from a bare token can have neither. Answers are saved to the store.
pub fn ensure_commit_identity<P: Prompter + ?Sized>(
    store: &mut CredentialStore,
    path: &Path,
    profile: &mut Profile,
    prompter: &mut P,
) -> Result<(), AppError> {
    let needs_name = profile.name.trim().is_empty() && profile.login == PLACEHOLDER_LOGIN;
    let needs_email = profile.email.trim().is_empty();
    if !needs_name && !needs_email {
        return Ok(());
    }

    ui::header("FIRST TIME SETUP");
    ui::plain("Git needs to know who is saving these files (git config).");
    if needs_name {
        profile.name = prompt_until_valid(
            prompter,
            "Please enter your full name:",
            None,
            validate_commit_name,
        )?;
    }
    if needs_email {
        let fallback = (profile.login != PLACEHOLDER_LOGIN)
            .then(|| format!("{}@users.noreply.github.com", profile.login));
        profile.email = prompt_until_valid(
            prompter,
            EMAIL_QUESTION,
            fallback.as_deref(),
            validate_input_email,
        )?;
    }

    store.upsert(profile.clone());
    save_store(path, store)?;
    info!(login = %profile.login, "saved commit identity");
    Ok(())
}

/// Picks the profile for this session, adding one when none exist.
///
/// The chosen login becomes the default and the store is saved.
pub fn select_profile<F, P>(
    store: &mut CredentialStore,
    path: &Path,
    forge: &F,
    prompter: &mut P,
) -> Result<Profile, AppError>
where
    F: Forge + ?Sized,
    P: Prompter + ?Sized,
{
    if store.is_empty() {
        let login = add_profile(store, path, forge, prompter)?;
        return profile_for(store, &login);
    }

    let logins = store.logins();
    let default_index = store
        .default_login()
        .and_then(|default| logins.iter().position(|login| login == default))
        .unwrap_or(0);

    ui::header("CHOOSE ACCOUNT");
    let mut entries = logins.clone();
    entries.push("Add a new account".to_string());
    ui::numbered(&entries, Some(default_index));

    let default_answer = (default_index + 1).to_string();
    let answer = prompter.text("Which account?", Some(&default_answer))?;

    let login = match resolve_profile_choice(&answer, logins.len(), default_index) {
        ProfileChoice::AddNew => add_profile(store, path, forge, prompter)?,
        ProfileChoice::Existing(index) => logins[index].clone(),
    };

    store.set_default(&login);
    save_store(path, store)?;
    info!(%login, "selected profile");
    profile_for(store, &login)
}

/// Makes `login` the default profile
pub fn switch_profile(
    store: &mut CredentialStore,
    path: &Path,
    login: &str,
) -> Result<(), AppError> {
    if !store.set_default(login) {
        return Err(AppError::ProfileNotFound(login.to_string()));
    }
    save_store(path, store)
}

/// Deletes the profile for `login`
pub fn delete_profile(
    store: &mut CredentialStore,
    path: &Path,
    login: &str,
) -> Result<(), AppError> {
    store
        .remove(login)
        .ok_or_else(|| AppError::ProfileNotFound(login.to_string()))?;
    save_store(path, store)
}

fn profile_for(store: &CredentialStore, login: &str) -> Result<Profile, AppError> {
    store
        .get(login)
        .cloned()
        .ok_or_else(|| AppError::ProfileNotFound(login.to_string()))
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs};

    use tempfile::TempDir;

    use super::*;
    use crate::{
        forge::fake::FakeForge,
        prompt::scripted::{Answer, ScriptedPrompter},
        storage::load_store,
    };

    fn forge() -> FakeForge {
        FakeForge::with_identities(HashMap::from([
            (
                "good".to_string(),
                Identity {
                    login: "alice".to_string(),
                    id: Some(7),
                    name: Some("Alice".to_string()),
                    email: Some("alice@example.com".to_string()),
                },
            ),
            (
                "quiet".to_string(),
                Identity {
                    login: "bob".to_string(),
                    id: Some(8),
                    name: None,
                    email: None,
                },
            ),
        ]))
    }

    fn profile(login: &str) -> Profile {
        Profile {
            token: format!("tok-{login}"),
            login: login.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn add_profile_retries_until_lookup_succeeds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        let forge = forge();
        let mut prompter = ScriptedPrompter::new(vec![
            Answer::Secret(Some("   ".to_string())),
            Answer::Secret(Some("wrong".to_string())),
            Answer::Secret(Some(" good ".to_string())),
        ]);

        let mut store = CredentialStore::default();
        let login = add_profile(&mut store, &path, &forge, &mut prompter).unwrap();

        assert_eq!(login, "alice");
        assert_eq!(forge.lookups(), 2);
        let saved = load_store(&path, &forge);
        assert_eq!(saved.default_profile.as_deref(), Some("alice"));
        let alice = saved.get("alice").unwrap();
        assert_eq!(alice.token, "good");
        assert_eq!(alice.email, "alice@example.com");
    }

    #[test]
    fn rejected_token_never_touches_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        let mut store = CredentialStore::default();
        store.upsert(profile("carol"));
        save_store(&path, &store).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let mut prompter = ScriptedPrompter::new(vec![
            Answer::Secret(Some("wrong".to_string())),
            Answer::Secret(None),
        ]);
        let err = add_profile(&mut store, &path, &forge(), &mut prompter).unwrap_err();

        assert!(err.is_cancel());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(store.logins(), vec!["carol"]);
    }

    #[test]
    fn missing_email_is_prompted_with_noreply_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        let mut prompter = ScriptedPrompter::new(vec![
            Answer::Secret(Some("quiet".to_string())),
            Answer::Text(String::new()),
        ]);

        let mut store = CredentialStore::default();
        add_profile(&mut store, &path, &forge(), &mut prompter).unwrap();
        assert_eq!(
            store.get("bob").unwrap().email,
            "8+bob@users.noreply.github.com"
        );
    }

    #[test]
    fn placeholder_profile_is_asked_for_name_and_email() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        let mut profile = profile(PLACEHOLDER_LOGIN);
        let mut store = CredentialStore::default();
        store.upsert(profile.clone());

        let mut prompter = ScriptedPrompter::new(vec![
            Answer::Text("  Ada Lovelace ".to_string()),
            Answer::Text(String::new()),
            Answer::Text("ada@example.com".to_string()),
        ]);
        ensure_commit_identity(&mut store, &path, &mut profile, &mut prompter).unwrap();

        assert_eq!(profile.name, "Ada Lovelace");
        assert_eq!(profile.email, "ada@example.com");
        let saved = load_store(&path, &FakeForge::default());
        assert_eq!(saved.get(PLACEHOLDER_LOGIN), Some(&profile));
        assert_eq!(saved.default_profile.as_deref(), Some(PLACEHOLDER_LOGIN));
    }

    #[test]
    fn missing_email_defaults_to_noreply_for_known_login() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        let mut profile = profile("bob");
        let mut store = CredentialStore::default();
        store.upsert(profile.clone());

        let mut prompter = ScriptedPrompter::new(vec![Answer::Text(String::new())]);
        ensure_commit_identity(&mut store, &path, &mut profile, &mut prompter).unwrap();

        assert_eq!(prompter.asked.len(), 1);
        assert_eq!(profile.email, "bob@users.noreply.github.com");
        assert_eq!(store.get("bob").unwrap().email, profile.email);
    }

    #[test]
    fn complete_identity_asks_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        let mut profile = Profile {
            email: "alice@example.com".to_string(),
            ..profile("alice")
        };
        let mut store = CredentialStore::default();

        let mut prompter = ScriptedPrompter::default();
        ensure_commit_identity(&mut store, &path, &mut profile, &mut prompter).unwrap();

        assert!(prompter.asked.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn select_with_empty_store_adds_a_profile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        let mut prompter = ScriptedPrompter::new(vec![Answer::Secret(Some("good".to_string()))]);

        let mut store = CredentialStore::default();
        let chosen = select_profile(&mut store, &path, &forge(), &mut prompter).unwrap();
        assert_eq!(chosen.login, "alice");
    }

    #[test]
    fn select_clamps_and_updates_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        let mut store = CredentialStore::default();
        store.upsert(profile("alice"));
        store.upsert(profile("bob"));

        let mut prompter = ScriptedPrompter::new(vec![Answer::Text("42".to_string())]);
        let chosen = select_profile(&mut store, &path, &forge(), &mut prompter).unwrap();

        assert_eq!(chosen.login, "bob");
        assert_eq!(store.default_profile.as_deref(), Some("bob"));
        assert_eq!(
            load_store(&path, &FakeForge::default()).default_profile.as_deref(),
            Some("bob")
        );
    }

    #[test]
    fn select_defaults_to_first_when_stored_default_is_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        let mut store = CredentialStore::default();
        store.upsert(profile("alice"));
        store.upsert(profile("bob"));
        store.default_profile = Some("ghost".to_string());

        let mut prompter = ScriptedPrompter::new(vec![Answer::Text("nonsense".to_string())]);
        let chosen = select_profile(&mut store, &path, &forge(), &mut prompter).unwrap();
        assert_eq!(chosen.login, "alice");
    }

    #[test]
    fn select_add_new_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        let mut store = CredentialStore::default();
        store.upsert(profile("carol"));

        let mut prompter = ScriptedPrompter::new(vec![
            Answer::Text("2".to_string()),
            Answer::Secret(Some("good".to_string())),
        ]);
        let chosen = select_profile(&mut store, &path, &forge(), &mut prompter).unwrap();
        assert_eq!(chosen.login, "alice");
        assert_eq!(store.logins(), vec!["alice", "carol"]);
    }

    #[test]
    fn switch_and_delete_unknown_login() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        let mut store = CredentialStore::default();
        store.upsert(profile("alice"));

        assert!(matches!(
            switch_profile(&mut store, &path, "ghost"),
            Err(AppError::ProfileNotFound(_))
        ));
        assert!(matches!(
            delete_profile(&mut store, &path, "ghost"),
            Err(AppError::ProfileNotFound(_))
        ));
        delete_profile(&mut store, &path, "alice").unwrap();
        assert!(load_store(&path, &FakeForge::default()).is_empty());
    }
}
