use crate::config::Config;
use crate::db::DbPool;
use crate::xsrf::XsrfToken;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Server-side session store holding valid session tokens.
///
/// Shared explicitly through [`AppState`] rather than living in a global;
/// handlers and middleware receive it, nothing reaches for an ambient
/// singleton.
pub type SessionStore = Arc<Mutex<HashSet<String>>>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub manifest: JsManifest,
    pub xsrf_token: XsrfToken,
    pub sessions: SessionStore,
}

/// Display settings threaded into every page template.
#[derive(Debug, Clone)]
pub struct ViewSettings {
    pub currency: String,
    pub locale: String,
    pub is_authenticated: bool,
}

impl AppState {
    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            currency: self.config.currency.clone(),
            locale: self.config.locale.clone(),
            is_authenticated: matches!(
                self.config.auth_mode,
                crate::config::AuthMode::Password(_)
            ),
        }
    }
}

/// Map from logical JS bundle names to their hashed file names.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct JsManifest(HashMap<String, String>);

impl JsManifest {
    pub fn load(static_path: &Path) -> Self {
        let path = static_path.join("js/manifest.json");
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => {
                tracing::warn!(
                    "manifest.json not found at {}, using empty manifest",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn get(&self, name: &str) -> String {
        self.0
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}
