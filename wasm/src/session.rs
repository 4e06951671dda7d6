// Session token lookup in `localStorage`
//
// Login and refresh live elsewhere in the app; this only reads the token the
// session layer persisted, on every request.

use pushsync_core::SessionStore;

#[derive(Debug, Clone)]
pub struct LocalStorageSession {
    key: String,
}

impl LocalStorageSession {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl SessionStore for LocalStorageSession {
    fn bearer_token(&self) -> Option<String> {
        let storage = web_sys::window()?.local_storage().ok()??;
        match storage.get_item(&self.key) {
            Ok(Some(token)) if !token.is_empty() => Some(token),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("localStorage read failed: {:?}", e);
                None
            }
        }
    }
}
