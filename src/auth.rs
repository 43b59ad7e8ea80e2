//! Administrator allow-list for the upload surface.
//!
//! Injected into `AppState` rather than read from a global, so tests can
//! substitute fake identities. An empty list authorizes nobody.

#[derive(Debug, Clone, Default)]
pub struct AdminList {
    identities: Vec<String>,
}

impl AdminList {
    pub fn new(identities: impl IntoIterator<Item = String>) -> Self {
        let identities = identities
            .into_iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { identities }
    }

    /// Comma-separated identities from an environment variable, e.g.
    /// `CATALOGD_ADMINS=owner@shop.example,ops@shop.example`.
    pub fn from_env(var: &str) -> Self {
        match std::env::var(var) {
            Ok(raw) => Self::new(raw.split(',').map(str::to_string)),
            Err(_) => Self::default(),
        }
    }

    pub fn is_authorized(&self, caller: &str) -> bool {
        let caller = caller.trim().to_lowercase();
        !caller.is_empty() && self.identities.iter().any(|id| *id == caller)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
