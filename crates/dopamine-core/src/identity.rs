//! Who is signed in.

use std::sync::RwLock;

/// Source of the current user's id.
pub trait IdentityProvider: Send + Sync {
    fn user_id(&self) -> Option<String>;

    fn is_authenticated(&self) -> bool {
        self.user_id().is_some()
    }
}

/// Identity fixed at construction, changeable only by explicit sign in/out.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user_id: RwLock<Option<String>>,
}

impl StaticIdentity {
    pub fn new(user_id: Option<String>) -> Self {
        let user_id = user_id.filter(|id| !id.trim().is_empty());
        Self {
            user_id: RwLock::new(user_id),
        }
    }

    pub fn signed_in(user_id: &str) -> Self {
        Self::new(Some(user_id.to_string()))
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    pub fn sign_in(&self, user_id: &str) {
        let mut guard = self.user_id.write().unwrap_or_else(|p| p.into_inner());
        *guard = Some(user_id.to_string()).filter(|id| !id.trim().is_empty());
    }

    pub fn sign_out(&self) {
        let mut guard = self.user_id.write().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }
}

impl IdentityProvider for StaticIdentity {
    fn user_id(&self) -> Option<String> {
        self.user_id
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_anonymous() {
        assert!(!StaticIdentity::new(Some("  ".into())).is_authenticated());
        assert!(!StaticIdentity::anonymous().is_authenticated());
    }

    #[test]
    fn sign_in_and_out() {
        let identity = StaticIdentity::anonymous();
        identity.sign_in("u1");
        assert_eq!(identity.user_id().as_deref(), Some("u1"));
        identity.sign_out();
        assert_eq!(identity.user_id(), None);
    }
}
