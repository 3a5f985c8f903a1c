//! Capabilities of the signed-in user

/// Explicit capability flags handed to each workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub is_owner: bool,
    pub is_super_admin: bool,
}

impl AuthContext {
    pub fn owner() -> Self {
        Self {
            is_owner: true,
            is_super_admin: false,
        }
    }

    pub fn super_admin() -> Self {
        Self {
            is_owner: false,
            is_super_admin: true,
        }
    }

    /// Edit and delete the university profile
    pub fn can_manage_university(&self) -> bool {
        self.is_owner || self.is_super_admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_manage_university() {
        assert!(AuthContext::owner().can_manage_university());
        assert!(AuthContext::super_admin().can_manage_university());
        assert!(!AuthContext::default().can_manage_university());
    }
}
