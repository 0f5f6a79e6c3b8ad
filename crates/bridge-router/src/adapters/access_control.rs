//! Static role table implementing `AccessControl`.

use crate::domain::Address;
use crate::ports::outbound::AccessControl;
use parking_lot::RwLock;
use std::collections::HashSet;

/// Role table fixed at construction, with grant/revoke for tests and devnets.
#[derive(Default)]
pub struct StaticAccessControl {
    governors: RwLock<HashSet<Address>>,
    guardians: RwLock<HashSet<Address>>,
}

impl StaticAccessControl {
    /// One governor and one guardian.
    pub fn new(governor: Address, guardian: Address) -> Self {
        let acl = Self::default();
        acl.grant_governor(governor);
        acl.grant_guardian(guardian);
        acl
    }

    /// Add a governor.
    pub fn grant_governor(&self, account: Address) {
        self.governors.write().insert(account);
    }

    /// Add a guardian.
    pub fn grant_guardian(&self, account: Address) {
        self.guardians.write().insert(account);
    }

    /// Remove a governor.
    pub fn revoke_governor(&self, account: &Address) {
        self.governors.write().remove(account);
    }
}

impl AccessControl for StaticAccessControl {
    fn is_governor(&self, account: &Address) -> bool {
        self.governors.read().contains(account)
    }

    fn is_guardian(&self, account: &Address) -> bool {
        self.guardians.read().contains(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles() {
        let acl = StaticAccessControl::new([1u8; 20], [2u8; 20]);
        assert!(acl.is_governor(&[1u8; 20]));
        assert!(!acl.is_governor(&[2u8; 20]));
        assert!(acl.is_guardian(&[2u8; 20]));

        acl.revoke_governor(&[1u8; 20]);
        assert!(!acl.is_governor(&[1u8; 20]));
    }
}
