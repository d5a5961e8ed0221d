use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Which side of the party a password or lock applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// The owner's own device.
    Local,
    /// Devices connected over the network.
    Remote,
}

/// The live settings of a party session.
///
/// These are handed to the engine on construction and changed through it,
/// so every derived permission and vote count can react immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether guests may vote and add entries.
    pub enable_guest_system: bool,
    /// Whether the owner's device drops to guest permission when locked.
    pub lock_local_control: bool,
    /// Whether remote devices are guests unless they present the remote password.
    pub lock_remote_control: bool,
    /// How many live votes a single guest may hold at once.
    pub max_vote_count: u32,
    /// Hash of the local password, in PHC string format.
    pub local_password: Option<String>,
    /// Hash of the remote password, in PHC string format.
    pub remote_password: Option<String>,
}

impl Settings {
    /// Whether the lock setting of the scope is turned on.
    pub fn lock_for(&self, scope: Scope) -> bool {
        match scope {
            Scope::Local => self.lock_local_control,
            Scope::Remote => self.lock_remote_control,
        }
    }

    pub fn set_lock_for(&mut self, scope: Scope, locked: bool) {
        match scope {
            Scope::Local => self.lock_local_control = locked,
            Scope::Remote => self.lock_remote_control = locked,
        }
    }

    /// The stored password hash of the scope, if one has been set.
    pub fn password_for(&self, scope: Scope) -> Option<&str> {
        match scope {
            Scope::Local => self.local_password.as_deref(),
            Scope::Remote => self.remote_password.as_deref(),
        }
    }

    pub fn set_password_for(&mut self, scope: Scope, hash: Option<String>) {
        match scope {
            Scope::Local => self.local_password = hash,
            Scope::Remote => self.remote_password = hash,
        }
    }

    pub fn has_password(&self, scope: Scope) -> bool {
        self.password_for(scope).is_some()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_guest_system: true,
            // Nothing is locked until the owner asks for it
            lock_local_control: false,
            lock_remote_control: false,
            max_vote_count: 3,
            local_password: None,
            remote_password: None,
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Local => write!(f, "local"),
            Scope::Remote => write!(f, "remote"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_leave_everything_open() {
        let settings = Settings::default();

        assert!(settings.enable_guest_system);
        assert_eq!(settings.max_vote_count, 3);

        for scope in [Scope::Local, Scope::Remote] {
            assert!(!settings.lock_for(scope), "{scope} should start unlocked");
            assert!(!settings.has_password(scope));
        }
    }

    #[test]
    fn test_scoped_accessors_touch_only_their_scope() {
        let mut settings = Settings::default();

        settings.set_lock_for(Scope::Remote, true);
        settings.set_password_for(Scope::Remote, Some("hash".to_string()));

        assert!(settings.lock_remote_control);
        assert!(!settings.lock_for(Scope::Local));
        assert_eq!(settings.password_for(Scope::Remote), Some("hash"));
        assert_eq!(settings.password_for(Scope::Local), None);

        settings.set_password_for(Scope::Remote, None);
        assert!(!settings.has_password(Scope::Remote));
    }
}
