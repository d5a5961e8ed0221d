use std::collections::HashMap;

use encore_core::{Scope, Settings, Signal, Subscription};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{AccessToken, CollabError, CollabResult, PasswordVault};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    /// May vote and add entries through the guest path.
    Guest,
    /// May control the queue directly.
    Admin,
}

impl Permission {
    /// Derives the permission of a token in its scope.
    ///
    /// A scope without a password, or with its lock turned off, grants admin to everyone in it.
    pub fn compute(settings: &Settings, scope: Scope, unlocked: bool) -> Self {
        if !settings.has_password(scope) || !settings.lock_for(scope) || unlocked {
            Permission::Admin
        } else {
            Permission::Guest
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Permission::Admin)
    }

    /// Whether this permission is enough for an operation.
    pub fn satisfies(&self, allow_guest: bool) -> bool {
        allow_guest || self.is_admin()
    }
}

struct Endpoint {
    scope: Scope,
    unlocked: bool,
    permission: Signal<Permission>,
}

impl Endpoint {
    fn compute(&self, settings: &Settings) -> Permission {
        Permission::compute(settings, self.scope, self.unlocked)
    }

    fn refresh(&self, settings: &Settings) {
        self.permission.set(self.compute(settings));
    }
}

/// Tracks which tokens have presented a password, and keeps a live permission per token.
///
/// Settings are passed into every call, so permissions are always derived from
/// the settings the caller holds.
#[derive(Default)]
pub struct AccessControl {
    endpoints: HashMap<AccessToken, Endpoint>,
}

impl AccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a token. Local tokens start out unlocked, remote ones locked.
    pub fn register(&mut self, token: AccessToken, scope: Scope, settings: &Settings) {
        self.endpoints.entry(token).or_insert_with(|| {
            let unlocked = scope == Scope::Local;
            let permission = Permission::compute(settings, scope, unlocked);

            Endpoint {
                scope,
                unlocked,
                permission: Signal::new(permission),
            }
        });
    }

    pub fn permission(&self, token: AccessToken, settings: &Settings) -> CollabResult<Permission> {
        Ok(self.endpoint(token)?.compute(settings))
    }

    /// A live view of the permission of a token, starting with the current one.
    pub fn observe(&self, token: AccessToken) -> CollabResult<Subscription<Permission>> {
        Ok(self.endpoint(token)?.permission.subscribe())
    }

    /// Hashes and stores the password of a scope.
    ///
    /// The caller must be admin in its own scope, and remote tokens can only manage
    /// the remote password. Setting the password of its own scope unlocks the caller.
    pub fn set_password(
        &mut self,
        token: AccessToken,
        scope: Scope,
        password: &str,
        settings: &mut Settings,
        vault: &dyn PasswordVault,
    ) -> CollabResult<()> {
        let endpoint = self.endpoint(token)?;
        let caller_scope = endpoint.scope;

        if caller_scope == Scope::Remote && scope == Scope::Local {
            return Err(CollabError::ScopeMismatch(scope));
        }

        if password.trim().is_empty() {
            return Err(CollabError::EmptyPassword);
        }

        if !endpoint.compute(settings).is_admin() {
            return Err(CollabError::InsufficientPermission);
        }

        let hash = vault.hash(password)?;
        settings.set_password_for(scope, Some(hash));

        if scope == caller_scope {
            self.endpoint_mut(token)?.unlocked = true;
        }

        info!("The {} password was set by {}", scope, token);
        self.refresh(settings);

        Ok(())
    }

    /// Unlocks a token that presents the password of its scope.
    pub fn upgrade(
        &mut self,
        token: AccessToken,
        password: &str,
        settings: &Settings,
        vault: &dyn PasswordVault,
    ) -> CollabResult<()> {
        let scope = self.endpoint(token)?.scope;
        let stored = settings
            .password_for(scope)
            .ok_or(CollabError::NoPasswordSet(scope))?;

        if !vault.verify(password, stored) {
            warn!("{} presented a wrong {} password", token, scope);
            return Err(CollabError::WrongPassword);
        }

        let endpoint = self.endpoint_mut(token)?;
        endpoint.unlocked = true;
        endpoint.refresh(settings);

        info!("{} was upgraded", token);
        Ok(())
    }

    /// Locks a token again. Only possible once its scope has a password.
    pub fn downgrade(&mut self, token: AccessToken, settings: &Settings) -> CollabResult<()> {
        let scope = self.endpoint(token)?.scope;

        if !settings.has_password(scope) {
            return Err(CollabError::NoPasswordSet(scope));
        }

        let endpoint = self.endpoint_mut(token)?;
        endpoint.unlocked = false;
        endpoint.refresh(settings);

        info!("{} was downgraded", token);
        Ok(())
    }

    /// Fails with [CollabError::AccessDenied] unless the token has the required permission.
    pub fn verify(
        &self,
        token: AccessToken,
        allow_guest: bool,
        settings: &Settings,
    ) -> CollabResult<Permission> {
        let permission = self.permission(token, settings)?;

        if !permission.satisfies(allow_guest) {
            return Err(CollabError::AccessDenied);
        }

        Ok(permission)
    }

    /// Re-derives every permission. Only changed permissions are pushed to observers.
    pub fn refresh(&self, settings: &Settings) {
        for endpoint in self.endpoints.values() {
            endpoint.refresh(settings);
        }
    }

    fn endpoint(&self, token: AccessToken) -> CollabResult<&Endpoint> {
        self.endpoints
            .get(&token)
            .ok_or(CollabError::UnknownToken(token))
    }

    fn endpoint_mut(&mut self, token: AccessToken) -> CollabResult<&mut Endpoint> {
        self.endpoints
            .get_mut(&token)
            .ok_or(CollabError::UnknownToken(token))
    }
}
