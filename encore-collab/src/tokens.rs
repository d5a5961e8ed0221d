use std::fmt::Display;

use dashmap::{mapref::entry::Entry, DashMap};
use encore_core::Scope;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{CollabError, CollabResult};

/// An opaque identity handed to every device taking part in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessToken(u128);

/// An identifier a remote device supplies for itself, stable across reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// The owner's device.
    Local,
    /// A device connected over the network.
    Remote(DeviceId),
}

/// Issues access tokens and resolves them back to what they were issued for.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: DashMap<AccessToken, TokenKind>,
    devices: DashMap<DeviceId, AccessToken>,
}

impl AccessToken {
    fn generate() -> Self {
        Self(rand::random())
    }
}

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl TokenKind {
    /// The scope whose password and lock govern tokens of this kind.
    pub fn scope(&self) -> Scope {
        match self {
            TokenKind::Local => Scope::Local,
            TokenKind::Remote(_) => Scope::Remote,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, TokenKind::Local)
    }
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new token for the owner's device. Every call returns a fresh token.
    pub fn register_local(&self) -> AccessToken {
        let token = self.issue(TokenKind::Local);
        info!("Issued local access token {}", token);

        token
    }

    /// Returns the token of a remote device, issuing one if the device is new.
    /// The second value is `true` if the token was issued by this call.
    pub fn register_remote(&self, device_id: DeviceId) -> (AccessToken, bool) {
        match self.devices.entry(device_id.clone()) {
            Entry::Occupied(existing) => (*existing.get(), false),
            Entry::Vacant(vacant) => {
                let token = self.issue(TokenKind::Remote(device_id.clone()));
                vacant.insert(token);

                info!("Issued remote access token {} for {}", token, device_id);
                (token, true)
            }
        }
    }

    /// Resolves a token to its kind.
    pub fn lookup(&self, token: AccessToken) -> CollabResult<TokenKind> {
        self.tokens
            .get(&token)
            .map(|kind| kind.clone())
            .ok_or(CollabError::UnknownToken(token))
    }

    fn issue(&self, kind: TokenKind) -> AccessToken {
        loop {
            let token = AccessToken::generate();

            // Tokens are never reissued
            if let Entry::Vacant(vacant) = self.tokens.entry(token) {
                vacant.insert(kind);
                return token;
            }
        }
    }
}

impl Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
