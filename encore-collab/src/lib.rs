//! Shared control over a party playlist: who may do what, and how guest votes
//! move entries up the queue.

mod access;
mod errors;
mod tokens;
mod vault;
mod votes;

use std::sync::Arc;

pub use access::*;
pub use errors::*;
pub use tokens::*;
pub use vault::*;
pub use votes::*;

use encore_core::{
    EntryId, Playlist, PlaylistSnapshot, QueueEvent, QueueItem, Scope, Settings, Signal,
    Subscription,
};
use log::info;
use parking_lot::{Mutex, MutexGuard};

/// The collab system of a party, shared by the owner's interface and the remote dispatcher.
///
/// Every call that changes something takes the same lock, and notifications are
/// sent before it is released, so observers see changes in the order they happened.
pub struct Collab<T> {
    state: Arc<Mutex<CollabState<T>>>,
    tokens: Arc<TokenRegistry>,
    vault: Arc<dyn PasswordVault>,
}

struct CollabState<T> {
    settings: Signal<Settings>,
    access: AccessControl,
    ledger: VoteLedger,
    playlist: Playlist<T>,
}

impl<T> Collab<T>
where
    T: QueueItem,
{
    pub fn new(settings: Settings) -> Self {
        Self::with_vault(settings, Argon2Vault::default())
    }

    /// Creates the collab system with a custom way of storing passwords.
    pub fn with_vault<V>(settings: Settings, vault: V) -> Self
    where
        V: PasswordVault + 'static,
    {
        let state = CollabState {
            settings: Signal::new(settings),
            access: AccessControl::new(),
            ledger: VoteLedger::new(),
            playlist: Playlist::new(),
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            tokens: Arc::new(TokenRegistry::new()),
            vault: Arc::new(vault),
        }
    }

    /// Issues a fresh token for the owner's device.
    pub fn register_local(&self) -> AccessToken {
        let mut state = self.state.lock();
        let token = self.tokens.register_local();
        state.track(token, &TokenKind::Local);

        token
    }

    /// Returns the token of a remote device, issuing one the first time the device is seen.
    pub fn register_remote(&self, device_id: impl Into<DeviceId>) -> AccessToken {
        let mut state = self.state.lock();
        let device_id = device_id.into();
        let (token, created) = self.tokens.register_remote(device_id.clone());

        if created {
            state.track(token, &TokenKind::Remote(device_id));
        }

        token
    }

    pub fn lookup(&self, token: AccessToken) -> CollabResult<TokenKind> {
        self.tokens.lookup(token)
    }

    /// Sets the password of a scope. See [AccessControl::set_password].
    pub fn set_password(
        &self,
        token: AccessToken,
        scope: Scope,
        password: &str,
    ) -> CollabResult<()> {
        self.tokens.lookup(token)?;
        let mut state = self.state.lock();

        let mut settings = state.settings.get();
        state
            .access
            .set_password(token, scope, password, &mut settings, self.vault.as_ref())?;
        state.settings.set(settings);

        Ok(())
    }

    /// Unlocks the token if the password of its scope matches.
    pub fn upgrade(&self, token: AccessToken, password: &str) -> CollabResult<()> {
        self.tokens.lookup(token)?;
        let mut state = self.state.lock();
        let settings = state.settings.get();

        state
            .access
            .upgrade(token, password, &settings, self.vault.as_ref())
    }

    /// Locks the token again.
    pub fn downgrade(&self, token: AccessToken) -> CollabResult<()> {
        self.tokens.lookup(token)?;
        let mut state = self.state.lock();
        let settings = state.settings.get();

        state.access.downgrade(token, &settings)
    }

    pub fn permission(&self, token: AccessToken) -> CollabResult<Permission> {
        self.tokens.lookup(token)?;
        let state = self.state.lock();

        state.access.permission(token, &state.settings.get())
    }

    /// A live view of the permission of the token, starting with the current one.
    pub fn observe_permission(&self, token: AccessToken) -> CollabResult<Subscription<Permission>> {
        self.tokens.lookup(token)?;
        self.state.lock().access.observe(token)
    }

    /// Fails with [CollabError::AccessDenied] unless the token is admin, or `allow_guest` is set.
    pub fn verify(&self, token: AccessToken, allow_guest: bool) -> CollabResult<Permission> {
        self.tokens.lookup(token)?;
        let state = self.state.lock();

        state.access.verify(token, allow_guest, &state.settings.get())
    }

    /// Votes for an entry, moving it up the queue.
    ///
    /// Guests are held to the vote limit and may vote for an entry once. The owner's
    /// votes are not counted, and always go through if the entry can be voted for.
    pub fn vote(&self, token: AccessToken, entry: EntryId) -> CollabResult<()> {
        let kind = self.tokens.lookup(token)?;
        let mut state = self.state.lock();
        let settings = state.settings.get();

        state.playlist.check_votable(entry)?;

        if !kind.is_local() {
            state.ledger.check(token, entry, &settings)?;
        }

        state.playlist.vote(entry)?;

        if !kind.is_local() {
            state
                .ledger
                .record(token, entry, false, settings.max_vote_count);
        }

        Ok(())
    }

    /// Charges a vote for an entry that was added on a guest's behalf, without moving it.
    pub fn shadow_vote(&self, token: AccessToken, entry: EntryId) -> CollabResult<()> {
        let kind = self.tokens.lookup(token)?;
        let mut state = self.state.lock();
        let settings = state.settings.get();

        let shadow_voted = state
            .playlist
            .get(entry)
            .ok_or(CollabError::UnknownEntry(entry))?
            .is_shadow_voted();

        if !shadow_voted {
            return Err(CollabError::NotShadowVoted(entry));
        }

        state.playlist.check_votable(entry)?;

        if !kind.is_local() {
            state.ledger.check(token, entry, &settings)?;
            state
                .ledger
                .record(token, entry, true, settings.max_vote_count);
        }

        Ok(())
    }

    pub fn is_vote_registered(&self, token: AccessToken, entry: EntryId) -> bool {
        self.state.lock().ledger.is_registered(token, entry)
    }

    /// A live view of how many votes the token has left, starting with the current count.
    pub fn observe_remaining_votes(&self, token: AccessToken) -> CollabResult<Subscription<u32>> {
        self.tokens.lookup(token)?;
        self.state.lock().ledger.observe(token)
    }

    pub fn remaining_votes(&self, token: AccessToken) -> CollabResult<u32> {
        self.tokens.lookup(token)?;
        let state = self.state.lock();

        Ok(state
            .ledger
            .remaining(token, state.settings.get().max_vote_count))
    }

    /// The live votes of a token, oldest first.
    pub fn records_for(&self, token: AccessToken) -> Vec<VoteRecord> {
        self.state.lock().ledger.records_for(token)
    }

    /// Appends items to the end of the queue. Admin only.
    pub fn enqueue<I>(&self, token: AccessToken, items: I) -> CollabResult<Vec<EntryId>>
    where
        I: IntoIterator<Item = T>,
    {
        let mut state = self.admin(token)?;
        Ok(state.playlist.add(items))
    }

    /// Adds an item on behalf of a guest. The entry comes with the guest's vote,
    /// which counts against their limit.
    pub fn enqueue_as_guest(&self, token: AccessToken, item: T) -> CollabResult<EntryId> {
        let kind = self.tokens.lookup(token)?;
        let mut state = self.state.lock();
        let settings = state.settings.get();

        if !kind.is_local() {
            state.ledger.check_allowance(token, &settings)?;
        }

        info!("{} added {} as a guest", token, item.describe());
        let entry = state.playlist.insert_shadow_voted(item);

        if !kind.is_local() {
            state
                .ledger
                .record(token, entry, true, settings.max_vote_count);
        }

        Ok(entry)
    }

    /// Removes entries from the queue, handing back the votes held on them. Admin only.
    pub fn remove(&self, token: AccessToken, entries: &[EntryId]) -> CollabResult<()> {
        let mut state = self.admin(token)?;
        let max_vote_count = state.settings.get().max_vote_count;

        state.playlist.remove(entries)?;
        state.ledger.invalidate(entries, max_vote_count);

        Ok(())
    }

    /// Moves an entry by hand. Admin only.
    pub fn move_entry(&self, token: AccessToken, from: usize, to: usize) -> CollabResult<()> {
        let mut state = self.admin(token)?;
        state.playlist.move_entry(from, to)?;

        Ok(())
    }

    /// Jumps to an entry. Admin only.
    pub fn play_index(&self, token: AccessToken, index: Option<usize>) -> CollabResult<()> {
        let mut state = self.admin(token)?;
        state.advance(index)
    }

    /// Removes every entry. Admin only.
    pub fn clear(&self, token: AccessToken) -> CollabResult<()> {
        let mut state = self.admin(token)?;
        let max_vote_count = state.settings.get().max_vote_count;

        let removed = state.playlist.clear();
        state.ledger.invalidate(&removed, max_vote_count);

        Ok(())
    }

    /// Moves the cursor on behalf of the player, when it moves on to another entry.
    pub fn advance_to(&self, index: Option<usize>) -> CollabResult<()> {
        self.state.lock().advance(index)
    }

    pub fn snapshot(&self) -> PlaylistSnapshot<T> {
        self.state.lock().playlist.snapshot()
    }

    /// Receive every change made to the queue from now on.
    pub fn subscribe_queue(&self) -> Subscription<QueueEvent<T>> {
        self.state.lock().playlist.subscribe()
    }

    pub fn settings(&self) -> Settings {
        self.state.lock().settings.get()
    }

    pub fn observe_settings(&self) -> Subscription<Settings> {
        self.state.lock().settings.subscribe()
    }

    /// Changes the settings. Every permission and vote count is re-derived before this returns.
    ///
    /// Password fields hold hashes. Use [Collab::set_password] to set a password.
    pub fn configure<F>(&self, change: F)
    where
        F: FnOnce(&mut Settings),
    {
        let state = self.state.lock();

        let mut settings = state.settings.get();
        change(&mut settings);

        if state.settings.set(settings.clone()) {
            info!("Settings changed: {:?}", settings);

            state.access.refresh(&settings);
            state.ledger.refresh(settings.max_vote_count);
        }
    }

    /// Takes the lock, if the token is admin.
    fn admin(&self, token: AccessToken) -> CollabResult<MutexGuard<'_, CollabState<T>>> {
        self.tokens.lookup(token)?;
        let state = self.state.lock();

        state.access.verify(token, false, &state.settings.get())?;
        Ok(state)
    }
}

impl<T> CollabState<T>
where
    T: QueueItem,
{
    fn track(&mut self, token: AccessToken, kind: &TokenKind) {
        let settings = self.settings.get();

        self.access.register(token, kind.scope(), &settings);
        self.ledger.register_token(token, settings.max_vote_count);
    }

    fn advance(&mut self, index: Option<usize>) -> CollabResult<()> {
        let max_vote_count = self.settings.get().max_vote_count;

        let reset = self.playlist.set_current_index(index)?;
        self.ledger.invalidate(&reset, max_vote_count);

        match self.playlist.current_entry() {
            Some(entry) => info!("Now playing {}", entry.item().describe()),
            None => info!("Nothing is playing"),
        }

        Ok(())
    }
}

impl<T> Clone for Collab<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            tokens: self.tokens.clone(),
            vault: self.vault.clone(),
        }
    }
}
