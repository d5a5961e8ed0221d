use std::collections::HashMap;

use chrono::{DateTime, Utc};
use encore_core::{EntryId, Settings, Signal, Subscription};
use log::debug;
use serde::Serialize;

use crate::{AccessToken, CollabError, CollabResult};

/// A live vote a token holds on an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteRecord {
    pub token: AccessToken,
    pub entry: EntryId,
    pub cast_at: DateTime<Utc>,
    /// Charged for adding the entry, rather than voting for it.
    pub shadow: bool,
}

/// Keeps track of the votes each guest holds, and how many they have left.
///
/// A token holds at most one vote per entry. Votes are handed back when the
/// entry they were cast for plays, or leaves the queue.
#[derive(Default)]
pub struct VoteLedger {
    records: HashMap<AccessToken, Vec<VoteRecord>>,
    remaining: HashMap<AccessToken, Signal<u32>>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_token(&mut self, token: AccessToken, max_vote_count: u32) {
        self.remaining
            .entry(token)
            .or_insert_with(|| Signal::new(max_vote_count));
    }

    pub fn is_registered(&self, token: AccessToken, entry: EntryId) -> bool {
        self.records
            .get(&token)
            .map_or(false, |records| {
                records.iter().any(|record| record.entry == entry)
            })
    }

    /// How many more votes the token may cast.
    pub fn remaining(&self, token: AccessToken, max_vote_count: u32) -> u32 {
        let held = self.records.get(&token).map_or(0, |records| records.len());
        let held = u32::try_from(held).unwrap_or(u32::MAX);

        max_vote_count.saturating_sub(held)
    }

    /// Checks whether the token may cast a vote for the entry, without casting it.
    pub fn check(
        &self,
        token: AccessToken,
        entry: EntryId,
        settings: &Settings,
    ) -> CollabResult<()> {
        self.check_allowance(token, settings)?;

        if self.is_registered(token, entry) {
            return Err(CollabError::DuplicateVote(entry));
        }

        Ok(())
    }

    /// Checks that guests may vote at all, and that the token has votes left.
    pub fn check_allowance(&self, token: AccessToken, settings: &Settings) -> CollabResult<()> {
        if !settings.enable_guest_system {
            return Err(CollabError::VotingDisabled);
        }

        if self.remaining(token, settings.max_vote_count) == 0 {
            return Err(CollabError::QuotaExhausted);
        }

        Ok(())
    }

    pub fn record(
        &mut self,
        token: AccessToken,
        entry: EntryId,
        shadow: bool,
        max_vote_count: u32,
    ) {
        self.records.entry(token).or_default().push(VoteRecord {
            token,
            entry,
            cast_at: Utc::now(),
            shadow,
        });

        debug!("{} voted for {} (shadow: {})", token, entry, shadow);
        self.emit_remaining(token, max_vote_count);
    }

    /// Hands back every vote held on the entries.
    pub fn invalidate(&mut self, entries: &[EntryId], max_vote_count: u32) {
        if entries.is_empty() {
            return;
        }

        let mut affected = Vec::new();

        for (token, records) in self.records.iter_mut() {
            let before = records.len();
            records.retain(|record| !entries.contains(&record.entry));

            if records.len() != before {
                affected.push(*token);
            }
        }

        self.records.retain(|_, records| !records.is_empty());

        for token in affected {
            debug!("Returned votes to {}", token);
            self.emit_remaining(token, max_vote_count);
        }
    }

    /// Recomputes every allowance, after the vote limit changed.
    pub fn refresh(&self, max_vote_count: u32) {
        for (token, signal) in &self.remaining {
            signal.set(self.remaining(*token, max_vote_count));
        }
    }

    pub fn observe(&self, token: AccessToken) -> CollabResult<Subscription<u32>> {
        self.remaining
            .get(&token)
            .map(|signal| signal.subscribe())
            .ok_or(CollabError::UnknownToken(token))
    }

    /// The live votes of a token, oldest first.
    pub fn records_for(&self, token: AccessToken) -> Vec<VoteRecord> {
        self.records.get(&token).cloned().unwrap_or_default()
    }

    fn emit_remaining(&self, token: AccessToken, max_vote_count: u32) {
        if let Some(signal) = self.remaining.get(&token) {
            signal.emit(self.remaining(token, max_vote_count));
        }
    }
}
