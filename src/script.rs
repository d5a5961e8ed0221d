use std::collections::HashMap;

use encore_collab::{AccessToken, Collab, Permission};
use encore_core::{EntryId, QueueEvent, QueueItem, Scope, Settings, Subscription};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::HostError;

/// A song in the party queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub title: String,
    pub artist: String,
}

impl QueueItem for Song {
    fn describe(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// One thing a participant does during a session.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub who: String,
    pub action: Action,
}

/// Entries are referred to by title, and the first entry with that title is used.
#[derive(Debug, Clone, Deserialize)]
pub enum Action {
    /// Join from the owner's device.
    JoinLocal,
    /// Join from a phone, using the participant name as the device id.
    JoinRemote,
    SetPassword { scope: Scope, password: String },
    Upgrade(String),
    Downgrade,
    Lock { scope: Scope, locked: bool },
    GuestSystem(bool),
    MaxVotes(u32),
    Enqueue(Vec<Song>),
    /// Add a song through the guest path.
    Request(Song),
    Vote(String),
    ShadowVote(String),
    Remove(Vec<String>),
    Move { from: usize, to: usize },
    Play(Option<usize>),
    /// The player moved on. Needs no participant.
    Advance(Option<usize>),
    Clear,
}

/// Replays steps against a collab system, logging everything that happens.
pub struct Session {
    collab: Collab<Song>,
    participants: HashMap<String, Participant>,
    events: Subscription<QueueEvent<Song>>,
}

struct Participant {
    token: AccessToken,
    permission: Subscription<Permission>,
    remaining_votes: Subscription<u32>,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        let collab = Collab::new(settings);
        let events = collab.subscribe_queue();

        Self {
            collab,
            participants: HashMap::new(),
            events,
        }
    }

    /// Runs every step in order. Refused steps are logged and skipped.
    pub fn replay(&mut self, steps: &[Step]) -> Result<(), HostError> {
        for (number, step) in steps.iter().enumerate() {
            match self.run(number, step) {
                Ok(()) => info!("{} {:?}", step.who, step.action),
                Err(HostError::Refused(error)) => {
                    warn!("{} {:?} was refused: {}", step.who, step.action, error)
                }
                Err(error) => return Err(error),
            }

            self.report()?;
        }

        let snapshot = serde_json::to_string_pretty(&self.collab.snapshot())?;
        info!("Final queue:\n{}", snapshot);

        Ok(())
    }

    fn run(&mut self, number: usize, step: &Step) -> Result<(), HostError> {
        let collab = &self.collab;

        match &step.action {
            Action::JoinLocal => {
                let token = collab.register_local();
                self.join(&step.who, token)?;
            }
            Action::JoinRemote => {
                let token = collab.register_remote(step.who.as_str());
                self.join(&step.who, token)?;
            }
            Action::SetPassword { scope, password } => {
                collab.set_password(self.token(number, step)?, *scope, password)?
            }
            Action::Upgrade(password) => collab.upgrade(self.token(number, step)?, password)?,
            Action::Downgrade => collab.downgrade(self.token(number, step)?)?,
            Action::Lock { scope, locked } => {
                self.configure(number, step, |settings| settings.set_lock_for(*scope, *locked))?
            }
            Action::GuestSystem(enabled) => {
                self.configure(number, step, |settings| settings.enable_guest_system = *enabled)?
            }
            Action::MaxVotes(count) => {
                self.configure(number, step, |settings| settings.max_vote_count = *count)?
            }
            Action::Enqueue(songs) => {
                collab.enqueue(self.token(number, step)?, songs.iter().cloned())?;
            }
            Action::Request(song) => {
                collab.enqueue_as_guest(self.token(number, step)?, song.clone())?;
            }
            Action::Vote(title) => {
                collab.vote(self.token(number, step)?, self.entry(number, title)?)?
            }
            Action::ShadowVote(title) => {
                collab.shadow_vote(self.token(number, step)?, self.entry(number, title)?)?
            }
            Action::Remove(titles) => {
                let entries = titles
                    .iter()
                    .map(|title| self.entry(number, title))
                    .collect::<Result<Vec<_>, _>>()?;

                collab.remove(self.token(number, step)?, &entries)?
            }
            Action::Move { from, to } => {
                collab.move_entry(self.token(number, step)?, *from, *to)?
            }
            Action::Play(index) => collab.play_index(self.token(number, step)?, *index)?,
            Action::Advance(index) => collab.advance_to(*index)?,
            Action::Clear => collab.clear(self.token(number, step)?)?,
        }

        Ok(())
    }

    fn join(&mut self, who: &str, token: AccessToken) -> Result<(), HostError> {
        let participant = Participant {
            token,
            permission: self.collab.observe_permission(token)?,
            remaining_votes: self.collab.observe_remaining_votes(token)?,
        };

        self.participants.insert(who.to_string(), participant);
        Ok(())
    }

    /// Settings belong to admins.
    fn configure<F>(&self, number: usize, step: &Step, change: F) -> Result<(), HostError>
    where
        F: FnOnce(&mut Settings),
    {
        self.collab.verify(self.token(number, step)?, false)?;
        self.collab.configure(change);

        Ok(())
    }

    fn token(&self, number: usize, step: &Step) -> Result<AccessToken, HostError> {
        self.participants
            .get(&step.who)
            .map(|participant| participant.token)
            .ok_or_else(|| HostError::UnknownParticipant {
                step: number,
                who: step.who.clone(),
            })
    }

    fn entry(&self, number: usize, title: &str) -> Result<EntryId, HostError> {
        self.collab
            .snapshot()
            .entries
            .into_iter()
            .find(|entry| entry.item.title == title)
            .map(|entry| entry.id)
            .ok_or_else(|| HostError::UnknownSong {
                step: number,
                title: title.to_string(),
            })
    }

    /// Logs queue events and every permission or vote count that changed.
    fn report(&self) -> Result<(), HostError> {
        for event in self.events.drain() {
            info!("Queue event: {}", serde_json::to_string(&event)?);
        }

        for (who, participant) in &self.participants {
            if let Some(permission) = participant.permission.latest() {
                info!("{} is now {:?}", who, permission);
            }

            if let Some(remaining) = participant.remaining_votes.latest() {
                info!("{} has {} vote(s) left", who, remaining);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(script: &str) -> Vec<Step> {
        ron::from_str(script).unwrap()
    }

    #[test]
    fn test_demo_session_parses_and_replays() {
        let steps = steps(crate::DEMO_SESSION);
        let mut session = Session::new(Settings::default());

        assert!(!steps.is_empty());
        assert!(session.replay(&steps).is_ok());
    }

    #[test]
    fn test_refused_steps_do_not_stop_the_session() {
        let steps = steps(
            r#"[
                (who: "owner", action: JoinLocal),
                (who: "owner", action: Upgrade("nothing set yet")),
                (who: "owner", action: Enqueue([(title: "Intro", artist: "The xx")])),
            ]"#,
        );
        let mut session = Session::new(Settings::default());

        session.replay(&steps).unwrap();

        assert_eq!(session.collab.snapshot().entries.len(), 1);
    }

    #[test]
    fn test_unknown_participant_stops_the_session() {
        let steps = steps(r#"[(who: "ghost", action: Downgrade)]"#);
        let mut session = Session::new(Settings::default());

        assert!(matches!(
            session.replay(&steps),
            Err(HostError::UnknownParticipant { step: 0, .. })
        ));
    }
}
