//! Property tests for the vote-driven reordering of the playlist.

use encore_core::{EntryId, Playlist};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    /// Vote for the entry at this offset into the votable tail.
    Vote(usize),
    /// Move the cursor to this position.
    Advance(usize),
    /// Clear the cursor.
    Stop,
    /// Remove the entry the cursor points at.
    RemoveCurrent,
    /// Append a plain entry.
    Add,
    /// Insert an entry on behalf of a guest.
    AddAsGuest,
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..32).prop_map(Op::Vote),
        1 => (0usize..32).prop_map(Op::Advance),
        1 => Just(Op::Stop),
        1 => Just(Op::RemoveCurrent),
        1 => Just(Op::Add),
        1 => Just(Op::AddAsGuest),
    ]
}

fn head_ids(playlist: &Playlist<String>) -> Vec<EntryId> {
    playlist.entries()[..playlist.votable_start()]
        .iter()
        .map(|entry| entry.id())
        .collect()
}

fn assert_tail_sorted(playlist: &Playlist<String>) -> Result<(), TestCaseError> {
    let tail = &playlist.entries()[playlist.votable_start()..];

    for pair in tail.windows(2) {
        prop_assert!(
            !pair[1].ranks_above(&pair[0]),
            "tail is out of order: {:?} before {:?}",
            pair[0],
            pair[1]
        );
    }

    Ok(())
}

proptest! {
    /// Property: after any mix of votes, additions, removals and cursor moves in either direction,
    /// the tail is ordered by votes descending with ties in insertion order, and the head is
    /// never touched by a vote.
    #[test]
    fn tail_stays_ordered(
        initial in 1usize..12,
        ops in prop::collection::vec(arbitrary_op(), 1..60)
    ) {
        let mut playlist = Playlist::new();
        playlist.add((0..initial).map(|i| format!("song {i}")));

        for (step, op) in ops.into_iter().enumerate() {
            match op {
                Op::Vote(offset) => {
                    let start = playlist.votable_start();
                    let tail_len = playlist.len() - start;

                    if tail_len == 0 {
                        continue;
                    }

                    let id = playlist.entries()[start + offset % tail_len].id();
                    let head_before = head_ids(&playlist);

                    playlist.vote(id).unwrap();

                    prop_assert_eq!(
                        head_ids(&playlist),
                        head_before,
                        "a vote moved a played entry"
                    );
                }
                Op::Advance(position) => {
                    if playlist.is_empty() {
                        continue;
                    }

                    let target = position % playlist.len();
                    playlist.set_current_index(Some(target)).unwrap();

                    for entry in &playlist.entries()[..=target] {
                        prop_assert_eq!(entry.votes(), 0, "played entries keep no votes");
                    }
                }
                Op::Stop => {
                    playlist.set_current_index(None).unwrap();
                }
                Op::RemoveCurrent => {
                    if let Some(current) = playlist.current_entry().map(|entry| entry.id()) {
                        playlist.remove(&[current]).unwrap();
                    }
                }
                Op::Add => {
                    playlist.add([format!("added {step}")]);
                }
                Op::AddAsGuest => {
                    playlist.insert_shadow_voted(format!("guest {step}"));
                }
            }

            assert_tail_sorted(&playlist)?;

            for (index, entry) in playlist.entries().iter().enumerate() {
                prop_assert_eq!(entry.index(), index);
            }
        }
    }

    /// Property: a vote never lowers an entry's position, and never reorders the entries it passes.
    #[test]
    fn vote_only_moves_the_voted_entry(
        initial in 2usize..12,
        votes in prop::collection::vec(0usize..32, 1..30)
    ) {
        let mut playlist = Playlist::new();
        playlist.add((0..initial).map(|i| format!("song {i}")));

        for offset in votes {
            let id = playlist.entries()[offset % playlist.len()].id();
            let before = playlist.position_of(id).unwrap();
            let others_before: Vec<_> = playlist
                .entries()
                .iter()
                .map(|entry| entry.id())
                .filter(|other| *other != id)
                .collect();

            let after = playlist.vote(id).unwrap();

            let others_after: Vec<_> = playlist
                .entries()
                .iter()
                .map(|entry| entry.id())
                .filter(|other| *other != id)
                .collect();

            prop_assert!(after <= before, "entry moved back from {} to {}", before, after);
            prop_assert_eq!(others_before, others_after);
        }
    }
}
