//! Ledger of optimistic changes waiting on the server.
//!
//! A mutation enters as `Pending` when its UI change is applied, becomes
//! `Confirmed` once the server accepted it, and is dropped when the following
//! refresh lands (`settle`) or when it is reverted.

use std::collections::BTreeMap;

use crate::comment::{Comment, CommentId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MutationId(u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    Vote {
        comment_id: CommentId,
        user_id: String,
        previous_vote: i8,
        new_vote: i8,
    },
    Delete {
        comment_id: CommentId,
    },
    /// Holds the cleared list so it can be put back.
    DeleteAll {
        removed: Vec<Comment>,
    },
}

impl Mutation {
    /// Change of the comment's counter caused by this mutation.
    pub fn vote_delta(&self) -> i64 {
        match self {
            Mutation::Vote {
                previous_vote,
                new_vote,
                ..
            } => i64::from(*new_vote) - i64::from(*previous_vote),
            Mutation::Delete { .. } | Mutation::DeleteAll { .. } => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationStatus {
    Pending,
    Confirmed,
}

#[derive(Debug, Default)]
pub struct MutationLedger {
    next_id: u64,
    entries: BTreeMap<MutationId, (Mutation, MutationStatus)>,
}

impl MutationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, mutation: Mutation) -> MutationId {
        self.next_id += 1;
        let id = MutationId(self.next_id);
        self.entries.insert(id, (mutation, MutationStatus::Pending));
        id
    }

    pub fn confirm(&mut self, id: MutationId) -> bool {
        match self.entries.get_mut(&id) {
            Some((_, status)) => {
                *status = MutationStatus::Confirmed;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: MutationId) -> Option<&Mutation> {
        self.entries.get(&id).map(|(mutation, _)| mutation)
    }

    /// Removes a mutation so the caller can undo it.
    pub fn take(&mut self, id: MutationId) -> Option<Mutation> {
        self.entries.remove(&id).map(|(mutation, _)| mutation)
    }

    /// Drops every confirmed mutation; the server state now reflects them.
    pub fn settle(&mut self) {
        self.entries
            .retain(|_, (_, status)| *status == MutationStatus::Pending);
    }

    pub fn is_deleting(&self, comment_id: CommentId) -> bool {
        self.entries.values().any(|(mutation, _)| {
            matches!(mutation, Mutation::Delete { comment_id: id } if *id == comment_id)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
