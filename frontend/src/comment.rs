use std::collections::BTreeMap;

use chrono::DateTime;

pub type CommentId = i64;

#[derive(Hash, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub timestamp_millis: i64,
    pub upvote_count: i64,
    pub author_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub per_user_vote: BTreeMap<String, i8>,
}

impl Comment {
    /// The vote `user_id` currently has on this comment, 0 if none.
    pub fn vote_of(&self, user_id: &str) -> i8 {
        self.per_user_vote
            .get(user_id)
            .copied()
            .map(|vote| vote.clamp(-1, 1))
            .unwrap_or(0)
    }

    pub fn set_vote(&mut self, user_id: &str, vote: i8) {
        if vote == 0 {
            self.per_user_vote.remove(user_id);
        } else {
            self.per_user_vote.insert(user_id.to_owned(), vote);
        }
    }

    pub fn author_label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.author_id
        } else {
            &self.display_name
        }
    }

    pub fn posted_at(&self) -> String {
        DateTime::from_timestamp_millis(self.timestamp_millis)
            .map(|time| time.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub logged_in: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Login url when logged out, logout url otherwise.
    #[serde(default, alias = "url")]
    pub login_url: String,
}

impl UserIdentity {
    /// Id used as the key of `Comment::per_user_vote`.
    pub fn user_id(&self) -> Option<&str> {
        if self.logged_in {
            self.email.as_deref()
        } else {
            None
        }
    }

    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.email.as_deref())
            .unwrap_or("")
    }

    pub fn is_author_of(&self, comment: &Comment) -> bool {
        self.user_id() == Some(comment.author_id.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// The vote a user ends up with after pressing this button. Pressing the
    /// button matching the current vote withdraws it.
    pub fn next_vote(self, current: i8) -> i8 {
        match (self, current) {
            (VoteDirection::Up, 1) => 0,
            (VoteDirection::Up, _) => 1,
            (VoteDirection::Down, -1) => 0,
            (VoteDirection::Down, _) => -1,
        }
    }
}

/// Counter text shown next to the vote buttons.
pub fn vote_counter_text(upvotes: i64) -> String {
    if upvotes > 0 {
        format!("+{}", upvotes)
    } else if upvotes < 0 {
        upvotes.to_string()
    } else {
        String::new()
    }
}
