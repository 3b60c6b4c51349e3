//! View settings and the reducer that applies form changes to them.
//!
//! The reducer is pure: it receives the settings, a message describing what
//! the user did, and the number of cached comments, and returns the new
//! settings together with what the caller has to do about the change.

use std::fmt;
use std::str::FromStr;

use crate::pagination::{clamp_page, max_page};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ascending" => Ok(SortDirection::Ascending),
            "descending" => Ok(SortDirection::Descending),
            other => Err(format!("unknown sort direction {:?}", other)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewSettings {
    pub sort_direction: SortDirection,
    pub sort_field: String,
    pub page_size: usize,
    pub total_limit: usize,
    pub author_filter: String,
    pub current_page: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        ViewSettings {
            sort_direction: SortDirection::Descending,
            sort_field: "timestamp".into(),
            page_size: 5,
            total_limit: 20,
            author_filter: String::new(),
            current_page: 1,
        }
    }
}

impl ViewSettings {
    /// Same settings with sizes raised to at least one and the page clamped
    /// against `available` cached comments.
    pub fn normalized(mut self, available: usize) -> Self {
        self.page_size = self.page_size.max(1);
        self.total_limit = self.total_limit.max(1);
        self.current_page = clamp_page(
            self.current_page,
            max_page(available, self.total_limit, self.page_size),
        );
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingsMessage {
    SortDirectionChanged(SortDirection),
    SortFieldChanged(String),
    TotalLimitChanged(usize),
    PageSizeChanged(usize),
    AuthorFilterChanged(String),
    NextPage,
    PreviousPage,
}

/// What the caller must do after the reducer ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsEffect {
    /// Nothing changed.
    None,
    /// Only the visible page changed; the cache is still valid.
    Repaginate,
    /// Page size changed: repaginate and write the cookies.
    RepaginateAndPersist,
    /// The server query changed: write the cookies and fetch again.
    RefetchAndPersist,
    /// The author filter changed: fetch again, nothing to persist.
    Refetch,
}

impl SettingsEffect {
    pub fn persists(self) -> bool {
        matches!(
            self,
            SettingsEffect::RepaginateAndPersist | SettingsEffect::RefetchAndPersist
        )
    }

    pub fn refetches(self) -> bool {
        matches!(self, SettingsEffect::Refetch | SettingsEffect::RefetchAndPersist)
    }
}

pub fn reduce(
    settings: &ViewSettings,
    message: SettingsMessage,
    available: usize,
) -> (ViewSettings, SettingsEffect) {
    let mut next = settings.clone();

    let effect = match message {
        SettingsMessage::SortDirectionChanged(direction) => {
            next.sort_direction = direction;
            SettingsEffect::RefetchAndPersist
        }
        SettingsMessage::SortFieldChanged(field) => {
            next.sort_field = field;
            SettingsEffect::RefetchAndPersist
        }
        SettingsMessage::TotalLimitChanged(limit) => {
            next.total_limit = limit;
            SettingsEffect::RefetchAndPersist
        }
        SettingsMessage::PageSizeChanged(size) => {
            next.page_size = size;
            SettingsEffect::RepaginateAndPersist
        }
        SettingsMessage::AuthorFilterChanged(author) => {
            next.author_filter = author.trim().to_owned();
            SettingsEffect::Refetch
        }
        SettingsMessage::NextPage => {
            let last = max_page(available, next.total_limit.max(1), next.page_size.max(1));
            if next.current_page < last {
                next.current_page += 1;
            }
            SettingsEffect::Repaginate
        }
        SettingsMessage::PreviousPage => {
            if next.current_page > 1 {
                next.current_page -= 1;
            }
            SettingsEffect::Repaginate
        }
    };

    let next = next.normalized(available);

    if &next == settings {
        (next, SettingsEffect::None)
    } else {
        (next, effect)
    }
}
