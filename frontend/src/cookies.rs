//! Settings persistence through `document.cookie`.
//!
//! Four settings survive a reload: sort direction, sort field, total limit and
//! page size. Values are written as plain `key=value` session cookies.

use std::cell::RefCell;

use log::{debug, warn};
use wasm_bindgen::JsCast;
use web_sys::HtmlDocument;

use crate::error::FrontendError;
use crate::settings::ViewSettings;

pub const SORT_DIR_COOKIE: &str = "sortDir";
pub const SORT_BY_COOKIE: &str = "sortBy";
pub const TOTAL_ELEMS_COOKIE: &str = "totalElems";
pub const ELEMS_PER_PAGE_COOKIE: &str = "numElemsPerPage";

const PERSISTED_KEYS: usize = 4;

pub trait CookieJar {
    /// The whole cookie string, `a=1; b=2` style.
    fn cookie_string(&self) -> Result<String, FrontendError>;
    fn set_cookie(&self, key: &str, value: &str) -> Result<(), FrontendError>;
}

const PERSISTED_NAMES: [&str; PERSISTED_KEYS] = [
    SORT_DIR_COOKIE,
    SORT_BY_COOKIE,
    TOTAL_ELEMS_COOKIE,
    ELEMS_PER_PAGE_COOKIE,
];

/// Overlays the persisted settings found in `cookies` on `defaults`. The first
/// occurrence of a repeated name wins, as `document.cookie` lists the most
/// specific path first.
pub fn read_settings(cookies: &str, defaults: ViewSettings) -> ViewSettings {
    let mut settings = defaults;
    let mut seen = [false; PERSISTED_KEYS];

    for pair in cookies.split(';') {
        if seen.iter().all(|found| *found) {
            break;
        }

        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        let Some(slot) = PERSISTED_NAMES.iter().position(|name| *name == key) else {
            continue;
        };
        if std::mem::replace(&mut seen[slot], true) {
            debug!("skipping repeated {} cookie", key);
            continue;
        }

        match key {
            SORT_DIR_COOKIE => match value.parse() {
                Ok(direction) => settings.sort_direction = direction,
                Err(err) => warn!("ignoring {} cookie: {}", SORT_DIR_COOKIE, err),
            },
            SORT_BY_COOKIE => {
                if value.is_empty() {
                    warn!("ignoring empty {} cookie", SORT_BY_COOKIE);
                } else {
                    settings.sort_field = value.to_owned();
                }
            }
            TOTAL_ELEMS_COOKIE => match value.parse::<usize>() {
                Ok(limit) if limit > 0 => settings.total_limit = limit,
                _ => warn!("ignoring {} cookie: {:?}", TOTAL_ELEMS_COOKIE, value),
            },
            ELEMS_PER_PAGE_COOKIE => match value.parse::<usize>() {
                Ok(size) if size > 0 => settings.page_size = size,
                _ => warn!("ignoring {} cookie: {:?}", ELEMS_PER_PAGE_COOKIE, value),
            },
            _ => {}
        }
    }

    settings
}

pub fn settings_cookies(settings: &ViewSettings) -> [(&'static str, String); PERSISTED_KEYS] {
    [
        (SORT_DIR_COOKIE, settings.sort_direction.to_string()),
        (SORT_BY_COOKIE, settings.sort_field.clone()),
        (TOTAL_ELEMS_COOKIE, settings.total_limit.to_string()),
        (ELEMS_PER_PAGE_COOKIE, settings.page_size.to_string()),
    ]
}

pub fn persist_settings(jar: &impl CookieJar, settings: &ViewSettings) -> Result<(), FrontendError> {
    for (key, value) in settings_cookies(settings) {
        jar.set_cookie(key, &value)?;
    }
    debug!("persisted settings {:?}", settings);
    Ok(())
}

pub fn load_settings(jar: &impl CookieJar, defaults: ViewSettings) -> ViewSettings {
    match jar.cookie_string() {
        Ok(cookies) => read_settings(&cookies, defaults),
        Err(err) => {
            warn!("could not read cookies, using defaults: {}", err);
            defaults
        }
    }
}

/// Cookies of the current page.
pub struct DocumentCookies;

impl DocumentCookies {
    fn document() -> Result<HtmlDocument, FrontendError> {
        web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| FrontendError::missing("document"))?
            .dyn_into::<HtmlDocument>()
            .map_err(|_| FrontendError::Dom("document is not an html document".into()))
    }
}

impl CookieJar for DocumentCookies {
    fn cookie_string(&self) -> Result<String, FrontendError> {
        Ok(Self::document()?.cookie()?)
    }

    fn set_cookie(&self, key: &str, value: &str) -> Result<(), FrontendError> {
        Ok(Self::document()?.set_cookie(&format!("{}={}", key, value))?)
    }
}

/// Jar with `document.cookie` semantics kept in memory.
#[derive(Default)]
pub struct MemoryCookies {
    entries: RefCell<Vec<(String, String)>>,
}

impl MemoryCookies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .borrow()
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.clone())
    }
}

impl CookieJar for MemoryCookies {
    fn cookie_string(&self) -> Result<String, FrontendError> {
        Ok(self
            .entries
            .borrow()
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("; "))
    }

    fn set_cookie(&self, key: &str, value: &str) -> Result<(), FrontendError> {
        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|(existing, _)| existing == key) {
            Some(entry) => entry.1 = value.to_owned(),
            None => entries.push((key.to_owned(), value.to_owned())),
        }
        Ok(())
    }
}
