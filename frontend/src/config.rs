use log::LevelFilter;

use crate::error::FrontendError;
use crate::settings::ViewSettings;

pub const ROOT_ELEMENT_ID: &str = "comment_panel_root";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Language {
    pub code: String,
    pub label: String,
}

impl Language {
    fn new(code: &str, label: &str) -> Self {
        Language {
            code: code.into(),
            label: label.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub comments: String,
    pub auth: String,
    pub upvote: String,
    pub delete: String,
    pub translate: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            comments: "/data".into(),
            auth: "/auth".into(),
            upvote: "/upvote-data".into(),
            delete: "/delete-data".into(),
            translate: "/translate-data".into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Origin the endpoints are resolved against; the page origin when unset.
    pub api_base: Option<String>,
    pub endpoints: Endpoints,
    pub root_element_id: String,
    pub default_settings: ViewSettings,
    pub sort_fields: Vec<String>,
    pub languages: Vec<Language>,
    /// Below this window width the page collapses to one column.
    pub narrow_layout_width: f64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: None,
            endpoints: Endpoints::default(),
            root_element_id: ROOT_ELEMENT_ID.into(),
            default_settings: ViewSettings::default(),
            sort_fields: vec!["timestamp".into(), "upvotes".into()],
            languages: vec![
                Language::new("en", "English"),
                Language::new("es", "Español"),
                Language::new("zh", "中文"),
                Language::new("fr", "Français"),
                Language::new("de", "Deutsch"),
                Language::new("ja", "日本語"),
            ],
            narrow_layout_width: 1000.0,
            log_level: "info".into(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, FrontendError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FrontendError> {
        if self.root_element_id.is_empty() {
            return Err(FrontendError::Config("root_element_id is empty".into()));
        }
        if self.default_settings.page_size == 0 || self.default_settings.total_limit == 0 {
            return Err(FrontendError::Config(
                "default page size and total limit must be positive".into(),
            ));
        }
        self.level_filter()?;
        Ok(())
    }

    pub fn level_filter(&self) -> Result<LevelFilter, FrontendError> {
        self.log_level
            .parse()
            .map_err(|_| FrontendError::Config(format!("unknown log level {:?}", self.log_level)))
    }
}
