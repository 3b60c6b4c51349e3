use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Error, Debug)]
pub enum FrontendError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("could not decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("server rejected request: {0}")]
    Rejected(String),

    #[error("dom operation failed: {0}")]
    Dom(String),

    #[error("missing element: {0}")]
    MissingElement(String),

    #[error("invalid config: {0}")]
    Config(String),
}

impl FrontendError {
    pub fn missing(what: impl Into<String>) -> Self {
        FrontendError::MissingElement(what.into())
    }
}

impl From<JsValue> for FrontendError {
    fn from(value: JsValue) -> Self {
        FrontendError::Dom(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}

impl From<FrontendError> for JsValue {
    fn from(err: FrontendError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}
