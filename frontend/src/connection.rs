use futures_util::future::{FutureExt, LocalBoxFuture};
use log::{debug, info};
use reqwest::Client;

use crate::comment::{Comment, CommentId, UserIdentity};
use crate::config::{Config, Endpoints};
use crate::error::FrontendError;
use crate::settings::ViewSettings;

pub type BackendFuture<'a, T> = LocalBoxFuture<'a, Result<T, FrontendError>>;

/// Query string of a comment list request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentQuery {
    pub limit: usize,
    pub sort: String,
    pub sort_by: String,
    pub auth: String,
}

impl CommentQuery {
    pub fn from_settings(settings: &ViewSettings) -> Self {
        CommentQuery {
            limit: settings.total_limit,
            sort: settings.sort_direction.to_string(),
            sort_by: settings.sort_field.clone(),
            auth: settings.author_filter.clone(),
        }
    }

    pub fn params(&self) -> [(&'static str, String); 4] {
        [
            ("limit", self.limit.to_string()),
            ("sort", self.sort.clone()),
            ("sortBy", self.sort_by.clone()),
            ("auth", self.auth.clone()),
        ]
    }
}

/// The comment servlet, as seen from the panel.
pub trait CommentBackend {
    fn fetch_comments(&self, query: CommentQuery) -> BackendFuture<'_, Vec<Comment>>;
    fn fetch_identity(&self) -> BackendFuture<'_, UserIdentity>;
    fn update_nickname(&self, nickname: String) -> BackendFuture<'_, ()>;
    /// Shifts the comment's counter by `delta`.
    fn vote(&self, comment_id: CommentId, delta: i64) -> BackendFuture<'_, ()>;
    fn delete_comment(&self, comment_id: CommentId) -> BackendFuture<'_, ()>;
    fn delete_all(&self) -> BackendFuture<'_, ()>;
    fn translate(&self, text: String, lang: String) -> BackendFuture<'_, String>;
}

const NOT_FOUND_BODY: &str = "comment not found";

pub struct FrontendConnection {
    client: Client,
    base: String,
    endpoints: Endpoints,
}

impl FrontendConnection {
    pub fn new(base: &str, endpoints: Endpoints) -> Self {
        FrontendConnection {
            client: Client::new(),
            base: base.trim_end_matches('/').to_owned(),
            endpoints,
        }
    }

    /// Resolves endpoints against `api_base`, or the page origin when unset.
    pub fn from_config(config: &Config) -> Result<Self, FrontendError> {
        let base = match &config.api_base {
            Some(base) => base.clone(),
            None => web_sys::window()
                .ok_or_else(|| FrontendError::missing("window"))?
                .location()
                .origin()?,
        };
        info!("using comment api at {}", base);

        Ok(Self::new(&base, config.endpoints.clone()))
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, FrontendError> {
        let url = self.url(path);
        debug!("GET {} {:?}", url, query);

        let body = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }

    async fn post_form(&self, path: &str, form: &[(&str, String)]) -> Result<String, FrontendError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let body = self
            .client
            .post(&url)
            .form(form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

fn reject_not_found(body: String) -> Result<(), FrontendError> {
    if body.trim() == NOT_FOUND_BODY {
        Err(FrontendError::Rejected(NOT_FOUND_BODY.into()))
    } else {
        Ok(())
    }
}

impl CommentBackend for FrontendConnection {
    fn fetch_comments(&self, query: CommentQuery) -> BackendFuture<'_, Vec<Comment>> {
        async move {
            let body = self
                .get_text(&self.endpoints.comments, &query.params())
                .await?;
            let comments: Vec<Comment> = serde_json::from_str(&body)?;
            debug!("got {} comments", comments.len());
            Ok(comments)
        }
        .boxed_local()
    }

    fn fetch_identity(&self) -> BackendFuture<'_, UserIdentity> {
        async move {
            let body = self.get_text(&self.endpoints.auth, &[]).await?;
            Ok(serde_json::from_str(&body)?)
        }
        .boxed_local()
    }

    fn update_nickname(&self, nickname: String) -> BackendFuture<'_, ()> {
        async move {
            self.post_form(&self.endpoints.auth, &[("nickname", nickname)])
                .await?;
            Ok(())
        }
        .boxed_local()
    }

    fn vote(&self, comment_id: CommentId, delta: i64) -> BackendFuture<'_, ()> {
        async move {
            let params = [("id", comment_id.to_string()), ("vote", delta.to_string())];
            let body = self.get_text(&self.endpoints.upvote, &params).await?;
            reject_not_found(body)
        }
        .boxed_local()
    }

    fn delete_comment(&self, comment_id: CommentId) -> BackendFuture<'_, ()> {
        async move {
            let body = self
                .get_text(&self.endpoints.delete, &[("id", comment_id.to_string())])
                .await?;
            reject_not_found(body)
        }
        .boxed_local()
    }

    fn delete_all(&self) -> BackendFuture<'_, ()> {
        async move {
            self.post_form(&self.endpoints.delete, &[]).await?;
            Ok(())
        }
        .boxed_local()
    }

    fn translate(&self, text: String, lang: String) -> BackendFuture<'_, String> {
        async move {
            let body = self
                .post_form(&self.endpoints.translate, &[("text", text), ("lang", lang)])
                .await?;
            Ok(body.trim_end().to_owned())
        }
        .boxed_local()
    }
}
