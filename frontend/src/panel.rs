//! The comment panel: view state and the controller driving it.
//!
//! `PanelState` holds everything the panel knows (cached comments, settings,
//! identity, in-flight mutations) and only changes through its methods.
//! `PanelController` wires the state to a backend, a view and a cookie jar.
//! It runs on the page's single event loop; no `RefCell` borrow is held across
//! an `.await`.

use std::cell::{Ref, RefCell};

use log::{debug, info, warn};
use thiserror::Error;

use crate::comment::{Comment, CommentId, UserIdentity, VoteDirection};
use crate::connection::{CommentBackend, CommentQuery};
use crate::cookies::{load_settings, persist_settings, CookieJar};
use crate::error::FrontendError;
use crate::events::UiEvent;
use crate::mutation::{Mutation, MutationId, MutationLedger};
use crate::pagination::Pagination;
use crate::render::PanelView;
use crate::settings::{reduce, SettingsEffect, SettingsMessage, ViewSettings};

pub const LOADING_PLACEHOLDER: &str = "Loading...";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionRefused {
    #[error("Please log in to {0}.")]
    LoginRequired(&'static str),
    #[error("comment {0} is not on the current page")]
    NotOnPage(CommentId),
    #[error("only the author can delete comment {0}")]
    NotAuthor(CommentId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentRow {
    pub comment: Comment,
    pub user_vote: i8,
    pub can_delete: bool,
}

/// What the list shows for the current page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageSnapshot {
    pub rows: Vec<CommentRow>,
    pub pagination: Pagination,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub query: CommentQuery,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteTicket {
    pub mutation: MutationId,
    pub comment_id: CommentId,
    pub delta: i64,
    pub upvotes: i64,
    pub user_vote: i8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteTicket {
    pub mutation: MutationId,
    pub comment_id: CommentId,
}

/// UI to restore after a mutation failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reverted {
    Vote {
        comment_id: CommentId,
        on_page: bool,
        upvotes: i64,
        user_vote: i8,
    },
    Delete {
        comment_id: CommentId,
    },
    DeleteAll,
    /// The optimistic change was already overwritten by fresher data.
    Superseded,
}

#[derive(Debug)]
pub struct PanelState {
    comments: Vec<Comment>,
    settings: ViewSettings,
    identity: UserIdentity,
    ledger: MutationLedger,
    latest_fetch: u64,
}

impl PanelState {
    pub fn new(settings: ViewSettings) -> Self {
        PanelState {
            comments: Vec::new(),
            settings: settings.normalized(0),
            identity: UserIdentity::default(),
            ledger: MutationLedger::new(),
            latest_fetch: 0,
        }
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn set_identity(&mut self, identity: UserIdentity) {
        self.identity = identity;
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn ledger(&self) -> &MutationLedger {
        &self.ledger
    }

    /// Cached comments minus those with a delete in flight.
    fn shown(&self) -> Vec<&Comment> {
        self.comments
            .iter()
            .filter(|comment| !self.ledger.is_deleting(comment.id))
            .collect()
    }

    fn shown_len(&self) -> usize {
        self.shown().len()
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(
            self.shown_len(),
            self.settings.total_limit,
            self.settings.page_size,
            self.settings.current_page,
        )
    }

    pub fn page(&self) -> PageSnapshot {
        let pagination = self.pagination();
        let user_id = self.identity.user_id();

        let rows = self.shown()[pagination.range.clone()]
            .iter()
            .map(|&comment| CommentRow {
                comment: comment.clone(),
                user_vote: user_id.map(|user| comment.vote_of(user)).unwrap_or(0),
                can_delete: self.identity.is_author_of(comment),
            })
            .collect();

        PageSnapshot { rows, pagination }
    }

    /// Position of a comment among the rows of the current page.
    pub fn visible_index(&self, comment_id: CommentId) -> Option<usize> {
        let range = self.pagination().range;
        self.shown()[range]
            .iter()
            .position(|comment| comment.id == comment_id)
    }

    pub fn apply(&mut self, message: SettingsMessage) -> SettingsEffect {
        let (settings, effect) = reduce(&self.settings, message, self.shown_len());
        self.settings = settings;
        effect
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.latest_fetch += 1;
        FetchTicket {
            generation: self.latest_fetch,
            query: CommentQuery::from_settings(&self.settings),
        }
    }

    /// Replaces the cache with a fetched list. Returns false, leaving the
    /// state untouched, when a newer fetch was issued in the meantime.
    pub fn finish_fetch(&mut self, generation: u64, comments: Vec<Comment>) -> bool {
        if generation < self.latest_fetch {
            return false;
        }

        let ledger = &self.ledger;
        self.comments = comments
            .into_iter()
            .filter(|comment| !ledger.is_deleting(comment.id))
            .collect();
        self.ledger.settle();
        self.settings = self.settings.clone().normalized(self.comments.len());
        true
    }

    pub fn begin_vote(
        &mut self,
        comment_id: CommentId,
        direction: VoteDirection,
    ) -> Result<VoteTicket, ActionRefused> {
        let user_id = self
            .identity
            .user_id()
            .ok_or(ActionRefused::LoginRequired("vote"))?
            .to_owned();
        if self.visible_index(comment_id).is_none() {
            return Err(ActionRefused::NotOnPage(comment_id));
        }

        let comment = self
            .comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
            .ok_or(ActionRefused::NotOnPage(comment_id))?;

        let previous_vote = comment.vote_of(&user_id);
        let new_vote = direction.next_vote(previous_vote);
        let mutation = Mutation::Vote {
            comment_id,
            user_id: user_id.clone(),
            previous_vote,
            new_vote,
        };
        let delta = mutation.vote_delta();

        comment.upvote_count += delta;
        comment.set_vote(&user_id, new_vote);
        let upvotes = comment.upvote_count;

        Ok(VoteTicket {
            mutation: self.ledger.record(mutation),
            comment_id,
            delta,
            upvotes,
            user_vote: new_vote,
        })
    }

    pub fn begin_delete(&mut self, comment_id: CommentId) -> Result<DeleteTicket, ActionRefused> {
        if !self.identity.logged_in {
            return Err(ActionRefused::LoginRequired("delete comments"));
        }
        if self.visible_index(comment_id).is_none() {
            return Err(ActionRefused::NotOnPage(comment_id));
        }
        let authored = self
            .comments
            .iter()
            .any(|comment| comment.id == comment_id && self.identity.is_author_of(comment));
        if !authored {
            return Err(ActionRefused::NotAuthor(comment_id));
        }

        Ok(DeleteTicket {
            mutation: self.ledger.record(Mutation::Delete { comment_id }),
            comment_id,
        })
    }

    pub fn begin_delete_all(&mut self) -> Result<MutationId, ActionRefused> {
        if !self.identity.logged_in {
            return Err(ActionRefused::LoginRequired("delete comments"));
        }

        let removed = std::mem::take(&mut self.comments);
        self.settings = self.settings.clone().normalized(0);
        Ok(self.ledger.record(Mutation::DeleteAll { removed }))
    }

    /// Marks a mutation as accepted by the server.
    pub fn confirm(&mut self, id: MutationId) {
        if let Some(Mutation::Delete { comment_id }) = self.ledger.get(id).cloned() {
            self.comments.retain(|comment| comment.id != comment_id);
        }
        self.ledger.confirm(id);
        self.settings = self.settings.clone().normalized(self.shown_len());
    }

    /// Undoes the optimistic part of a failed mutation.
    pub fn revert(&mut self, id: MutationId) -> Option<Reverted> {
        let mutation = self.ledger.take(id)?;

        let reverted = match mutation {
            Mutation::Vote {
                comment_id,
                user_id,
                previous_vote,
                new_vote,
            } => {
                let delta = i64::from(new_vote) - i64::from(previous_vote);
                let on_page = self.visible_index(comment_id).is_some();
                match self.comments.iter_mut().find(|comment| comment.id == comment_id) {
                    Some(comment) if comment.vote_of(&user_id) == new_vote => {
                        comment.upvote_count -= delta;
                        comment.set_vote(&user_id, previous_vote);
                        Reverted::Vote {
                            comment_id,
                            on_page,
                            upvotes: comment.upvote_count,
                            user_vote: previous_vote,
                        }
                    }
                    _ => Reverted::Superseded,
                }
            }
            Mutation::Delete { comment_id } => {
                self.settings = self.settings.clone().normalized(self.shown_len());
                Reverted::Delete { comment_id }
            }
            Mutation::DeleteAll { removed } => {
                if self.comments.is_empty() {
                    self.comments = removed;
                    self.settings = self.settings.clone().normalized(self.shown_len());
                    Reverted::DeleteAll
                } else {
                    Reverted::Superseded
                }
            }
        };

        Some(reverted)
    }
}

pub struct PanelController<B, V, C> {
    state: RefCell<PanelState>,
    backend: B,
    view: V,
    cookies: C,
}

impl<B, V, C> PanelController<B, V, C>
where
    B: CommentBackend,
    V: PanelView,
    C: CookieJar,
{
    /// Settings start from `defaults` overlaid with whatever the cookies hold.
    pub fn new(backend: B, view: V, cookies: C, defaults: ViewSettings) -> Self {
        let settings = load_settings(&cookies, defaults);
        debug!("initial settings {:?}", settings);

        PanelController {
            state: RefCell::new(PanelState::new(settings)),
            backend,
            view,
            cookies,
        }
    }

    pub fn state(&self) -> Ref<'_, PanelState> {
        self.state.borrow()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// First render: controls, identity, then the comment list.
    pub async fn start(&self) {
        let settings = self.state.borrow().settings().clone();
        log_failure("render controls", self.view.render_controls(&settings));

        self.load_identity().await;
        self.refresh().await;
    }

    pub async fn handle(&self, event: UiEvent) {
        debug!("ui event {:?}", event);

        match event {
            UiEvent::Settings(message) => self.change_settings(message).await,
            UiEvent::Vote {
                comment_id,
                direction,
            } => self.vote(comment_id, direction).await,
            UiEvent::Delete { comment_id } => self.delete(comment_id).await,
            UiEvent::DeleteAll => self.delete_all().await,
            UiEvent::Translate { index, lang } => self.translate(index, lang).await,
            UiEvent::Nickname(nickname) => self.set_nickname(nickname).await,
        }
    }

    pub async fn load_identity(&self) {
        match self.backend.fetch_identity().await {
            Ok(identity) => {
                info!("logged in: {}", identity.logged_in);
                log_failure("render identity", self.view.render_identity(&identity));
                self.state.borrow_mut().set_identity(identity);
            }
            Err(err) => warn!("could not load identity: {}", err),
        }
    }

    /// Fetches the list for the current settings and renders it.
    pub async fn refresh(&self) {
        let ticket = self.state.borrow_mut().begin_fetch();

        match self.backend.fetch_comments(ticket.query).await {
            Ok(comments) => {
                let fresh = self
                    .state
                    .borrow_mut()
                    .finish_fetch(ticket.generation, comments);
                if fresh {
                    self.render_page();
                } else {
                    debug!("dropping stale comment list #{}", ticket.generation);
                }
            }
            Err(err) => warn!("could not load comments: {}", err),
        }
    }

    pub async fn change_settings(&self, message: SettingsMessage) {
        let effect = self.state.borrow_mut().apply(message);
        if effect == SettingsEffect::None {
            return;
        }

        let settings = self.state.borrow().settings().clone();
        if effect.persists() {
            log_failure("persist settings", persist_settings(&self.cookies, &settings));
            log_failure("render controls", self.view.render_controls(&settings));
        }

        if effect.refetches() {
            self.refresh().await;
        } else {
            self.render_page();
        }
    }

    pub async fn vote(&self, comment_id: CommentId, direction: VoteDirection) {
        let ticket = match self.state.borrow_mut().begin_vote(comment_id, direction) {
            Ok(ticket) => ticket,
            Err(refused) => return self.refuse(refused),
        };
        log_failure(
            "show vote",
            self.view.set_vote(comment_id, ticket.upvotes, ticket.user_vote),
        );

        match self.backend.vote(comment_id, ticket.delta).await {
            Ok(()) => {
                self.state.borrow_mut().confirm(ticket.mutation);
                self.refresh().await;
            }
            Err(err) => {
                warn!("vote on comment {} failed: {}", comment_id, err);
                self.undo(ticket.mutation);
            }
        }
    }

    pub async fn delete(&self, comment_id: CommentId) {
        let ticket = match self.state.borrow_mut().begin_delete(comment_id) {
            Ok(ticket) => ticket,
            Err(refused) => return self.refuse(refused),
        };
        log_failure("hide comment", self.view.set_comment_hidden(comment_id, true));

        match self.backend.delete_comment(comment_id).await {
            Ok(()) => {
                self.state.borrow_mut().confirm(ticket.mutation);
                self.refresh().await;
            }
            Err(err) => {
                warn!("delete of comment {} failed: {}", comment_id, err);
                self.undo(ticket.mutation);
            }
        }
    }

    pub async fn delete_all(&self) {
        let mutation = match self.state.borrow_mut().begin_delete_all() {
            Ok(mutation) => mutation,
            Err(refused) => return self.refuse(refused),
        };
        self.render_page();

        match self.backend.delete_all().await {
            Ok(()) => {
                self.state.borrow_mut().confirm(mutation);
                self.refresh().await;
            }
            Err(err) => {
                warn!("delete all failed: {}", err);
                self.undo(mutation);
            }
        }
    }

    /// Translates whatever the comment at `index` currently shows.
    pub async fn translate(&self, index: usize, lang: String) {
        if lang.is_empty() {
            return;
        }
        let shown = match self.view.comment_text(index) {
            Ok(text) => text,
            Err(err) => return warn!("nothing to translate at {}: {}", index, err),
        };
        log_failure(
            "show placeholder",
            self.view.set_comment_text(index, LOADING_PLACEHOLDER),
        );

        let text = match self.backend.translate(shown.clone(), lang.clone()).await {
            Ok(translated) => translated,
            Err(err) => {
                warn!("translation to {} failed: {}", lang, err);
                shown
            }
        };
        log_failure("show translation", self.view.set_comment_text(index, &text));
    }

    pub async fn set_nickname(&self, nickname: String) {
        if !self.state.borrow().identity().logged_in {
            return self.refuse(ActionRefused::LoginRequired("set a nickname"));
        }
        let nickname = nickname.trim().to_owned();
        if nickname.is_empty() {
            return;
        }

        match self.backend.update_nickname(nickname).await {
            Ok(()) => {
                self.load_identity().await;
                self.refresh().await;
            }
            Err(err) => warn!("could not update nickname: {}", err),
        }
    }

    fn render_page(&self) {
        let page = self.state.borrow().page();
        log_failure("render comments", self.view.render_comments(&page));
    }

    fn refuse(&self, refused: ActionRefused) {
        match refused {
            ActionRefused::LoginRequired(_) => self.view.alert(&refused.to_string()),
            other => warn!("{}", other),
        }
    }

    fn undo(&self, mutation: MutationId) {
        let reverted = self.state.borrow_mut().revert(mutation);

        match reverted {
            Some(Reverted::Vote {
                comment_id,
                on_page: true,
                upvotes,
                user_vote,
            }) => log_failure("restore vote", self.view.set_vote(comment_id, upvotes, user_vote)),
            // the row is gone when the page was redrawn while the delete ran
            Some(Reverted::Delete { comment_id }) => {
                if let Err(err) = self.view.set_comment_hidden(comment_id, false) {
                    debug!("redrawing page to show comment {}: {}", comment_id, err);
                    self.render_page();
                }
            }
            Some(Reverted::DeleteAll) => self.render_page(),
            _ => {}
        }
    }
}

fn log_failure(what: &str, result: Result<(), FrontendError>) {
    if let Err(err) = result {
        warn!("{} failed: {}", what, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::BTreeMap;

    use futures_util::future::{ready, FutureExt};

    use crate::connection::BackendFuture;
    use crate::cookies::{MemoryCookies, SORT_DIR_COOKIE};
    use crate::settings::SortDirection;

    fn comment(id: CommentId, author: &str) -> Comment {
        Comment {
            id,
            content: format!("comment {}", id),
            timestamp_millis: 1_600_000_000_000 + id,
            upvote_count: 0,
            author_id: author.into(),
            display_name: String::new(),
            per_user_vote: BTreeMap::new(),
        }
    }

    fn comments(count: i64) -> Vec<Comment> {
        (0..count).map(|id| comment(id, "ann@example.com")).collect()
    }

    fn ann() -> UserIdentity {
        UserIdentity {
            logged_in: true,
            email: Some("ann@example.com".into()),
            display_name: Some("Ann".into()),
            login_url: "/logout".into(),
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        comments: RefCell<Vec<Comment>>,
        identity: RefCell<UserIdentity>,
        fail_mutations: Cell<bool>,
        hold_mutations: Cell<bool>,
        queries: RefCell<Vec<CommentQuery>>,
        votes: RefCell<Vec<(CommentId, i64)>>,
        deleted: RefCell<Vec<CommentId>>,
        nicknames: RefCell<Vec<String>>,
        translations: RefCell<Vec<(String, String)>>,
    }

    impl FakeBackend {
        fn with(comments: Vec<Comment>, identity: UserIdentity) -> Self {
            let backend = FakeBackend::default();
            *backend.comments.borrow_mut() = comments;
            *backend.identity.borrow_mut() = identity;
            backend
        }

        fn outcome(&self) -> Result<(), FrontendError> {
            if self.fail_mutations.get() {
                Err(FrontendError::Rejected("offline".into()))
            } else {
                Ok(())
            }
        }

        /// Resolves after yielding once when mutations are held, so other
        /// handlers get to run while the request is in flight.
        fn respond<'a, T: 'a>(&self, outcome: Result<T, FrontendError>) -> BackendFuture<'a, T> {
            if self.hold_mutations.get() {
                async move {
                    tokio::task::yield_now().await;
                    outcome
                }
                .boxed_local()
            } else {
                ready(outcome).boxed_local()
            }
        }
    }

    impl CommentBackend for FakeBackend {
        fn fetch_comments(&self, query: CommentQuery) -> BackendFuture<'_, Vec<Comment>> {
            let limit = query.limit;
            self.queries.borrow_mut().push(query);
            let list = self.comments.borrow().iter().take(limit).cloned().collect();
            ready(Ok(list)).boxed_local()
        }

        fn fetch_identity(&self) -> BackendFuture<'_, UserIdentity> {
            ready(Ok(self.identity.borrow().clone())).boxed_local()
        }

        fn update_nickname(&self, nickname: String) -> BackendFuture<'_, ()> {
            self.nicknames.borrow_mut().push(nickname.clone());
            if let Some(email) = self.identity.borrow().email.clone() {
                for comment in self.comments.borrow_mut().iter_mut() {
                    if comment.author_id == email {
                        comment.display_name = nickname.clone();
                    }
                }
            }
            self.identity.borrow_mut().display_name = Some(nickname);
            ready(Ok(())).boxed_local()
        }

        fn vote(&self, comment_id: CommentId, delta: i64) -> BackendFuture<'_, ()> {
            self.votes.borrow_mut().push((comment_id, delta));
            let outcome = self.outcome();
            if outcome.is_ok() {
                let user = self.identity.borrow().email.clone().unwrap_or_default();
                for comment in self.comments.borrow_mut().iter_mut() {
                    if comment.id == comment_id {
                        let vote = comment.vote_of(&user) as i64 + delta;
                        comment.upvote_count += delta;
                        comment.set_vote(&user, vote as i8);
                    }
                }
            }
            ready(outcome).boxed_local()
        }

        fn delete_comment(&self, comment_id: CommentId) -> BackendFuture<'_, ()> {
            self.deleted.borrow_mut().push(comment_id);
            let outcome = self.outcome();
            if outcome.is_ok() {
                self.comments.borrow_mut().retain(|comment| comment.id != comment_id);
            }
            self.respond(outcome)
        }

        fn delete_all(&self) -> BackendFuture<'_, ()> {
            let outcome = self.outcome();
            if outcome.is_ok() {
                self.comments.borrow_mut().clear();
            }
            ready(outcome).boxed_local()
        }

        fn translate(&self, text: String, lang: String) -> BackendFuture<'_, String> {
            self.translations.borrow_mut().push((text.clone(), lang.clone()));
            let outcome = self.outcome().map(|()| format!("[{}] {}", lang, text));
            ready(outcome).boxed_local()
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Drawn {
        Controls(ViewSettings),
        Identity(bool),
        Page(Vec<CommentId>, usize),
        Hidden(CommentId, bool),
        Vote(CommentId, i64, i8),
        Text(usize, String),
        Alert(String),
    }

    #[derive(Default)]
    struct RecordingView {
        drawn: RefCell<Vec<Drawn>>,
        rows: RefCell<Vec<CommentId>>,
        texts: RefCell<BTreeMap<usize, String>>,
    }

    impl RecordingView {
        fn take(&self) -> Vec<Drawn> {
            std::mem::take(&mut *self.drawn.borrow_mut())
        }

        fn has_row(&self, comment_id: CommentId) -> Result<(), FrontendError> {
            if self.rows.borrow().contains(&comment_id) {
                Ok(())
            } else {
                Err(FrontendError::missing(format!("row of comment {}", comment_id)))
            }
        }
    }

    impl PanelView for RecordingView {
        fn render_controls(&self, settings: &ViewSettings) -> Result<(), FrontendError> {
            self.drawn.borrow_mut().push(Drawn::Controls(settings.clone()));
            Ok(())
        }

        fn render_identity(&self, identity: &UserIdentity) -> Result<(), FrontendError> {
            self.drawn.borrow_mut().push(Drawn::Identity(identity.logged_in));
            Ok(())
        }

        fn render_comments(&self, page: &PageSnapshot) -> Result<(), FrontendError> {
            let mut texts = self.texts.borrow_mut();
            texts.clear();
            for (index, row) in page.rows.iter().enumerate() {
                texts.insert(index, row.comment.content.clone());
            }
            let ids: Vec<CommentId> = page.rows.iter().map(|row| row.comment.id).collect();
            *self.rows.borrow_mut() = ids.clone();
            self.drawn
                .borrow_mut()
                .push(Drawn::Page(ids, page.pagination.current_page));
            Ok(())
        }

        fn set_comment_hidden(&self, comment_id: CommentId, hidden: bool) -> Result<(), FrontendError> {
            self.has_row(comment_id)?;
            self.drawn.borrow_mut().push(Drawn::Hidden(comment_id, hidden));
            Ok(())
        }

        fn set_vote(&self, comment_id: CommentId, upvotes: i64, user_vote: i8) -> Result<(), FrontendError> {
            self.has_row(comment_id)?;
            self.drawn.borrow_mut().push(Drawn::Vote(comment_id, upvotes, user_vote));
            Ok(())
        }

        fn comment_text(&self, index: usize) -> Result<String, FrontendError> {
            self.texts
                .borrow()
                .get(&index)
                .cloned()
                .ok_or_else(|| FrontendError::missing(format!("comment {}", index)))
        }

        fn set_comment_text(&self, index: usize, text: &str) -> Result<(), FrontendError> {
            self.texts.borrow_mut().insert(index, text.to_owned());
            self.drawn.borrow_mut().push(Drawn::Text(index, text.to_owned()));
            Ok(())
        }

        fn alert(&self, message: &str) {
            self.drawn.borrow_mut().push(Drawn::Alert(message.to_owned()));
        }
    }

    type TestController = PanelController<FakeBackend, RecordingView, MemoryCookies>;

    async fn started(comments: Vec<Comment>, identity: UserIdentity) -> TestController {
        let _ = env_logger::builder().is_test(true).try_init();

        let controller = PanelController::new(
            FakeBackend::with(comments, identity),
            RecordingView::default(),
            MemoryCookies::new(),
            ViewSettings::default(),
        );
        controller.start().await;
        controller.view().take();
        controller
    }

    #[test]
    fn page_shows_the_current_slice() {
        let mut state = PanelState::new(ViewSettings {
            page_size: 5,
            total_limit: 15,
            ..ViewSettings::default()
        });
        let ticket = state.begin_fetch();
        assert!(state.finish_fetch(ticket.generation, comments(15)));

        let ids = |state: &PanelState| -> Vec<CommentId> {
            state.page().rows.iter().map(|row| row.comment.id).collect()
        };
        assert_eq!(ids(&state), vec![0, 1, 2, 3, 4]);

        state.apply(SettingsMessage::NextPage);
        state.apply(SettingsMessage::NextPage);
        assert_eq!(ids(&state), vec![10, 11, 12, 13, 14]);

        assert_eq!(state.apply(SettingsMessage::NextPage), SettingsEffect::None);
        assert_eq!(state.settings().current_page, 3);
        assert_eq!(state.visible_index(12), Some(2));
        assert_eq!(state.visible_index(3), None);
    }

    #[test]
    fn stale_fetch_is_ignored() {
        let mut state = PanelState::new(ViewSettings::default());
        let first = state.begin_fetch();
        let second = state.begin_fetch();

        assert!(state.finish_fetch(second.generation, comments(2)));
        assert!(!state.finish_fetch(first.generation, comments(7)));
        assert_eq!(state.comments().len(), 2);
    }

    #[test]
    fn shrinking_list_clamps_page() {
        let mut state = PanelState::new(ViewSettings {
            page_size: 2,
            ..ViewSettings::default()
        });
        let ticket = state.begin_fetch();
        state.finish_fetch(ticket.generation, comments(10));
        for _ in 0..4 {
            state.apply(SettingsMessage::NextPage);
        }
        assert_eq!(state.settings().current_page, 5);

        let ticket = state.begin_fetch();
        state.finish_fetch(ticket.generation, comments(3));
        assert_eq!(state.settings().current_page, 2);
    }

    #[test]
    fn voting_requires_login() {
        let mut state = PanelState::new(ViewSettings::default());
        let ticket = state.begin_fetch();
        state.finish_fetch(ticket.generation, comments(1));

        assert_eq!(
            state.begin_vote(0, VoteDirection::Up),
            Err(ActionRefused::LoginRequired("vote"))
        );
    }

    #[test]
    fn failed_vote_reverts_counter() {
        let mut state = PanelState::new(ViewSettings::default());
        state.set_identity(ann());
        let ticket = state.begin_fetch();
        let mut list = comments(1);
        list[0].upvote_count = 3;
        state.finish_fetch(ticket.generation, list);

        let vote = state.begin_vote(0, VoteDirection::Down).unwrap();
        assert_eq!((vote.upvotes, vote.user_vote, vote.delta), (2, -1, -1));

        assert_eq!(
            state.revert(vote.mutation),
            Some(Reverted::Vote {
                comment_id: 0,
                on_page: true,
                upvotes: 3,
                user_vote: 0
            })
        );
        assert_eq!(state.comments()[0].upvote_count, 3);
        assert!(state.ledger().is_empty());
    }

    #[test]
    fn delete_needs_authorship() {
        let mut state = PanelState::new(ViewSettings::default());
        state.set_identity(ann());
        let ticket = state.begin_fetch();
        state.finish_fetch(
            ticket.generation,
            vec![comment(1, "ann@example.com"), comment(2, "bob@example.com")],
        );

        assert_eq!(state.begin_delete(2), Err(ActionRefused::NotAuthor(2)));
        let delete = state.begin_delete(1).unwrap();
        assert_eq!(delete.comment_id, 1);
        assert_eq!(state.begin_delete(1), Err(ActionRefused::NotOnPage(1)));

        // a list fetched while the delete is in flight does not bring it back
        let ticket = state.begin_fetch();
        state.finish_fetch(
            ticket.generation,
            vec![comment(1, "ann@example.com"), comment(2, "bob@example.com")],
        );
        assert_eq!(state.comments().len(), 1);
    }

    #[test]
    fn pending_delete_stays_off_every_page() {
        let mut state = PanelState::new(ViewSettings {
            page_size: 2,
            ..ViewSettings::default()
        });
        state.set_identity(ann());
        let ticket = state.begin_fetch();
        state.finish_fetch(ticket.generation, comments(4));

        let ids = |state: &PanelState| -> Vec<CommentId> {
            state.page().rows.iter().map(|row| row.comment.id).collect()
        };
        let delete = state.begin_delete(1).unwrap();
        assert_eq!(ids(&state), vec![0, 2]);

        state.apply(SettingsMessage::NextPage);
        assert_eq!(ids(&state), vec![3]);
        assert_eq!(state.apply(SettingsMessage::NextPage), SettingsEffect::None);
        state.apply(SettingsMessage::PreviousPage);
        assert_eq!(ids(&state), vec![0, 2]);
        assert_eq!(state.visible_index(2), Some(1));

        assert_eq!(
            state.revert(delete.mutation),
            Some(Reverted::Delete { comment_id: 1 })
        );
        assert_eq!(ids(&state), vec![0, 1]);
        assert_eq!(state.pagination().max_page, 2);
    }

    #[tokio::test]
    async fn start_renders_controls_identity_and_first_page() {
        let _ = env_logger::builder().is_test(true).try_init();
        let controller = PanelController::new(
            FakeBackend::with(comments(8), ann()),
            RecordingView::default(),
            MemoryCookies::new(),
            ViewSettings::default(),
        );
        controller.start().await;

        assert_eq!(
            controller.view().take(),
            vec![
                Drawn::Controls(ViewSettings::default()),
                Drawn::Identity(true),
                Drawn::Page(vec![0, 1, 2, 3, 4], 1),
            ]
        );
        assert_eq!(
            controller.backend().queries.borrow()[0],
            CommentQuery {
                limit: 20,
                sort: "descending".into(),
                sort_by: "timestamp".into(),
                auth: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn sort_change_persists_and_refetches() {
        let controller = started(comments(3), ann()).await;

        controller
            .handle(UiEvent::Settings(SettingsMessage::SortDirectionChanged(
                SortDirection::Ascending,
            )))
            .await;

        assert_eq!(
            controller.cookies.get(SORT_DIR_COOKIE).as_deref(),
            Some("ascending")
        );
        let queries = controller.backend().queries.borrow();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].sort, "ascending");
    }

    #[test]
    fn cookies_seed_the_next_load() {
        let cookies = MemoryCookies::new();
        cookies.set_cookie(SORT_DIR_COOKIE, "ascending").unwrap();
        cookies.set_cookie("numElemsPerPage", "2").unwrap();

        let controller = PanelController::new(
            FakeBackend::with(comments(5), UserIdentity::default()),
            RecordingView::default(),
            cookies,
            ViewSettings::default(),
        );

        assert_eq!(
            controller.state().settings().sort_direction,
            SortDirection::Ascending
        );
        assert_eq!(controller.state().settings().page_size, 2);
    }

    #[tokio::test]
    async fn paging_rerenders_without_fetching() {
        let controller = started(comments(8), ann()).await;

        controller
            .handle(UiEvent::Settings(SettingsMessage::NextPage))
            .await;
        controller
            .handle(UiEvent::Settings(SettingsMessage::NextPage))
            .await;

        assert_eq!(
            controller.view().take(),
            vec![Drawn::Page(vec![5, 6, 7], 2)]
        );
        assert_eq!(controller.backend().queries.borrow().len(), 1);
    }

    #[tokio::test]
    async fn vote_updates_counter_then_refreshes() {
        let controller = started(comments(2), ann()).await;

        controller
            .handle(UiEvent::Vote {
                comment_id: 1,
                direction: VoteDirection::Up,
            })
            .await;

        assert_eq!(
            controller.view().take(),
            vec![Drawn::Vote(1, 1, 1), Drawn::Page(vec![0, 1], 1)]
        );
        assert_eq!(*controller.backend().votes.borrow(), vec![(1, 1)]);
        assert_eq!(controller.state().comments()[1].upvote_count, 1);
        assert!(controller.state().ledger().is_empty());

        // pressing up again withdraws the vote
        controller
            .handle(UiEvent::Vote {
                comment_id: 1,
                direction: VoteDirection::Up,
            })
            .await;
        assert_eq!(controller.view().take()[0], Drawn::Vote(1, 0, 0));
        assert_eq!(controller.backend().votes.borrow()[1], (1, -1));
    }

    #[tokio::test]
    async fn logged_out_vote_alerts() {
        let controller = started(comments(2), UserIdentity::default()).await;

        controller
            .handle(UiEvent::Vote {
                comment_id: 0,
                direction: VoteDirection::Up,
            })
            .await;

        assert_eq!(
            controller.view().take(),
            vec![Drawn::Alert("Please log in to vote.".into())]
        );
        assert!(controller.backend().votes.borrow().is_empty());
    }

    #[tokio::test]
    async fn failed_vote_restores_counter() {
        let controller = started(comments(2), ann()).await;
        controller.backend().fail_mutations.set(true);

        controller
            .handle(UiEvent::Vote {
                comment_id: 0,
                direction: VoteDirection::Down,
            })
            .await;

        assert_eq!(
            controller.view().take(),
            vec![Drawn::Vote(0, -1, -1), Drawn::Vote(0, 0, 0)]
        );
        assert_eq!(controller.state().comments()[0].upvote_count, 0);
    }

    #[tokio::test]
    async fn delete_hides_row_before_refresh() {
        let controller = started(comments(3), ann()).await;

        controller.handle(UiEvent::Delete { comment_id: 1 }).await;

        assert_eq!(
            controller.view().take(),
            vec![Drawn::Hidden(1, true), Drawn::Page(vec![0, 2], 1)]
        );
        assert_eq!(*controller.backend().deleted.borrow(), vec![1]);
    }

    #[tokio::test]
    async fn failed_delete_shows_row_again() {
        let controller = started(comments(3), ann()).await;
        controller.backend().fail_mutations.set(true);

        controller.handle(UiEvent::Delete { comment_id: 2 }).await;

        assert_eq!(
            controller.view().take(),
            vec![Drawn::Hidden(2, true), Drawn::Hidden(2, false)]
        );
        assert_eq!(controller.state().comments().len(), 3);
        assert!(controller.state().ledger().is_empty());
    }

    #[tokio::test]
    async fn paging_during_a_failed_delete_redraws_the_comment() {
        let _ = env_logger::builder().is_test(true).try_init();
        let controller = PanelController::new(
            FakeBackend::with(comments(4), ann()),
            RecordingView::default(),
            MemoryCookies::new(),
            ViewSettings {
                page_size: 2,
                ..ViewSettings::default()
            },
        );
        controller.start().await;
        controller.view().take();
        controller.backend().fail_mutations.set(true);
        controller.backend().hold_mutations.set(true);

        futures_util::join!(
            controller.handle(UiEvent::Delete { comment_id: 1 }),
            async {
                controller
                    .handle(UiEvent::Settings(SettingsMessage::NextPage))
                    .await;
                controller
                    .handle(UiEvent::Settings(SettingsMessage::PreviousPage))
                    .await;
            }
        );

        assert_eq!(
            controller.view().take(),
            vec![
                Drawn::Hidden(1, true),
                Drawn::Page(vec![3], 2),
                Drawn::Page(vec![0, 2], 1),
                Drawn::Page(vec![0, 1], 1),
            ]
        );
        assert!(controller.state().ledger().is_empty());
    }

    #[tokio::test]
    async fn delete_all_clears_and_refetches() {
        let controller = started(comments(3), ann()).await;

        controller.handle(UiEvent::DeleteAll).await;

        assert_eq!(
            controller.view().take(),
            vec![Drawn::Page(vec![], 1), Drawn::Page(vec![], 1)]
        );
        assert!(controller.state().comments().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_all_restores_list() {
        let controller = started(comments(3), ann()).await;
        controller.backend().fail_mutations.set(true);

        controller.handle(UiEvent::DeleteAll).await;

        assert_eq!(
            controller.view().take(),
            vec![Drawn::Page(vec![], 1), Drawn::Page(vec![0, 1, 2], 1)]
        );
    }

    #[tokio::test]
    async fn translate_shows_placeholder_then_result() {
        let controller = started(comments(2), UserIdentity::default()).await;

        controller
            .handle(UiEvent::Translate {
                index: 1,
                lang: "es".into(),
            })
            .await;

        assert_eq!(
            controller.view().take(),
            vec![
                Drawn::Text(1, LOADING_PLACEHOLDER.into()),
                Drawn::Text(1, "[es] comment 1".into()),
            ]
        );
        assert_eq!(
            *controller.backend().translations.borrow(),
            vec![("comment 1".to_string(), "es".to_string())]
        );
    }

    #[tokio::test]
    async fn failed_translation_restores_text() {
        let controller = started(comments(1), UserIdentity::default()).await;
        controller.backend().fail_mutations.set(true);

        controller
            .handle(UiEvent::Translate {
                index: 0,
                lang: "fr".into(),
            })
            .await;

        assert_eq!(
            controller.view().take(),
            vec![
                Drawn::Text(0, LOADING_PLACEHOLDER.into()),
                Drawn::Text(0, "comment 0".into()),
            ]
        );
    }

    #[tokio::test]
    async fn nickname_updates_identity_and_list() {
        let controller = started(comments(1), ann()).await;

        controller
            .handle(UiEvent::Nickname("  Annie ".into()))
            .await;

        assert_eq!(*controller.backend().nicknames.borrow(), vec!["Annie"]);
        assert_eq!(controller.state().identity().label(), "Annie");
        assert_eq!(controller.state().comments()[0].author_label(), "Annie");
    }

    #[tokio::test]
    async fn logged_out_nickname_alerts() {
        let controller = started(comments(1), UserIdentity::default()).await;

        controller.handle(UiEvent::Nickname("Annie".into())).await;

        assert_eq!(
            controller.view().take(),
            vec![Drawn::Alert("Please log in to set a nickname.".into())]
        );
        assert!(controller.backend().nicknames.borrow().is_empty());
    }
}
