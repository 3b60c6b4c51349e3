use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlSelectElement};

use crate::comment::{vote_counter_text, CommentId, UserIdentity};
use crate::config::{Config, Language};
use crate::error::FrontendError;
use crate::events::{ACTION_ATTR, COMMENT_ID_ATTR, INDEX_ATTR};
use crate::panel::{CommentRow, PageSnapshot};
use crate::settings::{SortDirection, ViewSettings};

pub const NICKNAME_INPUT_ROLE: &str = "nickname-input";
pub const VOTED_CLASS: &str = "voted";

/// Everything the controller needs to show. Row indices count from the top of
/// the current page as last rendered; hiding a row does not shift them.
pub trait PanelView {
    fn render_controls(&self, settings: &ViewSettings) -> Result<(), FrontendError>;
    fn render_identity(&self, identity: &UserIdentity) -> Result<(), FrontendError>;
    fn render_comments(&self, page: &PageSnapshot) -> Result<(), FrontendError>;
    fn set_comment_hidden(&self, comment_id: CommentId, hidden: bool) -> Result<(), FrontendError>;
    fn set_vote(&self, comment_id: CommentId, upvotes: i64, user_vote: i8) -> Result<(), FrontendError>;
    fn comment_text(&self, index: usize) -> Result<String, FrontendError>;
    fn set_comment_text(&self, index: usize, text: &str) -> Result<(), FrontendError>;
    fn alert(&self, message: &str);
}

pub struct DomView {
    document: Document,
    root: Element,
    status: Element,
    account: Element,
    controls: Element,
    list: Element,
    page_label: Element,
    previous_page: Element,
    next_page: Element,
    sort_fields: Vec<String>,
    languages: Vec<Language>,
}

fn create(document: &Document, tag: &str, class: &str) -> Result<Element, FrontendError> {
    let element = document.create_element(tag)?;
    if !class.is_empty() {
        element.set_class_name(class);
    }
    Ok(element)
}

fn action_button(document: &Document, action: &str, label: &str) -> Result<Element, FrontendError> {
    let button = create(document, "button", action)?;
    button.set_attribute(ACTION_ATTR, action)?;
    button.set_attribute("type", "button")?;
    button.set_text_content(Some(label));
    Ok(button)
}

fn set_disabled(element: &Element, disabled: bool) -> Result<(), FrontendError> {
    if disabled {
        element.set_attribute("disabled", "")?;
    } else {
        element.remove_attribute("disabled")?;
    }
    Ok(())
}

fn set_hidden(element: &Element, hidden: bool) -> Result<(), FrontendError> {
    element
        .dyn_ref::<HtmlElement>()
        .ok_or_else(|| FrontendError::Dom("not an html element".into()))?
        .set_hidden(hidden);
    Ok(())
}

fn select(
    document: &Document,
    action: &str,
    options: &[(String, String)],
) -> Result<Element, FrontendError> {
    let select = create(document, "select", action)?;
    select.set_attribute(ACTION_ATTR, action)?;
    for (value, label) in options {
        let option = document.create_element("option")?;
        option.set_attribute("value", value)?;
        option.set_text_content(Some(label));
        select.append_child(&option)?;
    }
    Ok(select)
}

fn number_input(document: &Document, action: &str, label: &str) -> Result<Element, FrontendError> {
    let wrapper = create(document, "label", "")?;
    wrapper.set_text_content(Some(label));

    let input = create(document, "input", action)?;
    input.set_attribute(ACTION_ATTR, action)?;
    input.set_attribute("type", "number")?;
    input.set_attribute("min", "1")?;
    wrapper.append_child(&input)?;
    Ok(wrapper)
}

impl DomView {
    /// Builds the panel skeleton inside the configured root element.
    pub fn mount(document: &Document, config: &Config) -> Result<Self, FrontendError> {
        let root = document
            .get_element_by_id(&config.root_element_id)
            .ok_or_else(|| FrontendError::missing(format!("#{}", config.root_element_id)))?;
        root.set_inner_html("");

        let status = create(document, "div", "comment-panel-status")?;
        root.append_child(&status)?;

        let account = create(document, "div", "comment-panel-account")?;
        let nickname = create(document, "input", "")?;
        nickname.set_attribute("data-role", NICKNAME_INPUT_ROLE)?;
        nickname.set_attribute("placeholder", "Nickname")?;
        account.append_child(&nickname)?;
        let set_nickname = action_button(document, "nickname", "Set nickname")?;
        account.append_child(&set_nickname)?;
        let delete_all = action_button(document, "delete-all", "Delete all comments")?;
        account.append_child(&delete_all)?;
        root.append_child(&account)?;

        let controls = create(document, "div", "comment-panel-controls")?;
        root.append_child(&controls)?;

        let list = create(document, "div", "comment-panel-list")?;
        root.append_child(&list)?;

        let pager = create(document, "div", "comment-panel-pager")?;
        let previous_page = action_button(document, "previous-page", "Prev")?;
        pager.append_child(&previous_page)?;
        let page_label = create(document, "span", "page-number")?;
        page_label.set_text_content(Some("Page ?"));
        pager.append_child(&page_label)?;
        let next_page = action_button(document, "next-page", "Next")?;
        pager.append_child(&next_page)?;
        root.append_child(&pager)?;

        let view = DomView {
            document: document.clone(),
            root,
            status,
            account,
            controls,
            list,
            page_label,
            previous_page,
            next_page,
            sort_fields: config.sort_fields.clone(),
            languages: config.languages.clone(),
        };
        view.build_controls()?;
        Ok(view)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    fn build_controls(&self) -> Result<(), FrontendError> {
        let document = &self.document;

        let directions = [SortDirection::Descending, SortDirection::Ascending]
            .iter()
            .map(|direction| (direction.to_string(), direction.to_string()))
            .collect::<Vec<_>>();
        let sort_dir = select(document, "sort-dir", &directions)?;
        self.controls.append_child(&sort_dir)?;

        let fields = self
            .sort_fields
            .iter()
            .map(|field| (field.clone(), format!("by {}", field)))
            .collect::<Vec<_>>();
        let sort_by = select(document, "sort-by", &fields)?;
        self.controls.append_child(&sort_by)?;

        let total_elems = number_input(document, "total-elems", "Show at most ")?;
        self.controls.append_child(&total_elems)?;
        let per_page = number_input(document, "elems-per-page", "Per page ")?;
        self.controls.append_child(&per_page)?;

        let author = create(document, "input", "author-filter")?;
        author.set_attribute(ACTION_ATTR, "author-filter")?;
        author.set_attribute("placeholder", "Filter by author")?;
        self.controls.append_child(&author)?;

        Ok(())
    }

    fn control(&self, action: &str) -> Result<Element, FrontendError> {
        self.controls
            .query_selector(&format!("[{}=\"{}\"]", ACTION_ATTR, action))?
            .ok_or_else(|| FrontendError::missing(action.to_owned()))
    }

    fn set_control_value(&self, action: &str, value: &str) -> Result<(), FrontendError> {
        let control = self.control(action)?;
        if let Some(select) = control.dyn_ref::<HtmlSelectElement>() {
            select.set_value(value);
        } else if let Some(input) = control.dyn_ref::<HtmlInputElement>() {
            input.set_value(value);
        }
        Ok(())
    }

    fn row(&self, index: usize) -> Result<Element, FrontendError> {
        self.list
            .query_selector(&format!("[{}=\"{}\"].comment", INDEX_ATTR, index))?
            .ok_or_else(|| FrontendError::missing(format!("comment row {}", index)))
    }

    fn comment_row(&self, comment_id: CommentId) -> Result<Element, FrontendError> {
        self.list
            .query_selector(&format!("[{}=\"{}\"].comment", COMMENT_ID_ATTR, comment_id))?
            .ok_or_else(|| FrontendError::missing(format!("row of comment {}", comment_id)))
    }

    fn row_part(&self, index: usize, class: &str) -> Result<Element, FrontendError> {
        self.row(index)?
            .query_selector(&format!(".{}", class))?
            .ok_or_else(|| FrontendError::missing(format!("{} of row {}", class, index)))
    }

    fn render_row(&self, index: usize, row: &CommentRow) -> Result<Element, FrontendError> {
        let document = &self.document;
        let comment = &row.comment;
        let id = comment.id.to_string();
        let position = index.to_string();

        let element = create(document, "div", "comment")?;
        element.set_attribute(INDEX_ATTR, &position)?;
        element.set_attribute(COMMENT_ID_ATTR, &id)?;

        let content = create(document, "p", "comment-content")?;
        content.set_text_content(Some(&comment.content));
        element.append_child(&content)?;

        let meta = create(document, "span", "comment-meta")?;
        meta.set_text_content(Some(&format!(
            "{} · {}",
            comment.author_label(),
            comment.posted_at()
        )));
        element.append_child(&meta)?;

        let actions = create(document, "div", "comment-actions")?;

        let up = action_button(document, "upvote", "▲")?;
        up.class_list().add_1("vote-up")?;
        up.set_attribute(COMMENT_ID_ATTR, &id)?;
        actions.append_child(&up)?;

        let count = create(document, "span", "vote-count")?;
        actions.append_child(&count)?;

        let down = action_button(document, "downvote", "▼")?;
        down.class_list().add_1("vote-down")?;
        down.set_attribute(COMMENT_ID_ATTR, &id)?;
        actions.append_child(&down)?;

        let mut languages = vec![(String::new(), "Translate…".to_owned())];
        languages.extend(
            self.languages
                .iter()
                .map(|language| (language.code.clone(), language.label.clone())),
        );
        let translate = select(document, "translate", &languages)?;
        translate.set_attribute(INDEX_ATTR, &position)?;
        actions.append_child(&translate)?;

        if row.can_delete {
            let delete = action_button(document, "delete", "Delete")?;
            delete.set_attribute(COMMENT_ID_ATTR, &id)?;
            actions.append_child(&delete)?;
        }

        element.append_child(&actions)?;
        paint_vote(&element, comment.upvote_count, row.user_vote)?;

        Ok(element)
    }
}

fn paint_vote(row: &Element, upvotes: i64, user_vote: i8) -> Result<(), FrontendError> {
    if let Some(count) = row.query_selector(".vote-count")? {
        count.set_text_content(Some(&vote_counter_text(upvotes)));
    }
    for (class, voted) in [("vote-up", user_vote > 0), ("vote-down", user_vote < 0)] {
        if let Some(button) = row.query_selector(&format!(".{}", class))? {
            button.class_list().toggle_with_force(VOTED_CLASS, voted)?;
        }
    }
    Ok(())
}

impl PanelView for DomView {
    fn render_controls(&self, settings: &ViewSettings) -> Result<(), FrontendError> {
        self.set_control_value("sort-dir", settings.sort_direction.as_str())?;
        self.set_control_value("sort-by", &settings.sort_field)?;
        self.set_control_value("total-elems", &settings.total_limit.to_string())?;
        self.set_control_value("elems-per-page", &settings.page_size.to_string())?;
        self.set_control_value("author-filter", &settings.author_filter)?;
        Ok(())
    }

    fn render_identity(&self, identity: &UserIdentity) -> Result<(), FrontendError> {
        self.status.set_inner_html("");

        let link = create(&self.document, "a", "")?;
        link.set_attribute("href", &identity.login_url)?;

        if identity.logged_in {
            let label = create(&self.document, "span", "")?;
            label.set_text_content(Some(&format!("Logged in as {} ", identity.label())));
            self.status.append_child(&label)?;
            link.set_text_content(Some("Log out"));
        } else {
            link.set_text_content(Some("Log in to vote and comment"));
        }
        self.status.append_child(&link)?;

        set_hidden(&self.account, !identity.logged_in)
    }

    fn render_comments(&self, page: &PageSnapshot) -> Result<(), FrontendError> {
        self.list.set_inner_html("");

        for (index, row) in page.rows.iter().enumerate() {
            let element = self.render_row(index, row)?;
            self.list.append_child(&element)?;
        }

        let pagination = &page.pagination;
        self.page_label.set_text_content(Some(&pagination.label()));
        set_disabled(&self.previous_page, !pagination.can_go_back())?;
        set_disabled(&self.next_page, !pagination.can_go_forward())?;
        Ok(())
    }

    fn set_comment_hidden(&self, comment_id: CommentId, hidden: bool) -> Result<(), FrontendError> {
        set_hidden(&self.comment_row(comment_id)?, hidden)
    }

    fn set_vote(&self, comment_id: CommentId, upvotes: i64, user_vote: i8) -> Result<(), FrontendError> {
        paint_vote(&self.comment_row(comment_id)?, upvotes, user_vote)
    }

    fn comment_text(&self, index: usize) -> Result<String, FrontendError> {
        Ok(self
            .row_part(index, "comment-content")?
            .text_content()
            .unwrap_or_default())
    }

    fn set_comment_text(&self, index: usize, text: &str) -> Result<(), FrontendError> {
        self.row_part(index, "comment-content")?
            .set_text_content(Some(text));
        Ok(())
    }

    fn alert(&self, message: &str) {
        if let Some(window) = self.document.default_view() {
            let _ = window.alert_with_message(message);
        }
    }
}
