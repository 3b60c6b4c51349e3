//! Turns DOM events inside the panel root into controller actions.
//!
//! Every interactive element carries a `data-action` attribute, plus
//! `data-comment-id` / `data-index` when it belongs to a comment row. One
//! listener per event type on the root decodes those attributes.

use std::rc::Rc;

use log::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlInputElement, HtmlSelectElement};

use crate::comment::{CommentId, VoteDirection};
use crate::connection::CommentBackend;
use crate::cookies::CookieJar;
use crate::error::FrontendError;
use crate::panel::PanelController;
use crate::render::{PanelView, NICKNAME_INPUT_ROLE};
use crate::settings::SettingsMessage;

pub const ACTION_ATTR: &str = "data-action";
pub const COMMENT_ID_ATTR: &str = "data-comment-id";
pub const INDEX_ATTR: &str = "data-index";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Click,
    Change,
}

impl EventKind {
    pub fn dom_name(&self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::Change => "change",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    Settings(SettingsMessage),
    Vote {
        comment_id: CommentId,
        direction: VoteDirection,
    },
    Delete {
        comment_id: CommentId,
    },
    DeleteAll,
    Translate {
        index: usize,
        lang: String,
    },
    Nickname(String),
}

/// Attributes read off the element an event landed on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionTarget {
    pub action: String,
    pub value: Option<String>,
    pub comment_id: Option<String>,
    pub index: Option<String>,
}

impl UiEvent {
    pub fn decode(kind: EventKind, target: &ActionTarget) -> Option<UiEvent> {
        let comment_id = || target.comment_id.as_deref()?.parse::<CommentId>().ok();
        let index = || target.index.as_deref()?.parse::<usize>().ok();
        let value = || target.value.clone().unwrap_or_default();
        let number = || value().trim().parse::<usize>().ok();

        let event = match (kind, target.action.as_str()) {
            (EventKind::Click, "upvote") => UiEvent::Vote {
                comment_id: comment_id()?,
                direction: VoteDirection::Up,
            },
            (EventKind::Click, "downvote") => UiEvent::Vote {
                comment_id: comment_id()?,
                direction: VoteDirection::Down,
            },
            (EventKind::Click, "delete") => UiEvent::Delete {
                comment_id: comment_id()?,
            },
            (EventKind::Click, "delete-all") => UiEvent::DeleteAll,
            (EventKind::Click, "next-page") => UiEvent::Settings(SettingsMessage::NextPage),
            (EventKind::Click, "previous-page") => {
                UiEvent::Settings(SettingsMessage::PreviousPage)
            }
            (EventKind::Click, "nickname") => UiEvent::Nickname(value()),
            (EventKind::Change, "translate") => UiEvent::Translate {
                index: index()?,
                lang: value(),
            },
            (EventKind::Change, "sort-dir") => UiEvent::Settings(
                SettingsMessage::SortDirectionChanged(value().parse().ok()?),
            ),
            (EventKind::Change, "sort-by") => {
                UiEvent::Settings(SettingsMessage::SortFieldChanged(value()))
            }
            (EventKind::Change, "total-elems") => {
                UiEvent::Settings(SettingsMessage::TotalLimitChanged(number()?))
            }
            (EventKind::Change, "elems-per-page") => {
                UiEvent::Settings(SettingsMessage::PageSizeChanged(number()?))
            }
            (EventKind::Change, "author-filter") => {
                UiEvent::Settings(SettingsMessage::AuthorFilterChanged(value()))
            }
            _ => return None,
        };

        Some(event)
    }
}

fn element_value(element: &Element) -> Option<String> {
    if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
        Some(select.value())
    } else {
        element
            .dyn_ref::<HtmlInputElement>()
            .map(|input| input.value())
    }
}

fn action_target(root: &Element, event: &Event) -> Result<Option<ActionTarget>, FrontendError> {
    let Some(target) = event.target().and_then(|target| target.dyn_into::<Element>().ok())
    else {
        return Ok(None);
    };
    let Some(element) = target.closest(&format!("[{}]", ACTION_ATTR))? else {
        return Ok(None);
    };
    let action = element.get_attribute(ACTION_ATTR).unwrap_or_default();

    let value = if action == "nickname" {
        root.query_selector(&format!("[data-role=\"{}\"]", NICKNAME_INPUT_ROLE))?
            .as_ref()
            .and_then(element_value)
    } else {
        element_value(&element)
    };

    Ok(Some(ActionTarget {
        action,
        value,
        comment_id: element.get_attribute(COMMENT_ID_ATTR),
        index: element.get_attribute(INDEX_ATTR),
    }))
}

/// Routes click and change events under `root` to `controller`.
pub fn attach<B, V, C>(root: &Element, controller: Rc<PanelController<B, V, C>>) -> Result<(), FrontendError>
where
    B: CommentBackend + 'static,
    V: PanelView + 'static,
    C: CookieJar + 'static,
{
    for kind in [EventKind::Click, EventKind::Change] {
        let root0 = root.clone();
        let controller0 = controller.clone();

        let on_event = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let target = match action_target(&root0, &event) {
                Ok(Some(target)) => target,
                Ok(None) => return,
                Err(err) => return warn!("could not read event target: {}", err),
            };

            match UiEvent::decode(kind, &target) {
                Some(ui_event) => {
                    let controller1 = controller0.clone();
                    wasm_bindgen_futures::spawn_local(async move {
                        controller1.handle(ui_event).await;
                    });
                }
                None => debug!("ignoring {} on {:?}", kind.dom_name(), target),
            }
        });

        root.add_event_listener_with_callback(kind.dom_name(), on_event.as_ref().unchecked_ref())?;
        on_event.forget();
    }

    Ok(())
}
