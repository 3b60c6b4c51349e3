//! Page decorations outside the comment panel.

use log::debug;
use rand::seq::SliceRandom;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};

use crate::error::FrontendError;

pub const FUN_FACTS: &[&str] = &[
    "I speak fluent Mandarin and some Spanish.",
    "I really like Chinese dramas.",
    "I've sewn a lot of pencil bags, but don't use most of them.",
    "I have a younger brother at home. We're 9 years apart.",
    "I think pineapple on pizza is not bad.",
    "I might double major in math.",
    "I was born in Utah and spent 5 years in Oregon before moving to Texas.",
];

fn html_element(document: &Document, id: &str) -> Result<HtmlElement, FrontendError> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| FrontendError::missing(format!("#{}", id)))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| FrontendError::Dom(format!("#{} is not an html element", id)))
}

fn nth_by_class(document: &Document, class: &str, index: u32) -> Result<HtmlElement, FrontendError> {
    document
        .get_elements_by_class_name(class)
        .item(index)
        .ok_or_else(|| FrontendError::missing(format!(".{}[{}]", class, index)))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| FrontendError::Dom(format!(".{} is not an html element", class)))
}

pub fn is_narrow(window_width: f64, breakpoint: f64) -> bool {
    window_width < breakpoint
}

/// Stacks the two page columns when the window is narrower than `breakpoint`.
pub fn load_layout(document: &Document, window_width: f64, breakpoint: f64) -> Result<bool, FrontendError> {
    if !is_narrow(window_width, breakpoint) {
        return Ok(false);
    }
    debug!("narrow window ({}px), single column layout", window_width);

    html_element(document, "body")?
        .style()
        .set_property("display", "block")?;

    let left = html_element(document, "content-left")?.style();
    left.set_property("margin", "auto")?;
    left.set_property("padding", "0")?;

    let right = html_element(document, "content-right")?.style();
    right.set_property("border", "none")?;
    right.set_property("margin", "auto")?;
    right.set_property("padding", "0")?;

    Ok(true)
}

pub fn random_fact() -> &'static str {
    FUN_FACTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default()
}

pub fn add_random_fact(document: &Document) -> Result<(), FrontendError> {
    html_element(document, "greeting-container")?.set_inner_text(random_fact());
    Ok(())
}

/// Opens or closes the `index`-th dropdown and turns its icon.
pub fn toggle_dropdown(document: &Document, index: u32) -> Result<bool, FrontendError> {
    let icon = nth_by_class(document, "plus", index)?;
    let text = nth_by_class(document, "dropdown-text", index)?;
    let content = nth_by_class(document, "dropdown-text-content", index)?;

    let opened = !icon.class_list().contains("clicked");
    if opened {
        icon.class_list().add_1("clicked")?;
        text.style()
            .set_property("height", &format!("{}px", content.client_height() + 60))?;
    } else {
        icon.class_list().remove_1("clicked")?;
        text.style().set_property("height", "0")?;
    }

    Ok(opened)
}
