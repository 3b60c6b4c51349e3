extern crate console_error_panic_hook;
extern crate serde;
#[macro_use]
extern crate serde_derive;

pub mod comment;
pub mod config;
pub mod connection;
pub mod cookies;
pub mod decorations;
pub mod error;
pub mod events;
pub mod logger;
pub mod mutation;
pub mod pagination;
pub mod panel;
pub mod render;
pub mod settings;

use std::rc::Rc;

use log::{error, info};
use wasm_bindgen::prelude::*;
use web_sys::{Document, Window};

use crate::config::Config;
use crate::connection::FrontendConnection;
use crate::cookies::DocumentCookies;
use crate::error::FrontendError;
use crate::panel::PanelController;
use crate::render::DomView;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(contents: &str);
}

pub type DomPanel = PanelController<FrontendConnection, DomView, DocumentCookies>;

pub fn window_and_document() -> Result<(Window, Document), FrontendError> {
    let window = web_sys::window().ok_or_else(|| FrontendError::missing("window"))?;
    let document = window
        .document()
        .ok_or_else(|| FrontendError::missing("document"))?;

    Ok((window, document))
}

fn window_width(window: &Window) -> f64 {
    window
        .inner_width()
        .ok()
        .and_then(|width| width.as_f64())
        .unwrap_or(f64::MAX)
}

#[wasm_bindgen]
pub fn bootstrap() -> Result<(), JsValue> {
    start(Config::default())?;
    Ok(())
}

#[wasm_bindgen]
pub fn bootstrap_with_config(config_json: &str) -> Result<(), JsValue> {
    start(Config::from_json(config_json)?)?;
    Ok(())
}

fn start(config: Config) -> Result<Rc<DomPanel>, FrontendError> {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    config.validate()?;
    logger::init_logger(config.level_filter()?);

    let (window, document) = window_and_document()?;

    if let Err(err) = decorations::load_layout(
        &document,
        window_width(&window),
        config.narrow_layout_width,
    ) {
        info!("layout left as is: {}", err);
    }
    if let Err(err) = decorations::add_random_fact(&document) {
        info!("no fun fact shown: {}", err);
    }

    let panel = mount_panel(&document, &config)?;
    info!("comment panel mounted on #{}", config.root_element_id);

    Ok(panel)
}

/// Builds the panel under the configured root and starts loading comments.
pub fn mount_panel(document: &Document, config: &Config) -> Result<Rc<DomPanel>, FrontendError> {
    let connection = FrontendConnection::from_config(config)?;
    let view = DomView::mount(document, config)?;
    let root = view.root().clone();

    let panel = Rc::new(PanelController::new(
        connection,
        view,
        DocumentCookies,
        config.default_settings.clone(),
    ));
    events::attach(&root, panel.clone())?;

    let panel0 = panel.clone();
    wasm_bindgen_futures::spawn_local(async move {
        panel0.start().await;
    });

    Ok(panel)
}

#[wasm_bindgen]
pub fn load_layout() {
    let result = window_and_document().and_then(|(window, document)| {
        decorations::load_layout(
            &document,
            window_width(&window),
            Config::default().narrow_layout_width,
        )
    });
    if let Err(err) = result {
        error!("could not adjust layout: {}", err);
    }
}

#[wasm_bindgen]
pub fn add_random_fact() {
    let result = window_and_document().and_then(|(_, document)| decorations::add_random_fact(&document));
    if let Err(err) = result {
        error!("could not add fun fact: {}", err);
    }
}

#[wasm_bindgen]
pub fn rotate_item(index: u32) {
    let result = window_and_document()
        .and_then(|(_, document)| decorations::toggle_dropdown(&document, index));
    if let Err(err) = result {
        error!("could not toggle dropdown {}: {}", index, err);
    }
}
