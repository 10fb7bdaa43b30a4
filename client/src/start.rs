// The #[wasm_bindgen(start)] call is needed but Clippy doesn't see that.
#![allow(clippy::unused_unit)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Mutex;

use inspect::controller::OverlayHandlers;
use inspect::panels::PanelId;
use inspect::{DebugConfig, InteractionController};
use wasm_bindgen::prelude::*;

use crate::bridge::{expose_closure, init_logging, WebDom};
use crate::dom::DomPresenter;
use crate::listeners::{release_retired, Listeners};
use crate::Res;

pub type Overlay = InteractionController<WebDom>;
pub type OverlayRef = Rc<Mutex<Overlay>>;

thread_local! {
    static OVERLAY: RefCell<Option<OverlayRef>> = const { RefCell::new(None) };
}

pub fn lock_and<T: FnOnce(&mut Overlay)>(overlay: &OverlayRef, action: T) {
    if let Ok(mut lock) = overlay.try_lock() {
        action(&mut lock);
    } else {
        log::warn!("Failed to lock overlay for handler.");
    }
}

fn logged_error<T>(error_message: &str) -> Result<T, JsValue> {
    log::error!("{error_message}");
    Err(JsValue::from_str(error_message))
}

fn parse_json<'a, T: serde::Deserialize<'a>>(json: &'a str) -> Option<T> {
    match serde_json::from_str::<T>(json) {
        Ok(val) => Some(val),
        Err(e) => {
            log::warn!("Failed to parse JSON ({e}): {json}");
            None
        }
    }
}

fn create_overlay() -> Res<OverlayRef> {
    let mut ctl = InteractionController::new(WebDom::new()?);
    ctl.set_presenter(Box::new(DomPresenter::new()?));
    Ok(Rc::new(Mutex::new(ctl)))
}

/// The shared overlay, created on first use.
fn overlay() -> Res<OverlayRef> {
    OVERLAY.with(|cell| {
        let mut cell = cell.borrow_mut();
        if let Some(overlay) = cell.as_ref() {
            return Ok(overlay.clone());
        }

        let overlay = create_overlay()?;
        *cell = Some(overlay.clone());
        Ok(overlay)
    })
}

/// Register the presentation handlers on `window` so alternative front ends
/// can drive the overlay.
fn expose_handlers(overlay: &OverlayRef) -> Res<()> {
    let ov = overlay.clone();
    let exit_closure = Closure::wrap(Box::new(move || {
        lock_and(&ov, |ctl| ctl.on_exit());
    }) as Box<dyn FnMut()>);
    expose_closure("fontscope_exit", exit_closure.as_ref())?;
    exit_closure.forget();

    let ov = overlay.clone();
    let close_closure = Closure::wrap(Box::new(move |id: String| {
        lock_and(&ov, |ctl| {
            if let Err(e) = ctl.on_close_modal(&PanelId::new(id)) {
                log::warn!("{e}");
            }
        });
    }) as Box<dyn FnMut(String)>);
    expose_closure("fontscope_close_modal", close_closure.as_ref())?;
    close_closure.forget();

    let ov = overlay.clone();
    let front_closure = Closure::wrap(Box::new(move |id: String| {
        lock_and(&ov, |ctl| {
            if let Err(e) = ctl.on_bring_modal_to_front(&PanelId::new(id)) {
                log::warn!("{e}");
            }
        });
    }) as Box<dyn FnMut(String)>);
    expose_closure("fontscope_bring_to_front", front_closure.as_ref())?;
    front_closure.forget();

    let ov = overlay.clone();
    let highlight_closure = Closure::wrap(Box::new(
        move |element: web_sys::Element, id: String, highlighting: bool| {
            lock_and(&ov, |ctl| {
                let element = ctl.dom().node(element);
                let id = PanelId::new(id);
                if let Err(e) = ctl.on_highlight_element(&element, &id, highlighting) {
                    log::warn!("{e}");
                }
            });
        },
    ) as Box<dyn FnMut(web_sys::Element, String, bool)>);
    expose_closure("fontscope_highlight", highlight_closure.as_ref())?;
    highlight_closure.forget();

    Ok(())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    init_logging(DebugConfig::default().level_filter());

    let overlay = match overlay() {
        Ok(o) => o,
        Err(e) => return logged_error(&format!("Failed to create overlay: {e}")),
    };

    if let Err(e) = expose_handlers(&overlay) {
        return logged_error(&e);
    }

    Ok(())
}

/// Analyse the page and start the interactive overlay. Calling this while
/// the overlay is active restarts it.
#[wasm_bindgen]
pub fn activate_interactive() -> Result<(), JsValue> {
    let overlay = match overlay() {
        Ok(o) => o,
        Err(e) => return logged_error(&format!("Failed to create overlay: {e}")),
    };

    let Ok(mut ctl) = overlay.try_lock() else {
        return logged_error("Failed to lock overlay for activation.");
    };
    let body = match ctl.dom().body() {
        Ok(b) => b,
        Err(e) => return logged_error(&e),
    };

    release_retired();
    let listeners = match Listeners::attach(&overlay) {
        Ok(l) => l,
        Err(e) => return logged_error(&format!("Failed to attach to page: {e}")),
    };
    ctl.activate(&body, Box::new(listeners));

    Ok(())
}

/// Close every panel, restore the page and detach all listeners.
#[wasm_bindgen]
pub fn deactivate() -> Result<(), JsValue> {
    match overlay() {
        Ok(overlay) => {
            lock_and(&overlay, |ctl| ctl.deactivate());
            Ok(())
        }
        Err(e) => logged_error(&e),
    }
}

/// Font usage of the whole page as JSON, without showing anything.
#[wasm_bindgen]
pub fn analyze_headless() -> Result<String, JsValue> {
    let dom = match WebDom::new() {
        Ok(d) => d,
        Err(e) => return logged_error(&e),
    };
    let body = match dom.body() {
        Ok(b) => b,
        Err(e) => return logged_error(&e),
    };

    let report = inspect::analyze_headless(&dom, &body);
    serde_json::to_string(&report)
        .or_else(|e| logged_error(&format!("Failed to serialise analysis: {e}")))
}

/// Configure diagnostics from JSON, e.g.
/// `{"enabled": true, "logLevel": "debug", "showDebugPanel": true}`.
#[wasm_bindgen]
pub fn set_debug_config(json: &str) -> Result<(), JsValue> {
    let Some(config) = parse_json::<DebugConfig>(json) else {
        return logged_error("Invalid debug configuration.");
    };

    log::set_max_level(config.level_filter());
    match overlay() {
        Ok(overlay) => {
            lock_and(&overlay, |ctl| ctl.set_debug_config(config));
            Ok(())
        }
        Err(e) => logged_error(&e),
    }
}
