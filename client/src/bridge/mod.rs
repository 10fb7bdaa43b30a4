use log::{LevelFilter, Log, Metadata, Record};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement, Window};

use crate::err;
use crate::Res;

pub use self::node::{NodeRef, WebDom};

pub mod event;
mod node;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    pub fn console_log(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = warn)]
    pub fn console_warn(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = error)]
    pub fn console_error(s: &str);
}

/// Forwards the `log` facade to the browser console.
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let message = format!("[fontscope] {}: {}", record.level(), record.args());
        match record.level() {
            log::Level::Error => console_error(&message),
            log::Level::Warn => console_warn(&message),
            _ => console_log(&message),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

pub fn init_logging(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_err() {
        console_warn("[fontscope] A logger was already installed.");
    }
    log::set_max_level(level);
}

/// Make a closure callable from page scripts as `window[name]`.
pub fn expose_closure(name: &str, closure: &JsValue) -> Res<()> {
    let win = window()?;
    match js_sys::Reflect::set(&win, &JsValue::from_str(name), closure) {
        Ok(true) => Ok(()),
        Ok(false) => err(format!("Window refused property {name}.")),
        Err(e) => err(format!("Failed to expose {name}: {e:?}.")),
    }
}

pub fn window() -> Res<Window> {
    match web_sys::window() {
        Some(w) => Ok(w),
        None => err("No Window."),
    }
}

pub fn get_document() -> Res<Document> {
    match window()?.document() {
        Some(d) => Ok(d),
        None => err("No Document."),
    }
}

pub fn get_body() -> Res<HtmlElement> {
    match get_document()?.body() {
        Some(b) => Ok(b),
        None => err("No Body."),
    }
}

pub fn set_interval(f: &Closure<dyn FnMut()>, ms: i32) -> Res<i32> {
    window()?
        .set_interval_with_callback_and_timeout_and_arguments_0(f.as_ref().unchecked_ref(), ms)
        .map_err(|e| format!("Failed to set interval: {e:?}."))
}

pub fn clear_interval(handle: i32) {
    if let Ok(win) = window() {
        win.clear_interval_with_handle(handle);
    }
}
