use std::any::Any;
use std::cell::RefCell;

use inspect::controller::Subscription;
use inspect::DebugConfig;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{EventTarget, MutationObserver, MutationObserverInit, MutationRecord};

use crate::bridge::event::{MouseAction, MouseButton, PointerEvent};
use crate::bridge::{clear_interval, get_body, get_document, set_interval, window};
use crate::start::{lock_and, OverlayRef};
use crate::Res;

type Listener = Closure<dyn FnMut(web_sys::Event)>;

struct Attached {
    target: EventTarget,
    event: &'static str,
    capture: bool,
    listener: Listener,
}

thread_local! {
    // Closures from cancelled subscriptions. Cancelling usually happens inside
    // one of these closures, so they can't be dropped there; they're released
    // on the next activation instead.
    static RETIRED: RefCell<Vec<Box<dyn Any>>> = const { RefCell::new(Vec::new()) };
}

/// Drop closures left over from earlier sessions. Must not be called from
/// within a page event handler.
pub fn release_retired() {
    RETIRED.with(|retired| retired.borrow_mut().clear());
}

/// Every page hook the overlay installs while active.
pub struct Listeners {
    attached: Vec<Attached>,
    observer: Option<(MutationObserver, Closure<dyn FnMut(js_sys::Array, MutationObserver)>)>,
    interval: Option<(i32, Closure<dyn FnMut()>)>,
}

impl Listeners {
    pub fn attach(overlay: &OverlayRef) -> Res<Listeners> {
        let mut listeners = Listeners {
            attached: Vec::new(),
            observer: None,
            interval: None,
        };

        // If anything fails part way, what was attached is detached again.
        if let Err(e) = listeners.attach_all(overlay) {
            listeners.cancel();
            return Err(e);
        }

        Ok(listeners)
    }

    fn attach_all(&mut self, overlay: &OverlayRef) -> Res<()> {
        let document: EventTarget = get_document()?.into();
        for name in PointerEvent::EVENTS {
            let overlay = overlay.clone();
            self.listen(&document, name, true, move |event| {
                handle_pointer(&overlay, &event);
            })?;
        }

        if let Some(root) = get_document()?.document_element() {
            let root: EventTarget = root.into();
            let overlay = overlay.clone();
            self.listen(&root, "mouseleave", false, move |event| {
                handle_pointer(&overlay, &event);
            })?;
        }

        let win: EventTarget = window()?.into();
        for name in ["resize", "scroll"] {
            let overlay = overlay.clone();
            self.listen(&win, name, true, move |_| {
                lock_and(&overlay, |ctl| ctl.viewport_changed());
            })?;
        }

        self.observe(overlay)?;

        let ticking = overlay.clone();
        let tick = Closure::wrap(Box::new(move || {
            lock_and(&ticking, |ctl| ctl.debug_tick());
        }) as Box<dyn FnMut()>);
        let handle = set_interval(&tick, DebugConfig::REFRESH_INTERVAL_MS)?;
        self.interval = Some((handle, tick));

        Ok(())
    }

    fn listen<F: FnMut(web_sys::Event) + 'static>(
        &mut self,
        target: &EventTarget,
        event: &'static str,
        capture: bool,
        handler: F,
    ) -> Res<()> {
        let listener = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
        target
            .add_event_listener_with_callback_and_bool(
                event,
                listener.as_ref().unchecked_ref(),
                capture,
            )
            .map_err(|e| format!("Failed to add {event} listener: {e:?}."))?;

        self.attached.push(Attached {
            target: target.clone(),
            event,
            capture,
            listener,
        });
        Ok(())
    }

    fn observe(&mut self, overlay: &OverlayRef) -> Res<()> {
        let overlay = overlay.clone();
        let callback = Closure::wrap(Box::new(move |records: js_sys::Array, _: MutationObserver| {
            lock_and(&overlay, |ctl| {
                let mut added = Vec::new();
                for record in records.iter() {
                    let record = record.unchecked_into::<MutationRecord>();
                    let nodes = record.added_nodes();
                    for i in 0..nodes.length() {
                        if let Some(element) = nodes
                            .item(i)
                            .and_then(|n| n.dyn_into::<web_sys::Element>().ok())
                        {
                            added.push(ctl.dom().node(element));
                        }
                    }
                }
                // Style, class and text changes carry no added nodes and
                // need no reanalysis.
                if !added.is_empty() {
                    ctl.nodes_added(&added);
                }
            });
        })
            as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
            .map_err(|e| format!("Failed to create mutation observer: {e:?}."))?;

        let filter: js_sys::Array = ["style", "class"].into_iter().map(JsValue::from).collect();
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        options.set_attributes(true);
        options.set_attribute_filter(&filter);
        options.set_character_data(true);
        let body = get_body()?;
        observer
            .observe_with_options(&body, &options)
            .map_err(|e| format!("Failed to observe document: {e:?}."))?;

        self.observer = Some((observer, callback));
        Ok(())
    }
}

impl Subscription for Listeners {
    fn cancel(&mut self) {
        let mut retired: Vec<Box<dyn Any>> = Vec::new();

        for attached in self.attached.drain(..) {
            attached
                .target
                .remove_event_listener_with_callback_and_bool(
                    attached.event,
                    attached.listener.as_ref().unchecked_ref(),
                    attached.capture,
                )
                .ok();
            retired.push(Box::new(attached.listener));
        }

        if let Some((observer, callback)) = self.observer.take() {
            observer.disconnect();
            retired.push(Box::new(callback));
        }

        if let Some((handle, tick)) = self.interval.take() {
            clear_interval(handle);
            retired.push(Box::new(tick));
        }

        RETIRED.with(|r| r.borrow_mut().extend(retired));
        log::debug!("Detached from the page.");
    }
}

fn handle_pointer(overlay: &OverlayRef, event: &web_sys::Event) {
    let Some(pointer) = PointerEvent::from_web_sys(event) else {
        return;
    };

    lock_and(overlay, |ctl| {
        let target = ctl.dom().target(pointer.target.clone());
        let consumed = match (pointer.action, target) {
            (MouseAction::Move, target) => {
                ctl.pointer_move(target.as_ref(), pointer.at);
                false
            }
            (MouseAction::Leave, _) => {
                ctl.pointer_move(None, pointer.at);
                false
            }
            (MouseAction::Down, Some(target)) if pointer.button == MouseButton::Left => {
                ctl.pointer_down(&target, pointer.at)
            }
            (MouseAction::Up, _) => {
                ctl.pointer_up();
                false
            }
            (MouseAction::Click, Some(target)) if pointer.button == MouseButton::Left => {
                ctl.click(&target, pointer.at)
            }
            _ => false,
        };

        if consumed {
            event.prevent_default();
            event.stop_propagation();
        }
    });
}
