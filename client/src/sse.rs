use std::cell::RefCell;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{EventSource, MessageEvent};

use blockmap_shared::endpoints;
use blockmap_shared::{GlobalSettings, MARKERS_EVENT, MarkersChanged, SETTINGS_EVENT, WorldEntry};

use crate::registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Live,
    Reconnecting,
}

struct SseConnection {
    es: EventSource,
    on_open: Closure<dyn Fn()>,
    on_error: Closure<dyn Fn()>,
    markers_handler: Closure<dyn Fn(MessageEvent)>,
    settings_handler: Closure<dyn Fn(MessageEvent)>,
}

impl SseConnection {
    fn close(self) {
        let _ = self.on_open.as_ref();
        let _ = self.on_error.as_ref();
        self.es.set_onopen(None);
        self.es.set_onerror(None);
        self.es
            .remove_event_listener_with_callback(
                MARKERS_EVENT,
                self.markers_handler.as_ref().unchecked_ref(),
            )
            .ok();
        self.es
            .remove_event_listener_with_callback(
                SETTINGS_EVENT,
                self.settings_handler.as_ref().unchecked_ref(),
            )
            .ok();
        self.es.close();
    }
}

thread_local! {
    static SSE_CONNECTION: RefCell<Option<SseConnection>> = const { RefCell::new(None) };
}

pub fn disconnect() {
    SSE_CONNECTION.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(connection) = slot.take() {
            connection.close();
        }
    });
}

/// Re-fetch one marker layer of a loaded world. Events for other worlds or unknown layers are
/// dropped.
fn on_markers_changed(event: &MarkersChanged) -> bool {
    registry::with(|registry| {
        registry
            .world_mut(&event.world)
            .is_some_and(|world| world.refresh_marker_layer(&event.key))
    })
}

/// Listen for server pushes. `worlds` tracks the world list carried by `settings` events.
pub fn connect(connection: RwSignal<ConnectionStatus>, worlds: RwSignal<Vec<WorldEntry>>) {
    connection.set(ConnectionStatus::Connecting);

    let es = match EventSource::new(endpoints::SSE_PATH) {
        Ok(es) => es,
        Err(_) => {
            connection.set(ConnectionStatus::Reconnecting);
            return;
        }
    };

    // On open
    let conn = connection;
    let on_open = Closure::<dyn Fn()>::new(move || {
        conn.set(ConnectionStatus::Live);
    });
    es.set_onopen(Some(on_open.as_ref().unchecked_ref()));

    // On "markers" event
    let markers_handler = Closure::<dyn Fn(MessageEvent)>::new(move |e: MessageEvent| {
        let Some(data) = e.data().as_string() else {
            return;
        };
        match serde_json::from_str::<MarkersChanged>(&data) {
            Ok(event) => {
                on_markers_changed(&event);
            }
            Err(err) => {
                web_sys::console::warn_1(&format!("Bad markers event: {err}").into());
            }
        }
    });
    es.add_event_listener_with_callback(MARKERS_EVENT, markers_handler.as_ref().unchecked_ref())
        .ok();

    // On "settings" event
    let settings_handler = Closure::<dyn Fn(MessageEvent)>::new(move |e: MessageEvent| {
        let Some(data) = e.data().as_string() else {
            return;
        };
        let global = match serde_json::from_str::<GlobalSettings>(&data) {
            Ok(global) => global,
            Err(err) => {
                web_sys::console::warn_1(&format!("Bad settings event: {err}").into());
                return;
            }
        };
        let entries: Vec<WorldEntry> = global.worlds_sorted().into_iter().cloned().collect();
        registry::with(|registry| registry.apply_global(global));
        worlds.set(entries);
        registry::request_redraw();
    });
    es.add_event_listener_with_callback(SETTINGS_EVENT, settings_handler.as_ref().unchecked_ref())
        .ok();

    // On error; the browser reconnects on its own
    let conn = connection;
    let on_error = Closure::<dyn Fn()>::new(move || {
        if conn.get_untracked() != ConnectionStatus::Reconnecting {
            web_sys::console::info_1(&"SSE connection lost; reconnecting".into());
        }
        conn.set(ConnectionStatus::Reconnecting);
    });
    es.set_onerror(Some(on_error.as_ref().unchecked_ref()));

    SSE_CONNECTION.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(old) = slot.take() {
            old.close();
        }
        *slot = Some(SseConnection {
            es,
            on_open,
            on_error,
            markers_handler,
            settings_handler,
        });
    });
}
