use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Coalesces repaint requests into one `requestAnimationFrame` callback.
///
/// Tile loads, marker refreshes and input all call [`FrameScheduler::request`]; the paint
/// function runs at most once per frame no matter how many requests arrived.
#[derive(Clone)]
pub struct FrameScheduler {
    shared: Rc<Shared>,
}

struct Shared {
    window: Option<web_sys::Window>,
    pending: Cell<Option<i32>>,
    frame: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl FrameScheduler {
    pub fn new(paint: impl Fn() + 'static) -> Self {
        let shared = Rc::new(Shared {
            window: web_sys::window(),
            pending: Cell::new(None),
            frame: RefCell::new(None),
        });
        let weak = Rc::downgrade(&shared);
        let frame = Closure::<dyn FnMut()>::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.pending.set(None);
            }
            paint();
        });
        *shared.frame.borrow_mut() = Some(frame);
        Self { shared }
    }

    pub fn request(&self) {
        if self.shared.pending.get().is_some() {
            return;
        }
        let Some(window) = self.shared.window.as_ref() else {
            return;
        };
        let frame = self.shared.frame.borrow();
        let Some(frame) = frame.as_ref() else {
            return;
        };
        if let Ok(id) = window.request_animation_frame(frame.as_ref().unchecked_ref()) {
            self.shared.pending.set(Some(id));
        }
    }

    /// Cancel a pending frame and release the paint closure.
    pub fn shutdown(&self) {
        if let Some(id) = self.shared.pending.take()
            && let Some(window) = self.shared.window.as_ref()
        {
            let _ = window.cancel_animation_frame(id);
        }
        self.shared.frame.borrow_mut().take();
    }
}
