#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::HtmlImageElement;

use blockmap_shared::TileRequest;

use crate::registry;

const MAX_CONCURRENCY: usize = 8;
const ONLOAD_HANDLE_KEY: &str = "__blockmapTileOnload";
const ONERROR_HANDLE_KEY: &str = "__blockmapTileOnerror";

/// One tile image to fetch on behalf of a world's tile layer.
#[derive(Debug, Clone)]
pub struct TileJob {
    pub world: String,
    pub session: u32,
    pub renderer: String,
    pub request: TileRequest,
    pub src: String,
}

#[derive(Default)]
struct Queue {
    jobs: VecDeque<TileJob>,
    in_flight: usize,
    pump_scheduled: bool,
}

thread_local! {
    static QUEUE: RefCell<Queue> = RefCell::new(Queue::default());
}

/// Queue jobs in the given order. Loading starts on the next turn of the event loop, outside
/// whatever registry borrow the caller holds.
pub fn enqueue(jobs: Vec<TileJob>) {
    if jobs.is_empty() {
        return;
    }
    let schedule = QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        queue.jobs.extend(jobs);
        !std::mem::replace(&mut queue.pump_scheduled, true)
    });
    if schedule {
        spawn_local(async {
            QUEUE.with(|queue| queue.borrow_mut().pump_scheduled = false);
            pump();
        });
    }
}

fn pump() {
    loop {
        let next = QUEUE.with(|queue| {
            let mut queue = queue.borrow_mut();
            if queue.in_flight >= MAX_CONCURRENCY {
                return None;
            }
            let job = queue.jobs.pop_front()?;
            queue.in_flight += 1;
            Some(job)
        });
        let Some(job) = next else {
            break;
        };

        // Tiles scrolled away or redrawn since they were queued are skipped.
        let wanted = registry::with_world(&job.world, job.session, |world| {
            world.wants(&job.renderer, &job.request)
        })
        .unwrap_or(false);
        if !wanted {
            release_slot();
            continue;
        }
        load_tile_job(Rc::new(job));
    }
}

fn release_slot() {
    QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        queue.in_flight = queue.in_flight.saturating_sub(1);
    });
}

fn load_tile_job(job: Rc<TileJob>) {
    let img = match HtmlImageElement::new() {
        Ok(img) => img,
        Err(_) => {
            finish(&job, None);
            return;
        }
    };

    let img_for_load = img.clone();
    let job_load = job.clone();
    let onload = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_load);

        let img_for_decode = img_for_load.clone();
        let job = job_load.clone();
        spawn_local(async move {
            let _ = JsFuture::from(img_for_decode.decode()).await;
            finish(&job, Some(img_for_decode));
        });
    });

    let img_for_error = img.clone();
    let job_error = job.clone();
    let onerror = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_error);
        finish(&job_error, None);
    });

    let onload_js = onload.into_js_value();
    let onerror_js = onerror.into_js_value();
    img.set_onload(Some(onload_js.unchecked_ref()));
    img.set_onerror(Some(onerror_js.unchecked_ref()));
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONLOAD_HANDLE_KEY),
        &onload_js,
    );
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONERROR_HANDLE_KEY),
        &onerror_js,
    );
    img.set_src(&job.src);
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}

/// A missing tile is normal (unrendered area) and settles the same as a loaded one.
fn finish(job: &TileJob, image: Option<HtmlImageElement>) {
    release_slot();
    registry::with_world(&job.world, job.session, |world| {
        world.tile_settled(&job.renderer, &job.request, image);
    });
    registry::request_redraw();
    pump();
}
