use std::future::Future;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future;
use gloo_timers::future::sleep;
use wasm_bindgen_futures::spawn_local;

/// A self-rescheduling timer: the next run is scheduled only after the previous one finished.
///
/// Dropping the handle cancels the loop at its next suspension point, so whoever owns the task
/// owns its lifetime.
pub struct RepeatingTask {
    cancel: Option<oneshot::Sender<()>>,
}

impl RepeatingTask {
    /// Run `tick` now, then every `interval`. `None` runs it once.
    pub fn immediate<F, Fut>(interval: Option<Duration>, tick: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Self::start(false, interval, tick)
    }

    /// Wait `interval`, run `tick`, repeat.
    pub fn delayed<F, Fut>(interval: Duration, tick: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Self::start(true, Some(interval), tick)
    }

    fn start<F, Fut>(wait_first: bool, interval: Option<Duration>, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let (cancel, cancelled) = oneshot::channel::<()>();
        let run = Box::pin(async move {
            if wait_first && let Some(interval) = interval {
                sleep(interval).await;
            }
            loop {
                tick().await;
                let Some(interval) = interval else {
                    return;
                };
                sleep(interval).await;
            }
        });
        spawn_local(async move {
            // A dropped sender resolves the receiver too.
            future::select(run, cancelled).await;
        });
        Self {
            cancel: Some(cancel),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
