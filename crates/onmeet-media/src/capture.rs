//! Device capture on a dedicated OS thread.
//!
//! Some capture handles must stay on the thread that opened them. A
//! [`CaptureThread`] opens the device on its own thread, reports readiness
//! back to the awaiting acquisition, then pulls frames until stopped. The
//! device is closed on that thread in every case, including when the
//! acquisition that started it is abandoned before the device is ready.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use onmeet_shared::error::MediaAcquisitionError;

#[derive(Debug)]
pub struct CaptureThread {
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl CaptureThread {
    /// Spawn the capture thread and wait until `open` has succeeded.
    ///
    /// `pull` runs in a loop while the capture is live; an error ends the
    /// capture. `close` receives the device when the loop ends, or right
    /// after `open` if nobody is waiting for the device anymore.
    pub async fn start<D, O, P, C>(
        name: impl Into<String>,
        open: O,
        mut pull: P,
        close: C,
    ) -> Result<Self, MediaAcquisitionError>
    where
        D: 'static,
        O: FnOnce() -> Result<D, MediaAcquisitionError> + Send + 'static,
        P: FnMut(&mut D) -> Result<(), String> + Send + 'static,
        C: FnOnce(D) + Send + 'static,
    {
        let name = name.into();
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), MediaAcquisitionError>>();

        let thread = std::thread::Builder::new()
            .name(format!("capture-{name}"))
            .spawn(move || {
                let mut device = match open() {
                    Ok(d) => d,
                    Err(e) => {
                        flag.store(false, Ordering::SeqCst);
                        // Nothing was opened, so an abandoned receiver needs no cleanup.
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                if ready_tx.send(Ok(())).is_err() {
                    debug!(capture = %name, "Acquisition abandoned, closing device");
                    flag.store(false, Ordering::SeqCst);
                    close(device);
                    return;
                }

                while flag.load(Ordering::SeqCst) {
                    if let Err(e) = pull(&mut device) {
                        warn!(capture = %name, error = %e, "Capture error, closing device");
                        break;
                    }
                }

                flag.store(false, Ordering::SeqCst);
                close(device);
                debug!(capture = %name, "Capture thread exiting");
            })
            .map_err(|e| MediaAcquisitionError::Capture(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Self {
                running,
                thread: Mutex::new(Some(thread)),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(MediaAcquisitionError::Capture(
                "capture thread exited before opening".into(),
            )),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop capturing and block until the device is closed.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() == std::thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!("Capture thread panicked");
            }
        }
    }
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        self.stop();
    }
}
