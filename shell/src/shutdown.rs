//! Interrupt handling.
//!
//! A listener thread turns SIGINT into a [`ShutdownEvent`] message; a
//! supervisor thread receives it and applies the termination policy. Neither
//! of them talks to the pipeline executor: shutdown is a hard stop, not a
//! request a running pipeline can decline.

use signal_hook::consts::SIGINT;
use signal_hook::iterator::{Handle, Signals};
use std::fmt;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Why the shell is going down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownEvent {
    /// A signal was delivered to the process.
    Signal(i32),
    /// The read-eval loop saw Ctrl-C at the prompt.
    Requested,
}

impl fmt::Display for ShutdownEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Received interrupt signal. Exiting...")
    }
}

/// What to do once a shutdown event arrives. Runs on the supervisor thread.
pub type ShutdownPolicy = Box<dyn FnOnce(ShutdownEvent) + Send + 'static>;

/// Policy used by the binary: announce and terminate the whole process.
pub fn exit_process() -> ShutdownPolicy {
    Box::new(|event| {
        println!("\n{event}");
        std::process::exit(0);
    })
}

/// Sends shutdown requests to the supervisor.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Sender<ShutdownEvent>,
}

impl ShutdownHandle {
    pub fn request(&self) {
        // The supervisor only goes away after it has acted on an event.
        let _ = self.tx.send(ShutdownEvent::Requested);
    }
}

pub struct ShutdownController {
    handle: ShutdownHandle,
    signals: Handle,
    supervisor: JoinHandle<()>,
}

impl ShutdownController {
    /// Register the SIGINT handler and start the listener and supervisor.
    pub fn install(policy: ShutdownPolicy) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();

        let mut signals = Signals::new([SIGINT])?;
        let signals_handle = signals.handle();
        let signal_tx = tx.clone();
        thread::Builder::new()
            .name("signal-listener".into())
            .spawn(move || {
                for signal in signals.forever() {
                    tracing::debug!(signal, "signal received");
                    if signal_tx.send(ShutdownEvent::Signal(signal)).is_err() {
                        break;
                    }
                }
            })?;

        let supervisor = thread::Builder::new()
            .name("shutdown-supervisor".into())
            .spawn(move || supervise(rx, policy))?;

        Ok(Self {
            handle: ShutdownHandle { tx },
            signals: signals_handle,
            supervisor,
        })
    }

    pub fn handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }

    /// Block until the supervisor has applied its policy.
    ///
    /// With [`exit_process`] this never returns.
    pub fn join(self) {
        if self.supervisor.join().is_err() {
            tracing::error!("shutdown supervisor panicked");
        }
        self.signals.close();
    }
}

fn supervise(rx: Receiver<ShutdownEvent>, policy: ShutdownPolicy) {
    if let Ok(event) = rx.recv() {
        tracing::info!(?event, "shutting down");
        policy(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn policy_runs_once_on_request() {
        let (seen_tx, seen_rx) = mpsc::channel();
        let controller = ShutdownController::install(Box::new(move |event| {
            seen_tx.send(event).unwrap();
        }))
        .unwrap();

        let handle = controller.handle();
        handle.request();
        handle.request();
        controller.join();

        assert_eq!(
            seen_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            ShutdownEvent::Requested
        );
        assert!(seen_rx.try_recv().is_err());
    }

    #[test]
    fn notice_text() {
        assert_eq!(
            ShutdownEvent::Signal(SIGINT).to_string(),
            "Received interrupt signal. Exiting..."
        );
    }
}
