//! SIGINT delivery to the shutdown supervisor.
//!
//! Lives in its own test binary because it installs a process-wide SIGINT
//! handler and raises the signal.

use pipesh::shutdown::{ShutdownController, ShutdownEvent};
use signal_hook::consts::SIGINT;
use std::sync::mpsc;
use std::time::Duration;

#[test]
fn interrupt_reaches_supervisor_policy() {
    let (tx, rx) = mpsc::channel();
    let controller = ShutdownController::install(Box::new(move |event| {
        tx.send(event).unwrap();
    }))
    .unwrap();

    signal_hook::low_level::raise(SIGINT).unwrap();

    let event = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("supervisor never saw the signal");
    assert_eq!(event, ShutdownEvent::Signal(SIGINT));
    controller.join();
}
