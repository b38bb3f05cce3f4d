use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Done,
    Cancel,
}

/// Handed to whoever performs the redraw. Completing it, or dropping it,
/// lets the scheduler arm the next firing.
#[derive(Debug)]
pub struct RedrawTicket {
    signal: mpsc::Sender<Signal>,
}

impl RedrawTicket {
    pub fn complete(self) {}
}

impl Drop for RedrawTicket {
    fn drop(&mut self) {
        let _ = self.signal.send(Signal::Done);
    }
}

/// Single-slot retriggering timer on its own thread.
///
/// Each firing waits `interval`, hands a ticket to `fire`, then waits for
/// that ticket to come back before arming again, so a slow redraw delays the
/// next one instead of queueing more. `fire` returns false once nobody is
/// listening, which stops the thread.
pub struct RefreshScheduler {
    control: mpsc::Sender<Signal>,
    join: Option<thread::JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn start<F>(interval: Duration, mut fire: F) -> Self
    where
        F: FnMut(RedrawTicket) -> bool + Send + 'static,
    {
        let (control, control_rx) = mpsc::channel::<Signal>();
        let ticket_signal = control.clone();
        let join = thread::spawn(move || loop {
            match control_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(Signal::Done) => continue,
                Ok(Signal::Cancel) | Err(RecvTimeoutError::Disconnected) => break,
            }
            let ticket = RedrawTicket {
                signal: ticket_signal.clone(),
            };
            if !fire(ticket) {
                break;
            }
            match control_rx.recv() {
                Ok(Signal::Done) => {}
                Ok(Signal::Cancel) | Err(_) => break,
            }
        });
        Self {
            control,
            join: Some(join),
        }
    }

    pub fn is_running(&self) -> bool {
        self.join.is_some()
    }

    /// Blocks until the timer thread has exited; no firing can happen after
    /// this returns, even if a ticket is still outstanding.
    pub fn cancel(&mut self) {
        let _ = self.control.send(Signal::Cancel);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
