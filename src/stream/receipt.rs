use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::tensor::FillReport;
use crate::utils::error::{PaginatedError, Result};
use crate::utils::expect_msg::ExpectMsg;

type Slot = Arc<(Mutex<Option<Result<FillReport>>>, Condvar)>;

/// Producer side of one ingestion unit: resolves once the actor has run the
/// fill algorithm on it, or with [`PaginatedError::StreamClosed`] if the unit
/// was dropped unprocessed.
pub struct Receipt {
    state: Slot,
}

/// Actor side of a [`Receipt`]. Dropping it without completing resolves the
/// receipt as closed, so a waiter can never block forever.
pub(crate) struct Completer {
    state: Option<Slot>,
}

pub(crate) fn receipt() -> (Receipt, Completer) {
    let state: Slot = Arc::new((Mutex::new(None), Condvar::new()));
    (
        Receipt {
            state: Arc::clone(&state),
        },
        Completer { state: Some(state) },
    )
}

impl Receipt {
    pub fn is_complete(&self) -> bool {
        self.state
            .0
            .lock()
            .expect_msg("Failed to acquire receipt lock")
            .is_some()
    }

    /// Block until the unit has been processed.
    pub fn wait(self) -> Result<FillReport> {
        let (lock, cvar) = &*self.state;
        let mut result = lock.lock().expect_msg("Failed to acquire receipt lock");
        while result.is_none() {
            result = cvar.wait(result).expect_msg("Failed to wait on receipt");
        }
        result.take().expect_msg("Receipt resolved without a result")
    }

    /// Like [`Receipt::wait`], but gives the receipt back if `timeout` elapses first.
    pub fn wait_timeout(self, timeout: Duration) -> std::result::Result<Result<FillReport>, Self> {
        let taken = {
            let (lock, cvar) = &*self.state;
            let guard = lock.lock().expect_msg("Failed to acquire receipt lock");
            let (mut result, _) = cvar
                .wait_timeout_while(guard, timeout, |result| result.is_none())
                .expect_msg("Failed to wait on receipt");
            result.take()
        };

        match taken {
            Some(result) => Ok(result),
            None => Err(self),
        }
    }
}

impl Completer {
    pub(crate) fn complete(mut self, result: Result<FillReport>) {
        if let Some(state) = self.state.take() {
            Self::resolve(&state, result);
        }
    }

    fn resolve(state: &Slot, result: Result<FillReport>) {
        let (lock, cvar) = &**state;
        *lock.lock().expect_msg("Failed to acquire receipt lock") = Some(result);
        cvar.notify_all();
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            // may run while unwinding from a panicked actor
            if let Ok(mut slot) = state.0.lock() {
                *slot = Some(Err(PaginatedError::StreamClosed));
                state.1.notify_all();
            }
        }
    }
}
