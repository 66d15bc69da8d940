use std::panic::{self, PanicHookInfo};
use std::thread;

use tracing::error;

type Hook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Sends panic reports to the log file while alive. The default hook writes
/// to stderr, which lands on the alternate screen in raw mode.
pub struct PanicLog {
    previous: Option<Hook>,
}

impl PanicLog {
    pub fn install() -> Self {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(|info| {
            let current = thread::current();
            error!(
                thread = current.name().unwrap_or("<unnamed>"),
                panic = %info,
                "panic"
            );
        }));
        Self {
            previous: Some(previous),
        }
    }
}

impl Drop for PanicLog {
    fn drop(&mut self) {
        // set_hook panics when called from a panicking thread.
        if thread::panicking() {
            return;
        }
        if let Some(previous) = self.previous.take() {
            panic::set_hook(previous);
        }
    }
}
