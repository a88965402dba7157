//! Virtual-Timer Alarm.
//!
//! The alarm turns a host periodic timer into calls to a bounded, ordered list of
//! zero-argument handlers. It provides:
//! 1. **Registry:** `AlarmBuilder` collects up to [`MAX_HANDLER`] handlers before start.
//! 2. **Host Source:** `SIGVTALRM` from an `ITIMER_VIRTUAL` interval timer at [`TIMER_HZ`].
//! 3. **Manual Source:** A `TickInjector` for deterministic, signal-free tick delivery.
//! 4. **Delivery:** `Alarm::poll` runs every handler once per pending tick, in registration
//!    order.
//!
//! # Tick delivery
//!
//! Handlers never run inside the signal handler. The signal handler only bumps an atomic
//! pending-tick counter; the simulation loop calls [`Alarm::poll`] at a safe point (before
//! fetching the next instruction) and the handlers run there. Tick frequency and handler
//! order are exact; the moment a handler observes a tick is deferred to the next poll.
//!
//! Only one host alarm may be armed per process. Starting a second one fails with
//! [`AlarmError::AlreadyArmed`] instead of silently replacing the first.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::common::constants::{MAX_HANDLER, TIMER_HZ};
use crate::common::error::AlarmError;

/// A periodic handler: no arguments, no result.
pub type AlarmHandler = Box<dyn FnMut() + Send>;

/// Interval timer period in microseconds.
pub const fn interval_usec() -> u64 {
    1_000_000 / TIMER_HZ as u64
}

/// Interval between ticks.
pub const fn tick_interval() -> Duration {
    Duration::from_micros(interval_usec())
}

/// Handler registry, populated during device setup.
///
/// Registration is only possible here; [`AlarmBuilder::start`] consumes the builder, so the
/// running [`Alarm`] can never gain or lose handlers.
#[derive(Default)]
pub struct AlarmBuilder {
    handlers: Vec<AlarmHandler>,
}

impl fmt::Debug for AlarmBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlarmBuilder")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl AlarmBuilder {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: Vec::with_capacity(MAX_HANDLER),
        }
    }

    /// Appends a handler.
    ///
    /// # Errors
    ///
    /// Returns [`AlarmError::RegistryFull`] if [`MAX_HANDLER`] handlers are already
    /// registered. The rejected handler is dropped; existing handlers are untouched.
    pub fn add_handler<F>(&mut self, handler: F) -> Result<(), AlarmError>
    where
        F: FnMut() + Send + 'static,
    {
        if self.handlers.len() >= MAX_HANDLER {
            return Err(AlarmError::RegistryFull {
                capacity: MAX_HANDLER,
            });
        }
        self.handlers.push(Box::new(handler));
        Ok(())
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Installs the `SIGVTALRM` handler and arms the virtual interval timer.
    ///
    /// # Errors
    ///
    /// * [`AlarmError::AlreadyArmed`] if another host alarm is live in this process.
    /// * [`AlarmError::SignalHandler`] if `sigaction` fails.
    /// * [`AlarmError::Timer`] if `setitimer` fails.
    pub fn start(self) -> Result<Alarm, AlarmError> {
        let timer = host::HostTimer::arm()?;
        info!(
            hz = TIMER_HZ,
            handlers = self.handlers.len(),
            "virtual alarm armed"
        );
        Ok(Alarm {
            handlers: self.handlers,
            source: TickSource::Host { _timer: timer },
            ticks: 0,
        })
    }

    /// Starts the alarm without touching host signals.
    ///
    /// Ticks are produced only through the returned [`TickInjector`].
    pub fn start_manual(self) -> (Alarm, TickInjector) {
        let pending = Arc::new(AtomicU64::new(0));
        let alarm = Alarm {
            handlers: self.handlers,
            source: TickSource::Manual(Arc::clone(&pending)),
            ticks: 0,
        };
        (alarm, TickInjector(pending))
    }
}

/// Where pending ticks come from.
enum TickSource {
    Host { _timer: host::HostTimer },
    Manual(Arc<AtomicU64>),
}

impl TickSource {
    fn take(&self) -> u64 {
        match self {
            Self::Host { .. } => host::take_pending(),
            Self::Manual(pending) => pending.swap(0, Ordering::AcqRel),
        }
    }
}

/// A running alarm with a frozen handler list.
pub struct Alarm {
    handlers: Vec<AlarmHandler>,
    source: TickSource,
    ticks: u64,
}

impl fmt::Debug for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            TickSource::Host { .. } => "host",
            TickSource::Manual(_) => "manual",
        };
        f.debug_struct("Alarm")
            .field("handlers", &self.handlers.len())
            .field("source", &source)
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl Alarm {
    /// Delivers every tick that arrived since the last poll.
    ///
    /// For each pending tick, every handler runs exactly once, in registration order.
    ///
    /// # Returns
    ///
    /// The number of ticks delivered by this call.
    pub fn poll(&mut self) -> u64 {
        let pending = self.source.take();
        if pending == 0 {
            return 0;
        }
        for _ in 0..pending {
            for handler in &mut self.handlers {
                handler();
            }
        }
        self.ticks += pending;
        debug!(pending, total = self.ticks, "alarm ticks delivered");
        pending
    }

    /// Total ticks delivered since start.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Produces ticks for an alarm started with [`AlarmBuilder::start_manual`].
#[derive(Debug, Clone)]
pub struct TickInjector(Arc<AtomicU64>);

impl TickInjector {
    /// Queues `n` ticks for the next [`Alarm::poll`].
    pub fn fire(&self, n: u64) {
        let _ = self.0.fetch_add(n, Ordering::AcqRel);
    }
}

#[cfg(unix)]
mod host {
    use std::io;
    use std::mem;
    use std::ptr;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    use super::interval_usec;
    use crate::common::error::AlarmError;

    /// Ticks raised by the signal handler and not yet polled.
    static PENDING: AtomicU64 = AtomicU64::new(0);
    /// Set while a `HostTimer` is live.
    static ARMED: AtomicBool = AtomicBool::new(false);

    /// `SIGVTALRM` handler. Must stay async-signal-safe: one atomic add, nothing else.
    extern "C" fn on_sigvtalrm(_signum: libc::c_int) {
        let _ = PENDING.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn take_pending() -> u64 {
        PENDING.swap(0, Ordering::AcqRel)
    }

    /// Ownership token for the process-wide signal handler and interval timer.
    pub(super) struct HostTimer(());

    impl HostTimer {
        pub(super) fn arm() -> Result<Self, AlarmError> {
            if ARMED
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Err(AlarmError::AlreadyArmed);
            }
            PENDING.store(0, Ordering::Release);

            let handler = on_sigvtalrm as extern "C" fn(libc::c_int) as libc::sighandler_t;
            if let Err(e) = set_action(handler) {
                ARMED.store(false, Ordering::Release);
                return Err(AlarmError::SignalHandler(e));
            }
            if let Err(e) = set_timer(interval_usec()) {
                let _ = set_action(libc::SIG_IGN);
                ARMED.store(false, Ordering::Release);
                return Err(AlarmError::Timer(e));
            }
            Ok(Self(()))
        }
    }

    impl Drop for HostTimer {
        /// Disarms the timer. `SIGVTALRM` is left ignored so a signal already in flight
        /// cannot take the default (terminating) action.
        fn drop(&mut self) {
            let _ = set_timer(0);
            let _ = set_action(libc::SIG_IGN);
            PENDING.store(0, Ordering::Release);
            ARMED.store(false, Ordering::Release);
        }
    }

    fn set_action(handler: libc::sighandler_t) -> io::Result<()> {
        // SAFETY: an all-zero `sigaction` is a valid value (no flags, empty mask); the
        // fields that matter are filled in below.
        let mut action: libc::sigaction = unsafe { mem::zeroed() };
        action.sa_sigaction = handler;
        action.sa_flags = libc::SA_RESTART;
        // SAFETY: `sa_mask` is a valid, exclusively borrowed `sigset_t`.
        let _ = unsafe { libc::sigemptyset(&mut action.sa_mask) };
        // SAFETY: `action` is fully initialized; the old action is not requested.
        let ret = unsafe { libc::sigaction(libc::SIGVTALRM, &action, ptr::null_mut()) };
        if ret == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    /// Arms (or, with `usec == 0`, disarms) the virtual interval timer.
    fn set_timer(usec: u64) -> io::Result<()> {
        let period = libc::timeval {
            tv_sec: (usec / 1_000_000) as libc::time_t,
            tv_usec: (usec % 1_000_000) as libc::suseconds_t,
        };
        let it = libc::itimerval {
            it_interval: period,
            it_value: period,
        };
        // SAFETY: `it` is a valid `itimerval`; the old value is not requested.
        let ret = unsafe { libc::setitimer(libc::ITIMER_VIRTUAL, &it, ptr::null_mut()) };
        if ret == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(not(unix))]
mod host {
    use std::io;

    use crate::common::error::AlarmError;

    pub(super) fn take_pending() -> u64 {
        0
    }

    pub(super) struct HostTimer(());

    impl HostTimer {
        pub(super) fn arm() -> Result<Self, AlarmError> {
            Err(AlarmError::Timer(io::Error::new(
                io::ErrorKind::Unsupported,
                "virtual interval timers need a unix host",
            )))
        }
    }
}
