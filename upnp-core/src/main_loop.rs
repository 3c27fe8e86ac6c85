//! Explicit event-loop handle with a whole-process deadline
//!
//! `MainLoop` replaces a module-level loop singleton: the component that runs
//! the program owns it, hands out [`LoopHandle`]s to whatever needs to spawn
//! work or stop the loop, and decides when `run()` returns.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use upnp_core::main_loop::{LoopExit, MainLoop};
//!
//! # async fn example() {
//! let main_loop = MainLoop::new().with_deadline(Duration::from_secs(10));
//! let handle = main_loop.handle();
//!
//! handle.spawn(async move {
//!     // talk to services until done, then:
//!     // handle.quit();
//! });
//!
//! match main_loop.run().await {
//!     LoopExit::Quit => println!("stopped"),
//!     LoopExit::DeadlineReached => println!("deadline"),
//! }
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Why [`MainLoop::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A handle called [`LoopHandle::quit`]
    Quit,
    /// The whole-process deadline elapsed
    DeadlineReached,
}

/// Owner of the event loop lifecycle
pub struct MainLoop {
    handle: LoopHandle,
    quit_rx: watch::Receiver<bool>,
    deadline: Option<Duration>,
}

/// Clonable handle for spawning work on, and stopping, a [`MainLoop`]
#[derive(Clone)]
pub struct LoopHandle {
    quit_tx: Arc<watch::Sender<bool>>,
    tasks: Arc<Mutex<Tasks>>,
}

/// Tasks owned by the loop; `stopped` once `run()` has aborted them
#[derive(Default)]
struct Tasks {
    running: Vec<JoinHandle<()>>,
    stopped: bool,
}

impl MainLoop {
    pub fn new() -> Self {
        let (quit_tx, quit_rx) = watch::channel(false);
        Self {
            handle: LoopHandle {
                quit_tx: Arc::new(quit_tx),
                tasks: Arc::new(Mutex::new(Tasks::default())),
            },
            quit_rx,
            deadline: None,
        }
    }

    /// Terminate the loop unconditionally once `deadline` has elapsed
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Run until quit or deadline, then abort every task spawned through a
    /// handle
    ///
    /// Aborting is best effort: a remote peer mid-request is not told.
    pub async fn run(self) -> LoopExit {
        let MainLoop {
            handle,
            mut quit_rx,
            deadline,
        } = self;
        tracing::info!(?deadline, "Main loop started");

        let quit = async move {
            loop {
                if *quit_rx.borrow_and_update() {
                    return;
                }
                if quit_rx.changed().await.is_err() {
                    // Sender lives in our own handle, so this never fires
                    std::future::pending::<()>().await;
                }
            }
        };

        let exit = match deadline {
            Some(deadline) => tokio::select! {
                _ = quit => LoopExit::Quit,
                _ = tokio::time::sleep(deadline) => LoopExit::DeadlineReached,
            },
            None => {
                quit.await;
                LoopExit::Quit
            }
        };

        let aborted = handle.abort_all();
        tracing::info!(?exit, aborted, "Main loop stopped");
        exit
    }
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopHandle {
    /// Spawn a task that is aborted when the loop stops
    ///
    /// Returns `false` without spawning once the loop has stopped.
    pub fn spawn<F>(&self, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        if tasks.stopped {
            tracing::debug!("Main loop stopped, refusing to spawn");
            return false;
        }
        tasks.running.retain(|t| !t.is_finished());
        tasks.running.push(tokio::spawn(future));
        true
    }

    /// Ask the loop to stop
    pub fn quit(&self) {
        self.quit_tx.send_replace(true);
    }

    pub fn is_quitting(&self) -> bool {
        *self.quit_tx.borrow()
    }

    fn abort_all(&self) -> usize {
        let mut tasks = self.tasks.lock();
        tasks.stopped = true;
        let running = tasks.running.iter().filter(|t| !t.is_finished()).count();
        for task in tasks.running.drain(..) {
            task.abort();
        }
        running
    }
}
