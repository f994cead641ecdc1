/*! Graphs contain blocks connected by streams, and run them.

[`Graph`] runs every block on the calling thread, round-robin. For
anything bigger than a quick test or a single-channel offline run, prefer
[`crate::mtgraph::MTGraph`], which gives each block its own thread.
*/
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::block::{Block, BlockRet};
use crate::Result;

/// A handle that can be cloned and handed to e.g. a Ctrl-C handler, to
/// asynchronously stop a running graph.
#[derive(Clone, Default)]
pub struct CancellationToken {
    canceled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, not-yet-canceled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// True once `cancel()` has been called.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// Common interface of [`Graph`] and [`crate::mtgraph::MTGraph`].
pub trait GraphRunner {
    /// Add a block to the flowgraph.
    fn add(&mut self, b: Box<dyn Block + Send>);

    /// Run the graph until every block reports EOF (or the cancellation
    /// token is triggered).
    fn run(&mut self) -> Result<()>;

    /// Return a human readable breakdown of where time went.
    fn generate_stats(&self, elapsed: std::time::Duration) -> String;

    /// Return a token that can be used to stop the graph from another
    /// thread.
    fn cancel_token(&self) -> CancellationToken;
}

/// Single-threaded flowgraph runner.
///
/// Blocks are run in the order they were added, one `work()` call each, in
/// a loop. A block is considered "possibly done" once it returns `Noop` or
/// `EOF`; the graph stops once every block has reported that twice in a
/// row, matching the two-phase check `MTGraph` does across threads.
pub struct Graph {
    blocks: Vec<Box<dyn Block + Send>>,
    cancel_token: CancellationToken,
    times: Vec<(String, std::time::Duration)>,
}

impl Graph {
    /// Create a new, empty flowgraph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            cancel_token: CancellationToken::new(),
            times: Vec::new(),
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphRunner for Graph {
    fn add(&mut self, b: Box<dyn Block + Send>) {
        self.times.push((b.block_name().to_string(), std::time::Duration::new(0, 0)));
        self.blocks.push(b);
    }

    fn run(&mut self) -> Result<()> {
        let start = Instant::now();
        let idle_sleep = std::time::Duration::from_millis(1);
        let mut quiet_rounds = 0;
        loop {
            if self.cancel_token.is_canceled() {
                break;
            }
            let mut progressed = false;
            let mut all_eof = true;
            for (n, b) in self.blocks.iter_mut().enumerate() {
                let st = Instant::now();
                let ret = b.work()?;
                self.times[n].1 += st.elapsed();
                match ret {
                    BlockRet::Ok | BlockRet::Again => {
                        progressed = true;
                        all_eof = false;
                    }
                    BlockRet::EOF => {}
                    BlockRet::Noop | BlockRet::OutputFull | BlockRet::Pending => {
                        all_eof = false;
                    }
                    BlockRet::WaitForStream(w, need) => {
                        all_eof = false;
                        if !w.wait(need) {
                            progressed = true;
                        }
                    }
                    BlockRet::InternalAwaiting => {
                        panic!("blocks must never return InternalAwaiting")
                    }
                }
            }
            if all_eof {
                debug!("Graph: all blocks report EOF");
                break;
            }
            if progressed {
                quiet_rounds = 0;
            } else {
                quiet_rounds += 1;
                if quiet_rounds > 2 {
                    std::thread::sleep(idle_sleep);
                }
            }
        }
        for line in self.generate_stats(start.elapsed()).split('\n') {
            if !line.is_empty() {
                log::info!("{line}");
            }
        }
        Ok(())
    }

    fn generate_stats(&self, elapsed: std::time::Duration) -> String {
        let total = self
            .times
            .iter()
            .map(|(_, d)| *d)
            .sum::<std::time::Duration>()
            .as_secs_f64();
        let ml = self
            .times
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max("Elapsed seconds".len());
        let elapsed = elapsed.as_secs_f64();
        let mut s = format!("{:<ml$}    Seconds  Percent\n", "Block name");
        for (name, d) in &self.times {
            s.push_str(&format!(
                "{:<ml$} {:10.3} {:7.2}%\n",
                name,
                d.as_secs_f64(),
                100.0 * d.as_secs_f64() / total.max(f64::EPSILON),
            ));
        }
        s.push_str(&format!(
            "{:<ml$} {:10.3} {:7.2}%\n",
            "All blocks",
            total,
            100.0 * total / elapsed.max(f64::EPSILON),
        ));
        s.push_str(&format!("{:<ml$} {:10.3}\n", "Elapsed seconds", elapsed));
        s
    }

    fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}
