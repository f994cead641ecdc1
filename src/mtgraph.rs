/*! Multithreaded version of Graph, otherwise the same as graph.rs.
 */
use std::collections::BTreeMap;
use std::time::Instant;

use log::{debug, error, info, trace};

use crate::block::{Block, BlockRet};
use crate::graph::{CancellationToken, GraphRunner};
use crate::stream::StreamWait;
use crate::Result;

/// Lifetime-free summary of a `BlockRet`, for passing across the exit
/// monitor channel (a `BlockRet::WaitForStream` borrows from the block that
/// produced it, which doesn't outlive the loop iteration it's handled in).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Ok,
    Noop,
    EOF,
    OutputFull,
    Pending,
    InternalAwaiting,
}

impl From<&BlockRet<'_>> for Status {
    fn from(r: &BlockRet<'_>) -> Self {
        match r {
            BlockRet::Ok | BlockRet::Again => Status::Ok,
            BlockRet::Noop => Status::Noop,
            BlockRet::EOF => Status::EOF,
            BlockRet::OutputFull => Status::OutputFull,
            BlockRet::Pending => Status::Pending,
            // Not done, but no cross-thread state worth carrying either.
            BlockRet::WaitForStream(..) => Status::Pending,
            BlockRet::InternalAwaiting => Status::InternalAwaiting,
        }
    }
}

/**
A graph is a thing that this crate runs, to let blocks "talk to each
other" via streams.

# Example

```
use tnc::graph::GraphRunner;
use tnc::mtgraph::MTGraph;
use tnc::blocks::BinarySlicer;
let (slicer, _out) = BinarySlicer::new(tnc::stream::WriteStream::new().1);
let mut g = MTGraph::new();
g.add(Box::new(slicer));
g.run()?;
# Ok::<(), tnc::Error>(())
```
*/
pub struct MTGraph {
    blocks: Vec<Box<dyn Block + Send>>,
    cancel_token: CancellationToken,
    times: BTreeMap<(usize, String), std::time::Duration>,
}

impl MTGraph {
    /// Create a new flowgraph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            times: BTreeMap::new(),
            cancel_token: CancellationToken::new(),
        }
    }
}

impl GraphRunner for MTGraph {
    /// Add a block to the flowgraph.
    fn add(&mut self, b: Box<dyn Block + Send>) {
        self.blocks.push(b);
    }

    /// Run the graph until completion.
    fn run(&mut self) -> Result<()> {
        let (exit_monitor, em_tx) = {
            let cancel_token = self.cancel_token.clone();
            let block_count = self.blocks.len();
            let (tx, rx) = std::sync::mpsc::sync_channel::<(usize, Status)>(block_count.max(1));
            (
                std::thread::Builder::new()
                    .name("exit monitor".to_string())
                    .spawn(move || {
                        let mut status = vec![Status::Ok; block_count];
                        let mut first_phase = true;
                        while let Ok((index, s)) = rx.recv() {
                            let mut maybe_done = match s {
                                Status::Ok | Status::Pending | Status::OutputFull => {
                                    first_phase = true;
                                    false
                                }
                                Status::Noop | Status::EOF => true,
                                Status::InternalAwaiting => {
                                    panic!("InternalAwaiting should never be received")
                                }
                            };
                            status[index] = s;
                            if !maybe_done {
                                continue;
                            }
                            for si in &status {
                                match si {
                                    Status::Ok | Status::Pending | Status::OutputFull => {
                                        trace!("MTGraph exit monitor: not done, has state {si:?}");
                                        first_phase = true;
                                        maybe_done = false;
                                        break;
                                    }
                                    Status::Noop | Status::EOF => {}
                                    Status::InternalAwaiting => {
                                        maybe_done = false;
                                        break;
                                    }
                                }
                            }
                            if maybe_done {
                                if !first_phase {
                                    debug!("All blocks returning done in two phases.");
                                    break;
                                }
                                debug!(
                                    "First phase of done detection completed. Resetting for second phase."
                                );
                                first_phase = false;
                                for si in &mut status {
                                    if !matches!(si, Status::EOF) {
                                        *si = Status::InternalAwaiting;
                                    }
                                }
                            }
                        }
                        cancel_token.cancel();
                        while rx.recv().is_ok() {}
                    })?,
                tx,
            )
        };

        let st = Instant::now();
        let mut threads = Vec::new();
        let mut index = self.blocks.len();
        while let Some(mut b) = self.blocks.pop() {
            index -= 1;
            let cancel_token = self.cancel_token.clone();
            let em_tx = em_tx.clone();
            debug!("Starting thread {}", b.block_name());
            let th = std::thread::Builder::new()
                .name(b.block_name().to_string())
                .spawn(move || -> Result<std::time::Duration> {
                    let idle_sleep = std::time::Duration::from_millis(1);
                    let mut tt = std::time::Duration::new(0, 0);
                    while !cancel_token.is_canceled() {
                        let st = Instant::now();
                        let ret = b.work()?;
                        tt += st.elapsed();
                        em_tx
                            .send((index, Status::from(&ret)))
                            .expect("mpsc status send failed");
                        match ret {
                            BlockRet::Ok | BlockRet::Again => {}
                            BlockRet::EOF => return Ok(tt),
                            BlockRet::Noop | BlockRet::OutputFull | BlockRet::Pending => {
                                std::thread::sleep(idle_sleep);
                            }
                            BlockRet::WaitForStream(w, need) => {
                                w.wait(need);
                            }
                            BlockRet::InternalAwaiting => {
                                panic!("blocks must never return InternalAwaiting")
                            }
                        }
                    }
                    Ok(tt)
                });
            let th = match th {
                Err(e) => {
                    error!("Failed to spawn block thread: {e:?}");
                    self.cancel_token.cancel();
                    break;
                }
                Ok(x) => x,
            };
            threads.push(th);
        }
        drop(em_tx);
        debug!("Joining threads");
        for (n, th) in threads.into_iter().rev().enumerate() {
            let name = th.thread().name().unwrap().to_string();
            debug!("Waiting for {name}");
            let j = th
                .join()
                .expect("joining thread")
                .expect("block exit status");
            debug!("Thread {name} finished with {j:?}");
            self.times.insert((n, name), j);
        }
        exit_monitor.join().unwrap();
        for line in self.generate_stats(st.elapsed()).split('\n') {
            if !line.is_empty() {
                info!("{line}");
            }
        }
        Ok(())
    }

    /// Return a string with stats about where time went.
    fn generate_stats(&self, elapsed: std::time::Duration) -> String {
        let total = self
            .times
            .values()
            .sum::<std::time::Duration>()
            .as_secs_f64();
        let names: Vec<String> = self
            .times
            .keys()
            .map(|(n, name)| format!("{name}/{n}"))
            .collect();
        let ml = names.iter().map(|b| b.len()).max().unwrap_or(0);
        let ml = std::cmp::max(ml, "Elapsed seconds".len());
        let elapsed = elapsed.as_secs_f64();

        let dashes = "-".repeat(ml + 20) + "\n";
        let (secw, secd) = (10, 3);
        let (pw, pd) = (7, 2);

        let mut s: String = format!("{:<width$}    Seconds  Percent\n", "Block name", width = ml);
        s.push_str(&dashes);
        for (n, tt) in self.times.values().enumerate() {
            let name = &names[n];
            s.push_str(&format!(
                "{:<width$} {:secw$.secd$} {:>pw$.pd$}%\n",
                name,
                tt.as_secs_f32(),
                100.0 * tt.as_secs_f64() / total,
                width = ml,
            ));
        }
        s.push_str(&dashes);
        s.push_str(&format!(
            "{:<width$} {total:secw$.secd$} {:>pw$.pd$}%\n",
            "All blocks",
            100.0 * total / elapsed,
            width = ml,
        ));
        s.push_str(&format!(
            "{:<width$} {:secw$.secd$} {:>pw$.pd$}%\n",
            "Non-block time",
            elapsed - total,
            100.0 * (elapsed - total) / elapsed,
            width = ml,
        ));
        s.push_str(&format!(
            "{:<width$} {elapsed:secw$.secd$} {:>pw$.pd$}%\n",
            "Elapsed seconds",
            100.0,
            width = ml,
        ));
        s
    }

    /// Return a cancellation token, for asynchronously stopping the
    /// graph, for example if the user presses Ctrl-C.
    fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

impl Default for MTGraph {
    fn default() -> Self {
        Self::new()
    }
}
