//! Scanning multiple record files on a worker pool.
//!
//! Streams are fully independent, so each file gets its own cursor,
//! correlator state, and sink, and runs as one job on a rayon pool. Results
//! come back in submission order through an iterator.
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver};
use rand::{rngs::StdRng, SeedableRng};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::chanmap::ChannelMap;
use crate::correlator::{Correlator, EventSink, ScanStats};
use crate::event::{MAX_SCINT_COINCIDENCES, MAX_THICK_COINCIDENCES};
use crate::Result;

/// Per-file scan totals.
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub path: PathBuf,
    pub stats: ScanStats,
}

/// Scans a batch of record files in parallel.
///
/// # Example
/// ```no_run
/// use sirius::{ChannelMap, CorrelatedEvent, ScanPool};
///
/// let map = ChannelMap::from_infos([]).unwrap();
/// let summaries = ScanPool::builder()
///     .map(map)
///     .build()
///     .scan(
///         vec!["run042.data".into(), "run043.data".into()],
///         |_path| Vec::<CorrelatedEvent>::new(),
///     );
/// for zult in summaries {
///     let summary = zult.unwrap();
///     println!("{}: {} events", summary.path.display(), summary.stats.events);
/// }
/// ```
#[derive(TypedBuilder)]
pub struct ScanPool {
    /// Channel metadata table shared by every file
    map: ChannelMap,
    /// Coincidence window half-width in nanoseconds
    #[builder(default = 1000)]
    window_ns: i64,
    #[builder(default = MAX_THICK_COINCIDENCES)]
    max_thick: usize,
    #[builder(default = MAX_SCINT_COINCIDENCES)]
    max_scint: usize,
    /// Number of worker threads; rayon's default when unset
    #[builder(default)]
    num_threads: Option<usize>,
}

impl ScanPool {
    const DEFAULT_BUFFER_SIZE: usize = 1024;

    /// Scan each file on the pool, building a fresh sink per file with
    /// `make_sink`. The returned iterator yields one [FileSummary] per
    /// file, in the order given, blocking until each is ready.
    ///
    /// # Panics
    /// If the background thread or the pool could not be started.
    pub fn scan<F, S>(
        self,
        paths: Vec<PathBuf>,
        make_sink: F,
    ) -> impl Iterator<Item = Result<FileSummary>>
    where
        F: Fn(&Path) -> S + Send + Sync + 'static,
        S: EventSink,
    {
        let (jobs_tx, jobs_rx) = bounded(Self::DEFAULT_BUFFER_SIZE);

        let handle = thread::Builder::new()
            .name("sirius_scan".into())
            .spawn(move || {
                let pool = {
                    let mut pool = rayon::ThreadPoolBuilder::new();
                    if let Some(num) = self.num_threads {
                        pool = pool.num_threads(num);
                    }
                    pool
                }
                .build()
                .expect("failed to construct scan pool with requested number of threads");

                let make_sink = Arc::new(make_sink);
                for path in paths {
                    let (future_tx, future_rx) = bounded(1);

                    let map = self.map.clone();
                    let make_sink = make_sink.clone();
                    let (window_ns, max_thick, max_scint) =
                        (self.window_ns, self.max_thick, self.max_scint);
                    pool.spawn_fifo(move || {
                        let zult = scan_file(
                            &path,
                            map,
                            window_ns,
                            max_thick,
                            max_scint,
                            make_sink.as_ref(),
                        );
                        if future_tx.send(zult).is_err() {
                            debug!("failed to send file summary");
                        }
                    });

                    if let Err(err) = jobs_tx.send(future_rx) {
                        debug!("failed to send summary future: {err}");
                    }
                }
            })
            .expect("failed to spawn scan thread");

        SummaryIter {
            jobs: jobs_rx,
            handle: Some(handle),
        }
    }
}

fn scan_file<F, S>(
    path: &Path,
    map: ChannelMap,
    window_ns: i64,
    max_thick: usize,
    max_scint: usize,
    make_sink: &F,
) -> Result<FileSummary>
where
    F: Fn(&Path) -> S,
    S: EventSink,
{
    debug!(path = %path.display(), "scanning");
    let file = File::open(path)?;
    let mut sink = make_sink(path);
    let mut correlator = Correlator::builder()
        .map(map)
        .window_ns(window_ns)
        .max_thick(max_thick)
        .max_scint(max_scint)
        .rng(StdRng::from_entropy())
        .build();
    let stats = correlator.scan(BufReader::new(file), &mut sink)?;
    debug!(
        path = %path.display(),
        hits = stats.hits,
        events = stats.events,
        "scan done"
    );
    Ok(FileSummary {
        path: path.to_path_buf(),
        stats,
    })
}

struct SummaryIter {
    jobs: Receiver<Receiver<Result<FileSummary>>>,
    handle: Option<JoinHandle<()>>,
}

impl Iterator for SummaryIter {
    type Item = Result<FileSummary>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.jobs.recv() {
            Err(_) => {
                self.handle
                    .take()
                    .expect("bad state, handle should not be None")
                    .join()
                    .expect("scan thread panicked");
                None
            }
            Ok(rx) => Some(rx.recv().expect("failed to receive file summary")),
        }
    }
}
