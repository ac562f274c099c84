use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use tracing::{debug, info, warn};

use crate::board::{Board, IndexPage, Site, ThreadId, ThreadRef, DEFAULT_PAGE_COUNT};
use crate::config::{ConfigError, CrawlConfig};
use crate::extract;
use crate::fetch::{FetchError, Fetcher};
use crate::results::{ResultSet, ResultSetBuilder};
use crate::scan::{self, Term};

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("sweep aborted: {0}")]
    Connectivity(#[from] FetchError),
}

/// What one sweep covers. Built from configuration once per process.
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    pub site: Site,
    pub boards: Vec<Board>,
    pub terms: Vec<Term>,
    pub pages: usize,
    pub workers: usize,
}

impl CrawlPlan {
    pub fn new(site: Site, boards: Vec<Board>, terms: Vec<Term>) -> Self {
        Self {
            site,
            boards,
            terms,
            pages: DEFAULT_PAGE_COUNT,
            workers: default_workers(),
        }
    }

    pub fn from_config(cfg: &CrawlConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let site = Site::new(&cfg.base_url).map_err(|err| ConfigError::BaseUrl {
            url: cfg.base_url.clone(),
            message: format!("{err:#}"),
        })?;
        let workers = if cfg.workers == 0 {
            default_workers()
        } else {
            cfg.workers
        };
        Ok(Self {
            site,
            boards: cfg.boards.iter().map(|name| Board::new(name.trim())).collect(),
            terms: cfg.terms.iter().map(|text| Term::new(text.as_str())).collect(),
            pages: cfg.pages,
            workers,
        })
    }
}

fn default_workers() -> usize {
    num_cpus::get().max(1)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages_fetched: usize,
    pub pages_skipped: usize,
    pub threads_discovered: usize,
    pub threads_scanned: usize,
    pub threads_skipped: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct Sweep {
    pub results: ResultSet,
    pub stats: CrawlStats,
}

pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    plan: CrawlPlan,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn Fetcher>, plan: CrawlPlan) -> Self {
        Self { fetcher, plan }
    }

    pub fn plan(&self) -> &CrawlPlan {
        &self.plan
    }

    pub fn terms(&self) -> &[Term] {
        &self.plan.terms
    }

    /// Runs one full sweep. A connectivity failure anywhere aborts the sweep
    /// and discards everything gathered so far.
    pub fn crawl(&self) -> Result<Sweep, CrawlError> {
        let started = Instant::now();
        let mut stats = CrawlStats::default();
        info!(
            boards = self.plan.boards.len(),
            terms = self.plan.terms.len(),
            pages = self.plan.pages,
            workers = self.plan.workers,
            "starting sweep"
        );

        let threads = self.discover_threads(&mut stats)?;
        stats.threads_discovered = threads.len();
        debug!(threads = threads.len(), "discovered threads");

        let mut builder = ResultSetBuilder::new(&self.plan.terms);
        let jobs: Vec<&ThreadRef> = threads.iter().collect();
        self.run_pool(
            jobs,
            |thread| {
                let page = self.fetcher.fetch(thread.url())?;
                if !page.is_success() {
                    debug!(url = thread.url(), status = page.status, "skipping thread");
                    return Ok(None);
                }
                Ok(Some(scan::scan(&page.body, &self.plan.terms)))
            },
            |seq, counts| match counts {
                Some(counts) => {
                    stats.threads_scanned += 1;
                    builder.record(seq, &threads[seq], &counts);
                }
                None => stats.threads_skipped += 1,
            },
        )
        .inspect_err(|err| warn!(error = %err, "sweep aborted"))?;

        let results = builder.finish();
        stats.elapsed = started.elapsed();
        info!(
            scanned = stats.threads_scanned,
            skipped_pages = stats.pages_skipped,
            skipped_threads = stats.threads_skipped,
            entries = results.total_entries(),
            occurrences = results.total_occurrences(),
            elapsed = ?stats.elapsed,
            "sweep finished"
        );
        Ok(Sweep { results, stats })
    }

    /// Fetches every index page and returns the distinct threads they list,
    /// in discovery order: board, then page, then position on the page.
    fn discover_threads(&self, stats: &mut CrawlStats) -> Result<Vec<ThreadRef>, CrawlError> {
        let site = &self.plan.site;
        let pages: Vec<IndexPage<'_>> = self
            .plan
            .boards
            .iter()
            .flat_map(|board| site.index_pages(board, self.plan.pages))
            .collect();

        let mut found: Vec<Option<Vec<ThreadId>>> = vec![None; pages.len()];
        self.run_pool(
            pages.clone(),
            |page| {
                let url = site.index_url(page);
                let fetched = self.fetcher.fetch(&url)?;
                if !fetched.is_success() {
                    debug!(url = %url, status = fetched.status, "skipping index page");
                    return Ok(None);
                }
                Ok(Some(extract::thread_ids(&fetched.body)))
            },
            |index, ids| match ids {
                Some(ids) => {
                    stats.pages_fetched += 1;
                    found[index] = Some(ids);
                }
                None => stats.pages_skipped += 1,
            },
        )
        .inspect_err(|err| warn!(error = %err, "sweep aborted during discovery"))?;

        let mut seen = HashSet::new();
        let mut threads = Vec::new();
        for (page, ids) in pages.iter().zip(found) {
            for id in ids.unwrap_or_default() {
                let thread = site.thread(page.board, id);
                if seen.insert(thread.clone()) {
                    threads.push(thread);
                }
            }
        }
        Ok(threads)
    }

    /// Runs `work` over `jobs` on a bounded pool of scoped threads and hands
    /// each output to `collect` on the calling thread, tagged with the job's
    /// position. The first error stops workers from taking new jobs; outputs
    /// that arrive after it are dropped.
    fn run_pool<J, R, W, C>(&self, jobs: Vec<J>, work: W, mut collect: C) -> Result<(), CrawlError>
    where
        J: Send,
        R: Send,
        W: Fn(J) -> Result<R, FetchError> + Sync,
        C: FnMut(usize, R),
    {
        if jobs.is_empty() {
            return Ok(());
        }
        let workers = self.plan.workers.clamp(1, jobs.len());

        let (job_tx, job_rx) = unbounded();
        for job in jobs.into_iter().enumerate() {
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let (result_tx, result_rx) = unbounded();
        let cancelled = AtomicBool::new(false);

        thread::scope(|scope| {
            for _ in 0..workers {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                let cancelled = &cancelled;
                let work = &work;
                scope.spawn(move || {
                    for (index, job) in jobs.iter() {
                        if cancelled.load(Ordering::SeqCst) {
                            break;
                        }
                        let outcome = work(job);
                        if outcome.is_err() {
                            cancelled.store(true, Ordering::SeqCst);
                        }
                        if results.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            let mut failure: Option<FetchError> = None;
            for (index, outcome) in result_rx.iter() {
                match outcome {
                    Ok(output) if failure.is_none() => collect(index, output),
                    Ok(_) => {}
                    Err(err) => {
                        if failure.is_none() {
                            failure = Some(err);
                        }
                    }
                }
            }
            match failure {
                Some(err) => Err(CrawlError::Connectivity(err)),
                None => Ok(()),
            }
        })
    }
}
