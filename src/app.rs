use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{self, Config};
use crate::crawler::{CrawlPlan, Crawler};
use crate::fetch::{self, HttpFetcher};
use crate::logging;
use crate::results::ResultSet;
use crate::ui;
use crate::viewer;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

fn load_config(opts: &RunOptions) -> Result<(Config, CrawlPlan)> {
    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    let plan = CrawlPlan::from_config(&cfg.crawl)?;
    Ok((cfg, plan))
}

fn build_crawler(cfg: &Config, plan: CrawlPlan) -> Result<Crawler> {
    let fetcher = HttpFetcher::new(fetch::ClientConfig {
        user_agent: cfg.crawl.user_agent.clone(),
        timeout: Some(cfg.crawl.timeout),
        http_client: None,
    })
    .context("build http client")?;
    Ok(Crawler::new(Arc::new(fetcher), plan))
}

fn init_logging(opts: &RunOptions) {
    let Some(path) = opts.log_file.clone().or_else(logging::default_log_path) else {
        return;
    };
    if let Err(err) = logging::init(&path) {
        eprintln!("warning: logging disabled: {err:#}");
    }
}

/// Interactive browser: sweeps once, then lets the operator browse and
/// refresh until they leave.
pub fn run(opts: RunOptions) -> Result<()> {
    let (cfg, plan) = load_config(&opts)?;
    init_logging(&opts);
    info!(version = crate::VERSION, "starting browser");

    let viewer = viewer::from_config(&cfg.viewer).context("configure viewer")?;
    let crawler = build_crawler(&cfg, plan)?;
    let mut model = ui::Model::new(ui::Options { crawler, viewer });
    model.run()
}

/// Headless sweep: crawls once and prints the ranked results.
pub fn run_once<W: Write>(opts: RunOptions, out: &mut W) -> Result<()> {
    let (cfg, plan) = load_config(&opts)?;
    init_logging(&opts);

    let crawler = build_crawler(&cfg, plan)?;
    let sweep = crawler
        .crawl()
        .inspect_err(|err| warn!(error = %err, "headless sweep failed"))?;
    write_results(&sweep.results, out)?;
    Ok(())
}

/// Validates the effective configuration and prints it as YAML.
pub fn check_config<W: Write>(opts: RunOptions, out: &mut W) -> Result<()> {
    let (cfg, plan) = load_config(&opts)?;
    viewer::from_config(&cfg.viewer).context("configure viewer")?;
    write!(out, "{}", config::to_yaml(&cfg)?)?;
    writeln!(
        out,
        "# {} boards x {} pages, {} terms, {} workers",
        plan.boards.len(),
        plan.pages,
        plan.terms.len(),
        plan.workers
    )?;
    Ok(())
}

pub fn write_results<W: Write>(results: &ResultSet, out: &mut W) -> Result<()> {
    for (term, entries) in results.iter() {
        writeln!(out, "{} | {}", entries.len(), term)?;
        for entry in entries {
            writeln!(out, "    {} | {}", entry.count, entry.thread)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Site, ThreadId};
    use crate::results::ResultSetBuilder;
    use crate::scan::Term;

    #[test]
    fn writes_ranked_results_per_term() {
        let terms = vec![Term::new("Foo"), Term::new("Bar")];
        let site = Site::default();
        let mut builder = ResultSetBuilder::new(&terms);
        builder.record(0, &site.thread(&Board::new("b"), ThreadId(1)), &[1, 0]);
        builder.record(1, &site.thread(&Board::new("b"), ThreadId(2)), &[4, 0]);

        let mut out = Vec::new();
        write_results(&builder.finish(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2 | Foo\n    4 | https://boards.4chan.org/b/thread/2\n    1 | https://boards.4chan.org/b/thread/1\n0 | Bar\n"
        );
    }
}
