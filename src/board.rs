use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://boards.4chan.org";
pub const DEFAULT_PAGE_COUNT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board(String);

impl Board {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A thread addressed by board and numeric id. Two refs are equal when both
/// parts match; the canonical URL is derived from them and carried along so
/// the browser never has to rebuild it.
#[derive(Debug, Clone)]
pub struct ThreadRef {
    pub board: Board,
    pub id: ThreadId,
    url: String,
}

impl ThreadRef {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PartialEq for ThreadRef {
    fn eq(&self, other: &Self) -> bool {
        self.board == other.board && self.id == other.id
    }
}

impl Eq for ThreadRef {}

impl std::hash::Hash for ThreadRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.board.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPage<'a> {
    pub board: &'a Board,
    pub number: usize,
}

/// Address scheme of a board site: `<base>/<board>` for the first index page,
/// `<base>/<board>/<n>` for the following ones and `<base>/<board>/thread/<id>`
/// for threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    base: String,
}

impl Site {
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url).with_context(|| format!("parse base url {base_url:?}"))?;
        anyhow::ensure!(
            matches!(parsed.scheme(), "http" | "https"),
            "base url {base_url:?} must use http or https"
        );
        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn board_url(&self, board: &Board) -> String {
        format!("{}/{}", self.base, board)
    }

    pub fn index_url(&self, page: IndexPage<'_>) -> String {
        if page.number <= 1 {
            self.board_url(page.board)
        } else {
            format!("{}/{}/{}", self.base, page.board, page.number)
        }
    }

    /// Index pages of a board in crawl order: the root, then 2..=count.
    pub fn index_pages<'a>(&self, board: &'a Board, count: usize) -> Vec<IndexPage<'a>> {
        (1..=count.max(1))
            .map(|number| IndexPage { board, number })
            .collect()
    }

    pub fn thread(&self, board: &Board, id: ThreadId) -> ThreadRef {
        ThreadRef {
            board: board.clone(),
            id,
            url: format!("{}/{}/thread/{}", self.base, board, id),
        }
    }
}

impl Default for Site {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_pages_cover_root_and_numbered_pages() {
        let site = Site::default();
        let board = Board::new("b");
        let urls: Vec<String> = site
            .index_pages(&board, DEFAULT_PAGE_COUNT)
            .into_iter()
            .map(|page| site.index_url(page))
            .collect();
        assert_eq!(urls.len(), 10);
        assert_eq!(urls[0], "https://boards.4chan.org/b");
        assert_eq!(urls[1], "https://boards.4chan.org/b/2");
        assert_eq!(urls[9], "https://boards.4chan.org/b/10");
    }

    #[test]
    fn zero_pages_still_visits_the_root() {
        let site = Site::default();
        let board = Board::new("g");
        assert_eq!(site.index_pages(&board, 0).len(), 1);
    }

    #[test]
    fn thread_refs_compare_on_board_and_id() {
        let site = Site::new("http://example.test/").unwrap();
        let a = site.thread(&Board::new("x"), ThreadId(10));
        let b = site.thread(&Board::new("x"), ThreadId(10));
        let c = site.thread(&Board::new("y"), ThreadId(10));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.url(), "http://example.test/x/thread/10");
    }

    #[test]
    fn rejects_non_http_base() {
        assert!(Site::new("ftp://example.test").is_err());
        assert!(Site::new("not a url").is_err());
    }
}
