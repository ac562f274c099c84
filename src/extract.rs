use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::board::ThreadId;

static THREAD_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"id="t([0-9]+)""#).expect("thread marker pattern is valid"));

/// Thread ids found on an index page, in order of first appearance.
pub fn thread_ids(body: &str) -> Vec<ThreadId> {
    let mut seen = HashSet::new();
    THREAD_MARKER
        .captures_iter(body)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
        .filter(|id| seen.insert(*id))
        .map(ThreadId)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_thread_markers_in_order() {
        let body = r#"<div class="thread" id="t42"></div><div id="t7"><a id="p7"></a></div>"#;
        assert_eq!(thread_ids(body), vec![ThreadId(42), ThreadId(7)]);
    }

    #[test]
    fn repeated_markers_are_reported_once() {
        let body = r#"<div id="t5"></div><span id="t5"></span><div id="t6"></div>"#;
        assert_eq!(thread_ids(body), vec![ThreadId(5), ThreadId(6)]);
    }

    #[test]
    fn ignores_empty_and_non_numeric_markers() {
        let body = r#"<div id="t"></div><div id="tx1"></div><div id="p12"></div>"#;
        assert!(thread_ids(body).is_empty());
    }

    #[test]
    fn ignores_ids_that_overflow() {
        let body = r#"<div id="t99999999999999999999999"></div><div id="t3"></div>"#;
        assert_eq!(thread_ids(body), vec![ThreadId(3)]);
    }

    #[test]
    fn empty_page_has_no_threads() {
        assert!(thread_ids("").is_empty());
    }
}
