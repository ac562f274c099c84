use std::collections::HashSet;

use crate::board::ThreadRef;
use crate::scan::Term;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub count: usize,
    pub thread: ThreadRef,
}

#[derive(Debug, Clone)]
struct TermResults {
    term: Term,
    entries: Vec<ResultEntry>,
}

/// Ranked hits per term, in configured term order. Every configured term has
/// a list, possibly empty.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    terms: Vec<TermResults>,
}

impl ResultSet {
    /// A result set with one empty list per term, shown before the first
    /// sweep has finished or after the first one failed.
    pub fn empty(terms: &[Term]) -> Self {
        Self {
            terms: terms
                .iter()
                .map(|term| TermResults {
                    term: term.clone(),
                    entries: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn term_at(&self, index: usize) -> Option<&Term> {
        self.terms.get(index).map(|results| &results.term)
    }

    pub fn entries_at(&self, index: usize) -> &[ResultEntry] {
        self.terms
            .get(index)
            .map(|results| results.entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn entries(&self, term: &str) -> Option<&[ResultEntry]> {
        let wanted = Term::new(term);
        self.terms
            .iter()
            .find(|results| results.term == wanted)
            .map(|results| results.entries.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Term, &[ResultEntry])> {
        self.terms
            .iter()
            .map(|results| (&results.term, results.entries.as_slice()))
    }

    /// Threads listed across all terms; a thread matching two terms counts
    /// twice.
    pub fn total_entries(&self) -> usize {
        self.terms.iter().map(|results| results.entries.len()).sum()
    }

    /// Sum of every recorded occurrence count.
    pub fn total_occurrences(&self) -> usize {
        self.iter()
            .flat_map(|(_, entries)| entries)
            .map(|entry| entry.count)
            .sum()
    }
}

/// Accumulates scan results during a sweep. Not shared between threads: the
/// crawl coordinator owns it and feeds it one scan at a time, so the
/// "already recorded?" check and the append always happen together.
#[derive(Debug)]
pub struct ResultSetBuilder {
    lists: Vec<BuilderList>,
}

#[derive(Debug)]
struct BuilderList {
    term: Term,
    entries: Vec<(usize, ResultEntry)>,
    seen: HashSet<ThreadRef>,
}

impl ResultSetBuilder {
    pub fn new(terms: &[Term]) -> Self {
        Self {
            lists: terms
                .iter()
                .map(|term| BuilderList {
                    term: term.clone(),
                    entries: Vec::new(),
                    seen: HashSet::new(),
                })
                .collect(),
        }
    }

    /// Records one thread's counts, aligned with the term order. `discovered`
    /// is the thread's discovery sequence and breaks ranking ties. Returns the
    /// number of term lists that gained an entry.
    pub fn record(&mut self, discovered: usize, thread: &ThreadRef, counts: &[usize]) -> usize {
        let mut added = 0;
        for (list, &count) in self.lists.iter_mut().zip(counts) {
            if count == 0 || !list.seen.insert(thread.clone()) {
                continue;
            }
            list.entries.push((
                discovered,
                ResultEntry {
                    count,
                    thread: thread.clone(),
                },
            ));
            added += 1;
        }
        added
    }

    /// Sorts every list by count, highest first, then by discovery order.
    pub fn finish(self) -> ResultSet {
        let terms = self
            .lists
            .into_iter()
            .map(|mut list| {
                list.entries
                    .sort_by(|(seq_a, a), (seq_b, b)| b.count.cmp(&a.count).then(seq_a.cmp(seq_b)));
                TermResults {
                    term: list.term,
                    entries: list.entries.into_iter().map(|(_, entry)| entry).collect(),
                }
            })
            .collect();
        ResultSet { terms }
    }
}
