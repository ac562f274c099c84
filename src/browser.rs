//! Two-level menu over a [`ResultSet`]: the top level lists the search terms
//! with their hit counts plus an Exit row, the second level lists the ranked
//! threads of one term.
//!
//! The menu never keeps references into the result set. Every call receives
//! the current set, so a refresh can swap it out between inputs; call
//! [`Menu::reconcile`] after doing so.

use crate::results::ResultSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Up,
    Down,
    Select,
    Back,
    Refresh,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Refresh,
    Open(String),
    Quit,
}

/// Position on the top level. The Exit row is its own variant so "no term
/// selected" never has to be inferred from an out-of-range index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopCursor {
    Term(usize),
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    TopMenu(TopCursor),
    Drill { term: usize, index: usize },
    Exited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub text: String,
    pub count: Option<usize>,
}

impl Row {
    pub fn label(&self) -> String {
        match self.count {
            Some(count) => format!("{count} | {}", self.text),
            None => self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuView {
    pub title: String,
    pub rows: Vec<Row>,
    pub selected: usize,
}

pub const EXIT_LABEL: &str = "Exit";

#[derive(Debug, Clone)]
pub struct Menu {
    state: MenuState,
}

impl Default for Menu {
    fn default() -> Self {
        Self::new()
    }
}

impl Menu {
    pub fn new() -> Self {
        Self {
            state: MenuState::TopMenu(TopCursor::Term(0)),
        }
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn is_exited(&self) -> bool {
        self.state == MenuState::Exited
    }

    /// Top-level row index, counting the Exit row as the last one.
    fn top_row(cursor: TopCursor, terms: usize) -> usize {
        match cursor {
            TopCursor::Term(index) => index.min(terms),
            TopCursor::Exit => terms,
        }
    }

    fn cursor_at(row: usize, terms: usize) -> TopCursor {
        if row >= terms {
            TopCursor::Exit
        } else {
            TopCursor::Term(row)
        }
    }

    pub fn handle(&mut self, input: Input, results: &ResultSet) -> Action {
        if input == Input::Exit && self.state != MenuState::Exited {
            self.state = MenuState::Exited;
            return Action::Quit;
        }

        match self.state {
            MenuState::Exited => Action::None,
            MenuState::TopMenu(cursor) => self.handle_top(cursor, input, results),
            MenuState::Drill { term, index } => self.handle_drill(term, index, input, results),
        }
    }

    fn handle_top(&mut self, cursor: TopCursor, input: Input, results: &ResultSet) -> Action {
        let terms = results.len();
        let row = Self::top_row(cursor, terms);
        match input {
            Input::Up => {
                self.state = MenuState::TopMenu(Self::cursor_at(row.saturating_sub(1), terms));
                Action::None
            }
            Input::Down => {
                self.state = MenuState::TopMenu(Self::cursor_at((row + 1).min(terms), terms));
                Action::None
            }
            Input::Select => match Self::cursor_at(row, terms) {
                TopCursor::Exit => {
                    self.state = MenuState::Exited;
                    Action::Quit
                }
                TopCursor::Term(term) => {
                    if !results.entries_at(term).is_empty() {
                        self.state = MenuState::Drill { term, index: 0 };
                    }
                    Action::None
                }
            },
            Input::Refresh => Action::Refresh,
            Input::Back | Input::Exit => Action::None,
        }
    }

    fn handle_drill(&mut self, term: usize, index: usize, input: Input, results: &ResultSet) -> Action {
        let entries = results.entries_at(term);
        if entries.is_empty() {
            self.state = MenuState::TopMenu(Self::cursor_at(term, results.len()));
            return match input {
                Input::Refresh => Action::Refresh,
                _ => Action::None,
            };
        }
        let last = entries.len() - 1;
        let index = index.min(last);
        match input {
            Input::Up => {
                self.state = MenuState::Drill {
                    term,
                    index: index.saturating_sub(1),
                };
                Action::None
            }
            Input::Down => {
                self.state = MenuState::Drill {
                    term,
                    index: (index + 1).min(last),
                };
                Action::None
            }
            Input::Select => Action::Open(entries[index].thread.url().to_string()),
            Input::Back => {
                self.state = MenuState::TopMenu(Self::cursor_at(term, results.len()));
                Action::None
            }
            Input::Refresh => Action::Refresh,
            Input::Exit => Action::None,
        }
    }

    /// Brings the state back within bounds after the result set was
    /// replaced. A thread list that became empty sends the menu back to the
    /// term's row on the top level.
    pub fn reconcile(&mut self, results: &ResultSet) {
        let terms = results.len();
        self.state = match self.state {
            MenuState::Exited => MenuState::Exited,
            MenuState::TopMenu(cursor) => {
                MenuState::TopMenu(Self::cursor_at(Self::top_row(cursor, terms), terms))
            }
            MenuState::Drill { term, index } => {
                let entries = results.entries_at(term);
                if entries.is_empty() {
                    MenuState::TopMenu(Self::cursor_at(term, terms))
                } else {
                    MenuState::Drill {
                        term,
                        index: index.min(entries.len() - 1),
                    }
                }
            }
        };
    }

    /// Rows to draw for the current state, recomputed from the live set.
    pub fn view(&self, results: &ResultSet) -> MenuView {
        match self.state {
            MenuState::TopMenu(cursor) => top_view(results, Self::top_row(cursor, results.len())),
            MenuState::Drill { term, index } => {
                let entries = results.entries_at(term);
                if entries.is_empty() {
                    return top_view(results, term.min(results.len()));
                }
                let title = results
                    .term_at(term)
                    .map(|t| format!("Threads mentioning \"{t}\""))
                    .unwrap_or_default();
                MenuView {
                    title,
                    rows: entries
                        .iter()
                        .map(|entry| Row {
                            text: entry.thread.url().to_string(),
                            count: Some(entry.count),
                        })
                        .collect(),
                    selected: index.min(entries.len() - 1),
                }
            }
            MenuState::Exited => MenuView {
                title: String::new(),
                rows: Vec::new(),
                selected: 0,
            },
        }
    }
}

fn top_view(results: &ResultSet, selected: usize) -> MenuView {
    let mut rows: Vec<Row> = results
        .iter()
        .map(|(term, entries)| Row {
            text: term.to_string(),
            count: Some(entries.len()),
        })
        .collect();
    rows.push(Row {
        text: EXIT_LABEL.to_string(),
        count: None,
    });
    MenuView {
        title: "Search terms".to_string(),
        rows,
        selected,
    }
}
