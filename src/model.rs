use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, error, info, trace};

use crate::debounce::Debouncer;
use crate::domain::{
    ListConfig, ListError, Message, PAGE_SIZE, Record, Route, SEARCH_DEBOUNCE_MS, SortKey,
};
use crate::inputter::{InputResult, Inputter};
use crate::source::RecordSource;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    Empty,
    Loading,
    Ready,
    Quitting,
}

/// Search, filter, sort and paging state over an in-memory list of records.
///
/// `rows` holds indices into `original` in display order, so the filtered view
/// can only ever be a subset of what was loaded. `visible` is the slice of
/// `rows` for the current page and is rebuilt by `paginate` at the
/// end of every operation that touches `rows` or `current_page`.
#[derive(Debug)]
pub struct ListView {
    original: Vec<Record>,
    rows: Vec<usize>,
    visible: Vec<usize>,
    search_term: String,
    effective_term: String,
    sort_key: Option<SortKey>,
    status_filter: Option<String>,
    current_page: usize,
    page_size: usize,
    debouncer: Debouncer,
    revision: u64,
}

impl Default for ListView {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl ListView {
    pub fn new(page_size: usize) -> Self {
        Self {
            original: Vec::new(),
            rows: Vec::new(),
            visible: Vec::new(),
            search_term: String::new(),
            effective_term: String::new(),
            sort_key: None,
            status_filter: None,
            current_page: 0,
            page_size: page_size.max(1),
            debouncer: Debouncer::new(Duration::from_millis(SEARCH_DEBOUNCE_MS)),
            revision: 0,
        }
    }

    /// Installs the loaded collection. Called once per mount.
    pub fn load(&mut self, records: Vec<Record>) {
        self.original = records;
        self.rows = (0..self.original.len()).collect();
        self.current_page = 0;
        self.revision += 1;
        self.paginate();
    }

    // -------------------- Intents ---------------------- //

    pub fn set_search_term(&mut self, text: impl Into<String>, now: Instant) {
        self.search_term = text.into();
        self.debouncer.arm(self.search_term.clone(), now);
    }

    /// Commits the debounced search term once it has settled. Returns true if
    /// the filtered rows were recomputed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.debouncer.poll(now) {
            Some(term) if term != self.effective_term => {
                self.effective_term = term;
                self.apply_search();
                true
            }
            Some(term) => {
                trace!("Settled search {term:?} is already effective");
                false
            }
            None => false,
        }
    }

    pub fn submit_search(&mut self) {
        self.debouncer.cancel();
        self.effective_term = self.search_term.clone();
        self.apply_search();
    }

    /// Re-orders the current rows, it does not go back to the full collection.
    pub fn select_sort(&mut self, key: SortKey) {
        self.clear_search_term();
        self.sort_key = Some(key);

        let original = &self.original;
        self.rows
            .sort_by(|&a, &b| original[a].field(key).cmp(original[b].field(key)));

        trace!("Sorted {} rows by {}", self.rows.len(), key.as_str());
        self.rows_changed();
    }

    pub fn select_status_filter(&mut self, status: Option<&str>) {
        self.clear_search_term();
        self.status_filter = status.map(str::to_string);

        self.rows = match status {
            Some(status) => {
                let wanted = status.to_lowercase();
                self.original
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.status.to_lowercase() == wanted)
                    .map(|(idx, _)| idx)
                    .collect()
            }
            None => (0..self.original.len()).collect(),
        };

        debug!(
            "Status filter {:?} kept {}/{} rows",
            self.status_filter,
            self.rows.len(),
            self.original.len()
        );
        self.rows_changed();
    }

    pub fn reset(&mut self) {
        self.clear_search_term();
        self.sort_key = None;
        self.status_filter = None;
        self.rows = (0..self.original.len()).collect();
        self.rows_changed();
    }

    /// Moves to page `n`, clamped to the existing pages.
    pub fn go_to_page(&mut self, n: usize) {
        let page = n.min(self.last_page_index());
        if page != n {
            debug!("Page {n} out of range, clamped to {page}");
        }
        self.current_page = page;
        self.paginate();
    }

    pub fn next_page(&mut self) {
        if self.has_next_page() {
            self.go_to_page(self.current_page + 1);
        }
    }

    pub fn previous_page(&mut self) {
        if self.has_previous_page() {
            self.go_to_page(self.current_page - 1);
        }
    }

    pub fn first_page(&mut self) {
        self.go_to_page(0);
    }

    pub fn last_page(&mut self) {
        self.go_to_page(self.last_page_index());
    }

    // -------------------- Derived state ---------------------- //

    pub fn visible(&self) -> Vec<&Record> {
        self.visible.iter().map(|&idx| &self.original[idx]).collect()
    }

    #[cfg(test)]
    pub fn filtered(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter().map(|&idx| &self.original[idx])
    }

    #[cfg(test)]
    pub fn original(&self) -> &[Record] {
        &self.original
    }

    pub fn filtered_len(&self) -> usize {
        self.rows.len()
    }

    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(self.page_size)
    }

    pub fn last_page_index(&self) -> usize {
        self.page_count().saturating_sub(1)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn has_previous_page(&self) -> bool {
        !self.rows.is_empty() && self.current_page > 0
    }

    pub fn has_next_page(&self) -> bool {
        !self.rows.is_empty() && self.current_page < self.last_page_index()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn sort_key(&self) -> Option<SortKey> {
        self.sort_key
    }

    pub fn status_filter(&self) -> Option<&str> {
        self.status_filter.as_deref()
    }

    pub fn search_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Time until a pending search settles, if one is pending.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.debouncer.remaining(now)
    }

    /// Bumped every time the filtered rows are recomputed.
    #[cfg(test)]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // -------------------- Internals ---------------------- //

    fn apply_search(&mut self) {
        let start_time = Instant::now();
        let prefix = self.effective_term.to_lowercase();
        self.status_filter = None;
        self.rows = self
            .original
            .iter()
            .enumerate()
            .filter(|(_, r)| r.name.to_lowercase().starts_with(&prefix))
            .map(|(idx, _)| idx)
            .collect();
        trace!(
            "Search {:?} matched {} rows in {}us",
            self.effective_term,
            self.rows.len(),
            start_time.elapsed().as_micros()
        );
        self.rows_changed();
    }

    // Clearing the box from another control must not schedule a search of its own.
    fn clear_search_term(&mut self) {
        self.debouncer.cancel();
        self.search_term.clear();
        self.effective_term.clear();
    }

    fn rows_changed(&mut self) {
        self.revision += 1;
        self.current_page = 0;
        self.paginate();
        trace!("Rows revision {}: {} rows", self.revision, self.rows.len());
    }

    fn paginate(&mut self) {
        if self.current_page > self.last_page_index() {
            self.current_page = self.last_page_index();
        }
        let start = (self.current_page * self.page_size).min(self.rows.len());
        let end = (start + self.page_size).min(self.rows.len());
        self.visible = self.rows[start..end].to_vec();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    /// One based position in the filtered list, continuing across pages.
    pub number: usize,
    pub record: Record,
}

/// Everything the UI needs to draw one frame.
#[derive(Debug, Clone)]
pub struct ListViewData {
    pub route: Route,
    pub status: Status,
    pub rows: Vec<RowView>,
    pub current_page: usize,
    pub page_count: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub total_rows: usize,
    pub search_input: InputResult,
    pub search_active: bool,
    pub search_pending: bool,
    pub sort_key: Option<SortKey>,
    pub status_filter: Option<String>,
    pub show_help: bool,
    pub status_message: String,
    pub width: usize,
    pub height: usize,
}

type LoadResult = Result<Vec<Record>, ListError>;

/// A fetch running on its worker thread.
struct PendingLoad {
    receiver: Receiver<LoadResult>,
    started: Instant,
}

pub struct Model {
    config: ListConfig,
    pub status: Status,
    route: Route,
    list: ListView,
    source: Option<Box<dyn RecordSource>>,
    origin: String,
    loading: Option<PendingLoad>,
    input: Inputter,
    active_cmdinput: bool,
    show_help: bool,
    status_message: String,
    width: usize,
    height: usize,
}

impl Model {
    pub fn init(config: &ListConfig, source: Box<dyn RecordSource>) -> Self {
        Self {
            config: config.clone(),
            status: Status::Empty,
            route: Route::Login,
            list: ListView::default(),
            origin: source.describe(),
            source: Some(source),
            loading: None,
            input: Inputter::default(),
            active_cmdinput: false,
            show_help: false,
            status_message: "Started userlist!".to_string(),
            width: 0,
            height: 0,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    #[cfg(test)]
    pub fn list(&self) -> &ListView {
        &self.list
    }

    /// Blocks until a running fetch has delivered its result.
    #[cfg(test)]
    pub fn finish_loading(&mut self) {
        if let Some(pending) = self.loading.take() {
            let result = pending.receiver.recv().unwrap_or_else(|_| {
                Err(ListError::InvalidConfig("loader thread vanished".to_string()))
            });
            self.apply_load(result, pending.started);
        }
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    /// While the search box has focus every key goes to it unmapped.
    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.list.next_deadline(now)
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    pub fn update(&mut self, message: Option<Message>, now: Instant) -> Result<(), ListError> {
        self.poll_load();

        // The debounce deadline can pass while other keys are being handled.
        if self.list.tick(now) {
            self.after_search_commit();
        }

        let Some(msg) = message else {
            return Ok(());
        };

        if self.show_help {
            match msg {
                Message::Quit => self.quit(),
                Message::Help | Message::Exit => self.show_help = false,
                Message::Resize(width, height) => self.resize(width, height),
                _ => (),
            }
            return Ok(());
        }

        match self.route {
            Route::Login => match msg {
                Message::Quit => self.quit(),
                Message::Help => self.show_help = true,
                Message::Navigate(route) => self.navigate(route),
                Message::Resize(width, height) => self.resize(width, height),
                _ => (),
            },
            Route::Edit if self.active_cmdinput => match msg {
                Message::Quit => self.quit(),
                Message::RawKey(key) => self.raw_input(key, now),
                Message::Resize(width, height) => self.resize(width, height),
                _ => (),
            },
            Route::Edit => match msg {
                Message::Quit => self.quit(),
                Message::Help => self.show_help = true,
                Message::Navigate(route) => self.navigate(route),
                Message::Resize(width, height) => self.resize(width, height),
                Message::FocusSearch => self.focus_search(),
                Message::SubmitSearch => self.submit_search(),
                Message::CycleSort => match SortKey::cycle(self.list.sort_key()) {
                    Some(key) => self.sort(key),
                    None => self.reset(),
                },
                Message::Sort(key) => self.sort(key),
                Message::Filter(status) => self.filter(status.as_deref()),
                Message::Reset => self.reset(),
                Message::PreviousPage => self.list.previous_page(),
                Message::NextPage => self.list.next_page(),
                Message::FirstPage => self.list.first_page(),
                Message::LastPage => self.list.last_page(),
                Message::GoToPage(page) => self.list.go_to_page(page),
                _ => (),
            },
        }
        Ok(())
    }

    pub fn view_data(&self) -> ListViewData {
        let offset = self.list.current_page() * self.list.page_size();
        let rows = self
            .list
            .visible()
            .into_iter()
            .enumerate()
            .map(|(i, record)| RowView {
                number: offset + i + 1,
                record: record.clone(),
            })
            .collect();

        ListViewData {
            route: self.route,
            status: self.status,
            rows,
            current_page: self.list.current_page(),
            page_count: self.list.page_count(),
            has_previous: self.list.has_previous_page(),
            has_next: self.list.has_next_page(),
            total_rows: self.list.filtered_len(),
            search_input: self.input.get(),
            search_active: self.active_cmdinput,
            search_pending: self.list.search_pending(),
            sort_key: self.list.sort_key(),
            status_filter: self.list.status_filter().map(str::to_string),
            show_help: self.show_help,
            status_message: self.status_message.clone(),
            width: self.width,
            height: self.height,
        }
    }

    // -------------------- Control handling functions ---------------------- //

    fn navigate(&mut self, route: Route) {
        info!("Navigate {} -> {}", self.route.path(), route.path());
        self.route = route;
        if route == Route::Edit {
            self.mount();
        }
    }

    /// Starts the one and only fetch on a worker thread. The result is picked
    /// up by `poll_load`; a failed fetch leaves the list empty and is not retried.
    fn mount(&mut self) {
        let Some(source) = self.source.take() else {
            return;
        };
        self.status = Status::Loading;
        self.set_status_message(format!("Loading users from {} ...", self.origin));

        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            // The model may be gone by the time the fetch returns.
            let _ = sender.send(source.fetch());
        });
        self.loading = Some(PendingLoad {
            receiver,
            started: Instant::now(),
        });
    }

    fn poll_load(&mut self) {
        let Some(pending) = &self.loading else {
            return;
        };
        let result = match pending.receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err(ListError::InvalidConfig(
                "loader thread ended without a result".to_string(),
            )),
        };
        let started = pending.started;
        self.loading = None;
        self.apply_load(result, started);
    }

    fn apply_load(&mut self, result: LoadResult, started: Instant) {
        let origin = self.origin.clone();
        match result {
            Ok(records) => {
                let count = records.len();
                self.list.load(records);
                self.status = Status::Ready;
                self.set_status_message(format!(
                    "Loaded {count} users from {origin} in {}ms",
                    started.elapsed().as_millis()
                ));
            }
            Err(e) => {
                error!("Error loading users from {origin}: {e}");
                self.status = Status::Empty;
                self.set_status_message(format!("Could not load users: {e}"));
            }
        }
    }

    fn resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.width, width, self.height, height
        );
        self.width = width;
        self.height = height;
    }

    fn focus_search(&mut self) {
        self.active_cmdinput = true;
        self.set_status_message("Type to search by name, Enter to submit, Esc to clear");
    }

    fn raw_input(&mut self, key: KeyEvent, now: Instant) {
        let before = self.input.get().input;
        let result = self.input.read(key);

        if result.finished {
            self.active_cmdinput = false;
            self.input.reset_flags();
            if result.canceled {
                // Esc empties the box, which settles into showing everything.
                if !before.is_empty() {
                    self.list.set_search_term("", now);
                }
                self.set_status_message("Search cleared");
            } else {
                self.submit_search();
            }
        } else if result.input != before {
            self.list.set_search_term(result.input, now);
        }
    }

    fn submit_search(&mut self) {
        self.list.submit_search();
        self.after_search_commit();
    }

    fn after_search_commit(&mut self) {
        let term = self.list.search_term().to_string();
        self.set_status_message(format!(
            "{} users matching \"{term}\"",
            self.list.filtered_len()
        ));
    }

    fn sort(&mut self, key: SortKey) {
        self.list.select_sort(key);
        self.sync_search_box();
        self.set_status_message(format!("Sorted by {}", key.as_str()));
    }

    fn filter(&mut self, status: Option<&str>) {
        self.list.select_status_filter(status);
        self.sync_search_box();
        match status {
            Some(s) => self.set_status_message(format!(
                "{} {s} users",
                self.list.filtered_len()
            )),
            None => self.set_status_message("Status filter cleared"),
        }
    }

    fn reset(&mut self) {
        self.list.reset();
        self.sync_search_box();
        self.set_status_message("Reset search, sort and filter");
    }

    fn sync_search_box(&mut self) {
        if self.input.get().input != self.list.search_term() {
            self.input.set(self.list.search_term());
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        debug!("Status: {}", self.status_message);
    }
}
