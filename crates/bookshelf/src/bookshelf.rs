//! Main Bookshelf struct and public API.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{BookshelfError, Result};
use crate::input::{Sheet, SourceKind, SourceMetadata};
use crate::intake::IntakeFields;
use crate::loader::{DataLoader, LoadedData, SheetApiClient, SheetSource};
use crate::relay::{BookAction, BookInfo, NotificationRelay, RelayResponse, RelayTransport};
use crate::report::StatusSummary;
use crate::schema::{normalize, LoanLogSchema};
use crate::status::{
    derive_loan_state_at, loan_history_at, DerivedCatalog, HistoryEntry, LibraryEntry, LoanState,
};
use crate::table::{CatalogFilter, SortDirection, TableId, TableState, TableView};

/// Build the loader described by `settings`: the sheet API when a backend
/// URL is set, CSV files in `data_dir` otherwise or on failure.
pub fn data_loader(settings: &Settings) -> Result<DataLoader> {
    let loader = DataLoader::new(&settings.data_dir)
        .with_sheet_names(&settings.loan_sheet, &settings.catalog_sheet);

    match settings.backend_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => Ok(loader.with_source(SheetApiClient::new(url)?)),
        None => Ok(loader),
    }
}

/// Where the current data came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadInfo {
    pub source: SourceKind,
    pub metadata: Vec<SourceMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_error: Option<String>,
}

/// A loaded library: both tables, the derived catalog and the active filter.
pub struct Bookshelf {
    settings: Settings,
    loan_log: Sheet,
    catalog: DerivedCatalog,
    loans: TableState,
    books: TableState,
    filter: CatalogFilter,
    info: LoadInfo,
}

impl Bookshelf {
    /// Load data as configured by `settings`.
    pub async fn load(settings: Settings) -> Result<Self> {
        let loader = data_loader(&settings)?;
        Self::load_with(settings, &loader).await
    }

    /// Load data through an explicit loader.
    pub async fn load_with<S: SheetSource>(settings: Settings, loader: &DataLoader<S>) -> Result<Self> {
        let data = loader.load().await?;
        Self::from_data(settings, data)
    }

    /// Build from already loaded sheets.
    pub fn from_data(settings: Settings, data: LoadedData) -> Result<Self> {
        Self::from_data_at(settings, data, Local::now().naive_local())
    }

    /// [`Bookshelf::from_data`] with classifications computed against `now`.
    pub fn from_data_at(settings: Settings, data: LoadedData, now: NaiveDateTime) -> Result<Self> {
        Self::assemble(settings, data, CatalogFilter::default(), now)
    }

    /// Replace both sheets with freshly loaded ones.
    ///
    /// The active catalog filter is re-applied; search queries and the
    /// current page are reset.
    pub fn replace_data(&mut self, data: LoadedData, now: NaiveDateTime) -> Result<()> {
        *self = Self::assemble(self.settings.clone(), data, self.filter, now)?;
        Ok(())
    }

    fn assemble(settings: Settings, data: LoadedData, filter: CatalogFilter, now: NaiveDateTime) -> Result<Self> {
        let log_schema = LoanLogSchema::resolve(&data.loan_log.header)?;
        let catalog = derive_loan_state_at(&data.loan_log, data.catalog, now)?;

        let mut loans = TableState::with_page_size(TableId::Loans, settings.page_size)
            .with_status_column(Some(log_schema.status));
        loans.render(
            data.loan_log.header.clone(),
            data.loan_log.rows.iter().cloned().map(LibraryEntry::plain).collect(),
            false,
        );

        let books = TableState::with_page_size(TableId::Catalog, settings.page_size)
            .with_status_column(Some(catalog.schema.status))
            .with_wrap_columns(catalog.schema.wrap_columns());

        let mut shelf = Self {
            settings,
            loan_log: data.loan_log,
            catalog,
            loans,
            books,
            filter: CatalogFilter::default(),
            info: LoadInfo {
                source: data.source,
                metadata: data.metadata,
                fallback_error: data.fallback_error,
            },
        };

        if let Err(e) = shelf.apply_filter_at(filter, now) {
            debug!(error = %e, "Dropping catalog filter the new data cannot satisfy");
            shelf.apply_filter_at(CatalogFilter::default(), now)?;
        }

        info!(
            source = %shelf.info.source,
            loans = shelf.loan_log.row_count(),
            books = shelf.catalog.entries.len(),
            on_loan = shelf.catalog.on_loan().count(),
            "Library loaded"
        );
        Ok(shelf)
    }

    /// Reload through `loader`, returning the circulation changes since the
    /// previous load.
    pub async fn reload_with<S: SheetSource>(&mut self, loader: &DataLoader<S>) -> Result<Vec<(BookAction, BookInfo)>> {
        let data = loader.load().await?;
        let previous = self.catalog.clone();
        self.replace_data(data, Local::now().naive_local())?;
        Ok(circulation_changes(&previous, &self.catalog))
    }

    /// Reload as configured by the current settings.
    pub async fn reload(&mut self) -> Result<Vec<(BookAction, BookInfo)>> {
        let loader = data_loader(&self.settings)?;
        self.reload_with(&loader).await
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn load_info(&self) -> &LoadInfo {
        &self.info
    }

    pub fn loan_log(&self) -> &Sheet {
        &self.loan_log
    }

    /// The canonical derived catalog, independent of sorting and filters.
    pub fn catalog(&self) -> &DerivedCatalog {
        &self.catalog
    }

    pub fn filter(&self) -> CatalogFilter {
        self.filter
    }

    pub fn table(&self, id: TableId) -> &TableState {
        match id {
            TableId::Loans => &self.loans,
            TableId::Catalog => &self.books,
        }
    }

    pub fn table_mut(&mut self, id: TableId) -> &mut TableState {
        match id {
            TableId::Loans => &mut self.loans,
            TableId::Catalog => &mut self.books,
        }
    }

    /// Filter the catalog table. Returns the number of rows shown.
    pub fn apply_filter(&mut self, filter: CatalogFilter) -> Result<usize> {
        self.apply_filter_at(filter, Local::now().naive_local())
    }

    /// [`Bookshelf::apply_filter`] against an explicit `now`.
    pub fn apply_filter_at(&mut self, filter: CatalogFilter, now: NaiveDateTime) -> Result<usize> {
        let rows = filter.apply_at(&self.catalog, now)?;
        let count = rows.len();
        self.books.render(self.catalog.header.clone(), rows, true);
        self.filter = filter;
        debug!(?filter, rows = count, "Applied catalog filter");
        Ok(count)
    }

    /// Recompute every classification against `now` and re-render the
    /// catalog table with the active filter.
    pub fn refresh_at(&mut self, now: NaiveDateTime) -> Result<usize> {
        self.catalog.refresh_at(now);
        self.apply_filter_at(self.filter, now)
    }

    pub fn sort(&mut self, id: TableId, column: usize) -> Option<SortDirection> {
        self.table_mut(id).sort(column)
    }

    pub fn search(&mut self, id: TableId, query: &str) -> usize {
        self.table_mut(id).search(query)
    }

    pub fn go_to_page(&mut self, id: TableId, page: usize) -> usize {
        self.table_mut(id).go_to_page(page)
    }

    /// The displayed page of a table. Catalog rows carry their intake link.
    pub fn view(&self, id: TableId) -> TableView {
        match id {
            TableId::Loans => self.loans.page_view(|_| None),
            TableId::Catalog => {
                let schema = &self.catalog.schema;
                let form = &self.settings.intake;
                self.books.page_view(|entry| Some(form.link_for(entry, schema)))
            }
        }
    }

    /// Every loan log row for `code`, classified.
    pub fn history(&self, code: &str) -> Result<Vec<HistoryEntry>> {
        loan_history_at(&self.loan_log, code, Local::now().naive_local())
    }

    /// Pre-filled intake link for the book with `code`.
    pub fn intake_link(&self, code: &str) -> Result<String> {
        let entry = self.catalog.find(code).ok_or_else(|| {
            BookshelfError::EmptyData(format!("No book with code '{}' in the catalog", code))
        })?;
        Ok(self.settings.intake.link_for(entry, &self.catalog.schema))
    }

    /// Fields pre-filled for the book with `code`.
    pub fn intake_fields(&self, code: &str) -> Option<IntakeFields> {
        self.catalog
            .find(code)
            .map(|entry| IntakeFields::from_entry(entry, &self.catalog.schema))
    }

    pub fn add_book_link(&self) -> &str {
        self.settings.intake.add_book_link()
    }

    pub fn summary(&self) -> StatusSummary {
        StatusSummary::from_catalog(&self.catalog)
    }

    /// Markdown status report as of now.
    pub fn report_markdown(&self) -> String {
        self.summary().to_markdown(Local::now().naive_local())
    }

    /// Build the status report and publish it to the wiki page.
    pub async fn sync_report<T: RelayTransport>(&self, relay: &NotificationRelay<T>) -> Result<Option<RelayResponse>> {
        publish_report(relay, &self.report_markdown()).await
    }
}

/// Publish an already built report to the wiki page.
pub async fn publish_report<T: RelayTransport>(relay: &NotificationRelay<T>, content: &str) -> Result<Option<RelayResponse>> {
    info!(length = content.chars().count(), "Publishing status report");
    relay.update_wiki(content).await
}

/// Books whose loan state changed between two loads.
pub fn circulation_changes(previous: &DerivedCatalog, current: &DerivedCatalog) -> Vec<(BookAction, BookInfo)> {
    let schema = &current.schema;
    let optional = |entry: &LibraryEntry, column: Option<usize>| {
        column.map(|c| entry.cell(c).to_string()).unwrap_or_default()
    };

    current
        .entries
        .iter()
        .filter_map(|entry| {
            let code = normalize(entry.cell(schema.code));
            let before = previous.find(&code).and_then(|e| e.status.as_ref()).map(|s| &s.state);
            let after = entry.status.as_ref().map(|s| &s.state);

            let action = match (before, after) {
                (Some(LoanState::OnLoan { .. }), Some(LoanState::Overdue { .. })) => BookAction::Overdue,
                (Some(LoanState::OnLoan { .. } | LoanState::Overdue { .. }), Some(LoanState::Returned)) => {
                    BookAction::Return
                }
                (Some(LoanState::OnLoan { .. } | LoanState::Overdue { .. }), _) => return None,
                (_, Some(LoanState::OnLoan { .. } | LoanState::Overdue { .. })) => BookAction::Borrow,
                _ => return None,
            };

            let borrower = match action {
                BookAction::Return => previous
                    .find(&code)
                    .map(|e| e.cell(previous.schema.borrower).to_string())
                    .unwrap_or_default(),
                _ => entry.cell(schema.borrower).to_string(),
            };

            Some((
                action,
                BookInfo {
                    code,
                    title: optional(entry, schema.title),
                    author: optional(entry, schema.author),
                    borrower,
                },
            ))
        })
        .collect()
}
