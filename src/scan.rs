//! Paginated Scanner
//!
//! Full-table read as one lazy sequence, fetched a page at a time.
//!
//! ## Keyset Pagination
//! The scanner keeps the row id of the last row it emitted and asks for
//! "rows with row id > cursor, ascending, limit page_size". A page
//! transition costs the same no matter how far into the table the scan is.
//! An empty page ends the scan, so a table holding an exact multiple of the
//! page size costs one trailing empty query.
//!
//! ## Consistency
//! Every page re-queries the live table; there is no snapshot. Rows inserted
//! during a scan show up if their row id lies beyond the cursor, rows deleted
//! before their page is fetched are skipped. Row ids are never reused and
//! updates keep the row id, so no key is emitted twice by one scan.

use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::codec::Serializer;
use crate::connection::StoreConnection;
use crate::error::Result;
use crate::table::{Row, RowId};

/// Forward-only, non-restartable scan over every `(key, value)` pair
///
/// After an error (engine failure, decode failure, closed store) the scanner
/// yields that error once and is then exhausted.
pub struct PaginatedScanner<'a, T, S> {
    connection: &'a StoreConnection,
    serializer: &'a S,
    page_size: usize,
    /// Row id of the last row fetched
    cursor: Option<RowId>,
    /// Rows of the current page not yet emitted
    page: std::vec::IntoIter<Row>,
    pages_fetched: usize,
    done: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T, S: Serializer<T>> PaginatedScanner<'a, T, S> {
    pub(crate) fn new(connection: &'a StoreConnection, serializer: &'a S, page_size: usize) -> Self {
        Self {
            connection,
            serializer,
            page_size,
            cursor: None,
            page: Vec::new().into_iter(),
            pages_fetched: 0,
            done: false,
            _marker: PhantomData,
        }
    }

    /// Page queries issued so far, including the trailing empty one
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page; returns the number of rows it held
    fn fetch_page(&mut self) -> Result<usize> {
        let cursor = self.cursor;
        let page_size = self.page_size;
        let rows = self
            .connection
            .with_engine(|engine| Ok(engine.select_page_after(cursor, page_size)))?;

        tracing::trace!(
            page = self.pages_fetched,
            after = ?cursor.map(RowId::get),
            rows = rows.len(),
            "fetched scan page"
        );

        if let Some(last) = rows.last() {
            self.cursor = Some(last.row_id);
        }
        self.pages_fetched += 1;

        let count = rows.len();
        self.page = rows.into_iter();
        Ok(count)
    }
}

impl<T, S: Serializer<T>> Iterator for PaginatedScanner<'_, T, S> {
    type Item = Result<(Vec<u8>, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if let Some(row) = self.page.next() {
                let item = self.serializer.decode(&row.value).map(|value| (row.key, value));
                if item.is_err() {
                    self.done = true;
                }
                return Some(item);
            }

            match self.fetch_page() {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<T, S: Serializer<T>> FusedIterator for PaginatedScanner<'_, T, S> {}
