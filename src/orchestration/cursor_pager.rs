//! # Cursor Pager
//!
//! Walks the records matching a predicate in ascending key order, one page at a time.
//! Each page starts strictly after the last key of the previous page (the cursor floor),
//! so records mutated after being yielded are never yielded again and never shift later
//! pages. A page shorter than the page size ends the walk.

use crate::error::{ReconcilerError, Result};
use crate::models::{ProductMapping, RecordKey};
use crate::predicate::Predicate;
use crate::store::RecordStore;
use std::sync::Arc;
use tracing::debug;

pub struct CursorPager {
    store: Arc<dyn RecordStore>,
    predicate: Predicate,
    page_size: usize,
    floor: Option<RecordKey>,
    finished: bool,
    pages: usize,
}

impl CursorPager {
    pub fn new(store: Arc<dyn RecordStore>, predicate: Predicate, page_size: usize) -> Self {
        Self {
            store,
            predicate,
            page_size,
            floor: None,
            finished: false,
            pages: 0,
        }
    }

    pub fn cursor_floor(&self) -> Option<&RecordKey> {
        self.floor.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// The next non-empty page, or `None` once the walk is over.
    ///
    /// Fails with [`ReconcilerError::Paging`] if the store returns keys that are not
    /// strictly ascending above the cursor floor, or more rows than requested.
    pub async fn next_page(&mut self) -> Result<Option<Vec<ProductMapping>>> {
        if self.finished {
            return Ok(None);
        }
        if self.page_size == 0 {
            return Err(ReconcilerError::Paging(
                "page size must be positive".to_string(),
            ));
        }

        let page = self
            .store
            .find_page(&self.predicate, self.floor.as_ref(), self.page_size)
            .await?;

        self.check_page(&page)?;

        if page.len() < self.page_size {
            self.finished = true;
        }
        let Some(last) = page.last() else {
            debug!(pages = self.pages, "Pager exhausted");
            return Ok(None);
        };

        self.floor = Some(last.key.clone());
        self.pages += 1;
        debug!(
            page = self.pages,
            records = page.len(),
            cursor_floor = %last.key,
            "Fetched page"
        );
        Ok(Some(page))
    }

    fn check_page(&self, page: &[ProductMapping]) -> Result<()> {
        if page.len() > self.page_size {
            return Err(ReconcilerError::Paging(format!(
                "store returned {} records for a page of {}",
                page.len(),
                self.page_size
            )));
        }

        let mut previous = self.floor.as_ref();
        for record in page {
            if let Some(previous) = previous {
                if record.key <= *previous {
                    return Err(ReconcilerError::Paging(format!(
                        "cursor did not advance: {} after {}",
                        record.key, previous
                    )));
                }
            }
            previous = Some(&record.key);
        }
        Ok(())
    }
}
