//! Ordered traversal of the B-tree index.
//!
//! A [`Cursor`] marks one entry in the tree and can move to the
//! lexicographic successor ([`Cursor::next`]) or predecessor
//! ([`Cursor::prev`]). Instead of parent pointers, the cursor carries the
//! pages it descended through; moving past the edge of a leaf pops that
//! path and re-searches the ancestors with the key it started from.
//!
//! After a failed `next` or `prev` the cursor position is undefined:
//! discard it and obtain a fresh one via [`Id0::find`].

use crate::idb::id0::{branch_child, Entry, Id0, Page};
use crate::IdbError;

/// A position within the B-tree index.
pub struct Cursor<'a> {
    index: &'a Id0<'a>,
    /// Pages traversed from the root down to the current page.
    path: Vec<Page<'a>>,
    entry: Entry,
    entry_number: usize,
}

fn empty_path() -> IdbError {
    IdbError::Corrupt("cursor has an empty page path".to_string())
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(
        index: &'a Id0<'a>,
        path: Vec<Page<'a>>,
        entry: Entry,
        entry_number: usize,
    ) -> Self {
        Cursor {
            index,
            path,
            entry,
            entry_number,
        }
    }

    /// Key of the current entry.
    pub fn key(&self) -> &[u8] {
        self.entry.key()
    }

    /// Value of the current entry.
    pub fn value(&self) -> &[u8] {
        self.entry.value()
    }

    /// The current entry itself.
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Index of the current entry within its page.
    pub fn entry_number(&self) -> usize {
        self.entry_number
    }

    /// The descent path from the root to the current page.
    pub fn path(&self) -> &[Page<'a>] {
        &self.path
    }

    /// Move to the entry with the next-greater key.
    ///
    /// Fails with `OutOfRange` past the last entry of the tree.
    pub fn next(&mut self) -> Result<(), IdbError> {
        let page = self.path.last().ok_or_else(empty_path)?;

        if page.is_leaf() {
            if self.entry_number + 1 < page.entry_count() as usize {
                let entry = page.entry(self.entry_number + 1)?.clone();
                self.entry = entry;
                self.entry_number += 1;
                return Ok(());
            }

            // End of a leaf: pop ancestors until one holds an entry greater
            // than the key we started from.
            let start_key = self.entry.key().to_vec();
            loop {
                if self.path.len() <= 1 {
                    return Err(IdbError::OutOfRange);
                }
                self.path.pop();
                let page = self.path.last().ok_or_else(empty_path)?;
                match page.find_index(&start_key) {
                    Ok(i) => {
                        let entry = page.entry(i)?.clone();
                        self.entry = entry;
                        self.entry_number = i;
                        return Ok(());
                    }
                    // The start key is greater than everything here; keep
                    // climbing.
                    Err(IdbError::NotFound) => continue,
                    Err(e) => return Err(e),
                }
            }
        }

        // Branch entry: its successors live under its child pointer.
        // Follow the min edge down to a leaf and take the first entry.
        let child = branch_child(&self.entry)?;
        let mut page = self.index.get_page(child)?;
        while !page.is_leaf() {
            let ppointer = page.ppointer();
            self.path.push(page);
            page = self.index.get_page(ppointer)?;
        }
        if page.entry_count() == 0 {
            return Err(IdbError::Corrupt(format!(
                "empty leaf page {} during descent",
                page.number()
            )));
        }
        let entry = page.entry(0)?.clone();
        self.path.push(page);
        self.entry = entry;
        self.entry_number = 0;
        Ok(())
    }

    /// Move to the entry with the next-smaller key.
    ///
    /// Fails with `OutOfRange` before the first entry of the tree.
    pub fn prev(&mut self) -> Result<(), IdbError> {
        let page = self.path.last().ok_or_else(empty_path)?;

        if page.is_leaf() {
            if self.entry_number > 0 {
                let entry = page.entry(self.entry_number - 1)?.clone();
                self.entry = entry;
                self.entry_number -= 1;
                return Ok(());
            }

            // Start of a leaf: pop ancestors until one holds an entry
            // smaller than the key we started from.
            let start_key = self.entry.key().to_vec();
            loop {
                if self.path.len() <= 1 {
                    return Err(IdbError::OutOfRange);
                }
                self.path.pop();
                let page = self.path.last().ok_or_else(empty_path)?;
                let i = match page.find_index(&start_key) {
                    Ok(i) => i,
                    // The start key is greater than every entry here, so
                    // the landing spot is one past the end.
                    Err(IdbError::NotFound) => page.entry_count() as usize,
                    Err(e) => return Err(e),
                };
                if i == 0 {
                    // The start key sits below this ancestor's smallest
                    // entry; keep climbing.
                    continue;
                }
                let entry = page.entry(i - 1)?.clone();
                self.entry = entry;
                self.entry_number = i - 1;
                return Ok(());
            }
        }

        // Branch entry: its predecessors live under the child pointer to
        // its left. Follow the max edge down and take the last entry.
        let next_page_number = if self.entry_number == 0 {
            page.ppointer()
        } else {
            branch_child(page.entry(self.entry_number - 1)?)?
        };

        let mut page = self.index.get_page(next_page_number)?;
        while !page.is_leaf() {
            let count = page.entry_count() as usize;
            if count == 0 {
                return Err(IdbError::Corrupt(format!(
                    "empty branch page {} during descent",
                    page.number()
                )));
            }
            let child = branch_child(page.entry(count - 1)?)?;
            self.path.push(page);
            page = self.index.get_page(child)?;
        }
        let count = page.entry_count() as usize;
        if count == 0 {
            return Err(IdbError::Corrupt(format!(
                "empty leaf page {} during descent",
                page.number()
            )));
        }
        let entry = page.entry(count - 1)?.clone();
        self.path.push(page);
        self.entry = entry;
        self.entry_number = count - 1;
        Ok(())
    }
}
