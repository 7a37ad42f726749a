use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::cell::{CellPointer, CELL_POINTER_SIZE};
use crate::storage::page::header::{self, PageHeader, HEADER_SIZE};
use crate::storage::page::record::{encoded_key, Record};
use crate::storage::page::{CellId, PageId, RecordId, PAGE_SIZE};
use std::fmt;

/// A slotted page.
///
/// The cell directory is kept sorted by `(used, key)`: FREE cells first,
/// then live records in non-decreasing key order. Record ids stay stable
/// while records move around inside the page.
#[derive(Clone)]
pub struct Page {
    data: Box<[u8; PAGE_SIZE]>,
}

impl Page {
    pub fn new(id: PageId, flags: u32) -> Self {
        let mut page = Self {
            data: Box::new([0u8; PAGE_SIZE]),
        };
        page.reset(id, flags);
        page
    }

    /// Wrap a page image, e.g. one read back from disk.
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(StorageError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: bytes.len(),
            });
        }
        let mut data = Box::new([0u8; PAGE_SIZE]);
        data.copy_from_slice(bytes);
        Ok(Self { data })
    }

    /// Reinitialize the page in place as an empty page.
    pub fn reset(&mut self, id: PageId, flags: u32) {
        self.data.fill(0);
        PageHeader {
            id: id.0,
            flags,
            lower: HEADER_SIZE as u16,
            upper: PAGE_SIZE as u16,
            ..Default::default()
        }
        .write_to(&mut self.data[..]);
    }

    pub fn as_bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }

    pub fn page_id(&self) -> PageId {
        PageId(header::id(&self.data[..]))
    }

    pub fn header(&self) -> PageHeader {
        PageHeader::read_from(&self.data[..])
    }

    pub fn flags(&self) -> u32 {
        header::flags(&self.data[..])
    }

    pub fn set_flags(&mut self, flags: u32) {
        header::set_flags(&mut self.data[..], flags);
    }

    pub fn prev(&self) -> PageId {
        PageId(header::prev(&self.data[..]))
    }

    pub fn set_prev(&mut self, page_id: PageId) {
        header::set_prev(&mut self.data[..], page_id.0);
    }

    pub fn next(&self) -> PageId {
        PageId(header::next(&self.data[..]))
    }

    pub fn set_next(&mut self, page_id: PageId) {
        header::set_next(&mut self.data[..], page_id.0);
    }

    /// Bytes between the end of the cell directory and the record heap.
    pub fn free_space(&self) -> usize {
        (self.upper() - self.lower()) as usize
    }

    pub fn cell_count(&self) -> usize {
        header::cells(&self.data[..]) as usize
    }

    pub fn live_records(&self) -> usize {
        self.header().live_records() as usize
    }

    pub fn add_record(&mut self, record: &Record) -> StorageResult<RecordId> {
        let len = record.len();
        let available = self.free_space().saturating_sub(CELL_POINTER_SIZE);
        // Strict: always leave room for the cell pointer.
        if len >= available {
            return Err(StorageError::NoRoom {
                required: len + CELL_POINTER_SIZE,
                available: self.free_space(),
            });
        }

        if header::free(&self.data[..]) > 0 {
            if let Some(pos) = self.find_free_cell(len) {
                return Ok(self.recycle_cell(pos, record));
            }
        }

        let id = self.next_cell_id();
        let pos = self.cell_count();
        let upper = self.upper() as usize - len;
        let lower = self.lower() as usize + CELL_POINTER_SIZE;

        self.data[upper..upper + len].copy_from_slice(record.as_bytes());
        header::set_upper(&mut self.data[..], upper as u16);
        header::set_lower(&mut self.data[..], lower as u16);
        header::set_cells(&mut self.data[..], pos as u16 + 1);
        self.set_cell(pos, CellPointer::new(id, upper as u16, len as u16));

        self.restore_order(pos);
        Ok(RecordId::new(self.page_id(), id))
    }

    pub fn get_record(&self, rid: RecordId) -> StorageResult<Record> {
        let pos = self.locate(rid)?;
        let cell = self.cell_at(pos);
        Record::from_bytes(&self.data[cell.span()])
    }

    pub fn del_record(&mut self, rid: RecordId) -> StorageResult<()> {
        let pos = self.locate(rid)?;
        let mut cell = self.cell_at(pos);

        self.data[cell.span()].fill(0);
        cell.mark_free();
        self.set_cell(pos, cell);

        let free = header::free(&self.data[..]);
        header::set_free(&mut self.data[..], free + 1);

        self.restore_order(pos);
        Ok(())
    }

    /// Visit every live record in directory order.
    ///
    /// A callback returning `StorageError::SkipRecord` moves on to the next
    /// record; any other error stops the iteration and is returned.
    pub fn range_records<F>(&self, mut f: F) -> StorageResult<()>
    where
        F: FnMut(RecordId, &Record) -> StorageResult<()>,
    {
        let page_id = self.page_id();
        for pos in 0..self.cell_count() {
            let cell = self.cell_at(pos);
            if !cell.is_used() {
                continue;
            }

            let record = Record::from_bytes(&self.data[cell.span()])?;
            match f(RecordId::new(page_id, cell.id), &record) {
                Ok(()) | Err(StorageError::SkipRecord) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Compact the page: drop FREE cells and repack live records against
    /// the end of the page. Cell ids and directory order are preserved.
    pub fn vacuum(&mut self) {
        let mut scratch = Box::new([0u8; PAGE_SIZE]);
        let mut lower = HEADER_SIZE;
        let mut upper = PAGE_SIZE;
        let mut cells = 0u16;

        for pos in 0..self.cell_count() {
            let cell = self.cell_at(pos);
            if !cell.is_used() {
                continue;
            }

            let len = cell.length as usize;
            upper -= len;
            scratch[upper..upper + len].copy_from_slice(&self.data[cell.span()]);
            CellPointer::new(cell.id, upper as u16, len as u16).write_to(&mut scratch[lower..]);
            lower += CELL_POINTER_SIZE;
            cells += 1;
        }

        PageHeader {
            cells,
            free: 0,
            lower: lower as u16,
            upper: upper as u16,
            ..self.header()
        }
        .write_to(&mut scratch[..]);

        self.data.copy_from_slice(&scratch[..]);
    }

    /// Position of the first live cell whose key is >= `key`.
    pub fn find_cell_pos(&self, key: &[u8]) -> usize {
        let target = (true, key);
        let mut lo = 0;
        let mut hi = self.cell_count();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if sort_key(&self.data[..], &self.cell_at(mid)) < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    pub fn has_key(&self, key: &[u8]) -> bool {
        let pos = self.find_cell_pos(key);
        if pos >= self.cell_count() {
            return false;
        }
        let cell = self.cell_at(pos);
        cell.is_used() && encoded_key(&self.data[cell.span()]) == key
    }

    /// Check that a page image is structurally sound.
    pub fn validate(&self) -> StorageResult<()> {
        let header = self.header();
        let corrupted = |reason: String| StorageError::Corrupted {
            page_id: PageId(header.id),
            reason,
        };

        let lower = header.lower as usize;
        let upper = header.upper as usize;
        if lower < HEADER_SIZE || lower > upper || upper > PAGE_SIZE {
            return Err(corrupted(format!("bounds lower={} upper={}", lower, upper)));
        }
        if (lower - HEADER_SIZE) / CELL_POINTER_SIZE != header.cells as usize
            || (lower - HEADER_SIZE) % CELL_POINTER_SIZE != 0
        {
            return Err(corrupted(format!(
                "{} cells do not match lower bound {}",
                header.cells, lower
            )));
        }
        if header.free > header.cells {
            return Err(corrupted(format!(
                "{} free cells out of {}",
                header.free, header.cells
            )));
        }

        for pos in 0..header.cells as usize {
            let slot = HEADER_SIZE + pos * CELL_POINTER_SIZE;
            let cell = CellPointer::read_from(&self.data[slot..]);
            if !cell.is_valid() {
                return Err(corrupted(format!("cell at position {} has no magic", pos)));
            }
            let span = cell.span();
            if span.start < upper || span.end > PAGE_SIZE {
                return Err(corrupted(format!(
                    "cell {} spans {:?} outside the record heap",
                    cell.id, span
                )));
            }
        }
        Ok(())
    }

    fn lower(&self) -> u16 {
        header::lower(&self.data[..])
    }

    fn upper(&self) -> u16 {
        header::upper(&self.data[..])
    }

    /// Decode the cell pointer at directory position `pos`.
    ///
    /// Panics if the slot lies outside the directory or the cell is not
    /// valid: that can only happen when the page is corrupted in memory.
    fn cell_at(&self, pos: usize) -> CellPointer {
        let slot = HEADER_SIZE + pos * CELL_POINTER_SIZE;
        let lower = self.lower() as usize;
        assert!(
            slot + CELL_POINTER_SIZE <= lower,
            "cell slot {} outside directory [{}, {})",
            slot,
            HEADER_SIZE,
            lower
        );

        let cell = CellPointer::read_from(&self.data[slot..]);
        assert!(cell.is_valid(), "cell at slot {} has no magic", slot);
        assert!(
            cell.span().start >= lower && cell.span().end <= PAGE_SIZE,
            "cell {} spans {:?} outside the record heap",
            cell.id,
            cell.span()
        );
        cell
    }

    fn set_cell(&mut self, pos: usize, cell: CellPointer) {
        let slot = HEADER_SIZE + pos * CELL_POINTER_SIZE;
        assert!(
            slot + CELL_POINTER_SIZE <= self.lower() as usize,
            "cell slot {} outside directory",
            slot
        );
        cell.write_to(&mut self.data[slot..]);
    }

    /// Directory position of a live cell.
    fn locate(&self, rid: RecordId) -> StorageResult<usize> {
        if rid.page_id != self.page_id() {
            return Err(StorageError::RecordNotFound(rid));
        }
        (0..self.cell_count())
            .find(|&pos| {
                let cell = self.cell_at(pos);
                cell.id == rid.cell_id && cell.is_used()
            })
            .ok_or(StorageError::RecordNotFound(rid))
    }

    /// First FREE cell whose capacity fits `len` bytes.
    fn find_free_cell(&self, len: usize) -> Option<usize> {
        (0..self.cell_count()).find(|&pos| {
            let cell = self.cell_at(pos);
            cell.is_free() && cell.length as usize >= len
        })
    }

    fn recycle_cell(&mut self, pos: usize, record: &Record) -> RecordId {
        let mut cell = self.cell_at(pos);
        cell.mark_used();
        cell.length = record.len() as u16;
        self.data[cell.span()].copy_from_slice(record.as_bytes());
        self.set_cell(pos, cell);

        let free = header::free(&self.data[..]);
        header::set_free(&mut self.data[..], free - 1);

        self.restore_order(pos);
        RecordId::new(self.page_id(), cell.id)
    }

    fn next_cell_id(&self) -> CellId {
        let mut ids: Vec<CellId> = (0..self.cell_count()).map(|pos| self.cell_at(pos).id).collect();
        match ids.iter().max() {
            None => 0,
            Some(&max) if max < CellId::MAX => max + 1,
            Some(_) => {
                ids.sort_unstable();
                let mut candidate = 0;
                for id in ids {
                    if id != candidate {
                        break;
                    }
                    candidate += 1;
                }
                candidate
            }
        }
    }

    /// Re-sort the directory if the cell at `pos` broke the ordering.
    fn restore_order(&mut self, pos: usize) {
        if !self.in_order(pos) {
            self.sort_directory();
        }
    }

    fn in_order(&self, pos: usize) -> bool {
        let data = &self.data[..];
        let key = sort_key(data, &self.cell_at(pos));
        if pos > 0 && sort_key(data, &self.cell_at(pos - 1)) > key {
            return false;
        }
        if pos + 1 < self.cell_count() && key > sort_key(data, &self.cell_at(pos + 1)) {
            return false;
        }
        true
    }

    fn sort_directory(&mut self) {
        let mut cells: Vec<CellPointer> = (0..self.cell_count()).map(|pos| self.cell_at(pos)).collect();
        {
            let data = &self.data[..];
            cells.sort_by(|a, b| sort_key(data, a).cmp(&sort_key(data, b)));
        }
        for (pos, cell) in cells.into_iter().enumerate() {
            self.set_cell(pos, cell);
        }
    }
}

/// Directory ordering key: FREE cells sort before every live record.
fn sort_key<'a>(data: &'a [u8], cell: &CellPointer) -> (bool, &'a [u8]) {
    if cell.is_used() {
        (true, encoded_key(&data[cell.span()]))
    } else {
        (false, &[])
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page").field("header", &self.header()).finish()
    }
}
