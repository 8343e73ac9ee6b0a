//! Store Module
//!
//! The file as a whole: header, ordered Major Pages, allocation policy, and
//! the single append path.
//!
//! ## Responsibilities
//! - Initialise a new file (header + first Major Page)
//! - Decode an existing file page by page
//! - Resolve every append to the physical tail of the file
//! - Serialize all handle access behind one lock
//!
//! ## Tail-only Growth
//! ```text
//! ┌────────┬──────────────────────────────┬──────────────────────────────┐
//! │ Header │ Major 0                      │ Major 1                      │
//! │        │ [table] minor 0 | minor 1    │ [table] minor 0 | minor 1 ▶  │
//! └────────┴──────────────────────────────┴──────────────────────────────┘
//!                                                         only this grows
//! ```
//! A Minor Page grows in place, so it may only be written while nothing
//! sits after it. Writes therefore always go to the last Minor Page of the
//! last Major Page; once either table is full, a new page is started at the
//! end of the file instead of reusing free slots further back.

mod header;

pub use header::FileHeader;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::codec::{ByteOrder, Codec, RandomAccess};
use crate::config::StoreConfig;
use crate::error::{LogDbError, Result};
use crate::page::{
    Geometry, LogRecordEntry, MajorIndexEntry, MajorPage, MinorPage, PayloadSource, Record,
    RecordDraft, FILE_HEADER_SIZE,
};

/// Recorded vs. recomputed content size of one Major Page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentAudit {
    /// Absolute offset of the Major Page
    pub page_offset: u64,
    /// `contentSize` as stored in the Major Page header
    pub recorded: u64,
    /// Sum of the Minor Page sizes read from their own headers
    pub measured: u64,
}

impl ContentAudit {
    pub fn is_consistent(&self) -> bool {
        self.recorded == self.measured
    }
}

/// Everything guarded by the store lock
struct StoreState<H> {
    codec: Codec<H>,
    header: FileHeader,
    /// Major Pages in file order
    pages: Vec<MajorPage>,
}

/// An append-only, time-indexed log file
///
/// ## Concurrency
/// - One `parking_lot::Mutex` guards the handle and the page list together
/// - Every public method takes it exactly once, reads included
/// - Upward propagation (minor header → major row → major header) runs as a
///   flat sequence inside that one locked region
///
/// Appends are therefore linearized: no capacity decision can interleave
/// with the write it authorizes.
pub struct Store<H> {
    geometry: Geometry,
    state: Mutex<StoreState<H>>,
}

impl<H: RandomAccess> Store<H> {
    // =========================================================================
    // Creation
    // =========================================================================

    /// Initialise a new store on `handle` with the default byte order.
    ///
    /// The handle is written from offset 0; it should be empty.
    pub fn create(major_capacity: u16, minor_capacity: u16, handle: H) -> Result<Self> {
        let config = StoreConfig::builder()
            .major_capacity(major_capacity)
            .minor_capacity(minor_capacity)
            .build();
        Self::create_with_config(config, handle)
    }

    /// Initialise a new store on `handle`
    ///
    /// Steps:
    /// 1. Validate the configuration
    /// 2. Write the file header
    /// 3. Write the first, empty Major Page right after it
    pub fn create_with_config(config: StoreConfig, handle: H) -> Result<Self> {
        config.validate()?;

        let mut codec = Codec::new(handle, config.byte_order);
        let header = FileHeader::new(config.major_capacity, config.minor_capacity);
        header.write(&mut codec)?;

        let geometry = header.geometry();
        let first = MajorPage::create_at(&mut codec, geometry, FILE_HEADER_SIZE)?;

        info!(
            major_capacity = geometry.major_capacity,
            minor_capacity = geometry.minor_capacity,
            byte_order = ?config.byte_order,
            "store created"
        );

        Ok(Self::from_parts(codec, header, vec![first]))
    }

    /// Open an existing store with the default byte order
    pub fn open(handle: H) -> Result<Self> {
        Self::open_with_config(StoreConfig::default(), handle)
    }

    /// Open an existing store
    ///
    /// Capacities come from the file header; only `config.byte_order` is used.
    /// Major Pages are decoded back to back until the end of the handle; any
    /// tag mismatch fails the whole open with `Corruption`.
    pub fn open_with_config(config: StoreConfig, handle: H) -> Result<Self> {
        let mut codec = Codec::new(handle, config.byte_order);
        let header = FileHeader::decode(&mut codec)?;
        let geometry = header.geometry();

        if geometry.major_capacity != config.major_capacity
            || geometry.minor_capacity != config.minor_capacity
        {
            debug!(
                file_major = geometry.major_capacity,
                file_minor = geometry.minor_capacity,
                "capacities taken from file header"
            );
        }

        let len = codec.stream_len()?;
        let mut pages = Vec::new();
        let mut offset = FILE_HEADER_SIZE;

        while offset < len {
            codec.seek_to(offset)?;
            let page = MajorPage::decode(&mut codec, geometry)?;

            if page.end() > len {
                warn!(offset, end = page.end(), len, "major page runs past end of file");
                return Err(LogDbError::corruption(
                    offset,
                    format!("major page ends at {} but the file is {} bytes", page.end(), len),
                ));
            }

            offset = page.end();
            pages.push(page);
        }

        if pages.is_empty() {
            warn!("store file has no major pages");
            return Err(LogDbError::corruption(FILE_HEADER_SIZE, "no major pages"));
        }

        info!(pages = pages.len(), len, "store opened");

        Ok(Self::from_parts(codec, header, pages))
    }

    fn from_parts(codec: Codec<H>, header: FileHeader, pages: Vec<MajorPage>) -> Self {
        Self {
            geometry: header.geometry(),
            state: Mutex::new(StoreState {
                codec,
                header,
                pages,
            }),
        }
    }

    // =========================================================================
    // Page Resolution
    // =========================================================================

    /// The last Major Page, or a new one at the end of the file if its table
    /// is full.
    pub fn latest_writable_major_page(&self) -> Result<MajorPage> {
        let mut state = self.state.lock();
        let idx = state.writable_major()?;
        Ok(state.pages[idx].clone())
    }

    /// The tail Minor Page, or a new one (starting at `default_timestamp`)
    /// if the tail has no free rows.
    pub fn latest_writable_minor_page(&self, default_timestamp: u64) -> Result<MinorPage> {
        let mut state = self.state.lock();
        let (_, minor) = state.writable_minor(default_timestamp)?;
        Ok(minor)
    }

    // =========================================================================
    // Append
    // =========================================================================

    /// Append one record. This is the only write path.
    ///
    /// Steps:
    /// 1. Validate flags and measure the payload (no lock, no I/O on the file)
    /// 2. Acquire the store lock
    /// 3. Resolve the tail Minor Page, allocating pages as needed
    /// 4. Write the record and propagate headers upward
    pub fn append<P: PayloadSource + ?Sized>(
        &self,
        timestamp: u64,
        payload: &mut P,
        flags: Option<&[bool]>,
    ) -> Result<()> {
        let draft = RecordDraft::new(timestamp, payload, flags)?;

        let mut guard = self.state.lock();
        let (idx, mut minor) = guard.writable_minor(timestamp)?;

        let state = &mut *guard;
        minor.append_draft(&mut state.codec, &mut state.pages[idx], &draft, payload)?;

        Ok(())
    }

    /// Append a record from a byte slice
    pub fn append_bytes(&self, timestamp: u64, payload: &[u8]) -> Result<()> {
        let mut source = payload;
        self.append(timestamp, &mut source, None)
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Snapshot of every Major Page in file order.
    ///
    /// Snapshots do not follow later appends.
    pub fn major_pages(&self) -> Vec<MajorPage> {
        self.state.lock().pages.clone()
    }

    pub fn major_page_count(&self) -> usize {
        self.state.lock().pages.len()
    }

    /// Decode the Minor Page a Major Page row references
    pub fn read_minor_page(&self, entry: &MajorIndexEntry) -> Result<MinorPage> {
        let mut state = self.state.lock();
        entry.read_referenced_minor_page(&mut state.codec)
    }

    /// Decode the record a Minor Page row references
    pub fn read_record(&self, page: &MinorPage, entry: &LogRecordEntry) -> Result<Record> {
        let mut state = self.state.lock();
        page.read_record(&mut state.codec, entry)
    }

    /// Every record in the file, in file order (which is append order).
    pub fn records(&self) -> Result<Vec<Record>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let mut records = Vec::new();
        for page in &state.pages {
            for entry in &page.entries {
                let minor = entry.read_referenced_minor_page(&mut state.codec)?;
                records.extend(minor.read_records(&mut state.codec)?);
            }
        }
        Ok(records)
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Compare each Major Page header on disk with the sizes its Minor Pages
    /// report for themselves.
    pub fn audit(&self) -> Result<Vec<ContentAudit>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let mut audits = Vec::with_capacity(state.pages.len());
        for page in &state.pages {
            state.codec.seek_to(page.offset)?;
            let on_disk = MajorPage::decode(&mut state.codec, self.geometry)?;
            let measured = on_disk.live_content_size(&mut state.codec)?;

            audits.push(ContentAudit {
                page_offset: page.offset,
                recorded: on_disk.content_size,
                measured,
            });
        }
        Ok(audits)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Absolute offset just past the last Major Page
    pub fn end_offset(&self) -> u64 {
        self.state
            .lock()
            .pages
            .last()
            .map_or(FILE_HEADER_SIZE, MajorPage::end)
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn header(&self) -> FileHeader {
        self.state.lock().header.clone()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.state.lock().codec.byte_order()
    }

    /// Flush the underlying handle
    pub fn flush(&self) -> Result<()> {
        self.state.lock().codec.flush()?;
        Ok(())
    }

    /// Give back the underlying handle
    pub fn into_inner(self) -> H {
        self.state.into_inner().codec.into_inner()
    }
}

impl<H: RandomAccess> StoreState<H> {
    /// Index of the Major Page the next Minor Page must go into.
    fn writable_major(&mut self) -> Result<usize> {
        let last = self
            .pages
            .last()
            .ok_or_else(|| LogDbError::corruption(FILE_HEADER_SIZE, "no major pages"))?;

        if last.remaining_capacity() > 0 {
            return Ok(self.pages.len() - 1);
        }

        let offset = last.end();
        let page = MajorPage::create_at(&mut self.codec, self.header.geometry(), offset)?;
        self.pages.push(page);
        Ok(self.pages.len() - 1)
    }

    /// The tail Minor Page and the index of its Major Page.
    fn writable_minor(&mut self, default_timestamp: u64) -> Result<(usize, MinorPage)> {
        let idx = self.writable_major()?;
        let major = &mut self.pages[idx];

        let minor = match major.last_minor_page(&mut self.codec)? {
            Some(page) if page.remaining_capacity() > 0 => page,
            _ => major
                .create_entry(&mut self.codec, default_timestamp)?
                .read_referenced_minor_page(&mut self.codec)?,
        };

        Ok((idx, minor))
    }
}
