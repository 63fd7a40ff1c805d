//! Fixed-offset block I/O over one file: typed page read/write, page
//! allocation, active-meta selection, fsync. The pager exclusively owns all
//! page I/O — the tree never touches the file directly.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::freelist::Freelist;
use crate::page::branch::BranchPage;
use crate::page::freelist::FreelistPage;
use crate::page::header::HeaderPage;
use crate::page::leaf::LeafPage;
use crate::page::meta::MetaPage;
use crate::page::{
    self, PageId, FIRST_DATA_PAGE_ID, HEADER_PAGE_ID, META_PAGE_A_ID, META_PAGE_B_ID,
};

/// Options governing pager creation; validated against spec §6's supported
/// page-size list.
#[derive(Clone, Copy, Debug)]
pub struct PagerOptions {
    pub page_size: u32,
    pub create_if_missing: bool,
}

impl Default for PagerOptions {
    fn default() -> Self {
        Self {
            page_size: page::DEFAULT_PAGE_SIZE,
            create_if_missing: true,
        }
    }
}

pub struct Pager {
    path: PathBuf,
    file: Option<File>,
    page_size: u32,
    next_page_id: PageId,
    freelist: Freelist,
}

impl Pager {
    /// Opens an existing database file, or creates one per `options` if it
    /// does not exist and `create_if_missing` is set.
    #[instrument(skip(options), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, options: PagerOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            Self::open_existing(path)
        } else if options.create_if_missing {
            Self::create(path, options.page_size)
        } else {
            Err(Error::NotFound(path.display().to_string()))
        }
    }

    #[instrument(fields(path = %path.display(), page_size))]
    fn create(path: PathBuf, page_size: u32) -> Result<Self> {
        if !page::is_valid_page_size(page_size) {
            return Err(Error::InvalidConfig(format!(
                "page size {page_size} is not a supported power of two in [{}, {}]",
                page::MIN_PAGE_SIZE,
                page::MAX_PAGE_SIZE
            )));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let header = HeaderPage::new(page_size);
        let header_bytes = header.encode(page_size as usize)?;
        write_page_raw(&mut file, 0, &header_bytes)?;

        let meta_a = MetaPage::empty(META_PAGE_A_ID);
        let meta_b = MetaPage::empty(META_PAGE_B_ID);
        write_page_raw(&mut file, 1, &meta_a.encode(page_size as usize)?)?;
        write_page_raw(&mut file, 2, &meta_b.encode(page_size as usize)?)?;
        file.sync_all()?;

        debug!("created new database file");
        Ok(Self {
            path,
            file: Some(file),
            page_size,
            next_page_id: FIRST_DATA_PAGE_ID,
            freelist: Freelist::new(),
        })
    }

    #[instrument(fields(path = %path.display()))]
    fn open_existing(path: PathBuf) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let header_bytes = read_page_raw_sized(&mut file, 0, page::header::MAGIC.len() + 12)?;
        let header = HeaderPage::decode(&header_bytes)?;
        let page_size = header.page_size;

        let file_len = file.metadata()?.len();
        let next_page_id = (file_len / page_size as u64) as PageId;

        let mut pager = Self {
            path,
            file: Some(file),
            page_size,
            next_page_id,
            freelist: Freelist::new(),
        };

        let meta = pager.read_active_meta()?;
        if meta.freelist_page_id != 0 {
            let fl_page = pager.read_freelist(meta.freelist_page_id)?;
            pager.freelist = Freelist::from_page(&fl_page);
        }
        debug!(page_size, next_page_id, "opened existing database file");
        Ok(pager)
    }

    fn file_mut(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(Error::ClosedPager)
    }

    fn file_ref(&self) -> Result<&File> {
        self.file.as_ref().ok_or(Error::ClosedPager)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn page_count(&self) -> PageId {
        self.next_page_id
    }

    pub fn freelist(&self) -> &Freelist {
        &self.freelist
    }

    pub fn freelist_mut(&mut self) -> &mut Freelist {
        &mut self.freelist
    }

    // ---- typed accessors ----

    pub fn read_header(&mut self) -> Result<HeaderPage> {
        let page_size = self.page_size as usize;
        let data = self.read_raw(HEADER_PAGE_ID)?;
        HeaderPage::decode(&data[..page_size.min(data.len())])
    }

    pub fn read_meta(&mut self, page_id: PageId) -> Result<MetaPage> {
        if !MetaPage::is_meta_slot(page_id) {
            return Err(Error::Corruption(format!("{page_id} is not a meta slot")));
        }
        let data = self.read_raw(page_id)?;
        MetaPage::decode(&data, true)
    }

    /// Selects the active meta: the valid page with the greater `txn_id`,
    /// ties broken in favor of meta A. Falls back to the other page on a
    /// single corruption; fails with `CorruptMeta` if both are invalid.
    #[instrument(skip(self))]
    pub fn read_active_meta(&mut self) -> Result<MetaPage> {
        let a = self.read_meta(META_PAGE_A_ID);
        let b = self.read_meta(META_PAGE_B_ID);
        match (a, b) {
            (Ok(a), Ok(b)) => {
                if b.txn_id > a.txn_id {
                    Ok(b)
                } else {
                    Ok(a)
                }
            }
            (Ok(a), Err(e)) => {
                warn!(error = %e, "meta B invalid, falling back to meta A");
                Ok(a)
            }
            (Err(e), Ok(b)) => {
                warn!(error = %e, "meta A invalid, falling back to meta B");
                Ok(b)
            }
            (Err(_), Err(_)) => Err(Error::CorruptMeta),
        }
    }

    pub fn get_inactive_meta_id(&mut self) -> Result<PageId> {
        let active = self.read_active_meta()?;
        Ok(if active.page_id == META_PAGE_A_ID {
            META_PAGE_B_ID
        } else {
            META_PAGE_A_ID
        })
    }

    #[instrument(skip(self, meta))]
    pub fn write_meta(&mut self, meta: &MetaPage) -> Result<()> {
        if !MetaPage::is_meta_slot(meta.page_id) {
            return Err(Error::Corruption(format!(
                "{} is not a meta slot",
                meta.page_id
            )));
        }
        let bytes = meta.encode(self.page_size as usize)?;
        self.write_raw(meta.page_id, &bytes)
    }

    pub fn read_freelist(&mut self, page_id: PageId) -> Result<FreelistPage> {
        let data = self.read_raw(page_id)?;
        FreelistPage::decode(&data, true)
    }

    pub fn write_freelist_page(&mut self, page: &FreelistPage) -> Result<()> {
        let bytes = page.encode(self.page_size as usize)?;
        self.write_raw(page.page_id, &bytes)
    }

    pub fn read_leaf(&mut self, page_id: PageId) -> Result<LeafPage> {
        let data = self.read_raw(page_id)?;
        LeafPage::decode(&data, true)
    }

    pub fn write_leaf(&mut self, page: &LeafPage) -> Result<()> {
        let bytes = page.encode(self.page_size as usize)?;
        self.write_raw(page.page_id, &bytes)
    }

    pub fn read_branch(&mut self, page_id: PageId) -> Result<BranchPage> {
        let data = self.read_raw(page_id)?;
        BranchPage::decode(&data, true)
    }

    pub fn write_branch(&mut self, page: &BranchPage) -> Result<()> {
        let bytes = page.encode(self.page_size as usize)?;
        self.write_raw(page.page_id, &bytes)
    }

    /// Reads a full page's raw bytes without interpreting its type. The
    /// B+ tree uses this for type-dispatched traversal: the first byte of
    /// the 9-byte frame discriminates branch from leaf.
    pub fn read_raw(&mut self, page_id: PageId) -> Result<Vec<u8>> {
        let page_size = self.page_size as usize;
        let file = self.file_mut()?;
        read_page_raw_sized(file, page_id, page_size)
    }

    fn write_raw(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        let page_size = self.page_size as usize;
        if data.len() != page_size {
            return Err(Error::ShortPage {
                expected: page_size,
                actual: data.len(),
            });
        }
        let file = self.file_mut()?;
        write_page_raw(file, page_id, data)
    }

    // ---- allocation ----

    /// Allocates a page ID: freelist first, else extends the file by
    /// incrementing `next_page_id`. The caller is responsible for writing
    /// actual page content to the returned ID.
    pub fn allocate_page(&mut self) -> PageId {
        if let Some(id) = self.freelist.allocate() {
            return id;
        }
        let id = self.next_page_id;
        self.next_page_id += 1;
        id
    }

    /// Marks a page ID as reusable. Fails with `ReservedPage` for IDs in
    /// {0, 1, 2}.
    pub fn free_page(&mut self, page_id: PageId) -> Result<()> {
        self.freelist.free(page_id)
    }

    // ---- lifecycle ----

    #[instrument(skip(self))]
    pub fn sync(&mut self) -> Result<()> {
        self.file_ref()?;
        self.file.as_ref().unwrap().sync_all()?;
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        self.file = None;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn page_offset(page_id: PageId, page_size: u32) -> u64 {
    page_id as u64 * page_size as u64
}

fn read_page_raw_sized(file: &mut File, page_id: PageId, page_size: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; page_size];
    file.seek(SeekFrom::Start(page_offset(page_id, page_size as u32)))?;
    let n = read_fully(file, &mut buf)?;
    if n < page_size {
        return Err(Error::ShortPage {
            expected: page_size,
            actual: n,
        });
    }
    Ok(buf)
}

fn read_fully(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match file.read(&mut buf[total..])? {
            0 => break,
            n => total += n,
        }
    }
    Ok(total)
}

fn write_page_raw(file: &mut File, page_id: PageId, data: &[u8]) -> Result<()> {
    file.seek(SeekFrom::Start(page_offset(page_id, data.len() as u32)))?;
    file.write_all(data)?;
    Ok(())
}
