use crate::error::{DbError, DbResult};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const PAGE_SIZE: usize = 4096;

/// Whole-page reads and writes against one flat file.
///
/// Page `k` occupies bytes `[k * PAGE_SIZE, (k + 1) * PAGE_SIZE)`.
pub struct PageManager {
    file: File,
    path: PathBuf,
}

impl PageManager {
    pub fn create(path: &Path) -> DbResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn open(path: &Path) -> DbResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Open `path`, creating an empty file if it does not exist yet
    pub fn open_or_create(path: &Path) -> DbResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read page `page_number` into `buf`. A short final page is zero-padded.
    pub fn read_page(&mut self, page_number: u32, buf: &mut [u8]) -> DbResult<()> {
        if buf.len() != PAGE_SIZE {
            return Err(DbError::Corrupt(format!(
                "buffer size must be PAGE_SIZE ({}), got {}",
                PAGE_SIZE,
                buf.len()
            )));
        }

        let offset = Self::page_offset(page_number);
        let file_size = self.file_size()?;

        if offset >= file_size {
            return Err(DbError::not_found(format!(
                "page {} of {}",
                page_number,
                self.path.display()
            )));
        }

        let available = (file_size - offset).min(PAGE_SIZE as u64) as usize;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buf[..available])?;
        buf[available..].fill(0);

        Ok(())
    }

    pub fn write_page(&mut self, page_number: u32, data: &[u8]) -> DbResult<()> {
        if data.len() != PAGE_SIZE {
            return Err(DbError::Corrupt(format!(
                "data size must be PAGE_SIZE ({}), got {}",
                PAGE_SIZE,
                data.len()
            )));
        }

        let offset = Self::page_offset(page_number);
        let file_size = self.file_size()?;

        // Extend file if necessary
        if offset >= file_size {
            self.file.set_len(offset + PAGE_SIZE as u64)?;
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.file.sync_all()?;

        Ok(())
    }

    /// Number of pages, counting a trailing partial page as a page
    pub fn num_pages(&self) -> DbResult<u32> {
        let file_size = self.file_size()?;
        Ok(file_size.div_ceil(PAGE_SIZE as u64) as u32)
    }

    /// Append a zeroed page and return its number
    pub fn allocate_page(&mut self) -> DbResult<u32> {
        let page_number = self.num_pages()?;
        self.write_page(page_number, &vec![0u8; PAGE_SIZE])?;
        Ok(page_number)
    }

    fn file_size(&self) -> DbResult<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn page_offset(page_number: u32) -> u64 {
        page_number as u64 * PAGE_SIZE as u64
    }
}
