//! Memory-backed disk store.
//!
//! Every disk image is read fully into host RAM at registration and all
//! sector I/O is served from that buffer; nothing is written back to the
//! source file. Units are dense indices into a fixed-capacity table and
//! stay stable for the lifetime of the VM.

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

/// Size of the registration table. The BIOS disk numbering (0x80..) only
/// leaves 7 bits for the unit anyway.
pub const MAX_DISKS: usize = 8;

pub const SECTOR_SIZE_CD: u32 = 2048;
pub const SECTOR_SIZE_FIXED: u32 = 512;

/// Largest sector count representable in a CHS tuple; geometry reporting
/// clamps to it.
const CHS_MAX_SECTORS: u64 = 65_535 * 16 * 255;

#[derive(Debug, Error)]
pub enum DiskError {
    #[error("disk image I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("no disk registered at unit {0}")]
    NoSuchDisk(usize),
    #[error("disk table full ({MAX_DISKS} units)")]
    TableFull,
    #[error("transfer length {len:#x} not a multiple of the {sector_size}-byte sector")]
    Misaligned { len: u64, sector_size: u32 },
    #[error("I/O past end of disk: offset {offset:#x} len {len:#x} disk size {size:#x}")]
    OutOfRange { offset: u64, len: u64, size: u64 },
}

/// CHS geometry derived once at registration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub cylinders: u16,
    pub heads: u8,
    pub sectors_per_track: u8,
}

impl Geometry {
    /// `sector` is 1-based, as on the INT 13h wire.
    pub fn lba(&self, cylinder: u32, head: u32, sector: u32) -> u64 {
        (u64::from(cylinder) * u64::from(self.heads) + u64::from(head))
            * u64::from(self.sectors_per_track)
            + u64::from(sector)
            - 1
    }

    pub fn chs_from_lba(&self, lba: u64) -> (u32, u32, u32) {
        let spt = u64::from(self.sectors_per_track);
        let heads = u64::from(self.heads);
        let sector = lba % spt + 1;
        let track = lba / spt;
        let head = track % heads;
        let cylinder = track / heads;
        (cylinder as u32, head as u32, sector as u32)
    }
}

fn derive_geometry(len: u64, sector_size: u32) -> Geometry {
    let mut sectors = len / u64::from(sector_size);

    // Floppy-sized images keep the classic 18x2 layout.
    if len <= 2880 * 512 {
        let secpt = 18u64;
        let heads = 2u64;
        return Geometry {
            cylinders: (sectors / secpt / heads) as u16,
            heads: heads as u8,
            sectors_per_track: secpt as u8,
        };
    }

    if sectors > CHS_MAX_SECTORS {
        sectors = CHS_MAX_SECTORS;
    }

    let (secpt, heads) = if sectors >= 65_536 * 16 * 63 {
        (63u64, 32u64)
    } else {
        (63u64, 16u64)
    };
    Geometry {
        cylinders: (sectors / secpt / heads) as u16,
        heads: heads as u8,
        sectors_per_track: secpt as u8,
    }
}

/// A single in-RAM disk image.
pub struct MemDisk {
    name: String,
    bytes: Vec<u8>,
    sector_size: u32,
    geometry: Geometry,
}

impl MemDisk {
    /// Load an image file whole. `.iso` images are served with 2048-byte
    /// sectors, everything else with 512-byte sectors.
    pub fn load(path: &Path) -> Result<Self, DiskError> {
        let bytes = fs::read(path)?;
        let name = path.display().to_string();
        let sector_size = match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("iso") => SECTOR_SIZE_CD,
            _ => SECTOR_SIZE_FIXED,
        };
        Ok(Self::from_bytes(name, bytes, sector_size))
    }

    pub fn from_bytes(name: String, bytes: Vec<u8>, sector_size: u32) -> Self {
        let geometry = derive_geometry(bytes.len() as u64, sector_size);
        Self {
            name,
            bytes,
            sector_size,
            geometry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    /// Total sectors on the disk (not CHS-clamped).
    pub fn sectors(&self) -> u64 {
        self.len() / u64::from(self.sector_size)
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn lba_to_offset(&self, lba: u64) -> u64 {
        lba * u64::from(self.sector_size)
    }

    fn check_io(&self, offset: u64, len: u64) -> Result<(), DiskError> {
        if len % u64::from(self.sector_size) != 0 {
            return Err(DiskError::Misaligned {
                len,
                sector_size: self.sector_size,
            });
        }
        let end = offset.checked_add(len).ok_or(DiskError::OutOfRange {
            offset,
            len,
            size: self.len(),
        })?;
        if end > self.len() {
            return Err(DiskError::OutOfRange {
                offset,
                len,
                size: self.len(),
            });
        }
        Ok(())
    }

    /// Read `dst.len()` bytes starting at the byte offset. The length must
    /// be a whole number of sectors.
    pub fn read(&self, offset: u64, dst: &mut [u8]) -> Result<(), DiskError> {
        self.check_io(offset, dst.len() as u64)?;
        let offset = offset as usize;
        dst.copy_from_slice(&self.bytes[offset..offset + dst.len()]);
        Ok(())
    }

    pub fn write(&mut self, offset: u64, src: &[u8]) -> Result<(), DiskError> {
        self.check_io(offset, src.len() as u64)?;
        let offset = offset as usize;
        self.bytes[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }
}

/// The registration table: at most [`MAX_DISKS`] units, handed out in
/// order.
#[derive(Default)]
pub struct DiskSet {
    disks: Vec<MemDisk>,
}

impl DiskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and register an image; returns the unit index.
    pub fn create(&mut self, path: &Path) -> Result<usize, DiskError> {
        let disk = MemDisk::load(path)?;
        self.register(disk)
    }

    pub fn register(&mut self, disk: MemDisk) -> Result<usize, DiskError> {
        if self.disks.len() >= MAX_DISKS {
            return Err(DiskError::TableFull);
        }
        info!(
            name = disk.name(),
            size = disk.len(),
            sector_size = disk.sector_size(),
            "registered memdisk"
        );
        self.disks.push(disk);
        Ok(self.disks.len() - 1)
    }

    pub fn num_disks(&self) -> usize {
        self.disks.len()
    }

    pub fn get(&self, unit: usize) -> Result<&MemDisk, DiskError> {
        self.disks.get(unit).ok_or(DiskError::NoSuchDisk(unit))
    }

    pub fn get_mut(&mut self, unit: usize) -> Result<&mut MemDisk, DiskError> {
        self.disks.get_mut(unit).ok_or(DiskError::NoSuchDisk(unit))
    }
}
