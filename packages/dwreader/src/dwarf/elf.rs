use std::path::Path;
use std::sync::Arc;

use cu::pre::*;
use elf::ElfBytes;
use elf::endian::LittleEndian as ElfLittleEndian;
use gimli::{DwarfFileType, EndianSlice, LittleEndian as DwarfLittleEndian};

use scopetree::error::ErrorCode;
use scopetree::fatal;

use crate::dwarf::{In, UnitIter};

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Holder of the DWARF debug info of one input, backed by a shared ELF
/// buffer
pub struct DebugData {
    pub(crate) dwarf: gimli::Dwarf<In<'static>>,
    /// Input path, kept for diagnostics
    pub path: String,
    _buf: PinnedBuf,
}

impl DebugData {
    /// Read the input file and initialize the DWARF parser.
    ///
    /// Inputs without the ELF magic fail with `ERR_INVALID_FILE`; parse
    /// failures of any debug section fail with `ERR_INVALID_DWARF`.
    pub fn open(path: impl AsRef<Path>) -> cu::Result<Arc<Self>> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let bytes = match cu::fs::read(path) {
            Ok(bytes) => bytes,
            Err(_) => fatal!(ErrorCode::ReadFailed, "{display}"),
        };
        if bytes.len() < ELF_MAGIC.len() || bytes[..ELF_MAGIC.len()] != ELF_MAGIC {
            fatal!(ErrorCode::InvalidFile, "{display}");
        }
        match Self::try_parse(bytes.into(), &display) {
            Ok(data) => Ok(data),
            Err(err) => {
                cu::debug!("DWARF load failed for {display}: {err:?}");
                fatal!(ErrorCode::InvalidDwarf, "{display}")
            }
        }
    }

    fn try_parse(buf: Arc<[u8]>, path: &str) -> cu::Result<Arc<Self>> {
        let raw_buf = PinnedBuf::new(buf);
        // safety: the lifetime of raw_buf_ref is managed by the Arc,
        // which lives as long as this DebugData
        let raw_buf_ref: &'static [u8] = unsafe { &*raw_buf.0 };
        let elf_data = ElfBytes::<ElfLittleEndian>::minimal_parse(raw_buf_ref);
        let elf_data = cu::check!(elf_data, "failed to parse ELF")?;

        let mut dwarf = gimli::Dwarf::load(|section| {
            let section_name = section.name();
            let header = cu::check!(
                elf_data.section_header_by_name(section_name),
                "cannot read ELF section header for section {section_name}"
            )?;
            let endian_slice = match header {
                Some(header) => {
                    let start = header.sh_offset as usize;
                    let end = start + header.sh_size as usize;
                    cu::debug!(
                        "found ELF section {section_name} at byte start=0x{start:016x}, end=0x{end:016x}"
                    );
                    EndianSlice::new(&raw_buf_ref[start..end], DwarfLittleEndian)
                }
                None => EndianSlice::new(&[], DwarfLittleEndian),
            };
            cu::Ok(endian_slice)
        })
        .context("failed to load DWARF from ELF")?;
        dwarf.file_type = DwarfFileType::Main;

        Ok(Arc::new(Self {
            dwarf,
            path: path.to_string(),
            _buf: raw_buf,
        }))
    }

    /// Iterate the compile units in file order
    pub fn units(self_: &Arc<Self>) -> UnitIter {
        let iter = self_.dwarf.debug_info.units();
        UnitIter {
            debug_info_iter: iter,
            dwarf: Arc::clone(self_),
        }
    }
}

struct PinnedBuf(*const [u8]);
impl PinnedBuf {
    fn new(buf: Arc<[u8]>) -> Self {
        Self(Arc::into_raw(buf))
    }
}
impl Drop for PinnedBuf {
    fn drop(&mut self) {
        unsafe {
            Arc::from_raw(self.0);
        }
    }
}
unsafe impl Send for PinnedBuf {}
unsafe impl Sync for PinnedBuf {}
