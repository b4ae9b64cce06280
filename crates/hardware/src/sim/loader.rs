//! Program loading and boot ROM setup.
//!
//! This module populates the paged store before a run. It performs:
//! 1. **ELF loading:** Validates a RISC-V executable and copies every `PT_LOAD` segment to
//!    its physical address, zero-filling the part of the segment not backed by the file.
//! 2. **Symbols:** Returns the defined symbols by name so harnesses can locate test
//!    variables such as `tohost`.
//! 3. **Reset vector:** Writes the boot trampoline that jumps to the program entry.
//!
//! A failed load is always reported; nothing is left half loaded silently.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use object::elf::{FileHeader32, FileHeader64, PT_LOAD};
use object::read::elf::{ElfFile, FileHeader, ProgramHeader};
use object::{Architecture, Endianness, Object, ObjectKind, ObjectSymbol};

use crate::common::constants::{
    RESET_VECTOR_WORDS, RV_ADDI_A1_T0, RV_AUIPC_T0, RV_CSRR_A0_MHARTID, RV_JR_T0, RV_LD_T0_24,
    RV_LW_T0_24,
};
use crate::common::error::{LoadError, MemError};
use crate::soc::memory::SparseMemory;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Result of loading a program image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadedImage {
    /// Program entry address.
    pub entry: u64,
    /// Defined symbols by name.
    pub symbols: BTreeMap<String, u64>,
    /// Number of loadable segments copied.
    pub segments: usize,
}

impl LoadedImage {
    /// Returns the address of `name`, if the image defines it.
    pub fn symbol(&self, name: &str) -> Option<u64> {
        self.symbols.get(name).copied()
    }
}

/// Reads the ELF file at `path` and loads it into `store`.
///
/// # Arguments
///
/// * `path` - Location of the executable.
/// * `store` - Store receiving the segments.
/// * `xlen` - Register width of the simulated hart; the ELF class must match it.
pub fn load_elf(
    path: impl AsRef<Path>,
    store: &mut SparseMemory,
    xlen: u32,
) -> Result<LoadedImage, LoadError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let image = load_elf_bytes(&data, store, xlen)?;
    tracing::info!(
        path = %path.display(),
        entry = format_args!("{:#x}", image.entry),
        segments = image.segments,
        symbols = image.symbols.len(),
        "ELF loaded"
    );
    Ok(image)
}

/// Validates an in-memory ELF image and loads it into `store`.
pub fn load_elf_bytes(
    data: &[u8],
    store: &mut SparseMemory,
    xlen: u32,
) -> Result<LoadedImage, LoadError> {
    if data.get(..4) != Some(&ELF_MAGIC[..]) {
        return Err(LoadError::BadMagic);
    }
    let file = object::File::parse(data).map_err(|e| LoadError::Malformed(e.to_string()))?;

    match file.architecture() {
        Architecture::Riscv32 | Architecture::Riscv64 => {}
        other => return Err(LoadError::UnsupportedArchitecture(format!("{other:?}"))),
    }
    if !file.is_little_endian() {
        return Err(LoadError::BigEndian);
    }
    let found = if file.is_64() { 64 } else { 32 };
    if found != xlen {
        return Err(LoadError::WordSize {
            expected: xlen,
            found,
        });
    }
    if file.kind() != ObjectKind::Executable {
        return Err(LoadError::NotExecutable);
    }

    let segments = if file.is_64() {
        load_segments::<FileHeader64<Endianness>>(data, store)?
    } else {
        load_segments::<FileHeader32<Endianness>>(data, store)?
    };
    if segments == 0 {
        tracing::warn!("no loadable segments in ELF image");
    }

    let symbols = file
        .symbols()
        .filter(ObjectSymbol::is_definition)
        .filter_map(|sym| {
            let name = sym.name().ok()?;
            (!name.is_empty()).then(|| (name.to_owned(), sym.address()))
        })
        .collect();

    Ok(LoadedImage {
        entry: file.entry(),
        symbols,
        segments,
    })
}

fn load_segments<Elf: FileHeader<Endian = Endianness>>(
    data: &[u8],
    store: &mut SparseMemory,
) -> Result<usize, LoadError> {
    let elf: ElfFile<'_, Elf> =
        ElfFile::parse(data).map_err(|e| LoadError::Malformed(e.to_string()))?;
    let endian = elf.endian();
    let mut count = 0;
    for ph in elf.elf_program_headers() {
        if ph.p_type(endian) != PT_LOAD {
            continue;
        }
        let paddr: u64 = ph.p_paddr(endian).into();
        let filesz: u64 = ph.p_filesz(endian).into();
        let memsz: u64 = ph.p_memsz(endian).into();
        let bytes = ph
            .data(endian, data)
            .map_err(|()| LoadError::SegmentOutOfBounds { paddr })?;
        tracing::debug!(
            paddr = format_args!("{paddr:#x}"),
            filesz,
            memsz,
            "loading segment"
        );
        // Untouched pages already read as zero; clear only resident ones, bss included.
        store.clear(paddr, memsz.max(filesz))?;
        store.load(paddr, bytes)?;
        count += 1;
    }
    Ok(count)
}

/// Writes `words` as consecutive little-endian 32-bit values starting at `addr`.
pub fn load_words(store: &mut SparseMemory, addr: u64, words: &[u32]) -> Result<(), MemError> {
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    store.load(addr, &bytes)
}

/// Returns the boot trampoline that loads `entry` and jumps to it.
///
/// The hart id is placed in `a0` and `a1` points just past the trampoline.
pub fn reset_vector(entry: u64, xlen: u32) -> [u32; RESET_VECTOR_WORDS] {
    [
        RV_AUIPC_T0,
        RV_ADDI_A1_T0 + (((RESET_VECTOR_WORDS as u32) * 4) << 20),
        RV_CSRR_A0_MHARTID,
        if xlen == 32 { RV_LW_T0_24 } else { RV_LD_T0_24 },
        RV_JR_T0,
        0,
        entry as u32,
        (entry >> 32) as u32,
    ]
}

/// Installs the reset trampoline for `entry` at `rom_base`.
pub fn install_reset_vector(
    store: &mut SparseMemory,
    rom_base: u64,
    entry: u64,
    xlen: u32,
) -> Result<(), MemError> {
    load_words(store, rom_base, &reset_vector(entry, xlen))?;
    tracing::info!(
        rom = format_args!("{rom_base:#x}"),
        entry = format_args!("{entry:#x}"),
        "reset vector installed"
    );
    Ok(())
}
