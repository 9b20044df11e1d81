//! Bit-exact on-disk layout of a module image.
//!
//! A module image is a fixed 572-byte header followed by the code section,
//! the initialized-data section, and (within the image file, not the loaded
//! region) the symbol and dependency tables at the offsets the header
//! declares. The BSS section exists only in the loaded region, zero-filled.
//! All integers are little-endian regardless of host.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

// Layer 3: Internal module imports
// (none)

/// Image magic: `"MOD"` packed little-endian.
pub const IMAGE_MAGIC: u32 = 0x4D4F44;

/// The single supported header format version.
pub const FORMAT_VERSION: u32 = 1;

/// Size of the fixed header.
pub const HEADER_LEN: usize = 572;

/// Size of one symbol table entry.
pub const SYMBOL_ENTRY_LEN: usize = 74;

/// Size of one dependency table entry.
pub const DEPENDENCY_ENTRY_LEN: usize = 73;

/// Per-section size cap (code, data, and bss each).
pub const MAX_SECTION_SIZE: u32 = 1024 * 1024;

/// Cap on the loaded region (code + data + bss).
pub const MAX_IMAGE_SIZE: u32 = 1024 * 1024;

/// Fixed-size name field length.
pub const NAME_LEN: usize = 64;

/// Raw header, exactly [`HEADER_LEN`] bytes.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone)]
#[repr(C)]
pub struct RawHeader {
    /// Must equal [`IMAGE_MAGIC`].
    pub magic: U32,
    /// Must equal [`FORMAT_VERSION`].
    pub format_version: U32,
    /// Module version, compared against dependency ranges.
    pub module_version: U32,
    /// NUL-padded module name, unique among loaded modules.
    pub name: [u8; 64],
    /// NUL-padded free-form description.
    pub description: [u8; 256],
    /// NUL-padded author.
    pub author: [u8; 128],
    /// NUL-padded license identifier.
    pub license: [u8; 64],
    /// Module type discriminant (0..=8).
    pub module_type: u8,
    /// Scheduling priority for module-owned actors.
    pub priority: u8,
    /// Flag bitmask.
    pub flags: U16,
    /// Code section size in bytes.
    pub code_size: U32,
    /// Initialized-data section size in bytes.
    pub data_size: U32,
    /// BSS size in bytes (zero-filled at load, absent from the file).
    pub bss_size: U32,
    /// Entry offset from the start of code; 0 = none.
    pub entry_offset: U32,
    /// Exit offset from the start of code; 0 = none.
    pub exit_offset: U32,
    /// Number of symbol table entries.
    pub symbol_count: U32,
    /// Byte offset of the symbol table from the start of the image.
    pub symbol_table_offset: U32,
    /// Number of dependency table entries.
    pub dependency_count: U32,
    /// Byte offset of the dependency table from the start of the image.
    pub dependency_table_offset: U32,
    /// FNV-1a over header (checksum and signature zeroed), code, and data.
    pub checksum: U32,
    /// Reserved for a future signature scheme; must verify as zero-cost
    /// today.
    pub signature: U32,
}

/// Raw symbol table entry, exactly [`SYMBOL_ENTRY_LEN`] bytes.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone)]
#[repr(C)]
pub struct RawSymbol {
    /// NUL-padded symbol name.
    pub name: [u8; 64],
    /// Address relative to the start of the code section.
    pub address_rel: U32,
    /// Size in bytes.
    pub size: U32,
    /// Symbol type discriminant.
    pub sym_type: u8,
    /// Visibility discriminant.
    pub visibility: u8,
}

/// Raw dependency table entry, exactly [`DEPENDENCY_ENTRY_LEN`] bytes.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone)]
#[repr(C)]
pub struct RawDependency {
    /// NUL-padded name of the required module.
    pub name: [u8; 64],
    /// Minimum acceptable module version.
    pub min_version: U32,
    /// Maximum acceptable module version.
    pub max_version: U32,
    /// Non-zero when the dependency is optional.
    pub optional: u8,
}

/// Decode a NUL-padded fixed string field; `None` when not valid UTF-8.
pub fn decode_fixed_str(field: &[u8]) -> Option<&str> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end]).ok()
}

/// Encode a string into a NUL-padded fixed field; `None` when it does not
/// fit (one byte is reserved for the NUL terminator).
pub fn encode_fixed_str<const N: usize>(value: &str) -> Option<[u8; N]> {
    let bytes = value.as_bytes();
    if bytes.len() >= N {
        return None;
    }
    let mut field = [0u8; N];
    field[..bytes.len()].copy_from_slice(bytes);
    Some(field)
}
