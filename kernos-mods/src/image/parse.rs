//! Image decoding and validation.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use zerocopy::FromBytes;

// Layer 3: Internal module imports
use super::checksum::image_checksum;
use super::layout::{
    decode_fixed_str, RawDependency, RawHeader, RawSymbol, DEPENDENCY_ENTRY_LEN, FORMAT_VERSION,
    HEADER_LEN, IMAGE_MAGIC, MAX_IMAGE_SIZE, MAX_SECTION_SIZE, SYMBOL_ENTRY_LEN,
};
use super::types::{ModuleFlags, ModuleType, SymbolType, SymbolVisibility};
use crate::error::ImageError;
use kernos_rt::Priority;

/// A validated symbol table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSymbol {
    /// Symbol name.
    pub name: String,
    /// Address relative to the start of the code section.
    pub address_rel: u32,
    /// Size in bytes.
    pub size: u32,
    /// Function or data object.
    pub sym_type: SymbolType,
    /// Only `Global` symbols reach the resolver.
    pub visibility: SymbolVisibility,
}

/// A validated dependency table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDependency {
    /// Required module name.
    pub name: String,
    /// Minimum acceptable version.
    pub min_version: u32,
    /// Maximum acceptable version.
    pub max_version: u32,
    /// Whether the load may proceed without it.
    pub optional: bool,
}

impl ParsedDependency {
    /// Whether `version` satisfies this dependency's range.
    pub fn accepts(&self, version: u32) -> bool {
        self.min_version <= version && version <= self.max_version
    }
}

/// A fully validated module image, borrowing the source buffer.
///
/// Produced by [`ModuleImage::parse`]; the registry copies the sections into
/// the module's owned region at load time.
#[derive(Debug)]
pub struct ModuleImage<'a> {
    /// Module name (unique among loaded modules).
    pub name: String,
    /// Module version.
    pub version: u32,
    /// Free-form description.
    pub description: String,
    /// Author field.
    pub author: String,
    /// License identifier.
    pub license: String,
    /// Module type.
    pub module_type: ModuleType,
    /// Priority class for module-owned actors.
    pub priority: Priority,
    /// Flag bitmask.
    pub flags: ModuleFlags,
    /// Code section bytes.
    pub code: &'a [u8],
    /// Initialized-data section bytes.
    pub data: &'a [u8],
    /// BSS size, zero-filled in the loaded region.
    pub bss_size: u32,
    /// Entry offset from the start of code; 0 = none.
    pub entry_offset: u32,
    /// Exit offset from the start of code; 0 = none.
    pub exit_offset: u32,
    /// Validated symbol table.
    pub symbols: Vec<ParsedSymbol>,
    /// Validated dependency table.
    pub dependencies: Vec<ParsedDependency>,
}

impl<'a> ModuleImage<'a> {
    /// Total size of the loaded region: code + data + bss.
    pub fn region_size(&self) -> usize {
        self.code.len() + self.data.len() + self.bss_size as usize
    }

    /// Decode and validate an image buffer.
    ///
    /// Runs the full validation contract: magic, format version, bounded
    /// section sizes, buffer coverage, table integrity, and (when
    /// `verify_checksum`) the image checksum. Signature verification is
    /// reserved and never performed.
    pub fn parse(bytes: &'a [u8], verify_checksum: bool) -> Result<Self, ImageError> {
        if bytes.len() < HEADER_LEN {
            return Err(ImageError::TooShort {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let header = RawHeader::read_from_bytes(&bytes[..HEADER_LEN])
            .map_err(|_| ImageError::TooShort {
                expected: HEADER_LEN,
                actual: bytes.len(),
            })?;

        if header.magic.get() != IMAGE_MAGIC {
            return Err(ImageError::BadMagic {
                found: header.magic.get(),
            });
        }
        if header.format_version.get() != FORMAT_VERSION {
            return Err(ImageError::UnsupportedVersion {
                found: header.format_version.get(),
            });
        }

        let module_type = ModuleType::from_raw(header.module_type).ok_or(
            ImageError::UnknownType {
                found: header.module_type,
            },
        )?;
        let flags = ModuleFlags::from_raw(header.flags.get()).ok_or(ImageError::UnknownFlags {
            found: header.flags.get(),
        })?;
        let priority = priority_from_raw(header.priority).ok_or(ImageError::UnknownPriority {
            found: header.priority,
        })?;

        let name = decode_fixed_str(&header.name)
            .filter(|name| !name.is_empty())
            .ok_or(ImageError::BadName)?
            .to_owned();
        let description = decode_fixed_str(&header.description)
            .unwrap_or_default()
            .to_owned();
        let author = decode_fixed_str(&header.author).unwrap_or_default().to_owned();
        let license = decode_fixed_str(&header.license)
            .unwrap_or_default()
            .to_owned();

        let code_size = header.code_size.get();
        let data_size = header.data_size.get();
        let bss_size = header.bss_size.get();
        for (section, size) in [("code", code_size), ("data", data_size), ("bss", bss_size)] {
            if size > MAX_SECTION_SIZE {
                return Err(ImageError::SectionTooLarge {
                    section,
                    size,
                    max: MAX_SECTION_SIZE,
                });
            }
        }
        let total = u64::from(code_size) + u64::from(data_size) + u64::from(bss_size);
        if total > u64::from(MAX_IMAGE_SIZE) {
            return Err(ImageError::ImageTooLarge {
                total,
                max: MAX_IMAGE_SIZE,
            });
        }

        let code = take_range(bytes, HEADER_LEN, code_size as usize, "code section")?;
        let data = take_range(
            bytes,
            HEADER_LEN + code_size as usize,
            data_size as usize,
            "data section",
        )?;

        for (which, offset) in [
            ("entry", header.entry_offset.get()),
            ("exit", header.exit_offset.get()),
        ] {
            if offset != 0 && offset >= code_size {
                return Err(ImageError::BadEntryOffset {
                    which,
                    offset,
                    code_size,
                });
            }
        }

        let symbols = parse_symbols(bytes, &header, total)?;
        let dependencies = parse_dependencies(bytes, &header)?;

        if verify_checksum {
            let computed = image_checksum(&header, code, data);
            if computed != header.checksum.get() {
                return Err(ImageError::BadChecksum {
                    stored: header.checksum.get(),
                    computed,
                });
            }
        }

        Ok(ModuleImage {
            name,
            version: header.module_version.get(),
            description,
            author,
            license,
            module_type,
            priority,
            flags,
            code,
            data,
            bss_size,
            entry_offset: header.entry_offset.get(),
            exit_offset: header.exit_offset.get(),
            symbols,
            dependencies,
        })
    }
}

/// Decode the header priority discriminant (0 = Critical .. 4 = Idle).
pub fn priority_from_raw(raw: u8) -> Option<Priority> {
    Some(match raw {
        0 => Priority::Critical,
        1 => Priority::High,
        2 => Priority::Normal,
        3 => Priority::Low,
        4 => Priority::Idle,
        _ => return None,
    })
}

/// Header priority discriminant for a priority class.
pub fn priority_to_raw(priority: Priority) -> u8 {
    match priority {
        Priority::Critical => 0,
        Priority::High => 1,
        Priority::Normal => 2,
        Priority::Low => 3,
        Priority::Idle => 4,
    }
}

fn take_range<'a>(
    bytes: &'a [u8],
    start: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], ImageError> {
    let end = start.checked_add(len).ok_or(ImageError::Truncated {
        what,
        start,
        end: usize::MAX,
        actual: bytes.len(),
    })?;
    bytes.get(start..end).ok_or(ImageError::Truncated {
        what,
        start,
        end,
        actual: bytes.len(),
    })
}

fn parse_symbols(
    bytes: &[u8],
    header: &RawHeader,
    region_total: u64,
) -> Result<Vec<ParsedSymbol>, ImageError> {
    let count = header.symbol_count.get() as usize;
    let offset = header.symbol_table_offset.get() as usize;
    let table = take_range(bytes, offset, count * SYMBOL_ENTRY_LEN, "symbol table")?;

    let mut symbols = Vec::with_capacity(count);
    for (index, chunk) in table.chunks_exact(SYMBOL_ENTRY_LEN).enumerate() {
        let raw = RawSymbol::read_from_bytes(chunk).map_err(|_| ImageError::BadSymbol {
            index,
            reason: "entry size",
        })?;
        let name = decode_fixed_str(&raw.name)
            .filter(|name| !name.is_empty())
            .ok_or(ImageError::BadSymbol {
                index,
                reason: "name",
            })?
            .to_owned();
        let sym_type = SymbolType::from_raw(raw.sym_type).ok_or(ImageError::BadSymbol {
            index,
            reason: "type discriminant",
        })?;
        let visibility =
            SymbolVisibility::from_raw(raw.visibility).ok_or(ImageError::BadSymbol {
                index,
                reason: "visibility discriminant",
            })?;
        let address_rel = raw.address_rel.get();
        let size = raw.size.get();
        if u64::from(address_rel) + u64::from(size) > region_total {
            return Err(ImageError::BadSymbol {
                index,
                reason: "range outside image",
            });
        }
        symbols.push(ParsedSymbol {
            name,
            address_rel,
            size,
            sym_type,
            visibility,
        });
    }
    Ok(symbols)
}

fn parse_dependencies(bytes: &[u8], header: &RawHeader) -> Result<Vec<ParsedDependency>, ImageError> {
    let count = header.dependency_count.get() as usize;
    let offset = header.dependency_table_offset.get() as usize;
    let table = take_range(
        bytes,
        offset,
        count * DEPENDENCY_ENTRY_LEN,
        "dependency table",
    )?;

    let mut dependencies = Vec::with_capacity(count);
    for (index, chunk) in table.chunks_exact(DEPENDENCY_ENTRY_LEN).enumerate() {
        let raw = RawDependency::read_from_bytes(chunk).map_err(|_| ImageError::BadDependency {
            index,
            reason: "entry size",
        })?;
        let name = decode_fixed_str(&raw.name)
            .filter(|name| !name.is_empty())
            .ok_or(ImageError::BadDependency {
                index,
                reason: "name",
            })?
            .to_owned();
        if raw.min_version.get() > raw.max_version.get() {
            return Err(ImageError::BadDependency {
                index,
                reason: "empty version range",
            });
        }
        dependencies.push(ParsedDependency {
            name,
            min_version: raw.min_version.get(),
            max_version: raw.max_version.get(),
            optional: raw.optional != 0,
        });
    }
    Ok(dependencies)
}
