//! Image assembly for tooling and tests.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use zerocopy::{FromZeros, IntoBytes};

// Layer 3: Internal module imports
use super::checksum::image_checksum;
use super::layout::{
    encode_fixed_str, RawDependency, RawHeader, RawSymbol, FORMAT_VERSION, HEADER_LEN, IMAGE_MAGIC,
};
use super::parse::priority_to_raw;
use super::types::{ModuleFlags, ModuleType, SymbolType, SymbolVisibility};
use kernos_rt::Priority;

/// Assembles a well-formed module image: header, code, data, symbol table,
/// dependency table, with offsets and checksum computed.
///
/// # Example
/// ```rust
/// use kernos_mods::image::{ImageBuilder, ModuleImage, ModuleType};
///
/// let bytes = ImageBuilder::new("mod_demo", 1)
///     .module_type(ModuleType::Custom)
///     .code(&[0x90, 0x90, 0xc3])
///     .export("demo_fn", 0, 3)
///     .build();
/// let image = ModuleImage::parse(&bytes, true).unwrap();
/// assert_eq!(image.name, "mod_demo");
/// assert_eq!(image.symbols.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    name: String,
    version: u32,
    description: String,
    author: String,
    license: String,
    module_type: ModuleType,
    priority: Priority,
    flags: ModuleFlags,
    code: Vec<u8>,
    data: Vec<u8>,
    bss_size: u32,
    entry_offset: u32,
    exit_offset: u32,
    symbols: Vec<(String, u32, u32, SymbolType, SymbolVisibility)>,
    dependencies: Vec<(String, u32, u32, bool)>,
}

impl ImageBuilder {
    /// Start an image for `name` at `version`.
    pub fn new(name: &str, version: u32) -> Self {
        Self {
            name: name.to_owned(),
            version,
            description: String::new(),
            author: String::new(),
            license: String::new(),
            module_type: ModuleType::Custom,
            priority: Priority::Normal,
            flags: ModuleFlags::NONE,
            code: Vec::new(),
            data: Vec::new(),
            bss_size: 0,
            entry_offset: 0,
            exit_offset: 0,
            symbols: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Set the module type.
    pub fn module_type(mut self, module_type: ModuleType) -> Self {
        self.module_type = module_type;
        self
    }

    /// Set the priority class.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the flag bitmask.
    pub fn flags(mut self, flags: ModuleFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set description, author, and license fields.
    pub fn metadata(mut self, description: &str, author: &str, license: &str) -> Self {
        self.description = description.to_owned();
        self.author = author.to_owned();
        self.license = license.to_owned();
        self
    }

    /// Set the code section.
    pub fn code(mut self, code: &[u8]) -> Self {
        self.code = code.to_vec();
        self
    }

    /// Set the initialized-data section.
    pub fn data(mut self, data: &[u8]) -> Self {
        self.data = data.to_vec();
        self
    }

    /// Set the BSS size.
    pub fn bss(mut self, bss_size: u32) -> Self {
        self.bss_size = bss_size;
        self
    }

    /// Set entry and exit offsets into the code section.
    pub fn entry_points(mut self, entry: u32, exit: u32) -> Self {
        self.entry_offset = entry;
        self.exit_offset = exit;
        self
    }

    /// Add a global function export.
    pub fn export(mut self, name: &str, address_rel: u32, size: u32) -> Self {
        self.symbols.push((
            name.to_owned(),
            address_rel,
            size,
            SymbolType::Function,
            SymbolVisibility::Global,
        ));
        self
    }

    /// Add a symbol with explicit attributes.
    pub fn symbol(
        mut self,
        name: &str,
        address_rel: u32,
        size: u32,
        sym_type: SymbolType,
        visibility: SymbolVisibility,
    ) -> Self {
        self.symbols
            .push((name.to_owned(), address_rel, size, sym_type, visibility));
        self
    }

    /// Add a required dependency with a version range.
    pub fn depends_on(mut self, name: &str, min_version: u32, max_version: u32) -> Self {
        self.dependencies
            .push((name.to_owned(), min_version, max_version, false));
        self
    }

    /// Add an optional dependency.
    pub fn depends_optionally_on(mut self, name: &str, min_version: u32, max_version: u32) -> Self {
        self.dependencies
            .push((name.to_owned(), min_version, max_version, true));
        self
    }

    /// Assemble the image bytes. Field overflow (a name that does not fit
    /// its fixed field) truncates to an empty field and will fail
    /// validation, which is what a test building a hostile image wants.
    pub fn build(self) -> Vec<u8> {
        let symbol_table_offset = HEADER_LEN + self.code.len() + self.data.len();
        let dependency_table_offset =
            symbol_table_offset + self.symbols.len() * std::mem::size_of::<RawSymbol>();

        let mut header = RawHeader::new_zeroed();
        header.magic.set(IMAGE_MAGIC);
        header.format_version.set(FORMAT_VERSION);
        header.module_version.set(self.version);
        header.name = encode_fixed_str(&self.name).unwrap_or([0u8; 64]);
        header.description = encode_fixed_str(&self.description).unwrap_or([0u8; 256]);
        header.author = encode_fixed_str(&self.author).unwrap_or([0u8; 128]);
        header.license = encode_fixed_str(&self.license).unwrap_or([0u8; 64]);
        header.module_type = self.module_type.to_raw();
        header.priority = priority_to_raw(self.priority);
        header.flags.set(self.flags.to_raw());
        header.code_size.set(self.code.len() as u32);
        header.data_size.set(self.data.len() as u32);
        header.bss_size.set(self.bss_size);
        header.entry_offset.set(self.entry_offset);
        header.exit_offset.set(self.exit_offset);
        header.symbol_count.set(self.symbols.len() as u32);
        header.symbol_table_offset.set(symbol_table_offset as u32);
        header.dependency_count.set(self.dependencies.len() as u32);
        header
            .dependency_table_offset
            .set(dependency_table_offset as u32);
        header
            .checksum
            .set(image_checksum(&header, &self.code, &self.data));

        let mut bytes = Vec::with_capacity(
            dependency_table_offset + self.dependencies.len() * std::mem::size_of::<RawDependency>(),
        );
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&self.code);
        bytes.extend_from_slice(&self.data);
        for (name, address_rel, size, sym_type, visibility) in &self.symbols {
            let mut raw = RawSymbol::new_zeroed();
            raw.name = encode_fixed_str(name).unwrap_or([0u8; 64]);
            raw.address_rel.set(*address_rel);
            raw.size.set(*size);
            raw.sym_type = sym_type.to_raw();
            raw.visibility = visibility.to_raw();
            bytes.extend_from_slice(raw.as_bytes());
        }
        for (name, min_version, max_version, optional) in &self.dependencies {
            let mut raw = RawDependency::new_zeroed();
            raw.name = encode_fixed_str(name).unwrap_or([0u8; 64]);
            raw.min_version.set(*min_version);
            raw.max_version.set(*max_version);
            raw.optional = u8::from(*optional);
            bytes.extend_from_slice(raw.as_bytes());
        }
        bytes
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;
    use crate::error::ImageError;
    use crate::image::parse::ModuleImage;

    #[test]
    fn test_minimal_image_parses() {
        let bytes = ImageBuilder::new("mod_min", 3).code(&[0xc3]).build();
        let image = ModuleImage::parse(&bytes, true).unwrap();
        assert_eq!(image.name, "mod_min");
        assert_eq!(image.version, 3);
        assert_eq!(image.code, &[0xc3]);
        assert!(image.symbols.is_empty());
        assert!(image.dependencies.is_empty());
    }

    #[test]
    fn test_full_image_roundtrip() {
        let bytes = ImageBuilder::new("mod_full", 2)
            .module_type(ModuleType::Driver)
            .priority(Priority::High)
            .flags(ModuleFlags::AUTO_START | ModuleFlags::HOT_SWAP)
            .metadata("a driver", "kernos", "MIT")
            .code(&[0x90; 32])
            .data(&[0xaa; 16])
            .bss(64)
            .entry_points(4, 8)
            .export("drv_read", 0, 16)
            .symbol("drv_state", 32, 16, SymbolType::Object, SymbolVisibility::Local)
            .depends_on("mod_core", 1, 5)
            .depends_optionally_on("mod_debug", 1, 1)
            .build();

        let image = ModuleImage::parse(&bytes, true).unwrap();
        assert_eq!(image.module_type, ModuleType::Driver);
        assert_eq!(image.priority, Priority::High);
        assert!(image.flags.contains(ModuleFlags::HOT_SWAP));
        assert_eq!(image.description, "a driver");
        assert_eq!(image.bss_size, 64);
        assert_eq!(image.entry_offset, 4);
        assert_eq!(image.symbols.len(), 2);
        assert_eq!(image.dependencies.len(), 2);
        assert!(image.dependencies[1].optional);
        assert_eq!(image.region_size(), 32 + 16 + 64);
    }

    #[test]
    fn test_corrupted_byte_fails_checksum() {
        let mut bytes = ImageBuilder::new("mod_sum", 1).code(&[1, 2, 3, 4]).build();
        let code_start = HEADER_LEN;
        bytes[code_start] ^= 0xff;
        let err = ModuleImage::parse(&bytes, true).unwrap_err();
        assert!(matches!(err, ImageError::BadChecksum { .. }));
        // Checksum verification disabled: the same image parses.
        assert!(ModuleImage::parse(&bytes, false).is_ok());
    }

    #[test]
    fn test_truncated_image_rejected() {
        let bytes = ImageBuilder::new("mod_trunc", 1).code(&[0; 64]).build();
        let err = ModuleImage::parse(&bytes[..bytes.len() - 1], true).unwrap_err();
        assert!(matches!(err, ImageError::Truncated { .. }));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = ImageBuilder::new("mod_magic", 1).build();
        bytes[0] = 0;
        let err = ModuleImage::parse(&bytes, true).unwrap_err();
        assert!(matches!(err, ImageError::BadMagic { .. }));
    }

    #[test]
    fn test_entry_offset_outside_code_rejected() {
        let bytes = ImageBuilder::new("mod_entry", 1)
            .code(&[0x90; 8])
            .entry_points(8, 0)
            .build();
        let err = ModuleImage::parse(&bytes, true).unwrap_err();
        assert_eq!(
            err,
            ImageError::BadEntryOffset {
                which: "entry",
                offset: 8,
                code_size: 8
            }
        );
    }
}
