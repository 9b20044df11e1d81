//! Module image format: bit-exact layout, validation, checksum, assembly.

pub mod builder;
pub mod checksum;
pub mod layout;
pub mod parse;
pub mod types;

pub use builder::ImageBuilder;
pub use layout::{
    HEADER_LEN, IMAGE_MAGIC, MAX_IMAGE_SIZE, MAX_SECTION_SIZE, NAME_LEN, SYMBOL_ENTRY_LEN,
};
pub use parse::{ModuleImage, ParsedDependency, ParsedSymbol};
pub use types::{ModuleFlags, ModuleType, SymbolType, SymbolVisibility};
