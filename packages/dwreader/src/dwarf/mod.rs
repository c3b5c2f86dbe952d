mod elf;
pub use elf::*;
mod unit;
pub use unit::*;
mod die;
pub use die::*;

pub type In<'i> = gimli::EndianSlice<'i, gimli::LittleEndian>;
pub type Tag = gimli::DwTag;
