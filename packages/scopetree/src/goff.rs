use cu::pre::*;

/// Global offset into DWARF
///
/// A Goff uniquely identifies a DIE within one input file, and is the
/// stable identity of the scope-tree node created from it. It is not
/// stable across different inputs.
#[rustfmt::skip]
#[derive(
    DebugCustom, Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord,
    From, Into, Display
)]
#[display("0x{:08x}", self.0)]
#[debug("0x{:08x}", self.0)]
pub struct Goff(pub u64);

impl Goff {
    /// Hex form without zero padding, as used by the YAML output
    pub fn to_hex(self) -> String {
        format!("0x{:x}", self.0)
    }
}
