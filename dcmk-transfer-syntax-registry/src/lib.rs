//! The registry of DICOM transfer syntaxes known at compile time: maps a
//! transfer syntax UID to its [`TransferSyntax`] descriptor.
//!
//! This crate does not itself decode compressed pixel data — codecs for
//! encapsulated transfer syntaxes are registered separately, by UID, into
//! the `CodecRegistry` that `dcmk-pixeldata` exposes.

pub mod entries;

#[cfg(feature = "deflate")]
pub mod deflate;

use dcmk_encoding::transfer_syntax::TransferSyntaxIndex;
pub use dcmk_encoding::TransferSyntax;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;

/// Backing store for the registry: a UID-keyed lookup table built once,
/// behind [`lazy_static`], per the toolkit's policy of process-wide
/// read-only tables rather than runtime registration machinery.
pub struct TransferSyntaxRegistryImpl {
    table: HashMap<&'static str, TransferSyntax>,
}

impl fmt::Debug for TransferSyntaxRegistryImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: HashMap<&str, &str> = self.table.iter().map(|(uid, ts)| (*uid, ts.name())).collect();
        f.debug_struct("TransferSyntaxRegistryImpl").field("table", &names).finish()
    }
}

impl TransferSyntaxRegistryImpl {
    fn get(&self, uid: &str) -> Option<&TransferSyntax> {
        let uid = dcmk_encoding::transfer_syntax::trim_uid(uid);
        self.table.get(uid)
    }

    /// Iterate over every known transfer syntax.
    pub fn iter(&self) -> impl Iterator<Item = &TransferSyntax> {
        self.table.values()
    }
}

lazy_static! {
    static ref REGISTRY: TransferSyntaxRegistryImpl = {
        let mut table = HashMap::with_capacity(entries::BUILT_IN.len());
        for ts in entries::BUILT_IN {
            if table.insert(ts.uid(), *ts).is_some() {
                tracing::warn!("duplicate transfer syntax UID in built-in table: {}", ts.uid());
            }
        }
        TransferSyntaxRegistryImpl { table }
    };
}

/// Zero-sized handle to the process-wide transfer syntax registry.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TransferSyntaxRegistry;

impl TransferSyntaxRegistry {
    /// Iterate over every known transfer syntax.
    pub fn iter(&self) -> impl Iterator<Item = &'static TransferSyntax> {
        REGISTRY.table.values()
    }
}

impl TransferSyntaxIndex for TransferSyntaxRegistry {
    fn get(&self, uid: &str) -> Option<&TransferSyntax> {
        REGISTRY.get(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_implicit_vr_little_endian() {
        let ts = TransferSyntaxRegistry.get("1.2.840.10008.1.2").unwrap();
        assert_eq!(ts.name(), "Implicit VR Little Endian");
        assert!(!ts.is_explicit_vr());
    }

    #[test]
    fn tolerates_nul_padding() {
        assert!(TransferSyntaxRegistry.get("1.2.840.10008.1.2.1\0").is_some());
    }

    #[test]
    fn unknown_uid_is_absent() {
        assert!(TransferSyntaxRegistry.get("1.2.3.4.5.6.7.8.9").is_none());
    }

    #[test]
    fn encapsulated_syntaxes_report_their_codec_requirement() {
        let ts = TransferSyntaxRegistry.get("1.2.840.10008.1.2.5").unwrap();
        assert!(ts.is_encapsulated());
    }
}
