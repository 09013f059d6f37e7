//! Durable fail-safe checkpoint
//!
//! Persists the minimal recovery record for an in-flight commissioning
//! window so a crash between a credential command and disarm is recoverable.
//! There is only ever one in-flight fail-safe, so the record lives under a
//! single fixed key.
//!
//! # Record Format
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ Magic: [u8; 4] = b"FSCP"                      │  Offset: 0
//! ├───────────────────────────────────────────────┤
//! │ Version: u32 = 1                              │  Offset: 4
//! ├───────────────────────────────────────────────┤
//! │ Fabric index: u8                              │  Offset: 8
//! ├───────────────────────────────────────────────┤
//! │ NocCommandFlags: u8                           │  Offset: 9
//! ├───────────────────────────────────────────────┤
//! │ CRC32: u32                                    │  Offset: 10
//! └───────────────────────────────────────────────┘
//! ```

use bitflags::bitflags;

use crate::platform::error::StorageError;
use crate::platform::traits::KeyValueStore;
use crate::platform::PlatformError;

use super::error::{FailSafeError, Result};
use super::FabricIndex;

/// Storage key owned by the fail-safe subsystem
pub const CHECKPOINT_KEY: &str = "fs/ctx";

/// Magic number for checkpoint records ("FSCP")
const CHECKPOINT_MAGIC: [u8; 4] = *b"FSCP";

/// Checkpoint format version
const CHECKPOINT_VERSION: u32 = 1;

/// Serialized record length in bytes
pub const CHECKPOINT_LEN: usize = 14;

bitflags! {
    /// Invocation flags persisted with the checkpoint
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NocCommandFlags: u8 {
        /// The "add operational credential" command ran in this window
        const ADD_INVOKED = 0b0000_0001;
        /// The "update operational credential" command ran in this window
        const UPDATE_INVOKED = 0b0000_0010;
    }
}

/// In-flight commissioning state that survives a reboot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    /// Fabric the interrupted window was scoped to
    pub fabric_index: FabricIndex,
    /// Whether the add-NOC command ran before the crash
    pub add_noc_invoked: bool,
    /// Whether the update-NOC command ran before the crash
    pub update_noc_invoked: bool,
}

impl Checkpoint {
    /// Serialize the record
    fn encode(&self) -> [u8; CHECKPOINT_LEN] {
        let mut buf = [0u8; CHECKPOINT_LEN];
        buf[0..4].copy_from_slice(&CHECKPOINT_MAGIC);
        buf[4..8].copy_from_slice(&CHECKPOINT_VERSION.to_le_bytes());
        buf[8] = self.fabric_index;

        let mut flags = NocCommandFlags::empty();
        if self.add_noc_invoked {
            flags |= NocCommandFlags::ADD_INVOKED;
        }
        if self.update_noc_invoked {
            flags |= NocCommandFlags::UPDATE_INVOKED;
        }
        buf[9] = flags.bits();

        let crc = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC)
            .checksum(&buf[0..CHECKPOINT_LEN - 4]);
        buf[CHECKPOINT_LEN - 4..].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Deserialize and validate a record
    fn decode(buf: &[u8]) -> core::result::Result<Self, StorageError> {
        if buf.len() != CHECKPOINT_LEN {
            return Err(StorageError::CorruptRecord);
        }

        if buf[0..4] != CHECKPOINT_MAGIC {
            return Err(StorageError::CorruptRecord);
        }

        let version = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        if version != CHECKPOINT_VERSION {
            return Err(StorageError::CorruptRecord);
        }

        let stored_crc = u32::from_le_bytes([
            buf[CHECKPOINT_LEN - 4],
            buf[CHECKPOINT_LEN - 3],
            buf[CHECKPOINT_LEN - 2],
            buf[CHECKPOINT_LEN - 1],
        ]);
        let calculated_crc = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC)
            .checksum(&buf[0..CHECKPOINT_LEN - 4]);
        if stored_crc != calculated_crc {
            return Err(StorageError::CorruptRecord);
        }

        let flags = NocCommandFlags::from_bits_truncate(buf[9]);
        Ok(Self {
            fabric_index: buf[8],
            add_noc_invoked: flags.contains(NocCommandFlags::ADD_INVOKED),
            update_noc_invoked: flags.contains(NocCommandFlags::UPDATE_INVOKED),
        })
    }
}

/// Commit a checkpoint to durable storage
///
/// Replaces any previous record. The write is synchronous: when this returns
/// `Ok`, the record is durable (per the store's crash-atomic put contract).
pub fn commit_to_storage<S: KeyValueStore>(store: &mut S, checkpoint: &Checkpoint) -> Result<()> {
    store
        .put(CHECKPOINT_KEY, &checkpoint.encode())
        .map_err(FailSafeError::Storage)
}

/// Load the last committed checkpoint
///
/// Returns `Ok(None)` when no record is stored. A record that fails
/// validation is reported as `StorageError::CorruptRecord`.
pub fn load_from_storage<S: KeyValueStore>(store: &mut S) -> Result<Option<Checkpoint>> {
    let mut buf = [0u8; CHECKPOINT_LEN];
    let len = match store.get(CHECKPOINT_KEY, &mut buf) {
        Ok(len) => len,
        Err(PlatformError::Storage(StorageError::NotFound)) => return Ok(None),
        Err(e) => return Err(FailSafeError::Storage(e)),
    };

    Checkpoint::decode(&buf[..len])
        .map(Some)
        .map_err(|e| FailSafeError::Storage(e.into()))
}

/// Delete the checkpoint record
///
/// Deleting when no record exists is a no-op success.
pub fn clear_storage<S: KeyValueStore>(store: &mut S) -> Result<()> {
    store.delete(CHECKPOINT_KEY).map_err(FailSafeError::Storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockKeyValueStore;

    #[test]
    fn test_checkpoint_roundtrip() {
        let mut store = MockKeyValueStore::new();
        let checkpoint = Checkpoint {
            fabric_index: 3,
            add_noc_invoked: true,
            update_noc_invoked: false,
        };

        commit_to_storage(&mut store, &checkpoint).unwrap();
        let loaded = load_from_storage(&mut store).unwrap();
        assert_eq!(loaded, Some(checkpoint));
    }

    #[test]
    fn test_checkpoint_absent_record() {
        let mut store = MockKeyValueStore::new();
        assert_eq!(load_from_storage(&mut store).unwrap(), None);
    }

    #[test]
    fn test_checkpoint_commit_replaces_record() {
        let mut store = MockKeyValueStore::new();
        let first = Checkpoint {
            fabric_index: 1,
            add_noc_invoked: true,
            update_noc_invoked: false,
        };
        let second = Checkpoint {
            fabric_index: 2,
            add_noc_invoked: true,
            update_noc_invoked: true,
        };

        commit_to_storage(&mut store, &first).unwrap();
        commit_to_storage(&mut store, &second).unwrap();
        assert_eq!(load_from_storage(&mut store).unwrap(), Some(second));
    }

    #[test]
    fn test_checkpoint_clear_then_load_is_none() {
        let mut store = MockKeyValueStore::new();
        let checkpoint = Checkpoint {
            fabric_index: 1,
            add_noc_invoked: true,
            update_noc_invoked: true,
        };

        commit_to_storage(&mut store, &checkpoint).unwrap();
        clear_storage(&mut store).unwrap();
        assert_eq!(load_from_storage(&mut store).unwrap(), None);

        // Clearing again stays a no-op success
        clear_storage(&mut store).unwrap();
    }

    #[test]
    fn test_checkpoint_corrupt_record_rejected() {
        let mut store = MockKeyValueStore::new();
        let checkpoint = Checkpoint {
            fabric_index: 1,
            add_noc_invoked: false,
            update_noc_invoked: true,
        };

        commit_to_storage(&mut store, &checkpoint).unwrap();
        store.inject_corruption(CHECKPOINT_KEY);

        let result = load_from_storage(&mut store);
        assert_eq!(
            result,
            Err(FailSafeError::Storage(PlatformError::Storage(
                StorageError::CorruptRecord
            )))
        );
    }

    #[test]
    fn test_checkpoint_decode_rejects_bad_magic() {
        let checkpoint = Checkpoint {
            fabric_index: 1,
            add_noc_invoked: true,
            update_noc_invoked: false,
        };
        let mut buf = checkpoint.encode();
        buf[0] = b'X';

        assert_eq!(Checkpoint::decode(&buf), Err(StorageError::CorruptRecord));
    }

    #[test]
    fn test_checkpoint_decode_rejects_bad_version() {
        let checkpoint = Checkpoint {
            fabric_index: 1,
            add_noc_invoked: true,
            update_noc_invoked: false,
        };
        let mut buf = checkpoint.encode();
        buf[4] = 0xFF;

        assert_eq!(Checkpoint::decode(&buf), Err(StorageError::CorruptRecord));
    }

    #[test]
    fn test_checkpoint_decode_rejects_short_record() {
        assert_eq!(
            Checkpoint::decode(&[0u8; CHECKPOINT_LEN - 1]),
            Err(StorageError::CorruptRecord)
        );
    }

    #[test]
    fn test_checkpoint_flag_bits_are_stable() {
        // Persisted bit assignments must not drift between versions
        assert_eq!(NocCommandFlags::ADD_INVOKED.bits(), 0x01);
        assert_eq!(NocCommandFlags::UPDATE_INVOKED.bits(), 0x02);
    }
}
