//! Fixed 24-byte record layout: carbon, hydrogen, oxygen as little-endian
//! `u64` values.

use std::mem::size_of;

use crate::inventory::Inventory;

const FIELD_LEN: usize = size_of::<u64>();

/// Record size in bytes.
pub(super) const RECORD_LEN: usize = 3 * FIELD_LEN;

/// Record size as a file length.
pub(super) const RECORD_FILE_LEN: u64 = 24;

/// Decodes the record at the start of `bytes`.
///
/// Returns `None` when fewer than [`RECORD_LEN`] bytes are available.
#[expect(
    clippy::little_endian_bytes,
    reason = "the shared record layout is little-endian on every host"
)]
pub(super) fn decode(bytes: &[u8]) -> Option<Inventory> {
    let mut fields = bytes.chunks_exact(FIELD_LEN).map(|chunk| {
        chunk
            .try_into()
            .ok()
            .map(u64::from_le_bytes)
    });
    let carbon = fields.next()??;
    let hydrogen = fields.next()??;
    let oxygen = fields.next()??;
    Some(Inventory::from_counts(carbon, hydrogen, oxygen))
}

/// Writes `inventory` over the start of `bytes`.
#[expect(
    clippy::little_endian_bytes,
    reason = "the shared record layout is little-endian on every host"
)]
pub(super) fn encode(inventory: &Inventory, bytes: &mut [u8]) {
    for (chunk, value) in bytes
        .chunks_exact_mut(FIELD_LEN)
        .zip(inventory.counts())
    {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
}
