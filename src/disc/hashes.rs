//! Partition integrity checking against per-sector hash blocks.
//!
//! Each sector's 0x400-byte hash block stores 31 SHA-1 hashes, one per
//! 0x400-byte block of the sector's decrypted payload. The hash block is
//! encrypted with a zero IV, unlike the payload whose IV is embedded in the
//! encrypted hash block itself.

use sha1::{Digest, Sha1};
use zerocopy::FromZeroes;

use crate::{
    array_ref,
    blob::HashBytes,
    disc::{
        wii::{aes_cbc_decrypt, Volume},
        Partition, HASHES_SIZE, PARTITION_DATA_OFFSET, PART_DATA_SIZE_OFF, SECTOR_DATA_SIZE,
        SECTOR_SIZE,
    },
};

/// Number of payload hashes in a sector's hash block.
pub(crate) const NUM_H0_HASHES: usize = SECTOR_DATA_SIZE / HASHES_SIZE; // 31

// Zero padding between the hash table and the H1 hashes. Sectors that are
// never meant to be read by the game (holes between files) carry garbage
// here along with garbage hashes.
const H0_PAD_OFF: usize = NUM_H0_HASHES * 20; // 0x26C
const H0_PAD_END: usize = 0x280;

pub(crate) fn check_integrity(volume: &Volume, partition: Partition) -> bool {
    let Some(record) = volume.record(partition) else {
        return false;
    };

    let part_data_size = {
        let mut blob = volume.blob_mut();
        match blob.read_be_u32(partition.offset() + PART_DATA_SIZE_OFF) {
            Some(v) => (v as u64) * 4,
            None => {
                log::warn!("Integrity check: could not read partition data size");
                return false;
            }
        }
    };

    // The data size field is trusted as-is; an overlarge value simply makes
    // the loop fail on the first sector past the end of the image.
    let num_sectors = part_data_size / SECTOR_SIZE as u64;
    let mut hash_block = [0u8; HASHES_SIZE];
    let mut data = <u8>::new_box_slice_zeroed(SECTOR_DATA_SIZE);
    for sector in 0..num_sectors {
        let sector_off = partition.offset() + PARTITION_DATA_OFFSET + sector * SECTOR_SIZE as u64;

        {
            let mut blob = volume.blob_mut();
            if !blob.read(sector_off, &mut hash_block) {
                log::warn!(
                    "Integrity check: failed at sector {}: could not read hash block",
                    sector
                );
                return false;
            }
        }
        aes_cbc_decrypt(&record.cipher, [0u8; 16], &mut hash_block);

        // Skip hole sectors. Recognizing them by their non-zero padding can
        // produce false negatives: a sector may be damaged badly enough to
        // look like a hole.
        if hash_block[H0_PAD_OFF..H0_PAD_END].iter().any(|&b| b != 0) {
            log::debug!("Integrity check: skipping hole sector {}", sector);
            continue;
        }

        if !volume.read(partition, sector * SECTOR_DATA_SIZE as u64, data.as_mut()) {
            log::warn!("Integrity check: failed at sector {}: could not read data", sector);
            return false;
        }

        for hash_idx in 0..NUM_H0_HASHES {
            let output = hash_bytes(array_ref![data, hash_idx * HASHES_SIZE, HASHES_SIZE]);
            let expected = array_ref![hash_block, hash_idx * 20, 20];
            if output != *expected {
                let mut expected_hex = [0u8; 40];
                let mut got_hex = [0u8; 40];
                log::warn!(
                    "Integrity check: failed at sector {}: hash {} is invalid\n\texpected: {}\n\tgot:      {}",
                    sector,
                    hash_idx,
                    base16ct::lower::encode_str(expected, &mut expected_hex).unwrap(),
                    base16ct::lower::encode_str(&output, &mut got_hex).unwrap(),
                );
                return false;
            }
        }
    }
    true
}

#[inline]
pub(crate) fn hash_bytes(buf: &[u8]) -> HashBytes {
    let mut hasher = Sha1::new();
    hasher.update(buf);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::fixtures::{build_image, pattern_sector, MemBlob, PART_OFF};
    use crate::disc::wii::Volume;

    fn volume_over(image: Vec<u8>) -> Volume { Volume::new(Box::new(MemBlob::new(image))) }

    #[test]
    fn pristine_partition_passes() {
        let image = build_image(&[pattern_sector(), pattern_sector()]);
        let volume = volume_over(image);
        let partition = Partition::new(PART_OFF);
        assert!(volume.check_integrity(partition));
    }

    #[test]
    fn unknown_partition_fails() {
        let image = build_image(&[pattern_sector()]);
        let volume = volume_over(image);
        assert!(!volume.check_integrity(Partition::new(0x1234)));
    }

    #[test]
    fn flipped_data_byte_fails() {
        let mut image = build_image(&[pattern_sector()]);
        // One bit of ciphertext inside the first hashed block of the payload
        let off = PART_OFF as usize + 0x20000 + HASHES_SIZE + 100;
        image[off] ^= 0x01;
        let volume = volume_over(image);
        assert!(!volume.check_integrity(Partition::new(PART_OFF)));
    }

    #[test]
    fn flipped_hash_byte_fails() {
        let mut image = build_image(&[pattern_sector()]);
        // Ciphertext of the stored hash table itself
        let off = PART_OFF as usize + 0x20000 + 5;
        image[off] ^= 0x80;
        let volume = volume_over(image);
        assert!(!volume.check_integrity(Partition::new(PART_OFF)));
    }

    #[test]
    fn hole_sector_is_skipped() {
        // Garbage hashes, but flagged as a hole via the padding bytes
        let mut spec = pattern_sector();
        spec.hashed = false;
        spec.hole = true;
        let image = build_image(&[spec]);
        let volume = volume_over(image);
        assert!(volume.check_integrity(Partition::new(PART_OFF)));
    }

    #[test]
    fn truncated_partition_fails() {
        // Data size field declares two sectors, image holds one
        let mut image = build_image(&[pattern_sector()]);
        let size_off = PART_OFF as usize + 0x2BC;
        let declared = (2 * SECTOR_SIZE as u32) >> 2;
        image[size_off..size_off + 4].copy_from_slice(&declared.to_be_bytes());
        let volume = volume_over(image);
        assert!(!volume.check_integrity(Partition::new(PART_OFF)));
    }
}
