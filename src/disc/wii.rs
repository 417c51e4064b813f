//! Encrypted Wii volume reading.

use std::{
    cell::{RefCell, RefMut},
    cmp::min,
    collections::BTreeMap,
    path::Path,
};

use aes::{cipher::KeyInit, Aes128Dec};
use zerocopy::FromZeroes;

use crate::{
    array_ref,
    blob::{self, BlobReader, BlobType, KeyBytes},
    disc::{
        hashes, Partition, PartitionKind, HASHES_SIZE, PARTITION_DATA_OFFSET, PART_GROUP_OFF,
        PART_TMD_OFF_OFF, PART_TMD_SIZE_OFF, SECTOR_DATA_SIZE, SECTOR_IV_OFF, SECTOR_SIZE,
    },
    es::{is_valid_tmd_size, TicketReader, TmdReader, TICKET_SIZE},
    util::div_rem,
    Result,
};

/// Decrypts `data` in place using AES-128-CBC with the given IV, reusing a
/// precomputed key schedule.
pub(crate) fn aes_cbc_decrypt(cipher: &Aes128Dec, iv: KeyBytes, data: &mut [u8]) {
    use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, InnerIvInit};
    <cbc::Decryptor<Aes128Dec>>::inner_iv_init(cipher.clone(), &aes::Block::from(iv))
        .decrypt_padded_mut::<NoPadding>(data)
        .unwrap(); // Safe: using NoPadding
}

/// Everything the volume retains for a discovered partition.
pub(crate) struct PartitionRecord {
    pub(crate) kind: Option<PartitionKind>,
    pub(crate) ticket: TicketReader,
    pub(crate) tmd: TmdReader,
    /// AES-128 decryption key schedule derived from the ticket's title key.
    pub(crate) cipher: Aes128Dec,
}

/// One-slot decrypted sector cache. `offset == u64::MAX` means empty.
struct SectorCache {
    offset: u64,
    data: Box<[u8; SECTOR_DATA_SIZE]>,
    scratch: Box<[u8; SECTOR_SIZE]>,
}

impl SectorCache {
    fn new() -> Self {
        Self {
            offset: u64::MAX,
            data: <[u8; SECTOR_DATA_SIZE]>::new_box_zeroed(),
            scratch: <[u8; SECTOR_SIZE]>::new_box_zeroed(),
        }
    }
}

/// A read-only view over the logical contents of a Wii disc image.
///
/// Construction walks the partition group table, loading each partition's
/// ticket and TMD and deriving its AES key schedule. Reads then address
/// decrypted partition data byte-wise, with sector fetching, IV extraction,
/// and decryption handled transparently; the most recently decrypted sector
/// is cached. Images without a partition table (a GameCube-style layout)
/// read through unmodified via [`Partition::NONE`].
///
/// A volume is immutable after construction apart from the sector cache, and
/// may be moved across threads but not shared between them: reads take
/// `&self` through interior mutability, so the type is intentionally not
/// `Sync`.
pub struct Volume {
    reader: RefCell<Box<dyn BlobReader>>,
    partitions: BTreeMap<Partition, PartitionRecord>,
    game_partition: Partition,
    cache: RefCell<SectorCache>,
}

impl Volume {
    /// Opens a plain disc image from a filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Volume> {
        let blob = blob::open(path.as_ref())?;
        Ok(Volume::new(Box::new(blob)))
    }

    /// Builds a volume from a blob reader, taking ownership of it.
    ///
    /// Construction never fails: partitions that cannot be loaded are
    /// skipped individually, and an image without a partition table simply
    /// yields an empty partition set.
    pub fn new(mut reader: Box<dyn BlobReader>) -> Volume {
        let mut partitions = BTreeMap::new();
        let mut game_partition = Partition::NONE;

        // A non-zero word here means there is no partition table; data is
        // read unencrypted, as on a GameCube disc.
        if reader.read_be_u32(0x60) != Some(0) {
            return Volume {
                reader: RefCell::new(reader),
                partitions,
                game_partition,
                cache: RefCell::new(SectorCache::new()),
            };
        }

        for group in 0..4u64 {
            let Some(part_count) = reader.read_be_u32(PART_GROUP_OFF + group * 8) else {
                continue;
            };
            let Some(entry_off) = reader.read_be_u32(PART_GROUP_OFF + group * 8 + 4) else {
                continue;
            };
            // Partition table pointers are stored divided by 4
            let table_off = (entry_off as u64) << 2;

            for i in 0..part_count as u64 {
                let Some(part_off) = reader.read_be_u32(table_off + i * 8) else {
                    continue;
                };
                let part_off = (part_off as u64) << 2;
                let kind =
                    reader.read_be_u32(table_off + i * 8 + 4).map(PartitionKind::from);
                let is_game =
                    game_partition == Partition::NONE && kind == Some(PartitionKind::Data);

                let mut ticket_buf = <u8>::new_box_slice_zeroed(TICKET_SIZE);
                if !reader.read(part_off, ticket_buf.as_mut()) {
                    continue;
                }
                let ticket = TicketReader::new(ticket_buf);
                if !ticket.is_valid() {
                    continue;
                }

                let (Some(tmd_size), Some(tmd_off)) = (
                    reader.read_be_u32(part_off + PART_TMD_SIZE_OFF),
                    reader.read_be_u32(part_off + PART_TMD_OFF_OFF),
                ) else {
                    continue;
                };
                let tmd_off = (tmd_off as u64) << 2;
                if !is_valid_tmd_size(tmd_size as usize) {
                    log::warn!(
                        "Partition at {:#X} declares invalid TMD size {:#X}, skipping",
                        part_off,
                        tmd_size
                    );
                    continue;
                }
                let mut tmd_buf = <u8>::new_box_slice_zeroed(tmd_size as usize);
                if !reader.read(part_off + tmd_off, tmd_buf.as_mut()) {
                    continue;
                }
                let tmd = TmdReader::new(tmd_buf);

                let title_key = match ticket.decrypt_title_key() {
                    Ok(key) => key,
                    Err(e) => {
                        log::warn!("Partition at {:#X}: {}, skipping", part_off, e);
                        continue;
                    }
                };
                let cipher = Aes128Dec::new(&title_key.into());

                // Nothing is stored until every piece has loaded, so a
                // partial failure leaves no trace of the partition.
                let partition = Partition::new(part_off);
                log::debug!("Found partition at {:#X} (group {}, entry {})", part_off, group, i);
                partitions.insert(partition, PartitionRecord { kind, ticket, tmd, cipher });
                if is_game {
                    game_partition = partition;
                }
            }
        }

        Volume {
            reader: RefCell::new(reader),
            partitions,
            game_partition,
            cache: RefCell::new(SectorCache::new()),
        }
    }

    /// Reads `out.len()` bytes of decrypted data at `offset` within the
    /// partition, or raw image data when `partition` is [`Partition::NONE`].
    ///
    /// Returns `false` if the partition is unknown or the underlying blob
    /// read fails, in which case the contents of `out` are unspecified.
    pub fn read(&self, partition: Partition, mut offset: u64, out: &mut [u8]) -> bool {
        if partition.is_none() {
            return self.reader.borrow_mut().read(offset, out);
        }
        let Some(record) = self.partitions.get(&partition) else {
            return false;
        };

        let mut reader = self.reader.borrow_mut();
        let mut cache = self.cache.borrow_mut();
        let cache = &mut *cache;
        let mut pos = 0;
        while pos < out.len() {
            let (sector, sector_pos) = div_rem(offset, SECTOR_DATA_SIZE as u64);
            let sector_off =
                partition.offset() + PARTITION_DATA_OFFSET + sector * SECTOR_SIZE as u64;
            let sector_pos = sector_pos as usize;

            if cache.offset != sector_off {
                if !reader.read(sector_off, cache.scratch.as_mut()) {
                    return false;
                }
                // The data IV lives inside the encrypted hash block; the
                // hash block itself is only decrypted during integrity
                // checking.
                let iv = *array_ref![cache.scratch, SECTOR_IV_OFF, 16];
                cache.data.copy_from_slice(&cache.scratch[HASHES_SIZE..]);
                aes_cbc_decrypt(&record.cipher, iv, cache.data.as_mut());
                cache.offset = sector_off;
            }

            let len = min(out.len() - pos, SECTOR_DATA_SIZE - sector_pos);
            out[pos..pos + len].copy_from_slice(&cache.data[sector_pos..sector_pos + len]);
            pos += len;
            offset += len as u64;
        }
        true
    }

    /// Translates a partition-relative offset to an offset on the raw image.
    ///
    /// For [`Partition::NONE`] this is the identity. The result points into
    /// ciphertext, so it is only useful for tooling that does not need the
    /// decrypted bytes.
    pub fn raw_offset(partition: Partition, offset: u64) -> u64 {
        if partition.is_none() {
            return offset;
        }
        let (sector, sector_pos) = div_rem(offset, SECTOR_DATA_SIZE as u64);
        partition.offset() + PARTITION_DATA_OFFSET + sector * SECTOR_SIZE as u64 + sector_pos
    }

    /// All discovered partitions, in offset order.
    ///
    /// Empty for images without a partition table.
    pub fn partitions(&self) -> Vec<Partition> { self.partitions.keys().copied().collect() }

    /// The first data partition found in the group table, or
    /// [`Partition::NONE`] if there is none.
    #[inline]
    pub fn game_partition(&self) -> Partition { self.game_partition }

    /// The kind a discovered partition was declared as in the group table.
    pub fn partition_kind(&self, partition: Partition) -> Option<PartitionKind> {
        self.partitions.get(&partition).and_then(|p| p.kind)
    }

    /// The partition's ticket, if the partition is known.
    pub fn ticket(&self, partition: Partition) -> Option<&TicketReader> {
        self.partitions.get(&partition).map(|p| &p.ticket)
    }

    /// The partition's TMD, if the partition is known.
    pub fn tmd(&self, partition: Partition) -> Option<&TmdReader> {
        self.partitions.get(&partition).map(|p| &p.tmd)
    }

    /// The title ID from the partition's ticket.
    pub fn title_id(&self, partition: Partition) -> Option<u64> {
        self.ticket(partition)?.title_id()
    }

    /// Walks every sector of the partition, decrypting each hash block and
    /// verifying the stored SHA-1 hashes against the decrypted payload.
    ///
    /// Sectors flagged as holes between files are skipped. Returns `false`
    /// for an unknown partition, an unreadable sector, or any hash
    /// mismatch; details are logged at warning level.
    pub fn check_integrity(&self, partition: Partition) -> bool {
        hashes::check_integrity(self, partition)
    }

    /// Reads the byte at `offset` of decrypted partition data.
    pub fn read_be_u8(&self, partition: Partition, offset: u64) -> Option<u8> {
        let mut buf = [0u8; 1];
        self.read(partition, offset, &mut buf).then(|| buf[0])
    }

    /// Reads a big-endian `u16` of decrypted partition data.
    pub fn read_be_u16(&self, partition: Partition, offset: u64) -> Option<u16> {
        let mut buf = [0u8; 2];
        self.read(partition, offset, &mut buf).then(|| u16::from_be_bytes(buf))
    }

    /// Reads a big-endian `u32` of decrypted partition data.
    pub fn read_be_u32(&self, partition: Partition, offset: u64) -> Option<u32> {
        let mut buf = [0u8; 4];
        self.read(partition, offset, &mut buf).then(|| u32::from_be_bytes(buf))
    }

    /// Reads a big-endian `u64` of decrypted partition data.
    pub fn read_be_u64(&self, partition: Partition, offset: u64) -> Option<u64> {
        let mut buf = [0u8; 8];
        self.read(partition, offset, &mut buf).then(|| u64::from_be_bytes(buf))
    }

    /// The 6-character game ID at the start of the partition data.
    pub fn game_id(&self, partition: Partition) -> Option<String> {
        let mut buf = [0u8; 6];
        if !self.read(partition, 0, &mut buf) {
            return None;
        }
        Some(decode_string(&buf))
    }

    /// The maker (publisher) ID.
    pub fn maker_id(&self, partition: Partition) -> Option<String> {
        let mut buf = [0u8; 2];
        if !self.read(partition, 0x4, &mut buf) {
            return None;
        }
        Some(decode_string(&buf))
    }

    /// The disc number, for multi-disc games.
    #[inline]
    pub fn disc_number(&self, partition: Partition) -> Option<u8> {
        self.read_be_u8(partition, 6)
    }

    /// The disc revision.
    #[inline]
    pub fn revision(&self, partition: Partition) -> Option<u8> { self.read_be_u8(partition, 7) }

    /// The internal game name from the partition's disc header.
    pub fn internal_name(&self, partition: Partition) -> Option<String> {
        let mut buf = [0u8; 0x60];
        if !self.read(partition, 0x20, &mut buf) {
            return None;
        }
        Some(decode_string(&buf))
    }

    /// The apploader build date.
    pub fn apploader_date(&self, partition: Partition) -> Option<String> {
        let mut buf = [0u8; 0x10];
        if !self.read(partition, 0x2440, &mut buf) {
            return None;
        }
        Some(decode_string(&buf))
    }

    /// The size of the disc data the blob decodes to.
    #[inline]
    pub fn data_size(&self) -> u64 { self.reader.borrow().data_size() }

    /// The size of the underlying blob on disk.
    #[inline]
    pub fn raw_size(&self) -> u64 { self.reader.borrow().raw_size() }

    /// The underlying blob's storage format.
    #[inline]
    pub fn blob_type(&self) -> BlobType { self.reader.borrow().blob_type() }

    pub(crate) fn record(&self, partition: Partition) -> Option<&PartitionRecord> {
        self.partitions.get(&partition)
    }

    pub(crate) fn blob_mut(&self) -> RefMut<'_, Box<dyn BlobReader>> {
        self.reader.borrow_mut()
    }
}

/// Decodes a fixed-size header string field, truncating at the first NUL.
fn decode_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::disc::fixtures::{
        build_image, pattern_sector, write_be_u32, write_partition_header, write_ticket, MemBlob,
        SectorSpec, PART_OFF, TITLE_ID,
    };

    fn volume_over(image: Vec<u8>) -> Volume { Volume::new(Box::new(MemBlob::new(image))) }

    #[test]
    fn image_without_partition_table_is_passthrough() {
        let mut image: Vec<u8> = (0..0x1000).map(|i| i as u8).collect();
        write_be_u32(&mut image, 0x60, 1);
        let volume = volume_over(image.clone());
        assert!(volume.partitions().is_empty());
        assert_eq!(volume.game_partition(), Partition::NONE);
        let mut buf = [0u8; 16];
        assert!(volume.read(Partition::NONE, 0, &mut buf));
        assert_eq!(&buf[..], &image[..16]);
        assert_eq!(volume.read_be_u32(Partition::NONE, 0x60), Some(1));
        assert_eq!(volume.data_size(), image.len() as u64);
        assert_eq!(volume.blob_type(), BlobType::Plain);
    }

    #[test]
    fn tiny_image_yields_empty_volume() {
        let volume = volume_over(vec![0u8; 0x10]);
        assert!(volume.partitions().is_empty());
        assert_eq!(volume.game_partition(), Partition::NONE);
    }

    #[test]
    fn discovers_single_game_partition() {
        let image = build_image(&[pattern_sector(), pattern_sector()]);
        let volume = volume_over(image);
        let partition = Partition::new(PART_OFF);
        assert_eq!(volume.partitions(), vec![partition]);
        assert_eq!(volume.game_partition(), partition);
        assert_eq!(volume.partition_kind(partition), Some(PartitionKind::Data));
        assert_eq!(volume.title_id(partition), Some(TITLE_ID));
        assert!(volume.ticket(partition).unwrap().is_valid());
        assert_eq!(volume.tmd(partition).unwrap().title_id(), Some(TITLE_ID));

        let mut buf = [0u8; 4];
        assert!(volume.read(partition, 0, &mut buf));
        assert_eq!(buf, [0x00, 0x01, 0x02, 0x03]);
        // Crossing into the second sector
        assert!(volume.read(partition, SECTOR_DATA_SIZE as u64 - 2, &mut buf));
        assert_eq!(buf, [0xFE, 0xFF, 0x00, 0x01]);

        // NONE still addresses the raw image
        assert!(volume.read(Partition::NONE, 0x40000, &mut buf));
        assert_eq!(buf, [0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn invalid_tmd_size_skips_partition() {
        let mut image = build_image(&[pattern_sector()]);
        write_be_u32(&mut image, PART_OFF as usize + 0x2A4, 0x10);
        let volume = volume_over(image);
        assert!(volume.partitions().is_empty());
        assert_eq!(volume.game_partition(), Partition::NONE);
    }

    #[test]
    fn korean_common_key_ticket_decrypts() {
        let mut image = build_image(&[pattern_sector()]);
        write_ticket(&mut image, PART_OFF, 1);
        let volume = volume_over(image);
        let partition = Partition::new(PART_OFF);
        assert_eq!(volume.partitions(), vec![partition]);
        let mut buf = [0u8; 4];
        assert!(volume.read(partition, 0, &mut buf));
        assert_eq!(buf, [0x00, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn unknown_ticket_issuer_skips_partition() {
        let mut image = build_image(&[pattern_sector()]);
        image[PART_OFF as usize + 0x140] = b'X';
        let volume = volume_over(image);
        assert!(volume.partitions().is_empty());
        assert_eq!(volume.game_partition(), Partition::NONE);
    }

    #[test]
    fn out_of_range_common_key_index_skips_partition() {
        let mut image = build_image(&[pattern_sector()]);
        image[PART_OFF as usize + 0x1F1] = 7;
        let volume = volume_over(image);
        assert!(volume.partitions().is_empty());
    }

    #[test]
    fn truncated_ticket_skips_partition() {
        // Partition pointer aimed past the end of the image
        let mut image = build_image(&[pattern_sector()]);
        let end = image.len() as u64;
        write_be_u32(&mut image, 0x40020, (end >> 2) as u32);
        let volume = volume_over(image);
        assert!(volume.partitions().is_empty());
    }

    #[test]
    fn read_chunking_is_transparent() {
        let image = build_image(&[pattern_sector(), pattern_sector()]);
        let volume = volume_over(image);
        let partition = Partition::new(PART_OFF);
        let total = 2 * SECTOR_DATA_SIZE;
        let mut whole = vec![0u8; total];
        assert!(volume.read(partition, 0, &mut whole));

        for split in [0, 1, 0x400, SECTOR_DATA_SIZE - 1, SECTOR_DATA_SIZE, SECTOR_DATA_SIZE + 1] {
            let mut head = vec![0u8; split];
            let mut tail = vec![0u8; total - split];
            assert!(volume.read(partition, 0, &mut head));
            assert!(volume.read(partition, split as u64, &mut tail));
            head.extend_from_slice(&tail);
            assert_eq!(head, whole, "split at {}", split);
        }
    }

    #[test]
    fn sector_cache_fetches_each_sector_once() {
        let image = build_image(&[pattern_sector(), pattern_sector()]);
        let blob = MemBlob::new(image);
        let reads = blob.sector_reads();
        let volume = Volume::new(Box::new(blob));
        let partition = Partition::new(PART_OFF);

        let mut buf = [0u8; 16];
        assert!(volume.read(partition, 0, &mut []));
        assert_eq!(reads.load(Ordering::Relaxed), 0);
        assert!(volume.read(partition, 0, &mut buf));
        assert_eq!(reads.load(Ordering::Relaxed), 1);
        assert!(volume.read(partition, 0x1000, &mut buf));
        assert_eq!(reads.load(Ordering::Relaxed), 1);
        // Crossing the sector boundary only fetches the new sector
        assert!(volume.read(partition, SECTOR_DATA_SIZE as u64 - 2, &mut buf));
        assert_eq!(reads.load(Ordering::Relaxed), 2);
        // The cache holds one sector, so going back re-fetches
        assert!(volume.read(partition, 0, &mut buf));
        assert_eq!(reads.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn boundary_read_on_cold_cache_fetches_two_sectors() {
        let image = build_image(&[pattern_sector(), pattern_sector()]);
        let blob = MemBlob::new(image);
        let reads = blob.sector_reads();
        let volume = Volume::new(Box::new(blob));
        let mut buf = [0u8; 4];
        assert!(volume.read(Partition::new(PART_OFF), SECTOR_DATA_SIZE as u64 - 2, &mut buf));
        assert_eq!(reads.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn unknown_partition_is_rejected() {
        let image = build_image(&[pattern_sector()]);
        let volume = volume_over(image);
        let bogus = Partition::new(0x1234);
        let mut buf = [0u8; 4];
        assert!(!volume.read(bogus, 0, &mut buf));
        assert!(volume.ticket(bogus).is_none());
        assert!(volume.tmd(bogus).is_none());
        assert_eq!(volume.title_id(bogus), None);
        assert_eq!(volume.partition_kind(bogus), None);
        assert!(!volume.check_integrity(bogus));
    }

    #[test]
    fn raw_offset_geometry() {
        let partition = Partition::new(0x50000);
        assert_eq!(Volume::raw_offset(Partition::NONE, 0x1234), 0x1234);
        assert_eq!(Volume::raw_offset(partition, 0), 0x70000);
        assert_eq!(Volume::raw_offset(partition, 0x7BFF), 0x70000 + 0x7BFF);
        assert_eq!(Volume::raw_offset(partition, 0x7C00), 0x70000 + 0x8000);
        assert_eq!(Volume::raw_offset(partition, 0x7C05), 0x70000 + 0x8005);
        assert_eq!(Volume::raw_offset(partition, 3 * 0x7C00 + 7), 0x70000 + 3 * 0x8000 + 7);
    }

    fn two_partition_image(first_kind: u32, second_kind: u32) -> Vec<u8> {
        let (p1, p2) = (0x50000u64, 0x90000u64);
        let mut image = vec![0u8; p1 as usize];
        write_be_u32(&mut image, 0x40000, 2);
        write_be_u32(&mut image, 0x40004, 0x40020 >> 2);
        write_be_u32(&mut image, 0x40020, (p1 >> 2) as u32);
        write_be_u32(&mut image, 0x40024, first_kind);
        write_be_u32(&mut image, 0x40028, (p2 >> 2) as u32);
        write_be_u32(&mut image, 0x4002C, second_kind);
        write_partition_header(&mut image, p1, 0);
        write_partition_header(&mut image, p2, 0);
        image
    }

    #[test]
    fn game_partition_is_first_data_partition() {
        let volume = volume_over(two_partition_image(1, 0));
        assert_eq!(volume.partitions().len(), 2);
        assert_eq!(volume.game_partition(), Partition::new(0x90000));
        assert_eq!(volume.partition_kind(Partition::new(0x50000)), Some(PartitionKind::Update));

        let volume = volume_over(two_partition_image(0, 0));
        assert_eq!(volume.game_partition(), Partition::new(0x50000));
    }

    #[test]
    fn game_partition_scan_is_group_major() {
        // Group 0 holds an update partition, group 1 the data partition
        let (p1, p2) = (0x50000u64, 0x90000u64);
        let mut image = vec![0u8; p1 as usize];
        write_be_u32(&mut image, 0x40000, 1);
        write_be_u32(&mut image, 0x40004, 0x40020 >> 2);
        write_be_u32(&mut image, 0x40008, 1);
        write_be_u32(&mut image, 0x4000C, 0x40030 >> 2);
        write_be_u32(&mut image, 0x40020, (p1 >> 2) as u32);
        write_be_u32(&mut image, 0x40024, 1);
        write_be_u32(&mut image, 0x40030, (p2 >> 2) as u32);
        write_be_u32(&mut image, 0x40034, 0);
        write_partition_header(&mut image, p1, 0);
        write_partition_header(&mut image, p2, 0);

        let volume = volume_over(image);
        assert_eq!(volume.partitions(), vec![Partition::new(p1), Partition::new(p2)]);
        assert_eq!(volume.game_partition(), Partition::new(p2));
    }

    #[test]
    fn header_metadata_helpers() {
        let mut payload = vec![0u8; SECTOR_DATA_SIZE];
        payload[0..6].copy_from_slice(b"RHAAE8");
        payload[6] = 0; // disc number
        payload[7] = 2; // revision
        payload[0x20..0x29].copy_from_slice(b"Test Game");
        payload[0x2440..0x2450].copy_from_slice(b"2008/03/08 10:00");
        let image = build_image(&[SectorSpec { payload, hashed: false, hole: false }]);
        let volume = volume_over(image);
        let partition = Partition::new(PART_OFF);

        assert_eq!(volume.game_id(partition).as_deref(), Some("RHAAE8"));
        assert_eq!(volume.maker_id(partition).as_deref(), Some("E8"));
        assert_eq!(volume.disc_number(partition), Some(0));
        assert_eq!(volume.revision(partition), Some(2));
        assert_eq!(volume.internal_name(partition).as_deref(), Some("Test Game"));
        assert_eq!(volume.apploader_date(partition).as_deref(), Some("2008/03/08 10:00"));

        assert_eq!(volume.read_be_u8(partition, 3), Some(b'A'));
        assert_eq!(volume.read_be_u16(partition, 4), Some(0x4538));
        assert_eq!(volume.read_be_u32(partition, 0), Some(0x52484141));
        assert_eq!(volume.read_be_u64(partition, 0), Some(0x5248414145380002));
    }

    #[test]
    fn volume_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Volume>();
    }
}
