//! In-memory disc image fabrication for tests.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use crate::{
    array_ref,
    blob::{BlobReader, BlobType, KeyBytes},
    disc::{hashes::hash_bytes, HASHES_SIZE, SECTOR_DATA_SIZE, SECTOR_SIZE},
};

pub(crate) const PART_OFF: u64 = 0x50000;
pub(crate) const TITLE_ID: u64 = 0x0001000148415858;
pub(crate) const TMD_SIZE: u32 = 0x208;
const TMD_PTR: u32 = 0x800;

/// Decrypted title key; sector payloads are encrypted with this.
pub(crate) const TITLE_KEY: KeyBytes = [
    0x2e, 0xd1, 0x4c, 0x09, 0x5b, 0xe0, 0x77, 0x13, 0xa8, 0x35, 0xf6, 0x47, 0x0d, 0x9e, 0x62,
    0xb4,
];

pub(crate) const TICKET_ISSUER: &[u8] = b"Root-CA00000001-XS00000003";

// RVL_KEY_RETAIL and RVL_KEY_KOREAN, spelled out independently of the
// ticket module's tables.
#[rustfmt::skip]
pub(crate) const COMMON_KEY_RETAIL: KeyBytes =
    [0xeb, 0xe4, 0x2a, 0x22, 0x5e, 0x85, 0x93, 0xe4, 0x48, 0xd9, 0xc5, 0x45, 0x73, 0x81, 0xaa, 0xf7];
#[rustfmt::skip]
pub(crate) const COMMON_KEY_KOREAN: KeyBytes =
    [0x63, 0xb8, 0x2b, 0xb4, 0xf4, 0x61, 0x4e, 0x2e, 0x13, 0xf2, 0xfe, 0xfb, 0xba, 0x4c, 0x9b, 0x7e];

/// In-memory blob that counts full-sector fetches, so tests can observe
/// cache behavior.
pub(crate) struct MemBlob {
    data: Vec<u8>,
    sector_reads: Arc<AtomicU32>,
}

impl MemBlob {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self { data, sector_reads: Arc::new(AtomicU32::new(0)) }
    }

    pub(crate) fn sector_reads(&self) -> Arc<AtomicU32> { self.sector_reads.clone() }
}

impl BlobReader for MemBlob {
    fn read(&mut self, offset: u64, out: &mut [u8]) -> bool {
        let Ok(start) = usize::try_from(offset) else {
            return false;
        };
        let Some(end) = start.checked_add(out.len()) else {
            return false;
        };
        let Some(src) = self.data.get(start..end) else {
            return false;
        };
        out.copy_from_slice(src);
        if out.len() == SECTOR_SIZE {
            self.sector_reads.fetch_add(1, Ordering::Relaxed);
        }
        true
    }

    fn data_size(&self) -> u64 { self.data.len() as u64 }

    fn raw_size(&self) -> u64 { self.data.len() as u64 }

    fn blob_type(&self) -> BlobType { BlobType::Plain }
}

/// Plaintext description of one on-disc sector.
pub(crate) struct SectorSpec {
    pub(crate) payload: Vec<u8>,
    /// Fill the hash block with correct payload hashes
    pub(crate) hashed: bool,
    /// Poke a non-zero byte into the hash block padding, flagging a hole
    pub(crate) hole: bool,
}

pub(crate) fn pattern_sector() -> SectorSpec {
    SectorSpec {
        payload: (0..SECTOR_DATA_SIZE).map(|i| i as u8).collect(),
        hashed: true,
        hole: false,
    }
}

pub(crate) fn write_be_u32(image: &mut Vec<u8>, offset: usize, value: u32) {
    if image.len() < offset + 4 {
        image.resize(offset + 4, 0);
    }
    image[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

pub(crate) fn aes_cbc_encrypt(key: &[u8; 16], iv: [u8; 16], data: &mut [u8]) {
    use aes::cipher::{block_padding::NoPadding, BlockEncryptMut, KeyIvInit};
    <cbc::Encryptor<aes::Aes128>>::new(key.into(), &aes::Block::from(iv))
        .encrypt_padded_mut::<NoPadding>(data, data.len())
        .unwrap();
}

/// Writes a retail ticket at `part_off` whose title key field wraps
/// [`TITLE_KEY`] with the common key selected by `common_key_idx`.
pub(crate) fn write_ticket(image: &mut Vec<u8>, part_off: u64, common_key_idx: u8) {
    let base = part_off as usize;
    image[base + 0x140..base + 0x140 + TICKET_ISSUER.len()].copy_from_slice(TICKET_ISSUER);
    image[base + 0x1DC..base + 0x1E4].copy_from_slice(&TITLE_ID.to_be_bytes());
    image[base + 0x1F1] = common_key_idx;
    let common_key = match common_key_idx {
        1 => &COMMON_KEY_KOREAN,
        _ => &COMMON_KEY_RETAIL,
    };
    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(&TITLE_ID.to_be_bytes());
    let mut field = TITLE_KEY;
    aes_cbc_encrypt(common_key, iv, &mut field);
    image[base + 0x1BF..base + 0x1CF].copy_from_slice(&field);
}

/// Writes a partition header at `part_off`: a retail ticket, TMD pointers
/// and blob, and the data size field covering `num_sectors`.
pub(crate) fn write_partition_header(image: &mut Vec<u8>, part_off: u64, num_sectors: usize) {
    let base = part_off as usize;
    if image.len() < base + 0x20000 {
        image.resize(base + 0x20000, 0);
    }
    write_ticket(image, part_off, 0);
    write_be_u32(image, base + 0x2A4, TMD_SIZE);
    write_be_u32(image, base + 0x2A8, TMD_PTR >> 2);
    image[base + TMD_PTR as usize + 0x18C..base + TMD_PTR as usize + 0x194]
        .copy_from_slice(&TITLE_ID.to_be_bytes());
    write_be_u32(image, base + 0x2BC, ((num_sectors * SECTOR_SIZE) >> 2) as u32);
}

/// Encrypts `spec` into a full on-disc sector with [`TITLE_KEY`].
///
/// The hash block is encrypted first with a zero IV; the payload IV is then
/// taken from the encrypted hash block at 0x3D0, as on a real disc.
pub(crate) fn encode_sector(spec: &SectorSpec) -> Vec<u8> {
    assert_eq!(spec.payload.len(), SECTOR_DATA_SIZE);
    let mut sector = vec![0u8; SECTOR_SIZE];
    if spec.hashed {
        for idx in 0..31 {
            let digest = hash_bytes(&spec.payload[idx * HASHES_SIZE..(idx + 1) * HASHES_SIZE]);
            sector[idx * 20..idx * 20 + 20].copy_from_slice(&digest);
        }
    }
    if spec.hole {
        sector[0x270] = 0xAA;
    }
    aes_cbc_encrypt(&TITLE_KEY, [0u8; 16], &mut sector[..HASHES_SIZE]);
    let iv = *array_ref![sector, 0x3D0, 16];
    sector[HASHES_SIZE..].copy_from_slice(&spec.payload);
    aes_cbc_encrypt(&TITLE_KEY, iv, &mut sector[HASHES_SIZE..]);
    sector
}

/// Builds an image with a single data partition at [`PART_OFF`] holding the
/// given sectors.
pub(crate) fn build_image(sectors: &[SectorSpec]) -> Vec<u8> {
    let mut image = vec![0u8; PART_OFF as usize];
    // Group 0: one partition, entry table directly after the group table
    write_be_u32(&mut image, 0x40000, 1);
    write_be_u32(&mut image, 0x40004, 0x40020 >> 2);
    write_be_u32(&mut image, 0x40020, (PART_OFF >> 2) as u32);
    write_be_u32(&mut image, 0x40024, 0);
    write_partition_header(&mut image, PART_OFF, sectors.len());
    for spec in sectors {
        let sector = encode_sector(spec);
        image.extend_from_slice(&sector);
    }
    image
}
