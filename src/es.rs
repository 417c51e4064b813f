//! Ticket and title metadata (TMD) views.
//!
//! Each Wii partition starts with a signed ticket carrying the title key,
//! followed by pointers to the TMD describing the title's contents. The
//! volume core only consumes the title key, title IDs, and the TMD size
//! bounds; the remaining accessors exist for callers that inspect titles.

use std::{ffi::CStr, mem::size_of};

use zerocopy::{big_endian::*, AsBytes, FromBytes, FromZeroes};

use crate::{
    blob::{aes_decrypt, HashBytes, KeyBytes},
    static_assert, Error, Result,
};

// ppki (Retail)
const RVL_CERT_ISSUER_PPKI_TICKET: &str = "Root-CA00000001-XS00000003";
#[rustfmt::skip]
const RETAIL_COMMON_KEYS: [KeyBytes; 3] = [
    /* RVL_KEY_RETAIL */
    [0xeb, 0xe4, 0x2a, 0x22, 0x5e, 0x85, 0x93, 0xe4, 0x48, 0xd9, 0xc5, 0x45, 0x73, 0x81, 0xaa, 0xf7],
    /* RVL_KEY_KOREAN */
    [0x63, 0xb8, 0x2b, 0xb4, 0xf4, 0x61, 0x4e, 0x2e, 0x13, 0xf2, 0xfe, 0xfb, 0xba, 0x4c, 0x9b, 0x7e],
    /* vWii_KEY_RETAIL */
    [0x30, 0xbf, 0xc7, 0x6e, 0x7c, 0x19, 0xaf, 0xbb, 0x23, 0x16, 0x33, 0x30, 0xce, 0xd7, 0xc2, 0x8d],
];

// dpki (Debug)
const RVL_CERT_ISSUER_DPKI_TICKET: &str = "Root-CA00000002-XS00000006";
#[rustfmt::skip]
const DEBUG_COMMON_KEYS: [KeyBytes; 3] = [
    /* RVL_KEY_DEBUG */
    [0xa1, 0x60, 0x4a, 0x6a, 0x71, 0x23, 0xb5, 0x29, 0xae, 0x8b, 0xec, 0x32, 0xc8, 0x16, 0xfc, 0xaa],
    /* RVL_KEY_KOREAN_DEBUG */
    [0x67, 0x45, 0x8b, 0x6b, 0xc6, 0x23, 0x7b, 0x32, 0x69, 0x98, 0x3c, 0x64, 0x73, 0x48, 0x33, 0x66],
    /* vWii_KEY_DEBUG */
    [0x2f, 0x5c, 0x1b, 0x29, 0x44, 0xe7, 0xfd, 0x6f, 0xc3, 0x97, 0x96, 0x4b, 0x05, 0x76, 0x91, 0xfa],
];

/// Size in bytes of a partition ticket.
pub const TICKET_SIZE: usize = 0x2A4;

/// Size in bytes of the fixed TMD header.
pub const TMD_HEADER_SIZE: usize = 0x1E4;

/// Upper bound on a plausible TMD size, header plus content table.
///
/// The on-disc format does not pin this down; 4 MiB is far beyond any real
/// content table.
pub const TMD_MAX_SIZE: usize = 0x40_0000;

/// Signed blob header preceding tickets and TMDs.
#[derive(Debug, Clone, PartialEq, FromBytes, FromZeroes, AsBytes)]
#[repr(C, align(4))]
pub struct SignedHeader {
    /// Signature type, always 0x00010001 (RSA-2048)
    pub sig_type: U32,
    /// RSA-2048 signature
    pub sig: [u8; 256],
    _pad: [u8; 60],
}

static_assert!(size_of::<SignedHeader>() == 0x140);

/// Playtime limit entry in a ticket.
#[derive(Debug, Clone, PartialEq, Default, FromBytes, FromZeroes, AsBytes)]
#[repr(C, align(4))]
pub struct TicketTimeLimit {
    /// Whether the limit is enforced
    pub enable_time_limit: U32,
    /// Limit in seconds
    pub time_limit: U32,
}

static_assert!(size_of::<TicketTimeLimit>() == 8);

/// On-disc ticket layout.
#[derive(Debug, Clone, PartialEq, FromBytes, FromZeroes, AsBytes)]
#[repr(C, align(4))]
pub struct Ticket {
    /// Signature header
    pub header: SignedHeader,
    /// Signature issuer
    pub sig_issuer: [u8; 64],
    /// ECDH data
    pub ecdh: [u8; 60],
    /// Ticket format version
    pub version: u8,
    _pad1: U16,
    /// Title key, encrypted with a common key
    pub title_key: KeyBytes,
    _pad2: u8,
    /// Ticket ID
    pub ticket_id: [u8; 8],
    /// Console ID
    pub console_id: [u8; 4],
    /// Title ID
    pub title_id: [u8; 8],
    /// Access mask
    pub access_mask: U16,
    /// Ticket title version
    pub ticket_title_version: U16,
    /// Permitted titles mask
    pub permitted_titles_mask: U32,
    /// Permit mask
    pub permit_mask: U32,
    /// Title export allowed
    pub title_export_allowed: u8,
    /// Common key index
    pub common_key_idx: u8,
    _pad4: [u8; 48],
    /// Content access permissions
    pub content_access_permissions: [u8; 64],
    _pad5: [u8; 2],
    /// Playtime limits
    pub time_limits: [TicketTimeLimit; 8],
}

static_assert!(size_of::<Ticket>() == TICKET_SIZE);

impl Ticket {
    /// Decrypts the title key field with the common key named by the
    /// ticket's issuer and common key index, IV = title ID.
    pub fn decrypt_title_key(&self) -> Result<KeyBytes> {
        let mut iv: KeyBytes = [0; 16];
        iv[..8].copy_from_slice(&self.title_id);
        let cert_issuer_ticket =
            CStr::from_bytes_until_nul(&self.sig_issuer).ok().and_then(|c| c.to_str().ok());
        let common_keys = match cert_issuer_ticket {
            Some(RVL_CERT_ISSUER_PPKI_TICKET) => &RETAIL_COMMON_KEYS,
            Some(RVL_CERT_ISSUER_DPKI_TICKET) => &DEBUG_COMMON_KEYS,
            Some(v) => {
                return Err(Error::DiscFormat(format!("unknown certificate issuer {:?}", v)));
            }
            None => {
                return Err(Error::DiscFormat("failed to parse certificate issuer".to_string()));
            }
        };
        let common_key = common_keys.get(self.common_key_idx as usize).ok_or(Error::DiscFormat(
            format!("unknown common key index {}", self.common_key_idx),
        ))?;
        let mut title_key = self.title_key;
        aes_decrypt(common_key, iv, &mut title_key);
        Ok(title_key)
    }
}

/// Size in bytes of a ticket view.
pub const TICKET_VIEW_SIZE: usize = 0xD8;

/// The signature-less condensation of a [`Ticket`] that ES calls consume.
#[derive(Debug, Clone, PartialEq, FromBytes, FromZeroes, AsBytes)]
#[repr(C, align(4))]
pub struct TicketView {
    /// Ticket format version
    pub version: U32,
    /// Ticket ID
    pub ticket_id: [u8; 8],
    /// Console ID
    pub device_id: [u8; 4],
    /// Title ID
    pub title_id: [u8; 8],
    /// Access mask
    pub access_mask: U16,
    _pad1: U16,
    /// Permitted title ID
    pub permitted_title_id: U32,
    /// Permitted titles mask
    pub permitted_title_mask: U32,
    /// Title export allowed
    pub title_export_allowed: u8,
    /// Common key index
    pub common_key_idx: u8,
    _pad2: [u8; 48],
    /// Content access permissions
    pub content_access_permissions: [u8; 64],
    _pad3: [u8; 2],
    /// Playtime limits
    pub time_limits: [TicketTimeLimit; 8],
}

static_assert!(size_of::<TicketView>() == TICKET_VIEW_SIZE);

/// An owned view over a raw ticket blob.
///
/// The blob is taken by move and validated on access: a well-formed ticket
/// is exactly [`TICKET_SIZE`] bytes. Signature verification is not
/// performed. [`title_key`](Self::title_key) returns the field as stored;
/// [`decrypt_title_key`](Self::decrypt_title_key) unwraps it with the
/// appropriate common key. Personalised (device-bound) tickets are not
/// handled.
pub struct TicketReader {
    bytes: Box<[u8]>,
}

impl TicketReader {
    /// Takes ownership of a raw ticket blob.
    #[inline]
    pub fn new(bytes: Box<[u8]>) -> Self { Self { bytes } }

    fn view(&self) -> Option<&Ticket> { Ticket::ref_from(self.bytes.as_ref()) }

    /// Whether the blob is a well-formed ticket.
    #[inline]
    pub fn is_valid(&self) -> bool { self.view().is_some() }

    /// The ticket's title ID.
    #[inline]
    pub fn title_id(&self) -> Option<u64> {
        self.view().map(|t| u64::from_be_bytes(t.title_id))
    }

    /// The raw 16-byte title key field, still encrypted with a common key.
    #[inline]
    pub fn title_key(&self) -> Option<KeyBytes> { self.view().map(|t| t.title_key) }

    /// Decrypts the title key field with the common key named by the
    /// ticket's issuer and common key index.
    pub fn decrypt_title_key(&self) -> Result<KeyBytes> {
        self.view()
            .ok_or_else(|| Error::DiscFormat("invalid ticket".to_string()))?
            .decrypt_title_key()
    }

    /// The ticket ID.
    #[inline]
    pub fn ticket_id(&self) -> Option<u64> {
        self.view().map(|t| u64::from_be_bytes(t.ticket_id))
    }

    /// The console ID the ticket is bound to, zero for disc tickets.
    #[inline]
    pub fn console_id(&self) -> Option<u32> {
        self.view().map(|t| u32::from_be_bytes(t.console_id))
    }

    /// Index of the common key the title key field is encrypted with.
    #[inline]
    pub fn common_key_index(&self) -> Option<u8> { self.view().map(|t| t.common_key_idx) }

    /// Builds the signature-less [`TicketView`] that ES calls consume.
    pub fn ticket_view(&self) -> Option<TicketView> {
        let t = self.view()?;
        Some(TicketView {
            version: U32::new(t.version as u32),
            ticket_id: t.ticket_id,
            device_id: t.console_id,
            title_id: t.title_id,
            access_mask: t.access_mask,
            _pad1: U16::new(0),
            permitted_title_id: t.permitted_titles_mask,
            permitted_title_mask: t.permit_mask,
            title_export_allowed: t.title_export_allowed,
            common_key_idx: t.common_key_idx,
            _pad2: [0; 48],
            content_access_permissions: t.content_access_permissions,
            _pad3: [0; 2],
            time_limits: t.time_limits.clone(),
        })
    }

    /// The raw ticket bytes.
    #[inline]
    pub fn raw(&self) -> &[u8] { &self.bytes }
}

/// On-disc TMD header layout.
#[derive(Debug, Clone, PartialEq, FromBytes, FromZeroes, AsBytes)]
#[repr(C, align(4))]
pub struct TmdHeader {
    /// Signature header
    pub header: SignedHeader,
    /// Signature issuer
    pub sig_issuer: [u8; 64],
    /// TMD format version
    pub version: u8,
    /// CA CRL version
    pub ca_crl_version: u8,
    /// Signer CRL version
    pub signer_crl_version: u8,
    /// Whether this title is for vWii
    pub is_vwii: u8,
    /// IOS the title runs under
    pub ios_id: [u8; 8],
    /// Title ID
    pub title_id: [u8; 8],
    /// Title type flags
    pub title_type: U32,
    /// Group ID
    pub group_id: U16,
    _pad1: [u8; 2],
    /// Region code
    pub region: U16,
    /// Age ratings
    pub ratings: [u8; 16],
    _pad2: [u8; 12],
    /// IPC mask
    pub ipc_mask: [u8; 12],
    _pad3: [u8; 18],
    /// Access rights flags
    pub access_flags: U32,
    /// Title version
    pub title_version: U16,
    /// Number of content records following the header
    pub num_contents: U16,
    /// Index of the boot content
    pub boot_idx: U16,
    /// Minor version
    pub minor_version: U16,
}

static_assert!(size_of::<TmdHeader>() == TMD_HEADER_SIZE);

/// Content record in a TMD's content table.
#[derive(Debug, Clone, PartialEq, FromBytes, FromZeroes, AsBytes)]
#[repr(C, align(4))]
pub struct Content {
    /// Content ID
    pub id: U32,
    /// Content index
    pub index: U16,
    /// Content type flags
    pub kind: U16,
    /// Content size in bytes
    pub size: U64,
    /// SHA-1 of the content
    pub hash: HashBytes,
}

static_assert!(size_of::<Content>() == 36);

/// Returns whether `len` is a plausible TMD size: at least the fixed header,
/// at most [`TMD_MAX_SIZE`].
#[inline]
pub fn is_valid_tmd_size(len: usize) -> bool { (TMD_HEADER_SIZE..=TMD_MAX_SIZE).contains(&len) }

/// An owned view over a raw TMD blob.
///
/// The blob is taken by move to avoid copying content tables, which can run
/// to hundreds of records for system titles.
pub struct TmdReader {
    bytes: Box<[u8]>,
}

impl TmdReader {
    /// Takes ownership of a raw TMD blob.
    #[inline]
    pub fn new(bytes: Box<[u8]>) -> Self { Self { bytes } }

    fn header(&self) -> Option<&TmdHeader> {
        if !is_valid_tmd_size(self.bytes.len()) {
            return None;
        }
        TmdHeader::ref_from_prefix(&self.bytes)
    }

    /// Whether the blob has a plausible TMD size.
    #[inline]
    pub fn is_valid(&self) -> bool { self.header().is_some() }

    /// The TMD's title ID.
    #[inline]
    pub fn title_id(&self) -> Option<u64> {
        self.header().map(|h| u64::from_be_bytes(h.title_id))
    }

    /// ID of the IOS the title runs under.
    #[inline]
    pub fn ios_id(&self) -> Option<u64> { self.header().map(|h| u64::from_be_bytes(h.ios_id)) }

    /// The title version.
    #[inline]
    pub fn title_version(&self) -> Option<u16> {
        self.header().map(|h| h.title_version.get())
    }

    /// The group ID.
    #[inline]
    pub fn group_id(&self) -> Option<u16> { self.header().map(|h| h.group_id.get()) }

    /// The raw region code.
    #[inline]
    pub fn region(&self) -> Option<u16> { self.header().map(|h| h.region.get()) }

    /// Index of the boot content.
    #[inline]
    pub fn boot_index(&self) -> Option<u16> { self.header().map(|h| h.boot_idx.get()) }

    /// The content records following the header.
    ///
    /// Clamped to however many records the buffer actually holds, should the
    /// declared count overrun it.
    pub fn contents(&self) -> &[Content] {
        let Some(header) = self.header() else {
            return &[];
        };
        let declared = header.num_contents.get() as usize;
        let avail = (self.bytes.len() - TMD_HEADER_SIZE) / size_of::<Content>();
        let count = declared.min(avail);
        Content::slice_from(&self.bytes[TMD_HEADER_SIZE..TMD_HEADER_SIZE + count * size_of::<Content>()])
            .unwrap_or(&[])
    }

    /// The raw TMD bytes.
    #[inline]
    pub fn raw(&self) -> &[u8] { &self.bytes }
}
