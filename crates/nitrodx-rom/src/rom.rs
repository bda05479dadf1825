//! RMCF ROM container parsing.
//!
//! Every Nitro-Core-DX ROM starts with a 32-byte little-endian header:
//!
//! ```text
//! Byte 0-3:   Magic "RMCF" (0x52 0x4D 0x43 0x46, read as u32 0x46434D52)
//! Byte 4-5:   Format version (currently 1)
//! Byte 6-9:   Code/data payload size in bytes
//! Byte 10-11: Entry bank
//! Byte 12-13: Entry offset
//! Byte 14-15: Mapper flags (0 = LoROM)
//! Byte 16-19: Checksum (reserved, ignored)
//! Byte 20-31: Reserved
//! ```
//!
//! The payload that follows is copied into the ROM region at linear offset
//! 0 and appears to the guest through LoROM banking: banks 1..=125 each
//! expose 32 KB at guest offsets 0x8000..=0xFFFF.

/// Errors that can occur when parsing a ROM image.
#[derive(Debug, thiserror::Error)]
pub enum RomError {
    /// File is too small to contain a header.
    #[error("ROM file too small: expected at least {expected} bytes, got {actual}")]
    FileTooSmall {
        /// Minimum size required.
        expected: usize,
        /// Size of the provided image.
        actual: usize,
    },

    /// Invalid magic number in the header.
    #[error("Invalid ROM magic: expected 0x{expected:08X}, got 0x{actual:08X}")]
    InvalidMagic {
        /// The RMCF magic constant.
        expected: u32,
        /// The value found in the image.
        actual: u32,
    },

    /// Header version this loader does not understand.
    #[error("Unsupported ROM version: {0}")]
    UnsupportedVersion(u16),

    /// Unsupported mapper flags (only LoROM is defined).
    #[error("Unsupported mapper flags: 0x{0:04X}")]
    UnsupportedMapper(u16),

    /// Payload larger than the bank mapping can expose.
    #[error("ROM payload too large: {size} bytes exceeds the {max} byte mapping budget")]
    PayloadTooLarge {
        /// Declared payload size.
        size: usize,
        /// Maximum mappable payload.
        max: usize,
    },

    /// Header declares more payload than the file contains.
    #[error("ROM truncated: header declares {declared} payload bytes, file holds {actual}")]
    Truncated {
        /// Payload size from the header.
        declared: usize,
        /// Payload bytes actually present.
        actual: usize,
    },
}

/// Parsed RMCF header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomHeader {
    /// Format version.
    pub version: u16,
    /// Payload size in bytes.
    pub code_size: u32,
    /// Bank execution starts in (typically 1).
    pub entry_bank: u16,
    /// Offset execution starts at (typically 0x8000).
    pub entry_offset: u16,
    /// Mapper flags (0 = LoROM).
    pub mapper: u16,
    /// Header checksum field, currently unused.
    pub checksum: u32,
}

impl RomHeader {
    /// Header length in bytes.
    pub const SIZE: usize = 32;

    /// RMCF magic value as read little-endian from the first four bytes.
    pub const MAGIC: u32 = 0x4643_4D52;

    /// The only header version this loader accepts.
    pub const VERSION: u16 = 1;

    /// Parse a header from the start of a ROM image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is shorter than a header, the magic
    /// does not match, or the version is unknown.
    pub fn parse(data: &[u8]) -> Result<Self, RomError> {
        if data.len() < Self::SIZE {
            return Err(RomError::FileTooSmall {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }

        let magic = read_u32(data, 0);
        if magic != Self::MAGIC {
            return Err(RomError::InvalidMagic {
                expected: Self::MAGIC,
                actual: magic,
            });
        }

        let version = read_u16(data, 4);
        if version != Self::VERSION {
            return Err(RomError::UnsupportedVersion(version));
        }

        Ok(Self {
            version,
            code_size: read_u32(data, 6),
            entry_bank: read_u16(data, 10),
            entry_offset: read_u16(data, 12),
            mapper: read_u16(data, 14),
            checksum: read_u32(data, 16),
        })
    }
}

/// A loaded ROM: validated header plus the raw payload.
#[derive(Debug, Clone)]
pub struct Rom {
    /// Parsed header.
    pub header: RomHeader,
    payload: Vec<u8>,
}

impl Rom {
    /// Guest offset each ROM bank is mapped at.
    pub const BANK_BASE: u16 = 0x8000;

    /// Bytes exposed per bank.
    pub const BANK_SIZE: usize = 0x8000;

    /// First guest bank backed by ROM.
    pub const FIRST_BANK: u8 = 1;
    /// Last guest bank backed by ROM.
    pub const LAST_BANK: u8 = 125;

    /// Largest payload the bank mapping can expose (125 banks x 32 KB).
    pub const MAX_PAYLOAD: usize =
        (Self::LAST_BANK as usize - Self::FIRST_BANK as usize + 1) * Self::BANK_SIZE;

    /// Load and validate a ROM image.
    ///
    /// # Errors
    ///
    /// Returns an error on a malformed header, an unsupported mapper, a
    /// payload exceeding the mapping budget, or a truncated file.
    pub fn load(data: &[u8]) -> Result<Self, RomError> {
        let header = RomHeader::parse(data)?;

        if header.mapper != 0 {
            return Err(RomError::UnsupportedMapper(header.mapper));
        }

        let size = header.code_size as usize;
        if size > Self::MAX_PAYLOAD {
            return Err(RomError::PayloadTooLarge {
                size,
                max: Self::MAX_PAYLOAD,
            });
        }

        let available = data.len() - RomHeader::SIZE;
        if size > available {
            return Err(RomError::Truncated {
                declared: size,
                actual: available,
            });
        }

        let payload = data[RomHeader::SIZE..RomHeader::SIZE + size].to_vec();

        log::info!(
            "Loaded ROM: {} payload bytes, entry {:02X}:{:04X}",
            payload.len(),
            header.entry_bank,
            header.entry_offset
        );
        log::debug!("ROM checksum field: 0x{:08X} (ignored)", header.checksum);

        Ok(Self { header, payload })
    }

    /// Read one payload byte through the LoROM mapping.
    ///
    /// Returns 0 for banks or offsets outside the mapping and for
    /// addresses past the end of the payload (open bus).
    #[inline]
    #[must_use]
    pub fn read(&self, bank: u8, offset: u16) -> u8 {
        match Self::linear(bank, offset) {
            Some(at) => self.payload.get(at).copied().unwrap_or(0),
            None => 0,
        }
    }

    /// Read a little-endian word through the LoROM mapping without
    /// crossing a bank edge byte-by-byte (fast path for opcode fetch).
    #[inline]
    #[must_use]
    pub fn read16(&self, bank: u8, offset: u16) -> u16 {
        let lo = self.read(bank, offset);
        let hi = self.read(bank, offset.wrapping_add(1));
        u16::from(lo) | (u16::from(hi) << 8)
    }

    /// Translate `bank:offset` to a linear payload index.
    #[inline]
    #[must_use]
    pub fn linear(bank: u8, offset: u16) -> Option<usize> {
        if !(Self::FIRST_BANK..=Self::LAST_BANK).contains(&bank) || offset < Self::BANK_BASE {
            return None;
        }
        let bank_index = usize::from(bank - Self::FIRST_BANK);
        Some(bank_index * Self::BANK_SIZE + usize::from(offset - Self::BANK_BASE))
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True when the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[inline]
fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

#[inline]
fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_image(payload: &[u8]) -> Vec<u8> {
        let mut image = vec![0u8; RomHeader::SIZE];
        image[0..4].copy_from_slice(b"RMCF");
        image[4..6].copy_from_slice(&1u16.to_le_bytes());
        image[6..10].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        image[10..12].copy_from_slice(&1u16.to_le_bytes());
        image[12..14].copy_from_slice(&0x8000u16.to_le_bytes());
        image.extend_from_slice(payload);
        image
    }

    #[test]
    fn test_load_valid_image() {
        let rom = Rom::load(&build_image(&[0xAA, 0xBB, 0xCC])).unwrap();
        assert_eq!(rom.header.entry_bank, 1);
        assert_eq!(rom.header.entry_offset, 0x8000);
        assert_eq!(rom.len(), 3);
        assert_eq!(rom.read(1, 0x8000), 0xAA);
        assert_eq!(rom.read(1, 0x8002), 0xCC);
    }

    #[test]
    fn test_reject_bad_magic() {
        let mut image = build_image(&[0x00]);
        image[0] = b'X';
        assert!(matches!(
            Rom::load(&image),
            Err(RomError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_reject_bad_version() {
        let mut image = build_image(&[0x00]);
        image[4] = 2;
        assert!(matches!(
            Rom::load(&image),
            Err(RomError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_reject_short_file() {
        assert!(matches!(
            Rom::load(&[0x52, 0x4D]),
            Err(RomError::FileTooSmall { .. })
        ));
    }

    #[test]
    fn test_reject_truncated_payload() {
        let mut image = build_image(&[0x01, 0x02]);
        image[6..10].copy_from_slice(&100u32.to_le_bytes());
        assert!(matches!(Rom::load(&image), Err(RomError::Truncated { .. })));
    }

    #[test]
    fn test_reject_oversized_payload() {
        let mut image = build_image(&[]);
        image[6..10].copy_from_slice(&(Rom::MAX_PAYLOAD as u32 + 1).to_le_bytes());
        assert!(matches!(
            Rom::load(&image),
            Err(RomError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_linear_mapping() {
        assert_eq!(Rom::linear(1, 0x8000), Some(0));
        assert_eq!(Rom::linear(1, 0xFFFF), Some(0x7FFF));
        assert_eq!(Rom::linear(2, 0x8000), Some(0x8000));
        assert_eq!(Rom::linear(125, 0xFFFF), Some(Rom::MAX_PAYLOAD - 1));
        assert_eq!(Rom::linear(0, 0x8000), None);
        assert_eq!(Rom::linear(126, 0x8000), None);
        assert_eq!(Rom::linear(1, 0x7FFF), None);
    }

    #[test]
    fn test_open_bus_reads_zero() {
        let rom = Rom::load(&build_image(&[0xAA])).unwrap();
        assert_eq!(rom.read(1, 0x8001), 0, "past end of payload");
        assert_eq!(rom.read(0, 0x9000), 0, "bank 0 is not ROM");
        assert_eq!(rom.read(50, 0x0000), 0, "below the bank window");
    }

    #[test]
    fn test_word_read_spans_bank_edge() {
        let mut payload = vec![0u8; Rom::BANK_SIZE + 1];
        payload[Rom::BANK_SIZE - 1] = 0x34;
        payload[Rom::BANK_SIZE] = 0x12;
        let rom = Rom::load(&build_image(&payload)).unwrap();
        // Word at 1:0xFFFF wraps the offset; the high byte comes from
        // 1:0x0000 which is unmapped and reads 0.
        assert_eq!(rom.read16(1, 0xFFFF), 0x0034);
        // The continuation lives at the start of bank 2.
        assert_eq!(rom.read(2, 0x8000), 0x12);
    }
}
