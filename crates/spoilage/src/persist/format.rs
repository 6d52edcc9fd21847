//! Framed binary format shared by all artifact files.
//!
//! Each file is a 32-byte header followed by a Postcard-encoded payload.
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     Magic ("SPLG")
//! 4       1     Version major
//! 5       1     Version minor
//! 6       1     Artifact kind
//! 7       1     Reserved
//! 8       8     Run id (little-endian)
//! 16      4     Payload size (bytes)
//! 20      4     CRC32 checksum of payload
//! 24      8     Reserved
//! ```
//!
//! The run id ties the three files of one bundle together: every artifact
//! written by a single save carries the same value.

use std::fmt;

use thiserror::Error;

/// Magic bytes identifying an artifact file.
pub const MAGIC: &[u8; 4] = b"SPLG";

pub const CURRENT_VERSION_MAJOR: u8 = 1;
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the format header in bytes.
pub const HEADER_SIZE: usize = 32;

// ============================================================================
// Artifact Kind
// ============================================================================

/// Which part of a bundle a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArtifactKind {
    Classifier = 0,
    Scaler = 1,
    LabelCodec = 2,
}

impl ArtifactKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Classifier),
            1 => Some(Self::Scaler),
            2 => Some(Self::LabelCodec),
            _ => None,
        }
    }

    /// File name inside a bundle directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Classifier => "model.bin",
            Self::Scaler => "scaler.bin",
            Self::LabelCodec => "label_codec.bin",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Classifier => "classifier",
            Self::Scaler => "scaler",
            Self::LabelCodec => "label codec",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Format Header
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub kind: ArtifactKind,
    pub run_id: u64,
    pub payload_size: u32,
    pub checksum: u32,
}

impl FormatHeader {
    pub fn new(kind: ArtifactKind, run_id: u64) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            kind,
            run_id,
            payload_size: 0,
            checksum: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[6] = self.kind as u8;
        buf[8..16].copy_from_slice(&self.run_id.to_le_bytes());
        buf[16..20].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[20..24].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, FormatError> {
        if &buf[0..4] != MAGIC {
            return Err(FormatError::NotAnArtifact);
        }

        let version_major = buf[4];
        let version_minor = buf[5];
        if version_major > CURRENT_VERSION_MAJOR {
            return Err(FormatError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        let kind = ArtifactKind::from_u8(buf[6]).ok_or(FormatError::UnknownKind(buf[6]))?;

        let mut run_id = [0u8; 8];
        run_id.copy_from_slice(&buf[8..16]);

        Ok(Self {
            version_major,
            version_minor,
            kind,
            run_id: u64::from_le_bytes(run_id),
            payload_size: u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]),
            checksum: u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]),
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A file's bytes do not form a valid artifact frame.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("not an artifact file (bad magic)")]
    NotAnArtifact,

    #[error("artifact requires format {major}.{minor} or later")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("unknown artifact kind {0}")]
    UnknownKind(u8),

    #[error("expected a {expected} artifact, found a {actual} artifact")]
    WrongKind {
        expected: ArtifactKind,
        actual: ArtifactKind,
    },

    #[error("file truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("decoding error: {0}")]
    Decoding(#[from] postcard::Error),
}

// ============================================================================
// Framing
// ============================================================================

/// Run id as written in logs and CLI output: 16 lowercase hex digits.
pub fn format_run_id(run_id: u64) -> String {
    format!("{run_id:016x}")
}

/// Compute CRC32 checksum of data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Frame `payload` with a header for `kind` and `run_id`.
pub fn frame(kind: ArtifactKind, run_id: u64, payload: &[u8]) -> Vec<u8> {
    let mut header = FormatHeader::new(kind, run_id);
    header.payload_size = payload.len() as u32;
    header.checksum = compute_checksum(payload);

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(payload);
    out
}

/// Check a framed file and return its header and payload.
///
/// The whole file must be exactly one frame of the expected kind with a
/// matching checksum.
pub fn unframe(bytes: &[u8], expected: ArtifactKind) -> Result<(FormatHeader, &[u8]), FormatError> {
    let Some(header_bytes) = bytes.first_chunk::<HEADER_SIZE>() else {
        return Err(FormatError::Truncated {
            expected: HEADER_SIZE,
            actual: bytes.len(),
        });
    };
    let header = FormatHeader::from_bytes(header_bytes)?;
    if header.kind != expected {
        return Err(FormatError::WrongKind {
            expected,
            actual: header.kind,
        });
    }

    let body = &bytes[HEADER_SIZE..];
    let payload_size = header.payload_size as usize;
    if body.len() < payload_size {
        return Err(FormatError::Truncated {
            expected: HEADER_SIZE + payload_size,
            actual: bytes.len(),
        });
    }
    if body.len() > payload_size {
        return Err(FormatError::TrailingBytes(body.len() - payload_size));
    }

    let actual = compute_checksum(body);
    if actual != header.checksum {
        return Err(FormatError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }
    Ok((header, body))
}
