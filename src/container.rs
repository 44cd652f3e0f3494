use crate::error::Result;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BINARY_MAGIC: &[u8] = b"Kaydara FBX Binary  \0";
const BINARY_HEADER_LEN: usize = 27;
const ASCII_MARKER: &[u8] = b"; FBX";

/// What a container file looks like from its first bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContainerKind {
    Binary { version: u32 },
    Ascii,
    Unknown,
}

impl ContainerKind {
    pub fn probe(path: &Path) -> Result<Self> {
        let mut header = Vec::with_capacity(64);
        File::open(path)?.take(64).read_to_end(&mut header)?;
        Ok(Self::from_header(&header))
    }

    pub fn from_header(header: &[u8]) -> Self {
        if header.starts_with(BINARY_MAGIC) {
            if header.len() < BINARY_HEADER_LEN || header[21..23] != [0x1A, 0x00] {
                return ContainerKind::Unknown;
            }
            let version = u32::from_le_bytes([header[23], header[24], header[25], header[26]]);
            return ContainerKind::Binary { version };
        }

        let start = header
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(header.len());
        if header[start..].starts_with(ASCII_MARKER) {
            return ContainerKind::Ascii;
        }

        ContainerKind::Unknown
    }

    pub fn is_fbx(&self) -> bool {
        !matches!(self, ContainerKind::Unknown)
    }

    pub fn describe(&self) -> String {
        match self {
            ContainerKind::Binary { version } => format!("binary FBX {}", version),
            ContainerKind::Ascii => "ASCII FBX".to_string(),
            ContainerKind::Unknown => "not an FBX container".to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) fn binary_header(version: u32) -> Vec<u8> {
    let mut header = BINARY_MAGIC.to_vec();
    header.extend_from_slice(&[0x1A, 0x00]);
    header.extend_from_slice(&version.to_le_bytes());
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_binary_header() {
        let mut bytes = binary_header(7400);
        bytes.extend_from_slice(b"\0\0\0\0node data");
        assert_eq!(ContainerKind::from_header(&bytes), ContainerKind::Binary { version: 7400 });
        assert!(ContainerKind::from_header(&bytes).is_fbx());
    }

    #[test]
    fn test_ascii_header() {
        let bytes = b"\n; FBX 7.4.0 project file\n; ----";
        assert_eq!(ContainerKind::from_header(bytes), ContainerKind::Ascii);
    }

    #[test]
    fn test_short_or_foreign_headers() {
        assert_eq!(ContainerKind::from_header(b""), ContainerKind::Unknown);
        assert_eq!(ContainerKind::from_header(b"Kaydara FBX Binary  \0\x1A"), ContainerKind::Unknown);
        assert_eq!(ContainerKind::from_header(b"glTF\x02\0\0\0"), ContainerKind::Unknown);
    }

    #[test]
    fn test_probe_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model.fbx");
        std::fs::write(&path, binary_header(7500)).unwrap();

        let kind = ContainerKind::probe(&path).unwrap();
        assert_eq!(kind, ContainerKind::Binary { version: 7500 });
        assert_eq!(kind.describe(), "binary FBX 7500");
    }
}
