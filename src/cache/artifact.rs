//! Decoder for the record stream written by the extractor.
//!
//! The stream is a flat sequence of records, each introduced by a one byte
//! marker. All integers are little-endian; strings carry a `u32` length.

use crate::error::{BridgeError, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

const DOCUMENT_PROPERTY: u8 = b'G';
const MESH_PROPERTY: u8 = b'M';
const ISLAND_GROUPS: u8 = b'I';

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PropertyValue {
    Int(i32),
    Bytes(Vec<u8>),
    /// Types the extractor records by name only.
    None,
}

impl PropertyValue {
    pub fn len(&self) -> usize {
        match self {
            PropertyValue::Int(_) => 4,
            PropertyValue::Bytes(bytes) => bytes.len(),
            PropertyValue::None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactRecord {
    DocumentProperty {
        object: String,
        name: String,
        type_name: String,
        value: PropertyValue,
    },
    MeshProperty {
        mesh: String,
        name: String,
        type_name: String,
        value: PropertyValue,
    },
    IslandGroups {
        mesh: String,
        user_data: String,
        group_ids: Vec<i32>,
    },
}

impl ArtifactRecord {
    pub fn mesh(&self) -> Option<&str> {
        match self {
            ArtifactRecord::DocumentProperty { .. } => None,
            ArtifactRecord::MeshProperty { mesh, .. } | ArtifactRecord::IslandGroups { mesh, .. } => {
                Some(mesh)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactSummary {
    pub document_properties: usize,
    pub mesh_properties: usize,
    pub meshes: Vec<String>,
    pub island_group_records: usize,
    pub island_group_ids: usize,
}

impl ArtifactSummary {
    pub fn from_records(records: &[ArtifactRecord]) -> Self {
        let mut summary = Self::default();
        let mut meshes = BTreeSet::new();

        for record in records {
            match record {
                ArtifactRecord::DocumentProperty { .. } => summary.document_properties += 1,
                ArtifactRecord::MeshProperty { .. } => summary.mesh_properties += 1,
                ArtifactRecord::IslandGroups { group_ids, .. } => {
                    summary.island_group_records += 1;
                    summary.island_group_ids += group_ids.len();
                }
            }
            if let Some(mesh) = record.mesh() {
                meshes.insert(mesh.to_string());
            }
        }

        summary.meshes = meshes.into_iter().collect();
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.document_properties == 0 && self.mesh_properties == 0 && self.island_group_records == 0
    }
}

/// Decode every record of an artifact file.
pub fn read_artifact(path: &Path) -> Result<Vec<ArtifactRecord>> {
    let file = File::open(path)?;
    decode_records(BufReader::new(file)).map_err(|message| BridgeError::Artifact {
        path: path.display().to_string(),
        message,
    })
}

pub fn decode_records<R: Read>(reader: R) -> std::result::Result<Vec<ArtifactRecord>, String> {
    let mut decoder = Decoder { reader, offset: 0 };
    let mut records = Vec::new();

    while let Some(marker) = decoder.marker()? {
        let record = match marker {
            DOCUMENT_PROPERTY => {
                let object = decoder.string()?;
                let name = decoder.string()?;
                let type_name = decoder.string()?;
                let value = decoder.value(&type_name)?;
                ArtifactRecord::DocumentProperty {
                    object,
                    name,
                    type_name,
                    value,
                }
            }
            MESH_PROPERTY => {
                let mesh = decoder.string()?;
                let name = decoder.string()?;
                let type_name = decoder.string()?;
                let value = decoder.value(&type_name)?;
                ArtifactRecord::MeshProperty {
                    mesh,
                    name,
                    type_name,
                    value,
                }
            }
            ISLAND_GROUPS => {
                let mesh = decoder.string()?;
                let user_data = decoder.string()?;
                let group_ids = decoder.int_array()?;
                ArtifactRecord::IslandGroups {
                    mesh,
                    user_data,
                    group_ids,
                }
            }
            other => {
                return Err(format!(
                    "unknown record marker 0x{:02x} at offset {}",
                    other,
                    decoder.offset - 1
                ))
            }
        };
        records.push(record);
    }

    Ok(records)
}

struct Decoder<R> {
    reader: R,
    offset: u64,
}

impl<R: Read> Decoder<R> {
    /// Next marker byte, or `None` on a clean end of stream.
    fn marker(&mut self) -> std::result::Result<Option<u8>, String> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.to_string()),
            }
        }
    }

    fn exact(&mut self, buf: &mut [u8]) -> std::result::Result<(), String> {
        self.reader.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                format!("truncated record at offset {}", self.offset)
            } else {
                e.to_string()
            }
        })?;
        self.offset += buf.len() as u64;
        Ok(())
    }

    fn u32(&mut self) -> std::result::Result<u32, String> {
        let mut buf = [0u8; 4];
        self.exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn bytes(&mut self) -> std::result::Result<Vec<u8>, String> {
        let len = self.u32()? as u64;
        let mut bytes = Vec::new();
        let read = (&mut self.reader)
            .take(len)
            .read_to_end(&mut bytes)
            .map_err(|e| e.to_string())?;
        self.offset += read as u64;
        if (read as u64) < len {
            return Err(format!("truncated record at offset {}", self.offset));
        }
        Ok(bytes)
    }

    fn string(&mut self) -> std::result::Result<String, String> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes).map_err(|_| format!("invalid UTF-8 string before offset {}", self.offset))
    }

    fn value(&mut self, type_name: &str) -> std::result::Result<PropertyValue, String> {
        match type_name {
            "Int" | "Integer" => {
                let mut buf = [0u8; 4];
                self.exact(&mut buf)?;
                Ok(PropertyValue::Int(i32::from_le_bytes(buf)))
            }
            "Blob" | "KString" | "String" | "Url" | "KUrl" => Ok(PropertyValue::Bytes(self.bytes()?)),
            _ => Ok(PropertyValue::None),
        }
    }

    fn int_array(&mut self) -> std::result::Result<Vec<i32>, String> {
        let count = self.u32()?;
        let mut values = Vec::new();
        let mut buf = [0u8; 4];
        for _ in 0..count {
            self.exact(&mut buf)?;
            values.push(i32::from_le_bytes(buf));
        }
        Ok(values)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Minimal writer mirroring the extractor's output, for fixtures.

    pub fn string(out: &mut Vec<u8>, s: &str) {
        out.extend_from_slice(&(s.len() as u32).to_le_bytes());
        out.extend_from_slice(s.as_bytes());
    }

    pub fn document_int(out: &mut Vec<u8>, name: &str, value: i32) {
        out.push(b'G');
        string(out, "FbxDocument");
        string(out, name);
        string(out, "Int");
        out.extend_from_slice(&value.to_le_bytes());
    }

    pub fn mesh_string(out: &mut Vec<u8>, mesh: &str, name: &str, value: &str) {
        out.push(b'M');
        string(out, mesh);
        string(out, name);
        string(out, "KString");
        string(out, value);
    }

    pub fn island_groups(out: &mut Vec<u8>, mesh: &str, ids: &[i32]) {
        out.push(b'I');
        string(out, mesh);
        string(out, "RizomUVUVMapIslandGroupIDs");
        out.extend_from_slice(&(ids.len() as u32).to_le_bytes());
        for id in ids {
            out.extend_from_slice(&id.to_le_bytes());
        }
    }

    pub fn sample() -> Vec<u8> {
        let mut out = Vec::new();
        document_int(&mut out, "RizomUV", 1);
        mesh_string(&mut out, "Crate", "RizomUVUVSets", "UVMap");
        island_groups(&mut out, "Crate", &[0, 0, 1, 2]);
        island_groups(&mut out, "Barrel", &[3]);
        out
    }
}
