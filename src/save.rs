use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::ManifestError;
use crate::utils::settings::TerrainSettings;

const MAGIC_HEADER: &[u8; 4] = b"TSWM";
const VERSION: u32 = 1;
const HEADER_LEN: u64 = 16;

/// Everything needed to reproduce a world: terrain itself is never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldManifest {
    pub seed: u32,
    pub settings: TerrainSettings,
}

impl WorldManifest {
    pub fn new(seed: u32, settings: TerrainSettings) -> Self {
        WorldManifest { seed, settings }
    }
}

pub fn save_manifest<P: AsRef<Path>>(path: P, manifest: &WorldManifest) -> Result<(), ManifestError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(MAGIC_HEADER)?;
    writer.write_all(&VERSION.to_le_bytes())?;

    let data = bincode::serialize(manifest)?;
    writer.write_all(&(data.len() as u64).to_le_bytes())?;
    writer.write_all(&data)?;
    writer.flush()?;

    tracing::info!(seed = manifest.seed, bytes = data.len(), "world manifest saved");
    Ok(())
}

pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<WorldManifest, ManifestError> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC_HEADER {
        return Err(ManifestError::BadMagic);
    }

    let mut version_bytes = [0u8; 4];
    reader.read_exact(&mut version_bytes)?;
    let version = u32::from_le_bytes(version_bytes);
    if version != VERSION {
        return Err(ManifestError::UnsupportedVersion(version));
    }

    let mut size_bytes = [0u8; 8];
    reader.read_exact(&mut size_bytes)?;
    let declared = u64::from_le_bytes(size_bytes);
    let available = file_len.saturating_sub(HEADER_LEN);
    if declared > available {
        return Err(ManifestError::Truncated { declared, available });
    }

    let mut data = vec![0u8; declared as usize];
    reader.read_exact(&mut data)?;

    let manifest: WorldManifest = bincode::deserialize(&data)?;
    manifest.settings.validate()?;
    Ok(manifest)
}

pub const MANIFEST_FILE_EXTENSION: &str = "tsw";
pub const DEFAULT_MANIFEST_FILE: &str = "world.tsw";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::settings::DeviceClass;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("terrastream-{}-{}.{}", name, std::process::id(), MANIFEST_FILE_EXTENSION))
    }

    #[test]
    fn test_manifest_file_round_trip() {
        let path = temp_path("round-trip");
        let mut settings = TerrainSettings::for_device(DeviceClass::Mobile);
        settings.streaming.look_ahead = 32.0;
        let manifest = WorldManifest::new(424242, settings);

        save_manifest(&path, &manifest).unwrap();
        let loaded = load_manifest(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let path = temp_path("bad-magic");
        std::fs::write(&path, b"NOPE\x01\x00\x00\x00").unwrap();
        let result = load_manifest(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ManifestError::BadMagic)));
    }

    #[test]
    fn test_future_version_rejected() {
        let path = temp_path("version");
        let mut bytes = MAGIC_HEADER.to_vec();
        bytes.extend_from_slice(&7u32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();
        let result = load_manifest(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ManifestError::UnsupportedVersion(7))));
    }

    #[test]
    fn test_oversized_length_prefix_rejected() {
        let path = temp_path("oversized");
        let mut bytes = MAGIC_HEADER.to_vec();
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        std::fs::write(&path, bytes).unwrap();
        let result = load_manifest(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            result,
            Err(ManifestError::Truncated {
                declared: u64::MAX,
                available: 8
            })
        ));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let path = temp_path("truncated");
        save_manifest(&path, &WorldManifest::new(9, TerrainSettings::default())).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
        let result = load_manifest(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ManifestError::Truncated { .. })));
    }

    #[test]
    fn test_invalid_settings_rejected_on_load() {
        let path = temp_path("invalid");
        let mut settings = TerrainSettings::default();
        settings.streaming.chunk_size = -1.0;
        save_manifest(&path, &WorldManifest::new(1, settings)).unwrap();
        let result = load_manifest(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ManifestError::Config(_))));
    }
}
