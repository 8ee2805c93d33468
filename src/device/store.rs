//! Profile Store
//!
//! Keyed store of [`DeviceProfile`]s with last-write-wins JSON persistence.
//! The configuration surface mutates profiles between packets; the pipeline
//! only reads them.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::profile::{Coefficient, DeviceProfile, InputAxis, OutputAxis, ARM, GLOVE};
use super::sample::DeviceId;

/// Result type for profile store operations
pub type Result<T> = std::result::Result<T, ProfileStoreError>;

/// Profile store errors
#[derive(Error, Debug)]
pub enum ProfileStoreError {
    /// Reading or writing the profile file failed
    #[error("Profile file I/O error at {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Profile file is not a valid profile record
    #[error("Profile file {path} is corrupt: {source}")]
    Corrupt {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Serialising profiles failed
    #[error("Failed to serialise profiles: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Profiles keyed by device id
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileStore {
    profiles: BTreeMap<DeviceId, DeviceProfile>,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ProfileStore {
    /// Store holding the default Arm and Glove profiles
    pub fn with_defaults() -> Self {
        let profiles = [ARM, GLOVE]
            .into_iter()
            .map(DeviceId::new)
            .map(|id| {
                let profile = DeviceProfile::for_device(&id);
                (id, profile)
            })
            .collect();
        Self { profiles }
    }

    /// Load profiles from a JSON file
    ///
    /// A missing file yields the defaults. Unmapped devices are repaired
    /// after loading.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No profile file at {:?}, using defaults", path);
                return Ok(Self::with_defaults());
            }
            Err(source) => {
                return Err(ProfileStoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let profiles: BTreeMap<DeviceId, DeviceProfile> =
            serde_json::from_str(&content).map_err(|source| ProfileStoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        let mut store = Self { profiles };
        store.repair_mappings();
        info!("Loaded {} device profiles from {:?}", store.len(), path);
        Ok(store)
    }

    /// Persist all profiles, replacing the file atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.profiles)?;
        let io_err = |source| ProfileStoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = dir {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp).map_err(io_err)?;
            file.write_all(json.as_bytes()).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        fs::rename(&tmp, path).map_err(io_err)?;

        debug!("Saved {} device profiles to {:?}", self.len(), path);
        Ok(())
    }

    /// Profile for a device, if one exists
    pub fn get(&self, device: &DeviceId) -> Option<&DeviceProfile> {
        self.profiles.get(device)
    }

    /// Profile for a device, created with defaults on first access
    pub fn get_or_create(&mut self, device: &DeviceId) -> &mut DeviceProfile {
        self.profiles.entry(device.clone()).or_insert_with(|| {
            debug!("Creating default profile for new device {}", device);
            DeviceProfile::for_device(device)
        })
    }

    /// Replace a device's profile (last write wins)
    pub fn set(&mut self, device: DeviceId, profile: DeviceProfile) {
        self.profiles.insert(device, profile);
    }

    /// Cycle one mixing cell through 0 → 1 → -1 → 0
    pub fn cycle_mix(
        &mut self,
        device: &DeviceId,
        output: OutputAxis,
        input: InputAxis,
    ) -> Coefficient {
        let value = self.get_or_create(device).row_mut(output).cycle(input);
        debug!("{} mix{}.{:?} -> {:?}", device, output, input, value);
        value
    }

    /// Give any device with no routed orientation channel its default mapping
    pub fn repair_mappings(&mut self) -> usize {
        let mut repaired = 0;
        for (id, profile) in self.profiles.iter_mut() {
            if profile.gyro_unmapped() {
                info!("{} has no axis mappings, applying defaults", id);
                profile.apply_default_mapping(id);
                repaired += 1;
            }
        }
        repaired
    }

    /// Discard all profiles and restore the defaults
    pub fn factory_reset(&mut self) {
        info!("Profile store reset to factory defaults");
        *self = Self::with_defaults();
    }

    /// Iterate devices and profiles
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &DeviceProfile)> {
        self.profiles.iter()
    }

    /// Number of stored profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True when the store is empty
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
