//! Durable profile storage
//!
//! All profiles live in one JSON object keyed by user id. The store is
//! write-through: every successful mutation rewrites the whole file before
//! returning. Default location is the XDG data directory
//! (~/.local/share/fatum/profiles.json).

use crate::config::defaults::{APP_DIR_NAME, STORE_FILE_NAME};
use crate::coord::Location;
use crate::error::{Error, Result};
use crate::profile::{Profile, ProfileDefaults, ProfileField};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

type ProfileMap = BTreeMap<String, Profile>;

/// Profile store backed by a single JSON file
///
/// The internal lock is held across the file write, so whole-store rewrites
/// from different callers never interleave.
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    profiles: Mutex<ProfileMap>,
}

impl ProfileStore {
    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))
    }

    /// Get the default store file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join(STORE_FILE_NAME))
    }

    /// Open the store at `path`, loading existing profiles if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let profiles = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::Store(format!("Failed to read profile store: {}", e))
            })?;

            serde_json::from_str(&content).map_err(|e| {
                Error::Store(format!("Failed to parse profile store: {}", e))
            })?
        } else {
            ProfileMap::new()
        };

        debug!(path = %path.display(), "opened profile store");

        Ok(Self {
            path,
            profiles: Mutex::new(profiles),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a copy of the profile for `id`
    pub fn get(&self, id: &str) -> Option<Profile> {
        self.lock().get(id).cloned()
    }

    /// Create a profile with `defaults`, or move an existing profile's location
    ///
    /// Radius, source and timestamp of an existing profile are left untouched.
    pub fn create_or_update_location(
        &self,
        id: &str,
        location: Location,
        defaults: ProfileDefaults,
    ) -> Result<Profile> {
        let mut profiles = self.lock();

        let updated = match profiles.get(id) {
            Some(existing) => {
                let mut profile = existing.clone();
                profile.apply(ProfileField::Location(location));
                profile
            }
            None => Profile::new(id, location, defaults),
        };

        Self::commit(&self.path, &mut profiles, updated.clone())?;
        Ok(updated)
    }

    /// Overwrite one field of an existing profile
    ///
    /// Returns `Ok(false)` without writing anything when no profile exists.
    pub fn set_field(&self, id: &str, field: ProfileField) -> Result<bool> {
        let mut profiles = self.lock();

        let Some(existing) = profiles.get(id) else {
            return Ok(false);
        };

        let mut updated = existing.clone();
        updated.apply(field);

        Self::commit(&self.path, &mut profiles, updated)?;
        Ok(true)
    }

    /// Overwrite one field of an existing profile, keeping the change in
    /// memory even when the write fails
    ///
    /// Used to undo temporary changes: a later successful write carries the
    /// corrected value to disk.
    pub fn force_field(&self, id: &str, field: ProfileField) -> Result<bool> {
        let mut profiles = self.lock();

        let Some(profile) = profiles.get_mut(id) else {
            return Ok(false);
        };
        profile.apply(field);

        Self::write(&self.path, &profiles)?;
        Ok(true)
    }

    /// Number of stored profiles
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Stored user ids in sorted order
    pub fn ids(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Rewrite the backing file from memory
    pub fn flush(&self) -> Result<()> {
        let profiles = self.lock();
        Self::write(&self.path, &profiles)
    }

    fn lock(&self) -> MutexGuard<'_, ProfileMap> {
        // A panic mid-commit leaves the map consistent: entries are replaced
        // whole and rolled back when the write fails.
        self.profiles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `profile` and persist, restoring the previous entry on failure
    fn commit(path: &Path, profiles: &mut ProfileMap, profile: Profile) -> Result<()> {
        let id = profile.id.clone();
        let previous = profiles.insert(id.clone(), profile);

        if let Err(e) = Self::write(path, profiles) {
            match previous {
                Some(previous) => profiles.insert(id, previous),
                None => profiles.remove(&id),
            };
            return Err(e);
        }

        Ok(())
    }

    /// Replace the file contents with the full map
    fn write(path: &Path, profiles: &ProfileMap) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::Store(format!("Failed to create store directory: {}", e))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(profiles).map_err(|e| {
            Error::Store(format!("Failed to serialize profiles: {}", e))
        })?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content).map_err(|e| {
            Error::Store(format!("Failed to write profile store: {}", e))
        })?;
        fs::rename(&tmp_path, path).map_err(|e| {
            Error::Store(format!("Failed to replace profile store: {}", e))
        })?;

        debug!(path = %path.display(), profiles = profiles.len(), "profile store written");
        Ok(())
    }
}
