//! A thin wrapper pairing a root `Compound` with a backing file path and optional gzip framing
//! (§3.2, §4.3).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression as Flate2Level;

use crate::error::NbtError;
use crate::raw;
use crate::tag::NbtCompound;

/// How an [`NbtFile`] is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileMode {
    /// Truncate or create a new, empty file.
    Create,
    /// The file must already exist; its contents are loaded immediately.
    Load,
    /// Open-or-create; loads existing contents if the file is non-empty.
    Modify,
}

/// A standalone NBT file: a named root compound backed by a path on disk.
pub struct NbtFile {
    path: PathBuf,
    mode: FileMode,
    gzip: bool,
    root_name: String,
    root: NbtCompound,
}

impl NbtFile {
    /// Opens `path` in `mode`. In `Load`/`Modify` mode, existing non-empty contents are decoded
    /// immediately and any codec failure is surfaced to the caller.
    pub fn open(path: impl AsRef<Path>, mode: FileMode, gzip: bool) -> Result<NbtFile, NbtError> {
        let path = path.as_ref().to_path_buf();
        let mut nbt_file = NbtFile {
            path: path.clone(),
            mode,
            gzip,
            root_name: String::new(),
            root: NbtCompound::new(),
        };

        match mode {
            FileMode::Create => {
                File::create(&path)?;
            }
            FileMode::Load => {
                if !path.exists() {
                    return Err(NbtError::IoError(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("{:?} does not exist", path),
                    )));
                }
                nbt_file.load()?;
            }
            FileMode::Modify => {
                if path.exists() && path.metadata()?.len() > 0 {
                    nbt_file.load()?;
                } else {
                    File::create(&path)?;
                }
            }
        }

        Ok(nbt_file)
    }

    /// The path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The root compound's name (customarily empty).
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// The root compound tag.
    pub fn root(&self) -> &NbtCompound {
        &self.root
    }

    /// Mutable access to the root compound tag.
    pub fn root_mut(&mut self) -> &mut NbtCompound {
        &mut self.root
    }

    /// Re-reads the file from disk, replacing the in-memory root (called implicitly by `open`
    /// for `Load`/non-empty `Modify`).
    pub fn load(&mut self) -> Result<(), NbtError> {
        let mut file = File::open(&self.path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let decoded = if self.gzip {
            let mut decoder = GzDecoder::new(&bytes[..]);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out)?;
            out
        } else {
            bytes
        };

        let (name, root) = raw::from_bytes(&decoded)?;
        self.root_name = name;
        self.root = root;
        log::debug!("loaded NBT file {:?} ({} root children)", self.path, self.root.len());
        Ok(())
    }

    /// Serialises the root compound, optionally gzip-wraps it, and (over)writes it to disk,
    /// truncating any prior contents.
    pub fn save(&mut self) -> Result<(), NbtError> {
        let payload = raw::to_bytes(&self.root_name, &self.root)?;
        let payload = if self.gzip {
            let mut encoder = GzEncoder::new(Vec::new(), Flate2Level::default());
            encoder.write_all(&payload)?;
            encoder.finish()?
        } else {
            payload
        };

        let mut file = OpenOptions::new().write(true).create(true).open(&self.path)?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&payload)?;
        log::debug!("saved NBT file {:?} ({} bytes)", self.path, payload.len());
        Ok(())
    }

    /// Creates a deep copy of this file's root at a new path and saves it immediately.
    pub fn copy(&self, path: impl AsRef<Path>) -> Result<NbtFile, NbtError> {
        let mut copy = NbtFile::open(path, FileMode::Create, self.gzip)?;
        copy.root_name = self.root_name.clone();
        copy.root = self.root.clone();
        copy.save()?;
        Ok(copy)
    }

    /// The mode this file was opened with.
    pub fn mode(&self) -> FileMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn temp_path(tag: &str) -> PathBuf {
        let suffix: u32 = rand::thread_rng().gen();
        std::env::temp_dir().join(format!("nbt-file-test-{}-{:08x}.dat", tag, suffix))
    }

    #[test]
    fn create_then_load_round_trips_root() {
        let path = temp_path("create-load");
        let mut file = NbtFile::open(&path, FileMode::Create, false).unwrap();
        file.root_mut().add("greeting", "hi", false).unwrap();
        file.save().unwrap();

        let loaded = NbtFile::open(&path, FileMode::Load, false).unwrap();
        assert_eq!(loaded.root().get("greeting"), Some(&crate::tag::NbtTag::String("hi".into())));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_nonexistent_fails() {
        let path = temp_path("nonexistent");
        let err = NbtFile::open(&path, FileMode::Load, false).unwrap_err();
        assert!(matches!(err, NbtError::IoError(_)));
    }

    #[test]
    fn modify_mode_creates_when_absent_and_loads_when_present() {
        let path = temp_path("modify");
        {
            let mut file = NbtFile::open(&path, FileMode::Modify, false).unwrap();
            assert!(file.root().is_empty());
            file.root_mut().add("a", 1i32, false).unwrap();
            file.save().unwrap();
        }
        let file = NbtFile::open(&path, FileMode::Modify, false).unwrap();
        assert_eq!(file.root().get("a"), Some(&crate::tag::NbtTag::Int(1)));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn gzip_round_trip() {
        let path = temp_path("gzip");
        let mut file = NbtFile::open(&path, FileMode::Create, true).unwrap();
        file.root_mut().add("n", 7i32, false).unwrap();
        file.save().unwrap();

        let loaded = NbtFile::open(&path, FileMode::Load, true).unwrap();
        assert_eq!(loaded.root().get("n"), Some(&crate::tag::NbtTag::Int(7)));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn copy_duplicates_root_to_new_path() {
        let src_path = temp_path("copy-src");
        let dst_path = temp_path("copy-dst");
        let mut src = NbtFile::open(&src_path, FileMode::Create, false).unwrap();
        src.root_mut().add("x", 5i32, false).unwrap();
        src.save().unwrap();

        let copy = src.copy(&dst_path).unwrap();
        assert_eq!(copy.root().get("x"), Some(&crate::tag::NbtTag::Int(5)));

        let reloaded = NbtFile::open(&dst_path, FileMode::Load, false).unwrap();
        assert_eq!(reloaded.root().get("x"), Some(&crate::tag::NbtTag::Int(5)));

        std::fs::remove_file(&src_path).unwrap();
        std::fs::remove_file(&dst_path).unwrap();
    }
}
