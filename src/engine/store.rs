use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sysinfo::{Pid, System};
use uuid::Uuid;

use super::error::{EngineError, EngineResult};
use super::index::{ArtifactBundle, IndexConfig};

const FORMAT_VERSION: u32 = 1;
const CURRENT_FILE: &str = "CURRENT";
const LOCK_FILE: &str = "build.lock";
const BUILDS_DIR: &str = "builds";
const MANIFEST_FILE: &str = "manifest.json";
const VECTORIZER_FILE: &str = "vectorizer.json";
const MATRIX_FILE: &str = "matrix.json";
const INDEX_FILE: &str = "index.json";

/// Describes one persisted bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub fit_id: Uuid,
    pub built_at: DateTime<Utc>,
    pub catalog_rows: usize,
    pub catalog_fingerprint: u32,
    pub config: IndexConfig,
}

/// Every artifact file carries the id of the fit that produced it
#[derive(Serialize, Deserialize)]
struct Stamped<T> {
    fit_id: Uuid,
    artifact: T,
}

/// Directory of persisted artifact bundles
///
/// Layout:
///
/// ```text
/// <root>/CURRENT                     fit id of the bundle being served
/// <root>/builds/<fit_id>/*.json      manifest, vectorizer, matrix, index
/// <root>/build.lock                  held while a build is being saved
/// ```
///
/// A bundle is written completely into its own directory before `CURRENT` is
/// atomically replaced, so a reader sees the old bundle or the new one.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    keep_builds: usize,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            keep_builds: 2,
        }
    }

    /// Number of most recent builds kept on disk, including the current one
    pub fn with_keep_builds(mut self, keep_builds: usize) -> Self {
        self.keep_builds = keep_builds.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn build_dir(&self, fit_id: Uuid) -> PathBuf {
        self.root.join(BUILDS_DIR).join(fit_id.to_string())
    }

    /// Takes the exclusive build lock for this store
    ///
    /// A lock file left behind by a builder that is no longer running is
    /// reclaimed. A lock held by a live process fails with `BuildInProgress`.
    pub fn lock(&self) -> EngineResult<BuildLock> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(LOCK_FILE);
        match create_lock_file(&path) {
            Err(EngineError::BuildInProgress(_)) if lock_is_stale(&path) => {
                tracing::warn!(path = %path.display(), "Reclaiming build lock from a dead builder");
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                create_lock_file(&path)
            }
            result => result,
        }
    }

    /// Persists `bundle` and makes it the current bundle
    ///
    /// Requires the build lock. Previously saved bundles stay intact until the
    /// new one is fully written.
    pub fn save(&self, bundle: &ArtifactBundle, _lock: &BuildLock) -> EngineResult<()> {
        let dir = self.build_dir(bundle.fit_id);
        fs::create_dir_all(&dir)?;

        let fit_id = bundle.fit_id;
        write_json_atomic(&dir, VECTORIZER_FILE, &stamp(fit_id, &bundle.vectorizer))?;
        write_json_atomic(&dir, MATRIX_FILE, &stamp(fit_id, &bundle.matrix))?;
        write_json_atomic(&dir, INDEX_FILE, &stamp(fit_id, &bundle.index))?;
        write_json_atomic(
            &dir,
            MANIFEST_FILE,
            &Manifest {
                format_version: FORMAT_VERSION,
                fit_id,
                built_at: bundle.built_at,
                catalog_rows: bundle.catalog_rows,
                catalog_fingerprint: bundle.catalog_fingerprint,
                config: bundle.config,
            },
        )?;

        let mut pointer = tempfile::NamedTempFile::new_in(&self.root)?;
        writeln!(pointer, "{}", fit_id)?;
        pointer.as_file().sync_all()?;
        pointer
            .persist(self.root.join(CURRENT_FILE))
            .map_err(|e| EngineError::Io(e.error))?;

        tracing::info!(
            fit_id = %fit_id,
            dir = %dir.display(),
            "Saved artifact bundle"
        );

        self.prune(fit_id)?;
        Ok(())
    }

    /// Fit id named by `CURRENT`, if any bundle has been saved
    pub fn current_fit_id(&self) -> EngineResult<Option<Uuid>> {
        let contents = match fs::read_to_string(self.root.join(CURRENT_FILE)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Uuid::parse_str(contents.trim()).map(Some).map_err(|e| {
            EngineError::CorruptArtifact(format!("{} is not a fit id: {}", CURRENT_FILE, e))
        })
    }

    /// Loads the current bundle
    pub fn load(&self) -> EngineResult<ArtifactBundle> {
        let fit_id = self.current_fit_id()?.ok_or_else(|| {
            EngineError::CorruptArtifact(format!(
                "no artifact bundle has been saved under {}",
                self.root.display()
            ))
        })?;
        self.load_build(fit_id)
    }

    /// Loads a specific saved bundle
    pub fn load_build(&self, fit_id: Uuid) -> EngineResult<ArtifactBundle> {
        let dir = self.build_dir(fit_id);
        let manifest: Manifest = read_json(&dir.join(MANIFEST_FILE))?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(EngineError::CorruptArtifact(format!(
                "unsupported artifact format version {}",
                manifest.format_version
            )));
        }
        if manifest.fit_id != fit_id {
            return Err(EngineError::CorruptArtifact(format!(
                "manifest in {} belongs to fit {}",
                dir.display(),
                manifest.fit_id
            )));
        }

        let bundle = ArtifactBundle {
            fit_id,
            built_at: manifest.built_at,
            catalog_rows: manifest.catalog_rows,
            catalog_fingerprint: manifest.catalog_fingerprint,
            config: manifest.config,
            vectorizer: unstamp(fit_id, VECTORIZER_FILE, read_json(&dir.join(VECTORIZER_FILE))?)?,
            matrix: unstamp(fit_id, MATRIX_FILE, read_json(&dir.join(MATRIX_FILE))?)?,
            index: unstamp(fit_id, INDEX_FILE, read_json(&dir.join(INDEX_FILE))?)?,
        };
        bundle.check_consistency()?;

        tracing::info!(
            fit_id = %fit_id,
            rows = bundle.catalog_rows,
            built_at = %bundle.built_at,
            "Loaded artifact bundle"
        );

        Ok(bundle)
    }

    /// Removes old builds beyond `keep_builds`, never touching `current`
    fn prune(&self, current: Uuid) -> EngineResult<()> {
        let builds = self.root.join(BUILDS_DIR);
        let mut saved: Vec<(DateTime<Utc>, PathBuf)> = Vec::new();

        for entry in fs::read_dir(&builds)? {
            let path = entry?.path();
            let Some(fit_id) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| Uuid::parse_str(name).ok())
            else {
                continue;
            };
            if fit_id == current {
                continue;
            }
            match read_json::<Manifest>(&path.join(MANIFEST_FILE)) {
                Ok(manifest) => saved.push((manifest.built_at, path)),
                // Half-written build from an interrupted save.
                Err(_) => saved.push((DateTime::<Utc>::MIN_UTC, path)),
            }
        }

        saved.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, path) in saved.into_iter().skip(self.keep_builds - 1) {
            if let Err(e) = fs::remove_dir_all(&path) {
                tracing::warn!(error = %e, dir = %path.display(), "Failed to remove old build");
            } else {
                tracing::debug!(dir = %path.display(), "Removed old build");
            }
        }
        Ok(())
    }
}

/// Exclusive build lock, released on drop
#[derive(Debug)]
pub struct BuildLock {
    path: PathBuf,
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(error = %e, path = %self.path.display(), "Failed to release build lock");
        }
    }
}

fn create_lock_file(path: &Path) -> EngineResult<BuildLock> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            let lock = BuildLock {
                path: path.to_path_buf(),
            };
            writeln!(file, "{}", std::process::id())?;
            file.sync_all()?;
            Ok(lock)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            Err(EngineError::BuildInProgress(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// True when the lock file names a process that is not running
///
/// An unreadable or empty lock file may belong to a builder that has not
/// written its pid yet, so it is treated as held.
fn lock_is_stale(path: &Path) -> bool {
    let Some(pid) = fs::read_to_string(path)
        .ok()
        .and_then(|contents| contents.trim().parse::<u32>().ok())
    else {
        return false;
    };
    if pid == std::process::id() {
        return false;
    }
    let mut system = System::new();
    !system.refresh_process(Pid::from_u32(pid))
}

fn stamp<T>(fit_id: Uuid, artifact: &T) -> Stamped<&T> {
    Stamped { fit_id, artifact }
}

fn unstamp<T>(fit_id: Uuid, file: &str, stamped: Stamped<T>) -> EngineResult<T> {
    if stamped.fit_id != fit_id {
        return Err(EngineError::CorruptArtifact(format!(
            "{} belongs to fit {} but the manifest names {}",
            file, stamped.fit_id, fit_id
        )));
    }
    Ok(stamped.artifact)
}

fn write_json_atomic<T: Serialize>(dir: &Path, name: &str, value: &T) -> EngineResult<()> {
    let file = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(file.as_file());
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
    }
    file.as_file().sync_all()?;
    file.persist(dir.join(name))
        .map_err(|e| EngineError::Io(e.error))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> EngineResult<T> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            EngineError::CorruptArtifact(format!("missing artifact {}", path.display()))
        }
        _ => EngineError::Io(e),
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        EngineError::CorruptArtifact(format!("unreadable artifact {}: {}", path.display(), e))
    })
}
