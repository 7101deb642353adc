//! Rotating file sink with size, age, and backup-count retention

use chrono::{Local, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use rotolog_core::constants::{
    active_file_name, backup_file_name, BACKUP_STAMP_FORMAT, COMPRESSED_SUFFIX, DATE_STAMP_FORMAT,
    LOG_SUFFIX,
};
use rotolog_core::{Error, Result};

/// Rotation and retention thresholds, fixed at construction
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    /// Maximum active file size in bytes, 0 means no limit
    pub max_size_bytes: u64,
    /// Backup retention time in days, 0 means no limit
    pub max_age_days: u64,
    /// Maximum number of backups to keep, 0 means no limit
    pub max_backups: usize,
    /// Gzip rotated backups
    pub compress: bool,
    /// Use local time for file naming, UTC when false
    pub local_time: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: 0,
            max_age_days: 0,
            max_backups: 0,
            compress: false,
            local_time: true,
        }
    }
}

/// File sink that appends to a date-stamped active file and rolls it over
/// when the size limit is exceeded
///
/// The active file is `{date}-{label}.log`; a new calendar day opens a new
/// active file even without a size trigger. Rolled files are renamed to a
/// timestamped backup name, optionally gzip'd, and pruned on a background
/// thread after each roll. Rotation and maintenance failures never fail the
/// write that triggered them.
pub struct RollingFile {
    dir: PathBuf,
    label: String,
    policy: RotationPolicy,
    file: Option<File>,
    date_stamp: String,
    size: u64,
    maintenance: Option<JoinHandle<()>>,
}

impl RollingFile {
    /// Create a sink writing under `dir`, creating the directory if absent
    ///
    /// The active file itself is only opened on the first write.
    pub fn new(dir: PathBuf, label: &str, policy: RotationPolicy) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(|source| Error::DirUnusable {
            path: dir.clone(),
            source,
        })?;

        Ok(Self {
            dir,
            label: label.to_string(),
            policy,
            file: None,
            date_stamp: String::new(),
            size: 0,
            maintenance: None,
        })
    }

    /// Path of the active file, if one has been opened
    pub fn current_path(&self) -> Option<PathBuf> {
        self.file
            .as_ref()
            .map(|_| self.active_path(&self.date_stamp))
    }

    /// Bytes written to the active file since the last roll
    pub fn current_size(&self) -> u64 {
        self.size
    }

    /// Block until in-flight background compression and retention finish
    pub fn await_maintenance(&mut self) {
        if let Some(handle) = self.maintenance.take() {
            let _ = handle.join();
        }
    }

    fn active_path(&self, stamp: &str) -> PathBuf {
        self.dir.join(active_file_name(stamp, &self.label))
    }

    fn now_date_stamp(&self) -> String {
        if self.policy.local_time {
            Local::now().format(DATE_STAMP_FORMAT).to_string()
        } else {
            Utc::now().format(DATE_STAMP_FORMAT).to_string()
        }
    }

    fn now_backup_stamp(&self) -> String {
        if self.policy.local_time {
            Local::now().format(BACKUP_STAMP_FORMAT).to_string()
        } else {
            Utc::now().format(BACKUP_STAMP_FORMAT).to_string()
        }
    }

    /// Open (or reopen) the active file for the given date stamp, appending
    /// to whatever is already there
    fn open_current(&mut self, stamp: &str) -> io::Result<()> {
        let path = self.active_path(stamp);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.size = file.metadata()?.len();
        self.file = Some(file);
        self.date_stamp = stamp.to_string();
        Ok(())
    }

    fn should_roll(&self, pending: usize) -> bool {
        self.policy.max_size_bytes > 0
            && self.size > 0
            && self.size + pending as u64 > self.policy.max_size_bytes
    }

    /// Close the active file, rename it to a backup name, and open a fresh
    /// one; compression and retention run on a background thread
    fn roll(&mut self, stamp: &str) -> io::Result<()> {
        self.file.take();

        let current = self.active_path(stamp);
        let backup = self.backup_path(stamp);
        fs::rename(&current, &backup)?;
        debug!("rotated {} -> {}", current.display(), backup.display());

        self.spawn_maintenance(Some(backup));

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&current)?;
        self.file = Some(file);
        self.size = 0;
        Ok(())
    }

    /// First free backup path for a roll happening now
    fn backup_path(&self, stamp: &str) -> PathBuf {
        let backup_stamp = self.now_backup_stamp();
        let mut seq = 0;
        loop {
            let name = backup_file_name(stamp, &self.label, &backup_stamp, seq);
            let path = self.dir.join(&name);
            let compressed = self.dir.join(format!("{}{}", name, COMPRESSED_SUFFIX));
            if !path.exists() && !compressed.exists() {
                return path;
            }
            seq += 1;
        }
    }

    fn spawn_maintenance(&mut self, compress_target: Option<PathBuf>) {
        // one maintenance thread at a time
        self.await_maintenance();

        let dir = self.dir.clone();
        let label = self.label.clone();
        let policy = self.policy.clone();
        let keep = active_file_name(&self.date_stamp, &self.label);
        let target = compress_target.filter(|_| policy.compress);

        let handle = thread::Builder::new()
            .name("rotolog-maintenance".to_string())
            .spawn(move || {
                if let Some(path) = target {
                    if let Err(e) = compress_file(&path) {
                        warn!("backup compression failed for {}: {}", path.display(), e);
                    }
                }
                prune_backups(&dir, &label, &keep, &policy);
            });

        match handle {
            Ok(h) => self.maintenance = Some(h),
            Err(e) => warn!("failed to spawn maintenance thread: {}", e),
        }
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let stamp = self.now_date_stamp();
        if self.file.is_none() || stamp != self.date_stamp {
            let day_changed = self.file.take().is_some();
            self.open_current(&stamp)?;
            if day_changed {
                // the previous day's file keeps its dated name and ages out
                // through the same retention pass as renamed backups
                self.spawn_maintenance(None);
            }
        }

        if self.should_roll(buf.len()) {
            if let Err(e) = self.roll(&stamp) {
                warn!("log rotation failed, continuing on current file: {}", e);
            }
            if self.file.is_none() {
                self.open_current(&stamp)?;
            }
        }

        let file = match self.file.as_mut() {
            Some(f) => f,
            None => return Err(io::Error::new(io::ErrorKind::Other, "log file not open")),
        };
        file.write_all(buf)?;
        self.size += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for RollingFile {
    fn drop(&mut self) {
        self.await_maintenance();
    }
}

/// Gzip `path` in place, removing the original on success
fn compress_file(path: &Path) -> io::Result<()> {
    let mut src = File::open(path)?;

    let mut name = path.as_os_str().to_owned();
    name.push(COMPRESSED_SUFFIX);
    let gz_path = PathBuf::from(name);

    let dst = File::create(&gz_path)?;
    let mut encoder = GzEncoder::new(dst, Compression::default());
    io::copy(&mut src, &mut encoder)?;
    encoder.finish()?;
    fs::remove_file(path)?;
    Ok(())
}

/// Delete backups beyond the count limit or older than the age limit
///
/// Best-effort: per-file failures are logged and skipped.
fn prune_backups(dir: &Path, label: &str, keep: &str, policy: &RotationPolicy) {
    if policy.max_backups == 0 && policy.max_age_days == 0 {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("backup retention failed in {}: {}", dir.display(), e);
            return;
        }
    };

    let mut backups = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == keep || !is_backup_name(&name, label) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        backups.push((entry.path(), modified));
    }

    // newest first; backup names are timestamped so the name breaks ties
    backups.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));

    let cutoff = (policy.max_age_days > 0)
        .then(|| SystemTime::now() - Duration::from_secs(policy.max_age_days * 86_400));

    for (idx, (path, modified)) in backups.iter().enumerate() {
        let over_count = policy.max_backups > 0 && idx >= policy.max_backups;
        let over_age = cutoff.is_some_and(|c| *modified < c);
        if over_count || over_age {
            if let Err(e) = fs::remove_file(path) {
                warn!("failed to delete old backup {}: {}", path.display(), e);
            }
        }
    }
}

/// Whether `name` is a rotated backup (or a previous day's active file) for
/// the given label
fn is_backup_name(name: &str, label: &str) -> bool {
    let base = name.strip_suffix(COMPRESSED_SUFFIX).unwrap_or(name);
    let stem = match base.strip_suffix(LOG_SUFFIX) {
        Some(stem) => stem,
        None => return false,
    };
    let tag = format!("-{}", label);
    stem.ends_with(&tag) || stem.contains(&format!("{}-", tag))
}
