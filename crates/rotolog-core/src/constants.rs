//! Constants and default values for rotolog

/// Default label embedded in log file names
pub const DEFAULT_LABEL: &str = "log";

/// Default flush interval in seconds for buffered writers
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;

/// Log file suffix
pub const LOG_SUFFIX: &str = ".log";

/// Suffix appended to compressed backups
pub const COMPRESSED_SUFFIX: &str = ".gz";

/// Date stamp format used in active file names (e.g. "2026-08-23-info.log")
pub const DATE_STAMP_FORMAT: &str = "%Y-%m-%d";

/// Timestamp format used in backup file names, name-sortable by creation order
pub const BACKUP_STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3f";

/// Active log file name for a given date stamp and label
pub fn active_file_name(date_stamp: &str, label: &str) -> String {
    format!("{}-{}{}", date_stamp, label, LOG_SUFFIX)
}

/// Backup file name for a roll at `backup_stamp`, with a sequence number
/// appended when the stamp alone would collide
pub fn backup_file_name(date_stamp: &str, label: &str, backup_stamp: &str, seq: u32) -> String {
    if seq == 0 {
        format!("{}-{}-{}{}", date_stamp, label, backup_stamp, LOG_SUFFIX)
    } else {
        format!(
            "{}-{}-{}.{}{}",
            date_stamp, label, backup_stamp, seq, LOG_SUFFIX
        )
    }
}
