//! Batch file naming.
//!
//! Batch files are named by the UTC wall-clock time of their first
//! buffered sample with millisecond precision:
//!
//! ```text
//! <dir>/[YYYY/MM/DD/]YYYY-MM-DDTHH:MM:SS.mmmZ_<file_tag>.<ext>
//! ```
//!
//! where the date-directory prefix is present iff grouping by date is
//! enabled, and `<ext>` is either the sample-type code (data file) or
//! [`HEADER_EXTENSION`] (detached header).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Extension used by detached header files.
pub const HEADER_EXTENSION: &str = "hdr";

/// Format the path of one batch file.
///
/// Pure function of its inputs. The millisecond component is the
/// remainder of `timestamp` past the whole second, zero-padded to three
/// digits.
pub fn batch_file_path(
    dir: &Path,
    file_tag: &str,
    ext: &str,
    group_by_date: bool,
    timestamp: DateTime<Utc>,
) -> PathBuf {
    // chrono can report 1000+ during a leap second; the filename format
    // has exactly three digits.
    let millis = timestamp.timestamp_subsec_millis().min(999);
    let name = format!(
        "{}.{:03}Z_{}.{}",
        timestamp.format("%Y-%m-%dT%H:%M:%S"),
        millis,
        file_tag,
        ext
    );
    if group_by_date {
        dir.join(timestamp.format("%Y/%m/%d").to_string()).join(name)
    } else {
        dir.join(name)
    }
}
