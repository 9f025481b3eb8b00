//! CSV-backed request store.
//!
//! One row per request, in the column order of [`row::HEADER`], optionally
//! followed by a `Score` column. Row identity is the 1-based position among
//! the data rows (header excluded, blank lines ignored); rewrites keep the row
//! order so identities stay stable. Rewrites go through a `<name>.tmp`
//! sibling that is renamed over the store.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use nightplan_astro::{
    AstroError, format_utc_seconds, julian_date_to_utc_ceil, julian_date_to_utc_floor,
};
use nightplan_scheduler::{NightPlan, ObservationRequest, RequestId};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod row;
pub mod submit;

pub use row::{FIELD_COUNT, HEADER, RowError, SCORE_HEADER, parse_row};
pub use submit::{Submission, SubmissionError};

/// Errors raised by store I/O.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read request store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write request store {path}: {source}")]
    StorePersistFailure {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("cannot write the window of request {id}: {source}")]
    Timestamp {
        id: RequestId,
        #[source]
        source: AstroError,
    },
    #[error("no request {0} in the store")]
    UnknownRequest(RequestId),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Pending requests plus the rows that were skipped.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub pending: Vec<ObservationRequest>,
    pub skipped: Vec<RowError>,
}

/// Row counts of the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatus {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub malformed: usize,
}

struct Table {
    header: Option<StringRecord>,
    rows: Vec<StringRecord>,
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

/// Handle on the request file.
#[derive(Debug, Clone)]
pub struct RequestStore {
    path: PathBuf,
}

impl RequestStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_error(&self, source: csv::Error) -> StoreError {
        StoreError::Read {
            path: self.path.clone(),
            source,
        }
    }

    fn persist_error(&self, source: csv::Error) -> StoreError {
        StoreError::StorePersistFailure {
            path: self.path.clone(),
            source,
        }
    }

    fn read_table(&self) -> Result<Table, StoreError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.read_error(e))?;
        let mut header = None;
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| self.read_error(e))?;
            if is_blank(&record) {
                continue;
            }
            if header.is_none() {
                header = Some(record);
            } else {
                rows.push(record);
            }
        }
        Ok(Table { header, rows })
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_table(&self, header: &StringRecord, rows: &[StringRecord]) -> Result<(), StoreError> {
        let staging = self.staging_path();
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .from_path(&staging)
            .map_err(|e| self.persist_error(e))?;
        writer
            .write_record(header)
            .map_err(|e| self.persist_error(e))?;
        for row in rows {
            writer.write_record(row).map_err(|e| self.persist_error(e))?;
        }
        writer
            .flush()
            .map_err(|e| self.persist_error(csv::Error::from(e)))?;
        drop(writer);
        fs::rename(&staging, &self.path).map_err(|e| self.persist_error(csv::Error::from(e)))
    }

    fn decoded(&self) -> Result<Vec<Result<ObservationRequest, RowError>>, StoreError> {
        let table = self.read_table()?;
        Ok(table
            .rows
            .iter()
            .enumerate()
            .map(|(index, record)| parse_row(RequestId(index + 1), record))
            .collect())
    }

    /// Pending requests in store order. Bad rows are logged and skipped.
    pub fn load_pending(&self) -> Result<LoadReport, StoreError> {
        let mut report = LoadReport::default();
        for decoded in self.decoded()? {
            match decoded {
                Ok(request) if request.completed => {
                    debug!(id = %request.id, "already completed");
                }
                Ok(request) => report.pending.push(request),
                Err(error) => {
                    warn!(row = %error.row(), "skipping row: {error}");
                    report.skipped.push(error);
                }
            }
        }
        info!(
            path = %self.path.display(),
            pending = report.pending.len(),
            skipped = report.skipped.len(),
            "loaded requests"
        );
        Ok(report)
    }

    /// Write the allocated windows and scores of `plan` back in place.
    ///
    /// Rows not in the plan keep their fields and get an empty score; rows
    /// with an unexpected shape are written back unchanged. Windows are
    /// written to the second, start rounded up and end rounded down.
    pub fn persist(&self, plan: &NightPlan) -> Result<(), StoreError> {
        let scheduled: HashMap<RequestId, &ObservationRequest> = plan
            .entries
            .iter()
            .map(|entry| (entry.request.id, &entry.request))
            .collect();
        let table = self.read_table()?;

        let header = match table.header {
            Some(header) if header.len() == FIELD_COUNT => {
                let mut header = header;
                header.push_field(SCORE_HEADER);
                header
            }
            Some(header) => header,
            None => {
                let mut header = StringRecord::from(HEADER.to_vec());
                header.push_field(SCORE_HEADER);
                header
            }
        };

        let rows = table
            .rows
            .iter()
            .enumerate()
            .map(|(index, record)| -> Result<StringRecord, StoreError> {
                if record.len() != FIELD_COUNT && record.len() != FIELD_COUNT + 1 {
                    return Ok(record.clone());
                }
                let request = scheduled.get(&RequestId(index + 1));
                let mut fields: Vec<String> =
                    record.iter().take(FIELD_COUNT).map(str::to_string).collect();
                let score = match request {
                    Some(request) => {
                        let window = request.window();
                        let timestamp = |source: AstroError| StoreError::Timestamp {
                            id: request.id,
                            source,
                        };
                        let start =
                            julian_date_to_utc_ceil(window.start_jd()).map_err(timestamp)?;
                        let end =
                            julian_date_to_utc_floor(window.end_jd()).map_err(timestamp)?;
                        fields[row::START] = format_utc_seconds(&start);
                        fields[row::END] = format_utc_seconds(&end);
                        request.score.map(|s| format!("{s:.4}")).unwrap_or_default()
                    }
                    None => String::new(),
                };
                fields.push(score);
                debug_assert_eq!(fields.len(), row::SCORE + 1);
                Ok(StringRecord::from(fields))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        self.write_table(&header, &rows)?;
        info!(path = %self.path.display(), scheduled = scheduled.len(), "store updated");
        Ok(())
    }

    /// Set the completion flag of one row.
    pub fn mark_completed(&self, id: RequestId) -> Result<(), StoreError> {
        let table = self.read_table()?;
        let Some(header) = table.header else {
            return Err(StoreError::UnknownRequest(id));
        };
        let mut rows = table.rows;
        let index = id.0.checked_sub(1).ok_or(StoreError::UnknownRequest(id))?;
        let record = rows.get(index).ok_or(StoreError::UnknownRequest(id))?;
        if record.len() < FIELD_COUNT {
            return Err(StoreError::UnknownRequest(id));
        }
        let fields: Vec<&str> = record
            .iter()
            .enumerate()
            .map(|(column, field)| if column == row::COMPLETION { "1" } else { field })
            .collect();
        let updated = StringRecord::from(fields);
        rows[index] = updated;
        self.write_table(&header, &rows)?;
        info!(%id, "marked completed");
        Ok(())
    }

    /// Validate and append a new pending request, returning its identity.
    pub fn submit(&self, submission: &Submission) -> Result<RequestId, StoreError> {
        submission.validate()?;

        let existing = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(self.read_error(csv::Error::from(error))),
        };
        let has_content = existing.iter().any(|byte| !byte.is_ascii_whitespace());
        let rows = if has_content {
            self.read_table()?.rows.len()
        } else {
            0
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.persist_error(csv::Error::from(e)))?;
        if has_content && existing.last() != Some(&b'\n') {
            file.write_all(b"\n")
                .map_err(|e| self.persist_error(csv::Error::from(e)))?;
        }

        let mut writer = WriterBuilder::new().flexible(true).from_writer(file);
        if !has_content {
            writer
                .write_record(HEADER)
                .map_err(|e| self.persist_error(e))?;
        }
        writer
            .write_record(&submission.to_record())
            .map_err(|e| self.persist_error(e))?;
        writer
            .flush()
            .map_err(|e| self.persist_error(csv::Error::from(e)))?;

        let id = RequestId(rows + 1);
        info!(%id, name = %submission.directory_name.trim(), "request submitted");
        Ok(id)
    }

    /// Count total, pending, completed and malformed rows.
    pub fn status(&self) -> Result<StoreStatus, StoreError> {
        let mut status = StoreStatus::default();
        for decoded in self.decoded()? {
            status.total += 1;
            match decoded {
                Ok(request) if request.completed => status.completed += 1,
                Ok(_) => status.pending += 1,
                Err(_) => status.malformed += 1,
            }
        }
        Ok(status)
    }
}
