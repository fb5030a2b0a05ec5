use crate::error::{AggregatorError, Result};
use crate::record::{RawRecord, COLUMN_COUNT};
use crate::stats::SourceCounts;
use csv::{ErrorKind, ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Skipped rows beyond this many are only logged at debug level.
const SKIP_WARN_LIMIT: u64 = 5;

/// Failed reads in a row, with no bytes in between, before the ledger handle is treated as dead.
pub const MAX_CONSECUTIVE_IO_ERRORS: u32 = 8;

/// Retries failed reads on the underlying handle.
///
/// `csv::Reader` stops for good after the first I/O error it sees, so transient errors are
/// absorbed here and only a run of [`MAX_CONSECUTIVE_IO_ERRORS`] reaches the CSV layer.
struct RetryingRead<R> {
    inner: R,
    errors: u64,
}

impl<R> RetryingRead<R> {
    fn take_errors(&mut self) -> u64 {
        std::mem::take(&mut self.errors)
    }
}

impl<R: Read> Read for RetryingRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut consecutive = 0;
        loop {
            match self.inner.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    self.errors += 1;
                    consecutive += 1;
                    if consecutive >= MAX_CONSECUTIVE_IO_ERRORS {
                        return Err(err);
                    }
                    log::warn!(
                        "Ledger read error ({consecutive}/{MAX_CONSECUTIVE_IO_ERRORS}), retrying: {err}"
                    );
                }
            }
        }
    }
}

/// Lazy, finite, single-pass stream of ledger rows.
///
/// The header is consumed on construction. Rows with the wrong number of fields or a row-level
/// decode error are skipped. Transient read errors are retried; a handle that keeps failing
/// ends the stream.
pub struct RecordSource<R = File> {
    reader: csv::Reader<RetryingRead<R>>,
    counts: SourceCounts,
    done: bool,
}

impl RecordSource<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| AggregatorError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Opened ledger {}", path.display());
        Self::from_reader(file)
    }
}

impl<R: Read> RecordSource<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(RetryingRead {
                inner: reader,
                errors: 0,
            });

        let header = reader
            .headers()
            .map_err(|e| AggregatorError::HeaderMissing(e.to_string()))?;
        if header.is_empty() {
            return Err(AggregatorError::HeaderMissing(
                "ledger is empty".to_string(),
            ));
        }
        if header.len() != COLUMN_COUNT {
            log::warn!(
                "Ledger header has {} columns, expected {COLUMN_COUNT}; rows are read positionally",
                header.len()
            );
        }

        let read_errors = reader.get_mut().take_errors();
        Ok(Self {
            reader,
            counts: SourceCounts {
                read_errors,
                ..SourceCounts::default()
            },
            done: false,
        })
    }

    pub fn counts(&self) -> SourceCounts {
        self.counts
    }

    fn skip(&mut self, line: Option<u64>, reason: &str) {
        self.counts.rows_skipped += 1;
        let line = line.map_or_else(|| "?".to_string(), |l| l.to_string());
        if self.counts.rows_skipped <= SKIP_WARN_LIMIT {
            log::warn!("Skipping ledger line {line}: {reason}");
        } else {
            log::debug!("Skipping ledger line {line}: {reason}");
        }
    }
}

impl<R: Read> Iterator for RecordSource<R> {
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        if self.done {
            return None;
        }

        loop {
            let mut fields = StringRecord::new();
            let result = self.reader.read_record(&mut fields);
            self.counts.read_errors += self.reader.get_mut().take_errors();
            match result {
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Ok(true) => {
                    let line = fields.position().map(|p| p.line());
                    let arity = fields.len();
                    match RawRecord::new(fields) {
                        Some(record) => {
                            self.counts.rows_read += 1;
                            return Some(record);
                        }
                        None => self.skip(
                            line,
                            &format!("expected {COLUMN_COUNT} fields, found {arity}"),
                        ),
                    }
                }
                Err(err) => {
                    if matches!(err.kind(), ErrorKind::Io(_)) {
                        log::warn!(
                            "Ledger read failed {MAX_CONSECUTIVE_IO_ERRORS} times in a row, ending stream early: {err}"
                        );
                        self.counts.read_failed = true;
                        self.done = true;
                        return None;
                    }
                    let line = err.position().map(|p| p.line());
                    self.skip(line, &err.to_string());
                }
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for RecordSource<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{self, Cursor};

    const HEADER: &str = "transaction_id,transaction_date,user_id,country,region,product_id,product_name,category,price,quantity,total_price,stock_quantity,added_date\n";

    fn ledger(rows: &[&str]) -> Cursor<Vec<u8>> {
        let mut body = HEADER.to_string();
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        Cursor::new(body.into_bytes())
    }

    #[test]
    fn open_missing_file_is_source_unavailable() {
        let temp = tempfile::tempdir().unwrap();
        let err = RecordSource::open(temp.path().join("absent.csv"))
            .err()
            .expect("missing file must fail");
        assert!(matches!(err, AggregatorError::SourceUnavailable { .. }));
    }

    #[test]
    fn empty_input_is_header_missing() {
        let err = RecordSource::from_reader(Cursor::new(Vec::<u8>::new()))
            .err()
            .expect("empty ledger must fail");
        assert!(matches!(err, AggregatorError::HeaderMissing(_)));
    }

    #[test]
    fn header_is_not_yielded_as_a_row() {
        let source = RecordSource::from_reader(ledger(&[
            "T1,2024-01-01,U1,Chile,South,P1,Product_1,Toys,1.5,2,3.0,10,2023-12-01",
        ]))
        .unwrap();

        let rows: Vec<RawRecord> = source.collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field(crate::record::Column::TransactionId), "T1");
        assert_eq!(rows[0].product_name(), "Product_1");
    }

    #[test]
    fn wrong_arity_rows_are_skipped_and_counted() {
        let mut source = RecordSource::from_reader(ledger(&[
            "T1,2024-01-01,U1,Chile,South,P1,Product_1,Toys,1.5,2,3.0,10,2023-12-01",
            "T2,2024-01-01,U1,Chile",
            "T3,2024-01-02,U2,Peru,West,P2,Product_2,Books,4,1,4,3,2023-12-01,extra",
            "T4,2024-01-03,U3,Peru,West,P2,Product_2,Books,4,1,4,3,2023-12-01",
        ]))
        .unwrap();

        let ids: Vec<String> = source
            .by_ref()
            .map(|r| r.field(crate::record::Column::TransactionId).to_string())
            .collect();
        assert_eq!(ids, vec!["T1".to_string(), "T4".to_string()]);
        assert_eq!(
            source.counts(),
            SourceCounts {
                rows_read: 2,
                rows_skipped: 2,
                read_errors: 0,
                read_failed: false,
            }
        );
        assert!(source.next().is_none());
    }

    #[test]
    fn invalid_utf8_row_is_skipped() {
        let mut body = HEADER.as_bytes().to_vec();
        body.extend_from_slice(b"T1,2024-01-01,U1,Chile,South,P1,\xff\xfe,Toys,1,1,1,1,2023-12-01\n");
        body.extend_from_slice(b"T2,2024-01-01,U1,Chile,South,P1,Product_1,Toys,1,1,1,1,2023-12-01\n");

        let mut source = RecordSource::from_reader(Cursor::new(body)).unwrap();
        let rows: Vec<RawRecord> = source.by_ref().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(source.counts().rows_skipped, 1);
    }

    /// Serves `inner`, failing `failures` times once `fail_at` bytes have been served.
    struct FlakyReader {
        inner: Cursor<Vec<u8>>,
        fail_at: usize,
        failures: u32,
        served: usize,
    }

    impl FlakyReader {
        fn new(body: Vec<u8>, fail_at: usize, failures: u32) -> Self {
            Self {
                inner: Cursor::new(body),
                fail_at,
                failures,
                served: 0,
            }
        }
    }

    impl Read for FlakyReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served >= self.fail_at && self.failures > 0 {
                self.failures -= 1;
                return Err(io::Error::new(io::ErrorKind::Other, "disk hiccup"));
            }
            let budget = if self.served < self.fail_at {
                (self.fail_at - self.served).min(buf.len())
            } else {
                buf.len()
            };
            let n = self.inner.read(&mut buf[..budget])?;
            self.served += n;
            Ok(n)
        }
    }

    fn ten_rows() -> (Vec<u8>, usize) {
        let rows: Vec<String> = (1..=10)
            .map(|i| format!("T{i},2024-01-01,U1,Chile,South,P1,Product_1,Toys,1,1,1,1,2023-12-01"))
            .collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let first_three: usize = rows[..3].iter().map(|r| r.len() + 1).sum();
        (ledger(&refs).into_inner(), HEADER.len() + first_three + 5)
    }

    #[test]
    fn transient_io_error_does_not_drop_later_rows() {
        let (body, fail_at) = ten_rows();
        let mut source = RecordSource::from_reader(FlakyReader::new(body, fail_at, 1)).unwrap();

        let rows: Vec<RawRecord> = source.by_ref().collect();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[9].field(crate::record::Column::TransactionId), "T10");
        assert_eq!(
            source.counts(),
            SourceCounts {
                rows_read: 10,
                rows_skipped: 0,
                read_errors: 1,
                read_failed: false,
            }
        );
    }

    #[test]
    fn retries_up_to_the_consecutive_limit() {
        let (body, fail_at) = ten_rows();
        let failures = MAX_CONSECUTIVE_IO_ERRORS - 1;
        let mut source =
            RecordSource::from_reader(FlakyReader::new(body, fail_at, failures)).unwrap();

        assert_eq!(source.by_ref().count(), 10);
        assert_eq!(source.counts().read_errors, u64::from(failures));
        assert!(!source.counts().read_failed);
    }

    #[test]
    fn persistent_io_error_ends_the_sequence() {
        let (body, fail_at) = ten_rows();
        let mut source =
            RecordSource::from_reader(FlakyReader::new(body, fail_at, u32::MAX)).unwrap();

        let rows: Vec<RawRecord> = source.by_ref().collect();
        assert_eq!(rows.len(), 3);
        assert!(source.counts().read_failed);
        assert_eq!(
            source.counts().read_errors,
            u64::from(MAX_CONSECUTIVE_IO_ERRORS)
        );
        assert!(source.next().is_none());
    }
}
