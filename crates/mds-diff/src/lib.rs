pub mod compare;
pub mod document_diff;
pub mod record;
pub mod report_csv;

pub use compare::{
    compare_collections, diff, CompareRequest, DiffError, DiffEvent, DiffReport, DiffSummary,
    DEFAULT_APPL_ID_PATH,
};
pub use document_diff::{diff_documents, ChangeDetail, ChangeKind, DiffResult};
pub use record::{flatten_diff, missing_document_record, ChangeRecord, ChangeRecordKind};
pub use report_csv::{write_change_report, ReportWriteError, CSV_HEADER, DEFAULT_REPORT_PATH};
