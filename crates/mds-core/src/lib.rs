pub mod field_path;
pub mod record;
pub mod redact;
pub mod stable_hash;
pub mod stable_json;

pub use field_path::{FieldPath, FieldPathParseError, FieldPathSegment};
pub use record::{
    document_id, records_from_payload, render_document_id, render_value, secondary_id,
    CatalogRecords, PayloadShape, DOCUMENT_ID_FIELD, MISSING_DOCUMENT_MARKER, SENTINEL,
};
pub use redact::redact_uri;
pub use stable_hash::{fingerprint_records, stable_hash_hex};
pub use stable_json::{stable_json_bytes, stable_json_text};
