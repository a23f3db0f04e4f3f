//! Device Setup Service client and its operations.
//!
//! ```text
//!   DssClient::begin_request ─▶ operation fields ─▶ finish_request
//!        └──────────────▶ DssClient::execute ─▶ verified body ─▶ parse
//! ```
//!
//! Each operation lives in its own module and adds an `impl` block to
//! [`DssClient`].

pub mod backlog;
pub mod client;
pub mod configuration;
pub mod credentials;
pub mod device_details;
pub mod model;
pub mod report;
pub mod scan_data;
pub mod session;
pub mod transport;

pub use backlog::{Backlog, ListEntry};
pub use client::{DssClient, Operation};
pub use credentials::CredentialsReturned;
pub use model::ReportResult;
pub use report::{ReportRequest, ReportResponse};
pub use scan_data::ScanDataPosted;
pub use session::{SALT_SIZE, Salt, SessionStarted};
pub use transport::{HttpRequest, HttpTransport, ResponseHandler};

use crate::error::Result;
use crate::json::{JsonField, ObjectEncoder, field};
use crate::stream::Stream;

/// `canProceed` from a bound response.  Absent means the cloud did not
/// allow the device to continue.
pub(crate) fn can_proceed_field(fields: &[JsonField<'_>]) -> Result<bool> {
    field(fields, "canProceed").map_or(Ok(false), |value| value.as_bool())
}

/// Close the request object and return the body length.
fn finish_request(obj: ObjectEncoder, out: &mut Stream<'_>) -> Result<usize> {
    obj.end(out)?;
    Ok(out.data_len())
}
