//! Residence declaration forms.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApartmentId, FormId, ServiceId};

/// A residence declaration, optionally filed against a service request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    /// Permanent identifier.
    pub id: FormId,
    /// Name of the declared person.
    pub full_name: String,
    /// Apartment the person stays in; scopes the per-apartment listing.
    pub apartment_id: ApartmentId,
    /// National identity card number.
    pub national_id: Option<String>,
    /// Date of birth.
    pub date_of_birth: Option<NaiveDate>,
    /// First day of the stay.
    pub start_date: Option<NaiveDate>,
    /// Last day of the stay.
    pub end_date: Option<NaiveDate>,
    /// Free-text note.
    pub note: Option<String>,
    /// Service request the form belongs to; scopes the per-service listing.
    pub service_id: Option<ServiceId>,
    /// When the form was filed; orders every form listing.
    pub created_at: DateTime<Utc>,
    /// When the form was last written.
    pub updated_at: DateTime<Utc>,
}
