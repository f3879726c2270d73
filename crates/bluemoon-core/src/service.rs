//! Service requests raised by apartments.
//!
//! A service request carries a small closed classification: its type decides which party
//! handles it, and residents grade the outcome with a rating and a problem category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApartmentId, ServiceId};

/// What kind of request this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Building services (repairs, cleaning, utilities).
    ApartmentService,
    /// A complaint about another resident or the building.
    Complaint,
    /// Declaration of a temporary resident.
    TemporaryResidence,
}

impl ServiceType {
    /// The party every request of this type is routed to.
    #[must_use]
    pub const fn handler(self) -> HandlingParty {
        match self {
            Self::ApartmentService | Self::TemporaryResidence => HandlingParty::ManagementBoard,
            Self::Complaint => HandlingParty::Police,
        }
    }
}

/// Who handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlingParty {
    /// The building's management board.
    ManagementBoard,
    /// The ward police.
    Police,
}

/// Progress of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Received, not yet handled.
    #[default]
    Recorded,
    /// Handled.
    Handled,
}

/// Problem category reported with the outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Problem {
    /// Slow to respond.
    SlowResponse,
    /// Unprofessional handling.
    Unprofessional,
    /// Too expensive.
    Expensive,
    /// Nothing to report.
    #[default]
    NoIssue,
}

/// Quality rating of the outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    /// High quality.
    HighQuality,
    /// Good quality.
    GoodQuality,
    /// Acceptable quality.
    #[default]
    AcceptableQuality,
    /// Poor quality.
    PoorQuality,
}

/// A service request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Permanent identifier.
    pub id: ServiceId,
    /// Requesting apartment; scopes the per-apartment listing.
    pub apartment_id: ApartmentId,
    /// Request type.
    pub service_type: ServiceType,
    /// Party assigned from the type.
    pub handler: HandlingParty,
    /// Request details.
    pub content: String,
    /// Progress.
    pub status: ServiceStatus,
    /// Creation time, restamped when the request becomes handled.
    pub handle_date: DateTime<Utc>,
    /// Staff note.
    pub note: Option<String>,
    /// Problem category.
    pub problem: Problem,
    /// Quality rating.
    pub rating: Rating,
    /// Handling script or transcript.
    pub scripts: Option<String>,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request was last written.
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    /// Reclassify the request, reassigning its handler.
    pub fn reclassify(&mut self, service_type: ServiceType) {
        self.service_type = service_type;
        self.handler = service_type.handler();
    }

    /// Move the request to `status`; becoming handled restamps the handle date.
    pub fn set_status(&mut self, status: ServiceStatus, now: DateTime<Utc>) {
        self.status = status;
        if status == ServiceStatus::Handled {
            self.handle_date = now;
        }
    }
}
