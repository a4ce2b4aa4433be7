//! Endpoints called by partner integrations.

use axum::{Extension, Json};

use crate::models::partner_credential::{PartnerCredential, PartnerCredentialResponse};

/// `GET /api/v1/partner/me`
///
/// # Authentication
///
/// `X-Client-Id` and `X-Client-Secret` headers.
///
/// Returns the public view of the authenticated credential. The secret is not echoed.
pub async fn current_partner(
    Extension(credential): Extension<PartnerCredential>,
) -> Json<PartnerCredentialResponse> {
    Json(credential.into())
}
