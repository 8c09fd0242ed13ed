use super::lenient_body;
use crate::transport::request::Request;
use crate::{CampaignEnrollment, CampaignId, ContactId, Error};
use serde_json::json;

/// Mautic campaigns APIs.
#[derive(Clone)]
pub struct CampaignsService {
    client: crate::BlockingClient,
}

impl CampaignsService {
    pub(crate) fn new(client: crate::BlockingClient) -> Self {
        Self { client }
    }

    /// `POST /api/campaigns/<id>/contact/add/<contact>`
    ///
    /// Any status is returned as-is; check [`CampaignEnrollment::is_success`].
    pub fn add_contact(
        &self,
        campaign: impl Into<CampaignId>,
        contact: impl Into<ContactId>,
    ) -> Result<CampaignEnrollment, Error> {
        let (campaign, contact) = (campaign.into(), contact.into());
        let req = Request::post([
            "campaigns",
            campaign.as_str(),
            "contact",
            "add",
            contact.as_str(),
        ])
        .json(&json!({}))?;
        let resp = self.client.send_unchecked(&req, "campaigns.add_contact")?;
        Ok(CampaignEnrollment {
            status: resp.status,
            body: lenient_body(&resp),
        })
    }
}
