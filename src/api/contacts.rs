use super::send_write;
use crate::transport::{Replay, request::Request};
use crate::{ContactId, ContactList, ContactLookup, ContactQuery, ContactWrite, Error};
use http::StatusCode;
use serde::Serialize;

/// Mautic contacts APIs.
#[derive(Clone)]
pub struct ContactsService {
    client: crate::BlockingClient,
}

impl ContactsService {
    pub(crate) fn new(client: crate::BlockingClient) -> Self {
        Self { client }
    }

    /// `GET /api/contacts`
    pub fn list(&self, query: impl Into<ContactQuery>) -> Result<ContactList, Error> {
        self.client
            .send_json(list_request(&query.into()), "contacts.list")
    }

    /// Id of the first contact matching `query`.
    ///
    /// A status other than 200 is reported as [`ContactLookup::RequestFailed`]
    /// rather than as an error.
    pub fn find_id(&self, query: impl Into<ContactQuery>) -> Result<ContactLookup, Error> {
        let req = list_request(&query.into());
        let resp = self.client.send_unchecked(&req, "contacts.find_id")?;
        if resp.status != StatusCode::OK {
            return Ok(ContactLookup::RequestFailed(resp.status));
        }
        let list: ContactList = self.client.decode(&req, &resp)?;
        Ok(list.lookup())
    }

    /// `POST /api/contacts/new`
    pub fn create<T: Serialize + ?Sized>(&self, fields: &T) -> Result<ContactWrite, Error> {
        let req = Request::post(["contacts", "new"]).json(fields)?;
        let (status, body) =
            send_write(&self.client, req, "contacts.create", "Contact not created")?;
        Ok(ContactWrite { status, body })
    }

    /// `PATCH /api/contacts/<id>/edit`
    pub fn update<T: Serialize + ?Sized>(
        &self,
        id: impl Into<ContactId>,
        fields: &T,
    ) -> Result<ContactWrite, Error> {
        let id = id.into();
        let req = Request::patch(["contacts", id.as_str(), "edit"]).json(fields)?;
        let (status, body) =
            send_write(&self.client, req, "contacts.update", "Error updating contact")?;
        Ok(ContactWrite { status, body })
    }
}

fn list_request(query: &ContactQuery) -> Request {
    Request::get(["contacts"])
        .query_pairs(query.to_pairs())
        .replay(Replay::Read)
}
