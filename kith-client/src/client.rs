//! REST client.

use std::time::Duration;

use kith_core::{
    Circle, CircleId, CircleInput, CirclePatch, Collective, CollectiveDetail, CollectiveId,
    CollectiveInput, CollectivePatch, Contact, ContactId, ContactInput, ContactPatch,
    ContactSummary, Encounter, EncounterId, EncounterInput, EncounterPatch, EntityIdType, Friend,
    FriendId, FriendInput, FriendPatch, Membership, MembershipId, MembershipInput, MembershipPatch,
    Page, Place, PreferencesPatch, User,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ClientError, ClientResult};
use crate::params::{CollectiveParams, ContactParams, EncounterParams, FriendParams};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct KithClientConfig {
    /// Server origin, e.g. `https://kith.example.com`. A trailing slash is ignored.
    pub base_url: String,
    /// Session JWT sent as `Authorization: Bearer <token>`.
    pub token: Option<String>,
    pub timeout: Duration,
}

impl KithClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Typed client for every `/api` route plus the public health probes.
#[derive(Clone)]
pub struct KithClient {
    client: reqwest::Client,
    base_url: String,
}

impl KithClient {
    pub fn new(config: KithClientConfig) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ClientError::Config(format!("invalid token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    // ------------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------------

    pub async fn ping(&self) -> ClientResult<()> {
        let response = self.request(Method::GET, "/health/ping").send().await?;
        expect_success(response).await.map(|_| ())
    }

    /// `false` while the server reports its database unreachable.
    pub async fn is_ready(&self) -> ClientResult<bool> {
        let response = self.request(Method::GET, "/health/ready").send().await?;
        match response.status() {
            StatusCode::SERVICE_UNAVAILABLE => Ok(false),
            _ => expect_success(response).await.map(|_| true),
        }
    }

    // ------------------------------------------------------------------------
    // Me
    // ------------------------------------------------------------------------

    pub async fn me(&self) -> ClientResult<User> {
        self.get_json("/api/me", None).await
    }

    pub async fn update_preferences(&self, patch: &PreferencesPatch) -> ClientResult<User> {
        self.send_json(Method::PATCH, "/api/me/preferences", patch).await
    }

    // ------------------------------------------------------------------------
    // Contacts
    // ------------------------------------------------------------------------

    pub async fn list_contacts(&self, params: &ContactParams) -> ClientResult<Page<ContactSummary>> {
        self.get_json("/api/contacts", Some(params.pairs())).await
    }

    pub async fn get_contact(&self, id: ContactId) -> ClientResult<Contact> {
        self.get_json(&path("contacts", id), None).await
    }

    pub async fn create_contact(&self, input: &ContactInput) -> ClientResult<Contact> {
        self.send_json(Method::POST, "/api/contacts", input).await
    }

    pub async fn update_contact(&self, id: ContactId, patch: &ContactPatch) -> ClientResult<Contact> {
        self.send_json(Method::PATCH, &path("contacts", id), patch).await
    }

    pub async fn delete_contact(&self, id: ContactId) -> ClientResult<()> {
        self.delete(&path("contacts", id)).await
    }

    // ------------------------------------------------------------------------
    // Friends
    // ------------------------------------------------------------------------

    pub async fn list_friends(&self, params: &FriendParams) -> ClientResult<Page<Friend>> {
        self.get_json("/api/friends", Some(params.pairs())).await
    }

    pub async fn get_friend(&self, id: FriendId) -> ClientResult<Friend> {
        self.get_json(&path("friends", id), None).await
    }

    pub async fn create_friend(&self, input: &FriendInput) -> ClientResult<Friend> {
        self.send_json(Method::POST, "/api/friends", input).await
    }

    pub async fn update_friend(&self, id: FriendId, patch: &FriendPatch) -> ClientResult<Friend> {
        self.send_json(Method::PATCH, &path("friends", id), patch).await
    }

    pub async fn delete_friend(&self, id: FriendId) -> ClientResult<()> {
        self.delete(&path("friends", id)).await
    }

    pub async fn list_friend_encounters(
        &self,
        id: FriendId,
        params: &EncounterParams,
    ) -> ClientResult<Page<Encounter>> {
        let path = format!("{}/encounters", path("friends", id));
        self.get_json(&path, Some(params.pairs())).await
    }

    // ------------------------------------------------------------------------
    // Circles
    // ------------------------------------------------------------------------

    pub async fn list_circles(&self) -> ClientResult<Vec<Circle>> {
        self.get_json("/api/circles", None).await
    }

    pub async fn get_circle(&self, id: CircleId) -> ClientResult<Circle> {
        self.get_json(&path("circles", id), None).await
    }

    pub async fn create_circle(&self, input: &CircleInput) -> ClientResult<Circle> {
        self.send_json(Method::POST, "/api/circles", input).await
    }

    pub async fn update_circle(&self, id: CircleId, patch: &CirclePatch) -> ClientResult<Circle> {
        self.send_json(Method::PATCH, &path("circles", id), patch).await
    }

    pub async fn delete_circle(&self, id: CircleId) -> ClientResult<()> {
        self.delete(&path("circles", id)).await
    }

    pub async fn add_circle_member(&self, id: CircleId, friend: FriendId) -> ClientResult<Circle> {
        let path = format!("{}/members/{}", path("circles", id), friend.as_uuid());
        let response = self.request(Method::PUT, &path).send().await?;
        parse_response(response).await
    }

    pub async fn remove_circle_member(&self, id: CircleId, friend: FriendId) -> ClientResult<Circle> {
        let path = format!("{}/members/{}", path("circles", id), friend.as_uuid());
        let response = self.request(Method::DELETE, &path).send().await?;
        parse_response(response).await
    }

    // ------------------------------------------------------------------------
    // Collectives
    // ------------------------------------------------------------------------

    pub async fn list_collectives(&self, params: &CollectiveParams) -> ClientResult<Page<Collective>> {
        self.get_json("/api/collectives", Some(params.pairs())).await
    }

    pub async fn get_collective(&self, id: CollectiveId) -> ClientResult<CollectiveDetail> {
        self.get_json(&path("collectives", id), None).await
    }

    pub async fn create_collective(&self, input: &CollectiveInput) -> ClientResult<CollectiveDetail> {
        self.send_json(Method::POST, "/api/collectives", input).await
    }

    pub async fn update_collective(
        &self,
        id: CollectiveId,
        patch: &CollectivePatch,
    ) -> ClientResult<CollectiveDetail> {
        self.send_json(Method::PATCH, &path("collectives", id), patch).await
    }

    pub async fn delete_collective(&self, id: CollectiveId) -> ClientResult<()> {
        self.delete(&path("collectives", id)).await
    }

    pub async fn add_membership(
        &self,
        id: CollectiveId,
        input: &MembershipInput,
    ) -> ClientResult<Membership> {
        let path = format!("{}/memberships", path("collectives", id));
        self.send_json(Method::POST, &path, input).await
    }

    pub async fn update_membership(
        &self,
        id: CollectiveId,
        membership: MembershipId,
        patch: &MembershipPatch,
    ) -> ClientResult<Membership> {
        let path = format!("{}/memberships/{}", path("collectives", id), membership.as_uuid());
        self.send_json(Method::PATCH, &path, patch).await
    }

    pub async fn delete_membership(&self, id: CollectiveId, membership: MembershipId) -> ClientResult<()> {
        let path = format!("{}/memberships/{}", path("collectives", id), membership.as_uuid());
        self.delete(&path).await
    }

    // ------------------------------------------------------------------------
    // Encounters
    // ------------------------------------------------------------------------

    pub async fn list_encounters(&self, params: &EncounterParams) -> ClientResult<Page<Encounter>> {
        self.get_json("/api/encounters", Some(params.pairs())).await
    }

    pub async fn get_encounter(&self, id: EncounterId) -> ClientResult<Encounter> {
        self.get_json(&path("encounters", id), None).await
    }

    pub async fn create_encounter(&self, input: &EncounterInput) -> ClientResult<Encounter> {
        self.send_json(Method::POST, "/api/encounters", input).await
    }

    pub async fn update_encounter(&self, id: EncounterId, patch: &EncounterPatch) -> ClientResult<Encounter> {
        self.send_json(Method::PATCH, &path("encounters", id), patch).await
    }

    pub async fn delete_encounter(&self, id: EncounterId) -> ClientResult<()> {
        self.delete(&path("encounters", id)).await
    }

    // ------------------------------------------------------------------------
    // Address lookup
    // ------------------------------------------------------------------------

    /// Place-name prefix search. `limit` defaults to 10 on the server.
    pub async fn lookup_address(
        &self,
        q: &str,
        country: Option<&str>,
        limit: Option<u32>,
    ) -> ClientResult<Vec<Place>> {
        let mut pairs = vec![("q".to_string(), q.to_string())];
        if let Some(country) = country {
            pairs.push(("country".to_string(), country.to_string()));
        }
        if let Some(limit) = limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        self.get_json("/api/address-lookup", Some(pairs.as_slice())).await
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %url, "Kith API request");
        self.client.request(method, url)
    }

    async fn get_json<T>(&self, path: &str, query: Option<&[(String, String)]>) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let mut request = self.request(Method::GET, path);
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request.send().await?;
        parse_response(response).await
    }

    async fn send_json<T, B>(&self, method: Method, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.request(method, path).json(body).send().await?;
        parse_response(response).await
    }

    async fn delete(&self, path: &str) -> ClientResult<()> {
        let response = self.request(Method::DELETE, path).send().await?;
        expect_success(response).await.map(|_| ())
    }
}

fn path<I: EntityIdType>(collection: &str, id: I) -> String {
    format!("/api/{}/{}", collection, id.as_uuid())
}

async fn expect_success(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let text = response.text().await?;
        tracing::debug!(status = status.as_u16(), "Kith API error response");
        Err(ClientError::from_response(status.as_u16(), text))
    }
}

async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let response = expect_success(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
