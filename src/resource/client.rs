use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::query::QueryKey;
use crate::transport::{ApiRequest, Transport};

use super::{Entity, ListParams, Page};

/// CRUD client for one REST collection.
///
/// The endpoint is fixed at construction. All requests go through the shared
/// transport, which attaches credentials; no operation retries on failure.
pub struct ResourceClient<E, T> {
    endpoint: Arc<str>,
    transport: Arc<T>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, T> Clone for ResourceClient<E, T> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            transport: self.transport.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E, T> fmt::Debug for ResourceClient<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl<E, T> ResourceClient<E, T>
where
    E: Entity,
    T: Transport,
{
    /// Creates a client for the entity's default endpoint.
    pub fn new(transport: Arc<T>) -> Self {
        Self::at(E::ENDPOINT, transport)
    }

    /// Creates a client bound to `endpoint`.
    pub fn at(endpoint: &str, transport: Arc<T>) -> Self {
        let endpoint = format!("/{}", endpoint.trim_matches('/'));
        Self {
            endpoint: endpoint.into(),
            transport,
            _entity: PhantomData,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Key prefix shared by every cached read of this collection.
    pub fn tag(&self) -> QueryKey {
        QueryKey::new(E::TAG)
    }

    /// `GET <endpoint>` with `params` as query string.
    pub async fn list(&self, params: &ListParams) -> Result<Page<E>, Error> {
        let request = ApiRequest::get(&*self.endpoint).with_query(params.to_query());
        self.transport.send(request).await?.json()
    }

    /// `GET <endpoint>/<id>`.
    pub async fn get(&self, id: &E::Id) -> Result<E, Error> {
        let request = ApiRequest::get(self.item_path(id));
        self.transport.send(request).await?.json()
    }

    /// `POST <endpoint>`; returns the stored entity with its new identifier.
    pub async fn create(&self, entity: &E) -> Result<E, Error> {
        let request = ApiRequest::post(&*self.endpoint).with_body(payload(entity)?);
        let created: E = self.transport.send(request).await?.json()?;
        if created.id().is_none() {
            return Err(Error::Decode(format!(
                "created entity from `{}` has no `{}`",
                self.endpoint,
                E::ID_FIELD
            )));
        }
        debug!(endpoint = %self.endpoint, "entity created");
        Ok(created)
    }

    /// `PUT <endpoint>/<id>`; the identifier is taken from `id`, never from the body.
    pub async fn update(&self, id: &E::Id, entity: &E) -> Result<E, Error> {
        let request = ApiRequest::put(self.item_path(id)).with_body(payload(entity)?);
        self.transport.send(request).await?.json()
    }

    /// `DELETE <endpoint>/<id>`.
    ///
    /// Deleting an id that is already gone yields [`Error::NotFound`].
    pub async fn delete(&self, id: &E::Id) -> Result<(), Error> {
        let request = ApiRequest::delete(self.item_path(id));
        self.transport.send(request).await?.error_for_status()?;
        debug!(endpoint = %self.endpoint, %id, "entity deleted");
        Ok(())
    }

    fn item_path(&self, id: &E::Id) -> String {
        format!("{}/{}", self.endpoint, path_segment(&id.to_string()))
    }
}

/// Percent-encodes `raw` so it stays a single path segment.
fn path_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// JSON body for writes, without the identifier field.
fn payload<E: Entity>(entity: &E) -> Result<Value, Error> {
    let mut value = serde_json::to_value(entity)?;
    if let Value::Object(fields) = &mut value {
        fields.remove(E::ID_FIELD);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        text: String,
    }

    impl Entity for Note {
        type Id = u64;
        const ENDPOINT: &'static str = "/notes";
        const TAG: &'static str = "notes";

        fn id(&self) -> Option<&u64> {
            self.id.as_ref()
        }
    }

    #[test]
    fn test_endpoint_is_normalized() {
        let transport = Arc::new(MemoryTransport::new());
        let client: ResourceClient<Note, _> = ResourceClient::at("notes/", transport);
        assert_eq!(client.endpoint(), "/notes");
        assert_eq!(client.item_path(&4), "/notes/4");
        assert_eq!(client.tag(), QueryKey::from("notes"));
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tag {
        slug: String,
    }

    impl Entity for Tag {
        type Id = String;
        const ENDPOINT: &'static str = "/tags";
        const TAG: &'static str = "tags";
        const ID_FIELD: &'static str = "slug";

        fn id(&self) -> Option<&String> {
            Some(&self.slug)
        }
    }

    #[test]
    fn test_identifiers_stay_one_segment() {
        let transport = Arc::new(MemoryTransport::new());
        let client: ResourceClient<Tag, _> = ResourceClient::new(transport);
        assert_eq!(
            client.item_path(&"a/b?c#d e+f".to_string()),
            "/tags/a%2Fb%3Fc%23d%20e%2Bf"
        );
        assert_eq!(client.item_path(&"labour-court_2".to_string()), "/tags/labour-court_2");
    }

    #[tokio::test]
    async fn test_delete_sends_encoded_identifier() {
        let transport = Arc::new(MemoryTransport::new());
        let client: ResourceClient<Tag, _> = ResourceClient::new(transport.clone());

        let err = client
            .delete(&"../employees/1".to_string())
            .await
            .expect_err("no such tag");

        assert!(err.is_not_found());
        let sent = transport.requests();
        assert_eq!(sent[0].path, "/tags/..%2Femployees%2F1");
    }

    #[test]
    fn test_payload_strips_identifier() {
        let note = Note {
            id: Some(9),
            text: "draft".to_string(),
        };
        let body = payload(&note).expect("serializable");
        assert!(body.get("id").is_none());
        assert_eq!(body["text"], "draft");
    }

    #[tokio::test]
    async fn test_create_ignores_client_identifier() {
        let transport = Arc::new(MemoryTransport::new());
        let client: ResourceClient<Note, _> = ResourceClient::new(transport.clone());

        let created = client
            .create(&Note {
                id: Some(99),
                text: "hello".to_string(),
            })
            .await
            .expect("create should succeed");

        assert_eq!(created.id(), Some(&1));
        let sent = transport.requests();
        assert!(sent[0].body.as_ref().is_some_and(|body| body.get("id").is_none()));
    }
}
