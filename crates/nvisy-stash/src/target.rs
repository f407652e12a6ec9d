//! Upload targets and the negotiator that issues them.

use std::fmt;
use std::sync::Arc;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Name of the form field holding the retrieval key.
pub const KEY_FIELD: &str = "key";

/// Single-use, pre-authorized upload descriptor.
///
/// `fields` keeps the order in which the negotiator returned them; they are
/// posted to the store in that order ahead of the file part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    /// URL the multipart form is posted to.
    pub url: String,
    /// Opaque form fields that must accompany the upload.
    #[serde(
        serialize_with = "serialize_fields",
        deserialize_with = "deserialize_fields"
    )]
    pub fields: Vec<(String, String)>,
}

impl UploadTarget {
    /// Creates a target from a URL and ordered fields.
    pub fn new<K, V>(url: impl Into<String>, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            url: url.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value of a negotiated field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the retrieval key.
    pub fn key(&self) -> Option<&str> {
        self.field(KEY_FIELD)
    }

    /// Returns the URL the stored object will be reachable at.
    pub fn retrieval_url(&self) -> Option<String> {
        self.key().map(|key| format!("{}{}", self.url, key))
    }

    /// Checks that the target can be used for an upload.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::negotiation("upload target has an empty url"));
        }
        if self.key().is_none() {
            return Err(Error::negotiation(format!(
                "upload target is missing the `{KEY_FIELD}` field"
            )));
        }
        Ok(())
    }
}

fn serialize_fields<S>(fields: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(fields.len()))?;
    for (key, value) in fields {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

fn deserialize_fields<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedFields;

    impl<'de> Visitor<'de> for OrderedFields {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of form field names to string values")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry::<String, String>()? {
                fields.push((key, value));
            }
            Ok(fields)
        }
    }

    deserializer.deserialize_map(OrderedFields)
}

/// Shared negotiator handle.
pub type SharedNegotiator = Arc<dyn UploadNegotiator>;

/// Issues one-time upload targets.
///
/// Called exactly once per stash call; targets are never cached or reused.
#[async_trait::async_trait]
pub trait UploadNegotiator: Send + Sync {
    /// Obtains a fresh upload target.
    async fn negotiate(&self) -> Result<UploadTarget>;
}

#[async_trait::async_trait]
impl<T> UploadNegotiator for Arc<T>
where
    T: UploadNegotiator + ?Sized,
{
    async fn negotiate(&self) -> Result<UploadTarget> {
        self.as_ref().negotiate().await
    }
}
