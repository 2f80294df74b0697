//! Records exchanged with the backend services
//!
//! Identifiers stay as raw bytes here. Backends are independently versioned
//! and may hand back ids of the wrong length; decoding into [`Identity`]
//! happens at the response aggregation step where such a failure can be
//! reported against the field it came from.

use serde::{Deserialize, Serialize};

use crate::model::Identity;
use crate::validation::CredentialKey;

// =============================================================================
// Identity service
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(with = "b64")]
    pub uuid: Vec<u8>,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdentity {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCredentials {
    pub validate_by: ValidateBy,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidateBy {
    Username,
    Email,
}

impl From<CredentialKey> for ValidateBy {
    fn from(key: CredentialKey) -> Self {
        match key {
            CredentialKey::Username => ValidateBy::Username,
            CredentialKey::Email => ValidateBy::Email,
        }
    }
}

impl ValidateCredentials {
    /// Put the identifier in the column the classifier picked
    pub fn new(key: CredentialKey, username_or_email: &str, password: &str) -> Self {
        let (username, email) = match key {
            CredentialKey::Username => (username_or_email.to_string(), String::new()),
            CredentialKey::Email => (String::new(), username_or_email.to_string()),
        };
        Self {
            validate_by: key.into(),
            username,
            email,
            password: password.to_string(),
        }
    }
}

/// What kind of target a follow edge points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FollowKind {
    User,
    Source,
}

/// Directed follower -> followed relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowEdge {
    pub follower: Identity,
    pub followed: Identity,
    pub kind: FollowKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FollowEdgeWire {
    #[serde(with = "b64")]
    pub follower_uuid: Vec<u8>,
    #[serde(with = "b64")]
    pub followed_uuid: Vec<u8>,
    #[serde(rename = "type")]
    pub kind: FollowKind,
}

impl From<&FollowEdge> for FollowEdgeWire {
    fn from(edge: &FollowEdge) -> Self {
        Self {
            follower_uuid: edge.follower.to_vec(),
            followed_uuid: edge.followed.to_vec(),
            kind: edge.kind,
        }
    }
}

// =============================================================================
// Content service
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    #[serde(with = "b64")]
    pub uuid: Vec<u8>,
    pub url: String,
    #[serde(with = "b64_list", default)]
    pub source_head_uuids: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(with = "b64")]
    pub uuid: Vec<u8>,
    #[serde(with = "b64")]
    pub user_uuid: Vec<u8>,
    #[serde(with = "b64")]
    pub link_uuid: Vec<u8>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author: Identity,
    pub link_uuid: Vec<u8>,
    pub title: String,
    pub comment: String,
}

// =============================================================================
// Provenance service
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceNode {
    #[serde(with = "b64")]
    pub uuid: Vec<u8>,
    #[serde(default)]
    pub name: String,
}

// =============================================================================
// Byte fields travel as standard base64 strings
// =============================================================================

pub(crate) mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

pub(crate) mod b64_list {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&STANDARD.encode(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .into_iter()
            .map(|text| {
                STANDARD
                    .decode(text.as_bytes())
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
