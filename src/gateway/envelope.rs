//! Response aggregation
//!
//! Backend results are folded into a [`ResponseEnvelope`]: an optional
//! payload plus field-scoped errors. An upstream failure becomes one
//! unclassified error. A payload whose identifiers do not decode becomes a
//! field error naming the offending field, and the payload is dropped.

use serde::Serialize;

use crate::model::{FieldError, Identity, PartialPost, PartialUser};
use crate::services::{LinkRecord, PostRecord, UserRecord};
use crate::types::{GatewayError, Result};

/// Partial payload plus the errors that accompanied it.
///
/// No payload and no errors is a valid answer ("nobody signed in").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseEnvelope<T> {
    pub payload: Option<T>,
    pub errors: Vec<FieldError>,
}

impl<T> Default for ResponseEnvelope<T> {
    fn default() -> Self {
        Self {
            payload: None,
            errors: Vec::new(),
        }
    }
}

impl<T> ResponseEnvelope<T> {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_error(error: FieldError) -> Self {
        Self {
            payload: None,
            errors: vec![error],
        }
    }

    /// Combine a possibly-absent payload with a possibly-absent upstream
    /// error. Both error sources accumulate.
    pub fn aggregate<R, F>(payload: Option<R>, error: Option<&GatewayError>, transform: F) -> Self
    where
        F: FnOnce(R) -> std::result::Result<T, FieldError>,
    {
        let mut envelope = Self::empty();

        if let Some(error) = error {
            envelope
                .errors
                .push(FieldError::unclassified(error.to_string()));
        }

        if let Some(raw) = payload {
            match transform(raw) {
                Ok(value) => envelope.payload = Some(value),
                Err(field_error) => envelope.errors.push(field_error),
            }
        }

        envelope
    }

    /// Fold a single backend outcome. Cancellation stays a hard error.
    pub fn from_result<R, F>(outcome: Result<Option<R>>, transform: F) -> Result<Self>
    where
        F: FnOnce(R) -> std::result::Result<T, FieldError>,
    {
        match outcome {
            Ok(payload) => Ok(Self::aggregate(payload, None, transform)),
            Err(GatewayError::Cancelled) => Err(GatewayError::Cancelled),
            Err(e) => Ok(Self::aggregate(None, Some(&e), transform)),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Decode a backend identifier, blaming `field` on failure
pub fn decode_identity(bytes: &[u8], field: &str) -> std::result::Result<Identity, FieldError> {
    Identity::from_bytes(bytes).map_err(|e| FieldError::new(field, e.to_string()))
}

pub fn user_to_partial(user: UserRecord) -> std::result::Result<PartialUser, FieldError> {
    let id = decode_identity(&user.uuid, "ID")?;
    Ok(PartialUser {
        id: id.to_string(),
        username: user.username,
        email: user.email,
    })
}

pub fn post_to_partial(
    post: PostRecord,
    link: &LinkRecord,
) -> std::result::Result<PartialPost, FieldError> {
    let id = decode_identity(&post.uuid, "ID")?;
    let user_id = decode_identity(&post.user_uuid, "userID")?;
    Ok(PartialPost {
        id: id.to_string(),
        user_id: user_id.to_string(),
        link_url: link.url.clone(),
        title: post.title,
        comment: post.comment,
    })
}

/// All-or-nothing: one bad item drops the whole list
pub fn posts_to_partial(
    items: Vec<(PostRecord, LinkRecord)>,
) -> std::result::Result<Vec<PartialPost>, FieldError> {
    items
        .into_iter()
        .map(|(post, link)| post_to_partial(post, &link))
        .collect()
}
