//! Account and follow-graph operations

use tracing::{debug, info, warn};

use crate::auth::hash_password;
use crate::gateway::envelope::{user_to_partial, ResponseEnvelope};
use crate::gateway::Gateway;
use crate::model::{
    ChangePasswordRequest, FieldError, FollowRequest, ForgotPasswordRequest, Identity,
    LoginUserRequest, PartialUser, RegisterUserRequest,
};
use crate::services::{CreateIdentity, FollowEdge, FollowKind, ValidateCredentials};
use crate::session::RequestContext;
use crate::types::{GatewayError, Result};
use crate::validation::{classify_login_identifier, validate_registration};

/// Whether an edge operation adds or removes the edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowDirection {
    Follow,
    Unfollow,
}

impl Gateway {
    /// Validate, hash, create the account and sign the caller in.
    ///
    /// Validation failures come back in the envelope without touching the
    /// identity service. A failed create is a hard error.
    pub async fn register(
        &self,
        ctx: &RequestContext,
        input: RegisterUserRequest,
    ) -> Result<ResponseEnvelope<PartialUser>> {
        if let Err(field_error) = validate_registration(&input) {
            debug!(request_id = %ctx.request_id, error = %field_error, "Registration rejected");
            return Ok(ResponseEnvelope::from_error(field_error));
        }

        let hashed_password = match hash_password(&input.password) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(request_id = %ctx.request_id, error = %e, "Password hashing failed");
                return Ok(ResponseEnvelope::from_error(FieldError::new(
                    "password",
                    "password is not valid",
                )));
            }
        };

        let user = self
            .identity
            .create_identity(
                ctx,
                CreateIdentity {
                    username: input.username,
                    email: input.email,
                    hashed_password,
                },
            )
            .await?;

        self.sign_in(ctx, &user.uuid);
        Ok(ResponseEnvelope::aggregate(Some(user), None, user_to_partial))
    }

    /// Check credentials; a rejection is reported in the envelope
    pub async fn login(
        &self,
        ctx: &RequestContext,
        input: LoginUserRequest,
    ) -> Result<ResponseEnvelope<PartialUser>> {
        let key = classify_login_identifier(&input.username_or_email);
        let request = ValidateCredentials::new(key, &input.username_or_email, &input.password);

        let outcome = self.identity.validate_credentials(ctx, request).await;
        if let Ok(user) = &outcome {
            self.sign_in(ctx, &user.uuid);
        }

        ResponseEnvelope::from_result(outcome.map(Some), user_to_partial)
    }

    pub async fn logout(&self, ctx: &RequestContext) -> Result<bool> {
        ctx.identity.set(None);
        info!(request_id = %ctx.request_id, "Signed out");
        Ok(true)
    }

    /// Nobody signed in, or the account no longer exists, is an empty envelope
    pub async fn current_user(&self, ctx: &RequestContext) -> Result<ResponseEnvelope<PartialUser>> {
        let Some(identity) = ctx.current_identity() else {
            return Ok(ResponseEnvelope::empty());
        };

        let outcome = self.identity.get_identity(ctx, &identity).await;
        ResponseEnvelope::from_result(outcome, user_to_partial)
    }

    pub async fn change_password(
        &self,
        _ctx: &RequestContext,
        _input: ChangePasswordRequest,
    ) -> Result<ResponseEnvelope<PartialUser>> {
        Ok(ResponseEnvelope::from_error(FieldError::unclassified(
            "not implemented",
        )))
    }

    // TODO: send a reset mail once the identity service grows a reset token RPC
    pub async fn forgot_password(
        &self,
        _ctx: &RequestContext,
        _input: ForgotPasswordRequest,
    ) -> Result<bool> {
        Ok(false)
    }

    pub async fn follow_user(&self, ctx: &RequestContext, input: FollowRequest) -> Result<bool> {
        self.perform_follow(ctx, input, FollowDirection::Follow, FollowKind::User)
            .await
    }

    pub async fn unfollow_user(&self, ctx: &RequestContext, input: FollowRequest) -> Result<bool> {
        self.perform_follow(ctx, input, FollowDirection::Unfollow, FollowKind::User)
            .await
    }

    pub async fn follow_source(&self, ctx: &RequestContext, input: FollowRequest) -> Result<bool> {
        self.perform_follow(ctx, input, FollowDirection::Follow, FollowKind::Source)
            .await
    }

    pub async fn unfollow_source(&self, ctx: &RequestContext, input: FollowRequest) -> Result<bool> {
        self.perform_follow(ctx, input, FollowDirection::Unfollow, FollowKind::Source)
            .await
    }

    /// Add or remove one follow edge from the caller to `input.followed_id`.
    ///
    /// Idempotent by backend contract.
    pub async fn perform_follow(
        &self,
        ctx: &RequestContext,
        input: FollowRequest,
        direction: FollowDirection,
        kind: FollowKind,
    ) -> Result<bool> {
        let follower = Self::require_identity(ctx)?;
        let followed = Identity::parse_str(&input.followed_id)
            .map_err(|_| GatewayError::field("followedID", "followed user uuid is not valid"))?;

        let edge = FollowEdge {
            follower,
            followed,
            kind,
        };

        match direction {
            FollowDirection::Follow => self.identity.follow(ctx, edge).await?,
            FollowDirection::Unfollow => self.identity.unfollow(ctx, edge).await?,
        }

        info!(
            request_id = %ctx.request_id,
            ?direction,
            ?kind,
            %followed,
            "Follow edge updated"
        );
        Ok(true)
    }

    /// Attach the backend's id to the session if it is well formed
    fn sign_in(&self, ctx: &RequestContext, uuid: &[u8]) {
        match Identity::from_bytes(uuid) {
            Ok(identity) => {
                ctx.identity.set(Some(identity));
                info!(request_id = %ctx.request_id, user = %identity, "Signed in");
            }
            Err(e) => {
                warn!(request_id = %ctx.request_id, error = %e, "Backend returned a malformed user id; not signing in");
            }
        }
    }
}
