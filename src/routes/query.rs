//! `POST /query` dispatch
//!
//! Body: `{ "operation": "<name>", "input": { ... } }`. Envelope-returning
//! operations answer `200 { "data": { "payload", "errors" } }` even when the
//! envelope carries errors; hard failures answer with the error's status and
//! an [`ErrorResponse`](crate::routes::ErrorResponse).

use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::gateway::Gateway;
use crate::routes::{error_response, json_response, parse_json_body, BoxBody};
use crate::session::RequestContext;
use crate::types::{GatewayError, Result};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub operation: String,
    #[serde(default)]
    pub input: Value,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub data: Value,
}

pub async fn handle_query<B>(gateway: &Gateway, ctx: &RequestContext, req: Request<B>) -> Response<BoxBody>
where
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let query: QueryRequest = match parse_json_body(req).await {
        Ok(query) => query,
        Err(e) => return error_response(&e),
    };

    debug!(request_id = %ctx.request_id, operation = %query.operation, "Query");
    match dispatch(gateway, ctx, query).await {
        Ok(data) => json_response(StatusCode::OK, &QueryResponse { data }),
        Err(e) => error_response(&e),
    }
}

/// Run one named operation and serialize its result
pub async fn dispatch(gateway: &Gateway, ctx: &RequestContext, query: QueryRequest) -> Result<Value> {
    let QueryRequest { operation, input } = query;
    let op = operation.as_str();

    match op {
        "register" => to_data(gateway.register(ctx, decode(op, input)?).await?),
        "login" => to_data(gateway.login(ctx, decode(op, input)?).await?),
        "logout" => to_data(gateway.logout(ctx).await?),
        "changePassword" => to_data(gateway.change_password(ctx, decode(op, input)?).await?),
        "forgotPassword" => to_data(gateway.forgot_password(ctx, decode(op, input)?).await?),
        "followUser" => to_data(gateway.follow_user(ctx, decode(op, input)?).await?),
        "unfollowUser" => to_data(gateway.unfollow_user(ctx, decode(op, input)?).await?),
        "followSource" => to_data(gateway.follow_source(ctx, decode(op, input)?).await?),
        "unfollowSource" => to_data(gateway.unfollow_source(ctx, decode(op, input)?).await?),
        "createPost" => to_data(gateway.create_post(ctx, decode(op, input)?).await?),
        "updatePost" => to_data(gateway.update_post(ctx, decode(op, input)?).await?),
        "deletePost" => to_data(gateway.delete_post(ctx, decode(op, input)?).await?),
        "currentUser" => to_data(gateway.current_user(ctx).await?),
        "currentUsersPosts" => to_data(gateway.current_users_posts(ctx).await?),
        "posts" => to_data(gateway.posts(ctx, decode(op, input)?).await?),
        other => Err(GatewayError::BadRequest(format!("Unknown operation: {}", other))),
    }
}

fn decode<T: DeserializeOwned>(operation: &str, input: Value) -> Result<T> {
    serde_json::from_value(input)
        .map_err(|e| GatewayError::BadRequest(format!("Invalid input for {}: {}", operation, e)))
}

fn to_data<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
