//! Account and follow-edge integration tests

mod common;

use std::sync::atomic::Ordering;

use common::Harness;
use srcabl_gateway::gateway::FollowDirection;
use srcabl_gateway::model::{
    ChangePasswordRequest, FollowRequest, ForgotPasswordRequest, Identity, LoginUserRequest,
    RegisterUserRequest,
};
use srcabl_gateway::services::{FollowKind, ValidateBy};
use srcabl_gateway::types::GatewayError;

fn registration(username: &str, password: &str, email: &str) -> RegisterUserRequest {
    RegisterUserRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    }
}

fn follow(id: impl ToString) -> FollowRequest {
    FollowRequest {
        followed_id: id.to_string(),
    }
}

#[tokio::test]
async fn test_register_rejects_at_sign_in_username() {
    let h = Harness::new();
    let ctx = h.anonymous();

    let envelope = h
        .gateway
        .register(&ctx, registration("bob@x", "secret", "bob@example.com"))
        .await
        .unwrap();

    assert!(envelope.payload.is_none());
    assert_eq!(envelope.errors.len(), 1);
    assert_eq!(envelope.errors[0].field.as_deref(), Some("username"));
    assert!(envelope.errors[0].message.contains("must not contain '@'"));
    assert!(h.calls().is_empty());
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let h = Harness::new();
    let ctx = h.anonymous();

    let envelope = h
        .gateway
        .register(&ctx, registration("bob", "ab", "bob@example.com"))
        .await
        .unwrap();

    assert_eq!(envelope.errors.len(), 1);
    assert_eq!(envelope.errors[0].field.as_deref(), Some("password"));
    assert!(h.calls().is_empty());
}

#[tokio::test]
async fn test_register_reports_only_the_first_violation() {
    let h = Harness::new();
    let ctx = h.anonymous();

    let envelope = h
        .gateway
        .register(&ctx, registration("bob@x", "ab", "nope"))
        .await
        .unwrap();

    assert_eq!(envelope.errors.len(), 1);
    assert_eq!(envelope.errors[0].field.as_deref(), Some("username"));
}

#[tokio::test]
async fn test_register_sends_hash_and_signs_in() {
    let h = Harness::new();
    let ctx = h.anonymous();

    let envelope = h
        .gateway
        .register(&ctx, registration("bob", "hunter22", "bob@example.com"))
        .await
        .unwrap();

    assert_eq!(h.count("identity.create_identity"), 1);
    let created = h.identity.created.lock().unwrap().clone();
    let hash = &created[0].hashed_password;
    assert!(hash.starts_with("$argon2id$"));
    assert!(!hash.contains("hunter22"));

    let user = envelope.payload.expect("user payload");
    assert_eq!(user.username, "bob");
    assert_eq!(ctx.current_identity().map(|id| id.to_string()), Some(user.id));
}

#[tokio::test]
async fn test_register_backend_failure_is_hard() {
    let h = Harness::new();
    let ctx = h.anonymous();
    h.identity.fail_create.store(true, Ordering::SeqCst);

    let result = h
        .gateway
        .register(&ctx, registration("bob", "hunter22", "bob@example.com"))
        .await;

    assert!(matches!(result, Err(GatewayError::Upstream { .. })));
    assert!(ctx.current_identity().is_none());
}

#[tokio::test]
async fn test_register_with_malformed_backend_id() {
    let h = Harness::new();
    let ctx = h.anonymous();
    h.identity.malformed_ids.store(true, Ordering::SeqCst);

    let envelope = h
        .gateway
        .register(&ctx, registration("bob", "hunter22", "bob@example.com"))
        .await
        .unwrap();

    assert!(envelope.payload.is_none());
    assert_eq!(envelope.errors[0].field.as_deref(), Some("ID"));
    assert!(ctx.current_identity().is_none());
}

#[tokio::test]
async fn test_login_by_email_and_by_username() {
    let h = Harness::new();
    let id = h.identity.add_account("ada", "ada@example.com", "pw123");

    let ctx = h.anonymous();
    let envelope = h
        .gateway
        .login(
            &ctx,
            LoginUserRequest {
                username_or_email: "ada@example.com".into(),
                password: "pw123".into(),
            },
        )
        .await
        .unwrap();
    assert!(envelope.errors.is_empty());
    assert_eq!(ctx.current_identity(), Some(id));

    let ctx = h.anonymous();
    h.gateway
        .login(
            &ctx,
            LoginUserRequest {
                username_or_email: "ada".into(),
                password: "pw123".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(ctx.current_identity(), Some(id));

    let validations = h.identity.validations.lock().unwrap();
    assert_eq!(validations[0].validate_by, ValidateBy::Email);
    assert_eq!(validations[1].validate_by, ValidateBy::Username);
}

#[tokio::test]
async fn test_login_rejection_is_an_envelope_error() {
    let h = Harness::new();
    h.identity.add_account("ada", "ada@example.com", "pw123");
    let ctx = h.anonymous();

    let envelope = h
        .gateway
        .login(
            &ctx,
            LoginUserRequest {
                username_or_email: "ada".into(),
                password: "wrong".into(),
            },
        )
        .await
        .unwrap();

    assert!(envelope.payload.is_none());
    assert_eq!(envelope.errors.len(), 1);
    assert_eq!(envelope.errors[0].field, None);
    assert!(ctx.current_identity().is_none());
}

#[tokio::test]
async fn test_current_user_and_logout() {
    let h = Harness::new();
    let id = h.identity.add_account("ada", "ada@example.com", "pw123");
    let ctx = h.anonymous();

    let nobody = h.gateway.current_user(&ctx).await.unwrap();
    assert!(nobody.payload.is_none());
    assert!(nobody.errors.is_empty());
    assert!(h.calls().is_empty());

    ctx.identity.set(Some(id));
    let me = h.gateway.current_user(&ctx).await.unwrap();
    assert_eq!(me.payload.map(|u| u.username), Some("ada".to_string()));

    assert!(h.gateway.logout(&ctx).await.unwrap());
    assert!(ctx.current_identity().is_none());
    let after = h.gateway.current_user(&ctx).await.unwrap();
    assert!(after.payload.is_none());
}

#[tokio::test]
async fn test_current_user_for_deleted_account_is_empty() {
    let h = Harness::new();
    let (ctx, _) = h.signed_in();

    let envelope = h.gateway.current_user(&ctx).await.unwrap();
    assert!(envelope.payload.is_none());
    assert!(envelope.errors.is_empty());
    assert_eq!(h.count("identity.get_identity"), 1);
}

#[tokio::test]
async fn test_unimplemented_account_operations() {
    let h = Harness::new();
    let (ctx, _) = h.signed_in();

    let change = h
        .gateway
        .change_password(
            &ctx,
            ChangePasswordRequest {
                old_password: "a".into(),
                new_password: "b".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(change.errors.len(), 1);
    assert_eq!(change.errors[0].field, None);
    assert_eq!(change.errors[0].message, "not implemented");

    let forgot = h
        .gateway
        .forgot_password(
            &ctx,
            ForgotPasswordRequest {
                email: "a@b.io".into(),
            },
        )
        .await
        .unwrap();
    assert!(!forgot);
    assert!(h.calls().is_empty());
}

#[tokio::test]
async fn test_follow_is_idempotent() {
    let h = Harness::new();
    let (ctx, me) = h.signed_in();
    let target = Identity::new_random();

    assert!(h.gateway.follow_user(&ctx, follow(target)).await.unwrap());
    assert!(h.gateway.follow_user(&ctx, follow(target)).await.unwrap());

    let edges = h.identity.edges.lock().unwrap().clone();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].follower, me);
    assert_eq!(edges[0].followed, target);
    assert_eq!(edges[0].kind, FollowKind::User);
}

#[tokio::test]
async fn test_follow_and_unfollow_source() {
    let h = Harness::new();
    let (ctx, _) = h.signed_in();
    let source = Identity::new_random();

    assert!(h.gateway.follow_source(&ctx, follow(source)).await.unwrap());
    assert_eq!(h.identity.edges.lock().unwrap()[0].kind, FollowKind::Source);

    assert!(h.gateway.unfollow_source(&ctx, follow(source)).await.unwrap());
    assert!(h.identity.edges.lock().unwrap().is_empty());
    assert_eq!(h.calls(), vec!["identity.follow", "identity.unfollow"]);
}

#[tokio::test]
async fn test_edge_backend_failure_is_a_hard_error() {
    let h = Harness::new();
    let (ctx, _) = h.signed_in();
    h.identity.fail_follow.store(true, Ordering::SeqCst);
    let target = Identity::new_random();

    let followed = h.gateway.follow_user(&ctx, follow(target)).await;
    match followed {
        Err(GatewayError::Upstream { service, operation, .. }) => {
            assert_eq!(service, "identity");
            assert_eq!(operation, "Follow");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }

    let unfollowed = h.gateway.unfollow_source(&ctx, follow(target)).await;
    assert!(matches!(unfollowed, Err(GatewayError::Upstream { .. })));
    assert!(h.identity.edges.lock().unwrap().is_empty());
    assert_eq!(h.calls(), vec!["identity.follow", "identity.unfollow"]);
}

#[tokio::test]
async fn test_malformed_followed_id_is_a_field_error() {
    let h = Harness::new();
    let (ctx, _) = h.signed_in();

    let result = h
        .gateway
        .perform_follow(&ctx, follow("abc"), FollowDirection::Follow, FollowKind::User)
        .await;

    match result {
        Err(GatewayError::Field(field_error)) => {
            assert_eq!(field_error.field.as_deref(), Some("followedID"));
            assert_eq!(field_error.message, "followed user uuid is not valid");
        }
        other => panic!("expected field error, got {:?}", other),
    }
    assert!(h.calls().is_empty());
}

#[tokio::test]
async fn test_edge_operations_require_identity() {
    let h = Harness::new();
    let ctx = h.anonymous();
    let target = Identity::new_random();

    let results = [
        h.gateway.follow_user(&ctx, follow(target)).await,
        h.gateway.unfollow_user(&ctx, follow(target)).await,
        h.gateway.follow_source(&ctx, follow(target)).await,
        h.gateway.unfollow_source(&ctx, follow(target)).await,
    ];

    for result in results {
        assert!(matches!(result, Err(GatewayError::Unauthenticated(_))));
    }
    assert!(h.calls().is_empty());
}
