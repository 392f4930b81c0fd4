//! End-to-end flows through the orchestrator over the in-memory stores.

mod common;

use std::sync::Arc;

use common::{harness, harness_with_verifier, token_config, StaticGoogleVerifier};
use tally_auth::services::TokenCodec;
use tally_database::{RefreshTokenStore, UserStore};
use tally_models::auth::RefreshRecord;
use tally_models::error::slugs;
use tally_models::settings::{Currency, Weekday};
use tally_models::ErrorKind;

#[tokio::test]
async fn sign_up_returns_tokens_for_the_new_user() {
    let h = harness(5);

    let pair = h.service.sign_up("a@b.com", "abcde", "A").await.unwrap();
    let user = h.users.find_by_email("a@b.com").await.unwrap();

    let access = h.codec.validate_access(&pair.access.value).unwrap();
    let refresh = h.codec.validate_refresh(&pair.refresh.value).unwrap();
    assert_eq!(access.claims.user_id, user.id);
    assert_eq!(refresh.claims.user_id, user.id);
    assert_eq!(pair.access.user_id, user.id);

    let rows = h.tokens.records_for_user(user.id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, refresh.claims.jti);
    assert_eq!(rows[0].token, pair.refresh.value);

    assert_eq!(user.settings.currency, Currency::Rub);
    assert_eq!(user.settings.first_day_of_week, Weekday::Mon);
    assert_ne!(user.password_hash, "abcde");
}

#[tokio::test]
async fn validate_access_returns_the_signed_up_identity() {
    let h = harness(5);

    let pair = h.service.sign_up("a@b.com", "abcde", "A").await.unwrap();
    let token = h.service.validate_access(&pair.access.value).unwrap();

    assert_eq!(token.user_id, pair.access.user_id);
    assert_eq!(token.value, pair.access.value);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_fail_identically() {
    let h = harness(5);
    h.service.sign_up("a@b.com", "abcde", "A").await.unwrap();

    let wrong_password = h.service.sign_in("a@b.com", "abcdX").await.unwrap_err();
    let unknown_email = h.service.sign_in("nobody@b.com", "abcde").await.unwrap_err();

    assert_eq!(wrong_password.slug(), slugs::INVALID_CREDENTIALS);
    assert_eq!(unknown_email.slug(), slugs::INVALID_CREDENTIALS);
    assert_eq!(wrong_password.kind(), ErrorKind::Authorization);
    assert_eq!(unknown_email.kind(), ErrorKind::Authorization);
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[tokio::test]
async fn sign_in_issues_a_new_session() {
    let h = harness(5);
    let signed_up = h.service.sign_up("a@b.com", "abcde", "A").await.unwrap();

    let signed_in = h.service.sign_in("a@b.com", "abcde").await.unwrap();

    assert_eq!(signed_in.access.user_id, signed_up.access.user_id);
    assert_ne!(signed_in.refresh.value, signed_up.refresh.value);
    assert_eq!(h.tokens.records_for_user(signed_in.access.user_id).await.len(), 2);
}

#[tokio::test]
async fn refresh_token_is_single_use() {
    let h = harness(5);
    let first = h.service.sign_up("a@b.com", "abcde", "A").await.unwrap();

    let second = h.service.refresh(&first.refresh.value).await.unwrap();
    assert_eq!(second.access.user_id, first.access.user_id);

    let reused = h.service.refresh(&first.refresh.value).await.unwrap_err();
    assert_eq!(reused.slug(), slugs::INVALID_TOKEN);
    assert_eq!(reused.kind(), ErrorKind::Authorization);

    h.service.refresh(&second.refresh.value).await.unwrap();

    let rows = h.tokens.records_for_user(first.access.user_id).await;
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn refresh_for_missing_owner_consumes_the_row() {
    let h = harness(5);
    let orphan = uuid::Uuid::new_v4();
    let signed = h
        .codec
        .create_refresh(tally_auth::services::tokens::refresh_claims(orphan))
        .unwrap();
    h.tokens.insert(&RefreshRecord::from(&signed)).await.unwrap();

    let err = h.service.refresh(&signed.token).await.unwrap_err();

    assert_eq!(err.slug(), slugs::INVALID_TOKEN);
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert!(h.tokens.records_for_user(orphan).await.is_empty());
}

#[tokio::test]
async fn refresh_signed_with_another_secret_is_rejected() {
    let h = harness(5);
    h.service.sign_up("a@b.com", "abcde", "A").await.unwrap();
    let user = h.users.find_by_email("a@b.com").await.unwrap();

    let foreign = TokenCodec::new(&token_config("some-other-secret"));
    let forged = foreign
        .create_refresh(tally_auth::services::tokens::refresh_claims(user.id))
        .unwrap();

    let err = h.service.refresh(&forged.token).await.unwrap_err();
    assert_eq!(err.slug(), slugs::INVALID_TOKEN);

    let err = h.service.validate_access(&forged.token).unwrap_err();
    assert_eq!(err.slug(), slugs::INVALID_TOKEN);
}

#[tokio::test]
async fn exceeding_the_cap_leaves_only_the_new_session() {
    let h = harness(2);
    h.service.sign_up("a@b.com", "abcde", "A").await.unwrap();
    h.service.sign_in("a@b.com", "abcde").await.unwrap();
    let third = h.service.sign_in("a@b.com", "abcde").await.unwrap();
    let user_id = third.access.user_id;

    // At the cap plus one; the next issuance wipes and re-inserts.
    assert_eq!(h.tokens.records_for_user(user_id).await.len(), 3);

    let fourth = h.service.sign_in("a@b.com", "abcde").await.unwrap();

    let rows = h.tokens.records_for_user(user_id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].token, fourth.refresh.value);

    let err = h.service.refresh(&third.refresh.value).await.unwrap_err();
    assert_eq!(err.slug(), slugs::INVALID_TOKEN);
}

#[tokio::test]
async fn cap_only_counts_the_issuing_user() {
    let h = harness(1);
    h.service.sign_up("a@b.com", "abcde", "A").await.unwrap();
    let other = h.service.sign_up("c@d.com", "abcde", "C").await.unwrap();

    h.service.sign_in("a@b.com", "abcde").await.unwrap();
    h.service.sign_in("a@b.com", "abcde").await.unwrap();

    assert_eq!(h.tokens.records_for_user(other.access.user_id).await.len(), 1);
}

#[tokio::test]
async fn unknown_currency_leaves_settings_unchanged() {
    let h = harness(5);
    let pair = h.service.sign_up("a@b.com", "abcde", "A").await.unwrap();
    let user_id = pair.access.user_id;
    h.service.update_settings(user_id, "USD", "SUN", "https://pic/1").await.unwrap();

    let err = h
        .service
        .update_settings(user_id, "BTC", "MON", "https://pic/2")
        .await
        .unwrap_err();
    assert_eq!(err.slug(), slugs::FIELD_CURRENCY_INVALID);
    assert_eq!(err.kind(), ErrorKind::IncorrectInput);

    let user = h.service.get_user(user_id).await.unwrap();
    assert_eq!(user.settings.currency, Currency::Usd);
    assert_eq!(user.settings.first_day_of_week, Weekday::Sun);
    assert_eq!(user.settings.profile_picture_url, "https://pic/1");
}

#[tokio::test]
async fn unknown_first_day_of_week_is_rejected_on_write() {
    let h = harness(5);
    let pair = h.service.sign_up("a@b.com", "abcde", "A").await.unwrap();
    let user_id = pair.access.user_id;

    let err = h
        .service
        .update_settings(user_id, "EUR", "FUNDAY", "https://pic")
        .await
        .unwrap_err();
    assert_eq!(err.slug(), slugs::FIELD_FIRST_DAY_OF_WEEK_INVALID);

    let user = h.service.get_user(user_id).await.unwrap();
    assert_eq!(user.settings.currency, Currency::Rub);
    assert_eq!(user.settings.first_day_of_week, Weekday::Mon);
}

#[tokio::test]
async fn settings_are_replaced_wholesale() {
    let h = harness(5);
    let pair = h.service.sign_up("a@b.com", "abcde", "A").await.unwrap();

    let updated = h
        .service
        .update_settings(pair.access.user_id, "GEL", "WED", "https://pic")
        .await
        .unwrap();

    assert_eq!(updated.settings.currency, Currency::Gel);
    assert_eq!(updated.settings.first_day_of_week, Weekday::Wed);
    assert_eq!(updated.settings.profile_picture_url, "https://pic");
    assert_eq!(h.service.get_user(pair.access.user_id).await.unwrap().settings, updated.settings);
}

#[tokio::test]
async fn google_sign_in_for_existing_email_only_updates_picture() {
    let verifier = StaticGoogleVerifier::default().with("google-cred", "a@b.com", "Google Name", "https://g/pic.png");
    let h = harness_with_verifier(5, Arc::new(verifier));

    let local = h.service.sign_up("a@b.com", "abcde", "A").await.unwrap();
    let user_id = local.access.user_id;
    h.service.update_settings(user_id, "AMD", "FRI", "https://old.png").await.unwrap();

    let pair = h.service.google_sign_in("google-cred").await.unwrap();

    assert_eq!(pair.access.user_id, user_id);
    assert_eq!(h.codec.validate_access(&pair.access.value).unwrap().claims.user_id, user_id);
    assert_eq!(h.users.len().await, 1);

    let user = h.service.get_user(user_id).await.unwrap();
    assert_eq!(user.name, "A");
    assert_eq!(user.settings.currency, Currency::Amd);
    assert_eq!(user.settings.first_day_of_week, Weekday::Fri);
    assert_eq!(user.settings.profile_picture_url, "https://g/pic.png");

    // The local password still works.
    h.service.sign_in("a@b.com", "abcde").await.unwrap();
}

#[tokio::test]
async fn google_sign_in_for_new_email_creates_account() {
    let verifier = StaticGoogleVerifier::default().with("google-cred", "new@b.com", "New", "https://g/new.png");
    let h = harness_with_verifier(5, Arc::new(verifier));

    let pair = h.service.google_sign_in("google-cred").await.unwrap();

    let user = h.users.find_by_email("new@b.com").await.unwrap();
    assert_eq!(pair.access.user_id, user.id);
    assert_eq!(user.name, "New");
    assert_eq!(user.settings.currency, Currency::Rub);
    assert_eq!(user.settings.profile_picture_url, "https://g/new.png");
    assert_eq!(h.tokens.records_for_user(user.id).await.len(), 1);

    // Second sign-in reuses the account.
    let again = h.service.google_sign_in("google-cred").await.unwrap();
    assert_eq!(again.access.user_id, user.id);
    assert_eq!(h.users.len().await, 1);
}

#[tokio::test]
async fn rejected_google_credential_creates_nothing() {
    let h = harness(5);

    let err = h.service.google_sign_in("forged").await.unwrap_err();

    assert_eq!(err.slug(), slugs::INVALID_CREDENTIALS);
    assert_eq!(err.kind(), ErrorKind::IncorrectInput);
    assert!(h.users.is_empty().await);
}
