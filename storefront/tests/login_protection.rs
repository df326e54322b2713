use chrono::Duration;
use storefront::{
    LoginOutcome, LoginProtectionConfig, RateLimiterConfig, SqliteRepositoryProvider,
    SqliteStorage, Storefront, StorefrontBuilder, StorefrontLoginGuard,
};

const PASSWORD: &str = "correct horse battery";

async fn storefront_with(
    protection: LoginProtectionConfig,
) -> Storefront<SqliteRepositoryProvider> {
    let _ = tracing_subscriber::fmt().try_init();

    let storefront = StorefrontBuilder::new()
        .with_sqlite("sqlite::memory:")
        .await
        .unwrap()
        .with_jwt_secret("integration-secret")
        .with_login_protection(protection)
        .apply_migrations(true)
        .build()
        .await
        .unwrap();

    storefront
        .register_user(None, "alice", "alice@example.com", PASSWORD, false)
        .await
        .unwrap();
    storefront
}

fn tight_protection(ip_points: u32, username_ip_points: u32) -> LoginProtectionConfig {
    LoginProtectionConfig {
        ip: RateLimiterConfig::ip_per_day(ip_points),
        username_ip: RateLimiterConfig::consecutive_username_and_ip(username_ip_points),
    }
}

#[tokio::test]
async fn test_successful_login_issues_verifiable_token() {
    let storefront = storefront_with(LoginProtectionConfig::default()).await;

    let outcome = storefront.login("alice", PASSWORD, "10.0.0.1").await.unwrap();
    let LoginOutcome::Accepted { user, session } = outcome else {
        panic!("expected login to succeed, got {outcome:?}");
    };
    assert_eq!(user.username, "alice");
    assert!(!session.is_expired());

    let authenticated = storefront.authenticate(&session.token).await.unwrap();
    assert_eq!(authenticated.id, user.id);
}

#[tokio::test]
async fn test_unknown_user_only_charges_ip_limiter() {
    let storefront = storefront_with(tight_protection(2, 1)).await;
    let guard = storefront.login_guard();

    for _ in 0..2 {
        let outcome = storefront.login("mallory", "whatever", "10.0.0.2").await.unwrap();
        assert!(matches!(outcome, LoginOutcome::Rejected));
    }

    let key =
        StorefrontLoginGuard::<SqliteRepositoryProvider>::username_ip_key("mallory", "10.0.0.2");
    assert!(guard.username_ip_limiter().get(&key).await.unwrap().is_none());

    let ip = guard.ip_limiter().get("10.0.0.2").await.unwrap().unwrap();
    assert_eq!(ip.consumed_points, 2);

    // The third failure crosses the IP threshold
    let outcome = storefront.login("mallory", "whatever", "10.0.0.2").await.unwrap();
    let LoginOutcome::Throttled { retry_after_seconds } = outcome else {
        panic!("expected throttling, got {outcome:?}");
    };
    assert!(retry_after_seconds > 0);
}

#[tokio::test]
async fn test_eleventh_consecutive_failure_is_throttled() {
    let storefront = storefront_with(LoginProtectionConfig::default()).await;

    for attempt in 1..=10 {
        let outcome = storefront.login("alice", "wrong password", "10.0.0.3").await.unwrap();
        assert!(
            matches!(outcome, LoginOutcome::Rejected),
            "attempt {attempt} should be rejected, got {outcome:?}"
        );
    }

    let outcome = storefront.login("alice", "wrong password", "10.0.0.3").await.unwrap();
    let LoginOutcome::Throttled { retry_after_seconds } = outcome else {
        panic!("expected throttling, got {outcome:?}");
    };
    assert!(retry_after_seconds <= 3600);
    assert!(retry_after_seconds > 3500);

    // Even the right password is refused while blocked
    let outcome = storefront.login("alice", PASSWORD, "10.0.0.3").await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Throttled { .. }));

    // Another address is unaffected
    let outcome = storefront.login("alice", PASSWORD, "10.0.0.4").await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Accepted { .. }));
}

#[tokio::test]
async fn test_successful_login_clears_consecutive_failures() {
    let storefront = storefront_with(LoginProtectionConfig::default()).await;
    let guard = storefront.login_guard();
    let key =
        StorefrontLoginGuard::<SqliteRepositoryProvider>::username_ip_key("alice", "10.0.0.5");

    storefront.login("alice", "wrong password", "10.0.0.5").await.unwrap();
    storefront.login("alice", "wrong password", "10.0.0.5").await.unwrap();
    let status = guard.username_ip_limiter().get(&key).await.unwrap().unwrap();
    assert_eq!(status.consumed_points, 2);

    let outcome = storefront.login("alice", PASSWORD, "10.0.0.5").await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Accepted { .. }));
    assert!(guard.username_ip_limiter().get(&key).await.unwrap().is_none());

    // The IP counter keeps its failures
    let ip = guard.ip_limiter().get("10.0.0.5").await.unwrap().unwrap();
    assert_eq!(ip.consumed_points, 2);
}

#[tokio::test]
async fn test_blocked_ip_is_refused_without_checking_credentials() {
    let storefront = storefront_with(tight_protection(1, 10)).await;
    let guard = storefront.login_guard();

    storefront.login("nobody", "x", "10.0.0.6").await.unwrap();
    let outcome = storefront.login("nobody", "x", "10.0.0.6").await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Throttled { .. }));
    let before = guard.ip_limiter().get("10.0.0.6").await.unwrap().unwrap();

    let outcome = storefront.login("alice", PASSWORD, "10.0.0.6").await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Throttled { .. }));

    // A refused attempt consumes nothing
    let after = guard.ip_limiter().get("10.0.0.6").await.unwrap().unwrap();
    assert_eq!(after.consumed_points, before.consumed_points);
}

#[tokio::test]
async fn test_blocked_ip_governs_the_retry_delay() {
    // A short IP block next to a long username+IP block
    let protection = LoginProtectionConfig {
        ip: RateLimiterConfig::ip_per_day(1).with_block_duration(Duration::minutes(10)),
        username_ip: RateLimiterConfig::consecutive_username_and_ip(1),
    };
    let storefront = storefront_with(protection).await;
    let guard = storefront.login_guard();
    let key =
        StorefrontLoginGuard::<SqliteRepositoryProvider>::username_ip_key("alice", "10.0.0.8");

    storefront.login("alice", "wrong password", "10.0.0.8").await.unwrap();
    storefront.login("alice", "wrong password", "10.0.0.8").await.unwrap();

    let ip = guard.ip_limiter().get("10.0.0.8").await.unwrap().unwrap();
    let username_ip = guard.username_ip_limiter().get(&key).await.unwrap().unwrap();
    assert!(ip.blocked && username_ip.blocked);
    assert!(ip.retry_after_seconds() <= 600);
    assert!(username_ip.retry_after_seconds() > 3500);

    let outcome = storefront.login("alice", PASSWORD, "10.0.0.8").await.unwrap();
    let LoginOutcome::Throttled { retry_after_seconds } = outcome else {
        panic!("expected throttling, got {outcome:?}");
    };
    assert_eq!(retry_after_seconds, ip.retry_after_seconds());
}

#[tokio::test]
async fn test_cleanup_task_stops_on_shutdown() {
    let _ = tracing_subscriber::fmt().try_init();

    let protection = LoginProtectionConfig {
        ip: RateLimiterConfig::new("login_fail_ip_per_day", 5, Duration::milliseconds(1))
            .with_block_duration(Duration::milliseconds(1)),
        ..Default::default()
    };
    let pool = SqliteStorage::connect("sqlite::memory:")
        .await
        .unwrap()
        .pool()
        .clone();
    let storefront = StorefrontBuilder::new()
        .with_sqlite_pool(pool.clone())
        .with_jwt_secret("integration-secret")
        .with_login_protection(protection)
        .apply_migrations(true)
        .build()
        .await
        .unwrap();

    storefront.login("nobody", "x", "10.0.0.7").await.unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle =
        storefront.start_cleanup_task(std::time::Duration::from_millis(10), shutdown_rx);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    // Expired rows are gone from the table, not merely hidden by reads
    let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rate_limiter_states")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}
