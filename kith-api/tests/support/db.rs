use kith_api::auth::AuthContext;
use kith_api::services::{Owner, UserService};
use kith_api::{DbClient, DbConfig, SchemaMigrator};
use kith_core::{EntityIdType, UserId};

/// Pool from `KITH_DB_*` / `DATABASE_URL`, schema migrated to latest.
pub async fn test_db() -> DbClient {
    let config = DbConfig::from_env();
    SchemaMigrator::connect(&config)
        .await
        .expect("Failed to connect migrator")
        .up()
        .await
        .expect("Failed to migrate test database");
    DbClient::from_config(&config).expect("Failed to create database client")
}

/// A throwaway user, resolved the same way the handlers resolve callers.
pub async fn fresh_owner(db: &DbClient) -> Owner {
    let user_id = UserId::now_v7();
    let conn = db.get_conn().await.expect("connection");
    conn.execute(
        "INSERT INTO auth.users (external_id, email, display_name) VALUES ($1, $2, $3)",
        &[&user_id.as_uuid(), &format!("{}@test.kith", user_id), &"Test User"],
    )
    .await
    .expect("insert user");

    UserService::new(db.clone())
        .owner(&AuthContext { user_id, session_id: None })
        .await
        .expect("resolve owner")
}
