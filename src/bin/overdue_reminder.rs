//! 延滞リマインダーバッチ
//!
//! リクエスト経路の外で一回限りのジョブとして実行される
//! （cron等での夜間実行を想定）。延滞中の貸出ごとに
//! リマインダー通知とメールを配信して終了する。

use chrono::Utc;
use rusty_circulation::{
    adapters::LogEmailSink,
    adapters::postgres::{
        PostgresCatalogStore, PostgresLoanLedger, PostgresMemberStore, PostgresNotificationSink,
    },
    application::circulation::{ServiceDependencies, send_overdue_reminders},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_circulation=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/circulation".into());

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let service_deps = ServiceDependencies {
        catalog: Arc::new(PostgresCatalogStore::new(pool.clone())),
        members: Arc::new(PostgresMemberStore::new(pool.clone())),
        ledger: Arc::new(PostgresLoanLedger::new(pool.clone())),
        notifications: Arc::new(PostgresNotificationSink::new(pool.clone())),
        email: Arc::new(LogEmailSink::new()),
    };

    let reminded = send_overdue_reminders(&service_deps, Utc::now())
        .await
        .expect("Failed to send overdue reminders");

    tracing::info!(reminded, "overdue reminder batch finished");
}
