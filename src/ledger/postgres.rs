//! # ledger::postgres: PostgreSQL Ledger
//!
//! Enabled with `--features postgres` and selected when `DATABASE_URL` is set.
//!
//! ## Setup
//! 1. Create a database
//! 2. Set `DATABASE_URL` in `.env`
//! 3. Start the service: `migrations/001_trade_history.sql` runs on connect

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, Executor, PgPool, Row};
use tracing::info;

use super::{LedgerError, LedgerStore};
use crate::models::{NewTradeEvent, TradeAction, TradeEvent};

pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Connects and applies the embedded migration.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        info!("Connecting to PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        // Plain &str runs through the simple-query protocol, which accepts
        // multiple statements.
        pool.execute(include_str!("../../migrations/001_trade_history.sql"))
            .await
            .context("Failed to run migration 001_trade_history.sql")?;

        info!("✅ PostgreSQL connected and migrations applied");
        Ok(Self { pool })
    }
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<TradeEvent, LedgerError> {
    let action: String = row.try_get("action")?;
    let action: TradeAction = action.parse().map_err(|reason| LedgerError::Corrupt {
        line: 0,
        reason,
    })?;

    Ok(TradeEvent {
        id:        row.try_get("id")?,
        pair:      row.try_get("pair")?,
        action,
        price:     row.try_get("price")?,
        timestamp: row.try_get::<DateTime<Utc>, _>("recorded_at")?,
    })
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn append(&self, event: NewTradeEvent) -> Result<TradeEvent, LedgerError> {
        let row = sqlx::query(
            r#"
            INSERT INTO trade_history (pair, action, price, recorded_at)
            VALUES ($1, $2, $3, clock_timestamp())
            RETURNING id, pair, action, price, recorded_at
            "#,
        )
        .bind(&event.pair)
        .bind(event.action.as_str())
        .bind(event.price)
        .fetch_one(&self.pool)
        .await?;

        row_to_event(&row)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<TradeEvent>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT id, pair, action, price, recorded_at
            FROM trade_history
            ORDER BY recorded_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect()
    }
}
