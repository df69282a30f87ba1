//! Postgres persistence for known rules.
//!
//! Plain async functions over a [`PgPool`]. This crate executes statements; it
//! does not decide which statement a rule needs. That decision belongs to the
//! sync driver.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub const ENV_DB_URL: &str = "SIDX_DATABASE_URL";

/// Connect to Postgres.
pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Connect to Postgres using the URL stored in `var`.
pub async fn connect_from_env_var(var: &str) -> Result<PgPool> {
    let url = std::env::var(var).with_context(|| format!("missing env var {var}"))?;
    connect(&url).await
}

/// Connect to Postgres using SIDX_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    connect_from_env_var(ENV_DB_URL).await
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Pool for DB-backed tests: SIDX_DATABASE_URL, migrated.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let pool = connect_from_env().await?;
    migrate(&pool).await?;
    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_rule_table: bool,
    pub rules_total: i64,
    pub rules_active: i64,
}

/// Connectivity + schema presence + rule counts.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='rule'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    let (total, active) = if exists {
        sqlx::query_as::<_, (i64, i64)>(
            "select count(*)::bigint, count(*) filter (where active)::bigint from rule",
        )
        .fetch_one(pool)
        .await
        .context("status rule count query failed")?
    } else {
        (0, 0)
    };

    Ok(DbStatus {
        ok: one == 1,
        has_rule_table: exists,
        rules_total: total,
        rules_active: active,
    })
}

// ---------------------------------------------------------------------------
// Baseline
// ---------------------------------------------------------------------------

/// One known rule as needed to seed the reconciliation index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineRow {
    pub sid: i64,
    pub rev: i32,
    pub active: bool,
}

/// All known rules, ascending by sid.
pub async fn fetch_baseline(pool: &PgPool) -> Result<Vec<BaselineRow>> {
    let rows = sqlx::query("select sid, rev, active from rule order by sid asc")
        .fetch_all(pool)
        .await
        .context("fetch_baseline failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(BaselineRow {
            sid: row.try_get("sid")?,
            rev: row.try_get("rev")?,
            active: row.try_get("active")?,
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Full rule payload written on insert/update/reactivate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleWrite {
    pub sid: i64,
    pub rev: i32,
    /// `<source name>:<relative path>`
    pub file: String,
    /// Raw rule line.
    pub pattern: String,
}

pub async fn insert_rule(pool: &PgPool, r: &RuleWrite) -> Result<()> {
    sqlx::query(
        r#"
        insert into rule (sid, rev, file, pattern, active)
        values ($1, $2, $3, $4, true)
        "#,
    )
    .bind(r.sid)
    .bind(r.rev)
    .bind(&r.file)
    .bind(&r.pattern)
    .execute(pool)
    .await
    .with_context(|| format!("insert_rule failed sid={}", r.sid))?;
    Ok(())
}

pub async fn update_rule(pool: &PgPool, r: &RuleWrite) -> Result<()> {
    let res = sqlx::query(
        r#"
        update rule
        set rev = $1,
            file = $2,
            pattern = $3,
            updated_at = now()
        where sid = $4
        "#,
    )
    .bind(r.rev)
    .bind(&r.file)
    .bind(&r.pattern)
    .bind(r.sid)
    .execute(pool)
    .await
    .with_context(|| format!("update_rule failed sid={}", r.sid))?;

    expect_one_row(res.rows_affected(), "update_rule", r.sid)
}

/// Update a soft-deleted rule and mark it active again.
pub async fn reactivate_rule(pool: &PgPool, r: &RuleWrite) -> Result<()> {
    let res = sqlx::query(
        r#"
        update rule
        set rev = $1,
            file = $2,
            pattern = $3,
            active = true,
            deactivated_at = null,
            updated_at = now()
        where sid = $4
        "#,
    )
    .bind(r.rev)
    .bind(&r.file)
    .bind(&r.pattern)
    .bind(r.sid)
    .execute(pool)
    .await
    .with_context(|| format!("reactivate_rule failed sid={}", r.sid))?;

    expect_one_row(res.rows_affected(), "reactivate_rule", r.sid)
}

/// Soft-delete: keep the row, mark it inactive.
pub async fn deactivate_rule(pool: &PgPool, sid: i64) -> Result<()> {
    let res = sqlx::query(
        r#"
        update rule
        set active = false,
            deactivated_at = now()
        where sid = $1
          and active
        "#,
    )
    .bind(sid)
    .execute(pool)
    .await
    .with_context(|| format!("deactivate_rule failed sid={sid}"))?;

    expect_one_row(res.rows_affected(), "deactivate_rule", sid)
}

fn expect_one_row(affected: u64, op: &str, sid: i64) -> Result<()> {
    match affected {
        1 => Ok(()),
        0 => Err(anyhow!("{op}: no matching row for sid={sid}")),
        n => Err(anyhow!("{op}: {n} rows affected for sid={sid}")),
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RuleRow {
    pub sid: i64,
    pub rev: i32,
    pub file: String,
    pub pattern: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

pub async fn fetch_rule(pool: &PgPool, sid: i64) -> Result<Option<RuleRow>> {
    let row = sqlx::query(
        r#"
        select sid, rev, file, pattern, active, created_at, updated_at, deactivated_at
        from rule
        where sid = $1
        "#,
    )
    .bind(sid)
    .fetch_optional(pool)
    .await
    .context("fetch_rule failed")?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(RuleRow {
        sid: row.try_get("sid")?,
        rev: row.try_get("rev")?,
        file: row.try_get("file")?,
        pattern: row.try_get("pattern")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deactivated_at: row.try_get("deactivated_at")?,
    }))
}
