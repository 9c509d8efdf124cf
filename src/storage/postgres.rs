//! PostgreSQL implementation of [`LeadStore`].
//!
//! Talks to the `leads` table directly, for deployments that own their database
//! rather than going through the hosted REST interface. The schema lives in
//! `migrations/`; run [`migrator`] before first use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::LeadStore;
use crate::domain::lead::{Industry, Lead, LeadId, NewLead, mask_email};
use crate::error::{LeadCaptureError, Result};
use crate::session::SessionId;

/// Get the leadcapture database migrator.
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

#[derive(Debug, sqlx::FromRow)]
struct LeadRecord {
    id: Uuid,
    name: String,
    email: String,
    industry: String,
    session_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<LeadRecord> for Lead {
    type Error = LeadCaptureError;

    fn try_from(record: LeadRecord) -> Result<Self> {
        let session_id = SessionId::parse(record.session_id).ok_or_else(|| {
            LeadCaptureError::Persistence(format!("lead {} has an empty session_id", record.id))
        })?;
        let industry: Industry = record
            .industry
            .parse()
            .map_err(|e| LeadCaptureError::Persistence(format!("lead {}: {}", record.id, e)))?;
        Ok(Lead {
            id: LeadId::from(record.id),
            name: record.name,
            email: record.email,
            industry,
            session_id,
            submitted_at: record.created_at,
        })
    }
}

/// Lead store over a Postgres pool.
///
/// # Example
/// ```ignore
/// use leadcapture::storage::postgres::{PostgresLeadStore, migrator};
/// use sqlx::PgPool;
///
/// let pool = PgPool::connect("postgresql://localhost/leads").await?;
/// migrator().run(&pool).await?;
/// let store = PostgresLeadStore::new(pool);
/// ```
#[derive(Clone)]
pub struct PostgresLeadStore {
    pool: PgPool,
}

impl PostgresLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LeadStore for PostgresLeadStore {
    #[tracing::instrument(skip(self, lead), fields(session_id = %lead.session_id, industry = %lead.industry))]
    async fn insert_lead(&self, lead: &NewLead) -> Result<Lead> {
        let record = sqlx::query_as::<_, LeadRecord>(
            r#"
            INSERT INTO leads (name, email, industry, session_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, industry, session_id, created_at
            "#,
        )
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(lead.industry.as_str())
        .bind(lead.session_id.as_str())
        .bind(lead.submitted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to insert lead");
            LeadCaptureError::Persistence(e.to_string())
        })?;

        let stored = Lead::try_from(record)?;
        tracing::info!(
            lead_id = %stored.id,
            email = %mask_email(&stored.email),
            "Lead stored"
        );
        Ok(stored)
    }

    #[tracing::instrument(skip(self))]
    async fn list_session_leads(&self, session_id: &SessionId) -> Result<Vec<Lead>> {
        let records = sqlx::query_as::<_, LeadRecord>(
            r#"
            SELECT id, name, email, industry, session_id, created_at
            FROM leads
            WHERE session_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(session_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list session leads");
            LeadCaptureError::Persistence(e.to_string())
        })?;

        records.into_iter().map(Lead::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_lead(name: &str, session_id: &SessionId, minutes_ago: i64) -> NewLead {
        NewLead {
            name: name.to_string(),
            email: format!("{}@x.com", name.to_lowercase()),
            industry: Industry::Healthcare,
            session_id: session_id.clone(),
            submitted_at: Utc::now() - chrono::Duration::minutes(minutes_ago),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_insert_and_list_session_leads(pool: PgPool) {
        let store = PostgresLeadStore::new(pool);
        let session = SessionId::generate();

        let first = store.insert_lead(&new_lead("Ana", &session, 5)).await.unwrap();
        let second = store.insert_lead(&new_lead("Bo", &session, 1)).await.unwrap();
        store
            .insert_lead(&new_lead("Cy", &SessionId::generate(), 0))
            .await
            .unwrap();

        assert_eq!(first.industry, Industry::Healthcare);
        assert_eq!(first.session_id, session);

        let leads = store.list_session_leads(&session).await.unwrap();
        let ids: Vec<LeadId> = leads.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_database_failures_are_persistence_errors(pool: PgPool) {
        sqlx::query("DROP TABLE leads")
            .execute(&pool)
            .await
            .unwrap();
        let store = PostgresLeadStore::new(pool);
        let session = SessionId::generate();

        let err = store
            .insert_lead(&new_lead("Ana", &session, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, LeadCaptureError::Persistence(_)));

        let err = store.list_session_leads(&session).await.unwrap_err();
        assert!(matches!(err, LeadCaptureError::Persistence(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_industry_defaults_to_other(pool: PgPool) {
        sqlx::query("INSERT INTO leads (name, email, session_id) VALUES ('Ana', 'ana@x.com', 's1')")
            .execute(&pool)
            .await
            .unwrap();

        let store = PostgresLeadStore::new(pool);
        let leads = store
            .list_session_leads(&SessionId::parse("s1").unwrap())
            .await
            .unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].industry, Industry::Other);
    }

    #[sqlx::test(migrations = false)]
    async fn test_industry_migration_backfills_existing_rows(pool: PgPool) {
        sqlx::raw_sql(include_str!("../../migrations/20250101000000_create_leads.sql"))
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO leads (name, email, session_id) VALUES ('Legacy', 'l@x.com', 's0')")
            .execute(&pool)
            .await
            .unwrap();

        for phase in [
            include_str!("../../migrations/20250201000000_add_lead_industry.sql"),
            include_str!("../../migrations/20250201000001_backfill_lead_industry.sql"),
            include_str!("../../migrations/20250201000002_require_lead_industry.sql"),
            include_str!("../../migrations/20250201000003_default_lead_industry.sql"),
        ] {
            sqlx::raw_sql(phase).execute(&pool).await.unwrap();
        }

        let industry: String =
            sqlx::query_scalar("SELECT industry FROM leads WHERE name = 'Legacy'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(industry, "other");

        let rejected =
            sqlx::query("INSERT INTO leads (name, email, industry, session_id) VALUES ('N', 'n@x.com', NULL, 's0')")
                .execute(&pool)
                .await;
        assert!(rejected.is_err(), "industry must be NOT NULL after migration");
    }
}
