//! Legacy source database repository.
//!
//! Only rows flagged `New` or `Updated` are read, and the only write issued
//! against the legacy tables is the flip to `Synced`, guarded so that a row
//! whose flag was reset meanwhile is left alone.

use bidsync_core::error::AppError;
use bidsync_core::legacy::{
    LinkRole, SourceAddendum, SourceArchOwner, SourceContact, SourceContractor, SourceMember,
    SourceProject, SourceProjectCounty, SourceProjectLink,
};
use bidsync_core::status::SyncStatus;
use bidsync_core::traits::{SourceStore, SourceTable};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Pool, Postgres};
use tracing::debug;

/// Column lists for SELECT queries. Must remain const literals since the
/// queries are assembled with format!().
const MEMBER_COLUMNS: &str = "id, company_name, dba_name, address1, address2, city, state, zip, phone, fax, email, website, member_type, is_active, join_date, expiry_date, notes, sync_status";

const CONTACT_COLUMNS: &str = "id, member_id, first_name, last_name, title, email, phone, mobile, password, is_primary, sync_status";

const CONTRACTOR_COLUMNS: &str = "id, name, address1, address2, city, state, zip, phone, fax, email, website, contact_name, license_number, trade, is_active, sync_status";

const ARCH_OWNER_COLUMNS: &str = "id, name, ao_type, address1, address2, city, state, zip, phone, fax, email, website, contact_name, is_active, sync_status";

const PROJECT_COLUMNS: &str = "id, proj_number, arrival_date, title, proj_type, scope, \
    location_address, location_city, location_state, location_zip, owner_name, \
    bid_date, bid_time, bid_location, bid_bond, perf_bond, payment_bond, \
    plans_available, plan_cost, plan_deposit, deposit_refundable, plans_location, specs_location, \
    prevailing_wage, davis_bacon, dbe_goal, set_aside, completion_days, completion_date, \
    liquidated_damages, contact_name, contact_phone, contact_email, bid_results_posted, \
    award_date, awarded_amount, notes, internal_notes, is_active, is_public, \
    pre_bid_date1, pre_bid_loc1, pre_bid_mandatory1, pre_bid_date2, pre_bid_loc2, pre_bid_mandatory2, \
    est_cost1, est_cost2, est_cost3, est_cost4, sync_status";

const ADDENDUM_COLUMNS: &str = "id, project_id, addendum_number, issue_date, description, page_count, sync_status";

/// Status codes selected by the pending queries.
fn pending_codes() -> Vec<i16> {
    vec![SyncStatus::New.code(), SyncStatus::Updated.code()]
}

fn pending_query(columns: &str, table: SourceTable) -> String {
    format!(
        "SELECT {} FROM {} WHERE sync_status = ANY($1) ORDER BY id",
        columns,
        table.table_name()
    )
}

fn link_query(role: LinkRole) -> String {
    let party_column = match role {
        LinkRole::Contractor => "contractor_id",
        LinkRole::ArchOwner => "arch_owner_id",
    };
    format!(
        "SELECT id, project_id, {} AS party_id, '{}'::text AS role, sync_status FROM {} WHERE sync_status = ANY($1) ORDER BY id",
        party_column,
        role.as_str(),
        SourceTable::for_link(role).table_name()
    )
}

fn mark_synced_query(table: SourceTable) -> String {
    format!(
        "UPDATE {} SET sync_status = $1 WHERE id = $2 AND sync_status = ANY($3)",
        table.table_name()
    )
}

/// Repository over the legacy source database.
///
/// # Examples
///
/// ```no_run
/// use sqlx::postgres::PgPoolOptions;
/// use bidsync_db::SourceRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = PgPoolOptions::new()
///     .max_connections(5)
///     .connect("postgresql://localhost/legacy")
///     .await?;
///
/// let repo = SourceRepository::new(pool);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SourceRepository {
    pool: Pool<Postgres>,
}

impl SourceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_pending<T>(&self, columns: &str, table: SourceTable) -> Result<Vec<T>, AppError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let query = pending_query(columns, table);
        let rows = sqlx::query_as::<_, T>(&query)
            .bind(pending_codes())
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        debug!(table = %table, count = rows.len(), "Fetched pending rows");
        Ok(rows)
    }
}

impl SourceStore for SourceRepository {
    async fn pending_members(&self) -> Result<Vec<SourceMember>, AppError> {
        self.fetch_pending(MEMBER_COLUMNS, SourceTable::Members).await
    }

    async fn pending_contacts(&self) -> Result<Vec<SourceContact>, AppError> {
        self.fetch_pending(CONTACT_COLUMNS, SourceTable::MemberContacts)
            .await
    }

    async fn pending_contractors(&self) -> Result<Vec<SourceContractor>, AppError> {
        self.fetch_pending(CONTRACTOR_COLUMNS, SourceTable::Contractors)
            .await
    }

    async fn pending_arch_owners(&self) -> Result<Vec<SourceArchOwner>, AppError> {
        self.fetch_pending(ARCH_OWNER_COLUMNS, SourceTable::ArchOwners)
            .await
    }

    async fn pending_projects(&self) -> Result<Vec<SourceProject>, AppError> {
        self.fetch_pending(PROJECT_COLUMNS, SourceTable::Projects)
            .await
    }

    async fn pending_addenda(&self) -> Result<Vec<SourceAddendum>, AppError> {
        self.fetch_pending(ADDENDUM_COLUMNS, SourceTable::Addenda)
            .await
    }

    async fn pending_project_links(
        &self,
        role: LinkRole,
    ) -> Result<Vec<SourceProjectLink>, AppError> {
        let query = link_query(role);
        let rows = sqlx::query_as::<_, SourceProjectLink>(&query)
            .bind(pending_codes())
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(rows)
    }

    async fn project_counties(
        &self,
        project_id: i64,
    ) -> Result<Vec<SourceProjectCounty>, AppError> {
        let rows: Vec<SourceProjectCounty> = sqlx::query_as(
            r#"
            SELECT pc.id, pc.project_id, c.name AS county_name, c.state, pc.sync_status
            FROM project_counties pc
            JOIN counties c ON c.id = pc.county_id
            WHERE pc.project_id = $1
            ORDER BY pc.id
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(rows)
    }

    async fn mark_synced(&self, table: SourceTable, id: i64) -> Result<bool, AppError> {
        let query = mark_synced_query(table);
        let result = sqlx::query(&query)
            .bind(SyncStatus::Synced.code())
            .bind(id)
            .bind(pending_codes())
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(result.rows_affected() > 0)
    }

    async fn stamp_change_log(&self, project_id: i64, fields: &[&str]) -> Result<u64, AppError> {
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        let result = sqlx::query(
            r#"
            UPDATE project_change_log
            SET synced_at = NOW()
            WHERE project_id = $1
              AND synced_at IS NULL
              AND field_name = ANY($2)
            "#,
        )
        .bind(project_id)
        .bind(fields)
        .execute(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_codes() {
        assert_eq!(pending_codes(), vec![1, 2]);
    }

    #[test]
    fn test_pending_query() {
        let query = pending_query(MEMBER_COLUMNS, SourceTable::Members);
        assert!(query.starts_with("SELECT id, company_name"));
        assert!(query.contains("FROM members WHERE sync_status = ANY($1)"));
        assert!(query.ends_with("ORDER BY id"));
    }

    #[test]
    fn test_link_query_aliases_party_and_role() {
        let query = link_query(LinkRole::ArchOwner);
        assert!(query.contains("arch_owner_id AS party_id"));
        assert!(query.contains("'arch_owner'::text AS role"));
        assert!(query.contains("FROM project_arch_owners"));

        let query = link_query(LinkRole::Contractor);
        assert!(query.contains("contractor_id AS party_id"));
        assert!(query.contains("FROM project_contractors"));
    }

    #[test]
    fn test_mark_synced_is_guarded() {
        let query = mark_synced_query(SourceTable::ProjectCounties);
        assert_eq!(
            query,
            "UPDATE project_counties SET sync_status = $1 WHERE id = $2 AND sync_status = ANY($3)"
        );
    }

    #[test]
    fn test_project_columns_cover_struct() {
        let columns: Vec<&str> = PROJECT_COLUMNS.split(',').map(str::trim).collect();
        for expected in ["proj_number", "pre_bid_mandatory2", "est_cost4", "sync_status"] {
            assert!(columns.contains(&expected), "missing {}", expected);
        }
        assert_eq!(columns.len(), 51);
    }
}
