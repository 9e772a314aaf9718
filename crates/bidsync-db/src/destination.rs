//! Destination (bidding platform) database repository.
//!
//! Inserts return the key assigned by the database through `RETURNING id`.
//! Insert and update statements of a record share one bind macro, so both
//! write the same column set in the same order.

use bidsync_core::error::AppError;
use bidsync_core::legacy::LinkRole;
use bidsync_core::models::{
    Addendum, Address, BusinessEntity, Contact, EntityLink, EstCostDetail, MemberProfile,
    PartyKey, PreBidInfo, ProjCounty, Project,
};
use bidsync_core::traits::DestinationStore;
use sqlx::postgres::PgQueryResult;
use sqlx::{PgPool, Pool, Postgres};

/// Column lists for SELECT queries. Must remain const literals since the
/// queries are assembled with format!().
const ENTITY_COLUMNS: &str = "id, name, dba_name, phone, fax, email, website, contact_name, license_number, trade, ao_type, is_member, is_contractor, is_architect, is_active, old_mem_id, old_con_id, old_ao_id, sync_status";

const PROJECT_COLUMNS: &str = "id, sync_pro_id, proj_number, proj_year, proj_month, arrival_date, \
    title, project_type, scope_of_work, loc_address, loc_city, loc_state, loc_zip, owner_name, \
    bid_date, bid_time, bid_location, bid_bond, performance_bond, payment_bond, plans_available, \
    plan_cost, plan_deposit, deposit_refundable, plans_location, specs_location, prevailing_wage, \
    davis_bacon, dbe_goal, set_aside, completion_days, completion_date, liquidated_damages, \
    contact_name, contact_phone, contact_email, bid_results_posted, award_date, awarded_amount, \
    notes, internal_notes, is_active, is_public, sync_status";

const LINK_COLUMNS: &str = "id, proj_id, business_entity_id, entity_type AS role, entity_name, is_active, proj_number, sync_link_id, sync_status";

const INSERT_ENTITY: &str = r#"
    INSERT INTO business_entities (name, dba_name, phone, fax, email, website, contact_name,
        license_number, trade, ao_type, is_member, is_contractor, is_architect, is_active,
        old_mem_id, old_con_id, old_ao_id, sync_status)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
    RETURNING id
"#;

const UPDATE_ENTITY: &str = r#"
    UPDATE business_entities
    SET name = $1, dba_name = $2, phone = $3, fax = $4, email = $5, website = $6,
        contact_name = $7, license_number = $8, trade = $9, ao_type = $10, is_member = $11,
        is_contractor = $12, is_architect = $13, is_active = $14, old_mem_id = $15,
        old_con_id = $16, old_ao_id = $17, sync_status = $18
    WHERE id = $19
"#;

const INSERT_ADDRESS: &str = r#"
    INSERT INTO addresses (business_entity_id, line1, line2, city, state, zip, sync_status)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    RETURNING id
"#;

const UPDATE_ADDRESS: &str = r#"
    UPDATE addresses
    SET business_entity_id = $1, line1 = $2, line2 = $3, city = $4, state = $5, zip = $6,
        sync_status = $7
    WHERE id = $8
"#;

const INSERT_PROFILE: &str = r#"
    INSERT INTO member_profiles (business_entity_id, member_type, join_date, expiry_date,
        notes, sync_status)
    VALUES ($1, $2, $3, $4, $5, $6)
    RETURNING id
"#;

const UPDATE_PROFILE: &str = r#"
    UPDATE member_profiles
    SET business_entity_id = $1, member_type = $2, join_date = $3, expiry_date = $4,
        notes = $5, sync_status = $6
    WHERE id = $7
"#;

const INSERT_CONTACT: &str = r#"
    INSERT INTO contacts (business_entity_id, first_name, last_name, title, email, phone,
        mobile, is_primary, user_id, sync_contact_id, sync_status)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    RETURNING id
"#;

const UPDATE_CONTACT: &str = r#"
    UPDATE contacts
    SET business_entity_id = $1, first_name = $2, last_name = $3, title = $4, email = $5,
        phone = $6, mobile = $7, is_primary = $8, user_id = $9, sync_contact_id = $10,
        sync_status = $11
    WHERE id = $12
"#;

const INSERT_PROJECT: &str = r#"
    INSERT INTO projects (sync_pro_id, proj_number, proj_year, proj_month, arrival_date,
        title, project_type, scope_of_work, loc_address, loc_city, loc_state, loc_zip,
        owner_name, bid_date, bid_time, bid_location, bid_bond, performance_bond,
        payment_bond, plans_available, plan_cost, plan_deposit, deposit_refundable,
        plans_location, specs_location, prevailing_wage, davis_bacon, dbe_goal, set_aside,
        completion_days, completion_date, liquidated_damages, contact_name, contact_phone,
        contact_email, bid_results_posted, award_date, awarded_amount, notes,
        internal_notes, is_active, is_public, sync_status)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
        $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33, $34, $35,
        $36, $37, $38, $39, $40, $41, $42, $43)
    RETURNING id
"#;

const UPDATE_PROJECT: &str = r#"
    UPDATE projects
    SET sync_pro_id = $1, proj_number = $2, proj_year = $3, proj_month = $4,
        arrival_date = $5, title = $6, project_type = $7, scope_of_work = $8,
        loc_address = $9, loc_city = $10, loc_state = $11, loc_zip = $12, owner_name = $13,
        bid_date = $14, bid_time = $15, bid_location = $16, bid_bond = $17,
        performance_bond = $18, payment_bond = $19, plans_available = $20, plan_cost = $21,
        plan_deposit = $22, deposit_refundable = $23, plans_location = $24,
        specs_location = $25, prevailing_wage = $26, davis_bacon = $27, dbe_goal = $28,
        set_aside = $29, completion_days = $30, completion_date = $31,
        liquidated_damages = $32, contact_name = $33, contact_phone = $34,
        contact_email = $35, bid_results_posted = $36, award_date = $37,
        awarded_amount = $38, notes = $39, internal_notes = $40, is_active = $41,
        is_public = $42, sync_status = $43
    WHERE id = $44
"#;

const INSERT_ADDENDUM: &str = r#"
    INSERT INTO addenda (proj_id, addendum_number, issue_date, description, page_count,
        sync_addendum_id, sync_status)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    RETURNING id
"#;

const UPDATE_ADDENDUM: &str = r#"
    UPDATE addenda
    SET proj_id = $1, addendum_number = $2, issue_date = $3, description = $4,
        page_count = $5, sync_addendum_id = $6, sync_status = $7
    WHERE id = $8
"#;

const INSERT_LINK: &str = r#"
    INSERT INTO entities (proj_id, business_entity_id, entity_type, entity_name, is_active,
        proj_number, sync_link_id, sync_status)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    RETURNING id
"#;

const UPDATE_LINK: &str = r#"
    UPDATE entities
    SET proj_id = $1, business_entity_id = $2, entity_type = $3, entity_name = $4,
        is_active = $5, proj_number = $6, sync_link_id = $7, sync_status = $8
    WHERE id = $9
"#;

/// Binds the mapped columns of `$r` in statement order.
macro_rules! bind_entity {
    ($q:expr, $r:expr) => {
        $q
            .bind(&$r.name)
            .bind(&$r.dba_name)
            .bind(&$r.phone)
            .bind(&$r.fax)
            .bind(&$r.email)
            .bind(&$r.website)
            .bind(&$r.contact_name)
            .bind(&$r.license_number)
            .bind(&$r.trade)
            .bind(&$r.ao_type)
            .bind($r.is_member)
            .bind($r.is_contractor)
            .bind($r.is_architect)
            .bind($r.is_active)
            .bind($r.old_mem_id)
            .bind($r.old_con_id)
            .bind($r.old_ao_id)
            .bind($r.sync_status.code())
    };
}

/// Binds the mapped columns of `$r` in statement order.
macro_rules! bind_address {
    ($q:expr, $r:expr) => {
        $q
            .bind($r.business_entity_id)
            .bind(&$r.line1)
            .bind(&$r.line2)
            .bind(&$r.city)
            .bind(&$r.state)
            .bind(&$r.zip)
            .bind($r.sync_status.code())
    };
}

/// Binds the mapped columns of `$r` in statement order.
macro_rules! bind_profile {
    ($q:expr, $r:expr) => {
        $q
            .bind($r.business_entity_id)
            .bind(&$r.member_type)
            .bind($r.join_date)
            .bind($r.expiry_date)
            .bind(&$r.notes)
            .bind($r.sync_status.code())
    };
}

/// Binds the mapped columns of `$r` in statement order.
macro_rules! bind_contact {
    ($q:expr, $r:expr) => {
        $q
            .bind($r.business_entity_id)
            .bind(&$r.first_name)
            .bind(&$r.last_name)
            .bind(&$r.title)
            .bind(&$r.email)
            .bind(&$r.phone)
            .bind(&$r.mobile)
            .bind($r.is_primary)
            .bind(&$r.user_id)
            .bind($r.sync_contact_id)
            .bind($r.sync_status.code())
    };
}

/// Binds the mapped columns of `$r` in statement order.
macro_rules! bind_project {
    ($q:expr, $r:expr) => {
        $q
            .bind($r.sync_pro_id)
            .bind(&$r.proj_number)
            .bind(&$r.proj_year)
            .bind(&$r.proj_month)
            .bind($r.arrival_date)
            .bind(&$r.title)
            .bind(&$r.project_type)
            .bind(&$r.scope_of_work)
            .bind(&$r.loc_address)
            .bind(&$r.loc_city)
            .bind(&$r.loc_state)
            .bind(&$r.loc_zip)
            .bind(&$r.owner_name)
            .bind($r.bid_date)
            .bind(&$r.bid_time)
            .bind(&$r.bid_location)
            .bind(&$r.bid_bond)
            .bind(&$r.performance_bond)
            .bind(&$r.payment_bond)
            .bind($r.plans_available)
            .bind(&$r.plan_cost)
            .bind(&$r.plan_deposit)
            .bind($r.deposit_refundable)
            .bind(&$r.plans_location)
            .bind(&$r.specs_location)
            .bind($r.prevailing_wage)
            .bind($r.davis_bacon)
            .bind(&$r.dbe_goal)
            .bind(&$r.set_aside)
            .bind($r.completion_days)
            .bind($r.completion_date)
            .bind(&$r.liquidated_damages)
            .bind(&$r.contact_name)
            .bind(&$r.contact_phone)
            .bind(&$r.contact_email)
            .bind($r.bid_results_posted)
            .bind($r.award_date)
            .bind(&$r.awarded_amount)
            .bind(&$r.notes)
            .bind(&$r.internal_notes)
            .bind($r.is_active)
            .bind($r.is_public)
            .bind($r.sync_status.code())
    };
}

/// Binds the mapped columns of `$r` in statement order.
macro_rules! bind_addendum {
    ($q:expr, $r:expr) => {
        $q
            .bind($r.proj_id)
            .bind($r.addendum_number)
            .bind($r.issue_date)
            .bind(&$r.description)
            .bind($r.page_count)
            .bind($r.sync_addendum_id)
            .bind($r.sync_status.code())
    };
}

/// Binds the mapped columns of `$r` in statement order.
macro_rules! bind_link {
    ($q:expr, $r:expr) => {
        $q
            .bind($r.proj_id)
            .bind($r.business_entity_id)
            .bind($r.role.as_str())
            .bind(&$r.entity_name)
            .bind($r.is_active)
            .bind(&$r.proj_number)
            .bind($r.sync_link_id)
            .bind($r.sync_status.code())
    };
}

/// Back-reference column holding a party's legacy id.
fn party_column(key: PartyKey) -> (&'static str, i64) {
    match key {
        PartyKey::Member(id) => ("old_mem_id", id),
        PartyKey::Contractor(id) => ("old_con_id", id),
        PartyKey::ArchOwner(id) => ("old_ao_id", id),
    }
}

/// Fails when an update matched no row, i.e. the record was deleted meanwhile.
fn expect_row(result: PgQueryResult, table: &str, id: i64) -> Result<(), AppError> {
    if result.rows_affected() == 0 {
        return Err(AppError::InvalidData(format!(
            "{} row {} no longer exists",
            table, id
        )));
    }
    Ok(())
}

/// Repository over the destination application database.
///
/// # Examples
///
/// ```no_run
/// use sqlx::postgres::PgPoolOptions;
/// use bidsync_db::DestinationRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = PgPoolOptions::new()
///     .max_connections(5)
///     .connect("postgresql://localhost/bidplatform")
///     .await?;
///
/// let repo = DestinationRepository::new(pool);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DestinationRepository {
    pool: Pool<Postgres>,
}

impl DestinationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DestinationStore for DestinationRepository {
    async fn find_business_entity(&self, key: PartyKey) -> Result<Option<BusinessEntity>, AppError> {
        let (column, id) = party_column(key);
        let query = format!(
            "SELECT {} FROM business_entities WHERE {} = $1 ORDER BY id LIMIT 1",
            ENTITY_COLUMNS, column
        );
        let result = sqlx::query_as::<_, BusinessEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(result)
    }

    async fn insert_business_entity(&self, entity: &BusinessEntity) -> Result<i64, AppError> {
        let rec: (i64,) = bind_entity!(sqlx::query_as(INSERT_ENTITY), entity)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(rec.0)
    }

    async fn update_business_entity(&self, entity: &BusinessEntity) -> Result<(), AppError> {
        let result = bind_entity!(sqlx::query(UPDATE_ENTITY), entity)
            .bind(entity.id)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        expect_row(result, "business_entities", entity.id)
    }

    async fn find_address(&self, business_entity_id: i64) -> Result<Option<Address>, AppError> {
        let result: Option<Address> = sqlx::query_as(
            r#"
            SELECT id, business_entity_id, line1, line2, city, state, zip, sync_status
            FROM addresses
            WHERE business_entity_id = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(business_entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(result)
    }

    async fn insert_address(&self, address: &Address) -> Result<i64, AppError> {
        let rec: (i64,) = bind_address!(sqlx::query_as(INSERT_ADDRESS), address)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(rec.0)
    }

    async fn update_address(&self, address: &Address) -> Result<(), AppError> {
        let result = bind_address!(sqlx::query(UPDATE_ADDRESS), address)
            .bind(address.id)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        expect_row(result, "addresses", address.id)
    }

    async fn find_member_profile(
        &self,
        business_entity_id: i64,
    ) -> Result<Option<MemberProfile>, AppError> {
        let result: Option<MemberProfile> = sqlx::query_as(
            r#"
            SELECT id, business_entity_id, member_type, join_date, expiry_date, notes, sync_status
            FROM member_profiles
            WHERE business_entity_id = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(business_entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(result)
    }

    async fn insert_member_profile(&self, profile: &MemberProfile) -> Result<i64, AppError> {
        let rec: (i64,) = bind_profile!(sqlx::query_as(INSERT_PROFILE), profile)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(rec.0)
    }

    async fn update_member_profile(&self, profile: &MemberProfile) -> Result<(), AppError> {
        let result = bind_profile!(sqlx::query(UPDATE_PROFILE), profile)
            .bind(profile.id)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        expect_row(result, "member_profiles", profile.id)
    }

    async fn find_contact(&self, sync_contact_id: i64) -> Result<Option<Contact>, AppError> {
        let result: Option<Contact> = sqlx::query_as(
            r#"
            SELECT id, business_entity_id, first_name, last_name, title, email, phone, mobile,
                   is_primary, user_id, sync_contact_id, sync_status
            FROM contacts
            WHERE sync_contact_id = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(sync_contact_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(result)
    }

    async fn insert_contact(&self, contact: &Contact) -> Result<i64, AppError> {
        let rec: (i64,) = bind_contact!(sqlx::query_as(INSERT_CONTACT), contact)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(rec.0)
    }

    async fn update_contact(&self, contact: &Contact) -> Result<(), AppError> {
        let result = bind_contact!(sqlx::query(UPDATE_CONTACT), contact)
            .bind(contact.id)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        expect_row(result, "contacts", contact.id)
    }

    async fn set_contact_login(&self, contact_id: i64, user_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE contacts SET user_id = $1 WHERE id = $2")
            .bind(user_id)
            .bind(contact_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        expect_row(result, "contacts", contact_id)
    }

    async fn find_project(&self, sync_pro_id: i64) -> Result<Option<Project>, AppError> {
        let query = format!(
            "SELECT {} FROM projects WHERE sync_pro_id = $1 ORDER BY id LIMIT 1",
            PROJECT_COLUMNS
        );
        let result = sqlx::query_as::<_, Project>(&query)
            .bind(sync_pro_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(result)
    }

    async fn insert_project(&self, project: &Project) -> Result<i64, AppError> {
        let rec: (i64,) = bind_project!(sqlx::query_as(INSERT_PROJECT), project)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(rec.0)
    }

    async fn update_project(&self, project: &Project) -> Result<(), AppError> {
        let result = bind_project!(sqlx::query(UPDATE_PROJECT), project)
            .bind(project.id)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        expect_row(result, "projects", project.id)
    }

    async fn count_projects_with_prefix(&self, prefix: &str) -> Result<i64, AppError> {
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects WHERE proj_number LIKE $1")
            .bind(format!("{}%", prefix))
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(rec.0)
    }

    async fn find_county_id(&self, name: &str, state: &str) -> Result<Option<i64>, AppError> {
        let rec: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT id
            FROM counties
            WHERE LOWER(name) = LOWER($1) AND LOWER(state) = LOWER($2)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(name.trim())
        .bind(state.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(rec.map(|r| r.0))
    }

    async fn delete_proj_counties(&self, proj_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM proj_counties WHERE proj_id = $1")
            .bind(proj_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(result.rows_affected())
    }

    async fn insert_proj_county(&self, county: &ProjCounty) -> Result<i64, AppError> {
        let rec: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO proj_counties (proj_id, county_id, sync_pro_county_id, sync_status)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(county.proj_id)
        .bind(county.county_id)
        .bind(county.sync_pro_county_id)
        .bind(county.sync_status.code())
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(rec.0)
    }

    async fn delete_pre_bids(&self, proj_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM pre_bid_info WHERE proj_id = $1")
            .bind(proj_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(result.rows_affected())
    }

    async fn insert_pre_bid(&self, pre_bid: &PreBidInfo) -> Result<i64, AppError> {
        let rec: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO pre_bid_info (
                proj_id, pre_bid_date, location, is_mandatory, sort_order, sync_pro_id, sync_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(pre_bid.proj_id)
        .bind(pre_bid.pre_bid_date)
        .bind(&pre_bid.location)
        .bind(pre_bid.is_mandatory)
        .bind(pre_bid.sort_order)
        .bind(pre_bid.sync_pro_id)
        .bind(pre_bid.sync_status.code())
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(rec.0)
    }

    async fn delete_est_costs(&self, proj_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM est_cost_details WHERE proj_id = $1")
            .bind(proj_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(result.rows_affected())
    }

    async fn insert_est_cost(&self, cost: &EstCostDetail) -> Result<i64, AppError> {
        let rec: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO est_cost_details (
                proj_id, cost_from, cost_to, description, range_sign, sort_order,
                sync_pro_id, sync_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(cost.proj_id)
        .bind(&cost.cost_from)
        .bind(&cost.cost_to)
        .bind(&cost.description)
        .bind(cost.range_sign.as_str())
        .bind(cost.sort_order)
        .bind(cost.sync_pro_id)
        .bind(cost.sync_status.code())
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(rec.0)
    }

    async fn find_addendum(&self, sync_addendum_id: i64) -> Result<Option<Addendum>, AppError> {
        let result: Option<Addendum> = sqlx::query_as(
            r#"
            SELECT id, proj_id, addendum_number, issue_date, description, page_count,
                   sync_addendum_id, sync_status
            FROM addenda
            WHERE sync_addendum_id = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(sync_addendum_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(result)
    }

    async fn insert_addendum(&self, addendum: &Addendum) -> Result<i64, AppError> {
        let rec: (i64,) = bind_addendum!(sqlx::query_as(INSERT_ADDENDUM), addendum)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(rec.0)
    }

    async fn update_addendum(&self, addendum: &Addendum) -> Result<(), AppError> {
        let result = bind_addendum!(sqlx::query(UPDATE_ADDENDUM), addendum)
            .bind(addendum.id)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        expect_row(result, "addenda", addendum.id)
    }

    async fn find_entity_link(
        &self,
        sync_link_id: i64,
        role: LinkRole,
    ) -> Result<Option<EntityLink>, AppError> {
        let query = format!(
            "SELECT {} FROM entities WHERE sync_link_id = $1 AND entity_type = $2 ORDER BY id LIMIT 1",
            LINK_COLUMNS
        );
        let result = sqlx::query_as::<_, EntityLink>(&query)
            .bind(sync_link_id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(result)
    }

    async fn insert_entity_link(&self, link: &EntityLink) -> Result<i64, AppError> {
        let rec: (i64,) = bind_link!(sqlx::query_as(INSERT_LINK), link)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(rec.0)
    }

    async fn update_entity_link(&self, link: &EntityLink) -> Result<(), AppError> {
        let result = bind_link!(sqlx::query(UPDATE_LINK), link)
            .bind(link.id)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        expect_row(result, "entities", link.id)
    }
}
