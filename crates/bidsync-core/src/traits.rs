//! Collaborator traits consumed by the reconciliation engine.
//!
//! The engine is generic over these traits so that the PostgreSQL
//! repositories, the identity API client and the upload-folder provisioner
//! can be swapped for in-memory fakes in tests.

use std::fmt;
use std::future::Future;

use crate::error::AppError;
use crate::legacy::{
    LinkRole, SourceAddendum, SourceArchOwner, SourceContact, SourceContractor, SourceMember,
    SourceProject, SourceProjectCounty, SourceProjectLink,
};
use crate::mapper::ProjectNumber;
use crate::models::{
    Addendum, Address, BusinessEntity, Contact, EntityLink, EstCostDetail, MemberProfile,
    PartyKey, PreBidInfo, ProjCounty, Project,
};

/// Source tables whose `sync_status` the engine flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceTable {
    Members,
    MemberContacts,
    Contractors,
    ArchOwners,
    Projects,
    ProjectCounties,
    Addenda,
    ProjectContractors,
    ProjectArchOwners,
}

impl SourceTable {
    /// Table name in the legacy database.
    pub fn table_name(self) -> &'static str {
        match self {
            SourceTable::Members => "members",
            SourceTable::MemberContacts => "member_contacts",
            SourceTable::Contractors => "contractors",
            SourceTable::ArchOwners => "arch_owners",
            SourceTable::Projects => "projects",
            SourceTable::ProjectCounties => "project_counties",
            SourceTable::Addenda => "addenda",
            SourceTable::ProjectContractors => "project_contractors",
            SourceTable::ProjectArchOwners => "project_arch_owners",
        }
    }

    /// Link table holding rows of the given role.
    pub fn for_link(role: LinkRole) -> Self {
        match role {
            LinkRole::Contractor => SourceTable::ProjectContractors,
            LinkRole::ArchOwner => SourceTable::ProjectArchOwners,
        }
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Read access to pending legacy rows and write access to their status flag.
pub trait SourceStore: Send + Sync {
    /// Members with status `New` or `Updated`.
    fn pending_members(&self) -> impl Future<Output = Result<Vec<SourceMember>, AppError>> + Send;

    fn pending_contacts(
        &self,
    ) -> impl Future<Output = Result<Vec<SourceContact>, AppError>> + Send;

    fn pending_contractors(
        &self,
    ) -> impl Future<Output = Result<Vec<SourceContractor>, AppError>> + Send;

    fn pending_arch_owners(
        &self,
    ) -> impl Future<Output = Result<Vec<SourceArchOwner>, AppError>> + Send;

    fn pending_projects(
        &self,
    ) -> impl Future<Output = Result<Vec<SourceProject>, AppError>> + Send;

    fn pending_addenda(
        &self,
    ) -> impl Future<Output = Result<Vec<SourceAddendum>, AppError>> + Send;

    /// Pending link rows of one role.
    fn pending_project_links(
        &self,
        role: LinkRole,
    ) -> impl Future<Output = Result<Vec<SourceProjectLink>, AppError>> + Send;

    /// Every county row of a project, regardless of status.
    fn project_counties(
        &self,
        project_id: i64,
    ) -> impl Future<Output = Result<Vec<SourceProjectCounty>, AppError>> + Send;

    /// Flips one row to `Synced`. Only rows currently `New` or `Updated` are
    /// touched; returns whether a row changed.
    fn mark_synced(
        &self,
        table: SourceTable,
        id: i64,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Stamps "synced at" on unstamped change-log rows of a project whose
    /// field name is in `fields`. Returns the number of stamped rows.
    fn stamp_change_log(
        &self,
        project_id: i64,
        fields: &[&str],
    ) -> impl Future<Output = Result<u64, AppError>> + Send;
}

/// Create/find/update/delete access to the destination application database.
///
/// Inserts ignore the record's `id` and return the key assigned by the store.
pub trait DestinationStore: Send + Sync {
    fn find_business_entity(
        &self,
        key: PartyKey,
    ) -> impl Future<Output = Result<Option<BusinessEntity>, AppError>> + Send;

    fn insert_business_entity(
        &self,
        entity: &BusinessEntity,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    fn update_business_entity(
        &self,
        entity: &BusinessEntity,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// First address owned by a business entity.
    fn find_address(
        &self,
        business_entity_id: i64,
    ) -> impl Future<Output = Result<Option<Address>, AppError>> + Send;

    fn insert_address(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    fn update_address(&self, address: &Address)
        -> impl Future<Output = Result<(), AppError>> + Send;

    /// First member profile owned by a business entity.
    fn find_member_profile(
        &self,
        business_entity_id: i64,
    ) -> impl Future<Output = Result<Option<MemberProfile>, AppError>> + Send;

    fn insert_member_profile(
        &self,
        profile: &MemberProfile,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    fn update_member_profile(
        &self,
        profile: &MemberProfile,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn find_contact(
        &self,
        sync_contact_id: i64,
    ) -> impl Future<Output = Result<Option<Contact>, AppError>> + Send;

    fn insert_contact(&self, contact: &Contact)
        -> impl Future<Output = Result<i64, AppError>> + Send;

    fn update_contact(&self, contact: &Contact)
        -> impl Future<Output = Result<(), AppError>> + Send;

    /// Stores the identity-provider user id on a contact.
    fn set_contact_login(
        &self,
        contact_id: i64,
        user_id: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn find_project(
        &self,
        sync_pro_id: i64,
    ) -> impl Future<Output = Result<Option<Project>, AppError>> + Send;

    fn insert_project(&self, project: &Project)
        -> impl Future<Output = Result<i64, AppError>> + Send;

    fn update_project(&self, project: &Project)
        -> impl Future<Output = Result<(), AppError>> + Send;

    /// Number of projects whose number starts with `prefix`.
    fn count_projects_with_prefix(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    /// Destination county id by name and state.
    fn find_county_id(
        &self,
        name: &str,
        state: &str,
    ) -> impl Future<Output = Result<Option<i64>, AppError>> + Send;

    fn delete_proj_counties(
        &self,
        proj_id: i64,
    ) -> impl Future<Output = Result<u64, AppError>> + Send;

    fn insert_proj_county(
        &self,
        county: &ProjCounty,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    fn delete_pre_bids(&self, proj_id: i64) -> impl Future<Output = Result<u64, AppError>> + Send;

    fn insert_pre_bid(
        &self,
        pre_bid: &PreBidInfo,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    fn delete_est_costs(&self, proj_id: i64)
        -> impl Future<Output = Result<u64, AppError>> + Send;

    fn insert_est_cost(
        &self,
        cost: &EstCostDetail,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    fn find_addendum(
        &self,
        sync_addendum_id: i64,
    ) -> impl Future<Output = Result<Option<Addendum>, AppError>> + Send;

    fn insert_addendum(
        &self,
        addendum: &Addendum,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    fn update_addendum(
        &self,
        addendum: &Addendum,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn find_entity_link(
        &self,
        sync_link_id: i64,
        role: LinkRole,
    ) -> impl Future<Output = Result<Option<EntityLink>, AppError>> + Send;

    fn insert_entity_link(
        &self,
        link: &EntityLink,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    fn update_entity_link(
        &self,
        link: &EntityLink,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Whether an error returned by this store is a lock/timeout-class fault.
    fn is_transient(&self, err: &AppError) -> bool {
        err.is_transient()
    }
}

/// Creates the upload folder tree of a newly inserted project.
pub trait FolderProvisioner: Send + Sync {
    fn provision(
        &self,
        number: &ProjectNumber,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Creates application logins for member contacts.
pub trait CredentialProvisioner: Send + Sync {
    /// Creates a login, assigns `role`, and returns the new user id.
    fn create_login(
        &self,
        email: &str,
        password: &str,
        role: &str,
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}
