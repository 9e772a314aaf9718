//! In-memory stores and provisioners for engine tests.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Mutex;

use crate::error::AppError;
use crate::legacy::{
    LinkRole, SourceAddendum, SourceArchOwner, SourceContact, SourceContractor, SourceMember,
    SourceProject, SourceProjectCounty, SourceProjectLink, SourceRow,
};
use crate::mapper::ProjectNumber;
use crate::models::{
    Addendum, Address, BusinessEntity, Contact, EntityLink, EstCostDetail, MemberProfile,
    PartyKey, PreBidInfo, ProjCounty, Project,
};
use crate::status::SyncStatus;
use crate::sync::EntityKind;
use crate::traits::{
    CredentialProvisioner, DestinationStore, FolderProvisioner, SourceStore, SourceTable,
};

#[derive(Default)]
struct SourceState {
    members: BTreeMap<i64, SourceMember>,
    contacts: BTreeMap<i64, SourceContact>,
    contractors: BTreeMap<i64, SourceContractor>,
    arch_owners: BTreeMap<i64, SourceArchOwner>,
    projects: BTreeMap<i64, SourceProject>,
    counties: BTreeMap<i64, SourceProjectCounty>,
    addenda: BTreeMap<i64, SourceAddendum>,
    contractor_links: BTreeMap<i64, SourceProjectLink>,
    arch_owner_links: BTreeMap<i64, SourceProjectLink>,
    status_writes: Vec<(SourceTable, i64, SyncStatus)>,
    change_log_stamps: Vec<i64>,
    failing_kinds: HashSet<EntityKind>,
    fail_counties: bool,
    fail_change_log: bool,
}

impl SourceState {
    fn status_mut(&mut self, table: SourceTable, id: i64) -> Option<&mut SyncStatus> {
        match table {
            SourceTable::Members => self.members.get_mut(&id).map(|r| &mut r.sync_status),
            SourceTable::MemberContacts => self.contacts.get_mut(&id).map(|r| &mut r.sync_status),
            SourceTable::Contractors => self.contractors.get_mut(&id).map(|r| &mut r.sync_status),
            SourceTable::ArchOwners => self.arch_owners.get_mut(&id).map(|r| &mut r.sync_status),
            SourceTable::Projects => self.projects.get_mut(&id).map(|r| &mut r.sync_status),
            SourceTable::ProjectCounties => self.counties.get_mut(&id).map(|r| &mut r.sync_status),
            SourceTable::Addenda => self.addenda.get_mut(&id).map(|r| &mut r.sync_status),
            SourceTable::ProjectContractors => {
                self.contractor_links.get_mut(&id).map(|r| &mut r.sync_status)
            }
            SourceTable::ProjectArchOwners => {
                self.arch_owner_links.get_mut(&id).map(|r| &mut r.sync_status)
            }
        }
    }

    fn check(&self, kind: EntityKind) -> Result<(), AppError> {
        if self.failing_kinds.contains(&kind) {
            return Err(AppError::Generic(format!("{} table unavailable", kind)));
        }
        Ok(())
    }
}

fn pending<R: SourceRow + Clone>(rows: &BTreeMap<i64, R>) -> Vec<R> {
    rows.values()
        .filter(|r| r.sync_status().needs_sync())
        .cloned()
        .collect()
}

/// Legacy database held in memory. Adding a row with an existing id replaces it.
#[derive(Default)]
pub struct MemorySource {
    state: Mutex<SourceState>,
}

impl MemorySource {
    fn lock(&self) -> std::sync::MutexGuard<'_, SourceState> {
        self.state.lock().unwrap()
    }

    pub fn add_member(&self, row: SourceMember) {
        self.lock().members.insert(row.id, row);
    }

    pub fn add_contact(&self, row: SourceContact) {
        self.lock().contacts.insert(row.id, row);
    }

    pub fn add_contractor(&self, row: SourceContractor) {
        self.lock().contractors.insert(row.id, row);
    }

    pub fn add_arch_owner(&self, row: SourceArchOwner) {
        self.lock().arch_owners.insert(row.id, row);
    }

    pub fn add_project(&self, row: SourceProject) {
        self.lock().projects.insert(row.id, row);
    }

    pub fn add_county(&self, row: SourceProjectCounty) {
        self.lock().counties.insert(row.id, row);
    }

    pub fn remove_county(&self, id: i64) {
        self.lock().counties.remove(&id);
    }

    pub fn add_addendum(&self, row: SourceAddendum) {
        self.lock().addenda.insert(row.id, row);
    }

    pub fn add_link(&self, row: SourceProjectLink) {
        let mut state = self.lock();
        match row.role {
            LinkRole::Contractor => state.contractor_links.insert(row.id, row),
            LinkRole::ArchOwner => state.arch_owner_links.insert(row.id, row),
        };
    }

    pub fn status_of(&self, table: SourceTable, id: i64) -> Option<SyncStatus> {
        self.lock().status_mut(table, id).map(|s| *s)
    }

    /// Every status write issued by the engine, in order.
    pub fn status_writes(&self) -> Vec<(SourceTable, i64, SyncStatus)> {
        self.lock().status_writes.clone()
    }

    pub fn change_log_stamps(&self) -> Vec<i64> {
        self.lock().change_log_stamps.clone()
    }

    pub fn fail_pending(&self, kind: EntityKind) {
        self.lock().failing_kinds.insert(kind);
    }

    pub fn fail_county_query(&self) {
        self.lock().fail_counties = true;
    }

    pub fn fail_change_log(&self) {
        self.lock().fail_change_log = true;
    }
}

impl SourceStore for MemorySource {
    async fn pending_members(&self) -> Result<Vec<SourceMember>, AppError> {
        let state = self.lock();
        state.check(EntityKind::Member)?;
        Ok(pending(&state.members))
    }

    async fn pending_contacts(&self) -> Result<Vec<SourceContact>, AppError> {
        let state = self.lock();
        state.check(EntityKind::Contact)?;
        Ok(pending(&state.contacts))
    }

    async fn pending_contractors(&self) -> Result<Vec<SourceContractor>, AppError> {
        let state = self.lock();
        state.check(EntityKind::Contractor)?;
        Ok(pending(&state.contractors))
    }

    async fn pending_arch_owners(&self) -> Result<Vec<SourceArchOwner>, AppError> {
        let state = self.lock();
        state.check(EntityKind::ArchOwner)?;
        Ok(pending(&state.arch_owners))
    }

    async fn pending_projects(&self) -> Result<Vec<SourceProject>, AppError> {
        let state = self.lock();
        state.check(EntityKind::Project)?;
        Ok(pending(&state.projects))
    }

    async fn pending_addenda(&self) -> Result<Vec<SourceAddendum>, AppError> {
        let state = self.lock();
        state.check(EntityKind::Addendum)?;
        Ok(pending(&state.addenda))
    }

    async fn pending_project_links(
        &self,
        role: LinkRole,
    ) -> Result<Vec<SourceProjectLink>, AppError> {
        let state = self.lock();
        match role {
            LinkRole::Contractor => {
                state.check(EntityKind::ContractorLink)?;
                Ok(pending(&state.contractor_links))
            }
            LinkRole::ArchOwner => {
                state.check(EntityKind::ArchOwnerLink)?;
                Ok(pending(&state.arch_owner_links))
            }
        }
    }

    async fn project_counties(
        &self,
        project_id: i64,
    ) -> Result<Vec<SourceProjectCounty>, AppError> {
        let state = self.lock();
        if state.fail_counties {
            return Err(AppError::LockTimeout("project_counties".to_string()));
        }
        Ok(state
            .counties
            .values()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn mark_synced(&self, table: SourceTable, id: i64) -> Result<bool, AppError> {
        let mut state = self.lock();
        let changed = match state.status_mut(table, id) {
            Some(status) if status.needs_sync() => {
                *status = SyncStatus::Synced;
                true
            }
            _ => false,
        };
        if changed {
            state.status_writes.push((table, id, SyncStatus::Synced));
        }
        Ok(changed)
    }

    async fn stamp_change_log(&self, project_id: i64, fields: &[&str]) -> Result<u64, AppError> {
        let mut state = self.lock();
        if state.fail_change_log {
            return Err(AppError::Generic("change log locked".to_string()));
        }
        state.change_log_stamps.push(project_id);
        Ok(fields.len() as u64)
    }
}

#[derive(Default)]
struct DestinationState {
    next_id: i64,
    entities: Vec<BusinessEntity>,
    addresses: Vec<Address>,
    profiles: Vec<MemberProfile>,
    contacts: Vec<Contact>,
    projects: Vec<Project>,
    counties: Vec<(i64, String, String)>,
    proj_counties: Vec<ProjCounty>,
    pre_bids: Vec<PreBidInfo>,
    est_costs: Vec<EstCostDetail>,
    addenda: Vec<Addendum>,
    links: Vec<EntityLink>,
    project_insert_failures: VecDeque<AppError>,
    project_insert_attempts: usize,
}

impl DestinationState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Inserts a record under a fresh id.
macro_rules! insert_row {
    ($state:expr, $field:ident, $record:expr) => {{
        let id = $state.next_id();
        let mut record = $record.clone();
        record.id = id;
        $state.$field.push(record);
        Ok(id)
    }};
}

/// Replaces the record with the same id.
macro_rules! update_row {
    ($state:expr, $field:ident, $record:expr) => {{
        match $state.$field.iter_mut().find(|r| r.id == $record.id) {
            Some(slot) => {
                *slot = $record.clone();
                Ok(())
            }
            None => Err(AppError::Generic(format!(
                "no {} row with id {}",
                stringify!($field),
                $record.id
            ))),
        }
    }};
}

/// Destination database held in memory.
#[derive(Default)]
pub struct MemoryDestination {
    state: Mutex<DestinationState>,
}

impl MemoryDestination {
    fn lock(&self) -> std::sync::MutexGuard<'_, DestinationState> {
        self.state.lock().unwrap()
    }

    pub fn business_entities(&self) -> Vec<BusinessEntity> {
        self.lock().entities.clone()
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.lock().addresses.clone()
    }

    pub fn member_profiles(&self) -> Vec<MemberProfile> {
        self.lock().profiles.clone()
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.lock().contacts.clone()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.lock().projects.clone()
    }

    pub fn project_by_sync_id(&self, sync_pro_id: i64) -> Option<Project> {
        self.lock()
            .projects
            .iter()
            .find(|p| p.sync_pro_id == sync_pro_id)
            .cloned()
    }

    pub fn proj_counties(&self, proj_id: i64) -> Vec<ProjCounty> {
        self.lock()
            .proj_counties
            .iter()
            .filter(|c| c.proj_id == proj_id)
            .cloned()
            .collect()
    }

    pub fn pre_bids(&self, proj_id: i64) -> Vec<PreBidInfo> {
        self.lock()
            .pre_bids
            .iter()
            .filter(|p| p.proj_id == proj_id)
            .cloned()
            .collect()
    }

    pub fn est_costs(&self, proj_id: i64) -> Vec<EstCostDetail> {
        self.lock()
            .est_costs
            .iter()
            .filter(|c| c.proj_id == proj_id)
            .cloned()
            .collect()
    }

    pub fn addenda(&self) -> Vec<Addendum> {
        self.lock().addenda.clone()
    }

    pub fn entity_links(&self) -> Vec<EntityLink> {
        self.lock().links.clone()
    }

    /// Registers a county in the lookup table.
    pub fn add_county(&self, name: &str, state: &str) {
        let mut s = self.lock();
        let id = s.next_id();
        s.counties.push((id, name.to_string(), state.to_string()));
    }

    pub fn seed_proj_county(&self, proj_id: i64, sync_pro_county_id: i64) {
        let mut s = self.lock();
        let id = s.next_id();
        s.proj_counties.push(ProjCounty {
            id,
            proj_id,
            county_id: 0,
            sync_pro_county_id,
            sync_status: SyncStatus::Unchanged,
        });
    }

    pub fn seed_pre_bid(&self, proj_id: i64) {
        let mut s = self.lock();
        let id = s.next_id();
        s.pre_bids.push(PreBidInfo {
            id,
            proj_id,
            ..Default::default()
        });
    }

    /// Adds a project not linked to any source row, holding `number`.
    pub fn seed_project_number(&self, number: &str) {
        let mut s = self.lock();
        let id = s.next_id();
        let mut project = Project {
            id,
            sync_pro_id: -id,
            ..Default::default()
        };
        if let Ok(parsed) = ProjectNumber::from_explicit(number) {
            parsed.apply_to(&mut project);
        }
        s.projects.push(project);
    }

    /// Queues an error for the next project insert attempt.
    pub fn fail_next_project_insert(&self, err: AppError) {
        self.lock().project_insert_failures.push_back(err);
    }

    pub fn project_insert_attempts(&self) -> usize {
        self.lock().project_insert_attempts
    }
}

impl DestinationStore for MemoryDestination {
    async fn find_business_entity(&self, key: PartyKey) -> Result<Option<BusinessEntity>, AppError> {
        let state = self.lock();
        Ok(state
            .entities
            .iter()
            .find(|e| match key {
                PartyKey::Member(id) => e.old_mem_id == Some(id),
                PartyKey::Contractor(id) => e.old_con_id == Some(id),
                PartyKey::ArchOwner(id) => e.old_ao_id == Some(id),
            })
            .cloned())
    }

    async fn insert_business_entity(&self, entity: &BusinessEntity) -> Result<i64, AppError> {
        let mut state = self.lock();
        insert_row!(state, entities, entity)
    }

    async fn update_business_entity(&self, entity: &BusinessEntity) -> Result<(), AppError> {
        let mut state = self.lock();
        update_row!(state, entities, entity)
    }

    async fn find_address(&self, business_entity_id: i64) -> Result<Option<Address>, AppError> {
        Ok(self
            .lock()
            .addresses
            .iter()
            .find(|a| a.business_entity_id == business_entity_id)
            .cloned())
    }

    async fn insert_address(&self, address: &Address) -> Result<i64, AppError> {
        let mut state = self.lock();
        insert_row!(state, addresses, address)
    }

    async fn update_address(&self, address: &Address) -> Result<(), AppError> {
        let mut state = self.lock();
        update_row!(state, addresses, address)
    }

    async fn find_member_profile(
        &self,
        business_entity_id: i64,
    ) -> Result<Option<MemberProfile>, AppError> {
        Ok(self
            .lock()
            .profiles
            .iter()
            .find(|p| p.business_entity_id == business_entity_id)
            .cloned())
    }

    async fn insert_member_profile(&self, profile: &MemberProfile) -> Result<i64, AppError> {
        let mut state = self.lock();
        insert_row!(state, profiles, profile)
    }

    async fn update_member_profile(&self, profile: &MemberProfile) -> Result<(), AppError> {
        let mut state = self.lock();
        update_row!(state, profiles, profile)
    }

    async fn find_contact(&self, sync_contact_id: i64) -> Result<Option<Contact>, AppError> {
        Ok(self
            .lock()
            .contacts
            .iter()
            .find(|c| c.sync_contact_id == sync_contact_id)
            .cloned())
    }

    async fn insert_contact(&self, contact: &Contact) -> Result<i64, AppError> {
        let mut state = self.lock();
        insert_row!(state, contacts, contact)
    }

    async fn update_contact(&self, contact: &Contact) -> Result<(), AppError> {
        let mut state = self.lock();
        update_row!(state, contacts, contact)
    }

    async fn set_contact_login(&self, contact_id: i64, user_id: &str) -> Result<(), AppError> {
        let mut state = self.lock();
        match state.contacts.iter_mut().find(|c| c.id == contact_id) {
            Some(contact) => {
                contact.user_id = Some(user_id.to_string());
                Ok(())
            }
            None => Err(AppError::Generic(format!("no contact {}", contact_id))),
        }
    }

    async fn find_project(&self, sync_pro_id: i64) -> Result<Option<Project>, AppError> {
        Ok(self.project_by_sync_id(sync_pro_id))
    }

    async fn insert_project(&self, project: &Project) -> Result<i64, AppError> {
        let mut state = self.lock();
        state.project_insert_attempts += 1;
        if let Some(err) = state.project_insert_failures.pop_front() {
            return Err(err);
        }
        insert_row!(state, projects, project)
    }

    async fn update_project(&self, project: &Project) -> Result<(), AppError> {
        let mut state = self.lock();
        update_row!(state, projects, project)
    }

    async fn count_projects_with_prefix(&self, prefix: &str) -> Result<i64, AppError> {
        let count = self
            .lock()
            .projects
            .iter()
            .filter(|p| p.proj_number.as_deref().is_some_and(|n| n.starts_with(prefix)))
            .count();
        Ok(count as i64)
    }

    async fn find_county_id(&self, name: &str, state: &str) -> Result<Option<i64>, AppError> {
        Ok(self
            .lock()
            .counties
            .iter()
            .find(|(_, n, s)| n.eq_ignore_ascii_case(name) && s.eq_ignore_ascii_case(state))
            .map(|(id, _, _)| *id))
    }

    async fn delete_proj_counties(&self, proj_id: i64) -> Result<u64, AppError> {
        let mut state = self.lock();
        let before = state.proj_counties.len();
        state.proj_counties.retain(|c| c.proj_id != proj_id);
        Ok((before - state.proj_counties.len()) as u64)
    }

    async fn insert_proj_county(&self, county: &ProjCounty) -> Result<i64, AppError> {
        let mut state = self.lock();
        insert_row!(state, proj_counties, county)
    }

    async fn delete_pre_bids(&self, proj_id: i64) -> Result<u64, AppError> {
        let mut state = self.lock();
        let before = state.pre_bids.len();
        state.pre_bids.retain(|p| p.proj_id != proj_id);
        Ok((before - state.pre_bids.len()) as u64)
    }

    async fn insert_pre_bid(&self, pre_bid: &PreBidInfo) -> Result<i64, AppError> {
        let mut state = self.lock();
        insert_row!(state, pre_bids, pre_bid)
    }

    async fn delete_est_costs(&self, proj_id: i64) -> Result<u64, AppError> {
        let mut state = self.lock();
        let before = state.est_costs.len();
        state.est_costs.retain(|c| c.proj_id != proj_id);
        Ok((before - state.est_costs.len()) as u64)
    }

    async fn insert_est_cost(&self, cost: &EstCostDetail) -> Result<i64, AppError> {
        let mut state = self.lock();
        insert_row!(state, est_costs, cost)
    }

    async fn find_addendum(&self, sync_addendum_id: i64) -> Result<Option<Addendum>, AppError> {
        Ok(self
            .lock()
            .addenda
            .iter()
            .find(|a| a.sync_addendum_id == sync_addendum_id)
            .cloned())
    }

    async fn insert_addendum(&self, addendum: &Addendum) -> Result<i64, AppError> {
        let mut state = self.lock();
        insert_row!(state, addenda, addendum)
    }

    async fn update_addendum(&self, addendum: &Addendum) -> Result<(), AppError> {
        let mut state = self.lock();
        update_row!(state, addenda, addendum)
    }

    async fn find_entity_link(
        &self,
        sync_link_id: i64,
        role: LinkRole,
    ) -> Result<Option<EntityLink>, AppError> {
        Ok(self
            .lock()
            .links
            .iter()
            .find(|l| l.sync_link_id == sync_link_id && l.role == role)
            .cloned())
    }

    async fn insert_entity_link(&self, link: &EntityLink) -> Result<i64, AppError> {
        let mut state = self.lock();
        insert_row!(state, links, link)
    }

    async fn update_entity_link(&self, link: &EntityLink) -> Result<(), AppError> {
        let mut state = self.lock();
        update_row!(state, links, link)
    }
}

#[derive(Default)]
struct FolderState {
    fail_next: bool,
    created: Vec<String>,
}

/// Records provisioned project numbers instead of touching the filesystem.
#[derive(Default)]
pub struct MemoryFolders {
    state: Mutex<FolderState>,
}

impl MemoryFolders {
    pub fn fail_next(&self) {
        self.state.lock().unwrap().fail_next = true;
    }

    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }
}

impl FolderProvisioner for MemoryFolders {
    async fn provision(&self, number: &ProjectNumber) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail_next) {
            return Err(AppError::FolderError(format!(
                "{}: permission denied",
                number.number
            )));
        }
        state.created.push(number.number.clone());
        Ok(())
    }
}

#[derive(Default)]
struct CredentialState {
    fail: bool,
    logins: Vec<(String, String, String)>,
}

/// Hands out sequential user ids and records `(email, password, role)`.
#[derive(Default)]
pub struct MemoryCredentials {
    state: Mutex<CredentialState>,
}

impl MemoryCredentials {
    pub fn fail_logins(&self) {
        self.state.lock().unwrap().fail = true;
    }

    pub fn logins(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().logins.clone()
    }
}

impl CredentialProvisioner for MemoryCredentials {
    async fn create_login(&self, email: &str, password: &str, role: &str) -> Result<String, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.fail {
            return Err(AppError::CredentialError(format!("identity service rejected {}", email)));
        }
        state
            .logins
            .push((email.to_string(), password.to_string(), role.to_string()));
        Ok(format!("user-{}", state.logins.len()))
    }
}
