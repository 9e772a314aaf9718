//! Reconciliation engine.
//!
//! One batch walks the entity kinds in [`EntityKind::ORDER`]. For each kind it
//! reads the pending source rows and, row by row, decides between insert and
//! update by looking up the destination back-reference, persists the mapped
//! record, resolves dependents and finally flips the source status to
//! `Synced`. A row's status is only flipped after everything it owns was
//! written, so any failure leaves the row eligible for the next batch.
//!
//! Rows are processed sequentially. Project numbers are derived from a count
//! of existing projects, which is only race-free while a single batch runs at
//! a time; see [`crate::runner::BatchRunner`].

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{AppError, ErrorClass};
use crate::legacy::{
    LinkRole, SourceAddendum, SourceAddress, SourceArchOwner, SourceContact, SourceContractor,
    SourceMember, SourceProject, SourceProjectLink, SourceRow,
};
use crate::mapper::{
    address_for, apply_address, apply_profile, build_link, profile_for, AddendumMapping,
    ArchOwnerMapping, ContactMapping, ContractorMapping, Mapping, MemberMapping, ProjectMapping,
    ProjectNumber,
};
use crate::models::{BusinessEntity, PartyKey, Project};
use crate::resolver::DependencyResolver;
use crate::retry::with_backoff;
use crate::status::{AtStage, RowError, RowStage, SyncStatus};
use crate::sync::{BatchSummary, EntityKind, EntityKindResult, SyncOutcome, SyncStats};
use crate::traits::{CredentialProvisioner, DestinationStore, FolderProvisioner, SourceStore};

/// Drives source rows into the destination store.
pub struct ReconciliationEngine<S, D, F, C> {
    source: S,
    destination: D,
    folders: F,
    credentials: C,
    config: SyncConfig,
}

impl<S, D, F, C> ReconciliationEngine<S, D, F, C>
where
    S: SourceStore,
    D: DestinationStore,
    F: FolderProvisioner,
    C: CredentialProvisioner,
{
    pub fn new(source: S, destination: D, folders: F, credentials: C, config: SyncConfig) -> Self {
        Self {
            source,
            destination,
            folders,
            credentials,
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Runs one batch over every entity kind.
    ///
    /// A kind whose pending rows cannot be queried is recorded as failed and
    /// the batch moves on. Cancellation is honoured between rows; the row in
    /// flight always completes.
    pub async fn run_batch(&self, cancel: &CancellationToken) -> BatchSummary {
        let mut summary = BatchSummary::new();
        info!("Starting sync batch");

        for kind in EntityKind::ORDER {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            match self.sync_kind(kind, cancel).await {
                Ok(stats) => summary.add(EntityKindResult::success(kind, stats)),
                Err(e) => {
                    error!(kind = %kind, error = %e, "Failed to query pending rows");
                    summary.add(EntityKindResult::failure(kind, e.to_string()));
                }
            }
        }

        if cancel.is_cancelled() {
            summary.cancelled = true;
        }
        summary.finish();
        log_summary(&summary);
        summary
    }

    /// Synchronizes every pending row of one kind.
    pub async fn sync_kind(
        &self,
        kind: EntityKind,
        cancel: &CancellationToken,
    ) -> Result<SyncStats, AppError> {
        let stats = match kind {
            EntityKind::Member => {
                let rows = self.source.pending_members().await?;
                drive_rows(kind, &rows, cancel, |r| self.sync_member(r)).await
            }
            EntityKind::Contact => {
                let rows = self.source.pending_contacts().await?;
                drive_rows(kind, &rows, cancel, |r| self.sync_contact(r)).await
            }
            EntityKind::Contractor => {
                let rows = self.source.pending_contractors().await?;
                drive_rows(kind, &rows, cancel, |r| self.sync_contractor(r)).await
            }
            EntityKind::ArchOwner => {
                let rows = self.source.pending_arch_owners().await?;
                drive_rows(kind, &rows, cancel, |r| self.sync_arch_owner(r)).await
            }
            EntityKind::Project => {
                let rows = self.source.pending_projects().await?;
                drive_rows(kind, &rows, cancel, |r| self.sync_project(r)).await
            }
            EntityKind::Addendum => {
                let rows = self.source.pending_addenda().await?;
                drive_rows(kind, &rows, cancel, |r| self.sync_addendum(r)).await
            }
            EntityKind::ContractorLink | EntityKind::ArchOwnerLink => {
                let role = kind.link_role().unwrap_or_default();
                let rows = self.source.pending_project_links(role).await?;
                drive_rows(kind, &rows, cancel, |r| self.sync_link(kind, r)).await
            }
        };
        Ok(stats)
    }

    async fn sync_member(&self, row: &SourceMember) -> Result<SyncOutcome, RowError> {
        let (entity, outcome) = self
            .upsert_party::<MemberMapping>(EntityKind::Member, PartyKey::Member(row.id), row)
            .await?;

        self.upsert_address(entity.id, &row.address)
            .await
            .at(RowStage::Persisted)?;
        self.upsert_profile(entity.id, row)
            .await
            .at(RowStage::Persisted)?;

        self.finish_row(EntityKind::Member, row).await?;
        Ok(outcome)
    }

    async fn sync_contractor(&self, row: &SourceContractor) -> Result<SyncOutcome, RowError> {
        let (entity, outcome) = self
            .upsert_party::<ContractorMapping>(
                EntityKind::Contractor,
                PartyKey::Contractor(row.id),
                row,
            )
            .await?;

        self.upsert_address(entity.id, &row.address)
            .await
            .at(RowStage::Persisted)?;

        self.finish_row(EntityKind::Contractor, row).await?;
        Ok(outcome)
    }

    async fn sync_arch_owner(&self, row: &SourceArchOwner) -> Result<SyncOutcome, RowError> {
        let (entity, outcome) = self
            .upsert_party::<ArchOwnerMapping>(
                EntityKind::ArchOwner,
                PartyKey::ArchOwner(row.id),
                row,
            )
            .await?;

        self.upsert_address(entity.id, &row.address)
            .await
            .at(RowStage::Persisted)?;

        self.finish_row(EntityKind::ArchOwner, row).await?;
        Ok(outcome)
    }

    /// Inserts or updates the business entity of a party row.
    async fn upsert_party<M>(
        &self,
        kind: EntityKind,
        key: PartyKey,
        row: &M::Source,
    ) -> Result<(BusinessEntity, SyncOutcome), RowError>
    where
        M: Mapping<Target = BusinessEntity>,
        M::Source: SourceRow,
    {
        let existing = self
            .destination
            .find_business_entity(key)
            .await
            .at(RowStage::Pending)?;
        note_decision(kind, row, existing.is_some());

        match existing {
            Some(mut entity) => {
                M::apply_update(row, &mut entity);
                self.destination
                    .update_business_entity(&entity)
                    .await
                    .at(RowStage::Mapped)?;
                Ok((entity, SyncOutcome::Updated))
            }
            None => {
                let mut entity = M::to_insert(row);
                let id = self
                    .insert_with_retry("insert_business_entity", || {
                        self.destination.insert_business_entity(&entity)
                    })
                    .await
                    .at(RowStage::Mapped)?;
                entity.id = id;
                Ok((entity, SyncOutcome::Created))
            }
        }
    }

    /// Updates the entity's first address, or inserts one when the source
    /// carries any address data.
    async fn upsert_address(&self, entity_id: i64, source: &SourceAddress) -> Result<(), AppError> {
        match self.destination.find_address(entity_id).await? {
            Some(mut address) => {
                apply_address(source, &mut address);
                self.destination.update_address(&address).await
            }
            None if source.is_blank() => Ok(()),
            None => {
                let address = address_for(entity_id, source);
                self.destination.insert_address(&address).await.map(|_| ())
            }
        }
    }

    async fn upsert_profile(&self, entity_id: i64, row: &SourceMember) -> Result<(), AppError> {
        match self.destination.find_member_profile(entity_id).await? {
            Some(mut profile) => {
                apply_profile(row, &mut profile);
                self.destination.update_member_profile(&profile).await
            }
            None => {
                let profile = profile_for(entity_id, row);
                self.destination
                    .insert_member_profile(&profile)
                    .await
                    .map(|_| ())
            }
        }
    }

    async fn sync_contact(&self, row: &SourceContact) -> Result<SyncOutcome, RowError> {
        let owner = self
            .destination
            .find_business_entity(PartyKey::Member(row.member_id))
            .await
            .at(RowStage::Pending)?
            .ok_or_else(|| {
                AppError::MissingDependency(format!("member {} is not synced yet", row.member_id))
            })
            .at(RowStage::Pending)?;

        let existing = self
            .destination
            .find_contact(row.id)
            .await
            .at(RowStage::Pending)?;
        note_decision(EntityKind::Contact, row, existing.is_some());

        let (contact, outcome) = match existing {
            Some(mut contact) => {
                ContactMapping::apply_update(row, &mut contact);
                contact.business_entity_id = owner.id;
                self.destination
                    .update_contact(&contact)
                    .await
                    .at(RowStage::Mapped)?;
                (contact, SyncOutcome::Updated)
            }
            None => {
                let mut contact = ContactMapping::to_insert(row);
                contact.business_entity_id = owner.id;
                let id = self
                    .insert_with_retry("insert_contact", || {
                        self.destination.insert_contact(&contact)
                    })
                    .await
                    .at(RowStage::Mapped)?;
                contact.id = id;
                (contact, SyncOutcome::Created)
            }
        };

        if contact.user_id.is_none() {
            if let Some((email, password)) = row.credentials() {
                let user_id = self
                    .credentials
                    .create_login(email, password, &self.config.default_role)
                    .await
                    .at(RowStage::Persisted)?;
                self.destination
                    .set_contact_login(contact.id, &user_id)
                    .await
                    .at(RowStage::Persisted)?;
                info!(source_id = row.id, contact_id = contact.id, "Provisioned contact login");
            }
        }

        self.finish_row(EntityKind::Contact, row).await?;
        Ok(outcome)
    }

    async fn sync_project(&self, row: &SourceProject) -> Result<SyncOutcome, RowError> {
        let existing = self
            .destination
            .find_project(row.id)
            .await
            .at(RowStage::Pending)?;
        note_decision(EntityKind::Project, row, existing.is_some());

        let (project, number, outcome) = match existing {
            Some(mut project) => {
                ProjectMapping::apply_update(row, &mut project);
                let number = match ProjectNumber::explicit_in(row).at(RowStage::Pending)? {
                    Some(number) => number,
                    None => match ProjectNumber::stored_in(&project) {
                        Some(number) => number,
                        None => self.derive_number(row).await.at(RowStage::Pending)?,
                    },
                };
                number.apply_to(&mut project);
                self.destination
                    .update_project(&project)
                    .await
                    .at(RowStage::Mapped)?;
                (project, number, SyncOutcome::Updated)
            }
            None => {
                let mut project = ProjectMapping::to_insert(row);
                let number = match ProjectNumber::explicit_in(row).at(RowStage::Pending)? {
                    Some(number) => number,
                    None => self.derive_number(row).await.at(RowStage::Pending)?,
                };
                number.apply_to(&mut project);
                let id = self
                    .insert_with_retry("insert_project", || {
                        self.destination.insert_project(&project)
                    })
                    .await
                    .at(RowStage::Mapped)?;
                project.id = id;
                (project, number, SyncOutcome::Created)
            }
        };

        // Provisioning is idempotent, so a New row recovered through the
        // update path gets its folders as well.
        if row.sync_status.is_fresh_insert() {
            self.folders
                .provision(&number)
                .await
                .at(RowStage::Persisted)?;
        }

        let report = DependencyResolver::new(&self.source, &self.destination)
            .resolve(row, project.id)
            .await;
        if !report.is_complete() {
            return Err(RowError {
                stage: RowStage::Persisted,
                source: AppError::ChildResolution {
                    project_id: project.id,
                    failed: report.failed_steps.len(),
                },
            });
        }

        self.finish_row(EntityKind::Project, row).await?;

        match self
            .source
            .stamp_change_log(row.id, SourceProject::TRACKED_FIELDS)
            .await
        {
            Ok(stamped) => debug!(source_id = row.id, stamped, "Stamped change log"),
            Err(e) => warn!(source_id = row.id, error = %e, "Failed to stamp change log"),
        }

        debug!(
            source_id = row.id,
            proj_id = project.id,
            number = %number.number,
            "Project synchronized"
        );
        Ok(outcome)
    }

    /// Next sequential number for the project's arrival month.
    async fn derive_number(&self, row: &SourceProject) -> Result<ProjectNumber, AppError> {
        let arrival = row.arrival_date.ok_or_else(|| {
            AppError::InvalidData(format!(
                "project {} has neither a project number nor an arrival date",
                row.id
            ))
        })?;
        let existing = self
            .destination
            .count_projects_with_prefix(&ProjectNumber::prefix_for(arrival))
            .await?;
        Ok(ProjectNumber::sequenced(arrival, existing))
    }

    async fn sync_addendum(&self, row: &SourceAddendum) -> Result<SyncOutcome, RowError> {
        let project = self.require_project(row.project_id).await?;

        let existing = self
            .destination
            .find_addendum(row.id)
            .await
            .at(RowStage::Pending)?;
        note_decision(EntityKind::Addendum, row, existing.is_some());

        let outcome = match existing {
            Some(mut addendum) => {
                AddendumMapping::apply_update(row, &mut addendum);
                addendum.proj_id = project.id;
                self.destination
                    .update_addendum(&addendum)
                    .await
                    .at(RowStage::Mapped)?;
                SyncOutcome::Updated
            }
            None => {
                let mut addendum = AddendumMapping::to_insert(row);
                addendum.proj_id = project.id;
                self.insert_with_retry("insert_addendum", || {
                    self.destination.insert_addendum(&addendum)
                })
                .await
                .at(RowStage::Mapped)?;
                SyncOutcome::Created
            }
        };

        self.finish_row(EntityKind::Addendum, row).await?;
        Ok(outcome)
    }

    async fn sync_link(
        &self,
        kind: EntityKind,
        row: &SourceProjectLink,
    ) -> Result<SyncOutcome, RowError> {
        let role: LinkRole = row.role;
        let project = self.require_project(row.project_id).await?;
        let entity = self
            .destination
            .find_business_entity(PartyKey::for_link(role, row.party_id))
            .await
            .at(RowStage::Pending)?
            .ok_or_else(|| {
                AppError::MissingDependency(format!("{} {} is not synced yet", role, row.party_id))
            })
            .at(RowStage::Pending)?;

        let existing = self
            .destination
            .find_entity_link(row.id, role)
            .await
            .at(RowStage::Pending)?;
        note_decision(kind, row, existing.is_some());

        let link = build_link(row, &project, &entity, existing.as_ref());
        let outcome = if existing.is_some() {
            self.destination
                .update_entity_link(&link)
                .await
                .at(RowStage::Mapped)?;
            SyncOutcome::Updated
        } else {
            self.insert_with_retry("insert_entity_link", || {
                self.destination.insert_entity_link(&link)
            })
            .await
            .at(RowStage::Mapped)?;
            SyncOutcome::Created
        };

        self.finish_row(kind, row).await?;
        Ok(outcome)
    }

    async fn require_project(&self, source_project_id: i64) -> Result<Project, RowError> {
        self.destination
            .find_project(source_project_id)
            .await
            .at(RowStage::Pending)?
            .ok_or_else(|| {
                AppError::MissingDependency(format!(
                    "project {} is not synced yet",
                    source_project_id
                ))
            })
            .at(RowStage::Pending)
    }

    /// Inserts a parent record, retrying lock/timeout faults.
    async fn insert_with_retry<T, Op, Fut>(&self, operation: &str, op: Op) -> Result<T, AppError>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        with_backoff(
            &self.config.retry,
            operation,
            |e| self.destination.is_transient(e),
            op,
        )
        .await
    }

    /// Flips the source row to `Synced`. Always the last write of a row.
    async fn finish_row<R: SourceRow>(&self, kind: EntityKind, row: &R) -> Result<(), RowError> {
        row.sync_status()
            .mark_synced()
            .at(RowStage::ChildrenResolved)?;

        let changed = self
            .source
            .mark_synced(kind.table(), row.source_id())
            .await
            .at(RowStage::ChildrenResolved)?;
        if !changed {
            warn!(
                kind = %kind,
                source_id = row.source_id(),
                "Source status changed during sync, left untouched"
            );
        }
        Ok(())
    }
}

/// Processes `rows` one at a time, isolating per-row failures.
async fn drive_rows<'a, R, F, Fut>(
    kind: EntityKind,
    rows: &'a [R],
    cancel: &CancellationToken,
    mut sync_row: F,
) -> SyncStats
where
    R: SourceRow,
    F: FnMut(&'a R) -> Fut,
    Fut: Future<Output = Result<SyncOutcome, RowError>>,
{
    let mut stats = SyncStats::new();
    let total = rows.len();
    if total > 0 {
        info!("Syncing {} pending {} row(s)", total, kind);
    }

    for (i, row) in rows.iter().enumerate() {
        if cancel.is_cancelled() {
            info!(kind = %kind, processed = i, total, "Cancellation requested, stopping");
            break;
        }
        if !row.sync_status().needs_sync() {
            stats.record(SyncOutcome::Skipped);
            continue;
        }

        let outcome = match sync_row(row).await {
            Ok(outcome) => outcome,
            Err(err) if err.source.class() == ErrorClass::MissingDependency => {
                warn!(
                    kind = %kind,
                    source_id = row.source_id(),
                    error = %err.source,
                    "Dependency missing, row left for a later batch"
                );
                SyncOutcome::Skipped
            }
            Err(err) => {
                error!(
                    kind = %kind,
                    source_id = row.source_id(),
                    stage = %err.stage,
                    error = %err.source,
                    "Row failed"
                );
                SyncOutcome::Failed
            }
        };
        stats.record(outcome);
    }
    stats
}

/// Logs the two self-healing paths of the insert/update decision.
fn note_decision<R: SourceRow>(kind: EntityKind, row: &R, found: bool) {
    match (row.sync_status(), found) {
        (SyncStatus::New, true) => warn!(
            kind = %kind,
            source_id = row.source_id(),
            "New row already present in destination, updating instead"
        ),
        (SyncStatus::Updated, false) => warn!(
            kind = %kind,
            source_id = row.source_id(),
            "Updated row missing from destination, inserting instead"
        ),
        _ => {}
    }
}

fn log_summary(summary: &BatchSummary) {
    for result in &summary.results {
        match &result.error {
            None if result.stats.total() > 0 => info!(
                kind = %result.kind,
                created = result.stats.created,
                updated = result.stats.updated,
                skipped = result.stats.skipped,
                failed = result.stats.failed,
                "Kind complete"
            ),
            None => {}
            Some(e) => error!(kind = %result.kind, error = %e, "Kind not processed"),
        }
    }

    let totals = summary.totals();
    let elapsed_ms = summary
        .finished_at
        .map(|end| (end - summary.started_at).num_milliseconds())
        .unwrap_or_default();
    info!(
        created = totals.created,
        updated = totals.updated,
        skipped = totals.skipped,
        failed = totals.failed,
        failed_kinds = summary.failed_kinds(),
        cancelled = summary.cancelled,
        elapsed_ms,
        "Sync batch finished"
    );
}
