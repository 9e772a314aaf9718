//! Project ↔ business entity link rows.

use crate::legacy::SourceProjectLink;
use crate::models::{BusinessEntity, EntityLink, Project};
use crate::status::SyncStatus;

/// Builds the denormalized link row for a project and a party.
///
/// The party's display name and the project's active flag and number are
/// copied as a point-in-time snapshot. When `existing` is given its primary
/// key is kept.
pub fn build_link(
    source: &SourceProjectLink,
    project: &Project,
    entity: &BusinessEntity,
    existing: Option<&EntityLink>,
) -> EntityLink {
    EntityLink {
        id: existing.map_or(0, |link| link.id),
        proj_id: project.id,
        business_entity_id: entity.id,
        role: source.role,
        entity_name: entity.name.clone(),
        is_active: project.is_active,
        proj_number: project.proj_number.clone(),
        sync_link_id: source.id,
        sync_status: existing.map_or(SyncStatus::Unchanged, |link| link.sync_status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::LinkRole;

    #[test]
    fn test_build_link_snapshots_names() {
        let source = SourceProjectLink {
            id: 5,
            project_id: 900,
            party_id: 7,
            role: LinkRole::Contractor,
            sync_status: SyncStatus::New,
        };
        let project = Project {
            id: 31,
            is_active: true,
            proj_number: Some("24040007".to_string()),
            ..Default::default()
        };
        let entity = BusinessEntity {
            id: 12,
            name: "Delta Electric".to_string(),
            ..Default::default()
        };

        let link = build_link(&source, &project, &entity, None);
        assert_eq!(link.id, 0);
        assert_eq!(link.proj_id, 31);
        assert_eq!(link.business_entity_id, 12);
        assert_eq!(link.entity_name, "Delta Electric");
        assert_eq!(link.proj_number.as_deref(), Some("24040007"));
        assert!(link.is_active);
        assert_eq!(link.sync_link_id, 5);

        let existing = EntityLink { id: 77, ..link.clone() };
        let relinked = build_link(&source, &project, &entity, Some(&existing));
        assert_eq!(relinked.id, 77);
    }
}
