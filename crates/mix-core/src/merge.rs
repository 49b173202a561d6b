use mix_schema::{GroupName, Manifest, ManifestDocument, PackageId};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error(
        "duplicate package id '{id}': declared in group '{first_group}' ({first_source}) \
         and again in group '{second_group}' ({second_source})"
    )]
    DuplicateIdentity {
        id: PackageId,
        first_group: GroupName,
        first_source: String,
        second_group: GroupName,
        second_source: String,
    },
}

/// Combine manifest documents into one desired-state manifest.
///
/// Documents are walked in order, then their groups, then the packages of each
/// group. Packages land in the merged group of the same name. Package ids must
/// be unique across every group of every document: the first id seen twice
/// aborts the merge and nothing is returned.
pub fn merge(documents: &[ManifestDocument]) -> Result<Manifest, MergeError> {
    let mut merged = Manifest::new();
    let mut origins: HashMap<PackageId, (GroupName, String)> = HashMap::new();

    for doc in documents {
        for group in &doc.manifest.groups {
            let target = merged.group_entry(&group.name);
            for pkg in &group.packages {
                if let Some((first_group, first_source)) = origins.get(&pkg.id) {
                    return Err(MergeError::DuplicateIdentity {
                        id: pkg.id.clone(),
                        first_group: first_group.clone(),
                        first_source: first_source.clone(),
                        second_group: group.name.clone(),
                        second_source: doc.source.clone(),
                    });
                }
                origins.insert(pkg.id.clone(), (group.name.clone(), doc.source.clone()));
                target.packages.push(pkg.clone());
            }
        }
    }

    debug!(
        "merged {} document(s) into {} package(s) across {} group(s)",
        documents.len(),
        merged.package_count(),
        merged.groups.len()
    );
    Ok(merged)
}
