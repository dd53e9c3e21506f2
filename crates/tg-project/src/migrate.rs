//! Document version migration.

use crate::ProjectError;
use crate::schema::GraphDocument;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut document: GraphDocument) -> Result<GraphDocument, ProjectError> {
    while document.version < LATEST_VERSION {
        document = migrate_one_version(document)?;
    }
    Ok(document)
}

// Version 1 is the first published format; older numbers have no upgrade.
fn migrate_one_version(document: GraphDocument) -> Result<GraphDocument, ProjectError> {
    Err(ProjectError::Migration {
        what: format!("No migration path from version {}", document.version),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(version: u32) -> GraphDocument {
        GraphDocument {
            version,
            id: "g".to_string(),
            header: None,
            nodes: vec![],
            application_data: vec![],
            execution: None,
        }
    }

    #[test]
    fn migrate_latest_is_noop() {
        let doc = document(LATEST_VERSION);
        assert_eq!(migrate_to_latest(doc.clone()).unwrap(), doc);
    }

    #[test]
    fn version_zero_has_no_migration_path() {
        let err = migrate_to_latest(document(0)).unwrap_err();
        assert!(matches!(err, ProjectError::Migration { what } if what.contains("version 0")));
    }
}
