//! Editorial workflow.
//!
//! Status transitions are a pure function of the event, the stored status and the
//! caller's role. `finalized` is never entered by an event; it is kept when a
//! superadmin supplies it on update or when an imported record carries it.

use catalog_shared::{EditorialStatus, Role};

use crate::errors::EngineError;

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Create,
    /// An edit; `requested` is the status the submission carries.
    Update { requested: EditorialStatus },
    Delete,
    /// A bulk import; `supplied` is the status found in the snapshot.
    Import { supplied: EditorialStatus },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Create => "create",
            Event::Update { .. } => "update",
            Event::Delete => "delete",
            Event::Import { .. } => "import",
        }
    }
}

/// Result of applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Status(EditorialStatus),
    /// Remove the record from its core.
    Purge,
}

/// Apply `event` to a record in status `current` on behalf of `role`.
pub fn advance(event: Event, current: EditorialStatus, role: Role) -> Result<Outcome, EngineError> {
    use EditorialStatus::*;

    let next = match event {
        Event::Create => New,
        Event::Update { requested } => match (current, role) {
            _ if requested == Finalized && role == Role::Superadmin => Finalized,
            (New, _) | (InProcess, _) => InProcess,
            (Processed, Role::Superadmin) => FinalEditing,
            (other, _) => other,
        },
        Event::Delete => match role {
            Role::User => {
                return Err(EngineError::permission_denied(
                    "deleting records requires the admin role",
                ))
            }
            Role::Admin => Deleted,
            Role::Superadmin => return Ok(Outcome::Purge),
        },
        Event::Import { supplied } => {
            if role != Role::Superadmin {
                return Err(EngineError::permission_denied(
                    "importing records requires the superadmin role",
                ));
            }
            if supplied == Finalized {
                Finalized
            } else {
                Imported
            }
        }
    };
    Ok(Outcome::Status(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use EditorialStatus::*;

    fn update(current: EditorialStatus, role: Role) -> Outcome {
        advance(Event::Update { requested: current }, current, role).unwrap()
    }

    #[test]
    fn test_create_is_new() {
        assert_eq!(
            advance(Event::Create, Processed, Role::User).unwrap(),
            Outcome::Status(New)
        );
    }

    #[test]
    fn test_update_transitions() {
        assert_eq!(update(New, Role::User), Outcome::Status(InProcess));
        assert_eq!(update(InProcess, Role::Admin), Outcome::Status(InProcess));
        assert_eq!(update(Processed, Role::Superadmin), Outcome::Status(FinalEditing));
        assert_eq!(update(Processed, Role::Admin), Outcome::Status(Processed));
        assert_eq!(update(Imported, Role::User), Outcome::Status(Imported));
        assert_eq!(update(Finalized, Role::User), Outcome::Status(Finalized));
    }

    #[test]
    fn test_only_superadmin_sets_finalized() {
        let event = Event::Update { requested: Finalized };
        assert_eq!(
            advance(event, FinalEditing, Role::Superadmin).unwrap(),
            Outcome::Status(Finalized)
        );
        assert_eq!(
            advance(event, FinalEditing, Role::Admin).unwrap(),
            Outcome::Status(FinalEditing)
        );
    }

    #[test]
    fn test_delete_by_role() {
        assert!(matches!(
            advance(Event::Delete, New, Role::User),
            Err(EngineError::PermissionDenied(_))
        ));
        assert_eq!(
            advance(Event::Delete, Finalized, Role::Admin).unwrap(),
            Outcome::Status(Deleted)
        );
        assert_eq!(advance(Event::Delete, New, Role::Superadmin).unwrap(), Outcome::Purge);
    }

    #[test]
    fn test_import_requires_superadmin() {
        let event = Event::Import { supplied: New };
        assert!(advance(event, New, Role::Admin).is_err());
        assert_eq!(
            advance(event, New, Role::Superadmin).unwrap(),
            Outcome::Status(Imported)
        );
        assert_eq!(
            advance(Event::Import { supplied: Finalized }, New, Role::Superadmin).unwrap(),
            Outcome::Status(Finalized)
        );
    }
}
