//! Checks shared by the identity services.

use isp_core::SystemError;

use crate::repository::RepoResult;

/// Reject an empty identifier list.
pub(crate) fn require_ids<T>(ids: &[T], what: &str) -> RepoResult<()> {
    if ids.is_empty() {
        return Err(SystemError::InvalidArgument(format!("{what} id list is empty")));
    }
    Ok(())
}

/// Interpret a `(name, parent)` lookup for a write targeting `id`.
///
/// Passes when nothing holds the name, or when the holder is `id` itself
/// (a rename that keeps the name). `id == 0` denotes a create, which no
/// stored row matches. Lookup failures other than not-found propagate.
pub(crate) fn ensure_name_free<T>(
    lookup: RepoResult<T>,
    id: i32,
    id_of: impl Fn(&T) -> i32,
    duplicate: SystemError,
) -> RepoResult<()> {
    match lookup {
        Ok(existing) if id_of(&existing) == id => Ok(()),
        Ok(_) => Err(duplicate),
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_list_is_invalid() {
        assert!(matches!(
            require_ids::<i32>(&[], "domain"),
            Err(SystemError::InvalidArgument(_))
        ));
        assert!(require_ids(&[1], "domain").is_ok());
    }

    #[test]
    fn absent_name_is_free() {
        let lookup: RepoResult<i32> = Err(SystemError::DomainNotFound);
        assert!(ensure_name_free(lookup, 0, |id| *id, SystemError::DomainDuplicateName).is_ok());
    }

    #[test]
    fn name_held_by_another_row_is_duplicate() {
        let err = ensure_name_free(Ok(4), 0, |id| *id, SystemError::DomainDuplicateName)
            .unwrap_err();
        assert_eq!(err, SystemError::DomainDuplicateName);
        let err = ensure_name_free(Ok(4), 5, |id| *id, SystemError::DomainDuplicateName)
            .unwrap_err();
        assert_eq!(err, SystemError::DomainDuplicateName);
    }

    #[test]
    fn name_held_by_target_is_free() {
        assert!(ensure_name_free(Ok(5), 5, |id| *id, SystemError::DomainDuplicateName).is_ok());
    }

    #[test]
    fn lookup_failure_propagates() {
        let lookup: RepoResult<i32> = Err(SystemError::Internal("boom".into()));
        let err = ensure_name_free(lookup, 0, |id| *id, SystemError::DomainDuplicateName)
            .unwrap_err();
        assert_eq!(err, SystemError::Internal("boom".into()));
    }
}
