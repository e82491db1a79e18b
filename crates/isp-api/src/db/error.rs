//! Driver error translation.
//!
//! Unique and foreign-key violations are recognised by constraint name (see
//! `migrations/0001_init.sql`). Everything else becomes
//! [`SystemError::Internal`] with the driver message.

use isp_core::SystemError;

/// Map a constraint name to the taxonomy kind it signals.
fn constraint_kind(constraint: &str) -> Option<SystemError> {
    let kind = match constraint {
        "domain_name_system_id_key" => SystemError::DomainDuplicateName,
        "domain_system_id_fkey" => SystemError::SystemNotFound,
        "app_group_name_domain_id_key" => SystemError::AppGroupDuplicateName,
        "app_group_domain_id_fkey" => SystemError::DomainNotFound,
        "application_pkey" => SystemError::ApplicationDuplicateId,
        "application_name_application_group_id_key" => SystemError::ApplicationDuplicateName,
        "application_application_group_id_fkey" => SystemError::AppGroupNotFound,
        "application_type_check" => {
            SystemError::InvalidArgument("application type must be SYSTEM or MOBILE".into())
        }
        "token_pkey" => SystemError::TokenDuplicate,
        "token_app_id_fkey" => SystemError::ApplicationNotFound,
        "access_list_pkey" => {
            SystemError::InvalidArgument("method listed more than once for the application".into())
        }
        "access_list_app_id_fkey" => SystemError::ApplicationNotFound,
        _ => return None,
    };
    Some(kind)
}

/// Translate a driver error into the domain taxonomy.
pub(crate) fn db_error(err: sqlx::Error) -> SystemError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(kind) = db_err.constraint().and_then(constraint_kind) {
            return kind;
        }
    }
    tracing::error!(error = %err, "database error");
    SystemError::Internal(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_constraints_map_to_duplicates() {
        assert_eq!(
            constraint_kind("app_group_name_domain_id_key"),
            Some(SystemError::AppGroupDuplicateName)
        );
        assert_eq!(
            constraint_kind("application_pkey"),
            Some(SystemError::ApplicationDuplicateId)
        );
        assert_eq!(constraint_kind("token_pkey"), Some(SystemError::TokenDuplicate));
    }

    #[test]
    fn foreign_keys_map_to_parent_not_found() {
        assert_eq!(
            constraint_kind("domain_system_id_fkey"),
            Some(SystemError::SystemNotFound)
        );
        assert_eq!(
            constraint_kind("application_application_group_id_fkey"),
            Some(SystemError::AppGroupNotFound)
        );
        assert_eq!(
            constraint_kind("access_list_app_id_fkey"),
            Some(SystemError::ApplicationNotFound)
        );
    }

    #[test]
    fn unknown_constraint_is_unmapped() {
        assert_eq!(constraint_kind("some_other_key"), None);
    }

    #[test]
    fn non_database_errors_are_internal() {
        let err = db_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, SystemError::Internal(_)));
    }
}
