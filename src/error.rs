use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Table,
    Namespace,
    User,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Table => write!(f, "table"),
            ResourceType::Namespace => write!(f, "namespace"),
            ResourceType::User => write!(f, "user"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CelldbErrorCode {
    Validation,
    InvalidConfig,
    TableNotFound,
    NamespaceNotFound,
    UserNotFound,
    TableAlreadyExists,
    NamespaceAlreadyExists,
    UserAlreadyExists,
    NamespaceNotEmpty,
    SecurityDenied,
    Unsupported,
    IllegalScanState,
    WriterClosed,
}

impl CelldbErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            CelldbErrorCode::Validation => "validation",
            CelldbErrorCode::InvalidConfig => "invalid_config",
            CelldbErrorCode::TableNotFound => "table_not_found",
            CelldbErrorCode::NamespaceNotFound => "namespace_not_found",
            CelldbErrorCode::UserNotFound => "user_not_found",
            CelldbErrorCode::TableAlreadyExists => "table_already_exists",
            CelldbErrorCode::NamespaceAlreadyExists => "namespace_already_exists",
            CelldbErrorCode::UserAlreadyExists => "user_already_exists",
            CelldbErrorCode::NamespaceNotEmpty => "namespace_not_empty",
            CelldbErrorCode::SecurityDenied => "security_denied",
            CelldbErrorCode::Unsupported => "unsupported",
            CelldbErrorCode::IllegalScanState => "illegal_scan_state",
            CelldbErrorCode::WriterClosed => "writer_closed",
        }
    }
}

/// Every error here is a logic or configuration error surfaced synchronously
/// to the caller; the engine is a deterministic single-process structure, so
/// nothing is retried and no call has partial effect after a fatal error.
#[derive(Debug, Error)]
pub enum CelldbError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
    #[error("{resource_type} '{resource_id}' not found")]
    NotFound {
        resource_type: ResourceType,
        resource_id: String,
    },
    #[error("{resource_type} '{resource_id}' already exists")]
    AlreadyExists {
        resource_type: ResourceType,
        resource_id: String,
    },
    #[error("namespace '{namespace}' is not empty")]
    NamespaceNotEmpty { namespace: String },
    #[error("security violation: {0}")]
    SecurityDenied(String),
    #[error("operation not supported by the in-memory engine: {0}")]
    Unsupported(&'static str),
    #[error("illegal scan state: {0}")]
    IllegalScanState(&'static str),
    #[error("writer is closed")]
    WriterClosed,
}

impl CelldbError {
    pub fn table_not_found(name: &str) -> Self {
        CelldbError::NotFound {
            resource_type: ResourceType::Table,
            resource_id: name.to_string(),
        }
    }

    pub fn namespace_not_found(name: &str) -> Self {
        CelldbError::NotFound {
            resource_type: ResourceType::Namespace,
            resource_id: name.to_string(),
        }
    }

    pub fn code(&self) -> CelldbErrorCode {
        match self {
            CelldbError::Validation(_) => CelldbErrorCode::Validation,
            CelldbError::InvalidConfig { .. } => CelldbErrorCode::InvalidConfig,
            CelldbError::NotFound { resource_type, .. } => match resource_type {
                ResourceType::Table => CelldbErrorCode::TableNotFound,
                ResourceType::Namespace => CelldbErrorCode::NamespaceNotFound,
                ResourceType::User => CelldbErrorCode::UserNotFound,
            },
            CelldbError::AlreadyExists { resource_type, .. } => match resource_type {
                ResourceType::Table => CelldbErrorCode::TableAlreadyExists,
                ResourceType::Namespace => CelldbErrorCode::NamespaceAlreadyExists,
                ResourceType::User => CelldbErrorCode::UserAlreadyExists,
            },
            CelldbError::NamespaceNotEmpty { .. } => CelldbErrorCode::NamespaceNotEmpty,
            CelldbError::SecurityDenied(_) => CelldbErrorCode::SecurityDenied,
            CelldbError::Unsupported(_) => CelldbErrorCode::Unsupported,
            CelldbError::IllegalScanState(_) => CelldbErrorCode::IllegalScanState,
            CelldbError::WriterClosed => CelldbErrorCode::WriterClosed,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::{CelldbError, CelldbErrorCode, ResourceType};

    #[test]
    fn error_code_strings_are_stable() {
        assert_eq!(CelldbErrorCode::TableNotFound.as_str(), "table_not_found");
        assert_eq!(
            CelldbErrorCode::NamespaceAlreadyExists.as_str(),
            "namespace_already_exists"
        );
        assert_eq!(CelldbErrorCode::SecurityDenied.as_str(), "security_denied");
    }

    #[test]
    fn error_code_str_matches_variant_mapping() {
        let err = CelldbError::NotFound {
            resource_type: ResourceType::Table,
            resource_id: "accounting.trades".into(),
        };
        assert_eq!(err.code(), CelldbErrorCode::TableNotFound);
        assert_eq!(err.code_str(), "table_not_found");

        let err = CelldbError::Unsupported("table cloning");
        assert_eq!(err.code_str(), "unsupported");
    }
}
