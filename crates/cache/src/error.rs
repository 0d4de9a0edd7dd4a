/// Failures of cache construction and mutation. Every variant names the
/// offending entity so callers can surface it directly.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} name '{name}' is not a valid identifier")]
    InvalidIdentifier { kind: &'static str, name: String },
    #[error("action point {ap} has invalid parent: {detail}")]
    InvalidParent { ap: String, detail: String },
    #[error("parent chain of action point {ap} loops back to itself")]
    ParentLoop { ap: String },
    #[error("{item} references unknown {kind}: {id}")]
    InvalidReference {
        item: String,
        kind: &'static str,
        id: String,
    },
    #[error("project parameter {name} must carry a JSON primitive, got: {value}")]
    InvalidValue { name: String, value: String },
    #[error(transparent)]
    Model(#[from] models::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn duplicate_id(kind: &'static str, id: impl Into<String>) -> Self {
        Error::DuplicateId {
            kind,
            id: id.into(),
        }
    }

    pub fn duplicate_name(kind: &'static str, name: impl Into<String>) -> Self {
        Error::DuplicateName {
            kind,
            name: name.into(),
        }
    }
}
