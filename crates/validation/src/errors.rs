/// Rule violations discovered while validating logic or references.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // Per-item logic rules.
    #[error("logic item {0} connects START directly to END")]
    SenselessItem(String),
    #[error("logic item {0}: start and end can't be the same")]
    StartEqualsEnd(String),
    #[error("logic item {item} has unknown start: {action}")]
    UnknownStart { item: String, action: String },
    #[error("logic item {item} has unknown end: {action}")]
    UnknownEnd { item: String, action: String },
    #[error("logic item {item} condition references unknown action: {action}")]
    UnknownConditionAction { item: String, action: String },
    #[error("only the default flow is supported, got: '{0}'")]
    UnsupportedFlow(String),
    #[error("flow {flow} of action {action} has no output with index {index}")]
    MissingOutput {
        action: String,
        flow: String,
        index: usize,
    },
    #[error("output of type {0} can't be branched")]
    UncountableOutput(String),
    #[error("unsupported condition type: {0}")]
    UnsupportedConditionType(String),
    #[error("invalid condition value: {0}")]
    InvalidConditionValue(String),

    // Pairwise rules.
    #[error("START already defined")]
    DuplicateStart,
    #[error("logic items {0} and {1} leave the same start with conflicting conditions")]
    ConflictingEdges(String, String),
    #[error("logic items {0} and {1} connect the same start and end")]
    DuplicateEdge(String, String),

    // Whole-graph rules.
    #[error("loop detected at action {0}")]
    LoopDetected(String),
    #[error("can't check unfinished logic")]
    UnfinishedLogic,

    // Flow and parameter rules.
    #[error("action {0} was given an unexpected number of parameters")]
    ParameterCountMismatch(String),
    #[error("number of flow outputs of action {0} does not match its declared returns")]
    OutputCountMismatch(String),
    #[error("output '{0}' is not a valid identifier")]
    InvalidOutputIdentifier(String),
    #[error("output '{0}' is not unique")]
    DuplicateOutput(String),
    #[error("project parameter name '{0}' is not a valid identifier")]
    InvalidParameterName(String),
    #[error("project parameter name '{0}' is duplicate")]
    DuplicateParameterName(String),
    #[error("project parameter {0} must carry a JSON primitive")]
    NonPrimitiveParameter(String),
    #[error("action point {ap} has invalid parent: {detail}")]
    InvalidApParent { ap: String, detail: String },

    #[error(transparent)]
    Params(#[from] params::Error),
    #[error(transparent)]
    Cache(#[from] cache::Error),
    #[error(transparent)]
    Model(#[from] models::Error),
}
