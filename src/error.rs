pub type SlotformResult<T> = Result<T, SlotformError>;

/// Fatal operation failures. Partial-completion conditions are not errors; they
/// travel as [`Advisory`] values inside operation reports.
#[derive(thiserror::Error, Debug)]
pub enum SlotformError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("document error: {0}")]
    Document(String),

    #[error("substitution error: {0}")]
    Substitution(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlotformError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    pub fn substitution(msg: impl Into<String>) -> Self {
        Self::Substitution(msg.into())
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

/// Non-fatal outcomes of an operation that completed (possibly partially).
///
/// The containing operation still returns `Ok`; the caller decides how loudly to
/// surface these. The document is never left corrupted by an advisory condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advisory {
    /// The named template composition does not exist in the document.
    TemplateNotFound(String),
    /// The operation was invoked with no media bindings at all.
    NoMediaProvided,
    /// Slots that were discovered but had no binding (zero-based indices).
    UnfilledSlots(Vec<usize>),
    /// A binding referenced a composition name that does not exist.
    BoundCompMissing { slot: usize, name: String },
    /// Preview rendering failed; the rest of the package is intact.
    PreviewRenderFailed(String),
    /// Copying referenced media into the bundle folder failed.
    AssetCollectionFailed(String),
    /// Reducing the project to the root graph's dependencies failed.
    ReduceProjectFailed(String),
    /// No placeholder markers were found on the graph being packaged.
    NoPlaceholdersFound,
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::TemplateNotFound(name) => write!(f, "template '{name}' not found"),
            Advisory::NoMediaProvided => write!(f, "no media provided"),
            Advisory::UnfilledSlots(slots) => {
                write!(f, "slots left unfilled: {slots:?}")
            }
            Advisory::BoundCompMissing { slot, name } => {
                write!(f, "slot {slot} is bound to missing composition '{name}'")
            }
            Advisory::PreviewRenderFailed(msg) => write!(f, "preview render failed: {msg}"),
            Advisory::AssetCollectionFailed(msg) => write!(f, "asset collection failed: {msg}"),
            Advisory::ReduceProjectFailed(msg) => write!(f, "reduce project failed: {msg}"),
            Advisory::NoPlaceholdersFound => write!(f, "no placeholders found"),
        }
    }
}
