use thiserror::Error;

/// Broad classification used by callers to decide how an error is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad identifiers or quantities supplied by the player. Reported verbatim.
    UserInput,
    /// Missing profile, tool, station or fuel. Reported verbatim.
    Precondition,
    /// A record changed underneath the action. Safe to retry.
    Concurrency,
    /// Catalog files failed to load or validate.
    Catalog,
    /// Persistence layer failure.
    Storage,
}

/// Errors that can arise while running survival actions or touching the store.
#[derive(Debug, Error)]
pub enum SurvivalError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, catalog reads).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog JSON that could not be parsed.
    #[error("failed to parse {file}: {source}")]
    CatalogParse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    /// Catalog entry that parsed but violates a cross-reference or range rule.
    #[error("invalid catalog entry {entry}: {reason}")]
    CatalogInvalid { entry: String, reason: String },

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    #[error("No survival profile created yet. Use `profile start` to create one.")]
    NoProfile,

    #[error("Your profile already exists.")]
    ProfileExists,

    #[error("Unknown item name provided: {0}")]
    UnknownItem(String),

    #[error("Unknown biome provided: {0}")]
    UnknownBiome(String),

    #[error("You have not discovered the {0} biome yet.")]
    BiomeNotDiscovered(String),

    #[error("Quantity must be a positive number.")]
    InvalidQuantity,

    #[error("You don't have this item: {0}")]
    ItemNotOwned(String),

    /// Not enough of an item (ingredient, fuel, or discard target).
    #[error("You need {required}x {item_id} but only have {available}.")]
    InsufficientItem {
        item_id: String,
        required: u32,
        available: u32,
    },

    #[error("You need one of these to do that: {}", .0.join(", "))]
    MissingTool(Vec<String>),

    #[error("{0} cannot be crafted.")]
    NotCraftable(String),

    #[error("{0} cannot be smelted.")]
    NotSmeltable(String),

    #[error("{0} cannot be used.")]
    NotUsable(String),

    #[error("You are already at full health.")]
    FullHealth,

    #[error("Slow down! Try again in {seconds_remaining} seconds.")]
    Cooldown { seconds_remaining: i64 },

    /// A record disappeared between read and write (double submit).
    #[error("record vanished during update: {0}")]
    RecordVanished(String),
}

impl SurvivalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SurvivalError::Sled(_)
            | SurvivalError::Bincode(_)
            | SurvivalError::Io(_)
            | SurvivalError::NotFound(_)
            | SurvivalError::SchemaMismatch { .. } => ErrorKind::Storage,
            SurvivalError::CatalogParse { .. } | SurvivalError::CatalogInvalid { .. } => {
                ErrorKind::Catalog
            }
            SurvivalError::NoProfile
            | SurvivalError::ProfileExists
            | SurvivalError::MissingTool(_)
            | SurvivalError::Cooldown { .. } => ErrorKind::Precondition,
            SurvivalError::RecordVanished(_) => ErrorKind::Concurrency,
            SurvivalError::UnknownItem(_)
            | SurvivalError::UnknownBiome(_)
            | SurvivalError::BiomeNotDiscovered(_)
            | SurvivalError::InvalidQuantity
            | SurvivalError::ItemNotOwned(_)
            | SurvivalError::InsufficientItem { .. }
            | SurvivalError::NotCraftable(_)
            | SurvivalError::NotSmeltable(_)
            | SurvivalError::NotUsable(_)
            | SurvivalError::FullHealth => ErrorKind::UserInput,
        }
    }

    /// Concurrency anomalies are treated as retryable precondition failures.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Concurrency
    }

    /// Whether the message is meant to be shown to the player as-is.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UserInput | ErrorKind::Precondition | ErrorKind::Concurrency
        )
    }

    pub(crate) fn invalid(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        SurvivalError::CatalogInvalid {
            entry: entry.into(),
            reason: reason.into(),
        }
    }
}
