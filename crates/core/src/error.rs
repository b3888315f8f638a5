use scribe_types::RecordId;

#[derive(Debug, thiserror::Error)]
pub enum ScribeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read store file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write store file: {0}")]
    FileWrite(std::io::Error),
    #[error(
        "failed to move corrupt store aside (path: {path}): {source}",
        path = path.display()
    )]
    Quarantine {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize records: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize records: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),

    #[error("storage quota exceeded: {attempted} bytes would exceed the {limit} byte limit")]
    QuotaExceeded { limit: u64, attempted: u64 },
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),
    #[error("unknown form field: {0}")]
    UnknownField(String),
    #[error("please select at least one record to export")]
    NothingSelected,

    #[error("invalid text: {0}")]
    Text(#[from] scribe_types::TextError),
    #[error("record id error: {0}")]
    Id(#[from] scribe_ids::IdError),
}

pub type ScribeResult<T> = std::result::Result<T, ScribeError>;
