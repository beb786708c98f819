use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("not a .p2rec file: bad magic")]
    BadMagic,
    #[error("unsupported .p2rec version {version}")]
    UnsupportedVersion { version: u32 },
    #[error("file truncated before a complete entry")]
    Truncated,
    #[error("recorder's disk writer fell behind, session marked truncated")]
    DiskWriteLagged,
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed metadata blob: {0}")]
    BadMetadata(#[from] serde_json::Error),
}
