#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Connection error: {0}")]
    Connectivity(String),

    #[error("Failed to create client: {0}")]
    ClientCreation(String),

    /// The server answered with a structured `errors` list.
    ///
    /// The messages are rendered last so that the final server message is the
    /// suffix of the error text; the root CA probe relies on that.
    #[error("server returned {status}: {}", errors.join("; "))]
    Api { status: u16, errors: Vec<String> },

    #[error("HTTP status {0}: {1}")]
    HttpStatus(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("mounting {path} failed: {source}")]
    Mount {
        path: String,
        #[source]
        source: Box<VaultError>,
    },

    #[error("write to {path} failed: {source}")]
    Write {
        path: String,
        #[source]
        source: Box<VaultError>,
    },

    #[error("read from {path} failed: {source}")]
    Read {
        path: String,
        #[source]
        source: Box<VaultError>,
    },

    #[error("secret at {path} is nil")]
    SecretMissing { path: String },

    #[error("secret at {path} has no data")]
    DataMissing { path: String },

    #[error("secret at {path} did not contain {key}")]
    KeyMissing { path: String, key: String },

    #[error("{key} at {path} is nil")]
    NullValue { path: String, key: String },

    #[error("{key} at {path} is not a string")]
    NotAString { path: String, key: String },

    #[error("token response did not include an auth block")]
    MissingAuth,

    #[error("token response had an empty client token")]
    EmptyClientToken,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VaultError {
    pub(crate) fn mount(path: &str, source: VaultError) -> Self {
        VaultError::Mount {
            path: path.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn write(path: &str, source: VaultError) -> Self {
        VaultError::Write {
            path: path.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn read(path: &str, source: VaultError) -> Self {
        VaultError::Read {
            path: path.to_string(),
            source: Box::new(source),
        }
    }
}
