use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types raised while generating a document
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested document name has no registered info block
    #[error("Unknown Swagger document - {0}")]
    UnknownDocument(String),

    /// A route reached the assembler without an HTTP method
    #[error(
        "Ambiguous HTTP method for action - {action}. \
         Actions require an explicit HttpMethod binding"
    )]
    AmbiguousHttpMethod { action: String },

    /// Two or more routes share a method and path and no resolver is configured
    #[error(
        "HTTP method \"{method}\" & path \"{path}\" overloaded by actions - {}. \
         Actions require unique method/path combination. \
         Use a conflicting actions resolver as a workaround",
        actions.join(",")
    )]
    ConflictingActions {
        method: String,
        path: String,
        actions: Vec<String>,
    },

    /// Two distinct types were assigned the same schema id
    #[error(
        "Conflicting schema id \"{schema_id}\" for types {existing} and {conflicting}. \
         Configure a schema id selector that yields unique ids"
    )]
    SchemaIdCollision {
        schema_id: String,
        existing: String,
        conflicting: String,
    },

    /// A schema, operation or document filter failed
    #[error("Filter failed: {0}")]
    Filter(String),

    /// A type expression could not be parsed
    #[error("Invalid type name \"{input}\": {message}")]
    InvalidTypeName { input: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_actions_message_lists_every_action() {
        let err = Error::ConflictingActions {
            method: "GET".to_string(),
            path: "collection".to_string(),
            actions: vec!["Items.List".to_string(), "Items.Search".to_string()],
        };

        let message = err.to_string();
        assert!(message.starts_with("HTTP method \"GET\" & path \"collection\""));
        assert!(message.contains("Items.List,Items.Search"));
    }

    #[test]
    fn test_unknown_document_message() {
        let err = Error::UnknownDocument("v3".to_string());
        assert_eq!(err.to_string(), "Unknown Swagger document - v3");
    }
}
