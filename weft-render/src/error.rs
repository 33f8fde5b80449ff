use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Error, Debug, Clone)]
pub enum RenderError {
    #[error("No schema named '{name}' is registered")]
    NoSuchSchema { name: String },

    #[error("No renderer found for mode '{mode}', type '{type_name}', layout {layout:?}")]
    NoRenderer {
        mode: String,
        type_name: String,
        layout: Option<String>,
    },

    #[error("Conversion failed for field '{field}': {key}")]
    Conversion {
        /// Form field name the raw value was read from.
        field: String,
        /// Localizable message key describing the failure.
        key: String,
    },

    #[error("Validation failed for field '{field}': {key}")]
    Validation { field: String, key: String },

    #[error("Type '{name}' is not declared in the type registry")]
    UnknownType { name: String },

    #[error("Type '{name}' has no registered constructor")]
    NoConstructor { name: String },

    #[error("Object of type '{type_name}' has no property '{property}'")]
    NoSuchProperty {
        type_name: String,
        property: String,
    },

    #[error("Object of type '{type_name}' has no setter '{setter}'")]
    NoSuchSetter { type_name: String, setter: String },

    #[error("Property '{property}' of '{type_name}' rejected value: {reason}")]
    PropertyRejected {
        type_name: String,
        property: String,
        reason: String,
    },

    #[error("Slot '{slot}' is not present in meta object '{object}'")]
    NoSuchSlot { object: String, slot: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Malformed signature '{signature}': {reason}")]
    MalformedSignature { signature: String, reason: String },

    #[error("No data provider named '{name}' is registered")]
    NoSuchProvider { name: String },

    #[error("No renderer constructor named '{name}' is registered")]
    NoSuchRendererClass { name: String },

    #[error("XML parse error: {0}")]
    Xml(String),
}

impl RenderError {
    /// The localizable message key carried by conversion and validation
    /// failures, used to annotate the offending slot on re-render.
    pub fn message_key(&self) -> Option<&str> {
        match self {
            RenderError::Conversion { key, .. } => Some(key),
            RenderError::Validation { key, .. } => Some(key),
            _ => None,
        }
    }
}

impl From<roxmltree::Error> for RenderError {
    fn from(err: roxmltree::Error) -> Self {
        RenderError::Xml(err.to_string())
    }
}
