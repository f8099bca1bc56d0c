//! Load-time and configuration errors
//!
//! Everything here is fatal for the operation that raised it: a level load
//! either succeeds completely or returns one of these and nothing else.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("meta layer has no rect labelled 'screen' to calibrate the level scale")]
    MissingCalibrationMarker,

    #[error("meta layer has no rect labelled 'spawn'")]
    MissingSpawnMarker,

    #[error("document has no layer labelled '{0}'")]
    MissingLayer(&'static str),

    #[error("path command #{command} draws before any move command")]
    MalformedPath { command: usize },

    #[error("triangle #{0} has coincident vertices")]
    DegeneratePolygon(usize),

    #[error("polygon with {0} vertices could not be triangulated")]
    Untriangulable(usize),

    #[error("<{tag}> attribute '{name}' is missing or not a number")]
    InvalidAttribute { tag: String, name: String },

    #[error("invalid path data at byte {offset}: {reason}")]
    InvalidPathData { offset: usize, reason: String },

    #[error("document is not a valid element tree: {0}")]
    Document(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse tuning: {0}")]
    Json(#[from] serde_json::Error),
}
