#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown sensor type: {0}")]
    UnknownSensorType(String),
}
