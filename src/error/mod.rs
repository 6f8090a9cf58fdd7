#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration Error: {0} should be {1}")]
    Config(String, String),

    #[error("Unknown preset: {0:?}")]
    UnknownPreset(String),
}
