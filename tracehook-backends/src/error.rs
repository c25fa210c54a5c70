use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("emulator error: {0}")]
    Engine(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tracer registry error: {0}")]
    Registry(#[from] tracehook::TracerError),
}
