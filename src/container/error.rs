#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("empty container id")]
    EmptyContainerID,
    #[error("container id `{0}` is too long")]
    InvalidContainerID(String),
}
pub type Result<T> = std::result::Result<T, Error>;
