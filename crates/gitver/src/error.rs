use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitVerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ref not found for branch '{0}'")]
    RefNotFound(String),

    #[error("malformed commit object: {0}")]
    MalformedObject(String),

    #[error("git log failed: {0}")]
    GitLog(String),

    #[error("start commit '{0}' not found in history")]
    StartCommitNotFound(String),
}
