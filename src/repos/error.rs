/*
 * Responsibility
 * - what a repo reports upward (storage failures only; "not found" is `Option::None`)
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error")]
    Db(#[from] sqlx::Error),
}
