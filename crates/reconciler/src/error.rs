/// Reconciler mutations are designed to never fail outright -- malformed
/// input degrades to a logged default rather than propagating an error.
/// This type exists at the boundary for the one case that can occur if a
/// caller holds the lock across a panic elsewhere in the process.
#[derive(Debug, thiserror::Error)]
pub enum ReconcilerError {
    #[error("reconciler state lock was poisoned")]
    LockPoisoned,
}
