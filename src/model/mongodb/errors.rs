//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps.

use mongodb::error::{
    Error as DbError, ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR,
    UNKNOWN_TRANSACTION_COMMIT_RESULT,
};

pub const DUPLICATE_KEY: i32 = 11000;

/// Return true if the given error is a duplicate key error.
///
/// Plain writes report these as write errors, but upserts through `findAndModify` report
/// them as command errors.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(ref e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// How to recover from an error raised inside or while committing a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionRetry {
    /// Nothing was applied; run the whole transaction again.
    Transaction,
    /// The commit may or may not have been applied; only the commit can be repeated.
    Commit,
    /// Not recoverable.
    GiveUp,
}

impl TransactionRetry {
    pub fn for_error(err: &DbError) -> Self {
        Self::from_labels(|label| err.contains_label(label))
    }

    fn from_labels(has_label: impl Fn(&str) -> bool) -> Self {
        if has_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) {
            Self::Commit
        } else if has_label(TRANSIENT_TRANSACTION_ERROR) {
            Self::Transaction
        } else {
            Self::GiveUp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retry_for(labels: &[&str]) -> TransactionRetry {
        TransactionRetry::from_labels(|label| labels.contains(&label))
    }

    #[test]
    fn write_conflicts_rerun_transaction() {
        assert_eq!(
            retry_for(&[TRANSIENT_TRANSACTION_ERROR]),
            TransactionRetry::Transaction
        );
    }

    #[test]
    fn unknown_commit_result_only_recommits() {
        assert_eq!(
            retry_for(&[UNKNOWN_TRANSACTION_COMMIT_RESULT]),
            TransactionRetry::Commit
        );
        // A rerun could see its own committed vote and reject it as a duplicate.
        assert_eq!(
            retry_for(&[UNKNOWN_TRANSACTION_COMMIT_RESULT, TRANSIENT_TRANSACTION_ERROR]),
            TransactionRetry::Commit
        );
    }

    #[test]
    fn unlabelled_errors_give_up() {
        assert_eq!(retry_for(&[]), TransactionRetry::GiveUp);
        assert_eq!(retry_for(&["SomethingElse"]), TransactionRetry::GiveUp);
    }
}
