//! Failure classification for job logs and `error_message`.
//!
//! Purely observational: the category never changes what the worker does.

use crate::{core::solver::TerminationCondition, errors::Error};
use sea_orm::DbErr;
use std::fmt;

/// Human-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The constraints admit no menu
    Infeasible,
    /// The solver ran out of time
    TimeLimit,
    /// The objective diverged
    Unbounded,
    /// The user or the user's nutrition target is missing
    MissingProfile,
    /// The database could not be reached
    DatabaseConnection,
    /// The database rejected a statement
    DatabaseInternal,
    /// Rows were locked by someone else
    LockContention,
    /// The server refused more work
    Overloaded,
    /// Memory ran out
    OutOfMemory,
    /// The solver failed for another reason
    SolverInternal,
    /// Nothing matched
    Unknown,
}

impl ErrorCategory {
    /// Short identifier used as a structured log field.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Infeasible => "infeasible",
            Self::TimeLimit => "time_limit",
            Self::Unbounded => "unbounded",
            Self::MissingProfile => "missing_profile",
            Self::DatabaseConnection => "database_connection",
            Self::DatabaseInternal => "database_internal",
            Self::LockContention => "lock_contention",
            Self::Overloaded => "overloaded",
            Self::OutOfMemory => "out_of_memory",
            Self::SolverInternal => "solver_internal",
            Self::Unknown => "unknown",
        }
    }

    /// Message shown to the user and stored on the failed job.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Infeasible => "制約未達のため解なし",
            Self::TimeLimit => "ソルバー時間制限超過",
            Self::Unbounded => "解が発散（Unbounded）",
            Self::MissingProfile => "ユーザー情報または栄養目標が見つかりません",
            Self::DatabaseConnection => "データベース接続エラー",
            Self::DatabaseInternal => "データベース内部エラー",
            Self::LockContention => "データベースロック競合",
            Self::Overloaded => "サーバー高負荷",
            Self::OutOfMemory => "サーバーメモリ不足",
            Self::SolverInternal => "ソルバー内部エラー",
            Self::Unknown => "不明なエラー",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

fn from_termination(termination: TerminationCondition) -> Option<ErrorCategory> {
    match termination {
        TerminationCondition::Infeasible => Some(ErrorCategory::Infeasible),
        TerminationCondition::TimeLimit => Some(ErrorCategory::TimeLimit),
        TerminationCondition::Unbounded => Some(ErrorCategory::Unbounded),
        TerminationCondition::Optimal | TerminationCondition::Other => None,
    }
}

fn from_kind(error: &Error) -> Option<ErrorCategory> {
    match error {
        Error::UserNotFound { .. } | Error::TargetNotFound { .. } => {
            Some(ErrorCategory::MissingProfile)
        }
        Error::Database(DbErr::Conn(_) | DbErr::ConnectionAcquire(_)) => {
            Some(ErrorCategory::DatabaseConnection)
        }
        Error::Database(_) => Some(ErrorCategory::DatabaseInternal),
        Error::Io(e) if e.kind() == std::io::ErrorKind::OutOfMemory => {
            Some(ErrorCategory::OutOfMemory)
        }
        _ => None,
    }
}

fn from_message(message: &str) -> Option<ErrorCategory> {
    let message = message.to_lowercase();
    let has = |needle: &str| message.contains(needle);

    if has("infeasible") {
        Some(ErrorCategory::Infeasible)
    } else if has("timeout") || has("time limit") {
        Some(ErrorCategory::TimeLimit)
    } else if has("lock") {
        Some(ErrorCategory::LockContention)
    } else if has("too many") || has("overloaded") {
        Some(ErrorCategory::Overloaded)
    } else if has("memory") {
        Some(ErrorCategory::OutOfMemory)
    } else if has("solver") {
        Some(ErrorCategory::SolverInternal)
    } else if has("connection") || has("database") {
        Some(ErrorCategory::DatabaseConnection)
    } else {
        None
    }
}

/// Picks one category for a failure.
///
/// Checked in order: the solver's termination condition, the error's kind,
/// keywords in the error's message. Falls back to [`ErrorCategory::Unknown`].
#[must_use]
pub fn classify(error: Option<&Error>, termination: Option<TerminationCondition>) -> ErrorCategory {
    termination
        .and_then(from_termination)
        .or_else(|| error.and_then(from_kind))
        .or_else(|| error.and_then(|e| from_message(&e.to_string())))
        .unwrap_or(ErrorCategory::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solver_error(message: &str) -> Error {
        Error::Solver {
            message: message.to_string(),
        }
    }

    #[test]
    fn test_termination_takes_precedence() {
        let error = Error::Database(DbErr::Custom("boom".to_string()));
        assert_eq!(
            classify(Some(&error), Some(TerminationCondition::Infeasible)),
            ErrorCategory::Infeasible
        );
        assert_eq!(
            classify(None, Some(TerminationCondition::TimeLimit)),
            ErrorCategory::TimeLimit
        );
        assert_eq!(
            classify(None, Some(TerminationCondition::Unbounded)),
            ErrorCategory::Unbounded
        );
        assert_eq!(
            classify(Some(&error), Some(TerminationCondition::Optimal)),
            ErrorCategory::DatabaseInternal
        );
    }

    #[test]
    fn test_error_kinds() {
        let missing = Error::UserNotFound {
            user_name: "taro".to_string(),
        };
        assert_eq!(classify(Some(&missing), None), ErrorCategory::MissingProfile);

        let oom = Error::Io(std::io::Error::from(std::io::ErrorKind::OutOfMemory));
        assert_eq!(classify(Some(&oom), None), ErrorCategory::OutOfMemory);

        let record = Error::Database(DbErr::RecordNotFound("menu".to_string()));
        assert_eq!(classify(Some(&record), None), ErrorCategory::DatabaseInternal);
    }

    #[test]
    fn test_message_keywords_in_order() {
        let cases = [
            ("model is INFEASIBLE", ErrorCategory::Infeasible),
            ("request timeout", ErrorCategory::TimeLimit),
            ("hit the time limit", ErrorCategory::TimeLimit),
            ("deadlock detected", ErrorCategory::LockContention),
            ("too many clients", ErrorCategory::Overloaded),
            ("cannot allocate memory", ErrorCategory::OutOfMemory),
            ("segfault", ErrorCategory::SolverInternal),
        ];
        for (message, expected) in cases {
            assert_eq!(classify(Some(&solver_error(message)), None), expected, "{message}");
        }

        let config = Error::Config {
            message: "lost connection".to_string(),
        };
        assert_eq!(classify(Some(&config), None), ErrorCategory::DatabaseConnection);
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(classify(None, None), ErrorCategory::Unknown);
        assert_eq!(
            classify(None, Some(TerminationCondition::Other)),
            ErrorCategory::Unknown
        );
        let config = Error::Config {
            message: "bad value".to_string(),
        };
        assert_eq!(classify(Some(&config), None), ErrorCategory::Unknown);
    }

    #[test]
    fn test_messages_are_distinct() {
        let all = [
            ErrorCategory::Infeasible,
            ErrorCategory::TimeLimit,
            ErrorCategory::Unbounded,
            ErrorCategory::MissingProfile,
            ErrorCategory::DatabaseConnection,
            ErrorCategory::DatabaseInternal,
            ErrorCategory::LockContention,
            ErrorCategory::Overloaded,
            ErrorCategory::OutOfMemory,
            ErrorCategory::SolverInternal,
            ErrorCategory::Unknown,
        ];
        let messages: std::collections::HashSet<_> = all.iter().map(|c| c.message()).collect();
        assert_eq!(messages.len(), all.len());
    }
}
