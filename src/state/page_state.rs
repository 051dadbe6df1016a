/// Page state definitions for tracking crawl progress
///
/// This module defines all possible states a page can be in during a mirror run.
use std::fmt;

/// Represents the current state of a page in the crawl process
///
/// ```text
/// Pending -> Fetching -> Saved
///                     -> Failed
///                     -> Skipped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Page is known to the frontier and waiting to be fetched
    Pending,

    /// Page is currently being fetched and transformed
    Fetching,

    // ===== Terminal Success States =====
    /// Page was fetched, transformed and written to disk
    Saved,

    // ===== Terminal Error States =====
    /// Page could not be fetched after all attempts
    Failed,

    // ===== Terminal Skip States =====
    /// Page Content-Type is not HTML, nothing was saved
    Skipped,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if this is an active state (page may still be processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Fetching)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved)
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns true if moving from this state to `next` is allowed
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Fetching, Self::Saved)
                | (Self::Fetching, Self::Failed)
                | (Self::Fetching, Self::Skipped)
        )
    }

    /// Short lowercase name, used in logs and statistics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Saved => "saved",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Saved,
            Self::Failed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!PageState::Pending.is_terminal());
        assert!(!PageState::Fetching.is_terminal());

        assert!(PageState::Saved.is_terminal());
        assert!(PageState::Failed.is_terminal());
        assert!(PageState::Skipped.is_terminal());
    }

    #[test]
    fn test_is_success_and_error() {
        assert!(PageState::Saved.is_success());
        assert!(!PageState::Failed.is_success());
        assert!(PageState::Failed.is_error());
        assert!(!PageState::Skipped.is_error());
    }

    #[test]
    fn test_valid_transitions() {
        assert!(PageState::Pending.can_transition_to(PageState::Fetching));
        assert!(PageState::Fetching.can_transition_to(PageState::Saved));
        assert!(PageState::Fetching.can_transition_to(PageState::Failed));
        assert!(PageState::Fetching.can_transition_to(PageState::Skipped));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!PageState::Pending.can_transition_to(PageState::Saved));
        assert!(!PageState::Saved.can_transition_to(PageState::Fetching));
        assert!(!PageState::Failed.can_transition_to(PageState::Pending));
        assert!(!PageState::Fetching.can_transition_to(PageState::Fetching));
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for from in PageState::all_states().into_iter().filter(|s| s.is_terminal()) {
            for to in PageState::all_states() {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PageState::Pending), "pending");
        assert_eq!(format!("{}", PageState::Saved), "saved");
    }
}
