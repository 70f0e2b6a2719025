//! Power state classification from instance view status codes

use serde::{Deserialize, Serialize};

/// One entry of a machine's instance view, e.g. `PowerState/running`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub code: String,
}

impl InstanceStatus {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
        }
    }

    /// `powerstate/stopped` or `powerstate/deallocated`, ignoring case
    pub fn is_stopped(&self) -> bool {
        let mut parts = self.code.split('/');
        let (Some(category), Some(value)) = (parts.next(), parts.next()) else {
            return false;
        };

        category.to_lowercase() == "powerstate"
            && matches!(value.to_lowercase().as_str(), "deallocated" | "stopped")
    }
}

/// A machine is stopped when any of its status entries says so
pub fn is_stopped(statuses: &[InstanceStatus]) -> bool {
    statuses.iter().any(InstanceStatus::is_stopped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_and_deallocated() {
        assert!(InstanceStatus::new("powerstate/stopped").is_stopped());
        assert!(InstanceStatus::new("powerstate/deallocated").is_stopped());
    }

    #[test]
    fn test_case_insensitive() {
        assert!(InstanceStatus::new("PowerState/Stopped").is_stopped());
        assert!(InstanceStatus::new("POWERSTATE/DEALLOCATED").is_stopped());
    }

    #[test]
    fn test_running_and_transitional_states() {
        for code in [
            "PowerState/running",
            "PowerState/starting",
            "PowerState/stopping",
            "PowerState/deallocating",
        ] {
            assert!(!InstanceStatus::new(code).is_stopped(), "{}", code);
        }
    }

    #[test]
    fn test_other_categories_never_match() {
        assert!(!InstanceStatus::new("ProvisioningState/stopped").is_stopped());
        assert!(!InstanceStatus::new("OSState/generalized").is_stopped());
    }

    #[test]
    fn test_malformed_codes() {
        assert!(!InstanceStatus::new("").is_stopped());
        assert!(!InstanceStatus::new("powerstate").is_stopped());
        assert!(!InstanceStatus::new("stopped").is_stopped());
    }

    #[test]
    fn test_any_entry_matches() {
        let statuses = vec![
            InstanceStatus::new("ProvisioningState/succeeded"),
            InstanceStatus::new("PowerState/deallocated"),
        ];
        assert!(is_stopped(&statuses));
        assert!(!is_stopped(&statuses[..1]));
        assert!(!is_stopped(&[]));
    }
}
