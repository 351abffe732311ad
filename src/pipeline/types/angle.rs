use serde::{Deserialize, Serialize};

/// Estimated object orientation. Computed once per acquisition for
/// angle-aware categories, then discarded with the pick session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleResult {
    /// Principal-axis angle in degrees, 0 = horizontal, range [-90, +90].
    pub degrees: f64,
    pub valid: bool,
}

impl AngleResult {
    pub fn valid(degrees: f64) -> Self {
        Self {
            degrees: degrees.clamp(-90.0, 90.0),
            valid: true,
        }
    }

    /// Orientation could not be determined; callers fall back to the
    /// neutral gripper rotation.
    pub fn invalid() -> Self {
        Self {
            degrees: 0.0,
            valid: false,
        }
    }
}

impl Default for AngleResult {
    fn default() -> Self {
        Self::invalid()
    }
}
