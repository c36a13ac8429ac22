//! Per-dialect lookup table.
//!
//! AWX, AAP and Tower expose the same versioned resource paths; what
//! differs is cosmetic metadata such as which field of the ping payload
//! carries the controller version. Keeping those differences in one
//! table keeps the rest of the client dialect-free.

use crate::domain::PlatformType;

pub struct PlatformProfile {
    pub display: &'static str,
    pub api_prefix: &'static str,
    /// Ping payload fields checked, in order, for version metadata.
    pub version_fields: &'static [&'static str],
}

static AWX: PlatformProfile = PlatformProfile {
    display: "AWX",
    api_prefix: "/api/v2",
    version_fields: &["version"],
};

static AAP: PlatformProfile = PlatformProfile {
    display: "Ansible Automation Platform",
    api_prefix: "/api/v2",
    version_fields: &["controller_version", "version"],
};

static TOWER: PlatformProfile = PlatformProfile {
    display: "Ansible Tower",
    api_prefix: "/api/v2",
    version_fields: &["version"],
};

pub fn profile(platform: PlatformType) -> &'static PlatformProfile {
    match platform {
        PlatformType::Awx => &AWX,
        PlatformType::Aap => &AAP,
        PlatformType::Tower => &TOWER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_dialects_share_the_versioned_prefix() {
        for platform in [PlatformType::Awx, PlatformType::Aap, PlatformType::Tower] {
            assert_eq!(profile(platform).api_prefix, "/api/v2");
        }
    }

    #[test]
    fn aap_prefers_controller_version_field() {
        assert_eq!(
            profile(PlatformType::Aap).version_fields.first(),
            Some(&"controller_version")
        );
    }
}
