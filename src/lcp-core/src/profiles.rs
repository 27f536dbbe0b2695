//! Supported encryption profiles and build-flavor detection.
//!
//! An encryption profile pins the algorithms and key schedule a license
//! uses. Test builds of the native library only carry the keys for the
//! basic profile; production builds accept the full registry. The flavor
//! is detected once at engine construction by asking the native layer to
//! validate an embedded production-signed license with its known probe
//! passphrase: only a production build can do so.

use crate::services::NativeCrypto;

/// Profile accepted by every build of the native library.
pub const BASIC_PROFILE: &str = "http://readium.org/lcp/basic-profile";

/// Profiles additionally accepted by production builds.
pub const PRODUCTION_PROFILES: &[&str] = &[
    "http://readium.org/lcp/profile-1.0",
    "http://readium.org/lcp/profile-2.0",
    "http://readium.org/lcp/profile-2.1",
];

/// Production-signed license shipped with the binary, used as the probe.
const PROBE_LICENSE: &str = include_str!("../assets/prod-license.lcpl");

/// Passphrase of the embedded probe license.
const PROBE_PASSPHRASE: &str = "One passphrase";

/// Flavor of the native library this client is linked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Production keys present; the full profile registry is accepted.
    Production,
    /// Test build; only [`BASIC_PROFILE`] is accepted.
    Test,
}

impl BuildMode {
    /// Check whether this build accepts the given encryption profile.
    #[must_use]
    pub fn accepts(&self, profile: &str) -> bool {
        profile == BASIC_PROFILE
            || (*self == Self::Production && PRODUCTION_PROFILES.contains(&profile))
    }

    /// Detect the build flavor by probing the native layer with the
    /// embedded production license.
    pub async fn detect(crypto: &dyn NativeCrypto) -> Self {
        let found = crypto
            .find_one_valid_passphrase(PROBE_LICENSE, &[PROBE_PASSPHRASE.to_string()])
            .await;
        if found.is_some() {
            Self::Production
        } else {
            Self::Test
        }
    }
}
