#![no_main]

//! Fuzz testing for SDK auth file decoding.
//!
//! Arbitrary bytes (any BOM, any encoding) must either parse into
//! credentials with every required field set, or fail with an error.

use azure_aci::auth::Authentication;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(auth) = Authentication::from_bytes(data) {
        assert!(!auth.client_id.is_empty());
        assert!(!auth.client_secret.is_empty());
        assert!(!auth.subscription_id.is_empty());
        assert!(!auth.tenant_id.is_empty());

        assert!(format!("{:?}", auth).contains("<redacted>"));
        assert!(!auth.resource_manager_base().ends_with('/'));
    }
});
