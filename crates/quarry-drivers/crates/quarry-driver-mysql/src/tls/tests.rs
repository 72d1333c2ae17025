use super::*;

#[test]
fn test_plain_modes_have_no_ssl_opts() {
    assert!(build_ssl_opts(TlsMode::Disable).is_none());
    assert!(build_ssl_opts(TlsMode::Prefer).is_none());
}

#[test]
fn test_require_skips_verification() {
    let opts = build_ssl_opts(TlsMode::Require).unwrap();
    assert!(opts.accept_invalid_certs());
    assert!(opts.skip_domain_validation());
}

#[test]
fn test_verify_modes() {
    let ca_only = build_ssl_opts(TlsMode::VerifyCa).unwrap();
    assert!(!ca_only.accept_invalid_certs());
    assert!(ca_only.skip_domain_validation());

    let full = build_ssl_opts(TlsMode::VerifyFull).unwrap();
    assert!(!full.accept_invalid_certs());
    assert!(!full.skip_domain_validation());
}
