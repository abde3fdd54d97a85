use portfolio_core::{AdminGate, SiteConfig};

#[test]
fn listed_email_is_authorized_case_and_whitespace_insensitively() {
    let gate = AdminGate::new(["owner@site.dev", "Second@Site.dev"]);
    assert!(gate.is_authorized_admin(Some("owner@site.dev")));
    assert!(gate.is_authorized_admin(Some("  OWNER@Site.Dev ")));
    assert!(gate.is_authorized_admin(Some("second@site.dev")));
}

#[test]
fn unlisted_or_missing_email_is_rejected() {
    let gate = AdminGate::new(["owner@site.dev"]);
    assert!(!gate.is_authorized_admin(Some("intruder@site.dev")));
    assert!(!gate.is_authorized_admin(Some("")));
    assert!(!gate.is_authorized_admin(None));
}

#[test]
fn empty_allow_list_admits_any_non_empty_email() {
    let gate = AdminGate::new(Vec::<String>::new());
    assert!(gate.is_open());
    assert!(gate.is_authorized_admin(Some("anyone@anywhere.io")));
    assert!(!gate.is_authorized_admin(Some("")));
    assert!(!gate.is_authorized_admin(None));
}

#[test]
fn allow_list_built_from_configuration() {
    let config = SiteConfig::from_lookup(|name| match name {
        "PORTFOLIO_ADMIN_EMAILS" => Some(" A@x.com , ,b@Y.com".to_string()),
        _ => None,
    });
    let gate = config.admin_gate();
    assert_eq!(gate.allowed_emails(), ["a@x.com", "b@y.com"]);
    assert!(gate.is_authorized_admin(Some("B@y.com")));
    assert!(!gate.is_authorized_admin(Some("c@z.com")));
}

#[test]
fn configured_store_path_opens_sqlite_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.sqlite3");
    let path_value = path.to_string_lossy().to_string();
    let config = SiteConfig::from_lookup(move |name| match name {
        "PORTFOLIO_STORE_PATH" => Some(path_value.clone()),
        _ => None,
    });

    assert!(!config.is_demo());
    assert!(config.open_store().unwrap().is_available());
    assert!(path.exists());
}

#[test]
fn unopenable_store_degrades_to_fallback_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path_value = dir
        .path()
        .join("missing")
        .join("site.sqlite3")
        .to_string_lossy()
        .to_string();
    let config = SiteConfig::from_lookup(move |name| match name {
        "PORTFOLIO_STORE_PATH" => Some(path_value.clone()),
        _ => None,
    });

    assert!(config.open_store().is_err());
    let handle = config.open_store_or_fallback();
    assert!(!handle.is_available());

    let site = portfolio_core::SiteContent::activate(&handle);
    assert!(!site.is_loading());
    assert_eq!(
        site.home_snapshot().profile,
        portfolio_core::model::defaults::default_profile()
    );
}
