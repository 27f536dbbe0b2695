//! End-to-end validation scenarios against in-memory collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lcp_core::{
    BuildMode, CrlService, Document, LcpError, Observer, ObserverPolicy, Services, StatusError,
    ValidatedDocuments, ValidationConfig, ValidationEngine,
};

use crate::mocks::{
    DeviceBehavior, LicenseFixture, ScriptedPassphrases, StatusFixture, StubCrl, StubCrypto,
    StubDevices, StubNetwork, StubRepository, UnreachableCrl,
};

const PASSPHRASE: &str = "tigger";
const STATUS_URL: &str = "https://lsd.example.org/licenses/df09ac25/status";
const LICENSE_URL: &str = "https://lsd.example.org/licenses/df09ac25";
const REGISTER_URL: &str = "https://lsd.example.org/licenses/df09ac25/register";

/// Notifications captured by a test observer.
#[derive(Default)]
struct Captured {
    notifications: Vec<(Option<ValidatedDocuments>, Option<LcpError>)>,
}

impl Captured {
    fn last(&self) -> &(Option<ValidatedDocuments>, Option<LcpError>) {
        self.notifications.last().expect("no notification received")
    }

    fn documents(&self) -> ValidatedDocuments {
        self.last().0.clone().expect("expected validated documents")
    }

    fn error(&self) -> LcpError {
        self.last().1.clone().expect("expected an error")
    }
}

fn observer(slot: &Arc<Mutex<Captured>>) -> Observer {
    let slot = Arc::clone(slot);
    Box::new(move |documents, error| {
        slot.lock()
            .unwrap()
            .notifications
            .push((documents.cloned(), error.cloned()));
    })
}

async fn engine(
    network: Arc<StubNetwork>,
    passphrases: ScriptedPassphrases,
    devices: Arc<StubDevices>,
    repository: Arc<StubRepository>,
) -> ValidationEngine {
    engine_with(
        network,
        passphrases,
        devices,
        repository,
        Arc::new(StubCrl),
        StubCrypto::accepting(PASSPHRASE),
        Some(BuildMode::Test),
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn engine_with(
    network: Arc<StubNetwork>,
    passphrases: ScriptedPassphrases,
    devices: Arc<StubDevices>,
    repository: Arc<StubRepository>,
    crl: Arc<dyn CrlService>,
    crypto: StubCrypto,
    build_mode: Option<BuildMode>,
) -> ValidationEngine {
    ValidationEngine::new(
        ValidationConfig {
            authenticator: None,
            build_mode,
        },
        Services {
            network,
            crl,
            passphrases: Arc::new(passphrases),
            devices,
            repository,
            crypto: Arc::new(crypto),
        },
    )
    .await
}

// ============================================================================
// Happy paths
// ============================================================================

#[tokio::test]
async fn offline_license_validates_without_status_fetch() {
    let network = Arc::new(StubNetwork::new());
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine(
        Arc::clone(&network),
        ScriptedPassphrases::always(PASSPHRASE),
        Arc::clone(&devices),
        Arc::clone(&repository),
    )
    .await;

    let seed = LicenseFixture::default().json();
    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(seed), observer(&captured))
        .await;

    let captured = captured.lock().unwrap();
    let documents = captured.documents();
    assert!(documents.context().is_ok());
    assert!(documents.status().is_none());
    assert_eq!(engine.state().name(), "valid");

    // No status link, so the network was never touched.
    assert!(network.calls().is_empty());
    assert_eq!(devices.call_count(), 0);
    assert_eq!(repository.add_count(), 1);
}

#[tokio::test]
async fn newer_license_is_downloaded_and_validated() {
    let old_license = LicenseFixture {
        status_url: Some(STATUS_URL),
        ..LicenseFixture::default()
    };
    let fresh_license = LicenseFixture {
        updated: "2024-03-01T00:00:00Z",
        status_url: Some(STATUS_URL),
        ..LicenseFixture::default()
    };
    let status = StatusFixture {
        updated_license: "2024-03-01T00:00:00Z",
        ..StatusFixture::default()
    };

    let network = Arc::new(
        StubNetwork::new()
            .serve(STATUS_URL, status.json())
            .serve(LICENSE_URL, fresh_license.json()),
    );
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let validated = Arc::new(AtomicUsize::new(0));
    let hook_counter = Arc::clone(&validated);

    let mut engine = engine(
        Arc::clone(&network),
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        Arc::clone(&repository),
    )
    .await
    .on_license_validated(Box::new(move |_| {
        hook_counter.fetch_add(1, Ordering::SeqCst);
    }));

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(old_license.json()), observer(&captured))
        .await;

    let captured = captured.lock().unwrap();
    let documents = captured.documents();
    assert!(documents.context().is_ok());
    assert_eq!(
        documents.license().updated().to_rfc3339(),
        "2024-03-01T00:00:00+00:00"
    );
    // The carried Status Document was not fetched twice.
    assert_eq!(network.calls(), vec![STATUS_URL, LICENSE_URL]);
    // One persistence hook call per distinct license payload.
    assert_eq!(validated.load(Ordering::SeqCst), 2);
    assert_eq!(repository.add_count(), 2);
}

#[tokio::test]
async fn refetching_identical_license_bytes_fires_the_hook_once() {
    let license = LicenseFixture {
        status_url: Some(STATUS_URL),
        ..LicenseFixture::default()
    };
    // The server advertises a newer license but serves the same bytes.
    let status = StatusFixture {
        updated_license: "2024-03-01T00:00:00Z",
        ..StatusFixture::default()
    };

    let network = Arc::new(
        StubNetwork::new()
            .serve(STATUS_URL, status.json())
            .serve(LICENSE_URL, license.json()),
    );
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let validated = Arc::new(AtomicUsize::new(0));
    let hook_counter = Arc::clone(&validated);

    let mut engine = engine(
        network,
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        Arc::clone(&repository),
    )
    .await
    .on_license_validated(Box::new(move |_| {
        hook_counter.fetch_add(1, Ordering::SeqCst);
    }));

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(license.json()), observer(&captured))
        .await;

    let captured = captured.lock().unwrap();
    assert!(captured.documents().context().is_ok());
    // Same payload twice in one run: the hook and the repository fire once.
    assert_eq!(validated.load(Ordering::SeqCst), 1);
    assert_eq!(repository.add_count(), 1);
}

#[tokio::test]
async fn registration_reply_refreshes_the_status_document() {
    let license = LicenseFixture {
        status_url: Some(STATUS_URL),
        ..LicenseFixture::default()
    };
    let first_status = StatusFixture {
        register_url: Some(REGISTER_URL),
        register_events: 0,
        ..StatusFixture::default()
    };
    let refreshed_status = StatusFixture {
        register_url: Some(REGISTER_URL),
        register_events: 1,
        updated_status: "2024-02-04T09:00:00Z",
        ..StatusFixture::default()
    };

    let network = Arc::new(StubNetwork::new().serve(STATUS_URL, first_status.json()));
    let devices = Arc::new(StubDevices::new(DeviceBehavior::ReplyOnce(
        refreshed_status.json(),
    )));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine(
        network,
        ScriptedPassphrases::always(PASSPHRASE),
        Arc::clone(&devices),
        repository,
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(license.json()), observer(&captured))
        .await;

    let captured = captured.lock().unwrap();
    let documents = captured.documents();
    assert!(documents.context().is_ok());

    // The refreshed Status Document replaced the first one.
    let status = documents.status().expect("status document expected");
    assert_eq!(status.device_registrations(), 1);
    assert_eq!(devices.call_count(), 2);
}

// ============================================================================
// Lifecycle errors terminate in Valid
// ============================================================================

#[tokio::test]
async fn expired_license_yields_documents_with_expired_error() {
    let license = LicenseFixture {
        rights_start: Some("2019-01-01T00:00:00Z"),
        rights_end: Some("2020-01-01T00:00:00Z"),
        status_url: Some(STATUS_URL),
        ..LicenseFixture::default()
    };
    let status = StatusFixture {
        status: "expired",
        ..StatusFixture::default()
    };

    let network = Arc::new(StubNetwork::new().serve(STATUS_URL, status.json()));
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine(
        network,
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        repository,
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(license.json()), observer(&captured))
        .await;

    let captured = captured.lock().unwrap();
    let (documents, error) = captured.last();
    assert!(error.is_none());

    let documents = documents.clone().unwrap();
    match documents.status_error() {
        Some(StatusError::Expired { end, .. }) => {
            assert_eq!(end.to_rfc3339(), "2020-01-01T00:00:00+00:00");
        }
        other => panic!("expected expired status error, got {other:?}"),
    }
    // Metadata stays readable, the context does not.
    assert_eq!(documents.license().id, "df09ac25-a386-4c5c-b167-33ce4c36ca65");
    assert!(documents.context().is_err());
}

#[tokio::test]
async fn revoked_license_reports_registered_device_count() {
    let license = LicenseFixture {
        rights_start: Some("2019-01-01T00:00:00Z"),
        rights_end: Some("2020-01-01T00:00:00Z"),
        status_url: Some(STATUS_URL),
        ..LicenseFixture::default()
    };
    let status = StatusFixture {
        status: "revoked",
        register_events: 3,
        ..StatusFixture::default()
    };

    let network = Arc::new(StubNetwork::new().serve(STATUS_URL, status.json()));
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine(
        network,
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        repository,
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(license.json()), observer(&captured))
        .await;

    let captured = captured.lock().unwrap();
    let documents = captured.documents();
    match documents.status_error() {
        Some(StatusError::Revoked { devices, .. }) => assert_eq!(*devices, 3),
        other => panic!("expected revoked status error, got {other:?}"),
    }
}

// ============================================================================
// Cancellation and retry
// ============================================================================

#[tokio::test]
async fn cancelled_prompt_returns_to_start_and_a_retry_succeeds() {
    let network = Arc::new(StubNetwork::new());
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    // First prompt dismissed, second one answered.
    let mut engine = engine(
        network,
        ScriptedPassphrases::script(vec![None], Some(PASSPHRASE)),
        devices,
        repository,
    )
    .await;

    let seed = LicenseFixture::default().json();

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(seed.clone()), observer(&captured))
        .await;

    {
        let captured = captured.lock().unwrap();
        let (documents, error) = captured.last();
        assert!(documents.is_none());
        assert!(error.is_none());
    }
    assert_eq!(engine.state().name(), "start");
    // The one-shot observer was consumed by the cancellation notification.
    assert_eq!(engine.observer_count(), 0);

    // Same machine, same seed, new attempt.
    let retried = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(seed), observer(&retried))
        .await;

    let retried = retried.lock().unwrap();
    assert!(retried.documents().context().is_ok());
    assert_eq!(engine.state().name(), "valid");
}

// ============================================================================
// Degraded paths
// ============================================================================

#[tokio::test]
async fn registration_failure_never_denies_access() {
    let license = LicenseFixture {
        status_url: Some(STATUS_URL),
        ..LicenseFixture::default()
    };
    let status = StatusFixture {
        register_url: Some(REGISTER_URL),
        ..StatusFixture::default()
    };
    let status_bytes = status.json();

    let network = Arc::new(StubNetwork::new().serve(STATUS_URL, status_bytes.clone()));
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Fail));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine(
        network,
        ScriptedPassphrases::always(PASSPHRASE),
        Arc::clone(&devices),
        repository,
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(license.json()), observer(&captured))
        .await;

    let captured = captured.lock().unwrap();
    let documents = captured.documents();
    assert!(documents.context().is_ok());
    assert_eq!(devices.call_count(), 1);
    // The original Status Document is preserved byte for byte.
    assert_eq!(documents.status().unwrap().raw(), status_bytes.as_slice());
}

#[tokio::test]
async fn status_fetch_failure_degrades_to_offline_validation() {
    let license = LicenseFixture {
        status_url: Some(STATUS_URL),
        ..LicenseFixture::default()
    };

    // Nothing served: the status fetch 404s.
    let network = Arc::new(StubNetwork::new());
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine(
        Arc::clone(&network),
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        repository,
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(license.json()), observer(&captured))
        .await;

    let captured = captured.lock().unwrap();
    let documents = captured.documents();
    assert!(documents.context().is_ok());
    assert!(documents.status().is_none());
    assert_eq!(network.calls(), vec![STATUS_URL]);
}

#[tokio::test]
async fn status_parse_failure_degrades_to_offline_validation() {
    let license = LicenseFixture {
        status_url: Some(STATUS_URL),
        ..LicenseFixture::default()
    };

    let network = Arc::new(StubNetwork::new().serve(STATUS_URL, b"<html>504</html>".to_vec()));
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine(
        network,
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        repository,
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(license.json()), observer(&captured))
        .await;

    let captured = captured.lock().unwrap();
    let documents = captured.documents();
    assert!(documents.context().is_ok());
    assert!(documents.status().is_none());
}

#[tokio::test]
async fn license_refetch_failure_keeps_the_stale_license() {
    let license = LicenseFixture {
        status_url: Some(STATUS_URL),
        ..LicenseFixture::default()
    };
    // The server advertises a newer license but refuses to serve it.
    let status = StatusFixture {
        updated_license: "2024-03-01T00:00:00Z",
        ..StatusFixture::default()
    };

    let network = Arc::new(StubNetwork::new().serve(STATUS_URL, status.json()));
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine(
        Arc::clone(&network),
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        repository,
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(license.json()), observer(&captured))
        .await;

    let captured = captured.lock().unwrap();
    let documents = captured.documents();
    assert!(documents.context().is_ok());
    // Stale license, but the fetched Status Document is carried along.
    assert_eq!(
        documents.license().updated().to_rfc3339(),
        "2024-02-01T10:30:00+00:00"
    );
    assert!(documents.status().is_some());
    assert_eq!(network.calls(), vec![STATUS_URL, LICENSE_URL]);
}

#[tokio::test]
async fn repository_failure_never_affects_the_outcome() {
    let network = Arc::new(StubNetwork::new());
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::failing());

    let mut engine = engine(
        network,
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        Arc::clone(&repository),
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(
            Document::License(LicenseFixture::default().json()),
            observer(&captured),
        )
        .await;

    let captured = captured.lock().unwrap();
    assert!(captured.documents().context().is_ok());
    assert_eq!(repository.add_count(), 1);
}

// ============================================================================
// Fatal paths
// ============================================================================

#[tokio::test]
async fn malformed_license_is_fatal() {
    let network = Arc::new(StubNetwork::new());
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine(
        network,
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        Arc::clone(&repository),
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(
            Document::License(b"this is no license".to_vec()),
            observer(&captured),
        )
        .await;

    let captured = captured.lock().unwrap();
    assert!(matches!(
        captured.error(),
        LcpError::LicenseParsing { .. }
    ));
    assert_eq!(engine.state().name(), "failure");
    assert_eq!(repository.add_count(), 0);
}

#[tokio::test]
async fn wrong_passphrase_is_fatal() {
    let network = Arc::new(StubNetwork::new());
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine(
        network,
        ScriptedPassphrases::always("not the passphrase"),
        devices,
        repository,
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(
            Document::License(LicenseFixture::default().json()),
            observer(&captured),
        )
        .await;

    let captured = captured.lock().unwrap();
    assert!(matches!(captured.error(), LcpError::Integrity { .. }));
}

#[tokio::test]
async fn unreachable_crl_is_fatal_at_integrity_time() {
    let network = Arc::new(StubNetwork::new());
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine_with(
        network,
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        repository,
        Arc::new(UnreachableCrl),
        StubCrypto::accepting(PASSPHRASE),
        Some(BuildMode::Test),
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(
            Document::License(LicenseFixture::default().json()),
            observer(&captured),
        )
        .await;

    let captured = captured.lock().unwrap();
    assert!(matches!(captured.error(), LcpError::Network { .. }));
    assert_eq!(engine.state().name(), "failure");
}

// ============================================================================
// Profiles and build flavor
// ============================================================================

#[tokio::test]
async fn non_basic_profile_fails_in_test_builds() {
    let license = LicenseFixture {
        profile: "http://readium.org/lcp/profile-1.0",
        ..LicenseFixture::default()
    };

    let network = Arc::new(StubNetwork::new());
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine(
        network,
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        Arc::clone(&repository),
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(license.json()), observer(&captured))
        .await;

    let captured = captured.lock().unwrap();
    match captured.error() {
        LcpError::LicenseProfileNotSupported { profile } => {
            assert_eq!(profile, "http://readium.org/lcp/profile-1.0");
        }
        other => panic!("expected profile error, got {other:?}"),
    }
    // The gate runs before any persistence.
    assert_eq!(repository.add_count(), 0);
}

#[tokio::test]
async fn production_builds_accept_the_full_profile_registry() {
    let license = LicenseFixture {
        profile: "http://readium.org/lcp/profile-1.0",
        ..LicenseFixture::default()
    };

    let network = Arc::new(StubNetwork::new());
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine_with(
        network,
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        repository,
        Arc::new(StubCrl),
        StubCrypto::production(PASSPHRASE),
        None, // probe the crypto layer
    )
    .await;
    assert_eq!(engine.build_mode(), BuildMode::Production);

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(license.json()), observer(&captured))
        .await;

    let captured = captured.lock().unwrap();
    assert!(captured.documents().context().is_ok());
}

#[tokio::test]
async fn probe_rejection_means_test_build() {
    let network = Arc::new(StubNetwork::new());
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let engine = engine_with(
        network,
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        repository,
        Arc::new(StubCrl),
        StubCrypto::accepting(PASSPHRASE),
        None,
    )
    .await;

    assert_eq!(engine.build_mode(), BuildMode::Test);
}

// ============================================================================
// Observers and seeds
// ============================================================================

#[tokio::test]
async fn late_subscribers_see_the_terminal_state() {
    let network = Arc::new(StubNetwork::new());
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine(
        network,
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        repository,
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(
            Document::License(LicenseFixture::default().json()),
            observer(&captured),
        )
        .await;
    assert_eq!(engine.observer_count(), 0);

    // A one-shot late subscriber fires synchronously and is not enrolled.
    let late = Arc::new(Mutex::new(Captured::default()));
    engine.subscribe(observer(&late), ObserverPolicy::Once);
    assert!(late.lock().unwrap().documents().context().is_ok());
    assert_eq!(engine.observer_count(), 0);

    // A persistent late subscriber fires and stays enrolled.
    let watcher = Arc::new(Mutex::new(Captured::default()));
    engine.subscribe(observer(&watcher), ObserverPolicy::Always);
    assert_eq!(watcher.lock().unwrap().notifications.len(), 1);
    assert_eq!(engine.observer_count(), 1);
}

#[tokio::test]
async fn always_observers_survive_repeated_notifications() {
    let network = Arc::new(StubNetwork::new());
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    // Dismiss the first prompt, answer the second.
    let mut engine = engine(
        network,
        ScriptedPassphrases::script(vec![None], Some(PASSPHRASE)),
        devices,
        repository,
    )
    .await;

    let watcher = Arc::new(Mutex::new(Captured::default()));
    engine.subscribe(observer(&watcher), ObserverPolicy::Always);

    let seed = LicenseFixture::default().json();
    let first = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(seed.clone()), observer(&first))
        .await;
    let second = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(Document::License(seed), observer(&second))
        .await;

    let watcher = watcher.lock().unwrap();
    // One cancellation notification, one terminal notification.
    assert_eq!(watcher.notifications.len(), 2);
    assert!(watcher.notifications[0].0.is_none());
    assert!(watcher.notifications[0].1.is_none());
    assert!(watcher.notifications[1].0.is_some());
}

#[tokio::test]
async fn status_seed_from_start_is_a_no_op() {
    let network = Arc::new(StubNetwork::new());
    let devices = Arc::new(StubDevices::new(DeviceBehavior::Silent));
    let repository = Arc::new(StubRepository::new());

    let mut engine = engine(
        Arc::clone(&network),
        ScriptedPassphrases::always(PASSPHRASE),
        devices,
        repository,
    )
    .await;

    let captured = Arc::new(Mutex::new(Captured::default()));
    engine
        .validate(
            Document::Status(StatusFixture::default().json()),
            observer(&captured),
        )
        .await;

    // Nothing to attach the status to: the machine stays at start.
    assert_eq!(engine.state().name(), "start");
    assert!(captured.lock().unwrap().notifications.is_empty());
    assert!(network.calls().is_empty());
}
