//! End-to-end behaviour of `Manager` against a scripted transport.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use appman_core::crypto::{derive_key, seal};
use appman_core::{
    FixedRegion, KeyEncoding, Manager, ManagerConfig, Params, Summary, Transport, TransportError,
};
use serde_json::{Value, json};

const PASSPHRASE: &str = "correct horse battery staple";
const N1: &str = "N1-0123456789abc";
const N2: &str = "N2-0123456789abc";
const APP1_V1: &str = r#"{"id":"app1","name":"App","version":"1.0","secret":"s1"}"#;
const APP1_V2: &str = r#"{"id":"app1","name":"App","version":"2.0","secret":"s2"}"#;

type Reply = Result<Value, TransportError>;

/// Replays queued replies per endpoint path and records every request.
#[derive(Default)]
struct Scripted {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(String, Params)>>,
    in_flight: AtomicBool,
}

impl Scripted {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, path: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .count()
    }

    fn last_params(&self, path: &str) -> Option<Params> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, params)| params.clone())
    }
}

impl Transport for Scripted {
    fn build_url(&self, path: &str) -> String {
        path.to_string()
    }

    fn request(&self, url: &str, params: &Params) -> Reply {
        assert!(
            !self.in_flight.swap(true, Ordering::SeqCst),
            "concurrent request on one manager"
        );
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), params.clone()));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(TransportError::Unavailable("connection refused".into())));
        self.in_flight.store(false, Ordering::SeqCst);
        reply
    }
}

fn sealed_with(plain: &str, secret: &str, nonce: &str, encoding: KeyEncoding) -> Reply {
    let key = derive_key(nonce, secret, encoding).unwrap();
    let ct = seal(plain.as_bytes(), nonce, &key).unwrap();
    Ok(json!({ "sucess": true, "hash": nonce, "result": ct }))
}

fn sealed(plain: &str, secret: &str, nonce: &str) -> Reply {
    sealed_with(plain, secret, nonce, KeyEncoding::Raw)
}

fn rejected() -> Reply {
    Ok(json!({ "sucess": false }))
}

fn down() -> Reply {
    Err(TransportError::Unavailable("connection refused".into()))
}

fn packages_json(names: &[&str]) -> String {
    let list: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
    json!({ "packages": list }).to_string()
}

fn config() -> ManagerConfig {
    ManagerConfig::new("https://apps.example.com", PASSPHRASE)
}

fn manager(transport: &Arc<Scripted>, config: ManagerConfig) -> Manager {
    let transport: Arc<dyn Transport> = transport.clone();
    Manager::new("app1", config, transport).with_region(Arc::new(FixedRegion("JP".into())))
}

fn names(packages: &[appman_core::Package]) -> Vec<&str> {
    packages.iter().filter_map(|p| p.get_str("name")).collect()
}

#[test]
fn first_summary_is_decrypted_and_cached() {
    let t = Scripted::new();
    // Ciphertext produced by an independent AES-256-CBC implementation.
    t.push(
        "api/application",
        Ok(json!({
            "sucess": true,
            "hash": N1,
            "result": "HLXse4zMROjvl/cDn1BsdzUedu5y1zJPvKCtBHcwGrHfIbcovq3ObYXLL/NdSO4YNhAmRO061V8OPrLSgn7ECQ=="
        })),
    );
    let m = manager(&t, config());

    let summary = m.summary().unwrap();
    assert_eq!(summary, Summary::new("app1", "App", "1.0", "s1"));
    assert_eq!(m.cached().summary, Some(summary));
    assert_eq!(
        t.last_params("api/application").unwrap().get("id").map(String::as_str),
        Some("app1")
    );
}

#[test]
fn unchanged_version_is_not_an_upgrade() {
    let t = Scripted::new();
    t.push("api/application", sealed(APP1_V1, PASSPHRASE, N1))
        .push("api/application", sealed(APP1_V1, PASSPHRASE, N1));
    let m = manager(&t, config());

    let first = m.summary().unwrap();
    let second = m.summary().unwrap();
    assert_eq!(first, second);
    assert!(!m.is_upgrade(Some(&second)));
    assert!(m.is_upgrade(Some(&Summary::new("app1", "App", "2.0", "s2"))));
    assert!(m.is_upgrade(None));
}

#[test]
fn rejected_summary_leaves_cache_untouched() {
    let t = Scripted::new();
    t.push("api/application", sealed(APP1_V1, PASSPHRASE, N1))
        .push("api/packages", sealed(&packages_json(&["core"]), "s1", N2))
        .push("api/application", rejected());
    let m = manager(&t, config());

    m.packages().unwrap();
    let before = m.cached();

    assert_eq!(m.summary(), before.summary);
    assert_eq!(m.cached(), before);
}

#[test]
fn rejected_first_summary_yields_nothing() {
    let t = Scripted::new();
    t.push("api/application", rejected());
    let m = manager(&t, config());

    assert!(m.summary().is_none());
    assert!(m.cached().summary.is_none());
}

#[test]
fn undecryptable_summary_falls_back_to_cache() {
    let t = Scripted::new();
    t.push("api/application", sealed(APP1_V1, PASSPHRASE, N1))
        .push("api/application", sealed(APP1_V2, "wrong passphrase", N2))
        .push(
            "api/application",
            Ok(json!({ "sucess": true, "hash": "short", "result": "AAAA" })),
        );
    let m = manager(&t, config());

    let cached = m.summary().unwrap();
    assert_eq!(m.summary(), Some(cached.clone()));
    assert_eq!(m.summary(), Some(cached));
}

#[test]
fn packages_are_fetched_with_session_secret() {
    let t = Scripted::new();
    t.push("api/application", sealed(APP1_V1, PASSPHRASE, N1))
        .push("api/packages", sealed(&packages_json(&["core", "extras"]), "s1", N2));
    let m = manager(&t, config());

    let packages = m.packages().unwrap();
    assert_eq!(names(&packages), ["core", "extras"]);

    let params = t.last_params("api/packages").unwrap();
    assert_eq!(params.get("application").map(String::as_str), Some("app1"));
    assert_eq!(params.get("name").map(String::as_str), Some("App"));
    assert_eq!(params.get("region").map(String::as_str), Some("JP"));

    let snapshot = m.cached();
    assert_eq!(snapshot.packages, Some(packages));
    assert_eq!(snapshot.packages_version.as_deref(), Some("1.0"));
}

#[test]
fn current_packages_are_not_requested_again() {
    let t = Scripted::new();
    t.push("api/application", sealed(APP1_V1, PASSPHRASE, N1))
        .push("api/packages", sealed(&packages_json(&["core"]), "s1", N2))
        .push("api/application", sealed(APP1_V1, PASSPHRASE, N1));
    let m = manager(&t, config());

    let first = m.packages().unwrap();
    let second = m.packages().unwrap();

    assert_eq!(first, second);
    assert_eq!(t.calls_to("api/application"), 2);
    assert_eq!(t.calls_to("api/packages"), 1);
}

#[test]
fn upgraded_summary_refreshes_packages() {
    let t = Scripted::new();
    t.push("api/application", sealed(APP1_V1, PASSPHRASE, N1))
        .push("api/packages", sealed(&packages_json(&["core"]), "s1", N2))
        .push("api/application", sealed(APP1_V2, PASSPHRASE, N1))
        .push("api/packages", sealed(&packages_json(&["core", "new"]), "s2", N2));
    let m = manager(&t, config());

    m.packages().unwrap();
    let upgraded = m.packages().unwrap();

    assert_eq!(names(&upgraded), ["core", "new"]);
    let snapshot = m.cached();
    assert_eq!(snapshot.summary.unwrap().version(), "2.0");
    assert_eq!(snapshot.packages_version.as_deref(), Some("2.0"));
    assert_eq!(t.calls_to("api/packages"), 2);
}

#[test]
fn failed_package_fetch_keeps_previous_list() {
    let t = Scripted::new();
    t.push("api/application", sealed(APP1_V1, PASSPHRASE, N1))
        .push("api/packages", sealed(&packages_json(&["core"]), "s1", N2))
        .push("api/application", sealed(APP1_V2, PASSPHRASE, N1))
        .push("api/packages", rejected())
        .push("api/application", sealed(APP1_V2, PASSPHRASE, N1))
        .push(
            "api/packages",
            sealed(r#"{"packages":[{"name":"ok"},"not an object"]}"#, "s2", N2),
        )
        .push("api/application", sealed(APP1_V2, PASSPHRASE, N1))
        .push("api/packages", down());
    let m = manager(&t, config());

    let original = m.packages().unwrap();
    for _ in 0..3 {
        assert_eq!(m.packages(), Some(original.clone()));
        assert_eq!(m.cached().packages_version.as_deref(), Some("1.0"));
    }
    assert_eq!(t.calls_to("api/packages"), 4);
}

#[test]
fn packages_need_a_summary() {
    let t = Scripted::new();
    t.push("api/application", down());
    let m = manager(&t, config());

    assert!(m.packages().is_none());
    assert_eq!(t.calls_to("api/packages"), 0);
}

#[test]
fn unreachable_summary_serves_cached_packages() {
    let t = Scripted::new();
    t.push("api/application", sealed(APP1_V1, PASSPHRASE, N1))
        .push("api/packages", sealed(&packages_json(&["core"]), "s1", N2))
        .push("api/application", down());
    let m = manager(&t, config());

    let first = m.packages().unwrap();
    assert_eq!(m.packages(), Some(first));
    assert_eq!(t.calls_to("api/packages"), 1);
}

#[test]
fn debug_mode_always_refetches() {
    let t = Scripted::new();
    t.push("api/application", sealed(APP1_V1, PASSPHRASE, N1))
        .push("api/packages", sealed(&packages_json(&["a"]), "s1", N2))
        .push("api/application", sealed(APP1_V1, PASSPHRASE, N1))
        .push("api/packages", sealed(&packages_json(&["b"]), "s1", N2));
    let m = manager(&t, config().with_debug(true));

    assert_eq!(names(&m.packages().unwrap()), ["a"]);
    assert_eq!(names(&m.packages().unwrap()), ["b"]);
    assert!(m.is_upgrade(m.cached().summary.as_ref()));
}

#[test]
fn legacy_key_encoding_end_to_end() {
    let t = Scripted::new();
    t.push(
        "api/application",
        sealed_with(APP1_V1, PASSPHRASE, N1, KeyEncoding::Base64Text),
    )
    .push(
        "api/packages",
        sealed_with(&packages_json(&["core"]), "s1", N2, KeyEncoding::Base64Text),
    );
    let m = manager(&t, config().with_key_encoding(KeyEncoding::Base64Text));

    assert_eq!(names(&m.packages().unwrap()), ["core"]);
}

#[test]
fn timestamp_falls_back_and_is_fetched_once() {
    let t = Scripted::new();
    t.push("api/timestamp", down())
        .push("api/timestamp", Ok(json!({ "result": "2024-03-05 06:07:08" })))
        .push("api/timestamp", Ok(json!({ "result": "2024-03-05 07:00:00" })));
    let m = manager(&t, config());

    assert!(m.timestamp().is_none());
    let ts = m.timestamp().unwrap();
    assert_eq!(ts.to_rfc3339(), "2024-03-05T06:07:08+00:00");
    assert_eq!(m.timestamp(), Some(ts));
    assert_eq!(t.calls_to("api/timestamp"), 2);
}

#[test]
fn refresh_timestamp_keeps_previous_on_failure() {
    let t = Scripted::new();
    t.push("api/timestamp", Ok(json!({ "result": "2024-03-05 06:07:08" })))
        .push("api/timestamp", Ok(json!({ "result": "garbage" })))
        .push("api/timestamp", down())
        .push("api/timestamp", Ok(json!({ "result": "2024-03-06 00:00:00" })));
    let m = manager(&t, config());

    let first = m.refresh_timestamp().unwrap();
    assert_eq!(m.refresh_timestamp(), Some(first));
    assert_eq!(m.refresh_timestamp(), Some(first));
    let later = m.refresh_timestamp().unwrap();
    assert!(later > first);
}

#[test]
fn concurrent_callers_are_serialized() {
    let t = Scripted::new();
    for _ in 0..16 {
        t.push("api/application", sealed(APP1_V1, PASSPHRASE, N1));
    }
    t.push("api/packages", sealed(&packages_json(&["core"]), "s1", N2));
    let m = Arc::new(manager(&t, config()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let m = Arc::clone(&m);
            std::thread::spawn(move || {
                if i % 2 == 0 {
                    m.summary().is_some()
                } else {
                    m.packages().is_some()
                }
            })
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap());
    }
    assert_eq!(t.calls_to("api/packages"), 1);
}

#[test]
fn same_version_keeps_cached_secret_but_packages_use_fresh_one() {
    let rotated = r#"{"id":"app1","name":"App","version":"1.0","secret":"rotated"}"#;
    let t = Scripted::new();
    t.push("api/application", sealed(APP1_V1, PASSPHRASE, N1))
        .push("api/application", sealed(rotated, PASSPHRASE, N1))
        .push("api/application", sealed(rotated, PASSPHRASE, N1))
        .push("api/packages", sealed(&packages_json(&["core"]), "rotated", N2));
    let m = manager(&t, config());

    assert_eq!(m.summary().unwrap().secret(), "s1");
    assert_eq!(m.summary().unwrap().secret(), "s1");

    assert_eq!(names(&m.packages().unwrap()), ["core"]);
    let snapshot = m.cached();
    assert_eq!(snapshot.summary.unwrap().secret(), "s1");
    assert_eq!(snapshot.packages_version.as_deref(), Some("1.0"));
}
