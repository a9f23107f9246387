//! End-to-end cycles: real HTTP fetcher and Telegram sink against mock servers.

use serde_json::Value;
use sitewatch::cli::{build_runner, load_settings, Overrides};
use sitewatch::config::{FetchStrategy, InitialState, Settings, TelegramCredentials};
use sitewatch::fetch::{build_fetcher, Fetcher};
use sitewatch::notify::telegram::TelegramSink;
use sitewatch::notify::{NotificationKind, Notifier};
use sitewatch::runner::{CheckOutcome, Runner};
use sitewatch::target::{Presence, Target};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ─────────────────────── helpers ───────────────────────

struct Harness {
    site: MockServer,
    telegram: MockServer,
}

impl Harness {
    async fn start() -> Self {
        let telegram = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&telegram)
            .await;
        Self {
            site: MockServer::start().await,
            telegram,
        }
    }

    /// Replace what the site serves at `route`.
    async fn page(&self, route: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.site)
            .await;
    }

    async fn reset_site(&self) {
        self.site.reset().await;
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.site.uri())
    }

    fn runner(&self, targets: Vec<Target>, strategy: FetchStrategy, policy: InitialState) -> Runner {
        let fetcher: Arc<dyn Fetcher> = build_fetcher(strategy).unwrap();
        let creds = TelegramCredentials::parse("1:secret:42").unwrap();
        let sink = Arc::new(TelegramSink::with_api_base(creds, self.telegram.uri()).unwrap());
        Runner::with_targets(
            targets,
            fetcher,
            Notifier::new(sink),
            policy,
            Duration::from_secs(60),
            Duration::from_secs(5),
        )
    }

    /// Texts delivered to the mock Bot API so far.
    async fn messages(&self) -> Vec<String> {
        self.telegram
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| {
                let body: Value = serde_json::from_slice(&r.body).unwrap();
                body["text"].as_str().unwrap().to_string()
            })
            .collect()
    }
}

// ─────────────────────── scenarios ───────────────────────

#[tokio::test]
async fn widget_in_stock_sold_out_restocked() {
    let h = Harness::start().await;
    let widget = Target::new("Widget", h.url("/widget"), "IN STOCK");
    let mut runner = h.runner(vec![widget], FetchStrategy::Plain, InitialState::Present);

    h.page("/widget", 200, "<span>IN STOCK</span>").await;
    runner.run_cycle().await;
    assert!(h.messages().await.is_empty());
    assert_eq!(runner.detector().presence("Widget"), Presence::Present);

    h.reset_site().await;
    h.page("/widget", 200, "<span>SOLD OUT</span>").await;
    runner.run_cycle().await;
    let msgs = h.messages().await;
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].contains("\"Widget\" - Site has changed!"));
    assert!(msgs[0].contains("Value \"IN STOCK\" is not present anymore."));
    assert_eq!(runner.detector().presence("Widget"), Presence::Absent);

    h.reset_site().await;
    h.page("/widget", 200, "<span>IN STOCK</span>").await;
    runner.run_cycle().await;
    let msgs = h.messages().await;
    assert_eq!(msgs.len(), 2);
    assert!(msgs[1].contains("\"Widget\" - Value restored!"));
    assert_eq!(runner.detector().presence("Widget"), Presence::Present);
}

#[tokio::test]
async fn failing_target_does_not_block_the_next() {
    let h = Harness::start().await;
    let a = Target::new("A", h.url("/a"), "OK");
    let b = Target::new("B", h.url("/b"), "OK");
    let mut runner = h.runner(vec![a, b], FetchStrategy::Session, InitialState::Present);

    h.page("/a", 500, "OK").await;
    h.page("/b", 200, "nothing here").await;
    let report = runner.run_cycle().await;

    assert!(matches!(
        &report.checks[0].outcome,
        CheckOutcome::Failed { detail, delivered: true } if detail == "HTTP status 500"
    ));
    assert_eq!(
        report.checks[1].outcome,
        CheckOutcome::Notified {
            kind: NotificationKind::Changed,
            delivered: true
        }
    );

    let msgs = h.messages().await;
    assert_eq!(msgs.len(), 2);
    assert!(msgs[0].starts_with("❌ Error checking \"A\":"));
    assert!(msgs[0].ends_with("Error: HTTP status 500"));
    assert!(msgs[1].contains("\"B\" - Site has changed!"));

    // A's stored state is untouched by the failure.
    assert_eq!(runner.detector().presence("A"), Presence::Present);
}

#[tokio::test]
async fn cache_busted_first_observation_policy() {
    let h = Harness::start().await;
    let t = Target::new("Gadget", h.url("/gadget"), "Add to cart");
    let mut runner = h.runner(vec![t], FetchStrategy::CacheBusted, InitialState::UnknownNotify);

    h.page("/gadget", 200, "Out of stock").await;
    let report = runner.run_cycle().await;
    assert!(matches!(
        report.checks[0].outcome,
        CheckOutcome::Notified {
            kind: NotificationKind::Changed,
            ..
        }
    ));
    assert_eq!(h.messages().await.len(), 1);

    // Same content again: silent.
    runner.run_cycle().await;
    assert_eq!(h.messages().await.len(), 1);
}

#[tokio::test]
async fn telegram_outage_does_not_stop_the_cycle() {
    let h = Harness::start().await;
    h.telegram.reset().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&h.telegram)
        .await;

    let a = Target::new("A", h.url("/a"), "OK");
    let b = Target::new("B", h.url("/b"), "OK");
    let mut runner = h.runner(vec![a, b], FetchStrategy::Plain, InitialState::Present);
    h.page("/a", 200, "gone").await;
    h.page("/b", 200, "gone").await;

    let report = runner.run_cycle().await;
    assert_eq!(report.checks.len(), 2);
    for check in &report.checks {
        assert_eq!(
            check.outcome,
            CheckOutcome::Notified {
                kind: NotificationKind::Changed,
                delivered: false
            }
        );
    }
    assert_eq!(runner.detector().presence("A"), Presence::Absent);
    assert_eq!(runner.detector().presence("B"), Presence::Absent);
}

// ─────────────────────── settings ───────────────────────

#[test]
fn settings_file_round_trip_with_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "product": [{{"name": "Widget", "url": "https://shop.example/w", "value": "IN STOCK"}}],
            "interval": 30,
            "telegram": "111:secret:222",
            "fetcher": "session"
        }}"#
    )
    .unwrap();

    let settings = Settings::load(file.path()).unwrap();
    assert_eq!(settings.fetcher, FetchStrategy::Session);
    assert_eq!(settings.telegram.token, "111:secret");
    assert_eq!(settings.telegram.chat_id, "222");

    let overridden = load_settings(
        file.path(),
        Overrides {
            fetcher: Some(FetchStrategy::Plain),
            initial_state: Some(InitialState::UnknownNotify),
        },
    )
    .unwrap();
    assert_eq!(overridden.fetcher, FetchStrategy::Plain);
    assert_eq!(overridden.initial_state, InitialState::UnknownNotify);

    let runner = build_runner(&overridden).unwrap();
    assert_eq!(runner.targets().len(), 1);
    assert_eq!(runner.detector().presence("Widget"), Presence::Unknown);
}

#[test]
fn malformed_settings_refuse_to_start() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"product": [], "interval": 30, "telegram": "111:secret:222"}}"#).unwrap();
    let err = load_settings(file.path(), Overrides::default()).unwrap_err();
    assert!(format!("{err:#}").contains("no targets configured"));
}
