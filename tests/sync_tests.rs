use mtg_price_sync::store::{CardFilter, CatalogStore, SqliteStore};
use mtg_price_sync::{
    CardKey, CardResolver, CatalogSync, CurrencyRule, ExtractorClient, RedactionSynonymTable,
    SyncConfig,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Test fixtures - an extractor service for one canonical source and two shops

const SYNONYMS: &str = "magiccards;spellshop;buymagic\n\
                        alpha;alpha edition;1st ed\n\
                        beta;beta edition;2nd ed\n";

fn bolt_page() -> serde_json::Value {
    json!({
        "url": "https://canon.example/al/en/161.html",
        "section_count": 4,
        "card_type": "Instant",
        "info": {
            "url": "https://canon.example/al/en/161.html",
            "img_url": "https://canon.example/scans/al/161.jpg",
            "description": ["Lightning Bolt deals 3 damage to any target."]
        },
        "redaction_label": "Alpha (Common)",
        "price_source_id": "bolt-al"
    })
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer, shop: &str, url: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/shops/{}/listing", shop)))
        .and(query_param("url", url))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn extractor(spellshop_menu: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;

    mount_json(
        &server,
        "/canonical/redactions",
        json!([
            { "name": "Alpha", "url": "https://canon.example/al/en.html" },
            { "name": "Beta", "url": "https://canon.example/be/en.html" }
        ]),
    )
    .await;
    mount_json(&server, "/shops/spellshop/redactions", spellshop_menu).await;
    mount_json(
        &server,
        "/shops/buymagic/redactions",
        json!([{ "name": "1st ed", "url": "https://buymagic.example/cat/1" }]),
    )
    .await;

    mount_listing(
        &server,
        "spellshop",
        "https://spellshop.example/alpha",
        json!({
            "offers": [
                { "name": "Lightning Bolt", "price": "5.00 грн", "quantity": 3,
                  "url": "https://spellshop.example/bolt" },
                { "name": "Mountain", "price": "1.00 грн", "quantity": 40,
                  "url": "https://spellshop.example/mountain" }
            ],
            "pages": []
        }),
    )
    .await;
    mount_listing(
        &server,
        "buymagic",
        "https://buymagic.example/cat/1",
        json!({
            "offers": [
                { "name": "lightning bolt", "price": "16.00 грн", "quantity": 1,
                  "url": "https://buymagic.example/bolt" }
            ]
        }),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/canonical/search"))
        .and(query_param("q", "lightning bolt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bolt_page()))
        .mount(&server)
        .await;
    mount_json(
        &server,
        "/prices/bolt-al",
        json!({
            "url": "https://prices.example/bolt-al",
            "low": "$1.00",
            "mid": "$2.00",
            "high": "$6.00"
        }),
    )
    .await;

    server
}

fn sync_for(server: &MockServer, store: Arc<SqliteStore>) -> CatalogSync {
    CatalogSync::with_extractor(
        ExtractorClient::new(&server.uri()),
        RedactionSynonymTable::from_reader(SYNONYMS.as_bytes()).unwrap(),
        store,
        SyncConfig::default(),
    )
}

fn snapshot(store: &SqliteStore) -> Vec<String> {
    store
        .list_cards(&CardFilter::default())
        .unwrap()
        .iter()
        .map(|card| serde_json::to_string(card).unwrap())
        .collect()
}

#[tokio::test]
async fn test_full_cycle_against_extractor() {
    let server = extractor(json!([
        { "name": "Alpha Edition", "url": "https://spellshop.example/alpha" }
    ]))
    .await;
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(temp_dir.path().join("catalog.db")).unwrap());
    let sync = sync_for(&server, Arc::clone(&store));

    // Redactions are aligned through the synonym table
    let redactions = sync.refresh_redactions().await.unwrap();
    let alpha = redactions.iter().find(|r| r.name == "alpha").unwrap();
    assert_eq!(
        alpha.shop_url("spellshop"),
        Some("https://spellshop.example/alpha")
    );
    assert_eq!(
        alpha.shop_url("buymagic"),
        Some("https://buymagic.example/cat/1")
    );
    let beta = redactions.iter().find(|r| r.name == "beta").unwrap();
    assert!(beta.shops.is_empty());

    // Both shops merge into one card
    let reports = sync.update_all().await.unwrap();
    assert_eq!(reports[0].inserted, 1);
    assert_eq!(reports[1].updated, 1);

    let card = store
        .find_card(&CardKey::new("lightning bolt", "alpha"))
        .unwrap()
        .unwrap();
    assert_eq!(card.card_type, "Instant");

    let spellshop = &card.shops["spellshop"];
    assert!((spellshop.price - 0.625).abs() < 1e-9);
    assert!((spellshop.overpay - 4.8).abs() < 1e-9);
    assert_eq!(spellshop.quantity, 3);

    let buymagic = &card.shops["buymagic"];
    assert!((buymagic.price - 2.0).abs() < 1e-9);
    assert!((buymagic.overpay - 1.5).abs() < 1e-9);

    // Basic land placeholders never reach the catalog
    assert!(store.find_cards_by_name("mountain").unwrap().is_empty());
    assert_eq!(store.count_cards(&CardFilter::default()).unwrap(), 1);

    // Running the cycle again changes nothing
    let before = snapshot(&store);
    sync.update_all().await.unwrap();
    assert_eq!(snapshot(&store), before);
}

#[tokio::test]
async fn test_stale_synonym_table_aborts_refresh() {
    let server = extractor(json!([
        { "name": "Alpha Edition", "url": "https://spellshop.example/alpha" },
        { "name": "Zendikar Rising", "url": "https://spellshop.example/znr" }
    ]))
    .await;
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let sync = sync_for(&server, Arc::clone(&store));

    let err = sync.refresh_redactions().await.unwrap_err();

    assert!(err.is_data_integrity());
    assert!(err.to_string().contains("zendikar rising"));
    assert!(store.list_redactions().unwrap().is_empty());
}

#[tokio::test]
async fn test_hint_list_resolves_closest_card() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/canonical/search"))
        .and(query_param("q", "lightnin bolt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://canon.example/query?q=lightnin+bolt",
            "section_count": 1,
            "hints": [
                { "name": "Lightning Blade", "url": "https://canon.example/blade.html" },
                { "name": "Lightning Bolt", "url": "https://canon.example/al/en/161.html" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/canonical/page"))
        .and(query_param("url", "https://canon.example/al/en/161.html"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bolt_page()))
        .mount(&server)
        .await;
    mount_json(
        &server,
        "/prices/bolt-al",
        json!({ "url": "https://prices.example/bolt-al", "low": "1", "mid": "2", "high": "3" }),
    )
    .await;

    let client = Arc::new(ExtractorClient::new(&server.uri()));
    let resolver = CardResolver::new(client.clone(), client, CurrencyRule::usd());

    let card = resolver.resolve("Lightnin Bolt", "Alpha").await.unwrap();
    assert_eq!(card.name, "lightning bolt");
    assert_eq!(card.redaction, "alpha");
    assert!((card.prices.unwrap().average() - 2.0).abs() < 1e-9);
}
