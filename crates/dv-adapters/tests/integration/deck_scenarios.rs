//! End-to-end scenarios over the deck service
//!
//! Runs the full save/read/list/search pipeline against the in-memory
//! key/value store: asset dedupe across positions, complex-deck fidelity,
//! legacy reads, format precedence, asset-set rotation and search.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use dv_adapters::{DeckService, MemoryKv, StorageConfig};
use dv_domain::{
    extract_hash, hash_bytes, is_reference, Branding, BrandingLogo, ChartElement,
    CodeblockElement, Deck, DeckMeta, DeckSettings, Element, ElementBase, GroupElement,
    ImageElement, KnownElement, RichtextElement, SearchQuery, Slide, TableElement, TextElement,
};
use dv_ports::{Clock, KeyValueStore, KvWrite, ThumbnailError, ThumbnailParams, ThumbnailRenderer};

const RED_PIXEL_PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0xff, 0x00, 0x00, 0x01,
];
const BLUE_PIXEL_PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0xff, 0x01,
];

/// Wall clock that advances one millisecond per reading, so every save gets
/// a distinct `updatedAt`.
struct TickingClock {
    epoch_ms: AtomicI64,
}

impl TickingClock {
    fn new() -> Self {
        Self {
            epoch_ms: AtomicI64::new(
                Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
                    .unwrap()
                    .timestamp_millis(),
            ),
        }
    }
}

impl Clock for TickingClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.epoch_ms.fetch_add(1, Ordering::SeqCst);
        Utc.timestamp_millis_opt(ms).unwrap()
    }
}

/// Renderer returning a fixed buffer, standing in for the external one.
struct StaticRenderer(Vec<u8>);

impl ThumbnailRenderer for StaticRenderer {
    async fn render(
        &self,
        _manifest: &dv_domain::Manifest,
        _params: ThumbnailParams,
    ) -> Result<Vec<u8>, ThumbnailError> {
        Ok(self.0.clone())
    }
}

struct FailingRenderer;

impl ThumbnailRenderer for FailingRenderer {
    async fn render(
        &self,
        _manifest: &dv_domain::Manifest,
        _params: ThumbnailParams,
    ) -> Result<Vec<u8>, ThumbnailError> {
        Err(ThumbnailError::RenderFailed {
            message: "canvas exploded".to_string(),
        })
    }
}

fn config() -> StorageConfig {
    StorageConfig {
        url: String::new(),
        namespace: String::new(),
        thumbnails_enabled: true,
    }
}

fn service_with<R: ThumbnailRenderer>(kv: Arc<MemoryKv>, renderer: R) -> DeckService<MemoryKv, R> {
    DeckService::with_clock(kv, renderer, &config(), Arc::new(TickingClock::new()))
}

fn data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

fn image_element(id: &str, src: &str) -> Element {
    Element::Known(Box::new(KnownElement::Image(ImageElement {
        base: ElementBase {
            id: id.to_string(),
            ..Default::default()
        },
        src: Some(src.to_string()),
        ..Default::default()
    })))
}

fn titled_deck(id: &str, title: &str) -> Deck {
    Deck {
        meta: DeckMeta {
            id: id.to_string(),
            title: title.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn duplicate_asset_converges_on_one_hash() {
    let kv = Arc::new(MemoryKv::new());
    let service = service_with(kv, StaticRenderer(vec![1]));

    let red = data_uri(RED_PIXEL_PNG, "image/png");
    let deck = Deck {
        meta: DeckMeta {
            id: "dupes".to_string(),
            title: "Duplicates".to_string(),
            cover_image: Some(red.clone()),
            ..Default::default()
        },
        slides: vec![Slide {
            id: "s1".to_string(),
            elements: vec![image_element("i1", &red)],
            ..Default::default()
        }],
        settings: Some(DeckSettings {
            branding: Some(Branding {
                logo: Some(BrandingLogo {
                    src: Some(red),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };

    let manifest = service.save_deck("dupes", &deck).await.unwrap();

    let assets = service.repository().get_assets("dupes").await.unwrap();
    assert_eq!(assets.len(), 1);
    let hash = assets.iter().next().unwrap().clone();
    assert_eq!(hash, hash_bytes(RED_PIXEL_PNG));

    // all three positions point at the same asset
    let cover = manifest.meta.cover_image.clone().unwrap();
    let logo = manifest
        .settings
        .as_ref()
        .and_then(|s| s.branding.as_ref())
        .and_then(|b| b.logo.as_ref())
        .and_then(|l| l.src.clone())
        .unwrap();
    let src = match manifest.slides[0].elements[0].known().unwrap() {
        KnownElement::Image(img) => img.src.clone().unwrap(),
        other => panic!("unexpected kind: {other:?}"),
    };
    for reference in [&cover, &logo, &src] {
        assert!(is_reference(reference));
        assert_eq!(extract_hash(reference).unwrap(), hash);
    }

    let stored = service.assets().get(&hash).await.unwrap().unwrap();
    assert_eq!(stored.len(), RED_PIXEL_PNG.len());
}

#[tokio::test]
async fn complex_deck_survives_round_trip() {
    let kv = Arc::new(MemoryKv::new());
    let service = service_with(kv, StaticRenderer(vec![1]));

    let code = "function hello() {\n  console.log(\"Hello, world!\");\n}";
    let slides = vec![
        Slide {
            id: "s1".to_string(),
            elements: vec![Element::Known(Box::new(KnownElement::Text(TextElement {
                base: ElementBase {
                    id: "t1".to_string(),
                    ..Default::default()
                },
                content: Some(serde_json::json!("Welcome")),
            })))],
            ..Default::default()
        },
        Slide {
            id: "s2".to_string(),
            elements: vec![Element::Known(Box::new(KnownElement::Richtext(
                RichtextElement {
                    base: ElementBase {
                        id: "r1".to_string(),
                        ..Default::default()
                    },
                    content: Some(serde_json::json!({"ops": [{"insert": "styled"}]})),
                },
            )))],
            ..Default::default()
        },
        Slide {
            id: "s3".to_string(),
            elements: vec![Element::Known(Box::new(KnownElement::Codeblock(
                CodeblockElement {
                    base: ElementBase {
                        id: "c1".to_string(),
                        ..Default::default()
                    },
                    code: Some(code.to_string()),
                    language: Some("javascript".to_string()),
                },
            )))],
            ..Default::default()
        },
        Slide {
            id: "s4".to_string(),
            elements: vec![Element::Known(Box::new(KnownElement::Chart(ChartElement {
                base: ElementBase {
                    id: "ch1".to_string(),
                    ..Default::default()
                },
                chart_type: Some("bar".to_string()),
                data: Some(serde_json::json!([
                    {"label": "Q1", "value": 10},
                    {"label": "Q2", "value": 20},
                    {"label": "Q3", "value": 30},
                ])),
            })))],
            ..Default::default()
        },
        Slide {
            id: "s5".to_string(),
            elements: vec![Element::Known(Box::new(KnownElement::Group(GroupElement {
                base: ElementBase {
                    id: "g1".to_string(),
                    ..Default::default()
                },
                children: vec![
                    Element::Known(Box::new(KnownElement::Text(TextElement {
                        base: ElementBase {
                            id: "gt1".to_string(),
                            ..Default::default()
                        },
                        content: Some(serde_json::json!("grouped")),
                    }))),
                    image_element("gi1", &data_uri(RED_PIXEL_PNG, "image/png")),
                ],
            })))],
            ..Default::default()
        },
        Slide {
            id: "s6".to_string(),
            elements: vec![Element::Known(Box::new(KnownElement::Table(TableElement {
                base: ElementBase {
                    id: "tb1".to_string(),
                    ..Default::default()
                },
                headers: Some(vec![
                    "Name".to_string(),
                    "Age".to_string(),
                    "City".to_string(),
                ]),
                rows: Some(serde_json::json!([["Ada", 36, "London"]])),
            })))],
            ..Default::default()
        },
    ];
    let deck = Deck {
        meta: DeckMeta {
            id: "complex".to_string(),
            title: "Complex".to_string(),
            ..Default::default()
        },
        slides,
        ..Default::default()
    };

    service.save_deck("complex", &deck).await.unwrap();
    let loaded = service.get_deck("complex").await.unwrap().unwrap();

    assert_eq!(loaded.slides.len(), 6);
    for (slide, original) in loaded.slides.iter().zip(&deck.slides) {
        assert_eq!(slide.elements.len(), original.elements.len());
    }

    match loaded.slides[2].elements[0].known().unwrap() {
        KnownElement::Codeblock(cb) => assert_eq!(cb.code.as_deref(), Some(code)),
        other => panic!("unexpected kind: {other:?}"),
    }
    match loaded.slides[3].elements[0].known().unwrap() {
        KnownElement::Chart(chart) => {
            assert_eq!(chart.chart_type.as_deref(), Some("bar"));
            assert_eq!(chart.data.as_ref().unwrap().as_array().unwrap().len(), 3);
        }
        other => panic!("unexpected kind: {other:?}"),
    }
    match loaded.slides[4].elements[0].known().unwrap() {
        KnownElement::Group(group) => {
            assert_eq!(group.children.len(), 2);
            match group.children[1].known().unwrap() {
                KnownElement::Image(img) => assert!(is_reference(img.src.as_deref().unwrap())),
                other => panic!("unexpected kind: {other:?}"),
            }
        }
        other => panic!("unexpected kind: {other:?}"),
    }
    match loaded.slides[5].elements[0].known().unwrap() {
        KnownElement::Table(table) => assert_eq!(
            table.headers.as_deref(),
            Some(&["Name".to_string(), "Age".to_string(), "City".to_string()][..])
        ),
        other => panic!("unexpected kind: {other:?}"),
    }
}

#[tokio::test]
async fn legacy_blob_reads_through_every_verb() {
    let kv = Arc::new(MemoryKv::new());
    kv.apply(vec![KvWrite::PutString {
        key: "deck:legacy-1:data".to_string(),
        value: r#"{"meta":{"id":"legacy-1","title":"Minimal"},"slides":[]}"#.to_string(),
    }])
    .await
    .unwrap();
    let service = service_with(kv, StaticRenderer(vec![1]));

    let deck = service.get_deck("legacy-1").await.unwrap().unwrap();
    assert_eq!(deck.meta.id, "legacy-1");
    assert_eq!(deck.meta.title, "Minimal");
    assert!(deck.slides.is_empty());

    assert!(service.deck_exists("legacy-1").await.unwrap());

    let meta = service.get_deck_metadata("legacy-1").await.unwrap().unwrap();
    assert_eq!(meta.title, "Minimal");

    let listing = service.list_decks().await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, "legacy-1");
}

#[tokio::test]
async fn new_format_wins_over_legacy() {
    let kv = Arc::new(MemoryKv::new());
    kv.apply(vec![KvWrite::PutString {
        key: "deck:both:data".to_string(),
        value: r#"{"meta":{"id":"both","title":"Old Version"},"slides":[]}"#.to_string(),
    }])
    .await
    .unwrap();
    let service = service_with(kv, StaticRenderer(vec![1]));
    service
        .save_deck("both", &titled_deck("both", "New Version"))
        .await
        .unwrap();

    let deck = service.get_deck("both").await.unwrap().unwrap();
    assert_eq!(deck.meta.title, "New Version");

    let listing = service.list_decks().await.unwrap();
    let rows: Vec<&str> = listing
        .iter()
        .filter(|b| b.id == "both")
        .map(|b| b.title.as_str())
        .collect();
    assert_eq!(rows, vec!["New Version"]);
}

#[tokio::test]
async fn listing_dedupes_across_formats() {
    let kv = Arc::new(MemoryKv::new());
    kv.apply(vec![
        KvWrite::PutString {
            key: "deck:legacy-only:data".to_string(),
            value: r#"{"meta":{"id":"legacy-only","title":"L"},"slides":[]}"#.to_string(),
        },
        KvWrite::PutString {
            key: "deck:shared:data".to_string(),
            value: r#"{"meta":{"id":"shared","title":"Legacy Shared"},"slides":[]}"#.to_string(),
        },
    ])
    .await
    .unwrap();
    let service = service_with(kv, StaticRenderer(vec![1]));
    service
        .save_deck("new-only", &titled_deck("new-only", "N"))
        .await
        .unwrap();
    service
        .save_deck("shared", &titled_deck("shared", "New Shared"))
        .await
        .unwrap();

    let listing = service.list_decks().await.unwrap();
    let mut ids: Vec<&str> = listing.iter().map(|b| b.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["legacy-only", "new-only", "shared"]);
    let shared = listing.iter().find(|b| b.id == "shared").unwrap();
    assert_eq!(shared.title, "New Shared");
}

#[tokio::test]
async fn corrupt_listing_entries_are_skipped() {
    let kv = Arc::new(MemoryKv::new());
    kv.apply(vec![KvWrite::PutString {
        key: "deck:broken:data".to_string(),
        value: "{definitely not json".to_string(),
    }])
    .await
    .unwrap();
    let service = service_with(kv, StaticRenderer(vec![1]));
    service
        .save_deck("fine", &titled_deck("fine", "Fine"))
        .await
        .unwrap();

    let listing = service.list_decks().await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, "fine");
}

#[tokio::test]
async fn resave_rotates_asset_set_without_garbage_collection() {
    let kv = Arc::new(MemoryKv::new());
    let service = service_with(kv, StaticRenderer(vec![1]));

    let mut deck = titled_deck("rotate", "Rotate");
    deck.meta.cover_image = Some(data_uri(RED_PIXEL_PNG, "image/png"));
    service.save_deck("rotate", &deck).await.unwrap();

    deck.meta.cover_image = Some(data_uri(BLUE_PIXEL_PNG, "image/png"));
    service.save_deck("rotate", &deck).await.unwrap();

    let assets = service.repository().get_assets("rotate").await.unwrap();
    assert_eq!(
        assets.into_iter().collect::<Vec<_>>(),
        vec![hash_bytes(BLUE_PIXEL_PNG)]
    );

    // the red blob is not garbage-collected
    assert!(service
        .assets()
        .exists(&hash_bytes(RED_PIXEL_PNG))
        .await
        .unwrap());
}

#[tokio::test]
async fn search_over_saved_decks() {
    let kv = Arc::new(MemoryKv::new());
    let service = service_with(kv, StaticRenderer(vec![1]));

    let mut first = titled_deck("q-sales", "Quarterly Sales Report");
    first.meta.tags = vec!["sales".to_string(), "Q4".to_string()];
    let mut second = titled_deck("marketing", "Annual Marketing Strategy");
    second.meta.tags = vec!["marketing".to_string(), "Q4".to_string()];
    let mut third = titled_deck("overview", "Sales Team Overview");
    third.meta.tags = vec!["sales".to_string(), "Q3".to_string()];
    for (id, deck) in [
        ("q-sales", &first),
        ("marketing", &second),
        ("overview", &third),
    ] {
        service.save_deck(id, deck).await.unwrap();
    }

    let text = service
        .search(&SearchQuery {
            text: Some("Sales".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let mut ids: Vec<&str> = text.iter().map(|m| m.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["overview", "q-sales"]);

    let tagged = service
        .search(&SearchQuery {
            tags: vec!["Q4".to_string(), "sales".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].id, "q-sales");
}

#[tokio::test]
async fn delete_clears_both_formats() {
    let kv = Arc::new(MemoryKv::new());
    kv.apply(vec![
        KvWrite::PutString {
            key: "deck:doomed:data".to_string(),
            value: r#"{"meta":{"id":"doomed","title":"Old"},"slides":[]}"#.to_string(),
        },
        KvWrite::PutString {
            key: "deck:doomed:history".to_string(),
            value: "[]".to_string(),
        },
        KvWrite::PutString {
            key: "deck:doomed:meta".to_string(),
            value: "{}".to_string(),
        },
    ])
    .await
    .unwrap();
    let service = service_with(kv.clone(), StaticRenderer(vec![1]));
    service
        .save_deck("doomed", &titled_deck("doomed", "New"))
        .await
        .unwrap();

    service.delete_deck("doomed").await.unwrap();

    assert!(!service.deck_exists("doomed").await.unwrap());
    assert!(service.get_deck("doomed").await.unwrap().is_none());
    for key in [
        "doc:doomed:manifest",
        "doc:doomed:meta",
        "doc:doomed:assets",
        "doc:doomed:thumb",
        "deck:doomed:data",
        "deck:doomed:history",
        "deck:doomed:meta",
    ] {
        assert!(!kv.exists(key).await.unwrap(), "{key} should be gone");
    }
}

#[tokio::test]
async fn migration_converts_and_optionally_destroys() {
    let kv = Arc::new(MemoryKv::new());
    let cover = data_uri(RED_PIXEL_PNG, "image/png");
    kv.apply(vec![
        KvWrite::PutString {
            key: "deck:mig:data".to_string(),
            value: format!(
                r#"{{"meta":{{"id":"mig","title":"To Migrate","coverImage":"{cover}"}},"slides":[]}}"#
            ),
        },
        KvWrite::PutString {
            key: "deck:mig:history".to_string(),
            value: "[]".to_string(),
        },
    ])
    .await
    .unwrap();
    let service = service_with(kv.clone(), StaticRenderer(vec![1]));

    // non-destructive first: both forms remain, manifest wins on read
    let manifest = service.migrate_deck("mig", false).await.unwrap().unwrap();
    assert!(is_reference(manifest.meta.cover_image.as_deref().unwrap()));
    assert!(kv.exists("deck:mig:data").await.unwrap());

    let manifest = service.migrate_deck("mig", true).await.unwrap().unwrap();
    assert_eq!(manifest.meta.title, "To Migrate");
    assert!(!kv.exists("deck:mig:data").await.unwrap());
    assert!(!kv.exists("deck:mig:history").await.unwrap());

    // still readable through the new format
    let deck = service.get_deck("mig").await.unwrap().unwrap();
    assert_eq!(deck.meta.title, "To Migrate");
    assert!(service.migrate_deck("mig", false).await.unwrap().is_none());
}

#[tokio::test]
async fn thumbnails_are_stored_best_effort() {
    let kv = Arc::new(MemoryKv::new());
    let service = service_with(kv, StaticRenderer(vec![0x52, 0x49, 0x46, 0x46]));
    service
        .save_deck("thumbed", &titled_deck("thumbed", "T"))
        .await
        .unwrap();
    assert_eq!(
        service.get_deck_thumbnail("thumbed").await.unwrap().unwrap(),
        vec![0x52, 0x49, 0x46, 0x46]
    );
}

#[tokio::test]
async fn thumbnail_failure_never_fails_the_save() {
    let kv = Arc::new(MemoryKv::new());
    let service = service_with(kv, FailingRenderer);
    service
        .save_deck("unthumbed", &titled_deck("unthumbed", "T"))
        .await
        .unwrap();

    assert!(service
        .get_deck_thumbnail("unthumbed")
        .await
        .unwrap()
        .is_none());
    assert_eq!(service.metrics().thumbnail_failures, 1);
    // the document itself landed
    assert!(service.deck_exists("unthumbed").await.unwrap());
}

#[tokio::test]
async fn metadata_projection_tracks_saves() {
    let kv = Arc::new(MemoryKv::new());
    let service = service_with(kv, StaticRenderer(vec![1]));
    let manifest = service
        .save_deck("meta-check", &titled_deck("meta-check", "Projected"))
        .await
        .unwrap();

    let meta = service
        .get_deck_metadata("meta-check")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(meta, manifest.meta);
    assert_eq!(meta.updated_at, manifest.meta.updated_at);
}
