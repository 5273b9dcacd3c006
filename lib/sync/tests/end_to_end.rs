//! End-to-end pipeline tests: Version Catalog Client through Update Applier,
//! driven by [`sync::Coordinator`] against an in-memory [`MockFetcher`].

use std::sync::Arc;
use std::time::Duration;

use sync::coordinator::Coordinator;
use sync::fetch::MockFetcher;

use store::Store;
use types::series::{DataSeries, MajorDataSeries};
use types::version::{DataVersion, VersionNumber};

fn header(major: u16, minor: u16, patch: u16, records: u64, part: Option<u16>, format: &str) -> String {
    let part_field = match part {
        Some(p) => format!(r#","part":{p}"#),
        None => String::new(),
    };
    format!(
        r#"{{"type":"header","version":{{"major":{major},"minor":{minor},"patch":{patch},"dateOfCreation":"2026-01-01"}},"records":{records},"format":"{format}"{part_field}}}"#
    )
}

#[tokio::test]
async fn fresh_kanji_install_partitions_and_chains_radicals() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let fetcher = Arc::new(MockFetcher::new());

    fetcher.set(
        "https://host/version-en.json",
        200,
        br#"{
            "kanji": {"1": {"major":1,"minor":0,"patch":0,"dateOfCreation":"2026-01-01","parts":2}},
            "radicals": {"1": {"major":1,"minor":0,"patch":0,"dateOfCreation":"2026-01-01"}}
        }"#
        .to_vec(),
    );

    let part1 = format!(
        "{}\n{}\n",
        header(1, 0, 0, 1, Some(1), "full"),
        r#"{"c":24341,"m":["pull"]}"#
    );
    let part2 = format!(
        "{}\n{}\n",
        header(1, 0, 0, 1, Some(2), "full"),
        r#"{"c":26085,"m":["sun","day"]}"#
    );
    fetcher.set("https://host/kanji/en/1.0.0-1.jsonl", 200, part1.into_bytes());
    fetcher.set("https://host/kanji/en/1.0.0-2.jsonl", 200, part2.into_bytes());

    let radicals = format!(
        "{}\n{}\n",
        header(1, 0, 0, 1, None, "full"),
        r#"{"id":"057","r":57,"b":"⼸","k":"弓","stroke_count":3,"na":["ゆみ"],"m":["bow"]}"#
    );
    fetcher.set("https://host/radicals/en/1.0.0.jsonl", 200, radicals.into_bytes());

    let coordinator = Coordinator::new(store.clone(), fetcher, "https://host", Duration::from_secs(5));
    coordinator.update(MajorDataSeries::Kanji, "en").await.unwrap();

    let kanji_version = store.version(DataSeries::Kanji).unwrap().unwrap();
    assert_eq!(kanji_version.number, VersionNumber::new(1, 0, 0));
    assert!(kanji_version.part_info.is_none(), "fully-applied install carries no partInfo");

    let radicals_version = store.version(DataSeries::Radicals).unwrap().unwrap();
    assert_eq!(radicals_version.number, VersionNumber::new(1, 0, 0));

    let k: types::kanji::Kanji = store.get(&store::key::u32_be(24341)).unwrap().unwrap();
    assert_eq!(k.m, vec!["pull".to_string()]);
    let r: types::radical::Radical = store.get("057".as_bytes()).unwrap().unwrap();
    assert_eq!(r.na, vec!["ゆみ".to_string()]);
}

#[tokio::test]
async fn patch_with_deletion_removes_existing_word() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());

    // Seed a prior full sync directly through the store, as if a previous
    // process already completed it.
    let seeded = types::words::Word {
        id: 1,
        k: Some(vec!["引く".to_string()]),
        km: None,
        r: vec!["ひく".to_string()],
        rm: None,
        s: vec![],
        h: vec!["ひく".to_string()],
        kc: vec!['引'],
        gt_en: vec![],
        gt_l: vec![],
    };
    store
        .apply_file(
            false,
            vec![store::RecordOp::Upsert(seeded)],
            DataVersion {
                number: VersionNumber::new(1, 0, 0),
                part_info: None,
                database_version: None,
                date_of_creation: "2026-01-01".to_string(),
                lang: "en".to_string(),
            },
        )
        .unwrap();

    let fetcher = Arc::new(MockFetcher::new());
    fetcher.set(
        "https://host/version-en.json",
        200,
        br#"{"words": {"1": {"major":1,"minor":0,"patch":1,"dateOfCreation":"2026-01-02"}}}"#.to_vec(),
    );
    let patch = format!("{}\n{{\"_\":\"-\",\"id\":1}}\n", header(1, 0, 1, 1, None, "patch"));
    fetcher.set("https://host/words/en/1.0.1-patch.jsonl", 200, patch.into_bytes());

    let coordinator = Coordinator::new(store.clone(), fetcher, "https://host", Duration::from_secs(5));
    coordinator.update(MajorDataSeries::Words, "en").await.unwrap();

    assert!(store.get::<types::words::Word>(&store::key::u32_be(1)).unwrap().is_none());
    let version = store.version(DataSeries::Words).unwrap().unwrap();
    assert_eq!(version.number, VersionNumber::new(1, 0, 1));
}

#[tokio::test]
async fn manifest_regression_reports_database_too_old() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());

    store
        .apply_file(
            false,
            Vec::<store::RecordOp<types::words::Word>>::new(),
            DataVersion {
                number: VersionNumber::new(2, 0, 5),
                part_info: None,
                database_version: None,
                date_of_creation: "2026-01-01".to_string(),
                lang: "en".to_string(),
            },
        )
        .unwrap();

    let fetcher = Arc::new(MockFetcher::new());
    fetcher.set(
        "https://host/version-en.json",
        200,
        br#"{"words": {"2": {"major":2,"minor":0,"patch":3,"dateOfCreation":"2026-01-01"}}}"#.to_vec(),
    );

    let coordinator = Coordinator::new(store, fetcher, "https://host", Duration::from_secs(5));
    let err = coordinator.update(MajorDataSeries::Words, "en").await.unwrap_err();
    assert_eq!(err.code(), error::ErrorCode::DatabaseTooOld);
}

#[tokio::test]
async fn language_change_clobbers_series_before_resync() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());

    let stale = types::words::Word {
        id: 9,
        k: None,
        km: None,
        r: vec!["alt".to_string()],
        rm: None,
        s: vec![],
        h: vec![],
        kc: vec![],
        gt_en: vec![],
        gt_l: vec![],
    };
    store
        .apply_file(
            false,
            vec![store::RecordOp::Upsert(stale)],
            DataVersion {
                number: VersionNumber::new(1, 0, 0),
                part_info: None,
                database_version: None,
                date_of_creation: "2026-01-01".to_string(),
                lang: "de".to_string(),
            },
        )
        .unwrap();

    let fetcher = Arc::new(MockFetcher::new());
    fetcher.set(
        "https://host/version-en.json",
        200,
        br#"{"words": {"1": {"major":1,"minor":0,"patch":0,"dateOfCreation":"2026-01-01"}}}"#.to_vec(),
    );
    let full = format!(
        "{}\n{}\n",
        header(1, 0, 0, 1, None, "full"),
        r#"{"id":1,"r":["new"],"s":[]}"#
    );
    fetcher.set("https://host/words/en/1.0.0.jsonl", 200, full.into_bytes());

    let coordinator = Coordinator::new(store.clone(), fetcher, "https://host", Duration::from_secs(5));
    coordinator.update(MajorDataSeries::Words, "en").await.unwrap();

    assert!(store.get::<types::words::Word>(&store::key::u32_be(9)).unwrap().is_none());
    let refreshed: types::words::Word = store.get(&store::key::u32_be(1)).unwrap().unwrap();
    assert_eq!(refreshed.r, vec!["new".to_string()]);
    let version = store.version(DataSeries::Words).unwrap().unwrap();
    assert_eq!(version.lang, "en");
}
