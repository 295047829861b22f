//! Bulk seeding against a mock registry

mod common;

use bricklayer::{Biobrick, CacheKey, Namespace, SeedError, Store};
use common::{Fixture, MockUpstream, DUMP};

async fn index_names(fixture: &Fixture) -> Vec<String> {
    let index = fixture.catalog.index().await.unwrap().expect("index built");
    serde_json::from_slice(&index).unwrap()
}

#[tokio::test]
async fn test_seed_populates_catalog() {
    let fixture = Fixture::new(MockUpstream::new(DUMP));

    let report = fixture.seeder().seed().await.unwrap();
    assert_eq!(report.records, 3);

    let names = index_names(&fixture).await;
    assert_eq!(names, vec!["BBa_B0034", "BBa_B0010", "BBa_R0040"]);

    let raw = fixture.catalog.part("BBa_B0010").await.unwrap().unwrap();
    let brick: Biobrick = serde_json::from_slice(&raw).unwrap();
    assert_eq!(brick.id, 187);
    assert_eq!(brick.description, "T1 from E. coli rrnB");
    assert_eq!(
        brick.sequence,
        "ccaggcatcaaataaaacgaaaggctcagtcgaaagactgggcctttcgttttatctgttgtttgtcggtgaacgctctc"
    );
}

#[tokio::test]
async fn test_reseed_is_idempotent() {
    let fixture = Fixture::new(MockUpstream::new(DUMP));

    let first = fixture.seeder().seed().await.unwrap();
    let second = fixture.seeder().seed().await.unwrap();
    assert_eq!(first.records, second.records);
    assert_eq!(second.generation, first.generation + 1);

    let names = index_names(&fixture).await;
    assert_eq!(names.len(), second.records);
    for name in &names {
        assert!(
            fixture.catalog.part(name).await.unwrap().is_some(),
            "{} missing after reseed",
            name
        );
    }

    // Only the active generation remains
    let stale = fixture
        .store
        .get_all(&Namespace::BasicParts(first.generation))
        .await
        .unwrap();
    assert!(stale.is_empty());
    assert_eq!(
        fixture
            .store
            .get_all(&Namespace::BasicParts(second.generation))
            .await
            .unwrap()
            .len(),
        3
    );
}

#[tokio::test]
async fn test_reseed_replaces_removed_parts() {
    let fixture = Fixture::seeded(MockUpstream::new(DUMP)).await;

    fixture
        .upstream
        .set_dump(">BBa_B0034 Released 151 RBS \"only one left\"\naaa\n");
    fixture.seeder().seed().await.unwrap();

    assert_eq!(index_names(&fixture).await, vec!["BBa_B0034"]);
    assert!(fixture.catalog.part("BBa_B0010").await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_reseed_keeps_serving_previous_catalog() {
    let fixture = Fixture::seeded(MockUpstream::new(DUMP)).await;
    let before = index_names(&fixture).await;

    let broken = format!("{}>BBa_BAD Released not-a-number RBS \"x\"\nacgt\n", DUMP);
    fixture.upstream.set_dump(&broken);
    let err = fixture.seeder().seed().await.unwrap_err();
    assert!(matches!(err, SeedError::Parse(_)));

    assert_eq!(index_names(&fixture).await, before);
    assert!(fixture.catalog.part("BBa_B0034").await.unwrap().is_some());

    // The next good seed clears what the broken one staged
    fixture.upstream.set_dump(DUMP);
    let report = fixture.seeder().seed().await.unwrap();
    assert_eq!(index_names(&fixture).await.len(), report.records);
}

#[tokio::test]
async fn test_download_failure_aborts_seed() {
    let fixture = Fixture::new(MockUpstream::new(DUMP));
    fixture.upstream.set_unavailable(true);

    let err = fixture.seeder().seed().await.unwrap_err();
    assert!(matches!(err, SeedError::Download(_)));
    assert!(fixture.catalog.index().await.unwrap().is_none());
}

#[tokio::test]
async fn test_seed_leaves_extended_cache_alone() {
    let fixture = Fixture::new(MockUpstream::new(DUMP));
    fixture
        .store
        .put(&CacheKey::extended("BBa_B0034"), bytes::Bytes::from_static(b"{}"))
        .await
        .unwrap();

    fixture.seeder().seed().await.unwrap();
    fixture.seeder().seed().await.unwrap();

    assert!(fixture
        .store
        .get(&CacheKey::extended("BBa_B0034"))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_failed_retirement_is_finished_by_next_seed() {
    let fixture = Fixture::seeded(MockUpstream::new(DUMP)).await;

    fixture.store.fail_deletes(1);
    let second = fixture.seeder().seed().await.unwrap();
    assert_eq!(second.generation, 2);
    assert_eq!(
        fixture.store.get_all(&Namespace::BasicParts(1)).await.unwrap().len(),
        3
    );
    assert_eq!(fixture.catalog.retiring().await.unwrap(), vec![1]);

    let third = fixture.seeder().seed().await.unwrap();
    assert_eq!(third.generation, 3);
    for generation in 1..=2 {
        assert!(fixture
            .store
            .get_all(&Namespace::BasicParts(generation))
            .await
            .unwrap()
            .is_empty());
        assert!(fixture
            .store
            .get(&CacheKey::index(generation))
            .await
            .unwrap()
            .is_none());
    }
    assert!(fixture.catalog.retiring().await.unwrap().is_empty());
    assert_eq!(index_names(&fixture).await.len(), third.records);
}
