mod common;

use bytes::Bytes;
use car_extract::{ExtractError, Extractor, MemoryBlockstore};
use common::Fixture;
use futures::TryStreamExt;
use pretty_assertions::assert_eq;

fn extractor(store: &MemoryBlockstore) -> Extractor<MemoryBlockstore> {
    Extractor::builder().blockstore(store.clone()).build()
}

#[tokio::test]
async fn test_read_chunked_file() {
    let fixture = Fixture::new();
    let file = fixture.file(&[b"hello ", b"chunked ", b"world"]);
    let root = fixture.dir(&[("greeting.txt", file)]);

    let extractor = extractor(&fixture.store);
    let chunks = extractor
        .read_file(&format!("{root}/greeting.txt"))
        .stream()
        .try_collect::<Vec<Bytes>>()
        .await
        .unwrap();
    assert_eq!(chunks.concat(), b"hello chunked world");
    assert_eq!(chunks.len(), 3);
}

#[tokio::test]
async fn test_read_raw_root() {
    let fixture = Fixture::new();
    let root = fixture.raw(b"just bytes");

    let mut out = Vec::new();
    let written = extractor(&fixture.store)
        .read_file(&root.to_string())
        .write_to(&mut out)
        .await
        .unwrap();
    assert_eq!(written, 10);
    assert_eq!(out, b"just bytes");
}

#[tokio::test]
async fn test_inline_data_comes_first() {
    let fixture = Fixture::new();
    let tail = fixture.raw(b"-tail");
    let middle = fixture.file_node(b"-middle", &[tail]);
    let file = fixture.file_node(b"head", &[middle, fixture.raw(b"-last")]);

    let mut out = Vec::new();
    extractor(&fixture.store)
        .read_file(&file.to_string())
        .write_to(&mut out)
        .await
        .unwrap();
    assert_eq!(out, b"head-middle-tail-last");
}

#[tokio::test]
async fn test_directory_is_not_a_file() {
    let fixture = Fixture::new();
    let root = fixture.dir(&[("a", fixture.raw(b"a"))]);

    let result = extractor(&fixture.store)
        .read_file(&root.to_string())
        .stream()
        .try_collect::<Vec<_>>()
        .await;
    assert!(matches!(result, Err(ExtractError::NotAFile(cid)) if cid == root));
}

#[tokio::test]
async fn test_missing_chunk() {
    let fixture = Fixture::new();
    let file = fixture.file(&[b"first", b"second"]);
    let second = fixture.raw(b"second");
    fixture.store.remove(&second);

    let result = extractor(&fixture.store)
        .read_file(&file.to_string())
        .stream()
        .try_collect::<Vec<_>>()
        .await;
    assert!(matches!(result, Err(ExtractError::MissingBlock(cid)) if cid == second));
}
