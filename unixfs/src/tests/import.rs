use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use futures::future::BoxFuture;
use futures::{stream, FutureExt, Stream};
use prost::Message;
use rstest::rstest;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::address::{AddressConfig, CidVersion, HashAlgorithm, DAG_PB_CODEC, RAW_CODEC};
use crate::blockservice::{BlockService, MemoryBlockService};
use crate::fixtures::{CountingBlockService, FailingBlockService};
use crate::import::{
    build_file, BufferImporter, DefaultBufferImporter, File, ImportOptions, LeafContext,
    ProgressFn, Strategy,
};
use crate::nodes::{Mtime, NodeDescriptor, UnixFs};
use crate::proto::{DataType, PbNode};
use crate::Error;

fn file(chunks: Vec<Bytes>) -> File<impl Stream<Item = io::Result<Bytes>> + Send + 'static> {
    File::new(stream::iter(chunks.into_iter().map(Ok::<_, io::Error>)))
}

fn chunks(parts: &[&'static str]) -> Vec<Bytes> {
    parts.iter().map(|p| Bytes::from_static(p.as_bytes())).collect()
}

/// Chunks of varying length and distinct contents.
fn numbered_chunks(n: usize) -> Vec<Bytes> {
    (0..n)
        .map(|i| Bytes::from(format!("chunk number {} {}", i, "x".repeat(i % 7))))
        .collect()
}

fn small_fanout(strategy: Strategy) -> ImportOptions {
    ImportOptions {
        strategy,
        max_children_per_node: 3,
        layer_repeat: 2,
        ..Default::default()
    }
}

/// Reads the DAG below `cid` back from the block service, checking every
/// link size on the way. Returns the total serialized size and the file
/// contents.
fn walk(block_service: &MemoryBlockService, cid: Cid) -> BoxFuture<'_, (u64, Vec<u8>)> {
    async move {
        let block = block_service
            .get(&cid)
            .await
            .expect("must succeed")
            .expect("block must exist");

        if cid.codec() == RAW_CODEC {
            return (block.len() as u64, block.to_vec());
        }

        let node = PbNode::decode(block.clone()).expect("must decode");
        let unixfs =
            UnixFs::unmarshal(&node.data.unwrap_or_default()).expect("must have metadata");

        let mut size = block.len() as u64;
        let mut content = unixfs.data.as_ref().map(|d| d.to_vec()).unwrap_or_default();
        let mut block_sizes = vec![];

        for link in node.links {
            let hash = link.hash.expect("link must have a hash");
            let child = Cid::try_from(&hash[..]).expect("must be a valid cid");

            let (child_size, child_content) = walk(block_service, child).await;
            assert_eq!(Some(child_size), link.tsize);
            assert_eq!(Some(String::new()), link.name);

            size += child_size;
            block_sizes.push(child_content.len() as u64);
            content.extend(child_content);
        }

        assert_eq!(unixfs.block_sizes, block_sizes);
        assert_eq!(content.len() as u64, unixfs.file_size());

        (size, content)
    }
    .boxed()
}

#[rstest]
#[tokio::test]
async fn reconstructs_content(
    #[values(Strategy::Flat, Strategy::Balanced, Strategy::Trickle)] strategy: Strategy,
    #[values(false, true)] raw_leaves: bool,
    #[values(2, 9, 20)] n: usize,
) {
    let block_service = MemoryBlockService::default();
    let chunks = numbered_chunks(n);
    let options = ImportOptions {
        raw_leaves,
        ..small_fanout(strategy)
    };

    let root = build_file(file(chunks.clone()), block_service.clone(), &options)
        .await
        .expect("must succeed");

    let (size, content) = walk(&block_service, root.cid).await;
    assert_eq!(chunks.concat(), content);
    assert_eq!(size, root.size);
    assert_eq!(
        content.len() as u64,
        root.unixfs.expect("root must be framed").file_size()
    );
}

#[rstest]
#[tokio::test]
async fn deterministic(
    #[values(Strategy::Flat, Strategy::Balanced, Strategy::Trickle)] strategy: Strategy,
) {
    let chunks = numbered_chunks(25);

    let sequential = build_file(
        file(chunks.clone()),
        MemoryBlockService::default(),
        &ImportOptions {
            block_write_concurrency: 1,
            ..small_fanout(strategy)
        },
    )
    .await
    .expect("must succeed");

    let concurrent = build_file(
        file(chunks),
        MemoryBlockService::default(),
        &ImportOptions {
            block_write_concurrency: 8,
            ..small_fanout(strategy)
        },
    )
    .await
    .expect("must succeed");

    assert_eq!(sequential.cid, concurrent.cid);
    assert_eq!(sequential.size, concurrent.size);
}

#[tokio::test]
async fn strategies_differ() {
    let mut cids = vec![];
    for strategy in [Strategy::Flat, Strategy::Balanced, Strategy::Trickle] {
        let root = build_file(
            file(numbered_chunks(20)),
            MemoryBlockService::default(),
            &small_fanout(strategy),
        )
        .await
        .expect("must succeed");
        cids.push(root.cid);
    }

    assert_ne!(cids[0], cids[1]);
    assert_ne!(cids[1], cids[2]);
    assert_ne!(cids[0], cids[2]);
}

#[tokio::test]
async fn two_framed_leaves() {
    let block_service = MemoryBlockService::default();

    let root = build_file(
        file(chunks(&["abc", "defg"])).with_path("abc.txt"),
        block_service.clone(),
        &ImportOptions::default(),
    )
    .await
    .expect("must succeed");

    assert_eq!(Some("abc.txt".to_string()), root.path);
    assert_eq!(cid::Version::V0, root.cid.version());
    assert_eq!(DAG_PB_CODEC, root.cid.codec());

    let unixfs = root.unixfs.expect("root must be framed");
    assert_eq!(DataType::File, unixfs.kind);
    assert_eq!(vec![3, 4], unixfs.block_sizes);
    assert_eq!(7, unixfs.file_size());

    let block = block_service
        .get(&root.cid)
        .await
        .expect("must succeed")
        .expect("root must be stored");
    let node = PbNode::decode(block.clone()).expect("must decode");
    assert_eq!(2, node.links.len());

    let mut expected_size = block.len() as u64;
    for (link, data) in node.links.iter().zip(["abc", "defg"]) {
        let hash = link.hash.as_ref().expect("link must have a hash");
        let leaf_cid = Cid::try_from(&hash[..]).expect("must be a valid cid");
        let leaf = block_service
            .get(&leaf_cid)
            .await
            .expect("must succeed")
            .expect("leaf must be stored");

        let leaf_node = PbNode::decode(leaf.clone()).expect("must decode");
        let leaf_unixfs =
            UnixFs::unmarshal(&leaf_node.data.expect("must have data")).expect("must decode");
        assert_eq!(Some(Bytes::from_static(data.as_bytes())), leaf_unixfs.data);
        assert_eq!(Some(leaf.len() as u64), link.tsize);

        expected_size += leaf.len() as u64;
    }

    assert_eq!(expected_size, root.size);
}

#[tokio::test]
async fn single_raw_leaf_is_root() {
    let block_service = CountingBlockService::default();

    let root = build_file(
        file(chunks(&["x"])).with_path("x.txt"),
        block_service.clone(),
        &ImportOptions {
            raw_leaves: true,
            ..Default::default()
        },
    )
    .await
    .expect("must succeed");

    assert_eq!(
        AddressConfig::raw(HashAlgorithm::Sha2_256)
            .address(b"x")
            .expect("valid config"),
        root.cid
    );
    assert_eq!(1, root.size);
    assert!(root.unixfs.is_none());
    assert!(!root.single);
    assert_eq!(Some("x.txt".to_string()), root.path);
    assert_eq!(1, block_service.puts());
}

#[tokio::test]
async fn single_framed_leaf_is_root() {
    let block_service = CountingBlockService::default();

    let root = build_file(
        file(chunks(&["x"])),
        block_service.clone(),
        &ImportOptions::default(),
    )
    .await
    .expect("must succeed");

    assert_eq!(DAG_PB_CODEC, root.cid.codec());
    assert_eq!(
        Some(Bytes::from_static(b"x")),
        root.unixfs.expect("must be framed").data
    );
    assert_eq!(1, block_service.puts());
}

#[tokio::test]
async fn single_leaf_not_reduced() {
    let block_service = CountingBlockService::default();

    let root = build_file(
        file(chunks(&["x"])),
        block_service.clone(),
        &ImportOptions {
            raw_leaves: true,
            reduce_single_leaf_to_self: false,
            ..Default::default()
        },
    )
    .await
    .expect("must succeed");

    let leaf_cid = AddressConfig::raw(HashAlgorithm::Sha2_256)
        .address(b"x")
        .expect("valid config");

    assert_ne!(leaf_cid, root.cid);
    assert_eq!(vec![1], root.unixfs.expect("must be framed").block_sizes);
    assert_eq!(2, block_service.puts());
}

#[rstest]
#[case::mtime(Some(Mtime::from_secs(1_700_000_000)), None)]
#[case::mode(None, Some(0o755))]
#[case::both(Some(Mtime::from_secs(1_700_000_000)), Some(0o600))]
#[tokio::test]
async fn single_raw_leaf_with_metadata(#[case] mtime: Option<Mtime>, #[case] mode: Option<u32>) {
    let block_service = CountingBlockService::default();
    let options = ImportOptions {
        raw_leaves: true,
        ..Default::default()
    };

    let plain = build_file(file(chunks(&["x"])), block_service.clone(), &options)
        .await
        .expect("must succeed");
    let with_metadata = build_file(
        file(chunks(&["x"])).with_metadata(mtime, mode),
        block_service.clone(),
        &options,
    )
    .await
    .expect("must succeed");

    assert_eq!(RAW_CODEC, plain.cid.codec());
    assert_ne!(plain.cid, with_metadata.cid);
    assert_eq!(DAG_PB_CODEC, with_metadata.cid.codec());

    let unixfs = with_metadata.unixfs.expect("must be framed");
    assert_eq!(Some(Bytes::from_static(b"x")), unixfs.data);
    assert_eq!(mtime, unixfs.mtime);
    assert_eq!(mode, unixfs.mode);

    // The bare leaf is only written once, the reframed one next to it.
    let block = block_service
        .get(&with_metadata.cid)
        .await
        .expect("must succeed")
        .expect("must be stored");
    assert_eq!(block.len() as u64, with_metadata.size);
    assert_eq!(2, block_service.puts());
}

#[tokio::test]
async fn only_hash() {
    let chunks = numbered_chunks(10);
    let options = small_fanout(Strategy::Balanced);

    let stored = build_file(file(chunks.clone()), MemoryBlockService::default(), &options)
        .await
        .expect("must succeed");

    // Nothing may reach the block service.
    let hashed = build_file(
        file(chunks),
        FailingBlockService,
        &ImportOptions {
            only_hash: true,
            ..options
        },
    )
    .await
    .expect("must succeed");

    assert_eq!(stored.cid, hashed.cid);
    assert_eq!(stored.size, hashed.size);
}

#[tokio::test]
async fn only_hash_reframes_single_leaf() {
    let block_service = CountingBlockService::default();

    let root = build_file(
        file(chunks(&["x"])).with_metadata(Some(Mtime::from_secs(5)), None),
        block_service.clone(),
        &ImportOptions {
            raw_leaves: true,
            only_hash: true,
            ..Default::default()
        },
    )
    .await
    .expect("must succeed");

    assert_eq!(DAG_PB_CODEC, root.cid.codec());
    assert_eq!(0, block_service.puts());
}

#[rstest]
#[case::framed(false, "QmbFMke1KXqnYyBBWxB74N4c5SBnJMVAiMNRcGu6x1AwQH")]
#[case::raw(true, "bafkreihdwdcefgh4dqkjv67uzcmw7ojee6xedzdetojuzjevtenxquvyku")]
#[tokio::test]
async fn empty_file(#[case] raw_leaves: bool, #[case] expected: &str) {
    let root = build_file(
        file(vec![]),
        MemoryBlockService::default(),
        &ImportOptions {
            raw_leaves,
            ..Default::default()
        },
    )
    .await
    .expect("must succeed");

    assert_eq!(expected.parse::<Cid>().expect("valid cid"), root.cid);
}

#[tokio::test]
async fn cid_version_1() {
    let root = build_file(
        file(chunks(&["abc", "defg"])),
        MemoryBlockService::default(),
        &ImportOptions {
            cid_version: CidVersion::V1,
            hasher: HashAlgorithm::Blake3,
            ..Default::default()
        },
    )
    .await
    .expect("must succeed");

    assert_eq!(cid::Version::V1, root.cid.version());
    assert_eq!(HashAlgorithm::Blake3.code(), root.cid.hash().code());
}

#[tokio::test]
async fn progress() {
    let reports = Arc::new(Mutex::new(Vec::new()));
    let options = ImportOptions {
        progress: Some(ProgressFn::new({
            let reports = reports.clone();
            move |bytes, path: Option<&str>| {
                reports
                    .lock()
                    .unwrap()
                    .push((bytes, path.map(str::to_string)))
            }
        })),
        block_write_concurrency: 1,
        ..Default::default()
    };

    build_file(
        file(chunks(&["abc", "defg", "h"])).with_path("f"),
        MemoryBlockService::default(),
        &options,
    )
    .await
    .expect("must succeed");

    let path = Some("f".to_string());
    assert_eq!(
        vec![(3, path.clone()), (4, path.clone()), (1, path)],
        *reports.lock().unwrap()
    );
}

struct CountingImporter {
    calls: AtomicUsize,
}

#[async_trait]
impl BufferImporter for CountingImporter {
    async fn import_buffer(
        &self,
        chunk: Bytes,
        ctx: &LeafContext,
    ) -> Result<NodeDescriptor, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        DefaultBufferImporter.import_buffer(chunk, ctx).await
    }
}

#[tokio::test]
async fn custom_buffer_importer() {
    let importer = Arc::new(CountingImporter {
        calls: AtomicUsize::new(0),
    });

    let custom = build_file(
        file(numbered_chunks(5)),
        MemoryBlockService::default(),
        &ImportOptions {
            buffer_importer: Some(importer.clone()),
            ..Default::default()
        },
    )
    .await
    .expect("must succeed");
    let default = build_file(
        file(numbered_chunks(5)),
        MemoryBlockService::default(),
        &ImportOptions::default(),
    )
    .await
    .expect("must succeed");

    assert_eq!(5, importer.calls.load(Ordering::SeqCst));
    assert_eq!(default.cid, custom.cid);
}

#[tokio::test]
async fn store_errors() {
    assert!(matches!(
        build_file(
            file(chunks(&["abc", "defg"])),
            FailingBlockService,
            &ImportOptions::default()
        )
        .await,
        Err(Error::Store(_))
    ));
}

#[tokio::test]
async fn read_errors() {
    let content = stream::iter(vec![
        Ok(Bytes::from_static(b"abc")),
        Err(io::Error::other("disk on fire")),
    ]);

    assert!(matches!(
        build_file(
            File::new(content),
            MemoryBlockService::default(),
            &ImportOptions::default()
        )
        .await,
        Err(Error::Encoding(_))
    ));
}

#[tokio::test]
async fn invalid_options() {
    let block_service = CountingBlockService::default();

    assert!(matches!(
        build_file(
            file(chunks(&["abc"])),
            block_service.clone(),
            &ImportOptions {
                block_write_concurrency: 0,
                ..Default::default()
            }
        )
        .await,
        Err(Error::Config(_))
    ));
    assert_eq!(0, block_service.puts());
}
