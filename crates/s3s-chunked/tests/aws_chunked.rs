use s3s_chunked::config::{ChunkedConfig, HotReloadConfigProvider};
use s3s_chunked::crypto::ChecksumAlgorithm;
use s3s_chunked::stream::{ByteSource, ReaderSource, StreamSource, channel};
use s3s_chunked::{
    AmzDate, AwsChunkedBuilder, AwsChunkedError, AwsChunkedReader, ChunkSigner, HashSpecification, SigV4ChunkSigner,
    Signature, SigningConfig, StdError, TrailingHeaders,
};

use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use http_body_util::BodyExt;

const SECRET_KEY: &str = "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY";

fn tracing_init() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn example_config() -> SigningConfig {
    SigningConfig::new(AmzDate::parse("20130524T000000Z").unwrap(), "us-east-1", "s3", SECRET_KEY)
}

fn join(bytes: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::new();
    for b in bytes {
        buf.extend_from_slice(b);
    }
    buf
}

async fn read_to_end<S: ByteSource>(reader: &mut AwsChunkedReader<S>) -> Result<Vec<u8>, AwsChunkedError> {
    let mut out = BytesMut::new();
    while reader.read(&mut out, 8192).await?.is_some() {}
    Ok(out.to_vec())
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Splits a payload into small stream items so chunks span several upstream reads
fn fragmented(payload: &[u8], item_size: usize) -> StreamSource<futures::stream::Iter<std::vec::IntoIter<Result<Bytes, StdError>>>> {
    let items: Vec<Result<Bytes, StdError>> = payload.chunks(item_size).map(|c| Ok(Bytes::copy_from_slice(c))).collect();
    StreamSource::new(futures::stream::iter(items))
}

#[tokio::test]
async fn example_put_object_chunked_stream() {
    tracing_init();

    let seed = Signature::from("4f232c4386841ef735655705268965c44a0e4690baa4adea153f7db9fa80a0a9");
    let payload = vec![b'a'; 65536 + 1024];

    let builder = AwsChunkedBuilder::new(HashSpecification::StreamingAws4HmacSha256Payload).signer(
        Arc::new(SigV4ChunkSigner),
        example_config(),
        seed,
    );
    let expected_len = builder.encoded_length(payload.len() as u64).unwrap();
    let mut reader = builder.build(fragmented(&payload, 1000)).unwrap();
    let encoded = read_to_end(&mut reader).await.unwrap();

    let chunk1_meta = b"10000;chunk-signature=ad80c730a21e5b8d04586a2213dd63b9a0e99e0e2307b0ade35a65485a288648\r\n";
    let chunk2_meta = b"400;chunk-signature=0055627c9e194cb4542bae2aa5492e3c1575bbb81b612b7d234b86a503ef5497\r\n";
    let chunk3_meta = b"0;chunk-signature=b6c6ea8a5354eaf15b3cb7646744f4275b71ea724fed81ceb9323e279d449df9\r\n";

    let expected = join(&[
        chunk1_meta,
        &payload[..65536],
        b"\r\n",
        chunk2_meta,
        &payload[65536..],
        b"\r\n",
        chunk3_meta,
        b"\r\n",
    ]);

    assert_eq!(encoded, expected);
    assert_eq!(encoded.len() as u64, expected_len);
}

#[tokio::test]
async fn example_put_object_chunked_stream_with_trailer() {
    tracing_init();

    let seed = Signature::from("106e2a8a18243abcf37539882f36619c00e2dfc72633413f02d3b74544bfeb8e");
    let payload = vec![b'a'; 65536 + 1024];

    let builder = AwsChunkedBuilder::new(HashSpecification::StreamingAws4HmacSha256PayloadTrailer)
        .signer(Arc::new(SigV4ChunkSigner), example_config(), seed)
        .checksum(ChecksumAlgorithm::Crc32c);
    let expected_len = builder.encoded_length(payload.len() as u64).unwrap();
    let mut reader = builder.build(Bytes::from(payload.clone())).unwrap();
    let encoded = read_to_end(&mut reader).await.unwrap();

    let chunk1_meta = b"10000;chunk-signature=b474d8862b1487a5145d686f57f013e54db672cee1c953b3010fb58501ef5aa2\r\n";
    let chunk2_meta = b"400;chunk-signature=1c1344b170168f8e65b41376b44b20fe354e373826ccbbe2c1d40a8cae51e5c7\r\n";
    let chunk3_meta = b"0;chunk-signature=2ca2aba2005185cf7159c6277faf83795951dd77a3a99e6e65d5c9f85863f992\r\n";
    let trailers = b"x-amz-checksum-crc32c:sOO8/Q==\r\n";
    let trailer_signature =
        b"x-amz-trailer-signature:d81f82fc3505edab99d459891051a732e8730629a2e4a59689829ca17fe2e435\r\n";

    let expected = join(&[
        chunk1_meta,
        &payload[..65536],
        b"\r\n",
        chunk2_meta,
        &payload[65536..],
        b"\r\n",
        chunk3_meta,
        b"\r\n",
        trailers,
        trailer_signature,
    ]);

    assert_eq!(encoded, expected);
    assert_eq!(encoded.len() as u64, expected_len);
}

#[tokio::test]
async fn single_full_chunk_with_empty_seed() {
    let payload = vec![0x7a; 65536];
    let config = example_config();

    let mut reader = AwsChunkedBuilder::new(HashSpecification::StreamingAws4HmacSha256Payload)
        .signer(Arc::new(SigV4ChunkSigner), config.clone(), Signature::empty())
        .build(Bytes::from(payload.clone()))
        .unwrap();
    let encoded = read_to_end(&mut reader).await.unwrap();

    let sig1 = SigV4ChunkSigner.sign_chunk(&payload, &Signature::empty(), &config).await.unwrap();
    let sig2 = SigV4ChunkSigner.sign_chunk(&[], &sig1, &config).await.unwrap();

    assert_eq!(count(&encoded, b"chunk-signature="), 2);
    let expected = join(&[
        format!("10000;chunk-signature={sig1}\r\n").as_bytes(),
        &payload,
        b"\r\n",
        format!("0;chunk-signature={sig2}\r\n\r\n").as_bytes(),
    ]);
    assert_eq!(encoded, expected);
}

#[tokio::test]
async fn empty_payload_is_signed_from_seed() {
    let config = example_config();
    let seed = Signature::from("4f232c4386841ef735655705268965c44a0e4690baa4adea153f7db9fa80a0a9");

    let mut reader = AwsChunkedBuilder::new(HashSpecification::StreamingAws4HmacSha256Payload)
        .signer(Arc::new(SigV4ChunkSigner), config.clone(), seed.clone())
        .build(Bytes::new())
        .unwrap();
    let encoded = read_to_end(&mut reader).await.unwrap();

    let sig = SigV4ChunkSigner.sign_chunk(&[], &seed, &config).await.unwrap();
    assert_eq!(encoded, format!("0;chunk-signature={sig}\r\n\r\n").into_bytes());
}

#[tokio::test]
async fn exact_byte_count() {
    const CHUNK_SIZE: usize = 64;

    let mut trailers = TrailingHeaders::new();
    trailers.insert("x-amz-meta-author", " someone ").unwrap();

    let cases = [0, 1, CHUNK_SIZE - 1, CHUNK_SIZE, CHUNK_SIZE + 1, 5 * CHUNK_SIZE];
    for size in cases {
        let payload = vec![b'x'; size];

        let signed = AwsChunkedBuilder::new(HashSpecification::StreamingAws4HmacSha256PayloadTrailer)
            .chunk_size(CHUNK_SIZE)
            .signer(Arc::new(SigV4ChunkSigner), example_config(), Signature::empty())
            .trailers(trailers.clone())
            .checksum(ChecksumAlgorithm::Sha256);
        let unsigned = AwsChunkedBuilder::new(HashSpecification::StreamingUnsignedPayloadTrailer)
            .chunk_size(CHUNK_SIZE)
            .checksum(ChecksumAlgorithm::Crc64Nvme);

        for builder in [signed, unsigned] {
            let expected = builder.encoded_length(size as u64).unwrap();
            let mut reader = builder.build(fragmented(&payload, (size / 3).max(7))).unwrap();
            let encoded = read_to_end(&mut reader).await.unwrap();
            assert_eq!(encoded.len() as u64, expected, "size {size}");

            assert!(encoded.starts_with(format!("{:x}", size.min(CHUNK_SIZE)).as_bytes()));
        }
    }
}

#[tokio::test]
async fn unsigned_mode_omits_signatures() {
    let payload = vec![b'q'; 150];
    let mut trailers = TrailingHeaders::new();
    trailers.insert("x-amz-checksum-crc32", "AAAAAA==").unwrap();
    trailers.insert("x-amz-arbitrary-header", "val").unwrap();

    let build = |spec, signed: bool| {
        let mut builder = AwsChunkedBuilder::new(spec).chunk_size(64).trailers(trailers.clone());
        if signed {
            builder = builder.signer(Arc::new(SigV4ChunkSigner), example_config(), Signature::empty());
        }
        builder.build(Bytes::from(payload.clone())).unwrap()
    };

    let unsigned = read_to_end(&mut build(HashSpecification::StreamingUnsignedPayloadTrailer, false))
        .await
        .unwrap();
    let signed = read_to_end(&mut build(HashSpecification::StreamingAws4HmacSha256PayloadTrailer, true))
        .await
        .unwrap();

    assert_eq!(count(&unsigned, b"chunk-signature="), 0);
    assert_eq!(count(&unsigned, b"x-amz-trailer-signature"), 0);
    assert_eq!(count(&signed, b"chunk-signature="), 4);
    assert_eq!(count(&signed, b"x-amz-trailer-signature:"), 1);

    let expected = join(&[
        b"40\r\n",
        &payload[..64],
        b"\r\n40\r\n",
        &payload[64..128],
        b"\r\n16\r\n",
        &payload[128..],
        b"\r\n0\r\n\r\n",
        b"x-amz-arbitrary-header:val\r\nx-amz-checksum-crc32:AAAAAA==\r\n",
    ]);
    assert_eq!(unsigned, expected);
}

#[tokio::test]
async fn exhaustion_is_idempotent() {
    let mut reader = AwsChunkedBuilder::new(HashSpecification::StreamingAws4HmacSha256Payload)
        .signer(Arc::new(SigV4ChunkSigner), example_config(), Signature::empty())
        .build(Bytes::from_static(b"data"))
        .unwrap();
    read_to_end(&mut reader).await.unwrap();

    let mut sink = BytesMut::new();
    for _ in 0..5 {
        assert!(reader.read(&mut sink, 1).await.unwrap().is_none());
    }
    assert!(sink.is_empty());
}

/// Records every signer call and delegates to the SigV4 signer
struct RecordingSigner {
    chain: Mutex<Vec<(Signature, Signature)>>,
}

#[async_trait::async_trait]
impl ChunkSigner for RecordingSigner {
    async fn sign_chunk(&self, chunk: &[u8], prev: &Signature, config: &SigningConfig) -> Result<Signature, StdError> {
        let sig = SigV4ChunkSigner.sign_chunk(chunk, prev, config).await?;
        self.chain.lock().unwrap().push((prev.clone(), sig.clone()));
        Ok(sig)
    }

    async fn sign_trailer(&self, trailers: &TrailingHeaders, prev: &Signature, config: &SigningConfig) -> Result<Signature, StdError> {
        let sig = SigV4ChunkSigner.sign_trailer(trailers, prev, config).await?;
        self.chain.lock().unwrap().push((prev.clone(), sig.clone()));
        Ok(sig)
    }
}

#[tokio::test]
async fn chain_integrity() {
    let signer = Arc::new(RecordingSigner {
        chain: Mutex::new(Vec::new()),
    });
    let seed = Signature::from("seed");
    let payload = vec![b'c'; 1000];

    let mut reader = AwsChunkedBuilder::new(HashSpecification::StreamingAws4HmacSha256PayloadTrailer)
        .chunk_size(128)
        .signer(signer.clone(), example_config(), seed.clone())
        .checksum(ChecksumAlgorithm::Crc32)
        .build(fragmented(&payload, 100))
        .unwrap();
    let encoded = read_to_end(&mut reader).await.unwrap();

    let chain = signer.chain.lock().unwrap().clone();
    // 8 data chunks, the final chunk and the trailer block
    assert_eq!(chain.len(), 10);
    assert_eq!(chain[0].0, seed);
    for pair in chain.windows(2) {
        assert_eq!(pair[1].0, pair[0].1);
    }
    assert_eq!(reader.prev_signature(), &chain[9].1);

    for (_, sig) in &chain[..9] {
        assert_eq!(count(&encoded, format!("chunk-signature={sig}\r\n").as_bytes()), 1);
    }
    assert!(encoded.ends_with(format!("x-amz-trailer-signature:{}\r\n", chain[9].1).as_bytes()));
}

#[tokio::test]
async fn upstream_failure_is_fatal() {
    let items: Vec<Result<Bytes, StdError>> = vec![
        Ok(Bytes::from(vec![b'a'; 100])),
        Ok(Bytes::from(vec![b'b'; 10])),
        Err("connection reset by peer".into()),
    ];
    let mut reader = AwsChunkedBuilder::new(HashSpecification::StreamingAws4HmacSha256Payload)
        .chunk_size(64)
        .signer(Arc::new(SigV4ChunkSigner), example_config(), Signature::empty())
        .build(StreamSource::new(futures::stream::iter(items)))
        .unwrap();

    let first = reader.next_frame().await.unwrap().unwrap();
    assert!(first.starts_with(b"40;chunk-signature="));

    let err = reader.next_frame().await.unwrap_err();
    assert!(matches!(err, AwsChunkedError::Upstream(ref e) if e.to_string() == "connection reset by peer"));
    assert!(matches!(reader.next_frame().await, Err(AwsChunkedError::Terminated)));
}

#[tokio::test]
async fn dropping_body_cancels_channel() {
    let (tx, source) = channel(1);
    tx.send(Ok(Bytes::from(vec![b'a'; 64]))).await.unwrap();

    let mut body = AwsChunkedBuilder::new(HashSpecification::StreamingUnsignedPayloadTrailer)
        .chunk_size(64)
        .build_body(source, None)
        .unwrap();
    let first = body.next().await.unwrap().unwrap();
    assert!(first.starts_with(b"40\r\n"));
    assert!(!tx.is_closed());

    drop(body);
    assert!(tx.is_closed());
    assert!(tx.send(Ok(Bytes::from_static(b"late"))).await.is_err());
}

#[tokio::test]
async fn channel_producer_streams_chunks() {
    let (tx, source) = channel(4);
    let producer = tokio::spawn(async move {
        for i in 0..10u8 {
            tx.send(Ok(Bytes::from(vec![b'0' + i; 25]))).await.unwrap();
        }
    });

    let builder = AwsChunkedBuilder::new(HashSpecification::StreamingUnsignedPayloadTrailer)
        .chunk_size(100)
        .checksum(ChecksumAlgorithm::Crc32);
    let expected_len = builder.encoded_length(250).unwrap();
    let mut reader = builder.build(source).unwrap();
    let encoded = read_to_end(&mut reader).await.unwrap();
    producer.await.unwrap();

    assert_eq!(encoded.len() as u64, expected_len);
    assert!(encoded.starts_with(b"64\r\n"));
    assert_eq!(count(&encoded, b"\r\n64\r\n"), 1);
    assert_eq!(count(&encoded, b"\r\n32\r\n"), 1);
}

#[tokio::test]
async fn reader_source_from_async_read() {
    let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    let mut reader = AwsChunkedBuilder::new(HashSpecification::StreamingUnsignedPayloadTrailer)
        .chunk_size(300)
        .build(ReaderSource::new(std::io::Cursor::new(payload.clone())))
        .unwrap();
    let encoded = read_to_end(&mut reader).await.unwrap();

    let expected = join(&[
        b"12c\r\n",
        &payload[..300],
        b"\r\n12c\r\n",
        &payload[300..600],
        b"\r\n12c\r\n",
        &payload[600..900],
        b"\r\n64\r\n",
        &payload[900..],
        b"\r\n0\r\n\r\n",
    ]);
    assert_eq!(encoded, expected);
}

#[tokio::test]
async fn body_collects_with_exact_size_hint() {
    let payload = Bytes::from(vec![b'z'; 300]);
    let body = AwsChunkedBuilder::new(HashSpecification::StreamingAws4HmacSha256PayloadTrailer)
        .chunk_size(128)
        .signer(Arc::new(SigV4ChunkSigner), example_config(), Signature::empty())
        .checksum(ChecksumAlgorithm::Crc32c)
        .build_body(payload.clone(), Some(300))
        .unwrap();

    let hint = http_body::Body::size_hint(&body).exact().unwrap();
    let collected = BodyExt::collect(body).await.unwrap().to_bytes();
    assert_eq!(collected.len() as u64, hint);
    assert!(collected.starts_with(b"80;chunk-signature="));
}

#[tokio::test]
async fn hot_reload_applies_to_new_streams_only() {
    let provider = HotReloadConfigProvider::default();
    let old = AwsChunkedBuilder::new(HashSpecification::StreamingUnsignedPayloadTrailer).config_provider(&provider);

    let mut config = ChunkedConfig::default();
    config.chunk_size = 4;
    config.aws_chunked_threshold = 16;
    provider.update(Arc::new(config));
    let new = AwsChunkedBuilder::new(HashSpecification::StreamingUnsignedPayloadTrailer).config_provider(&provider);

    let payload = Bytes::from_static(b"abcdefgh");
    let old = read_to_end(&mut old.build(payload.clone()).unwrap()).await.unwrap();
    let new = read_to_end(&mut new.build(payload).unwrap()).await.unwrap();

    assert_eq!(old, b"8\r\nabcdefgh\r\n0\r\n\r\n");
    assert_eq!(new, b"4\r\nabcd\r\n4\r\nefgh\r\n0\r\n\r\n");
}
