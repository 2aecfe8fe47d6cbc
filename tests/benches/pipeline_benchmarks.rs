//! # Lucid Pipeline Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | lc-01 | BLAKE3 over a sealed chunk |
//! | lc-01 | AEAD seal of one chunk, both ciphers |
//! | lc-01 | Merkle root over a session's chunk hashes |
//! | lc-03 | inclusion proof verification |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::RngCore;
use shared_crypto::symmetric::{counter_nonce, generate_nonce_prefix};
use shared_crypto::{blake3_hash, merkle_root, seal, Cipher, Hash, MerkleTree, SecretKey};
use std::time::Duration;

fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

fn leaves(count: usize) -> Vec<Hash> {
    (0..count as u64)
        .map(|i| blake3_hash(&i.to_be_bytes()))
        .collect()
}

// ============================================================================
// lc-01: chunk hashing and sealing
// ============================================================================

fn bench_chunk_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("lc-01-chunk-hash");
    for size in [64 * 1024, 1024 * 1024, 10 * 1024 * 1024] {
        let chunk = random_bytes(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("blake3", size), &chunk, |b, chunk| {
            b.iter(|| black_box(blake3_hash(chunk)))
        });
    }
    group.finish();
}

fn bench_chunk_seal(c: &mut Criterion) {
    let mut group = c.benchmark_group("lc-01-chunk-seal");
    group.measurement_time(Duration::from_secs(10));

    let key = SecretKey::generate();
    let prefix = generate_nonce_prefix();
    let chunk = random_bytes(1024 * 1024);
    let aad = b"session-000000";
    group.throughput(Throughput::Bytes(chunk.len() as u64));

    for cipher in [Cipher::XChaCha20Poly1305, Cipher::Aes256Gcm] {
        let mut counter = 0u64;
        group.bench_function(format!("{cipher:?}"), |b| {
            b.iter(|| {
                counter += 1;
                let nonce = counter_nonce(cipher, &prefix, counter);
                black_box(seal(cipher, &key, &nonce, &chunk, aad).ok())
            })
        });
    }
    group.finish();
}

// ============================================================================
// lc-01: Merkle root (parallel above 1024 nodes per level)
// ============================================================================

fn bench_merkle_root(c: &mut Criterion) {
    let mut group = c.benchmark_group("lc-01-merkle-root");
    for count in [16, 1_000, 10_000, 100_000] {
        let hashes = leaves(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &hashes, |b, hashes| {
            b.iter(|| black_box(merkle_root(hashes)))
        });
    }
    group.finish();
}

// ============================================================================
// lc-03: storage proof inclusion check
// ============================================================================

fn bench_inclusion_proof(c: &mut Criterion) {
    let mut group = c.benchmark_group("lc-03-inclusion-proof");
    for count in [1_000, 100_000] {
        let Some(tree) = MerkleTree::build(leaves(count)) else {
            continue;
        };
        let root = tree.root();
        let Ok(proof) = tree.proof(count / 2) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::new("verify", count), &proof, |b, proof| {
            b.iter(|| black_box(proof.verify(&root)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_chunk_hash,
    bench_chunk_seal,
    bench_merkle_root,
    bench_inclusion_proof
);
criterion_main!(benches);
