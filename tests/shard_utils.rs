//! Split, join and incremental-update tests

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reed_solomon_lrc::{Error, ReedSolomon};

#[test]
fn update_single_shard_matches_reencode() {
    let r = ReedSolomon::new(4, 2).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let data: Vec<u8> = (0..64).map(|_| rng.gen()).collect();

    let mut shards = r.split(&data).unwrap();
    r.encode(&mut shards).unwrap();

    // A replacement for shard 1 that differs in one byte.
    let mut new_shard = shards[1].clone();
    new_shard[3] ^= 0x5a;

    // Re-encode from scratch with the new column for reference.
    let mut reencoded = shards.clone();
    reencoded[1] = new_shard.clone();
    r.encode(&mut reencoded).unwrap();

    // Incremental update of the existing parity.
    let new_data = vec![Vec::new(), new_shard, Vec::new(), Vec::new()];
    r.update(&mut shards, &new_data).unwrap();

    assert_eq!(&shards[4..], &reencoded[4..]);
}

#[test]
fn update_multiple_shards_matches_reencode() {
    let r = ReedSolomon::new(5, 3).unwrap();
    let mut rng = StdRng::seed_from_u64(8);
    let mut shards: Vec<Vec<u8>> = (0..8)
        .map(|i| {
            if i < 5 {
                (0..200).map(|_| rng.gen()).collect()
            } else {
                vec![0u8; 200]
            }
        })
        .collect();
    r.encode(&mut shards).unwrap();

    let mut new_data = vec![Vec::new(); 5];
    new_data[0] = (0..200).map(|_| rng.gen()).collect();
    new_data[3] = (0..200).map(|_| rng.gen()).collect();

    let mut reencoded = shards.clone();
    reencoded[0] = new_data[0].clone();
    reencoded[3] = new_data[3].clone();
    r.encode(&mut reencoded).unwrap();

    r.update(&mut shards, &new_data).unwrap();
    assert_eq!(&shards[5..], &reencoded[5..]);
}

#[test]
fn update_large_shards_matches_reencode() {
    // Large enough to take the split parallel path.
    let r = ReedSolomon::new(4, 2).unwrap();
    let mut rng = StdRng::seed_from_u64(21);
    let mut shards: Vec<Vec<u8>> = (0..6)
        .map(|i| {
            if i < 4 {
                (0..1 << 16).map(|_| rng.gen()).collect()
            } else {
                vec![0u8; 1 << 16]
            }
        })
        .collect();
    r.encode(&mut shards).unwrap();

    let mut new_data = vec![Vec::new(); 4];
    new_data[2] = (0..1 << 16).map(|_| rng.gen()).collect();

    let mut reencoded = shards.clone();
    reencoded[2] = new_data[2].clone();
    r.encode(&mut reencoded).unwrap();

    r.update(&mut shards, &new_data).unwrap();
    assert_eq!(&shards[4..], &reencoded[4..]);
}

#[test]
fn update_requires_old_data_and_parity() {
    let r = ReedSolomon::new(4, 2).unwrap();
    let mut shards = r.split(&[7u8; 32]).unwrap();
    r.encode(&mut shards).unwrap();

    // Changed column whose old shard is missing.
    let mut damaged = shards.clone();
    damaged[1] = Vec::new();
    let new_data = vec![Vec::new(), vec![1u8; 8], Vec::new(), Vec::new()];
    assert!(matches!(
        r.update(&mut damaged, &new_data),
        Err(Error::InvalidInput)
    ));

    // Missing parity shard.
    let mut damaged = shards.clone();
    damaged[5] = Vec::new();
    assert!(matches!(
        r.update(&mut damaged, &new_data),
        Err(Error::InvalidInput)
    ));

    // Wrong new_data length.
    assert!(matches!(
        r.update(&mut shards, &[Vec::new(), Vec::new()]),
        Err(Error::TooFewShards)
    ));
}

#[test]
fn split_pads_and_join_truncates() {
    let r = ReedSolomon::new(4, 2).unwrap();
    let data: Vec<u8> = (0..8).collect();
    let shards = r.split(&data).unwrap();

    let mut joined = Vec::new();
    r.join(&mut joined, &shards, 7).unwrap();
    assert_eq!(joined, &data[..7]);
}

#[test]
fn split_uneven_data_zero_pads_the_tail() {
    let r = ReedSolomon::new(4, 2).unwrap();
    let data: Vec<u8> = (0..9).collect();
    let shards = r.split(&data).unwrap();

    // ceil(9 / 4) = 3 bytes per shard
    assert!(shards.iter().all(|s| s.len() == 3));
    assert_eq!(shards[2], vec![6, 7, 8]);
    assert_eq!(shards[3], vec![0, 0, 0]);

    let mut joined = Vec::new();
    r.join(&mut joined, &shards, 9).unwrap();
    assert_eq!(joined, data);
}

#[test]
fn split_empty_input_fails() {
    let r = ReedSolomon::new(4, 2).unwrap();
    assert!(matches!(r.split(&[]), Err(Error::ShortData)));
}

#[test]
fn join_error_cases() {
    let r = ReedSolomon::new(4, 2).unwrap();
    let shards = r.split(&(0..8).collect::<Vec<u8>>()).unwrap();
    let mut sink = Vec::new();

    // Not enough shards in the slice at all.
    assert!(matches!(
        r.join(&mut sink, &shards[..3], 8),
        Err(Error::TooFewShards)
    ));

    // A required data shard is missing.
    let mut damaged = shards.clone();
    damaged[1] = Vec::new();
    assert!(matches!(
        r.join(&mut sink, &damaged, 8),
        Err(Error::ReconstructRequired)
    ));

    // More bytes requested than the data shards hold.
    assert!(matches!(
        r.join(&mut sink, &shards, 9),
        Err(Error::ShortData)
    ));
}

#[test]
fn join_ignores_missing_shards_past_the_requested_size() {
    let r = ReedSolomon::new(4, 2).unwrap();
    let mut shards = r.split(&(0..8).collect::<Vec<u8>>()).unwrap();
    // Shards 2 and 3 are not needed for the first four bytes.
    shards[2] = Vec::new();
    shards[3] = Vec::new();

    let mut joined = Vec::new();
    r.join(&mut joined, &shards, 4).unwrap();
    assert_eq!(joined, vec![0, 1, 2, 3]);
}

#[test]
fn split_encode_join_roundtrip() {
    let r = ReedSolomon::new(7, 3).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let data: Vec<u8> = (0..10_000).map(|_| rng.gen()).collect();

    let mut shards = r.split(&data).unwrap();
    r.encode(&mut shards).unwrap();

    let mut joined = Vec::new();
    r.join(&mut joined, &shards, data.len()).unwrap();
    assert_eq!(joined, data);
}
