use orbitile_world::{
    apply_world_chunks_update, get_world_chunks_update, read_world_chunks_update,
    write_world_chunks_update, ChunkKey, WorldChunks,
};
use proptest::prelude::*;

fn chunk_maps() -> impl Strategy<Value = WorldChunks> {
    prop::collection::hash_map(
        (-6_i32..6, -6_i32..6).prop_map(|(x, y)| ChunkKey::new(x, y)),
        prop::collection::vec(any::<u8>(), 0..24),
        0..24,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn replaying_the_update_reproduces_the_new_snapshot(
        old in chunk_maps(),
        new in chunk_maps(),
    ) {
        let update = get_world_chunks_update(&old, &new);
        let wire = write_world_chunks_update(&update);
        let received = read_world_chunks_update(&wire).expect("update decodes");
        prop_assert_eq!(&received, &update);

        let mut replayed = old.clone();
        apply_world_chunks_update(&mut replayed, received);
        prop_assert_eq!(replayed, new);
    }

    #[test]
    fn identical_snapshots_produce_empty_updates(chunks in chunk_maps()) {
        prop_assert!(get_world_chunks_update(&chunks, &chunks).is_empty());
    }
}
