pub mod ids;

pub use ids::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_nil() {
        let nil = NodeId::nil();
        assert!(nil.is_nil());
        assert_eq!(nil.index(), 0);
        assert_eq!(nil.generation(), 0);
    }

    #[test]
    fn node_id_roundtrip_u64_various() {
        let cases: &[(u32, u32)] = &[
            (0, 0),
            (1, 0),
            (0, 1),
            (5, 2),
            (12345, 77),
            (u32::MAX, u32::MAX),
        ];

        for &(i, g) in cases {
            let id = NodeId::from_parts(i, g);
            let packed = id.as_u64();
            let unpacked = NodeId::from_u64(packed);
            assert_eq!(
                unpacked, id,
                "roundtrip failed for index={i} generation={g} packed={packed}"
            );
        }
    }

    #[test]
    fn stable_id_from_path_deterministic() {
        let a = StableId::from_path("res://player.graph");
        let b = StableId::from_path("res://player.graph");
        let c = StableId::from_path("res://enemy.graph");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn stable_id_display_parses_back() {
        let id = StableId::from_path("res://main.graph");
        let parsed = StableId::parse_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn string_hash_deterministic_and_distinguishing() {
        let a = string_to_u64("x-border");
        let b = string_to_u64("x-border2");
        let c = string_to_u64("X-BORDER");
        assert_eq!(a, string_to_u64("x-border"));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
