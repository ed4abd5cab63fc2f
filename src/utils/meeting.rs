// src/utils/meeting.rs

use rand::Rng;

/// Builds a fresh room name on the conferencing service: `<prefix>_<16 hex digits>`.
///
/// Uniqueness is probabilistic (64 random bits); the `room_id` column is UNIQUE
/// so a collision surfaces as an insert failure rather than a shared room.
pub fn generate_room_id(prefix: &str) -> String {
    let suffix: u64 = rand::thread_rng().r#gen();
    format!("{}_{:016x}", prefix, suffix)
}

/// Public link participants open to join the room.
pub fn join_url(base_url: &str, room_id: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), room_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_ids_carry_prefix_and_hex_suffix() {
        let id = generate_room_id("edurenfort");
        let (prefix, suffix) = id.split_once('_').unwrap();
        assert_eq!(prefix, "edurenfort");
        assert_eq!(suffix.len(), 16);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_room_id("edurenfort"));
    }

    #[test]
    fn join_url_ignores_trailing_slash() {
        assert_eq!(join_url("https://meet.jit.si/", "r_1"), "https://meet.jit.si/r_1");
        assert_eq!(join_url("https://meet.jit.si", "r_1"), "https://meet.jit.si/r_1");
    }
}
