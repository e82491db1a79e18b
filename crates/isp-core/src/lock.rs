//! Advisory-lock keys.
//!
//! Postgres advisory locks are keyed by a `bigint`. Keys are derived from a
//! lock name with 32-bit FNV-1a over `LOCK_NAMESPACE + name` so every
//! instance of the service computes the same key.

/// Prefix shared by every lock key of the service family.
pub const LOCK_NAMESPACE: &str = "msp-service-template";

/// Name of the lock serializing baseline provisioning.
pub const BASELINE_LOCK_NAME: &str = "isp-system-service.baseline";

const FNV32_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a hash.
pub const fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV32_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV32_PRIME);
        i += 1;
    }
    hash
}

/// Advisory-lock key for `name`, as passed to `pg_try_advisory_xact_lock`.
pub fn advisory_lock_key(name: &str) -> i64 {
    let mut input = String::with_capacity(LOCK_NAMESPACE.len() + name.len());
    input.push_str(LOCK_NAMESPACE);
    input.push_str(name);
    i64::from(fnv1a_32(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_reference_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn lock_key_hashes_namespace_and_name() {
        let key = advisory_lock_key(BASELINE_LOCK_NAME);
        let expected = fnv1a_32(b"msp-service-templateisp-system-service.baseline");
        assert_eq!(key, i64::from(expected));
    }

    #[test]
    fn lock_key_is_non_negative() {
        assert!(advisory_lock_key(BASELINE_LOCK_NAME) >= 0);
        assert!(advisory_lock_key("") >= 0);
    }

    #[test]
    fn distinct_names_give_distinct_keys() {
        assert_ne!(
            advisory_lock_key(BASELINE_LOCK_NAME),
            advisory_lock_key("isp-system-service.migration")
        );
    }
}
