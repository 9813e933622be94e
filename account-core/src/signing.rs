//! Signer-set threshold predicates

use crate::types::Address;

/// Count distinct keepers present in `signers`
fn count_keepers(keepers: &[Address], signers: &[Address]) -> usize {
    keepers
        .iter()
        .enumerate()
        .filter(|(i, k)| !keepers[..*i].contains(k) && signers.contains(k))
        .count()
}

/// Check that at least `threshold` keepers signed.
///
/// With no keepers or a zero threshold the result is `allow_self`; callers
/// pass whether the account's own key signed.
pub fn satisfy_signing(
    threshold: u16,
    keepers: &[Address],
    signers: &[Address],
    allow_self: bool,
) -> bool {
    if keepers.is_empty() || threshold == 0 {
        return allow_self;
    }
    count_keepers(keepers, signers) >= usize::from(threshold)
}

/// Stricter variant used for governance-changing operations: one signature
/// more than the threshold, capped at the number of keepers.
pub fn satisfy_signing_plus(
    threshold: u16,
    keepers: &[Address],
    signers: &[Address],
    allow_self: bool,
) -> bool {
    if keepers.is_empty() || threshold == 0 {
        return allow_self;
    }
    let required = (usize::from(threshold) + 1).min(keepers.len());
    count_keepers(keepers, signers) >= required
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    #[test]
    fn test_satisfy_signing() {
        let keepers = vec![addr(1), addr(2), addr(3)];
        assert!(satisfy_signing(2, &keepers, &[addr(1), addr(3)], false));
        assert!(!satisfy_signing(2, &keepers, &[addr(1), addr(4)], false));
        assert!(!satisfy_signing(2, &keepers, &[addr(1), addr(1)], false));
        assert!(satisfy_signing(0, &[], &[], true));
        assert!(!satisfy_signing(0, &[], &[addr(1)], false));
    }

    #[test]
    fn test_satisfy_signing_plus() {
        let keepers = vec![addr(1), addr(2), addr(3)];
        assert!(!satisfy_signing_plus(2, &keepers, &[addr(1), addr(2)], false));
        assert!(satisfy_signing_plus(2, &keepers, &[addr(1), addr(2), addr(3)], false));

        // capped at the keeper count
        let keepers = vec![addr(1), addr(2)];
        assert!(satisfy_signing_plus(2, &keepers, &[addr(1), addr(2)], false));
    }

    #[test]
    fn test_duplicate_keepers_counted_once() {
        let keepers = vec![addr(1), addr(1)];
        assert!(!satisfy_signing(2, &keepers, &[addr(1)], false));
    }
}
