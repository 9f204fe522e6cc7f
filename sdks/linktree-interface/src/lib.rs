#![deny(missing_docs)]
#![forbid(unsafe_code)]

//! Solana Linktree program interface
//!
//! The linktree program itself is deployed separately; this crate describes
//! what a client needs to talk to it: program id, address derivation,
//! instruction encoding, the profile account layout and the program's error
//! codes. It never performs I/O.

pub mod error;
pub mod instruction;
pub mod state;

use solana_program::pubkey::{Pubkey, MAX_SEED_LEN};

solana_program::declare_id!("6jnvkMV423aCV52ieVPpfXwj3oWR8wKbR275pjNKdvgZ");

/// Longest username that can still be used as a PDA seed.
pub const MAX_USERNAME_LEN: usize = MAX_SEED_LEN;

/// Helper to derive the `LinkTreeAccount` PDA for a `(username, owner)` pair.
///
/// Returns `None` when the username cannot be a seed (longer than
/// [`MAX_USERNAME_LEN`] bytes).
pub fn try_find_linktree_pda_with_program(
    program_id: &Pubkey,
    username: &str,
    owner: &Pubkey,
) -> Option<(Pubkey, u8)> {
    if username.len() > MAX_USERNAME_LEN {
        return None;
    }
    Pubkey::try_find_program_address(&[username.as_bytes(), owner.as_ref()], program_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pda_depends_on_username_and_owner() {
        let owner_a = Pubkey::new_unique();
        let owner_b = Pubkey::new_unique();

        let derive = |username: &str, owner: &Pubkey| {
            try_find_linktree_pda_with_program(&ID, username, owner).map(|(address, _)| address)
        };
        let alice_a = derive("alice", &owner_a);

        assert!(alice_a.is_some());
        assert_ne!(alice_a, derive("alice", &owner_b));
        assert_ne!(alice_a, derive("bob", &owner_a));
        assert_eq!(derive("alice", &owner_a), alice_a);
    }

    #[test]
    fn oversized_username_has_no_pda() {
        let owner = Pubkey::new_unique();
        let long = "x".repeat(MAX_USERNAME_LEN + 1);
        assert!(try_find_linktree_pda_with_program(&ID, &long, &owner).is_none());

        let max = "x".repeat(MAX_USERNAME_LEN);
        assert!(try_find_linktree_pda_with_program(&ID, &max, &owner).is_some());
    }
}
