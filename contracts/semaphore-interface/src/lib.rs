//! # Semaphore Verifier Interface
//!
//! Client-side boundary for the external Semaphore group-membership
//! verifier. A proof attests that *some* member of a group produced a
//! given `nullifier_hash` for a given `signal` under a given
//! `external_nullifier`, without revealing which member.
//!
//! The wallet contract only ever consumes the boolean/error outcome of
//! `verify_proof`; proof construction, the circuit, and the Merkle tree
//! of identity commitments all live behind this interface.

#![no_std]

use soroban_sdk::{contractclient, contracterror, BytesN, Env, U256};

/// Depth of the group's Merkle tree of identity commitments (up to
/// 2^20 members).
pub const MERKLE_TREE_DEPTH: u32 = 20;

/// Opaque Groth16 proof blob: eight BN254 field elements, 32 bytes
/// each, big-endian.
pub type Proof = BytesN<256>;

#[contracterror]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SemaphoreError {
    GroupAlreadyExists = 1,
    GroupDoesNotExist = 2,
    /// The supplied Merkle root is not a valid root for the group.
    RootNotInGroup = 3,
    /// The nullifier hash was already consumed under this external
    /// nullifier.
    NullifierReused = 4,
    InvalidProof = 5,
}

/// Cross-contract surface of the Semaphore verifier.
///
/// `verify_proof` either succeeds or fails with a [`SemaphoreError`];
/// callers must treat any failure as a hard abort of the requested
/// action.
#[contractclient(name = "SemaphoreClient")]
pub trait SemaphoreInterface {
    fn create_group(env: Env, group_id: U256, merkle_tree_depth: u32) -> Result<(), SemaphoreError>;

    fn add_member(env: Env, group_id: U256, identity_commitment: U256)
        -> Result<(), SemaphoreError>;

    fn verify_proof(
        env: Env,
        group_id: U256,
        merkle_tree_root: U256,
        signal: U256,
        nullifier_hash: U256,
        external_nullifier: U256,
        proof: Proof,
    ) -> Result<(), SemaphoreError>;
}

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
