//! Deterministic in-memory stand-in for the Semaphore verifier.
//!
//! Lets lifecycle tests run without real proof generation: the mock
//! accepts any non-zero proof blob whose Merkle root matches the
//! group's current root and whose nullifier hash is fresh for the
//! given external nullifier. An all-zero proof blob is rejected as
//! invalid, giving tests a handle on the `InvalidProof` path.

use soroban_sdk::{contract, contractimpl, contracttype, Bytes, Env, U256};

use crate::{Proof, SemaphoreError};

#[contracttype]
#[derive(Clone)]
pub enum MockDataKey {
    GroupDepth(U256),              // group_id -> merkle tree depth
    GroupRoot(U256),               // group_id -> current (chained) root
    Nullifier(U256, U256, U256),   // (group_id, external_nullifier, nullifier_hash)
}

#[contract]
pub struct MockSemaphore;

#[contractimpl]
impl MockSemaphore {
    pub fn create_group(
        env: Env,
        group_id: U256,
        merkle_tree_depth: u32,
    ) -> Result<(), SemaphoreError> {
        let depth_key = MockDataKey::GroupDepth(group_id.clone());
        if env.storage().persistent().has(&depth_key) {
            return Err(SemaphoreError::GroupAlreadyExists);
        }
        env.storage().persistent().set(&depth_key, &merkle_tree_depth);
        env.storage()
            .persistent()
            .set(&MockDataKey::GroupRoot(group_id), &U256::from_u32(&env, 0));
        Ok(())
    }

    pub fn add_member(
        env: Env,
        group_id: U256,
        identity_commitment: U256,
    ) -> Result<(), SemaphoreError> {
        let root_key = MockDataKey::GroupRoot(group_id.clone());
        let root: U256 = env
            .storage()
            .persistent()
            .get(&root_key)
            .ok_or(SemaphoreError::GroupDoesNotExist)?;

        // Not a real Merkle tree: chain-hash members so the root still
        // changes deterministically with every insertion.
        let mut preimage = Bytes::new(&env);
        preimage.append(&root.to_be_bytes());
        preimage.append(&identity_commitment.to_be_bytes());
        let new_root = U256::from_be_bytes(
            &env,
            &env.crypto().keccak256(&preimage).to_bytes().into(),
        );

        env.storage().persistent().set(&root_key, &new_root);
        Ok(())
    }

    /// Current root for a group, so tests can pass a matching root in
    /// their proof parameters.
    pub fn group_root(env: Env, group_id: U256) -> Result<U256, SemaphoreError> {
        env.storage()
            .persistent()
            .get(&MockDataKey::GroupRoot(group_id))
            .ok_or(SemaphoreError::GroupDoesNotExist)
    }

    pub fn verify_proof(
        env: Env,
        group_id: U256,
        merkle_tree_root: U256,
        signal: U256,
        nullifier_hash: U256,
        external_nullifier: U256,
        proof: Proof,
    ) -> Result<(), SemaphoreError> {
        // The mock cannot check the circuit binding of the signal; the
        // real verifier does.
        let _ = signal;

        let root: U256 = env
            .storage()
            .persistent()
            .get(&MockDataKey::GroupRoot(group_id.clone()))
            .ok_or(SemaphoreError::GroupDoesNotExist)?;
        if merkle_tree_root != root {
            return Err(SemaphoreError::RootNotInGroup);
        }

        if proof == Proof::from_array(&env, &[0u8; 256]) {
            return Err(SemaphoreError::InvalidProof);
        }

        let null_key = MockDataKey::Nullifier(group_id, external_nullifier, nullifier_hash);
        if env.storage().persistent().has(&null_key) {
            return Err(SemaphoreError::NullifierReused);
        }
        env.storage().persistent().set(&null_key, &true);
        Ok(())
    }
}
