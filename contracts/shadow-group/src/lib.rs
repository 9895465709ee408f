//! # ShadowGroup Anonymous Multi-Signature Wallet
//!
//! A multi-signature wallet whose approvals are gated by Semaphore
//! group-membership proofs instead of signer addresses. A fixed set of
//! owner identity commitments is registered at deployment; afterwards
//! any owner can submit, confirm, or revoke a transaction by proving
//! membership in the group, without revealing which owner acted.
//!
//! ## Voting rounds and nullifiers
//!
//! Each action derives a `signal` (what is being voted on) and an
//! `external_nullifier` (which voting round the vote belongs to) as
//! pure functions of the call parameters:
//!
//! | Action  | signal                          | external nullifier           |
//! |---------|---------------------------------|------------------------------|
//! | submit  | keccak(to ‖ value ‖ data)       | keccak(tx_count ‖ signal)    |
//! | confirm | keccak(0x01)                    | keccak(tx_index ‖ signal)    |
//! | revoke  | keccak(0x00)                    | keccak(tx_index ‖ signal)    |
//!
//! Binding the submit signal to the exact transaction content stops a
//! proof generated for one transaction being replayed against another;
//! binding the external nullifier to the transaction index makes every
//! transaction an independent round, so a confirm nullifier for
//! transaction 0 cannot confirm transaction 1 nor double as a revoke.
//! Consumed `(external_nullifier, nullifier_hash)` pairs are recorded
//! permanently, which is what prevents one identity voting twice in
//! the same round.
//!
//! ## Execution
//!
//! Once a transaction holds `quorum` confirmations (and fewer than
//! `quorum` revocations) anyone may execute it; execution needs no
//! proof, only the accumulated tally. The `executed` flag is persisted
//! before any external interaction, and a failed payout or call aborts
//! the frame so every effect of the attempt rolls back.

#![no_std]

use semaphore_interface::{Proof, SemaphoreClient, MERKLE_TREE_DEPTH};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, token,
    xdr::{FromXdr, ToXdr},
    Address, Bytes, Env, Symbol, Val, Vec, U256,
};

const SEMAPHORE: Symbol = symbol_short!("semaphore");
const TOKEN: Symbol = symbol_short!("token");
const GROUP_ID: Symbol = symbol_short!("group_id");
const QUORUM: Symbol = symbol_short!("quorum");
const TX_COUNT: Symbol = symbol_short!("tx_count");

#[contracterror]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ShadowGroupError {
    /// The initial owner commitment set is empty.
    InvalidInitialOwners = 1,
    /// Quorum is zero or larger than the owner set.
    InvalidQuorum = 2,
    /// The verifier rejected the membership proof.
    InvalidProof = 3,
    /// The nullifier hash was already consumed in this voting round.
    NullifierAlreadyUsed = 4,
    TxDoesNotExist = 5,
    TxAlreadyExecuted = 6,
    /// The transaction's revocation tally already reached quorum.
    TxRevoked = 7,
    QuorumNotReached = 8,
    /// The underlying payout or call failed; all effects of the
    /// attempt are rolled back and the transaction stays open.
    TxExecutionFailed = 9,
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Transaction(u32),      // ledger index -> Transaction
    Nullifier(U256, U256), // (external_nullifier, nullifier_hash) -> consumed
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    pub to: Address,
    pub value: i128,
    pub data: Bytes,
    pub executed: bool,
    pub num_confirmations: u32,
    pub num_revocations: u32,
}

/// Derived per-transaction state; never stored, always recomputed from
/// the `executed` flag and the tallies.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TxStatus {
    Open,
    Executed,
    Revoked,
}

/// Call payload carried in `Transaction::data`: an XDR-encoded
/// function name plus arguments, dispatched against `Transaction::to`
/// at execution time. Empty `data` means a pure value transfer.
#[contracttype]
#[derive(Clone)]
pub struct CallData {
    pub function: Symbol,
    pub args: Vec<Val>,
}

// Typed Events
#[soroban_sdk::contractevent]
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionSubmitted {
    #[topic]
    pub tx_index: u32,
    pub to: Address,
    pub value: i128,
}

#[soroban_sdk::contractevent]
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionConfirmed {
    #[topic]
    pub tx_index: u32,
    pub nullifier_hash: U256,
}

#[soroban_sdk::contractevent]
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionRevoked {
    #[topic]
    pub tx_index: u32,
    pub nullifier_hash: U256,
}

#[soroban_sdk::contractevent]
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionExecuted {
    #[topic]
    pub tx_index: u32,
}

#[soroban_sdk::contractevent]
#[derive(Clone, Debug, PartialEq)]
pub struct Deposited {
    #[topic]
    pub from: Address,
    pub amount: i128,
}

#[contract]
pub struct ShadowGroup;

#[contractimpl]
impl ShadowGroup {
    /// Constructor: register the owner group with the Semaphore
    /// verifier and persist the immutable wallet configuration.
    ///
    /// `token` is the asset contract the wallet holds and pays out
    /// (normally the native asset's Stellar Asset Contract).
    pub fn __constructor(
        env: Env,
        semaphore: Address,
        token: Address,
        group_id: U256,
        owner_identity_commitments: Vec<U256>,
        quorum: u32,
    ) -> Result<(), ShadowGroupError> {
        if owner_identity_commitments.is_empty() {
            return Err(ShadowGroupError::InvalidInitialOwners);
        }
        if quorum < 1 || quorum > owner_identity_commitments.len() {
            return Err(ShadowGroupError::InvalidQuorum);
        }

        let verifier = SemaphoreClient::new(&env, &semaphore);
        verifier.create_group(&group_id, &MERKLE_TREE_DEPTH);
        for commitment in owner_identity_commitments.iter() {
            verifier.add_member(&group_id, &commitment);
        }

        env.storage().instance().set(&SEMAPHORE, &semaphore);
        env.storage().instance().set(&TOKEN, &token);
        env.storage().instance().set(&GROUP_ID, &group_id);
        env.storage().instance().set(&QUORUM, &quorum);
        env.storage().instance().set(&TX_COUNT, &0u32);
        Ok(())
    }

    /// Submit a transaction proposal with a membership proof.
    ///
    /// The submit round is keyed by the current ledger length, so two
    /// submissions never share an external nullifier. Returns the new
    /// transaction's ledger index.
    pub fn submit_transaction(
        env: Env,
        to: Address,
        value: i128,
        data: Bytes,
        merkle_tree_root: U256,
        nullifier_hash: U256,
        proof: Proof,
    ) -> Result<u32, ShadowGroupError> {
        let tx_count: u32 = env.storage().instance().get(&TX_COUNT).unwrap_or(0);

        let signal = Self::submit_signal(&env, &to, value, &data);
        let external_nullifier = Self::external_nullifier(&env, tx_count, &signal);
        Self::verify(
            &env,
            &signal,
            &external_nullifier,
            &merkle_tree_root,
            &nullifier_hash,
            &proof,
        )?;

        let tx = Transaction {
            to: to.clone(),
            value,
            data,
            executed: false,
            num_confirmations: 0,
            num_revocations: 0,
        };
        env.storage()
            .persistent()
            .set(&DataKey::Transaction(tx_count), &tx);
        env.storage().instance().set(&TX_COUNT, &(tx_count + 1));

        TransactionSubmitted {
            tx_index: tx_count,
            to,
            value,
        }
        .publish(&env);

        Ok(tx_count)
    }

    /// Cast an anonymous "yes" vote on an open transaction.
    pub fn confirm_transaction(
        env: Env,
        tx_index: u32,
        merkle_tree_root: U256,
        nullifier_hash: U256,
        proof: Proof,
    ) -> Result<(), ShadowGroupError> {
        let mut tx = Self::load_transaction(&env, tx_index)?;
        Self::require_open(&env, &tx)?;

        let signal = Self::vote_signal(&env, true);
        let external_nullifier = Self::external_nullifier(&env, tx_index, &signal);
        Self::verify(
            &env,
            &signal,
            &external_nullifier,
            &merkle_tree_root,
            &nullifier_hash,
            &proof,
        )?;

        tx.num_confirmations += 1;
        env.storage()
            .persistent()
            .set(&DataKey::Transaction(tx_index), &tx);

        TransactionConfirmed {
            tx_index,
            nullifier_hash,
        }
        .publish(&env);

        Ok(())
    }

    /// Cast an anonymous "no" vote on an open transaction.
    ///
    /// The revoked gate reads the tally as it stood before this call,
    /// so the vote that reaches quorum itself succeeds and only
    /// subsequent votes on the dead transaction fail.
    pub fn revoke_transaction(
        env: Env,
        tx_index: u32,
        merkle_tree_root: U256,
        nullifier_hash: U256,
        proof: Proof,
    ) -> Result<(), ShadowGroupError> {
        let mut tx = Self::load_transaction(&env, tx_index)?;
        Self::require_open(&env, &tx)?;

        let signal = Self::vote_signal(&env, false);
        let external_nullifier = Self::external_nullifier(&env, tx_index, &signal);
        Self::verify(
            &env,
            &signal,
            &external_nullifier,
            &merkle_tree_root,
            &nullifier_hash,
            &proof,
        )?;

        tx.num_revocations += 1;
        env.storage()
            .persistent()
            .set(&DataKey::Transaction(tx_index), &tx);

        TransactionRevoked {
            tx_index,
            nullifier_hash,
        }
        .publish(&env);

        Ok(())
    }

    /// Execute a transaction whose confirmation tally reached quorum.
    ///
    /// Callable by anyone; execution carries no proof, only the
    /// already-accumulated tally. A failed payout or call returns
    /// `TxExecutionFailed`, which aborts the frame and rolls back the
    /// tentative `executed` flag, leaving the transaction open for a
    /// later retry.
    pub fn execute_transaction(env: Env, tx_index: u32) -> Result<(), ShadowGroupError> {
        let mut tx = Self::load_transaction(&env, tx_index)?;
        let quorum = Self::quorum(env.clone());
        if tx.executed {
            return Err(ShadowGroupError::TxAlreadyExecuted);
        }
        if tx.num_revocations >= quorum {
            return Err(ShadowGroupError::TxRevoked);
        }
        if tx.num_confirmations < quorum {
            return Err(ShadowGroupError::QuorumNotReached);
        }

        // Checks-effects-interactions: finalize before touching the
        // outside world so a reentrant execute sees executed = true.
        tx.executed = true;
        env.storage()
            .persistent()
            .set(&DataKey::Transaction(tx_index), &tx);

        if tx.value > 0 {
            let token_client = token::TokenClient::new(&env, &Self::token(env.clone()));
            match token_client.try_transfer(&env.current_contract_address(), &tx.to, &tx.value) {
                Ok(Ok(())) => (),
                _ => return Err(ShadowGroupError::TxExecutionFailed),
            }
        }

        if !tx.data.is_empty() {
            let call = CallData::from_xdr(&env, &tx.data)
                .map_err(|_| ShadowGroupError::TxExecutionFailed)?;
            match env.try_invoke_contract::<Val, soroban_sdk::Error>(
                &tx.to,
                &call.function,
                call.args,
            ) {
                Ok(Ok(_)) => (),
                _ => return Err(ShadowGroupError::TxExecutionFailed),
            }
        }

        TransactionExecuted { tx_index }.publish(&env);

        Ok(())
    }

    /// Move `amount` of the wallet's asset from `from` into the
    /// wallet. Open to anyone; funding needs no proof or owner check.
    pub fn deposit(env: Env, from: Address, amount: i128) {
        from.require_auth();

        let token_client = token::TokenClient::new(&env, &Self::token(env.clone()));
        token_client.transfer(&from, &env.current_contract_address(), &amount);

        Deposited { from, amount }.publish(&env);
    }

    /// Full ledger snapshot in submission order.
    pub fn get_transactions(env: Env) -> Vec<Transaction> {
        let tx_count: u32 = env.storage().instance().get(&TX_COUNT).unwrap_or(0);
        let mut txs = Vec::new(&env);
        for i in 0..tx_count {
            let tx: Transaction = env
                .storage()
                .persistent()
                .get(&DataKey::Transaction(i))
                .unwrap();
            txs.push_back(tx);
        }
        txs
    }

    /// Single transaction by ledger index.
    pub fn get_transaction(env: Env, tx_index: u32) -> Result<Transaction, ShadowGroupError> {
        Self::load_transaction(&env, tx_index)
    }

    /// Derived status: executed wins, then revocation quorum, else open.
    pub fn transaction_status(env: Env, tx_index: u32) -> Result<TxStatus, ShadowGroupError> {
        let tx = Self::load_transaction(&env, tx_index)?;
        let quorum = Self::quorum(env);
        if tx.executed {
            Ok(TxStatus::Executed)
        } else if tx.num_revocations >= quorum {
            Ok(TxStatus::Revoked)
        } else {
            Ok(TxStatus::Open)
        }
    }

    pub fn transaction_count(env: Env) -> u32 {
        env.storage().instance().get(&TX_COUNT).unwrap_or(0)
    }

    /// Whether a nullifier hash has been consumed in a voting round.
    pub fn is_nullifier_used(env: Env, external_nullifier: U256, nullifier_hash: U256) -> bool {
        env.storage()
            .persistent()
            .has(&DataKey::Nullifier(external_nullifier, nullifier_hash))
    }

    pub fn semaphore(env: Env) -> Address {
        env.storage().instance().get(&SEMAPHORE).unwrap()
    }

    pub fn token(env: Env) -> Address {
        env.storage().instance().get(&TOKEN).unwrap()
    }

    pub fn group_id(env: Env) -> U256 {
        env.storage().instance().get(&GROUP_ID).unwrap()
    }

    pub fn quorum(env: Env) -> u32 {
        env.storage().instance().get(&QUORUM).unwrap()
    }

    /// Wallet balance in the configured asset.
    pub fn balance(env: Env) -> i128 {
        let token_client = token::TokenClient::new(&env, &Self::token(env.clone()));
        token_client.balance(&env.current_contract_address())
    }

    // Internal: load a transaction or fail with TxDoesNotExist.
    fn load_transaction(env: &Env, tx_index: u32) -> Result<Transaction, ShadowGroupError> {
        env.storage()
            .persistent()
            .get(&DataKey::Transaction(tx_index))
            .ok_or(ShadowGroupError::TxDoesNotExist)
    }

    // Internal: votes are only accepted while a transaction is open.
    fn require_open(env: &Env, tx: &Transaction) -> Result<(), ShadowGroupError> {
        if tx.executed {
            return Err(ShadowGroupError::TxAlreadyExecuted);
        }
        let quorum: u32 = env.storage().instance().get(&QUORUM).unwrap();
        if tx.num_revocations >= quorum {
            return Err(ShadowGroupError::TxRevoked);
        }
        Ok(())
    }

    // Internal: consult the nullifier registry, delegate to the
    // verifier, and consume the nullifier on success. Consumption and
    // tally updates commit together or not at all.
    fn verify(
        env: &Env,
        signal: &U256,
        external_nullifier: &U256,
        merkle_tree_root: &U256,
        nullifier_hash: &U256,
        proof: &Proof,
    ) -> Result<(), ShadowGroupError> {
        let null_key = DataKey::Nullifier(external_nullifier.clone(), nullifier_hash.clone());
        if env.storage().persistent().has(&null_key) {
            return Err(ShadowGroupError::NullifierAlreadyUsed);
        }

        let semaphore: Address = env.storage().instance().get(&SEMAPHORE).unwrap();
        let group_id: U256 = env.storage().instance().get(&GROUP_ID).unwrap();
        let verifier = SemaphoreClient::new(env, &semaphore);
        match verifier.try_verify_proof(
            &group_id,
            merkle_tree_root,
            signal,
            nullifier_hash,
            external_nullifier,
            proof,
        ) {
            Ok(Ok(())) => (),
            _ => return Err(ShadowGroupError::InvalidProof),
        }

        env.storage().persistent().set(&null_key, &true);
        Ok(())
    }

    // Internal: signal for a submission, bound to the exact
    // transaction content.
    fn submit_signal(env: &Env, to: &Address, value: i128, data: &Bytes) -> U256 {
        let mut preimage = to.clone().to_xdr(env);
        preimage.extend_from_array(&value.to_be_bytes());
        preimage.append(data);
        Self::hash_to_field(env, &preimage)
    }

    // Internal: signal for a confirm (true) or revoke (false) vote.
    fn vote_signal(env: &Env, approve: bool) -> U256 {
        let byte: u8 = if approve { 1 } else { 0 };
        Self::hash_to_field(env, &Bytes::from_array(env, &[byte]))
    }

    // Internal: voting-round tag. `round` is the ledger length for
    // submissions and the transaction index for votes; recomputed on
    // every call, never cached.
    fn external_nullifier(env: &Env, round: u32, signal: &U256) -> U256 {
        let mut preimage = Bytes::new(env);
        preimage.extend_from_array(&round.to_be_bytes());
        preimage.append(&signal.to_be_bytes());
        Self::hash_to_field(env, &preimage)
    }

    fn hash_to_field(env: &Env, preimage: &Bytes) -> U256 {
        U256::from_be_bytes(env, &env.crypto().keccak256(preimage).to_bytes().into())
    }
}
