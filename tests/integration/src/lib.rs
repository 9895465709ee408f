#![no_std]

// Integration test crate - all code is test-only

#[cfg(test)]
mod tests {
    extern crate std;

    use semaphore_interface::testutils::{MockSemaphore, MockSemaphoreClient};
    use semaphore_interface::Proof;
    use shadow_group::{
        CallData, ShadowGroup, ShadowGroupClient, ShadowGroupError, TxStatus,
    };
    use soroban_sdk::{
        testutils::Address as _,
        token::{StellarAssetClient, TokenClient},
        xdr::ToXdr,
        Address, Bytes, Env, IntoVal, Vec, U256,
    };

    // Realistic 32-byte identity commitments (BN254 field elements).
    const OWNER_COMMITMENTS: [&str; 3] = [
        "2536d01521137bf7b39e3fd26c1376f456ce46a45993a5d7c3c158a450fd7329",
        "012d2a4324506e9db0081457edb50a66a6a7c06cce0b6b6cd1b4345a8d8a21f0",
        "0cbc551a937e12107e513efd646a4f32eec3f0d2c130532e3516bdd9d4683a50",
    ];

    fn hex_to_u256(env: &Env, hex: &str) -> U256 {
        let bytes = hex::decode(hex).expect("invalid hex");
        let mut padded = [0u8; 32];
        let start = 32 - bytes.len();
        padded[start..].copy_from_slice(&bytes);
        U256::from_be_bytes(env, &Bytes::from_array(env, &padded))
    }

    /// The deployed system: mock verifier, asset contract, wallet.
    struct ShadowGroupSystem {
        env: Env,
        wallet: Address,
        semaphore: Address,
        token: Address,
    }

    impl ShadowGroupSystem {
        fn new(quorum: u32) -> Self {
            let env = Env::default();
            env.mock_all_auths();

            let semaphore = env.register(MockSemaphore, ());

            let token_admin = Address::generate(&env);
            let token = env
                .register_stellar_asset_contract_v2(token_admin)
                .address();

            let mut owners = Vec::new(&env);
            for hex in OWNER_COMMITMENTS.iter() {
                owners.push_back(hex_to_u256(&env, hex));
            }

            let wallet = env.register(
                ShadowGroup,
                (
                    semaphore.clone(),
                    token.clone(),
                    Self::group_id(&env),
                    owners,
                    quorum,
                ),
            );

            Self {
                env,
                wallet,
                semaphore,
                token,
            }
        }

        fn group_id(env: &Env) -> U256 {
            U256::from_u32(env, 1)
        }

        fn wallet_client(&self) -> ShadowGroupClient<'_> {
            ShadowGroupClient::new(&self.env, &self.wallet)
        }

        fn root(&self) -> U256 {
            MockSemaphoreClient::new(&self.env, &self.semaphore)
                .group_root(&Self::group_id(&self.env))
        }

        fn proof(&self) -> Proof {
            Proof::from_array(&self.env, &[9u8; 256])
        }

        fn nullifier(&self, seed: u32) -> U256 {
            U256::from_u32(&self.env, seed)
        }

        fn fund_wallet(&self, amount: i128) {
            let funder = Address::generate(&self.env);
            StellarAssetClient::new(&self.env, &self.token).mint(&funder, &amount);
            self.wallet_client().deposit(&funder, &amount);
        }

        fn submit(&self, to: &Address, value: i128, data: &Bytes, seed: u32) -> u32 {
            self.wallet_client().submit_transaction(
                to,
                &value,
                data,
                &self.root(),
                &self.nullifier(seed),
                &self.proof(),
            )
        }

        fn confirm(&self, tx_index: u32, seed: u32) {
            self.wallet_client().confirm_transaction(
                &tx_index,
                &self.root(),
                &self.nullifier(seed),
                &self.proof(),
            );
        }

        fn revoke(&self, tx_index: u32, seed: u32) {
            self.wallet_client().revoke_transaction(
                &tx_index,
                &self.root(),
                &self.nullifier(seed),
                &self.proof(),
            );
        }
    }

    #[test]
    fn full_lifecycle_with_payout() {
        let sys = ShadowGroupSystem::new(2);
        let wallet = sys.wallet_client();
        let token = TokenClient::new(&sys.env, &sys.token);
        let recipient = Address::generate(&sys.env);

        sys.fund_wallet(1_000);
        assert_eq!(wallet.balance(), 1_000);

        let tx_index = sys.submit(&recipient, 750, &Bytes::new(&sys.env), 0xA1);
        assert_eq!(tx_index, 0);
        assert_eq!(wallet.transaction_status(&0), TxStatus::Open);

        // Two of three owners confirm anonymously.
        sys.confirm(0, 0xB1);
        sys.confirm(0, 0xB2);
        assert_eq!(wallet.get_transaction(&0).num_confirmations, 2);

        // Anyone may execute once quorum holds.
        wallet.execute_transaction(&0);

        assert_eq!(wallet.transaction_status(&0), TxStatus::Executed);
        assert_eq!(token.balance(&recipient), 750);
        assert_eq!(wallet.balance(), 250);
    }

    #[test]
    fn double_vote_is_rejected_and_tally_unchanged() {
        let sys = ShadowGroupSystem::new(2);
        let wallet = sys.wallet_client();
        let recipient = Address::generate(&sys.env);

        sys.submit(&recipient, 0, &Bytes::new(&sys.env), 0xA1);
        sys.confirm(0, 0xB1);

        let result = wallet.try_confirm_transaction(
            &0,
            &sys.root(),
            &sys.nullifier(0xB1),
            &sys.proof(),
        );
        assert_eq!(result, Err(Ok(ShadowGroupError::NullifierAlreadyUsed)));
        assert_eq!(wallet.get_transaction(&0).num_confirmations, 1);

        // One vote short of quorum, execution is refused.
        assert_eq!(
            wallet.try_execute_transaction(&0),
            Err(Ok(ShadowGroupError::QuorumNotReached))
        );
    }

    #[test]
    fn revocation_quorum_kills_the_transaction() {
        let sys = ShadowGroupSystem::new(2);
        let wallet = sys.wallet_client();
        let recipient = Address::generate(&sys.env);

        sys.fund_wallet(100);
        sys.submit(&recipient, 100, &Bytes::new(&sys.env), 0xA1);
        sys.confirm(0, 0xB1);
        sys.confirm(0, 0xB2);

        // Quorum of revocations arrives before anyone executes.
        sys.revoke(0, 0xC1);
        sys.revoke(0, 0xC2);
        assert_eq!(wallet.transaction_status(&0), TxStatus::Revoked);

        assert_eq!(
            wallet.try_execute_transaction(&0),
            Err(Ok(ShadowGroupError::TxRevoked))
        );
        assert_eq!(
            wallet.try_confirm_transaction(&0, &sys.root(), &sys.nullifier(0xB3), &sys.proof()),
            Err(Ok(ShadowGroupError::TxRevoked))
        );

        // The ledger entry itself is permanent.
        assert_eq!(wallet.get_transaction(&0).num_revocations, 2);
        assert_eq!(wallet.balance(), 100);
    }

    #[test]
    fn failed_execution_is_retryable_after_funding() {
        let sys = ShadowGroupSystem::new(2);
        let wallet = sys.wallet_client();
        let token = TokenClient::new(&sys.env, &sys.token);
        let recipient = Address::generate(&sys.env);

        sys.submit(&recipient, 400, &Bytes::new(&sys.env), 0xA1);
        sys.confirm(0, 0xB1);
        sys.confirm(0, 0xB2);

        // Unfunded wallet: the payout fails and everything rolls back.
        assert_eq!(
            wallet.try_execute_transaction(&0),
            Err(Ok(ShadowGroupError::TxExecutionFailed))
        );
        assert_eq!(wallet.transaction_status(&0), TxStatus::Open);
        assert_eq!(wallet.get_transaction(&0).executed, false);

        sys.fund_wallet(400);
        wallet.execute_transaction(&0);
        assert_eq!(wallet.transaction_status(&0), TxStatus::Executed);
        assert_eq!(token.balance(&recipient), 400);
    }

    #[test]
    fn voting_rounds_are_independent_per_transaction() {
        let sys = ShadowGroupSystem::new(2);
        let wallet = sys.wallet_client();
        let recipient = Address::generate(&sys.env);

        sys.submit(&recipient, 1, &Bytes::new(&sys.env), 0xA1);
        sys.submit(&recipient, 2, &Bytes::new(&sys.env), 0xA2);

        // The same nullifier hash confirms both transactions: each
        // transaction index is its own voting round.
        sys.confirm(0, 0xB1);
        sys.confirm(1, 0xB1);
        // And a confirm nullifier does not double as a revoke one.
        sys.revoke(0, 0xB1);

        assert_eq!(wallet.get_transaction(&0).num_confirmations, 1);
        assert_eq!(wallet.get_transaction(&0).num_revocations, 1);
        assert_eq!(wallet.get_transaction(&1).num_confirmations, 1);
    }

    mod counter {
        use soroban_sdk::{contract, contractimpl, symbol_short, Env, Symbol};

        const COUNT: Symbol = symbol_short!("count");

        #[contract]
        pub struct Counter;

        #[contractimpl]
        impl Counter {
            pub fn increment(env: Env, by: u32) {
                let current: u32 = env.storage().instance().get(&COUNT).unwrap_or(0);
                env.storage().instance().set(&COUNT, &(current + by));
            }

            pub fn count(env: Env) -> u32 {
                env.storage().instance().get(&COUNT).unwrap_or(0)
            }
        }
    }

    #[test]
    fn quorum_gated_contract_call() {
        let sys = ShadowGroupSystem::new(2);
        let wallet = sys.wallet_client();

        let counter_id = sys.env.register(counter::Counter, ());
        let counter_client = counter::CounterClient::new(&sys.env, &counter_id);

        let call = CallData {
            function: soroban_sdk::symbol_short!("increment"),
            args: soroban_sdk::vec![&sys.env, 3u32.into_val(&sys.env)],
        };
        let data = call.to_xdr(&sys.env);

        sys.submit(&counter_id, 0, &data, 0xA1);

        // Not executable until quorum.
        sys.confirm(0, 0xB1);
        assert_eq!(
            wallet.try_execute_transaction(&0),
            Err(Ok(ShadowGroupError::QuorumNotReached))
        );
        assert_eq!(counter_client.count(), 0);

        sys.confirm(0, 0xB2);
        wallet.execute_transaction(&0);
        assert_eq!(counter_client.count(), 3);
    }

    #[test]
    fn ledger_snapshot_round_trips_submissions() {
        let sys = ShadowGroupSystem::new(2);
        let wallet = sys.wallet_client();
        let a = Address::generate(&sys.env);
        let b = Address::generate(&sys.env);

        sys.submit(&a, 10, &Bytes::new(&sys.env), 0xA1);
        sys.submit(&b, 20, &Bytes::new(&sys.env), 0xA2);

        let txs = wallet.get_transactions();
        assert_eq!(txs.len(), 2);

        let first = txs.get(0).unwrap();
        assert_eq!(first.to, a);
        assert_eq!(first.value, 10);
        assert_eq!(first.executed, false);
        assert_eq!(first.num_confirmations, 0);
        assert_eq!(first.num_revocations, 0);

        let second = txs.get(1).unwrap();
        assert_eq!(second.to, b);
        assert_eq!(second.value, 20);
    }
}
