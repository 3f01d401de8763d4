#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use shortfall_sim::consts::{ATTO, DAY, PEBIBYTE, TEBIBYTE, YEAR};
    use shortfall_sim::miner::{
        BurnShortfallConfig, RepayProportionalConfig, RepayRatchetConfig, RepayRatchetMiner,
        StrictConfig,
    };
    use shortfall_sim::{
        Lock, Miner, MinerConfig, NetworkConfig, NetworkState, RewardEmitter, SimConfig,
        Simulator, StrategyConfig,
    };

    fn all_policies(balance: Decimal) -> Vec<MinerConfig> {
        vec![
            MinerConfig::Strict(StrictConfig { balance, vesting: None }),
            MinerConfig::Burn(BurnShortfallConfig { balance, ..Default::default() }),
            MinerConfig::RepayProportional(RepayProportionalConfig {
                balance,
                ..Default::default()
            }),
            MinerConfig::RepayRatchet(RepayRatchetConfig { balance, ..Default::default() }),
        ]
    }

    /// Strict miners cannot take a shortfall; everyone else takes the most allowed.
    fn shortfall_for(miner: &MinerConfig) -> Decimal {
        match miner {
            MinerConfig::Strict(_) => Decimal::ZERO,
            _ => Decimal::ONE,
        }
    }

    fn close(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
        (a - b).abs() <= tolerance
    }

    // ========== Activation Scenarios ==========

    #[test]
    fn strict_miner_without_balance_leases_full_pledge() {
        let net = NetworkState::new(&NetworkConfig::default());
        let mut miner = MinerConfig::Strict(StrictConfig::default()).build().expect("test: build");
        let activation = miner
            .activate_sectors(&net, PEBIBYTE, YEAR, Lock::Minimum)
            .expect("test: activation");

        let required = net.initial_pledge_for_power(PEBIBYTE);
        assert_eq!(activation.power, PEBIBYTE);
        assert_eq!(activation.pledge, required);
        assert_eq!(miner.ledger().pledge_locked(), required);
        assert_eq!(miner.lease(), required);
        assert_eq!(miner.ledger().balance(), required);
        assert_eq!(miner.available_balance(), Decimal::ZERO);
    }

    #[test]
    fn burn_miner_splits_requirement_between_lock_and_fee() {
        let net = NetworkState::new(&NetworkConfig::default());
        let mut miner = MinerConfig::Burn(BurnShortfallConfig::default())
            .build()
            .expect("test: build");
        let required = net.initial_pledge_for_power(PEBIBYTE);
        miner
            .activate_sectors(&net, PEBIBYTE, YEAR, Lock::Minimum)
            .expect("test: activation");

        assert_eq!(miner.ledger().pledge_locked(), required * dec!(0.67));
        assert_eq!(miner.lease(), required * dec!(0.67));
        assert!(close(miner.shortfall_fraction(&net), dec!(0.33), ATTO));
        let pending = miner.summary().pending_fee.expect("test: burn reports pending fee");
        assert_eq!(pending, (required * dec!(0.33)).round_dp(4));
    }

    #[test]
    fn every_policy_accepts_a_full_lock() {
        let net = NetworkState::new(&NetworkConfig::default());
        let required = net.initial_pledge_for_power(TEBIBYTE);
        for cfg in all_policies(dec!(1000000)) {
            let mut miner = cfg.build().expect("test: build");
            miner
                .activate_sectors(&net, TEBIBYTE, YEAR, Lock::Full)
                .expect("test: full lock is always valid");
            assert_eq!(miner.ledger().pledge_locked(), required, "{}", miner.policy());
            assert_eq!(miner.lease(), Decimal::ZERO, "{}", miner.policy());
            assert_eq!(miner.shortfall_fraction(&net), Decimal::ZERO, "{}", miner.policy());
        }
    }

    // ========== Lease Repayment ==========

    #[test]
    fn strict_lease_shrinks_every_epoch_of_a_day() {
        let mut net = NetworkState::new(&NetworkConfig::default());
        let mut miner = MinerConfig::default().build().expect("test: build");
        let mut emitter = RewardEmitter::new();
        miner
            .activate_sectors(&net, TEBIBYTE, YEAR, Lock::Full)
            .expect("test: activation");
        let mut lease = miner.lease();
        assert_eq!(lease, net.initial_pledge_for_power(TEBIBYTE));

        for _ in 0..DAY {
            emitter.emit(&net, miner.as_mut());
            miner.handle_epoch(&net);
            net.handle_epoch();
            let next = miner.lease();
            assert!(next >= Decimal::ZERO, "lease went negative: {next}");
            assert!(next < lease, "lease did not shrink at epoch {}", net.epoch);
            lease = next;
        }
        assert!(miner.ledger().lease_fee_accrued() > Decimal::ZERO);
    }

    #[test]
    fn strict_lease_is_repaid_from_rewards() {
        let net = NetworkState::new(&NetworkConfig::default());
        let balance = net.initial_pledge_for_power(PEBIBYTE) - dec!(50);
        let cfg = SimConfig::new(
            NetworkConfig::default(),
            MinerConfig::Strict(StrictConfig { balance, vesting: None }),
            StrategyConfig::power_limited(PEBIBYTE, YEAR, Decimal::ZERO),
        );
        let mut sim = Simulator::new(&cfg).expect("test: build");

        sim.tick().expect("test: tick");
        let mut lease = sim.miner().lease();
        assert!(lease > dec!(50), "lease covers the gap plus one epoch of fee");

        for _ in 0..3 * DAY {
            sim.tick().expect("test: tick");
            let next = sim.miner().lease();
            assert!(next >= Decimal::ZERO, "lease went negative: {next}");
            if lease > Decimal::ZERO {
                assert!(next < lease, "lease did not shrink at epoch {}", sim.network().epoch);
            } else {
                assert_eq!(next, Decimal::ZERO);
            }
            lease = next;
        }
        assert_eq!(lease, Decimal::ZERO, "lease repaid within three days");
        assert!(sim.miner().ledger().lease_fee_accrued() > Decimal::ZERO);
    }

    // ========== Expiration ==========

    #[test]
    fn expiring_everything_returns_each_policy_to_zero() {
        let duration = 10 * DAY;
        for miner in all_policies(Decimal::ZERO) {
            let strategy =
                StrategyConfig::power_limited(PEBIBYTE, duration, shortfall_for(&miner));
            let cfg = SimConfig::new(NetworkConfig::default(), miner, strategy);
            let mut sim = Simulator::new(&cfg).expect("test: build");
            let policy = sim.miner().policy();

            sim.run(duration, DAY).expect("test: run");
            assert_eq!(sim.miner().power(), PEBIBYTE, "{policy}: still active before expiry");

            sim.tick().expect("test: expiry tick");
            let summary = sim.miner().summary();
            assert_eq!(summary.power, 0, "{policy}");
            assert_eq!(summary.pledge_locked, Decimal::ZERO, "{policy}");
            if let Some(required) = summary.pledge_required {
                assert_eq!(required, Decimal::ZERO, "{policy}");
                assert_eq!(summary.shortfall, Some(Decimal::ZERO), "{policy}");
            }
            if let Some(pending) = summary.pending_fee {
                assert_eq!(pending, Decimal::ZERO, "{policy}: fee forgiven on expiry");
            }
            assert_eq!(summary.repayment_take_rate.unwrap_or_default(), Decimal::ZERO, "{policy}");
        }
    }

    // ========== Shortfall Repayment ==========

    #[test]
    fn repayment_policies_shrink_shortfall_over_time() {
        for miner in all_policies(Decimal::ZERO).into_iter().skip(2) {
            let strategy = StrategyConfig::power_limited(PEBIBYTE, YEAR, Decimal::ONE);
            let cfg = SimConfig::new(NetworkConfig::default(), miner, strategy);
            let mut sim = Simulator::new(&cfg).expect("test: build");
            let stats = sim.run(30 * DAY, DAY).expect("test: run");

            let first = stats[0].miner.shortfall.expect("test: shortfall reported");
            let last = stats[stats.len() - 1].miner.shortfall.expect("test: shortfall reported");
            assert!(first > Decimal::ZERO);
            assert!(last < first, "{}: {last} !< {first}", sim.miner().policy());
            let pledge: Vec<Decimal> = stats.iter().map(|s| s.miner.pledge_locked).collect();
            assert!(pledge.windows(2).all(|w| w[1] >= w[0]), "repayments only add pledge");
        }
    }

    #[test]
    fn shortfall_fraction_saturates_when_rewards_collapse() {
        let mut net = NetworkState::new(&NetworkConfig::default());
        for cfg in all_policies(Decimal::ZERO).into_iter().skip(2) {
            let mut miner = cfg.build().expect("test: build");
            let policy = miner.policy();
            net.epoch_reward = dec!(90);
            miner
                .activate_sectors(&net, TEBIBYTE, YEAR, Lock::Minimum)
                .expect("test: minimum activation");

            net.epoch_reward = dec!(0.001);
            assert_eq!(miner.shortfall_fraction(&net), Decimal::ONE, "{policy}");

            let reward = Decimal::ONE;
            let fee_before = miner.ledger().fee_burned();
            let locked_before = miner.ledger().pledge_locked();
            miner.receive_reward(&net, reward);
            let fee = miner.ledger().fee_burned() - fee_before;
            let repayment = miner.ledger().pledge_locked() - locked_before;
            assert_eq!(fee, dec!(0.25), "{policy}: full fee at full shortfall");
            assert!(repayment > Decimal::ZERO, "{policy}");
            assert!(fee + repayment <= reward + ATTO, "{policy}: {fee} + {repayment}");
        }
    }

    #[test]
    fn shortfall_fraction_is_zero_without_power() {
        let net = NetworkState::new(&NetworkConfig::default());
        let mut empty = net.clone();
        empty.power = 0;
        for cfg in all_policies(Decimal::ZERO) {
            let mut miner = cfg.build().expect("test: build");
            assert_eq!(miner.shortfall_fraction(&net), Decimal::ZERO, "{}", miner.policy());
            assert_eq!(miner.shortfall_fraction(&empty), Decimal::ZERO, "{}", miner.policy());

            miner.receive_reward(&empty, Decimal::ZERO);
            assert_eq!(miner.ledger().fee_burned(), Decimal::ZERO, "{}", miner.policy());
            assert_eq!(miner.ledger().pledge_locked(), Decimal::ZERO, "{}", miner.policy());
        }
    }

    #[test]
    fn ratchet_rate_never_falls_while_shortfall_remains() {
        let net = NetworkState::new(&NetworkConfig::default());
        let mut miner = RepayRatchetMiner::new(&RepayRatchetConfig::default()).expect("test: build");
        let mut rate = miner.repayment_take_rate();
        for batch in 1..=4u64 {
            miner
                .activate_sectors(&net, TEBIBYTE, batch * 90 * DAY, Lock::Minimum)
                .expect("test: minimum activation");
            for _ in 0..100 {
                miner.receive_reward(&net, dec!(0.01));
            }
            let next = miner.repayment_take_rate();
            assert!(next >= rate, "rate fell from {rate} to {next}");
            assert!(next <= dec!(0.75) + ATTO, "rate {next} above maximum");
            assert!(miner.shortfall() > Decimal::ZERO);
            rate = next;
        }
        assert!(rate > Decimal::ZERO);
    }

    // ========== Mainnet Presets ==========

    #[test]
    fn every_policy_runs_on_mainnet_presets() {
        for network in [NetworkConfig::mainnet_feb_2023(), NetworkConfig::mainnet_apr_2023()] {
            for miner in all_policies(dec!(100)) {
                let strategy =
                    StrategyConfig::pledge_limited(dec!(1000), YEAR, shortfall_for(&miner));
                let mut cfg = SimConfig::new(network.clone(), miner, strategy);
                cfg.epochs = 5 * DAY;
                let mut sim = Simulator::new(&cfg).expect("test: build");
                let stats = sim.run(cfg.epochs, cfg.stats_interval).expect("test: run");

                assert_eq!(stats.len(), 6);
                let last = &stats[stats.len() - 1].miner;
                assert!(last.power > 0, "{}: onboarded nothing", sim.miner().policy());
                assert!(last.reward_earned > Decimal::ZERO);
                assert!(last.lease >= Decimal::ZERO);
                assert!(sim.strategy().pledged() <= dec!(1000) + ATTO);
            }
        }
    }
}
