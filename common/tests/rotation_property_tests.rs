// Property-based tests for the rotation executor
//
// Hand-written counting fakes stand in for the stores and the gateway so
// every mutating call can be injected with failures and counted exactly.

use async_trait::async_trait;
use common::errors::{GatewayError, StoreError};
use common::gateway::MembershipGateway;
use common::models::{
    ChannelId, CycleStatus, GuildId, GuildRotationConfig, LeaderboardEntry, RoleId, RotationPhase,
    UserId,
};
use common::rotation::RotationExecutor;
use common::stores::{GuildConfigStore, LeaderboardStore};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const GUILD: GuildId = GuildId(10);
const ROLE: RoleId = RoleId(20);
const CHANNEL: ChannelId = ChannelId(30);
const WINNER: UserId = UserId(500);

struct FakeConfigStore {
    config: GuildRotationConfig,
}

impl FakeConfigStore {
    fn with_channel() -> Self {
        Self {
            config: GuildRotationConfig {
                guild_id: GUILD,
                enabled: true,
                title_role_id: Some(ROLE),
                schedule_expression: Some("0 0 12 * * *".to_string()),
                timezone: None,
                notify_channel_id: Some(CHANNEL),
                grant_message: Some("Hail {member}, the {role}!".to_string()),
            },
        }
    }
}

#[async_trait]
impl GuildConfigStore for FakeConfigStore {
    async fn rotation_config(&self, _guild_id: GuildId) -> Result<GuildRotationConfig, StoreError> {
        Ok(self.config.clone())
    }

    async fn enabled_guild_ids(&self) -> Result<Vec<GuildId>, StoreError> {
        Ok(vec![GUILD])
    }
}

struct FakeLeaderboard {
    entries: Vec<LeaderboardEntry>,
    clear_calls: AtomicUsize,
}

impl FakeLeaderboard {
    fn new(entries: Vec<LeaderboardEntry>) -> Self {
        Self {
            entries,
            clear_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LeaderboardStore for FakeLeaderboard {
    async fn top_entries(
        &self,
        _guild_id: GuildId,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, StoreError> {
        Ok(self.entries.iter().take(limit as usize).copied().collect())
    }

    async fn clear_points(&self, _guild_id: GuildId) -> Result<(), StoreError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeGateway {
    members: HashSet<UserId>,
    holders: Vec<UserId>,
    strip_failures: HashSet<UserId>,
    grant_fails: bool,
    removed: Mutex<Vec<UserId>>,
    added: Mutex<Vec<UserId>>,
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl MembershipGateway for FakeGateway {
    async fn role_exists(&self, _guild_id: GuildId, _role_id: RoleId) -> Result<bool, GatewayError> {
        Ok(true)
    }

    async fn is_member(&self, _guild_id: GuildId, user_id: UserId) -> Result<bool, GatewayError> {
        Ok(self.members.contains(&user_id))
    }

    async fn role_holders(
        &self,
        _guild_id: GuildId,
        _role_id: RoleId,
    ) -> Result<Vec<UserId>, GatewayError> {
        Ok(self.holders.clone())
    }

    async fn add_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        _role_id: RoleId,
    ) -> Result<(), GatewayError> {
        self.added.lock().unwrap().push(user_id);
        if self.grant_fails {
            Err(GatewayError::MissingPermissions("hierarchy".into()))
        } else {
            Ok(())
        }
    }

    async fn remove_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        _role_id: RoleId,
    ) -> Result<(), GatewayError> {
        self.removed.lock().unwrap().push(user_id);
        if self.strip_failures.contains(&user_id) {
            Err(GatewayError::MissingPermissions("hierarchy".into()))
        } else {
            Ok(())
        }
    }

    async fn send_message(&self, _channel_id: ChannelId, text: &str) -> Result<(), GatewayError> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

struct Scenario {
    leaderboard: Arc<FakeLeaderboard>,
    gateway: Arc<FakeGateway>,
    executor: RotationExecutor,
}

fn scenario(
    entries: Vec<LeaderboardEntry>,
    members: HashSet<UserId>,
    holders: Vec<UserId>,
    strip_failures: HashSet<UserId>,
    grant_fails: bool,
) -> Scenario {
    let leaderboard = Arc::new(FakeLeaderboard::new(entries));
    let gateway = Arc::new(FakeGateway {
        members,
        holders,
        strip_failures,
        grant_fails,
        removed: Mutex::new(Vec::new()),
        added: Mutex::new(Vec::new()),
        messages: Mutex::new(Vec::new()),
    });
    let executor = RotationExecutor::new(
        Arc::new(FakeConfigStore::with_channel()),
        Arc::clone(&leaderboard) as Arc<dyn LeaderboardStore>,
        Arc::clone(&gateway) as Arc<dyn MembershipGateway>,
    );
    Scenario {
        leaderboard,
        gateway,
        executor,
    }
}

/// *For any* combination of strip/grant failure injection, points are
/// cleared if and only if the grant succeeded, which requires every strip
/// to have succeeded first.
#[test]
fn property_points_cleared_iff_grant_succeeded() {
    proptest!(ProptestConfig::with_cases(64), |(
        fail_flags in prop::collection::vec(any::<bool>(), 0..6),
        grant_fails in any::<bool>(),
        winner_is_member in any::<bool>(),
        board_empty in any::<bool>(),
    )| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let holders: Vec<UserId> =
                (0..fail_flags.len()).map(|i| UserId(100 + i as i64)).collect();
            let strip_failures: HashSet<UserId> = holders
                .iter()
                .zip(&fail_flags)
                .filter(|(_, fails)| **fails)
                .map(|(holder, _)| *holder)
                .collect();
            let injected = strip_failures.len();

            let entries = if board_empty {
                vec![]
            } else {
                vec![LeaderboardEntry { user_id: WINNER, score: 50 }]
            };
            let members = if winner_is_member {
                HashSet::from([WINNER])
            } else {
                HashSet::new()
            };

            let s = scenario(entries, members, holders.clone(), strip_failures, grant_fails);
            let outcome = s.executor.run(GUILD, ROLE).await;

            let reached_grant = !board_empty && winner_is_member && injected == 0;
            let grant_succeeded = reached_grant && !grant_fails;
            let cleared = s.leaderboard.clear_calls.load(Ordering::SeqCst);

            // Clearing happens exactly on grant success, never otherwise.
            prop_assert_eq!(cleared, usize::from(grant_succeeded));

            if board_empty || !winner_is_member {
                // A cycle without a winner performs zero mutations.
                prop_assert!(s.gateway.removed.lock().unwrap().is_empty());
                prop_assert!(s.gateway.added.lock().unwrap().is_empty());
                prop_assert_eq!(outcome.status, CycleStatus::NoWinner);
            } else {
                // The strip fan-out always covers every holder.
                let removed = s.gateway.removed.lock().unwrap().clone();
                prop_assert_eq!(removed.len(), holders.len());

                // Every injected strip failure is recorded, and nothing else.
                let strip_recorded = outcome
                    .failures
                    .iter()
                    .filter(|f| f.phase == RotationPhase::Strip)
                    .count();
                prop_assert_eq!(strip_recorded, injected);

                if injected > 0 {
                    prop_assert_eq!(outcome.status, CycleStatus::StripFailed);
                    prop_assert!(s.gateway.added.lock().unwrap().is_empty());
                } else if grant_fails {
                    prop_assert_eq!(outcome.status, CycleStatus::GrantFailed);
                } else {
                    prop_assert_eq!(outcome.status, CycleStatus::Completed);
                }
            }

            // At most one message leaves the cycle: either the single
            // diagnostic notice or the single grant announcement.
            prop_assert!(s.gateway.messages.lock().unwrap().len() <= 1);
            Ok(())
        })?;
    });
}

/// *For any* number of failing holders, the diagnostic notice is sent once
/// while every failure is recorded individually.
#[test]
fn property_one_notice_many_recorded_failures() {
    proptest!(ProptestConfig::with_cases(32), |(failing in 1usize..5, passing in 0usize..5)| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let holders: Vec<UserId> =
                (0..failing + passing).map(|i| UserId(100 + i as i64)).collect();
            let strip_failures: HashSet<UserId> =
                holders.iter().take(failing).copied().collect();

            let s = scenario(
                vec![LeaderboardEntry { user_id: WINNER, score: 10 }],
                HashSet::from([WINNER]),
                holders,
                strip_failures,
                false,
            );
            let outcome = s.executor.run(GUILD, ROLE).await;

            prop_assert_eq!(outcome.status, CycleStatus::StripFailed);
            prop_assert_eq!(outcome.failures.len(), failing);
            prop_assert_eq!(outcome.stripped.len(), passing);
            prop_assert_eq!(s.gateway.messages.lock().unwrap().len(), 1);
            Ok(())
        })?;
    });
}

/// Re-running after a strip-phase abort retries the same still-holding
/// members and succeeds once the failure cause is gone.
#[tokio::test]
async fn test_cycle_is_rerunnable_after_strip_abort() {
    let holders = vec![UserId(1), UserId(2)];

    let first = scenario(
        vec![LeaderboardEntry {
            user_id: WINNER,
            score: 10,
        }],
        HashSet::from([WINNER]),
        holders.clone(),
        HashSet::from([UserId(2)]),
        false,
    );
    let outcome = first.executor.run(GUILD, ROLE).await;
    assert_eq!(outcome.status, CycleStatus::StripFailed);
    assert_eq!(first.leaderboard.clear_calls.load(Ordering::SeqCst), 0);

    // Same membership state, failure cause resolved.
    let second = scenario(
        vec![LeaderboardEntry {
            user_id: WINNER,
            score: 10,
        }],
        HashSet::from([WINNER]),
        holders,
        HashSet::new(),
        false,
    );
    let outcome = second.executor.run(GUILD, ROLE).await;
    assert_eq!(outcome.status, CycleStatus::Completed);
    assert_eq!(second.leaderboard.clear_calls.load(Ordering::SeqCst), 1);
}
