use std::sync::Arc;

use combat_core::{
    ActionId, Aspect, CaptureError, CastState, ChannelEndReason, CombatEvent, CooldownDef,
    JobDefinition, PartyBuff, PartyBuffWindows, PotencyModifier, PotencySource, RecurringKey,
    Requirement, ResourceDef, ResourceKey, ResourceOverride, SimConfig, SimContext, SimRng,
    SimState, Skill, SkillEffect, SkillProc, SkillRequest, UseOutcome, ValidationError,
};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn enochian() -> ResourceKey {
    ResourceKey::new("enochian")
}

fn firestarter() -> ResourceKey {
    ResourceKey::new("firestarter")
}

fn job() -> Arc<JobDefinition> {
    let job = JobDefinition::new("black_mage")
        .with_resource(ResourceDef::new(ResourceKey::MANA, 10_000.0).with_initial(10_000.0))
        .with_resource(
            ResourceDef::new(enochian(), 1.0)
                .with_max_timeout(30.0)
                .with_modifier(PotencyModifier::multiplier("enochian", 1.2)),
        )
        .with_resource(ResourceDef::new(firestarter(), 1.0).with_max_timeout(30.0))
        .with_resource(ResourceDef::new(ResourceKey::new("thundercloud"), 1.0).with_max_timeout(30.0))
        .with_resource(ResourceDef::new(ResourceKey::new("paradox_ready"), 1.0))
        .with_cooldown(CooldownDef::new(ResourceKey::new("manafont"), 100.0))
        .with_cooldown(CooldownDef::new(ResourceKey::new("sharpcast"), 30.0).with_stacks(2))
        .with_skill(
            Skill::spell("fire", 2.5, 180.0)
                .with_aspect(Aspect::Fire)
                .with_cost(ResourceKey::MANA, 400.0)
                .with_application_delay(0.5),
        )
        .with_skill(
            Skill::spell("fire_iii", 3.5, 280.0)
                .with_aspect(Aspect::Fire)
                .with_cost(ResourceKey::MANA, 2_000.0)
                .with_proc(SkillProc {
                    resource: firestarter(),
                    makes_instant: true,
                    makes_free: true,
                }),
        )
        .with_skill(
            Skill::spell("thunder", 0.0, 0.0)
                .with_aspect(Aspect::Lightning)
                .on_application(SkillEffect::Recurring {
                    key: RecurringKey::new("thunder"),
                    tick_potency: 50.0,
                    ticks: 10,
                    period: 3.0,
                })
                .on_application(SkillEffect::Proc {
                    resource: ResourceKey::new("thundercloud"),
                    chance: 0.1,
                    duration: Some(30.0),
                }),
        )
        .with_skill(
            Skill::spell("freeze", 0.0, 120.0)
                .with_aspect(Aspect::Ice)
                .with_aoe(Some(0.5)),
        )
        .with_skill(
            Skill::spell("paradox", 0.0, 500.0)
                .with_requirement(Requirement::Active {
                    resource: ResourceKey::new("paradox_ready"),
                })
                .on_capture(SkillEffect::Clear {
                    resource: ResourceKey::new("paradox_ready"),
                }),
        )
        .with_skill(Skill::spell("flamethrower", 0.0, 0.0).on_application(SkillEffect::Channel {
            tick_potency: 100.0,
            ticks: 3,
        }))
        .with_skill(
            Skill::ability("manafont", ResourceKey::new("manafont")).on_application(SkillEffect::Gain {
                resource: ResourceKey::MANA,
                amount: 3_000.0,
                duration: None,
            }),
        )
        .with_skill(
            Skill::ability("sharpcast", ResourceKey::new("sharpcast")).on_application(SkillEffect::Proc {
                resource: firestarter(),
                chance: 1.0,
                duration: Some(30.0),
            }),
        );
    Arc::new(job)
}

struct Harness {
    state: SimState,
    rng: SimRng,
    events: Vec<CombatEvent>,
    party: PartyBuffWindows,
}

impl Harness {
    fn new(config: SimConfig) -> Self {
        Self::with_party(config, PartyBuffWindows::new())
    }

    fn with_party(config: SimConfig, party: PartyBuffWindows) -> Self {
        let rng = SimRng::from_seed_str(&config.random_seed);
        Self {
            state: SimState::new(job(), config).expect("valid config"),
            rng,
            events: Vec::new(),
            party,
        }
    }

    fn request(&mut self, skill: &str) -> Result<UseOutcome, ValidationError> {
        self.request_targets(skill, 1)
    }

    fn request_targets(&mut self, skill: &str, targets: u32) -> Result<UseOutcome, ValidationError> {
        let mut ctx = SimContext::new(&mut self.rng, &mut self.events, &self.party);
        self.state
            .request_skill(&SkillRequest::new(skill).with_targets(targets), &mut ctx)
    }

    fn advance(&mut self, delta: f64) -> f64 {
        let mut ctx = SimContext::new(&mut self.rng, &mut self.events, &self.party);
        self.state.advance_by(delta, &mut ctx)
    }

    fn move_for(&mut self, duration: f64) {
        let mut ctx = SimContext::new(&mut self.rng, &mut self.events, &self.party);
        self.state.start_movement(duration, &mut ctx);
    }

    fn mana(&self) -> f64 {
        self.state.resource_amount(&ResourceKey::MANA)
    }

    fn resolved(&self, source: PotencySource) -> Vec<(ActionId, f64, f64)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                CombatEvent::PotencyResolved {
                    action,
                    source: s,
                    amount,
                    application_time,
                    ..
                } if *s == source => Some((*action, *amount, *application_time)),
                _ => None,
            })
            .collect()
    }
}

// ============================================================================
// Cast, capture and application
// ============================================================================

#[test]
fn cast_pays_at_capture_and_ignores_buff_gained_after_snapshot() {
    let mut h = Harness::new(SimConfig::new());

    let outcome = h.request("fire").unwrap();
    assert_eq!(outcome.state, CastState::CastPending);
    assert_eq!(outcome.cast_time, 2.5);
    assert_eq!(h.mana(), 10_000.0);

    h.advance(1.0);
    assert_eq!(h.mana(), 10_000.0);

    h.advance(1.0);
    let node = h.state.action(outcome.action).unwrap();
    assert_eq!(node.state, CastState::ApplicationPending);
    assert!(approx(node.capture_time.unwrap(), 2.0));
    assert_eq!(h.mana(), 9_600.0);
    assert!(approx(h.state.time_till_next_action(), 0.6));

    h.state.gain_resource(&enochian(), 1.0);
    h.advance(0.5);

    let resolved = h.resolved(PotencySource::Initial);
    assert_eq!(resolved.len(), 1);
    assert!(approx(resolved[0].1, 180.0));
    assert!(approx(resolved[0].2, 2.5));
    assert_eq!(h.state.action(outcome.action).unwrap().state, CastState::Applied);
}

#[test]
fn buff_expiring_after_capture_still_applies() {
    let mut h = Harness::new(SimConfig::new());
    h.state.gain_with_timeout(&enochian(), 1.0, 2.2);

    h.request("fire").unwrap();
    h.advance(2.5);

    assert!(!h.state.is_active(&enochian()));
    let resolved = h.resolved(PotencySource::Initial);
    assert!(approx(resolved[0].1, 216.0));
}

#[test]
fn party_buffs_are_read_at_snapshot() {
    let party = PartyBuffWindows::new().with_window(
        0.0,
        2.1,
        PartyBuff {
            name: "searing_light".into(),
            modifier: PotencyModifier::multiplier("searing_light", 1.05),
        },
    );
    let mut h = Harness::with_party(SimConfig::new(), party);
    h.request("fire").unwrap();
    h.advance(3.0);
    assert!(approx(h.resolved(PotencySource::Initial)[0].1, 189.0));
}

#[test]
fn buff_landing_on_the_capture_instant_is_not_snapshotted() {
    let mut h = Harness::new(SimConfig::new());
    h.state.schedule_resource_gain(2.0, &enochian(), 1.0, None);
    let outcome = h.request("fire").unwrap();

    h.advance(2.0);
    assert!(h.state.is_active(&enochian()));
    assert!(approx(h.state.action(outcome.action).unwrap().capture_time.unwrap(), 2.0));
    assert_eq!(h.mana(), 9_600.0);

    h.advance(0.5);
    let resolved = h.resolved(PotencySource::Initial);
    assert_eq!(resolved.len(), 1);
    assert!(approx(resolved[0].1, 180.0));
}

#[test]
fn party_window_opening_at_capture_is_not_snapshotted() {
    let party = PartyBuffWindows::new().with_window(
        2.0,
        20.0,
        PartyBuff {
            name: "divination".into(),
            modifier: PotencyModifier::multiplier("divination", 1.1),
        },
    );
    let mut h = Harness::with_party(SimConfig::new(), party);
    h.request("fire").unwrap();
    h.advance(2.5);
    assert!(approx(h.resolved(PotencySource::Initial)[0].1, 180.0));

    // A cast captured inside the window does get it.
    h.advance(0.1);
    h.request("fire").unwrap();
    h.advance(2.5);
    assert!(approx(h.resolved(PotencySource::Initial)[1].1, 198.0));
}

#[test]
fn unaffordable_capture_interrupts_without_cost() {
    let mut h = Harness::new(SimConfig::new());
    let outcome = h.request("fire").unwrap();

    // After the first server tick, drain most of the mana.
    h.advance(1.6);
    h.state.consume_resource(&ResourceKey::MANA, 9_900.0);
    h.advance(0.4);

    let node = h.state.action(outcome.action).unwrap();
    assert_eq!(node.state, CastState::Interrupted);
    assert!(matches!(
        node.failure,
        Some(CaptureError::InsufficientResource { required, .. }) if required == 400.0
    ));
    assert_eq!(h.mana(), 100.0);
    assert_eq!(h.state.time_till_next_action(), 0.0);
    assert!(h
        .events
        .iter()
        .any(|event| matches!(event, CombatEvent::ActionInterrupted { .. })));
    assert!(h.resolved(PotencySource::Initial).is_empty());
    assert!(h.state.diagnostics().is_empty());
}

#[test]
fn movement_interrupts_a_cast() {
    let mut h = Harness::new(SimConfig::new());
    let outcome = h.request("fire").unwrap();
    h.advance(1.0);
    h.move_for(1.0);
    h.advance(3.0);

    let node = h.state.action(outcome.action).unwrap();
    assert!(matches!(node.failure, Some(CaptureError::Interrupted { .. })));
    assert_eq!(h.mana(), 10_000.0);
    assert!(h.state.is_settled());
}

#[test]
fn interrupted_cast_gives_back_its_recast() {
    let mut h = Harness::new(SimConfig::new());
    let outcome = h.request("fire").unwrap();
    assert_eq!(h.state.cooldown(&ResourceKey::GCD).unwrap().stacks_available(), 0);

    h.advance(1.0);
    h.move_for(1.0);
    let node = h.state.action(outcome.action).unwrap();
    assert_eq!(node.state, CastState::Interrupted);
    let gcd = h.state.cooldown(&ResourceKey::GCD).unwrap();
    assert_eq!(gcd.stacks_available(), 1);
    assert!(gcd.is_full());
    assert_eq!(h.mana(), 10_000.0);

    // Without the refund the recast would still run until 2.5.
    h.advance(1.0);
    let retry = h.request("fire").unwrap();
    assert_eq!(retry.state, CastState::CastPending);
    assert!(h.state.diagnostics().is_empty());
}

#[test]
fn instant_aoe_applies_with_falloff() {
    let mut h = Harness::new(SimConfig::new());
    let outcome = h.request_targets("freeze", 3).unwrap();
    assert_eq!(outcome.cast_time, 0.0);
    assert_eq!(outcome.state, CastState::ApplicationPending);
    assert!(approx(outcome.pending_potency, 240.0));
    assert_eq!(outcome.applied_potency, 0.0);

    h.advance(0.0);
    assert!(approx(h.resolved(PotencySource::Initial)[0].1, 240.0));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn rejected_requests_do_not_mutate() {
    let config = SimConfig::new().with_override(ResourceOverride::new(ResourceKey::MANA, 300.0));
    let mut h = Harness::new(config);

    assert!(matches!(
        h.request("blizzard"),
        Err(ValidationError::UnknownSkill { .. })
    ));
    assert!(matches!(
        h.request_targets("freeze", 0),
        Err(ValidationError::NoTargets)
    ));
    assert!(matches!(
        h.request("fire"),
        Err(ValidationError::InsufficientResource { available, .. }) if available == 300.0
    ));
    assert!(matches!(
        h.request("paradox"),
        Err(ValidationError::RequirementsNotMet { .. })
    ));

    assert!(h.state.actions().is_empty());
    assert_eq!(h.mana(), 300.0);
    assert_eq!(h.state.cooldown(&ResourceKey::GCD).unwrap().stacks_available(), 1);
    assert!(h.events.is_empty());
}

#[test]
fn locks_gate_the_next_request() {
    let mut h = Harness::new(SimConfig::new());
    h.request("fire").unwrap();

    let err = h.request("manafont").unwrap_err();
    assert!(matches!(err, ValidationError::Locked { remaining } if approx(remaining, 2.6)));

    h.advance(2.6);
    assert!(h.request("manafont").is_ok());
}

#[test]
fn ability_cooldown_reports_remaining_time() {
    let mut h = Harness::new(SimConfig::new());
    h.request("manafont").unwrap();
    h.advance(0.6);

    let err = h.request("manafont").unwrap_err();
    assert!(matches!(err, ValidationError::OnCooldown { remaining, .. } if approx(remaining, 99.4)));
}

#[test]
fn gcd_recast_scales_with_spell_speed() {
    let mut h = Harness::new(SimConfig::new().with_speeds(1420, 420));
    h.request("freeze").unwrap();

    h.advance(2.37);
    assert!(matches!(
        h.request("freeze"),
        Err(ValidationError::OnCooldown { .. })
    ));
    h.advance(0.01);
    assert!(h.request("freeze").is_ok());
}

#[test]
fn availability_matches_request_validation() {
    let mut h = Harness::new(SimConfig::new());
    let job = job();
    let manafont = job.skill("manafont").unwrap();
    let paradox = job.skill("paradox").unwrap();

    assert!(manafont.is_available(&h.state));
    assert!(!paradox.is_available(&h.state));

    h.request("manafont").unwrap();
    h.advance(0.6);
    assert!(!manafont.is_available(&h.state));
    assert!(matches!(
        h.request("manafont"),
        Err(ValidationError::OnCooldown { .. })
    ));

    h.state.gain_resource(&ResourceKey::new("paradox_ready"), 1.0);
    assert!(paradox.is_available(&h.state));
}

#[test]
fn requirement_consumed_at_capture() {
    let mut h = Harness::new(SimConfig::new());
    h.state.gain_resource(&ResourceKey::new("paradox_ready"), 1.0);
    h.request("paradox").unwrap();
    assert!(!h.state.is_active(&ResourceKey::new("paradox_ready")));
}

// ============================================================================
// Procs
// ============================================================================

#[test]
fn instant_free_proc_skips_cast_and_cost() {
    let config = SimConfig::new()
        .with_override(ResourceOverride::new(firestarter(), 1.0).with_time_remaining(30.0));
    let mut h = Harness::new(config);

    let outcome = h.request("fire_iii").unwrap();
    assert_eq!(outcome.cast_time, 0.0);
    assert_eq!(h.mana(), 10_000.0);
    assert!(!h.state.is_active(&firestarter()));
    assert_eq!(h.state.action(outcome.action).unwrap().cost_paid, 0.0);
    assert!(h.state.diagnostics().is_empty());
}

#[test]
fn without_proc_the_cast_is_hard() {
    let mut h = Harness::new(SimConfig::new());
    let outcome = h.request("fire_iii").unwrap();
    assert_eq!(outcome.cast_time, 3.5);
    h.advance(3.0);
    assert_eq!(h.mana(), 8_000.0);
}

#[test]
fn disabled_rng_fires_only_certain_procs() {
    let mut h = Harness::new(SimConfig::new().with_rng_procs(false));
    h.request("sharpcast").unwrap();
    h.advance(0.6);
    h.request("thunder").unwrap();
    h.advance(0.0);

    assert!(h.state.is_active(&firestarter()));
    assert!(!h.state.is_active(&ResourceKey::new("thundercloud")));
    assert_eq!(h.rng.draws(), 0);
}

// ============================================================================
// Channels
// ============================================================================

fn channel_ends(h: &Harness) -> Vec<ChannelEndReason> {
    h.events
        .iter()
        .filter_map(|event| match event {
            CombatEvent::ChannelEnded { reason, .. } => Some(*reason),
            _ => None,
        })
        .collect()
}

#[test]
fn channel_ticks_every_second_and_completes() {
    let mut h = Harness::new(SimConfig::new());
    h.request("flamethrower").unwrap();
    h.advance(5.0);

    let ticks = h.resolved(PotencySource::ChannelTick);
    assert_eq!(ticks.len(), 3);
    assert!(approx(ticks[2].2, 3.0));
    assert_eq!(channel_ends(&h), vec![ChannelEndReason::Completed]);
    assert!(!h.state.is_channeling());
}

#[test]
fn new_skill_cancels_channel() {
    let mut h = Harness::new(SimConfig::new());
    h.request("flamethrower").unwrap();
    h.advance(1.5);
    h.request("manafont").unwrap();
    h.advance(5.0);

    assert_eq!(h.resolved(PotencySource::ChannelTick).len(), 1);
    assert_eq!(channel_ends(&h), vec![ChannelEndReason::NewSkill]);
}

#[test]
fn movement_cancels_channel() {
    let mut h = Harness::new(SimConfig::new());
    h.request("flamethrower").unwrap();
    h.advance(2.5);
    h.move_for(0.5);
    h.advance(5.0);

    assert_eq!(h.resolved(PotencySource::ChannelTick).len(), 2);
    assert_eq!(channel_ends(&h), vec![ChannelEndReason::Movement]);
}
