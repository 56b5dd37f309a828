use crate::action::ActionId;
use crate::combat::Potency;
use crate::engine::{EventId, EventKind};
use crate::env::{CombatEvent, PotencySource, SimContext};
use crate::state::SimState;

use super::CHANNEL_PERIOD;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ChannelEndReason {
    Completed,
    Movement,
    Interrupted,
    NewSkill,
}

/// Channeled skill ticking every [`CHANNEL_PERIOD`] seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelState {
    pub instance: u64,
    pub action: ActionId,
    pub skill: String,
    pub total_ticks: u32,
    pub ticks_fired: u32,
    template: Potency,
    next_tick: Option<EventId>,
}

impl SimState {
    pub(crate) fn start_channel(
        &mut self,
        action: ActionId,
        skill: String,
        template: Potency,
        total_ticks: u32,
        ctx: &mut SimContext<'_>,
    ) {
        self.cancel_channel(ChannelEndReason::NewSkill, ctx);
        if total_ticks == 0 {
            return;
        }
        let instance = self.recurring.allocate_instance();
        let next_tick = self
            .scheduler
            .schedule(CHANNEL_PERIOD, EventKind::ChannelTick { instance });
        tracing::debug!(%action, skill = %skill, time = self.now(), total_ticks, "channel started");
        self.channel = Some(ChannelState {
            instance,
            action,
            skill,
            total_ticks,
            ticks_fired: 0,
            template,
            next_tick: Some(next_tick),
        });
    }

    /// Stops the active channel. Returns false when nothing was channeling.
    pub fn cancel_channel(&mut self, reason: ChannelEndReason, ctx: &mut SimContext<'_>) -> bool {
        let Some(channel) = self.channel.take() else {
            return false;
        };
        if let Some(tick) = channel.next_tick {
            self.scheduler.cancel(tick);
        }
        let now = self.now();
        tracing::debug!(skill = %channel.skill, time = now, %reason, ticks = channel.ticks_fired, "channel ended");
        ctx.emit(CombatEvent::ChannelEnded {
            skill: channel.skill,
            time: now,
            reason,
        });
        true
    }

    pub fn is_channeling(&self) -> bool {
        self.channel.is_some()
    }

    pub(crate) fn on_channel_tick(&mut self, instance: u64, ctx: &mut SimContext<'_>) {
        let now = self.now();
        let stats = self.stats;
        let Some(channel) = self.channel.as_mut() else {
            return;
        };
        if channel.instance != instance {
            return;
        }

        channel.ticks_fired += 1;
        channel.next_tick = None;
        let mut tick = channel.template.tick_copy();
        let action = channel.action;
        let finished = channel.ticks_fired >= channel.total_ticks;
        if !finished {
            channel.next_tick = Some(
                self.scheduler
                    .schedule(CHANNEL_PERIOD, EventKind::ChannelTick { instance }),
            );
        }

        match tick.resolve(now, &stats) {
            Ok(amount) => {
                ctx.emit(CombatEvent::PotencyResolved {
                    action,
                    skill: tick.source_skill.clone(),
                    aspect: tick.aspect,
                    source: PotencySource::ChannelTick,
                    amount,
                    snapshot_time: tick.snapshot_time().unwrap_or(now),
                    application_time: now,
                });
                if let Some(node) = self.actions.get_mut(action.0 as usize) {
                    node.potencies.push(tick);
                }
            }
            Err(violation) => self.report(violation),
        }

        if finished {
            self.cancel_channel(ChannelEndReason::Completed, ctx);
        }
    }
}
