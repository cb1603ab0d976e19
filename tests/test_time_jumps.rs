//! Clock discontinuities: large forward jumps settle everything that came
//! due, backward corrections hold state instead of regressing it.

mod common;

use eventide::clock::{SettleContext, StepClock, WorldTime};
use eventide::event::{LifecycleState, Schedule, TimedEvent};

use common::{ProbeHooks, make_event};

#[tokio::test]
async fn forward_jump_settles_the_whole_lifecycle_in_one_call() {
    let (hooks, probe) = ProbeHooks::new();
    let event = TimedEvent::with_hooks(
        make_event("ancient").duration(10).build().unwrap(),
        Box::new(hooks),
    );
    let frozen = WorldTime::from_secs(1000);
    let ctx = SettleContext::new(&frozen);

    event.settle(&ctx).await.unwrap();

    let snapshot = event.snapshot();
    assert_eq!(snapshot.state, LifecycleState::Expired);
    assert_eq!(snapshot.expiration.at, Schedule::At(WorldTime::from_secs(10)));
    // Every transition ran, in order, in the single call.
    assert_eq!(
        probe.entries(),
        vec![
            "pre_initiate@1000",
            "on_initiate@1000",
            "pre_activate@1000",
            "on_activate@1000",
            "pre_expire@1000",
            "on_expire@1000",
        ]
    );
}

#[tokio::test]
async fn backward_correction_holds_state() {
    let event = TimedEvent::new(
        make_event("eclipse")
            .activation_delay(10)
            .duration(30)
            .build()
            .unwrap(),
    );
    let clock = StepClock::new(WorldTime::from_secs(12));
    let ctx = SettleContext::new(&clock);

    event.settle(&ctx).await.unwrap();
    let reached = event.snapshot();
    assert_eq!(reached.state, LifecycleState::Activated);

    // The world clock is corrected back before the activation instant.
    // Nothing regresses and nothing is restamped.
    clock.set(WorldTime::from_secs(3));
    event.settle(&ctx).await.unwrap();
    assert_eq!(event.snapshot(), reached);

    // Once time passes the stamped boundary again, expiration fires on
    // the original schedule.
    clock.set(WorldTime::from_secs(40));
    event.settle(&ctx).await.unwrap();
    let snapshot = event.snapshot();
    assert_eq!(snapshot.state, LifecycleState::Expired);
    assert_eq!(snapshot.expiration.at, Schedule::At(WorldTime::from_secs(40)));
}

#[tokio::test]
async fn backward_correction_does_not_restamp_lazy_boundaries() {
    // No armed reference: the first settlement arms the record at t=6.
    let event = TimedEvent::new(
        eventide::event::EventRecord::builder("comet")
            .owner("test:rig")
            .initiation_delay(5)
            .activation_delay(5)
            .build()
            .unwrap(),
    );
    let clock = StepClock::new(WorldTime::from_secs(6));
    let ctx = SettleContext::new(&clock);

    event.settle(&ctx).await.unwrap();
    let snapshot = event.snapshot();
    assert_eq!(snapshot.armed_at, Some(WorldTime::from_secs(6)));
    assert_eq!(snapshot.initiation.at, Schedule::At(WorldTime::from_secs(11)));

    clock.set(WorldTime::ZERO);
    event.settle(&ctx).await.unwrap();
    // Still armed at 6, still due at 11.
    let snapshot = event.snapshot();
    assert_eq!(snapshot.armed_at, Some(WorldTime::from_secs(6)));
    assert_eq!(snapshot.initiation.at, Schedule::At(WorldTime::from_secs(11)));
    assert_eq!(snapshot.state, LifecycleState::Created);

    clock.set(WorldTime::from_secs(11));
    event.settle(&ctx).await.unwrap();
    assert_eq!(event.state(), LifecycleState::Initiated);
}

#[tokio::test]
async fn repeated_settlement_at_one_instant_is_stable() {
    let event = TimedEvent::new(
        make_event("steady")
            .activation_delay(3)
            .duration(4)
            .build()
            .unwrap(),
    );
    let frozen = WorldTime::from_secs(3);
    let ctx = SettleContext::new(&frozen);

    event.settle(&ctx).await.unwrap();
    let first = event.snapshot();

    for _ in 0..3 {
        event.settle(&ctx).await.unwrap();
        assert_eq!(event.snapshot(), first);
    }
}
