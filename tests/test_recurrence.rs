//! Recurrence: bounded budgets, unbounded cycles, cadence under late
//! settlement, and the repeat-until cutoff.

mod common;

use eventide::clock::{SettleContext, StepClock, WorldTime};
use eventide::event::{LifecycleState, Repeat, Schedule, TimedEvent};

use common::{ProbeHooks, make_event};

#[tokio::test]
async fn bounded_recurrence_runs_its_lives_and_stays_down() {
    let event = TimedEvent::new(
        make_event("harvest")
            .duration(10)
            .repeat(Repeat::Count(2))
            .build()
            .unwrap(),
    );
    let clock = StepClock::new(WorldTime::ZERO);
    let ctx = SettleContext::new(&clock);

    event.settle(&ctx).await.unwrap();
    assert_eq!(event.state(), LifecycleState::Activated);

    // First life ends at t=10; the record re-arms on the spot and the
    // second life activates in the same call.
    clock.set(WorldTime::from_secs(10));
    event.settle(&ctx).await.unwrap();
    let snapshot = event.snapshot();
    assert_eq!(snapshot.state, LifecycleState::Activated);
    assert_eq!(snapshot.armed_at, Some(WorldTime::from_secs(10)));
    assert_eq!(snapshot.expiration.at, Schedule::At(WorldTime::from_secs(20)));
    assert_eq!(snapshot.expiration.repeat, Repeat::Count(1));

    // Second life ends at t=20 and the budget is spent.
    clock.set(WorldTime::from_secs(20));
    event.settle(&ctx).await.unwrap();
    let snapshot = event.snapshot();
    assert_eq!(snapshot.state, LifecycleState::Expired);
    assert_eq!(snapshot.expiration.repeat, Repeat::Count(0));

    clock.set(WorldTime::from_secs(500));
    event.settle(&ctx).await.unwrap();
    assert_eq!(event.state(), LifecycleState::Expired);
}

#[tokio::test]
async fn late_settlement_replays_missed_cycles_on_cadence() {
    let event = TimedEvent::new(
        make_event("tide")
            .duration(10)
            .repeat(Repeat::Unbounded)
            .build()
            .unwrap(),
    );
    let clock = StepClock::new(WorldTime::ZERO);
    let ctx = SettleContext::new(&clock);

    event.settle(&ctx).await.unwrap();
    assert_eq!(event.state(), LifecycleState::Activated);

    // Nobody settles between t=0 and t=47. Cycles end at 10, 20, 30, 40;
    // one call replays all of them and leaves the current life running
    // with its boundary at t=50, anchored on the cadence rather than on
    // the settlement instant.
    clock.set(WorldTime::from_secs(47));
    event.settle(&ctx).await.unwrap();
    let snapshot = event.snapshot();
    assert_eq!(snapshot.state, LifecycleState::Activated);
    assert_eq!(snapshot.armed_at, Some(WorldTime::from_secs(40)));
    assert_eq!(snapshot.expiration.at, Schedule::At(WorldTime::from_secs(50)));
}

#[tokio::test]
async fn recurrence_reruns_hooks_every_life() {
    let (hooks, probe) = ProbeHooks::new();
    let event = TimedEvent::with_hooks(
        make_event("chime")
            .duration(10)
            .repeat(Repeat::Count(2))
            .build()
            .unwrap(),
        Box::new(hooks),
    );
    let clock = StepClock::new(WorldTime::ZERO);
    let ctx = SettleContext::new(&clock);

    event.settle(&ctx).await.unwrap();
    probe.clear();

    clock.set(WorldTime::from_secs(10));
    event.settle(&ctx).await.unwrap();
    assert_eq!(
        probe.entries(),
        vec![
            "pre_expire@10",
            "on_expire@10",
            "pre_initiate@10",
            "on_initiate@10",
            "pre_activate@10",
            "on_activate@10",
        ]
    );
}

#[tokio::test]
async fn cutoff_stops_an_unbounded_record() {
    let event = TimedEvent::new(
        make_event("patrol")
            .duration(10)
            .repeat(Repeat::Unbounded)
            .repeat_until(WorldTime::from_secs(25))
            .build()
            .unwrap(),
    );
    let clock = StepClock::new(WorldTime::ZERO);
    let ctx = SettleContext::new(&clock);

    // Lives end at 10, 20, 30. The expirations at 10 and 20 precede the
    // cutoff, so both re-arm; the one at 30 does not.
    for at in [0, 10, 20] {
        clock.set(WorldTime::from_secs(at));
        event.settle(&ctx).await.unwrap();
        assert_eq!(event.state(), LifecycleState::Activated, "at t={at}");
    }

    clock.set(WorldTime::from_secs(30));
    event.settle(&ctx).await.unwrap();
    assert_eq!(event.state(), LifecycleState::Expired);

    clock.set(WorldTime::from_secs(100));
    event.settle(&ctx).await.unwrap();
    assert_eq!(event.state(), LifecycleState::Expired);
}

#[tokio::test]
async fn cutoff_beats_a_remaining_budget() {
    let event = TimedEvent::new(
        make_event("parley")
            .duration(10)
            .repeat(Repeat::Count(99))
            .repeat_until(WorldTime::from_secs(5))
            .build()
            .unwrap(),
    );
    let clock = StepClock::new(WorldTime::ZERO);
    let ctx = SettleContext::new(&clock);

    event.settle(&ctx).await.unwrap();
    clock.set(WorldTime::from_secs(10));
    event.settle(&ctx).await.unwrap();

    let snapshot = event.snapshot();
    assert_eq!(snapshot.state, LifecycleState::Expired);
    // The unspent budget is preserved for inspection.
    assert_eq!(snapshot.expiration.repeat, Repeat::Count(99));
}

#[tokio::test]
async fn cutoff_alone_implies_unbounded_recurrence() {
    let event = TimedEvent::new(
        make_event("vigil")
            .duration(10)
            .repeat_until(WorldTime::from_secs(35))
            .build()
            .unwrap(),
    );
    let clock = StepClock::new(WorldTime::ZERO);
    let ctx = SettleContext::new(&clock);

    event.settle(&ctx).await.unwrap();

    // Recurs at 10, 20, 30; the expiration at t=40 is past the cutoff.
    clock.set(WorldTime::from_secs(30));
    event.settle(&ctx).await.unwrap();
    assert_eq!(event.state(), LifecycleState::Activated);

    clock.set(WorldTime::from_secs(40));
    event.settle(&ctx).await.unwrap();
    assert_eq!(event.state(), LifecycleState::Expired);
}
