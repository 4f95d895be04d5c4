use std::collections::HashSet;

use reelgate::{
    HandleId,
    scheduler::admission::{AdmissionController, Command, HandleState},
};

fn ids(count: u64) -> Vec<HandleId> {
    (0..count).map(HandleId::from_raw).collect()
}

#[test]
fn fifo_promotion_reuses_freed_slot() {
    let handles = ids(4);
    let (a, b, c, d) = (handles[0], handles[1], handles[2], handles[3]);
    let mut controller = AdmissionController::new(2);

    assert_eq!(controller.on_entered(a), vec![Command::Admit(a)]);
    assert_eq!(controller.on_entered(b), vec![Command::Admit(b)]);
    assert_eq!(controller.on_entered(c), vec![Command::Enqueue(c)]);
    assert_eq!(controller.on_entered(d), vec![Command::Enqueue(d)]);
    assert_eq!(controller.active(), &[a, b]);
    assert_eq!(controller.waiting().collect::<Vec<_>>(), vec![c, d]);

    let commands = controller.on_exited(a);
    assert_eq!(commands, vec![Command::Evict(a), Command::Promote(c)]);
    assert_eq!(controller.active(), &[b, c]);
    assert_eq!(controller.waiting().collect::<Vec<_>>(), vec![d]);
    assert_eq!(controller.state(a), HandleState::Invisible);
    assert_eq!(controller.state(c), HandleState::VisibleActive);
    assert_eq!(controller.state(d), HandleState::VisibleWaiting);
}

#[test]
fn repeated_exit_evicts_once() {
    let a = HandleId::from_raw(7);
    let mut controller = AdmissionController::new(1);
    controller.on_entered(a);

    assert_eq!(controller.on_exited(a), vec![Command::Evict(a)]);
    assert!(controller.on_exited(a).is_empty());
    assert!(controller.active().is_empty());
}

#[test]
fn repeated_entry_is_ignored() {
    let handles = ids(2);
    let mut controller = AdmissionController::new(1);
    controller.on_entered(handles[0]);
    controller.on_entered(handles[1]);

    assert!(controller.on_entered(handles[0]).is_empty());
    assert!(controller.on_entered(handles[1]).is_empty());
    assert_eq!(controller.active(), &[handles[0]]);
    assert_eq!(controller.waiting().len(), 1);
}

#[test]
fn queued_exit_dequeues_without_pause() {
    let handles = ids(3);
    let mut controller = AdmissionController::new(1);
    for handle in &handles {
        controller.on_entered(*handle);
    }

    assert_eq!(
        controller.on_exited(handles[1]),
        vec![Command::Dequeue(handles[1])]
    );
    assert_eq!(controller.waiting().collect::<Vec<_>>(), vec![handles[2]]);
    assert_eq!(controller.active(), &[handles[0]]);
}

#[test]
fn reentry_follows_admission_rule() {
    let handles = ids(3);
    let (a, b, c) = (handles[0], handles[1], handles[2]);
    let mut controller = AdmissionController::new(2);
    controller.on_entered(a);
    controller.on_entered(b);
    controller.on_exited(a);
    controller.on_entered(c);

    // Slots are full again, so the returning handle has to queue.
    assert_eq!(controller.on_entered(a), vec![Command::Enqueue(a)]);
    assert_eq!(controller.active(), &[b, c]);

    controller.on_exited(b);
    assert_eq!(controller.active(), &[c, a]);
}

#[test]
fn forget_active_promotes_queue_head() {
    let handles = ids(3);
    let mut controller = AdmissionController::new(1);
    for handle in &handles {
        controller.on_entered(*handle);
    }

    let commands = controller.forget(handles[0]);
    assert_eq!(
        commands,
        vec![Command::Evict(handles[0]), Command::Promote(handles[1])]
    );
    assert_eq!(controller.state(handles[0]), HandleState::Unseen);
    assert_eq!(controller.active(), &[handles[1]]);
}

#[test]
fn clear_returns_active_handles() {
    let handles = ids(4);
    let mut controller = AdmissionController::new(2);
    for handle in &handles {
        controller.on_entered(*handle);
    }

    assert_eq!(controller.clear(), vec![handles[0], handles[1]]);
    assert!(controller.active().is_empty());
    assert_eq!(controller.waiting().len(), 0);
    assert_eq!(controller.state(handles[3]), HandleState::Unseen);
}

#[test]
fn invariants_hold_under_event_churn() {
    let handles = ids(12);
    let capacity = 3;
    let mut controller = AdmissionController::new(capacity);
    let mut visible = HashSet::new();
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;

    for _ in 0..2_000 {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let handle = handles[(seed % handles.len() as u64) as usize];
        if (seed >> 32) % 2 == 0 {
            controller.on_entered(handle);
            visible.insert(handle);
        } else {
            controller.on_exited(handle);
            visible.remove(&handle);
        }

        assert!(controller.invariants_hold());
        assert!(controller.active().len() <= capacity);
        for member in controller.active().iter().copied().chain(controller.waiting()) {
            assert!(visible.contains(&member), "{member} tracked while hidden");
        }
        // Whenever enough handles are visible every slot is in use.
        assert_eq!(controller.active().len(), visible.len().min(capacity));
    }
}
