//! Integration tests for cross-store references.
//!
//! Tests cover:
//! - Denormalized reads and their caching
//! - Notification of denormalized subscribers when a referenced store changes
//! - Moving subscriptions when a reference is swapped
//! - References to elements that no longer exist
//! - Reference counting of dependency subscriptions
//! - Reads and subscriptions across reference cycles

#![forbid(unsafe_code)]

use std::cell::Cell;
use std::rc::Rc;

use refract::{
    Derive, GetOptions, State, SubscribeOptions, Subscription, Value, create_state, value,
};
use rstest::rstest;

fn count(state: &State, options: SubscribeOptions) -> (Rc<Cell<usize>>, Subscription) {
    let calls = Rc::new(Cell::new(0));
    let subscription = state.subscribe_with(
        {
            let calls = Rc::clone(&calls);
            move |_| calls.set(calls.get() + 1)
        },
        options,
    );
    (calls, subscription)
}

// =============================================================================
// Denormalized Reads
// =============================================================================

#[rstest]
fn test_denormalized_read_embeds_referenced_value() {
    let city = create_state(value!({ inhabitants: 1000 }));
    let person = create_state(value!({ name: "Ada", city: (city.clone()) }));

    assert_eq!(
        person.get(),
        value!({ name: "Ada", city: { inhabitants: 1000 } })
    );
    assert_eq!(
        person.get_with(GetOptions::normalized()).get("city"),
        Some(&Value::from(&city))
    );
}

#[rstest]
fn test_normalized_read_ignores_referenced_changes() {
    let city = create_state(value!({ inhabitants: 1000 }));
    let person = create_state(value!({ city: (city.clone()) }));
    let before = person.get_normalized();

    city.field("inhabitants").set(2000);

    assert!(person.get_normalized().same(&before));
    assert_eq!(
        person.get(),
        value!({ city: { inhabitants: 2000 } })
    );
}

#[rstest]
fn test_denormalized_read_is_cached() {
    let city = create_state(value!({ inhabitants: 1000 }));
    let person = create_state(value!({ city: (city.clone()), tags: ["a"] }));

    let first = person.get();
    assert!(person.get().same(&first));

    city.field("inhabitants").set(1001);
    let second = person.get();
    assert!(!second.same(&first));
    assert!(
        second
            .get("tags")
            .zip(first.get("tags"))
            .is_some_and(|(now, then)| now.same(then))
    );
}

#[rstest]
fn test_references_inside_arrays() {
    let ada = create_state(value!({ name: "Ada" }));
    let grace = create_state(value!({ name: "Grace" }));
    let team = create_state(value!({ members: [(ada.clone()), (grace.clone())] }));

    let names = team.field("members").map();

    assert_eq!(
        names.get(),
        value!([{ name: "Ada" }, { name: "Grace" }])
    );
}

#[rstest]
fn test_reference_chains_resolve_transitively() {
    let country = create_state(value!({ code: "FR" }));
    let city = create_state(value!({ name: "Lyon", country: (country.clone()) }));
    let person = create_state(value!({ city: (city.clone()) }));

    assert_eq!(
        person.field("city").get(),
        value!({ name: "Lyon", country: { code: "FR" } })
    );
}

#[rstest]
fn test_missing_referenced_element_resolves_to_undefined() {
    let people = create_state(value!([{ name: "Ada" }, { name: "Bob" }]));
    let team = create_state(value!({ lead: (people.index(1)) }));

    assert_eq!(team.get(), value!({ lead: { name: "Bob" } }));

    people.set(value!([{ name: "Ada" }]));

    assert_eq!(team.get(), value!({ lead: undefined }));
}

#[rstest]
fn test_reference_cycle_terminates() {
    let left = create_state(value!({ label: "left" }));
    let right = create_state(value!({ label: "right", peer: (left.clone()) }));
    left.field("peer").set(right.clone());

    let resolved = left.get();
    let peer = resolved.get("peer").expect("peer was written");

    assert_eq!(peer.get("label"), Some(&value!("right")));
    assert_eq!(
        peer.get("peer").and_then(|inner| inner.get("label")),
        Some(&value!("left"))
    );
}

// =============================================================================
// Denormalized Subscriptions
// =============================================================================

#[rstest]
fn test_referenced_change_notifies_once() {
    let city = create_state(value!({ inhabitants: 1000 }));
    let person = create_state(value!({ city: (city.clone()) }));
    let (denormalized, _first) = count(&person, SubscribeOptions::denormalized());
    let (normalized, _second) = count(&person, SubscribeOptions::normalized());

    city.field("inhabitants").set(1001);

    assert_eq!(denormalized.get(), 1);
    assert_eq!(normalized.get(), 0);
}

#[rstest]
fn test_unrelated_referenced_change_is_silent() {
    let city = create_state(value!({ inhabitants: 1000, mayor: "X" }));
    let person = create_state(value!({ city: (city.field("inhabitants")) }));
    let (calls, _subscription) = count(&person, SubscribeOptions::denormalized());

    city.field("mayor").set("Y");

    assert_eq!(calls.get(), 0);
}

#[rstest]
fn test_transitive_change_notifies_once() {
    let country = create_state(value!({ code: "FR" }));
    let city = create_state(value!({ country: (country.clone()) }));
    let person = create_state(value!({ city: (city.clone()) }));
    let (calls, _subscription) = count(&person, SubscribeOptions::denormalized());

    assert_eq!(city.listener_count(), 1);
    assert_eq!(country.listener_count(), 1);

    country.field("code").set("DE");

    assert_eq!(calls.get(), 1);
    assert_eq!(
        person.get(),
        value!({ city: { country: { code: "DE" } } })
    );
}

#[rstest]
fn test_swapped_reference_moves_subscription() {
    let lyon = create_state(value!({ name: "Lyon" }));
    let paris = create_state(value!({ name: "Paris" }));
    let person = create_state(value!({ city: (lyon.clone()) }));
    let (calls, _subscription) = count(&person, SubscribeOptions::denormalized());
    assert_eq!(lyon.listener_count(), 1);

    person.field("city").set(paris.clone());
    assert_eq!(calls.get(), 1);
    assert_eq!(lyon.listener_count(), 0);
    assert_eq!(paris.listener_count(), 1);

    lyon.field("name").set("Lugdunum");
    assert_eq!(calls.get(), 1);

    paris.field("name").set("Lutetia");
    assert_eq!(calls.get(), 2);
    assert_eq!(person.get(), value!({ city: { name: "Lutetia" } }));
}

#[rstest]
fn test_removed_referenced_element_notifies() {
    let people = create_state(value!([{ name: "Ada" }, { name: "Bob" }]));
    let team = create_state(value!({ lead: (people.index(1)) }));
    let (calls, _subscription) = count(&team, SubscribeOptions::denormalized());

    people.set(value!([{ name: "Ada" }]));

    assert_eq!(calls.get(), 1);
    assert_eq!(team.get(), value!({ lead: undefined }));
}

#[rstest]
fn test_last_unsubscribe_releases_dependencies() {
    let city = create_state(value!({ inhabitants: 1000 }));
    let person = create_state(value!({ city: (city.clone()) }));

    let (_, first) = count(&person, SubscribeOptions::denormalized());
    let (_, second) = count(&person, SubscribeOptions::denormalized());
    assert_eq!(city.listener_count(), 1);
    assert_eq!(person.listener_count(), 1);

    first.unsubscribe();
    assert_eq!(city.listener_count(), 1);

    second.unsubscribe();
    second.unsubscribe();
    assert_eq!(city.listener_count(), 0);
    assert_eq!(person.listener_count(), 0);
}

#[rstest]
fn test_resubscribe_after_release() {
    let city = create_state(value!({ inhabitants: 1000 }));
    let person = create_state(value!({ city: (city.clone()) }));

    let (_, first) = count(&person, SubscribeOptions::denormalized());
    first.unsubscribe();

    let (calls, _second) = count(&person, SubscribeOptions::denormalized());
    city.field("inhabitants").set(1);

    assert_eq!(calls.get(), 1);
}

// =============================================================================
// Reference Cycles
// =============================================================================

fn pair() -> (State, State) {
    let left = create_state(value!({ label: "left" }));
    let right = create_state(value!({ label: "right", peer: (left.clone()) }));
    left.field("peer").set(right.clone());
    (left, right)
}

fn peer_label(state: &State) -> Option<Value> {
    state
        .get()
        .get("peer")
        .and_then(|peer| peer.get("label"))
        .cloned()
}

#[rstest]
fn test_reference_cycle_reads_are_stable() {
    let (left, right) = pair();

    let left_first = left.get();
    let right_first = right.get();
    let left_second = left.get();
    let right_second = right.get();

    assert!(left_first.same(&left_second));
    assert!(right_first.same(&right_second));
}

#[rstest]
fn test_reference_cycle_subscription() {
    let (left, right) = pair();
    let (calls, subscription) = count(&left, SubscribeOptions::denormalized());
    assert_eq!(left.listener_count(), 1);
    assert_eq!(right.listener_count(), 1);

    right.field("label").set("RIGHT");
    assert_eq!(calls.get(), 1);
    assert_eq!(peer_label(&left), Some(value!("RIGHT")));

    left.field("label").set("LEFT");
    assert_eq!(calls.get(), 2);
    assert_eq!(left.get().get("label"), Some(&value!("LEFT")));

    let before = left.get();
    let _peer = right.get();
    assert!(left.get().same(&before));

    subscription.unsubscribe();
    assert_eq!(left.listener_count(), 0);
    assert_eq!(right.listener_count(), 0);
}

#[rstest]
fn test_both_ends_of_a_cycle_subscribed() {
    let (left, right) = pair();
    let (left_calls, left_subscription) = count(&left, SubscribeOptions::denormalized());
    let (right_calls, right_subscription) = count(&right, SubscribeOptions::denormalized());
    assert_eq!(left.listener_count(), 2);
    assert_eq!(right.listener_count(), 2);

    right.field("label").set("RIGHT");

    assert_eq!(left_calls.get(), 1);
    assert_eq!(right_calls.get(), 1);
    assert_eq!(peer_label(&left), Some(value!("RIGHT")));
    assert_eq!(right.get().get("label"), Some(&value!("RIGHT")));

    left_subscription.unsubscribe();
    right_subscription.unsubscribe();
    assert_eq!(left.listener_count(), 0);
    assert_eq!(right.listener_count(), 0);
}

#[rstest]
fn test_write_inside_cycle_listener_settles() {
    let (left, right) = pair();
    let label = right.field("label");
    let seen = Rc::new(Cell::new(0));
    let _subscription = left.subscribe_with(
        {
            let seen = Rc::clone(&seen);
            move |_| {
                seen.set(seen.get() + 1);
                if label.get() != value!("settled") {
                    label.set("settled");
                }
            }
        },
        SubscribeOptions::denormalized(),
    );

    right.field("label").set("moved");

    assert_eq!(seen.get(), 2);
    assert_eq!(peer_label(&left), Some(value!("settled")));
}
