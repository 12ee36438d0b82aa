//! Property-based tests for `barely-engine` primitives: `SampleData`
//! selection and `Performer`/task interval invariants.

use barely_engine::{AudioRng, Performer, SampleData, SampleDataSlice, TaskState};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

fn drive_single_task(position: f64, duration: f64, steps: &[f64]) -> Vec<TaskState> {
    let mut performer = Performer::new();
    let states = Rc::new(RefCell::new(Vec::new()));
    let states_clone = states.clone();
    performer.create_task(position, duration, Box::new(move |state| states_clone.borrow_mut().push(state)));
    performer.start();
    for &step in steps {
        performer.update(step);
        performer.process_all_tasks_at_position();
    }
    Rc::try_unwrap(states).unwrap().into_inner()
}

/// A sequence of task states is well-formed if it never has two `Begin`s
/// (or two `End`s) without the other kind between them, never an `Update`
/// or `End` before the first `Begin`, and never anything after an `End`.
fn assert_well_formed(states: &[TaskState]) {
    let mut seen_begin = false;
    let mut seen_end = false;
    for &state in states {
        assert!(!seen_end, "state observed after End: {states:?}");
        match state {
            TaskState::Begin => {
                assert!(!seen_begin, "duplicate Begin with no End between: {states:?}");
                seen_begin = true;
            }
            TaskState::Update => {
                assert!(seen_begin, "Update observed before Begin: {states:?}");
            }
            TaskState::End => {
                assert!(seen_begin, "End observed before Begin: {states:?}");
                seen_end = true;
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Driving a single non-looping task through many small, arbitrary
    /// steps always yields a well-formed Begin/Update*/End sequence,
    /// regardless of how the total distance is chopped up.
    #[test]
    fn single_task_lifecycle_is_well_formed(
        position in 0.1f64..20.0,
        duration in 0.1f64..5.0,
        step_count in 5usize..40,
        seed in 1u64..1000,
    ) {
        // Deterministic pseudo-random step sizes derived from `seed`, small
        // enough that the task's interval is crossed over many calls.
        let total = position + duration + 1.0;
        let mut rng = AudioRng::new(seed);
        let mut steps = Vec::with_capacity(step_count);
        for _ in 0..step_count {
            let raw = rng.generate_range(1, 1000) as f64 / 1000.0;
            steps.push((raw * total / step_count as f64).max(1e-6));
        }

        let states = drive_single_task(position, duration, &steps);
        assert_well_formed(&states);
    }

    /// A task whose interval the steps never reach produces no states at
    /// all.
    #[test]
    fn task_never_reached_fires_nothing(
        position in 50.0f64..100.0,
        duration in 0.1f64..5.0,
    ) {
        let states = drive_single_task(position, duration, &[0.1, 0.1, 0.1]);
        prop_assert!(states.is_empty());
    }

    /// `SampleData::select` always returns a slice whose root pitch is
    /// among the inputs' nearest group to the query pitch: no other root
    /// pitch in the collection is strictly closer to `pitch`.
    #[test]
    fn select_always_returns_a_nearest_root_pitch(
        root_pitches in prop::collection::vec(-10.0f64..10.0, 1..=12),
        pitch in -10.0f64..10.0,
        seed in 1u64..1000,
    ) {
        let data = SampleData::new(
            root_pitches.iter().map(|&p| SampleDataSlice::new(p, 48_000, vec![0.0])).collect(),
        );
        let mut rng = AudioRng::new(seed);
        let picked = data.select(pitch, &mut rng).unwrap();
        let picked_distance = (picked.root_pitch() - pitch).abs();
        let closest_distance =
            root_pitches.iter().map(|&p| (p - pitch).abs()).fold(f64::INFINITY, f64::min);
        prop_assert!(
            (picked_distance - closest_distance).abs() < 1e-9,
            "picked {picked_distance} away, but {closest_distance} was available"
        );
    }

    /// An empty collection always selects nothing, for any pitch or seed.
    #[test]
    fn select_on_empty_data_is_always_none(pitch in -10.0f64..10.0, seed in 1u64..1000) {
        let data = SampleData::new(vec![]);
        let mut rng = AudioRng::new(seed);
        prop_assert!(data.select(pitch, &mut rng).is_none());
    }
}
