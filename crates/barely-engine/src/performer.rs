//! Musical-time scheduling: a [`Performer`] advances a beat position and
//! fires callbacks for a beat grid and a set of scheduled [`Task`] intervals.
//!
//! Grounded on `examples/original_source/src/internal/performer_impl.cpp`
//! and its header `examples/original_source/src/private/performer.h`: two
//! ordered sets of tasks (inactive by position, active by end position)
//! give `O(log n)` activation/deactivation and next-event queries. The
//! original keys both sets on a raw task pointer as the tiebreaker (pointers
//! sort however the allocator happens to place them); here the tiebreaker
//! is a [`TaskId`] from `slotmap`, which is just as arbitrary but doesn't
//! require unsafe pointer comparisons.

use slotmap::{SlotMap, new_key_type};
use std::collections::BTreeSet;
use std::ops::Bound::Unbounded;

new_key_type! {
    /// Handle to a task owned by a [`Performer`].
    pub struct TaskId;
}

/// Lifecycle state passed to a task's callback as the performer's position
/// enters, moves within, and leaves its interval. Ordinal order matches the
/// engine's public enum contract and must not be reordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Position entered the task's interval.
    Begin = 0,
    /// Position moved while still inside the task's interval.
    Update = 1,
    /// Position left the task's interval (or the task/performer was torn
    /// down while active).
    End = 2,
}

/// Wraps `f64` with a total order (via [`f64::total_cmp`]) so positions can
/// key a [`BTreeSet`]; beat positions are never NaN in practice, but this
/// avoids relying on it.
#[derive(Clone, Copy, Debug)]
struct OrderedF64(f64);

impl PartialEq for OrderedF64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == std::cmp::Ordering::Equal
    }
}
impl Eq for OrderedF64 {}
impl PartialOrd for OrderedF64 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OrderedF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

struct Task {
    position: f64,
    duration: f64,
    is_active: bool,
    callback: Box<dyn FnMut(TaskState)>,
}

impl Task {
    fn end_position(&self) -> f64 {
        self.position + self.duration
    }

    fn is_inside(&self, position: f64) -> bool {
        position >= self.position && position < self.end_position()
    }
}

/// Drives musical time for a set of scheduled tasks and an integer beat
/// grid, independent of any instrument. Owned by the main thread only.
pub struct Performer {
    tasks: SlotMap<TaskId, Task>,
    active_tasks: BTreeSet<(OrderedF64, TaskId)>,
    inactive_tasks: BTreeSet<(OrderedF64, TaskId)>,
    is_playing: bool,
    is_looping: bool,
    loop_begin_position: f64,
    loop_length: f64,
    position: f64,
    last_beat_position: Option<f64>,
    beat_callback: Option<Box<dyn FnMut()>>,
}

impl Default for Performer {
    fn default() -> Self {
        Self {
            tasks: SlotMap::with_key(),
            active_tasks: BTreeSet::new(),
            inactive_tasks: BTreeSet::new(),
            is_playing: false,
            is_looping: false,
            loop_begin_position: 0.0,
            loop_length: 1.0,
            position: 0.0,
            last_beat_position: None,
            beat_callback: None,
        }
    }
}

impl Performer {
    /// Creates a new, stopped performer at position `0.0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position, in beats.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Whether `Start` has been called more recently than `Stop`.
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Whether this performer wraps its position at the loop boundary.
    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    /// Loop region start, in beats.
    pub fn loop_begin_position(&self) -> f64 {
        self.loop_begin_position
    }

    /// Loop region length, in beats.
    pub fn loop_length(&self) -> f64 {
        self.loop_length
    }

    fn loop_end_position(&self) -> f64 {
        self.loop_begin_position + self.loop_length
    }

    /// Current position, and duration, of a task, or `None` if unknown.
    pub fn task_position(&self, task_id: TaskId) -> Option<f64> {
        self.tasks.get(task_id).map(|task| task.position)
    }

    /// Current duration of a task, or `None` if unknown.
    pub fn task_duration(&self, task_id: TaskId) -> Option<f64> {
        self.tasks.get(task_id).map(|task| task.duration)
    }

    /// Whether a task is currently active (its interval contains the
    /// performer's position).
    pub fn is_task_active(&self, task_id: TaskId) -> bool {
        self.tasks.get(task_id).is_some_and(|task| task.is_active)
    }

    /// Schedules a new task over `[position, position + duration)`.
    /// `duration` must be positive.
    pub fn create_task(&mut self, position: f64, duration: f64, callback: Box<dyn FnMut(TaskState)>) -> TaskId {
        debug_assert!(duration > 0.0, "task duration must be positive");
        let task_id = self.tasks.insert(Task { position, duration, is_active: false, callback });
        self.inactive_tasks.insert((OrderedF64(position), task_id));
        task_id
    }

    /// Removes a task. If it was active, its callback fires with `End`
    /// first.
    pub fn destroy_task(&mut self, task_id: TaskId) {
        let Some(task) = self.tasks.get(task_id) else { return };
        if task.is_active {
            let end_position = task.end_position();
            self.active_tasks.remove(&(OrderedF64(end_position), task_id));
            if let Some(task) = self.tasks.get_mut(task_id) {
                task.is_active = false;
                (task.callback)(TaskState::End);
            }
        } else {
            let position = task.position;
            self.inactive_tasks.remove(&(OrderedF64(position), task_id));
        }
        self.tasks.remove(task_id);
    }

    /// Moves a task to `position`, reindexing it and firing `End` if it was
    /// active and the new position falls outside its interval.
    pub fn set_task_position(&mut self, task_id: TaskId, position: f64) {
        let Some(task) = self.tasks.get(task_id) else { return };
        if task.position == position {
            return;
        }
        let old_position = task.position;
        let duration = task.duration;
        let is_active = task.is_active;
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.position = position;
        }
        if is_active {
            let old_end_position = old_position + duration;
            if self.tasks[task_id].is_inside(self.position) {
                self.update_active_task_key(old_end_position, task_id);
            } else {
                self.deactivate_with_known_end(task_id, old_end_position);
            }
        } else {
            self.update_inactive_task_key(old_position, task_id);
        }
    }

    /// Changes a task's duration, reindexing it and firing `End` if it was
    /// active and the new interval no longer contains the current position.
    /// `duration` must be positive.
    pub fn set_task_duration(&mut self, task_id: TaskId, duration: f64) {
        debug_assert!(duration > 0.0, "task duration must be positive");
        let Some(task) = self.tasks.get(task_id) else { return };
        if task.duration == duration {
            return;
        }
        let old_duration = task.duration;
        let is_active = task.is_active;
        let position = task.position;
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.duration = duration;
        }
        if is_active {
            let old_end_position = position + old_duration;
            if self.tasks[task_id].is_inside(self.position) {
                self.update_active_task_key(old_end_position, task_id);
            } else {
                self.deactivate_with_known_end(task_id, old_end_position);
            }
        }
    }

    /// Sets the callback fired once per integer beat while playing.
    pub fn set_beat_callback(&mut self, callback: Option<Box<dyn FnMut()>>) {
        self.beat_callback = callback;
    }

    /// Sets the loop region start, re-wrapping the current position if it's
    /// now past the loop end while looping.
    pub fn set_loop_begin_position(&mut self, loop_begin_position: f64) {
        if self.loop_begin_position == loop_begin_position {
            return;
        }
        self.loop_begin_position = loop_begin_position;
        if self.is_looping && self.position >= self.loop_end_position() {
            let wrapped = self.loop_around(self.position);
            self.set_position(wrapped);
        }
    }

    /// Sets the loop region length (clamped to non-negative), re-wrapping
    /// the current position if it's now past the loop end while looping.
    pub fn set_loop_length(&mut self, loop_length: f64) {
        let loop_length = loop_length.max(0.0);
        if self.loop_length == loop_length {
            return;
        }
        self.loop_length = loop_length;
        if self.is_looping && self.position >= self.loop_end_position() {
            let wrapped = self.loop_around(self.position);
            self.set_position(wrapped);
        }
    }

    /// Turns looping on or off, re-wrapping the current position if it's
    /// already past the loop end when turning looping on.
    pub fn set_looping(&mut self, is_looping: bool) {
        if self.is_looping == is_looping {
            return;
        }
        self.is_looping = is_looping;
        if self.is_looping && self.position >= self.loop_end_position() {
            let wrapped = self.loop_around(self.position);
            self.set_position(wrapped);
        }
    }

    /// Jumps to `position`. Clears the beat-callback dedup state; wraps if
    /// looping and `position` is past the loop end (deactivating every
    /// active task first); otherwise fires `Update` on still-active tasks
    /// whose interval still contains the new position and `End` on those
    /// that no longer do.
    pub fn set_position(&mut self, position: f64) {
        self.last_beat_position = None;
        if self.position == position {
            return;
        }
        if self.is_looping && position >= self.loop_end_position() {
            self.position = self.loop_around(position);
            while let Some(&(_, task_id)) = self.active_tasks.iter().next() {
                self.set_task_active(task_id, false);
            }
        } else {
            self.position = position;
            let snapshot: Vec<TaskId> = self.active_tasks.iter().map(|&(_, id)| id).collect();
            for task_id in snapshot {
                let Some(task) = self.tasks.get(task_id) else { continue };
                if !task.is_active {
                    // Already deactivated by an earlier callback in this pass.
                    continue;
                }
                if task.is_inside(self.position) {
                    if let Some(task) = self.tasks.get_mut(task_id) {
                        (task.callback)(TaskState::Update);
                    }
                } else {
                    self.set_task_active(task_id, false);
                }
            }
        }
    }

    /// Returns the smallest positive duration until the next event (task
    /// activation/deactivation or integer beat), or `0.0` if an inactive
    /// task's interval already contains the current position, or `None` if
    /// no future event exists (not playing, or nothing scheduled and no
    /// beat callback).
    pub fn get_next_duration(&self) -> Option<f64> {
        if !self.is_playing {
            return None;
        }
        let loop_end_position = self.loop_end_position();
        let mut next_position: Option<f64> = None;

        if let Some((next_task_position, next_task_id)) = self.next_inactive_task() {
            if self.tasks[next_task_id].is_inside(self.position) {
                return Some(0.0);
            }
            if next_task_position.0 < self.position {
                next_position = Some(next_task_position.0 + self.loop_length);
            } else if !self.is_looping || next_task_position.0 < loop_end_position {
                next_position = Some(next_task_position.0);
            }
        }

        if let Some(&(end_position, _)) = self.active_tasks.iter().next() {
            let candidate = if self.is_looping { end_position.0.min(loop_end_position) } else { end_position.0 };
            if next_position.map_or(true, |p| candidate < p) {
                next_position = Some(candidate);
            }
        }

        if self.beat_callback.is_some() {
            let next_beat_position = if self.last_beat_position == Some(self.position) {
                (self.position + 1.0).ceil()
            } else {
                self.position.ceil()
            };
            let mut beat_candidate = Some(next_beat_position);
            if self.is_looping && next_beat_position >= loop_end_position {
                let first_beat_offset = self.loop_begin_position.ceil() - self.loop_begin_position;
                beat_candidate = if self.loop_length > first_beat_offset {
                    Some(first_beat_offset + loop_end_position)
                } else {
                    None
                };
            }
            if let Some(beat_position) = beat_candidate {
                if next_position.map_or(true, |p| beat_position < p) {
                    next_position = Some(beat_position);
                }
            }
        }

        next_position.map(|p| {
            debug_assert!(p >= self.position);
            p - self.position
        })
    }

    /// Fires the beat callback if the position is an integer beat not yet
    /// processed this position, then activates every inactive task whose
    /// interval now contains the current position (firing `Begin`).
    pub fn process_all_tasks_at_position(&mut self) {
        if !self.is_playing {
            return;
        }
        if self.last_beat_position != Some(self.position) && self.position.ceil() == self.position {
            self.last_beat_position = Some(self.position);
            if let Some(callback) = &mut self.beat_callback {
                callback();
            }
            return;
        }
        loop {
            let Some((_, task_id)) = self.next_inactive_task() else { break };
            if !self.tasks[task_id].is_inside(self.position) {
                break;
            }
            self.set_task_active(task_id, true);
        }
    }

    /// Starts playback; has no immediate effect on position or tasks.
    pub fn start(&mut self) {
        self.is_playing = true;
    }

    /// Stops playback, deactivating every active task (firing `End`).
    pub fn stop(&mut self) {
        self.is_playing = false;
        self.last_beat_position = None;
        while let Some(&(_, task_id)) = self.active_tasks.iter().next() {
            self.set_task_active(task_id, false);
        }
    }

    /// Advances the position by `duration` (which must not exceed the next
    /// event distance from [`Performer::get_next_duration`]). A no-op while
    /// stopped.
    pub fn update(&mut self, duration: f64) {
        if !self.is_playing {
            return;
        }
        debug_assert!(duration > 0.0);
        let position = self.position + duration;
        self.set_position(position);
    }

    fn loop_around(&self, position: f64) -> f64 {
        if self.loop_length > 0.0 {
            self.loop_begin_position + (position - self.loop_begin_position) % self.loop_length
        } else {
            self.loop_begin_position
        }
    }

    fn set_task_active(&mut self, task_id: TaskId, is_active: bool) {
        let Some(task) = self.tasks.get(task_id) else { return };
        let position = task.position;
        let end_position = task.end_position();
        if is_active {
            self.inactive_tasks.remove(&(OrderedF64(position), task_id));
            self.active_tasks.insert((OrderedF64(end_position), task_id));
        } else {
            self.active_tasks.remove(&(OrderedF64(end_position), task_id));
            self.inactive_tasks.insert((OrderedF64(position), task_id));
        }
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.is_active = is_active;
            (task.callback)(if is_active { TaskState::Begin } else { TaskState::End });
        }
    }

    fn deactivate_with_known_end(&mut self, task_id: TaskId, end_position: f64) {
        self.active_tasks.remove(&(OrderedF64(end_position), task_id));
        let Some(task) = self.tasks.get(task_id) else { return };
        let position = task.position;
        self.inactive_tasks.insert((OrderedF64(position), task_id));
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.is_active = false;
            (task.callback)(TaskState::End);
        }
    }

    fn update_active_task_key(&mut self, old_end_position: f64, task_id: TaskId) {
        self.active_tasks.remove(&(OrderedF64(old_end_position), task_id));
        let new_end_position = self.tasks[task_id].end_position();
        self.active_tasks.insert((OrderedF64(new_end_position), task_id));
    }

    fn update_inactive_task_key(&mut self, old_position: f64, task_id: TaskId) {
        self.inactive_tasks.remove(&(OrderedF64(old_position), task_id));
        let new_position = self.tasks[task_id].position;
        self.inactive_tasks.insert((OrderedF64(new_position), task_id));
    }

    /// Finds the inactive task that will next matter: either the one whose
    /// interval already contains `position` (scanning the handful of tasks
    /// that sort before it, in case a `SetPosition` jump skipped straight
    /// into one), the next one by position, or — while looping — whichever
    /// of those wins against wrapping to the loop start.
    ///
    /// `TaskId::default()` is used as the low sentinel for the range query,
    /// the same trick the original plays with a null task pointer; it only
    /// affects tie-breaking among tasks that share the exact same position,
    /// which carries no documented ordering guarantee either way.
    fn next_inactive_task(&self) -> Option<(OrderedF64, TaskId)> {
        if !self.is_playing {
            return None;
        }
        let lower = (OrderedF64(self.position), TaskId::default());
        let mut next = self.inactive_tasks.range(lower..).next().copied();
        for &(position, task_id) in self.inactive_tasks.range((Unbounded, std::ops::Bound::Excluded(lower))) {
            if self.tasks[task_id].end_position() > self.position {
                next = Some((position, task_id));
                break;
            }
        }
        if self.is_looping {
            let loop_end_position = self.loop_end_position();
            if next.map_or(true, |(position, _)| position.0 >= loop_end_position) {
                let wrap_lower = (OrderedF64(self.loop_begin_position), TaskId::default());
                next = self.inactive_tasks.range(wrap_lower..).next().copied();
            }
        }
        next
    }
}
