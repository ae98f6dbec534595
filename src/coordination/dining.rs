//! Dining philosophers: N participants sharing N chopsticks arranged in a ring.
//!
//! Seat `i` needs its left chopstick `i` and its right chopstick `(i + 1) % N`.
//! If everyone grabs left then right, all N can hold their left chopstick and
//! wait on their neighbour's: a full cycle, and nobody ever eats. That policy
//! is kept as [`AcquisitionPolicy::LeftThenRight`] to reproduce the deadlock.
//!
//! [`AcquisitionPolicy::Ordered`] takes the lower-numbered chopstick first.
//! Seat `N - 1` then reaches for chopstick `0` before chopstick `N - 1`, which
//! reverses one edge of the ring, so the graph "holds A, waits for B" has no
//! cycle and some philosopher can always finish.
//!
//! Chopsticks are held only while eating; a thinking philosopher holds nothing.

use crate::concurrency::sync::{ReentrantMutex, ReentrantMutexGuard};
use crossbeam_utils::CachePadded;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

/// A shared resource; its lock also counts how often it was used.
pub struct Chopstick {
    id: usize,
    uses: ReentrantMutex<Cell<u64>>,
}

impl Chopstick {
    fn new(id: usize) -> Self {
        Self {
            id,
            uses: ReentrantMutex::new(Cell::new(0)),
        }
    }

    /// Position on the ring; also its rank in the ordered policy.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The chopstick's lock.
    pub fn lock(&self) -> &ReentrantMutex<Cell<u64>> {
        &self.uses
    }

    /// Completed meals this chopstick took part in.
    pub fn uses(&self) -> u64 {
        self.uses.lock().get()
    }
}

/// How a philosopher orders its two chopsticks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionPolicy {
    /// Lower chopstick ID first. Deadlock-free.
    #[default]
    Ordered,
    /// Left then right. Deadlocks when every seat grabs its left at once.
    LeftThenRight,
}

/// Where a philosopher is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhilosopherState {
    /// Holding nothing.
    Thinking,
    /// Acquiring chopsticks.
    Hungry,
    /// Holding both chopsticks.
    Eating,
}

/// The ring of chopsticks and the policy for taking them.
pub struct DiningTable {
    chopsticks: Vec<Chopstick>,
    meals: Vec<CachePadded<AtomicU64>>,
    policy: AcquisitionPolicy,
}

impl DiningTable {
    /// Sets a table for `seats` philosophers.
    ///
    /// # Panics
    ///
    /// If `seats < 2`; a single seat would need the same chopstick twice.
    pub fn new(seats: usize, policy: AcquisitionPolicy) -> Self {
        assert!(seats >= 2, "a dining table needs at least two seats, got {seats}");
        Self {
            chopsticks: (0..seats).map(Chopstick::new).collect(),
            meals: (0..seats).map(|_| CachePadded::new(AtomicU64::new(0))).collect(),
            policy,
        }
    }

    /// Number of seats (and chopsticks).
    pub fn seats(&self) -> usize {
        self.chopsticks.len()
    }

    /// The acquisition policy.
    pub fn policy(&self) -> AcquisitionPolicy {
        self.policy
    }

    /// Chopstick by ring position.
    ///
    /// # Panics
    ///
    /// If `id` is not on the ring.
    pub fn chopstick(&self, id: usize) -> &Chopstick {
        assert!(id < self.seats(), "chopstick {id} is not on the table");
        &self.chopsticks[id]
    }

    fn check_seat(&self, seat: usize) {
        assert!(seat < self.seats(), "seat {seat} is not at the table");
    }

    /// Left chopstick of `seat`.
    pub fn left(&self, seat: usize) -> usize {
        seat
    }

    /// Right chopstick of `seat`.
    pub fn right(&self, seat: usize) -> usize {
        (seat + 1) % self.seats()
    }

    /// The two chopsticks of `seat` in the order the policy takes them.
    pub fn acquisition_order(&self, seat: usize) -> (usize, usize) {
        let (left, right) = (self.left(seat), self.right(seat));
        match self.policy {
            AcquisitionPolicy::LeftThenRight => (left, right),
            AcquisitionPolicy::Ordered => (left.min(right), left.max(right)),
        }
    }

    /// Edges `first -> second` for every seat: "may hold `first` while waiting for `second`".
    ///
    /// A cycle in this graph is a possible deadlock.
    pub fn resource_graph(&self) -> Vec<(usize, usize)> {
        (0..self.seats()).map(|seat| self.acquisition_order(seat)).collect()
    }

    /// Blocks until `seat` holds both of its chopsticks.
    ///
    /// # Panics
    ///
    /// If `seat` is not at the table.
    pub fn acquire_resources(&self, seat: usize) -> Meal<'_> {
        self.check_seat(seat);
        let (first, second) = self.acquisition_order(seat);
        let first = self.chopsticks[first].uses.lock();
        let second = self.chopsticks[second].uses.lock();
        Meal {
            table: self,
            seat,
            second,
            first,
        }
    }

    /// Meals eaten at `seat`.
    ///
    /// # Panics
    ///
    /// If `seat` is not at the table.
    pub fn meals_eaten(&self, seat: usize) -> u64 {
        self.check_seat(seat);
        self.meals[seat].load(Ordering::Relaxed)
    }

    /// Meals eaten at all seats.
    pub fn total_meals(&self) -> u64 {
        self.meals.iter().map(|m| m.load(Ordering::Relaxed)).sum()
    }
}

/// Both chopsticks of one seat, held; dropping it puts them down.
pub struct Meal<'a> {
    table: &'a DiningTable,
    seat: usize,
    // Field order drops `second` before `first`.
    second: ReentrantMutexGuard<'a, Cell<u64>>,
    first: ReentrantMutexGuard<'a, Cell<u64>>,
}

impl Meal<'_> {
    /// Seat that holds the chopsticks.
    pub fn seat(&self) -> usize {
        self.seat
    }

    /// Uses both chopsticks once; this is the only place meals are counted.
    pub fn eat(&self) {
        self.first.set(self.first.get() + 1);
        self.second.set(self.second.get() + 1);
        self.table.meals[self.seat].fetch_add(1, Ordering::Relaxed);
    }

    /// Puts both chopsticks down.
    pub fn finish(self) {}
}

/// One participant and its THINKING -> HUNGRY -> EATING -> THINKING cycle.
pub struct Philosopher<'t> {
    table: &'t DiningTable,
    seat: usize,
    state: PhilosopherState,
}

impl<'t> Philosopher<'t> {
    /// Seats a philosopher at `seat`.
    ///
    /// # Panics
    ///
    /// If `seat` is not at the table.
    pub fn new(table: &'t DiningTable, seat: usize) -> Self {
        table.check_seat(seat);
        Self {
            table,
            seat,
            state: PhilosopherState::Thinking,
        }
    }

    /// Current state.
    pub fn state(&self) -> PhilosopherState {
        self.state
    }

    /// Meals eaten at this philosopher's seat.
    pub fn meals(&self) -> u64 {
        self.table.meals_eaten(self.seat)
    }

    fn transition(&mut self, next: PhilosopherState) {
        tracing::trace!(seat = self.seat, from = ?self.state, to = ?next, "philosopher");
        self.state = next;
    }

    /// HUNGRY, then EATING once both chopsticks are held.
    pub fn pick_up(&mut self) -> Meal<'t> {
        self.transition(PhilosopherState::Hungry);
        let meal = self.table.acquire_resources(self.seat);
        self.transition(PhilosopherState::Eating);
        meal
    }

    /// Puts the chopsticks down and goes back to THINKING.
    pub fn put_down(&mut self, meal: Meal<'t>) {
        meal.finish();
        self.transition(PhilosopherState::Thinking);
    }

    /// Runs `rounds` full think/eat cycles.
    pub fn dine(&mut self, rounds: u64) {
        for _ in 0..rounds {
            let meal = self.pick_up();
            meal.eat();
            self.put_down(meal);
        }
        tracing::debug!(seat = self.seat, meals = self.meals(), "philosopher done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_orders() {
        let ordered = DiningTable::new(5, AcquisitionPolicy::Ordered);
        let naive = DiningTable::new(5, AcquisitionPolicy::LeftThenRight);

        assert_eq!(ordered.acquisition_order(1), (1, 2));
        assert_eq!(ordered.acquisition_order(4), (0, 4));
        assert_eq!(naive.acquisition_order(4), (4, 0));
        assert_eq!(naive.resource_graph(), vec![(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)]);
    }

    #[test]
    fn test_single_philosopher_cycle() {
        let table = DiningTable::new(3, AcquisitionPolicy::Ordered);
        let mut p = Philosopher::new(&table, 2);
        assert_eq!(p.state(), PhilosopherState::Thinking);

        let meal = p.pick_up();
        assert_eq!(p.state(), PhilosopherState::Eating);
        assert!(table.chopstick(0).lock().is_locked());
        assert!(table.chopstick(2).lock().is_locked());
        meal.eat();
        p.put_down(meal);

        assert_eq!(p.state(), PhilosopherState::Thinking);
        assert!(!table.chopstick(0).lock().is_locked());
        p.dine(4);
        assert_eq!(p.meals(), 5);
        assert_eq!(table.meals_eaten(2), 5);
        assert_eq!(table.chopstick(1).uses(), 0);
        assert_eq!(table.chopstick(2).uses(), 5);
    }

    #[test]
    fn test_meal_put_down_uneaten_is_not_counted() {
        let table = DiningTable::new(2, AcquisitionPolicy::Ordered);
        let mut p = Philosopher::new(&table, 0);

        let meal = p.pick_up();
        p.put_down(meal);
        assert_eq!(p.meals(), 0);
        assert_eq!(table.total_meals(), 0);
        assert_eq!(table.chopstick(0).uses(), 0);

        let meal = p.pick_up();
        meal.eat();
        p.put_down(meal);
        assert_eq!((p.meals(), table.meals_eaten(0)), (1, 1));
    }

    #[test]
    #[should_panic(expected = "seat 3 is not at the table")]
    fn test_acquire_resources_rejects_unknown_seat() {
        DiningTable::new(3, AcquisitionPolicy::Ordered).acquire_resources(3);
    }

    #[test]
    #[should_panic(expected = "seat 7 is not at the table")]
    fn test_meals_eaten_rejects_unknown_seat() {
        DiningTable::new(3, AcquisitionPolicy::Ordered).meals_eaten(7);
    }

    #[test]
    #[should_panic(expected = "chopstick 5 is not on the table")]
    fn test_chopstick_rejects_unknown_id() {
        DiningTable::new(5, AcquisitionPolicy::Ordered).chopstick(5);
    }

    #[test]
    #[should_panic(expected = "at least two seats")]
    fn test_one_seat_rejected() {
        DiningTable::new(1, AcquisitionPolicy::Ordered);
    }
}
