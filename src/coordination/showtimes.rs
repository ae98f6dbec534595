//! Movies and theaters that reference each other, linked with open calls.
//!
//! A movie lists the theaters showing it and a theater lists the movies it
//! shows; each side has its own lock. If `Movie::add_theater` kept the movie
//! locked while calling into the theater, and `Theater::is_showing` kept the
//! theater locked while asking the movie for its title, the two calls would
//! take the same pair of locks in opposite orders and could deadlock.
//!
//! Here every critical section covers only its own object's mutation or read.
//! Calls into the other object happen after the local lock is released.

use crate::concurrency::sync::ReentrantMutex;
use std::cell::RefCell;
use std::sync::Arc;

struct MovieState {
    title: String,
    theaters: Vec<Arc<Theater>>,
}

/// A movie and the theaters it is booked into.
pub struct Movie {
    state: ReentrantMutex<RefCell<MovieState>>,
}

impl Movie {
    /// Creates a movie with no bookings.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(MovieState {
                title: title.into(),
                theaters: Vec::new(),
            })),
        }
    }

    /// The movie's title.
    pub fn title(&self) -> String {
        self.state.lock().borrow().title.clone()
    }

    /// Books the movie into `theater`, updating both sides.
    pub fn add_theater(&self, theater: Arc<Theater>) {
        let title = {
            let state = self.state.lock();
            let mut state = state.borrow_mut();
            state.theaters.push(Arc::clone(&theater));
            state.title.clone()
        };
        // Open call: the movie lock is released before entering the theater.
        theater.add_movie(title);
    }

    /// Number of theaters booked.
    pub fn theater_count(&self) -> usize {
        self.state.lock().borrow().theaters.len()
    }
}

/// A theater and the titles it shows.
pub struct Theater {
    name: String,
    titles: ReentrantMutex<RefCell<Vec<String>>>,
}

impl Theater {
    /// Creates a theater showing nothing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            titles: ReentrantMutex::new(RefCell::new(Vec::new())),
        }
    }

    /// The theater's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a title to the programme.
    pub fn add_movie(&self, title: String) {
        self.titles.lock().borrow_mut().push(title);
    }

    /// Whether `movie` is on the programme.
    pub fn is_showing(&self, movie: &Movie) -> bool {
        // Open call: ask the movie before taking the theater lock.
        let title = movie.title();
        self.titles.lock().borrow().contains(&title)
    }
}
