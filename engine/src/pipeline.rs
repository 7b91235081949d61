//! Push-based observer plumbing.
//!
//! The engine is single-threaded and synchronous: `notify` runs to
//! completion on the caller's stack before returning, and observers are held
//! behind `Rc<RefCell<…>>`. A monitor is an observer of timed-word events
//! and a subject of match records.

use std::cell::RefCell;
use std::rc::Rc;

pub trait Observer<T> {
    fn notify(&mut self, data: &T);
}

/// A shared, mutably borrowable observer handle.
pub type ObserverRef<T> = Rc<RefCell<dyn Observer<T>>>;

/// A subject with at most one observer, used on match outputs.
pub struct SingleSubject<T> {
    observer: Option<ObserverRef<T>>,
}

impl<T> Default for SingleSubject<T> {
    fn default() -> Self {
        SingleSubject { observer: None }
    }
}

impl<T> SingleSubject<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_observer(&mut self, observer: ObserverRef<T>) {
        self.observer = Some(observer);
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    pub fn notify(&self, data: &T) {
        if let Some(observer) = &self.observer {
            observer.borrow_mut().notify(data);
        }
    }
}

/// A subject with any number of observers, notified in insertion order.
pub struct Subject<T> {
    observers: Vec<ObserverRef<T>>,
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Subject { observers: Vec::new() }
    }
}

impl<T> Subject<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: ObserverRef<T>) {
        self.observers.push(observer);
    }

    pub fn remove_observer(&mut self, observer: &ObserverRef<T>) {
        self.observers.retain(|o| !Rc::ptr_eq(o, observer));
    }

    pub fn notify(&self, data: &T) {
        for observer in &self.observers {
            observer.borrow_mut().notify(data);
        }
    }
}

/// An observer collecting everything it sees; handy for tests and for
/// driving the monitors programmatically.
#[derive(Default)]
pub struct Collector<T: Clone> {
    pub seen: Vec<T>,
}

impl<T: Clone> Collector<T> {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Collector { seen: Vec::new() }))
    }
}

impl<T: Clone> Observer<T> for Collector<T> {
    fn notify(&mut self, data: &T) {
        self.seen.push(data.clone());
    }
}
