use std::collections::VecDeque;

use crate::domain::StreamEvent;

/// Most recent events for one topic, oldest dropped first.
#[derive(Debug, Clone)]
pub struct EventHistory {
    events: VecDeque<StreamEvent>,
    capacity: usize,
}

impl EventHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: StreamEvent) {
        if self.capacity == 0 {
            return;
        }
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn latest(&self) -> Option<&StreamEvent> {
        self.events.back()
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<StreamEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
