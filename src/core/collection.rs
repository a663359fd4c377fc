use crate::core::Stop;
use std::sync::Arc;

/// Every stop uploaded so far, in upload order.
///
/// The backing vector is shared and replaced on each change, so
/// [`StopCollection::same_as`] tells a renderer whether anything happened since
/// it last looked.
#[derive(Debug, Clone, Default)]
pub struct StopCollection {
    stops: Arc<Vec<Stop>>,
}

impl StopCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, new_stops: Vec<Stop>) {
        if new_stops.is_empty() {
            return;
        }
        let mut next = Vec::with_capacity(self.stops.len() + new_stops.len());
        next.extend_from_slice(&self.stops);
        next.extend(new_stops);
        self.stops = Arc::new(next);
    }

    pub fn clear(&mut self) {
        if !self.stops.is_empty() {
            self.stops = Arc::new(Vec::new());
        }
    }

    pub fn as_slice(&self) -> &[Stop] {
        &self.stops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stop> {
        self.stops.iter()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn same_as(&self, other: &StopCollection) -> bool {
        Arc::ptr_eq(&self.stops, &other.stops)
    }
}
