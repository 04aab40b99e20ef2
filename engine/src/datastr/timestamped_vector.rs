//! A fast resettable vector based on timestamps.

/// A resettable vector of plain values based on 32bit timestamps.
/// Entries written before the last `reset` read as the default again,
/// so one instance can serve many small searches without clearing the whole array.
#[derive(Debug, Clone)]
pub struct TimestampedVector<T> {
    data: Vec<T>,
    // timestamp for current iteration. Up to date values will have this one, 0 is never current
    current: u32,
    timestamps: Vec<u32>,
    default: T,
}

impl<T: Copy> TimestampedVector<T> {
    pub fn new(size: usize, default: T) -> TimestampedVector<T> {
        TimestampedVector {
            data: vec![default; size],
            current: 1,
            timestamps: vec![0; size],
            default,
        }
    }

    /// Reset all elements to the default.
    /// Amortized O(1).
    pub fn reset(&mut self) {
        let (new, overflow) = self.current.overflowing_add(1);
        self.current = new;

        // old timestamps may be valid again after an overflow
        if overflow {
            for (element, timestamp) in self.data.iter_mut().zip(self.timestamps.iter_mut()) {
                *element = self.default;
                *timestamp = 0;
            }
            self.current = 1;
        }
    }

    pub fn get(&self, index: usize) -> T {
        if self.timestamps[index] == self.current {
            self.data[index]
        } else {
            self.default
        }
    }

    pub fn set(&mut self, index: usize, value: T) {
        self.data[index] = value;
        self.timestamps[index] = self.current;
    }

    /// Was the entry written since the last reset?
    pub fn is_set(&self, index: usize) -> bool {
        self.timestamps[index] == self.current
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_restores_default() {
        let mut dists = TimestampedVector::new(3, f64::INFINITY);
        assert!(!dists.is_set(0));
        assert_eq!(dists.get(0), f64::INFINITY);
        dists.set(1, 4.0);
        assert_eq!(dists.get(1), 4.0);
        assert!(dists.is_set(1));
        assert!(!dists.is_set(0));
        dists.reset();
        assert_eq!(dists.get(1), f64::INFINITY);
        assert!(!dists.is_set(1));
    }

    #[test]
    fn survives_timestamp_overflow() {
        let mut flags = TimestampedVector::new(2, false);
        flags.current = u32::MAX;
        flags.set(0, true);
        flags.reset();
        assert!(!flags.get(0));
        assert!(!flags.is_set(0));
        assert!(!flags.is_set(1));
        assert_eq!(flags.current, 1);
        flags.set(1, true);
        assert!(flags.get(1));
        assert!(!flags.get(0));
    }
}
