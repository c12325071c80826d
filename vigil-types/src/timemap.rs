use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Seek policy for [TimeMap::find] and every frame-request operation built
/// on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SeekMode {
    /// Only an entry whose key matches the request exactly.
    Exact,
    /// The entry closest to the request, later entry on an exact tie.
    #[default]
    Nearest,
    /// The first entry at or after the request.
    LowerBound,
    /// The entry at the request if present, else the last entry before it.
    UpperBound,
    /// The first entry strictly after the request.
    Next,
    /// The last entry strictly before the request.
    Previous,
}

/// An ordered associative container keyed by [Timestamp].
///
/// Keys are held in a sorted `Vec`; insertion replaces an entry whose key
/// is order-equivalent to the new one. All keys in one map are expected to
/// share a valid axis (all carry time, or all carry frame numbers);
/// axis-incompatible keys compare unordered and would corrupt the sort
/// order, mirroring the caveat documented on [Timestamp::is_before].
#[derive(Debug, Clone)]
pub struct TimeMap<V> {
    entries: Vec<(Timestamp, V)>,
}

impl<V> Default for TimeMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

fn equivalent(a: &Timestamp, b: &Timestamp) -> bool {
    !a.is_before(b) && !b.is_before(a)
}

impl<V> TimeMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn first(&self) -> Option<(&Timestamp, &V)> {
        self.entries.first().map(|(k, v)| (k, v))
    }

    pub fn last(&self) -> Option<(&Timestamp, &V)> {
        self.entries.last().map(|(k, v)| (k, v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Timestamp, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Timestamp> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Index of the first entry with key >= `pos`.
    fn lower_bound(&self, pos: &Timestamp) -> usize {
        self.entries.partition_point(|(k, _)| k.is_before(pos))
    }

    /// Index of the first entry with key > `pos`.
    fn upper_bound(&self, pos: &Timestamp) -> usize {
        self.entries.partition_point(|(k, _)| k.is_at_or_before(pos))
    }

    fn entry(&self, index: usize) -> Option<(&Timestamp, &V)> {
        self.entries.get(index).map(|(k, v)| (k, v))
    }

    /// Inserts `value` at `key`. An existing order-equivalent entry keeps
    /// its stored key and only has its value replaced, so a collision on
    /// one axis never rewrites the other axis of the key already in the
    /// map.
    pub fn insert(&mut self, key: Timestamp, value: V) {
        let i = self.lower_bound(&key);
        match self.entries.get_mut(i) {
            Some(entry) if equivalent(&entry.0, &key) => entry.1 = value,
            _ => self.entries.insert(i, (key, value)),
        }
    }

    /// Exact lookup by order-equivalent key.
    pub fn get(&self, pos: &Timestamp) -> Option<&V> {
        let i = self.lower_bound(pos);
        match self.entries.get(i) {
            Some((k, v)) if equivalent(k, pos) => Some(v),
            _ => None,
        }
    }

    pub fn remove(&mut self, pos: &Timestamp) -> Option<V> {
        let i = self.lower_bound(pos);
        match self.entries.get(i) {
            Some((k, _)) if equivalent(k, pos) => Some(self.entries.remove(i).1),
            _ => None,
        }
    }

    /// Parameterized seek. Returns `None` for an empty map or invalid `pos`,
    /// and otherwise applies the [SeekMode] policy.
    pub fn find(&self, pos: Timestamp, mode: SeekMode) -> Option<(&Timestamp, &V)> {
        if self.entries.is_empty() || !pos.is_valid() {
            return None;
        }

        match mode {
            SeekMode::Exact => {
                let i = self.lower_bound(&pos);
                match self.entry(i) {
                    Some((k, v)) if equivalent(k, &pos) => Some((k, v)),
                    _ => None,
                }
            }

            SeekMode::LowerBound => self.entry(self.lower_bound(&pos)),

            SeekMode::Next => self.entry(self.upper_bound(&pos)),

            SeekMode::UpperBound => {
                // Exact match wins.
                let i = self.lower_bound(&pos);
                if let Some((k, v)) = self.entry(i) {
                    if equivalent(k, &pos) {
                        return Some((k, v));
                    }
                }
                if pos.is_before(&self.entries[0].0) {
                    return None;
                }
                // A pos sharing no axis with the keys compares unordered
                // and slips through the guard above; never index below
                // the start.
                match self.upper_bound(&pos) {
                    0 => None,
                    i => self.entry(i - 1),
                }
            }

            SeekMode::Previous => {
                if pos.is_at_or_before(&self.entries[0].0) {
                    return None;
                }
                match self.lower_bound(&pos) {
                    0 => None,
                    i => self.entry(i - 1),
                }
            }

            SeekMode::Nearest => {
                // An exact match wins outright. Resolving it through the
                // distance comparison below would misfire on frame-only
                // keys, where a zero frame difference reads as an absent
                // axis and the tie rule would skip past the match.
                let i = self.lower_bound(&pos);
                if let Some((k, v)) = self.entry(i) {
                    if equivalent(k, &pos) {
                        return Some((k, v));
                    }
                }
                if i == self.entries.len() {
                    return self.entry(i - 1);
                }
                if i == 0 {
                    return self.entry(0);
                }
                let next_dist = self.entries[i].0.diff(&pos);
                let prev_dist = pos.diff(&self.entries[i - 1].0);
                if prev_dist.is_before(&next_dist) {
                    self.entry(i - 1)
                } else {
                    // Ties go to the later entry.
                    self.entry(i)
                }
            }
        }
    }
}

impl<V> FromIterator<(Timestamp, V)> for TimeMap<V> {
    fn from_iter<I: IntoIterator<Item = (Timestamp, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
