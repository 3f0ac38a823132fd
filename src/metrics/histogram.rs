#![expect(
    clippy::float_arithmetic,
    reason = "Bin centroids and quantile interpolation are real-valued"
)]

use std::cmp::Ordering;
use std::num::NonZeroUsize;

/// One centroid of the streaming histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub value: f64,
    pub count: u64,
}

/// Bounded-memory histogram over an unbounded stream of samples.
///
/// Holds at most `max_bins` centroids sorted by value. Once an insertion pushes
/// the bin count past the limit, the two adjacent bins with the smallest gap
/// are merged into their count-weighted mean, so memory stays fixed no matter
/// how many samples are added.
#[derive(Debug, Clone)]
pub struct StreamingHistogram {
    bins: Vec<Bin>,
    max_bins: usize,
    total: u64,
}

impl StreamingHistogram {
    #[must_use]
    pub fn new(max_bins: NonZeroUsize) -> Self {
        let max_bins = max_bins.get();
        Self {
            bins: Vec::with_capacity(max_bins.saturating_add(1)),
            max_bins,
            total: 0,
        }
    }

    /// Adds one sample. Non-finite values are ignored and not counted.
    pub fn add(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }

        let index = self.bins.partition_point(|bin| bin.value < value);
        match self.bins.get_mut(index) {
            Some(bin) if bin.value.partial_cmp(&value) == Some(Ordering::Equal) => {
                bin.count = bin.count.saturating_add(1);
            }
            Some(_) | None => self.bins.insert(index, Bin { value, count: 1 }),
        }
        self.total = self.total.saturating_add(1);

        if self.bins.len() > self.max_bins {
            self.merge_closest_pair();
        }
    }

    #[must_use]
    pub const fn count(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Estimates the value at quantile `p`.
    ///
    /// Each bin is treated as a mass centred on its value, so the rank of bin
    /// `i` is the count of every earlier bin plus half of its own. Ranks that
    /// fall between two bins are linearly interpolated; ranks before the first
    /// or after the last midpoint clamp to that bin's value. Returns `0.0` for
    /// an empty histogram or when `p` lies outside `[0, 1]`.
    #[must_use]
    pub fn quantile(&self, p: f64) -> f64 {
        if self.total == 0 || !(0.0..=1.0).contains(&p) {
            return 0.0;
        }
        let (Some(first), Some(last)) = (self.bins.first(), self.bins.last()) else {
            return 0.0;
        };

        let rank = p * self.total as f64;
        if rank <= first.count as f64 / 2.0 {
            return first.value;
        }

        let mut preceding = 0.0;
        for pair in self.bins.windows(2) {
            let [left, right] = pair else {
                continue;
            };
            let left_mid = preceding + left.count as f64 / 2.0;
            let right_mid = preceding + left.count as f64 + right.count as f64 / 2.0;
            if rank <= right_mid {
                let fraction = (rank - left_mid) / (right_mid - left_mid);
                return left.value + (right.value - left.value) * fraction;
            }
            preceding += left.count as f64;
        }

        last.value
    }

    fn merge_closest_pair(&mut self) {
        let closest = self
            .bins
            .windows(2)
            .enumerate()
            .filter_map(|(index, pair)| match pair {
                [left, right] => Some((index, right.value - left.value)),
                _ => None,
            })
            .fold(None::<(usize, f64)>, |best, (index, gap)| match best {
                Some((_, best_gap)) if best_gap <= gap => best,
                Some(_) | None => Some((index, gap)),
            });

        let Some((index, _)) = closest else {
            return;
        };
        let right_index = index.saturating_add(1);
        let Some(right) = self.bins.get(right_index).copied() else {
            return;
        };
        let Some(left) = self.bins.get_mut(index) else {
            return;
        };

        let count = left.count.saturating_add(right.count);
        left.value = (left.value * left.count as f64 + right.value * right.count as f64)
            / count as f64;
        left.count = count;
        self.bins.remove(right_index);
    }
}
