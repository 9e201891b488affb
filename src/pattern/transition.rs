use crate::bitstring::BitString;
use serde::{Deserialize, Serialize};

/// First-order transition counts between adjacent bits
///
/// `counts[from][to]` is the number of positions `i` with `bits[i] == from`
/// and `bits[i + 1] == to`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    pub counts: [[usize; 2]; 2],
}

impl TransitionMatrix {
    pub fn from_bits(bits: &BitString) -> Self {
        let mut counts = [[0usize; 2]; 2];
        for pair in bits.as_slice().windows(2) {
            counts[pair[0] as usize][pair[1] as usize] += 1;
        }
        Self { counts }
    }

    /// Number of adjacent pairs observed
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Estimated P(next = `to` | current = `from`); 0 when `from` never
    /// precedes another bit
    pub fn probability(&self, from: u8, to: u8) -> f64 {
        let row = self.counts[(from & 1) as usize];
        let outgoing = row[0] + row[1];
        if outgoing == 0 {
            return 0.0;
        }
        row[(to & 1) as usize] as f64 / outgoing as f64
    }

    /// Number of pairs whose symbols differ
    pub fn changes(&self) -> usize {
        self.counts[0][1] + self.counts[1][0]
    }
}
