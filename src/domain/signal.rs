//! Trading signals and their translation into held positions.
//!
//! A signal is what a strategy knows at the close of each bar. The position
//! held during bar t is the exposure the signal asked for at the close of
//! bar t-1, so nothing observed at bar t can influence the bar-t position.

/// Output of a strategy, index-aligned with the price series.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Discrete entry/exit events. An entry and an exit never fire on the same bar.
    Crossover { entries: Vec<bool>, exits: Vec<bool> },
    /// Desired exposure by sign: positive means long, zero or negative means flat.
    /// Non-finite values mean "no signal yet".
    Level(Vec<f64>),
}

impl Signal {
    /// All-flat level signal of `len` bars.
    pub fn flat(len: usize) -> Self {
        Signal::Level(vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        match self {
            Signal::Crossover { entries, .. } => entries.len(),
            Signal::Level(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exposure requested at the close of each bar: 1.0 long, 0.0 flat.
    pub fn exposure(&self) -> Vec<f64> {
        match self {
            Signal::Crossover { entries, exits } => {
                let mut holding = false;
                entries
                    .iter()
                    .enumerate()
                    .map(|(i, &entry)| {
                        let exit = exits.get(i).copied().unwrap_or(false);
                        if holding && exit {
                            holding = false;
                        } else if !holding && entry {
                            holding = true;
                        }
                        if holding { 1.0 } else { 0.0 }
                    })
                    .collect()
            }
            Signal::Level(values) => values
                .iter()
                .map(|&v| if v.is_finite() && v > 0.0 { 1.0 } else { 0.0 })
                .collect(),
        }
    }

    /// Entry and exit events: entries where exposure goes from flat to long,
    /// exits on the reverse transition.
    pub fn entries_exits(&self) -> (Vec<bool>, Vec<bool>) {
        let exposure = self.exposure();
        let mut entries = Vec::with_capacity(exposure.len());
        let mut exits = Vec::with_capacity(exposure.len());
        let mut prev = 0.0;
        for &e in &exposure {
            entries.push(prev <= 0.0 && e > 0.0);
            exits.push(prev > 0.0 && e <= 0.0);
            prev = e;
        }
        (entries, exits)
    }
}

/// Shifts exposure by one bar: position[0] = 0, position[t] = exposure[t-1].
pub fn lagged_positions(exposure: &[f64]) -> Vec<f64> {
    let mut positions = Vec::with_capacity(exposure.len());
    if !exposure.is_empty() {
        positions.push(0.0);
        positions.extend_from_slice(&exposure[..exposure.len() - 1]);
    }
    positions
}
