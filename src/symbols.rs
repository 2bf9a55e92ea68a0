use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};

/// Picks the glyph a scrambling slot shows on a given frame.
pub trait SymbolSource {
    fn next_symbol(&mut self, alphabet: &[char]) -> char;
}

/// Uniform choice over the alphabet backed by a `rand` generator.
pub struct RngSymbols<R> {
    rng: R,
}

impl<R: RngCore> RngSymbols<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSymbols<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> SymbolSource for RngSymbols<R> {
    fn next_symbol(&mut self, alphabet: &[char]) -> char {
        if alphabet.is_empty() {
            return ' ';
        }

        alphabet[self.rng.random_range(0..alphabet.len())]
    }
}

/// Builds the source for the CLI: seeded when asked, thread rng otherwise.
pub fn symbol_source(seed: Option<u64>) -> Box<dyn SymbolSource> {
    match seed {
        Some(seed) => Box::new(RngSymbols::seeded(seed)),
        None => Box::new(RngSymbols::new(rand::rng())),
    }
}

#[cfg(test)]
pub mod testing {
    use super::SymbolSource;

    /// Walks the alphabet in order, wrapping around.
    #[derive(Default)]
    pub struct CycleSymbols {
        next: usize,
    }

    impl SymbolSource for CycleSymbols {
        fn next_symbol(&mut self, alphabet: &[char]) -> char {
            let ch = alphabet[self.next % alphabet.len()];
            self.next += 1;
            ch
        }
    }
}
