/// Numeric thresholds used while extracting and checking draws.
///
/// The defaults match the 90-number lotto: five numbers per wheel, each in
/// 1..=90, with partial rows of three or four accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRules {
    pub min_value: u8,
    pub max_value: u8,
    pub min_numbers: usize,
    pub max_numbers: usize,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        ExtractionRules { min_value: 1, max_value: 90, min_numbers: 3, max_numbers: 5 }
    }
}

impl ExtractionRules {
    pub fn in_range(&self, n: u8) -> bool {
        n >= self.min_value && n <= self.max_value
    }

    /// Apply the count policy: at least `min_numbers`, truncated to `max_numbers`.
    pub fn accept(&self, mut numbers: Vec<u8>) -> Option<Vec<u8>> {
        if numbers.len() < self.min_numbers { return None; }
        numbers.truncate(self.max_numbers);
        Some(numbers)
    }
}
