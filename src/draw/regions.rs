/// The eleven lotto wheels, in their customary publication order.
pub const DEFAULT_REGIONS: [&str; 11] = [
    "BARI", "CAGLIARI", "FIRENZE", "GENOVA", "MILANO", "NAPOLI",
    "PALERMO", "ROMA", "TORINO", "VENEZIA", "NAZIONALE",
];

/// Words that show up around published results but not on error or consent pages.
pub const DOMAIN_KEYWORDS: [&str; 4] = ["LOTTO", "ESTRAZIONE", "RUOTA", "NUMERO"];

/// Closed set of recognized region names, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSet {
    names: Vec<String>,
}

impl RegionSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for n in names {
            let n = n.as_ref().trim().to_uppercase();
            if n.is_empty() || out.contains(&n) { continue; }
            out.push(n);
        }
        RegionSet { names: out }
    }

    pub fn parse_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    /// First recognized name contained in `upper`, which must already be uppercase.
    pub fn find_in(&self, upper: &str) -> Option<&str> {
        self.names.iter().map(|n| n.as_str()).find(|n| upper.contains(n))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| n.as_str())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize { self.names.len() }

    pub fn is_empty(&self) -> bool { self.names.is_empty() }
}

impl Default for RegionSet {
    fn default() -> Self { Self::new(DEFAULT_REGIONS) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_is_normalized_and_deduplicated() {
        let set = RegionSet::parse_csv(" roma, Bari ,,ROMA");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["ROMA", "BARI"]);
    }

    #[test]
    fn find_in_uses_declaration_order() {
        let set = RegionSet::default();
        assert_eq!(set.find_in("RUOTA DI NAPOLI 12 13"), Some("NAPOLI"));
        assert_eq!(set.find_in("NOTHING HERE"), None);
    }
}
