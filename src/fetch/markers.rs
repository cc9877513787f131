use crate::draw::regions::DOMAIN_KEYWORDS;
use crate::draw::RegionSet;

/// Content-sufficiency heuristic: does the body mention enough region names
/// and domain keywords to be worth parsing?
#[derive(Debug, Clone)]
pub struct MarkerCheck {
    markers: Vec<String>,
    min_hits: usize,
}

impl MarkerCheck {
    pub fn new(regions: &RegionSet, min_hits: usize) -> Self {
        let mut markers: Vec<String> = regions.iter().map(str::to_string).collect();
        markers.extend(DOMAIN_KEYWORDS.iter().map(|k| k.to_string()));
        MarkerCheck { markers, min_hits }
    }

    /// Distinct markers present, case-insensitively.
    pub fn count(&self, body: &str) -> usize {
        let upper = body.to_uppercase();
        self.markers.iter().filter(|m| upper.contains(m.as_str())).count()
    }

    pub fn is_sufficient(&self, body: &str) -> bool {
        self.min_hits == 0 || self.count(body) >= self.min_hits
    }

    /// Markers plus table markup, used while waiting for a rendered page to fill in.
    pub fn has_any(&self, body: &str) -> bool {
        let upper = body.to_uppercase();
        upper.contains("<TABLE") || self.markers.iter().any(|m| upper.contains(m.as_str()))
    }
}
