use sha2::{Digest, Sha256};

use crate::draw::DrawResult;

/// Identity of a draw: `date#number` when both are known, otherwise a hash
/// over the region rows sorted by region name.
pub fn identity_key(r: &DrawResult) -> String {
    if let (Some(date), Some(number)) = (&r.draw_date, &r.draw_number) {
        return format!("{date}#{number}");
    }
    let mut pairs: Vec<(&str, &[u8])> = r
        .entries
        .iter()
        .map(|e| (e.region.as_str(), e.numbers.as_slice()))
        .collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    for (region, numbers) in pairs {
        let joined = numbers.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(",");
        hasher.update(format!("{region}={joined};").as_bytes());
    }
    format!("sha256:{:x}", hasher.finalize())
}

/// Pure novelty decision; the caller owns reading and writing `last_key`.
pub fn is_novel(last_key: Option<&str>, candidate: &DrawResult) -> (bool, String) {
    let key = identity_key(candidate);
    let novel = last_key.map_or(true, |k| k != key);
    (novel, key)
}
