use rand::seq::SliceRandom;
use rand::Rng;

/// Uniform pick from `pool` after dropping everything `excluded` flags.
///
/// When the filter leaves nothing, the pick falls back to the whole pool, so
/// the result is `None` only for an empty pool.
pub fn pick_excluding<'a, T, R>(
    pool: &'a [T],
    excluded: impl Fn(&T) -> bool,
    rng: &mut R,
) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    let candidates: Vec<&T> = pool.iter().filter(|item| !excluded(item)).collect();
    if candidates.is_empty() {
        if !pool.is_empty() {
            tracing::debug!("exclusion emptied the pool of {}, using all of it", pool.len());
        }
        pool.choose(rng)
    } else {
        candidates.choose(rng).copied()
    }
}
