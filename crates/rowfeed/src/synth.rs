use crate::{
    COLOR_BOUND, ChildRef, Color, Error, FRACTION_SCALE, Fraction, RandSource, Record, Result,
};

/// Exclusive upper bound of a record's `quantity`.
pub const QUANTITY_BOUND: u64 = 100;

/// Largest batch whose backing allocation stays within `isize::MAX` bytes.
pub const MAX_ARRAY_SIZE: usize = isize::MAX as usize / size_of::<Record>();

/// Synthesizes one batch of `array_size` records.
///
/// For the record at index `i`:
/// - `id` is `i + 1`
/// - `quantity` is uniform in `[0, 100)`
/// - `fraction` is uniform in `[0, 1)` at `1e-18` resolution
/// - `color` and `child.color` are independently uniform 24-bit colors
/// - `child.id` is `i + array_size`
///
/// Ids depend only on the position and the batch size, so every batch of the
/// same size carries the same ids while everything else is re-sampled.
///
/// # Panics
///
/// Panics if the batch cannot be allocated. Use [`try_generate_batch`] where
/// `array_size` is not trusted.
pub fn generate_batch<R>(array_size: usize, rng: &mut R) -> Vec<Record>
where
    R: RandSource + ?Sized,
{
    let mut records = Vec::with_capacity(array_size);
    fill_batch(&mut records, array_size, rng);
    records
}

/// Like [`generate_batch`], but reports an allocation failure instead of
/// panicking.
///
/// # Errors
///
/// Returns [`Error::BatchAllocation`] if `array_size` exceeds
/// [`MAX_ARRAY_SIZE`] or the allocator refuses the request.
pub fn try_generate_batch<R>(array_size: usize, rng: &mut R) -> Result<Vec<Record>>
where
    R: RandSource + ?Sized,
{
    if array_size > MAX_ARRAY_SIZE {
        return Err(Error::BatchAllocation { array_size });
    }
    let mut records = Vec::new();
    records
        .try_reserve_exact(array_size)
        .map_err(|_| Error::BatchAllocation { array_size })?;
    fill_batch(&mut records, array_size, rng);
    Ok(records)
}

fn fill_batch<R>(records: &mut Vec<Record>, array_size: usize, rng: &mut R)
where
    R: RandSource + ?Sized,
{
    records.extend((0..array_size).map(|i| Record {
        id: (i + 1).to_string(),
        quantity: random_quantity(rng),
        fraction: random_fraction(rng),
        color: random_color(rng),
        child: ChildRef {
            id: (i + array_size).to_string(),
            color: random_color(rng),
        },
    }));
}

// A source that breaks the `below` bound trips the debug assertions. Release
// builds clamp its output to the top of each range.

fn random_quantity<R: RandSource + ?Sized>(rng: &mut R) -> u8 {
    let quantity = rng.below(QUANTITY_BOUND);
    debug_assert!(quantity < QUANTITY_BOUND, "below({QUANTITY_BOUND}) returned {quantity}");
    quantity.min(QUANTITY_BOUND - 1) as u8
}

fn random_fraction<R: RandSource + ?Sized>(rng: &mut R) -> Fraction {
    let atoms = rng.below(FRACTION_SCALE);
    debug_assert!(atoms < FRACTION_SCALE, "below({FRACTION_SCALE}) returned {atoms}");
    Fraction::from_atoms(atoms).unwrap_or(Fraction::MAX)
}

fn random_color<R: RandSource + ?Sized>(rng: &mut R) -> Color {
    let bound = u64::from(COLOR_BOUND);
    let rgb = rng.below(bound);
    debug_assert!(rgb < bound, "below({bound}) returned {rgb}");
    u32::try_from(rgb)
        .ok()
        .and_then(Color::from_rgb)
        .unwrap_or(Color::WHITE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SeededRandom, ThreadRandom};

    /// Always returns the largest value allowed by the bound.
    struct MaxRand;
    impl RandSource for MaxRand {
        fn below(&mut self, bound: u64) -> u64 {
            bound - 1
        }
    }

    /// Ignores the bound entirely.
    struct OutOfRangeRand;
    impl RandSource for OutOfRangeRand {
        fn below(&mut self, bound: u64) -> u64 {
            bound
        }
    }

    /// Always returns zero.
    struct ZeroRand;
    impl RandSource for ZeroRand {
        fn below(&mut self, _bound: u64) -> u64 {
            0
        }
    }

    fn assert_color_format(s: &str) {
        assert_eq!(s.len(), 7, "{s}");
        assert!(s.starts_with('#'), "{s}");
        assert!(
            s[1..]
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)),
            "{s}"
        );
    }

    fn assert_fraction_format(s: &str) {
        let (whole, frac) = s.split_once('.').expect("decimal point");
        assert_eq!(whole, "0", "{s}");
        assert_eq!(frac.len(), 18, "{s}");
        assert!(frac.bytes().all(|b| b.is_ascii_digit()), "{s}");
    }

    #[test]
    fn every_field_keeps_its_format() {
        for size in [0, 1, 1000] {
            let batch = generate_batch(size, &mut ThreadRandom);
            assert_eq!(batch.len(), size);
            for record in &batch {
                assert!(record.quantity < 100);
                assert_fraction_format(&record.fraction.to_string());
                assert_color_format(&record.color.to_string());
                assert_color_format(&record.child.color.to_string());
            }
        }
    }

    #[test]
    fn ids_follow_position_and_size() {
        let batch = generate_batch(4, &mut ThreadRandom);
        let ids: Vec<_> = batch.iter().map(|r| r.id.as_str()).collect();
        let child_ids: Vec<_> = batch.iter().map(|r| r.child.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3", "4"]);
        assert_eq!(child_ids, ["4", "5", "6", "7"]);
    }

    #[test]
    fn extremes_render_padded() {
        let low = generate_batch(1, &mut ZeroRand);
        assert_eq!(low[0].quantity, 0);
        assert_eq!(low[0].fraction.to_string(), "0.000000000000000000");
        assert_eq!(low[0].color.to_string(), "#000000");

        let high = generate_batch(1, &mut MaxRand);
        assert_eq!(high[0].quantity, 99);
        assert_eq!(high[0].fraction.to_string(), "0.999999999999999999");
        assert_eq!(high[0].color.to_string(), "#ffffff");
        assert_eq!(high[0].child.color.to_string(), "#ffffff");
    }

    #[test]
    fn seeded_batches_are_reproducible() {
        let a = generate_batch(16, &mut SeededRandom::new(99));
        let b = generate_batch(16, &mut SeededRandom::new(99));
        assert_eq!(a, b);
    }

    #[test]
    fn colors_are_sampled_independently() {
        let batch = generate_batch(256, &mut SeededRandom::new(3));
        let differing = batch
            .iter()
            .filter(|r| r.color != r.child.color)
            .count();
        assert!(differing > 200);
    }

    #[test]
    fn fallible_generation_matches_the_infallible_one() {
        let a = try_generate_batch(16, &mut SeededRandom::new(7)).unwrap();
        let b = generate_batch(16, &mut SeededRandom::new(7));
        assert_eq!(a, b);
        assert!(try_generate_batch(0, &mut ZeroRand).unwrap().is_empty());
    }

    #[test]
    fn oversized_batches_are_reported_not_panicked() {
        for size in [MAX_ARRAY_SIZE + 1, usize::MAX / 2, usize::MAX] {
            assert_eq!(
                try_generate_batch(size, &mut ZeroRand),
                Err(Error::BatchAllocation { array_size: size })
            );
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "returned")]
    fn out_of_range_sources_are_caught_in_debug_builds() {
        let _ = generate_batch(1, &mut OutOfRangeRand);
    }
}
