#![no_main]

use std::num::NonZeroUsize;

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&first, rest)) = data.split_first() else {
        return;
    };
    let Some(max_bins) = NonZeroUsize::new(usize::from(first % 32).saturating_add(1)) else {
        return;
    };

    let samples: Vec<f64> = rest
        .chunks_exact(8)
        .take(512)
        .map(|chunk| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            f64::from_le_bytes(bytes)
        })
        .collect();
    let finite = samples.iter().filter(|value| value.is_finite()).count() as u64;

    let histogram = salvo::fuzzing::histogram_from_samples(max_bins, &samples);
    debug_assert!(histogram.bins().len() <= max_bins.get());
    debug_assert_eq!(histogram.count(), finite);
    let total: u64 = histogram.bins().iter().map(|bin| bin.count).sum();
    debug_assert_eq!(total, finite);
    debug_assert!(
        histogram
            .bins()
            .windows(2)
            .all(|pair| pair[0].value <= pair[1].value)
    );
    let _ = histogram.quantile(0.5);
    let _ = histogram.quantile(0.99);
});
