//! Mel-scale filterbank and DCT basis construction.

use std::f64::consts::PI;

/// Hamming window coefficients for an `n`-sample frame.
pub fn hamming_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let scale = 2.0 * PI / (n - 1) as f64;
    (0..n).map(|i| 0.54 - 0.46 * (scale * i as f64).cos()).collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank over the band `[low_freq, high_freq]`.
///
/// Returns `[num_filters][half_fft]` where `half_fft = fft_size / 2 + 1`.
pub fn mel_filter_bank(
    num_filters: usize,
    fft_size: usize,
    sample_rate: u32,
    low_freq: f64,
    high_freq: f64,
) -> Vec<Vec<f64>> {
    let half_fft = fft_size / 2 + 1;
    let low_mel = hz_to_mel(low_freq);
    let high_mel = hz_to_mel(high_freq);

    // num_filters + 2 edge points, equally spaced on the mel scale, mapped
    // onto FFT bin indices.
    let step = (high_mel - low_mel) / (num_filters + 1) as f64;
    let mut bins: Vec<usize> = (0..num_filters + 2)
        .map(|i| {
            let hz = mel_to_hz(low_mel + i as f64 * step);
            let bin = (hz * fft_size as f64 / sample_rate as f64).round() as usize;
            bin.min(half_fft - 1)
        })
        .collect();

    // Narrow bands can collapse edges onto the same bin; keep them strictly
    // increasing so every filter spans at least one bin.
    for i in 1..bins.len() {
        if bins[i] <= bins[i - 1] {
            bins[i] = bins[i - 1] + 1;
        }
    }

    let mut bank = Vec::with_capacity(num_filters);
    for m in 0..num_filters {
        let mut weights = vec![0.0f64; half_fft];
        let (lo, mid, hi) = (bins[m], bins[m + 1], bins[m + 2]);

        for bin in lo..mid.min(half_fft) {
            if mid != lo {
                weights[bin] = (bin - lo) as f64 / (mid - lo) as f64;
            }
        }
        for bin in mid..=hi.min(half_fft - 1) {
            if hi != mid {
                weights[bin] = (hi - bin) as f64 / (hi - mid) as f64;
            }
        }
        bank.push(weights);
    }
    bank
}

/// Precomputes the DCT-II basis used to turn log mel energies into cepstra.
///
/// Returns `[num_coeffs][num_filters]` with
/// `basis[k][m] = cos(pi * k * (m + 0.5) / num_filters)`.
pub fn dct_basis(num_coeffs: usize, num_filters: usize) -> Vec<Vec<f64>> {
    (0..num_coeffs)
        .map(|k| {
            (0..num_filters)
                .map(|m| (PI * k as f64 * (m as f64 + 0.5) / num_filters as f64).cos())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_window_symmetric() {
        let w = hamming_window(2048);
        assert_eq!(w.len(), 2048);
        for i in 0..1024 {
            assert!((w[i] - w[2047 - i]).abs() < 1e-10);
        }
        // Endpoints taper to ~0.08, center rises to ~1.0
        assert!((w[0] - 0.08).abs() < 0.01);
        assert!((w[1023] - 1.0).abs() < 0.01);
    }

    #[test]
    fn hamming_window_degenerate() {
        assert!(hamming_window(0).is_empty());
        assert_eq!(hamming_window(1), vec![1.0]);
    }

    #[test]
    fn hz_mel_roundtrip() {
        for &hz in &[0.0, 50.0, 440.0, 1000.0, 8000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((hz - back).abs() < 1e-6, "roundtrip failed for {hz} Hz");
        }
    }

    #[test]
    fn filter_bank_shape() {
        let bank = mel_filter_bank(40, 2048, 48000, 50.0, 8000.0);
        assert_eq!(bank.len(), 40);
        assert_eq!(bank[0].len(), 1025); // 2048/2 + 1

        for filter in &bank {
            assert!(filter.iter().all(|&v| v >= 0.0));
            assert!(filter.iter().any(|&v| v > 0.0), "filter must not be empty");
        }
    }

    #[test]
    fn filter_bank_band_limits() {
        let bank = mel_filter_bank(40, 2048, 48000, 50.0, 8000.0);
        // 8 kHz maps to bin 341; nothing above the band should carry weight.
        let top_bin = (8000.0f64 * 2048.0 / 48000.0).round() as usize;
        for filter in &bank {
            for (k, &v) in filter.iter().enumerate() {
                if k > top_bin + 1 {
                    assert_eq!(v, 0.0, "weight above band at bin {k}");
                }
            }
        }
    }

    #[test]
    fn dct_basis_first_row_flat() {
        let basis = dct_basis(13, 40);
        assert_eq!(basis.len(), 13);
        assert_eq!(basis[0].len(), 40);
        // k = 0 row is all ones: c0 sums the log mel energies.
        assert!(basis[0].iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn dct_basis_rows_orthogonal() {
        let basis = dct_basis(13, 40);
        for k in 1..13 {
            let dot: f64 = basis[0].iter().zip(&basis[k]).map(|(a, b)| a * b).sum();
            assert!(dot.abs() < 1e-9, "row {k} not orthogonal to row 0: {dot}");
        }
    }
}
