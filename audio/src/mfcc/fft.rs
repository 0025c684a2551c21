//! In-place radix-2 Cooley-Tukey FFT over (real, imag) tuples.

use std::f64::consts::PI;

/// Performs an in-place FFT. Input length must be a power of 2.
pub fn fft(buf: &mut [(f64, f64)]) {
    let n = buf.len();
    if n <= 1 {
        return;
    }

    // Bit-reversal permutation.
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            buf.swap(i, j);
        }
    }

    // Butterfly passes.
    let mut size = 2;
    while size <= n {
        let half = size / 2;
        let angle = -2.0 * PI / size as f64;
        let step = (angle.cos(), angle.sin());
        let mut start = 0;
        while start < n {
            let mut w = (1.0f64, 0.0f64);
            for k in 0..half {
                let u = buf[start + k];
                let v = buf[start + k + half];
                let t = (w.0 * v.0 - w.1 * v.1, w.0 * v.1 + w.1 * v.0);
                buf[start + k] = (u.0 + t.0, u.1 + t.1);
                buf[start + k + half] = (u.0 - t.0, u.1 - t.1);
                w = (w.0 * step.0 - w.1 * step.1, w.0 * step.1 + w.1 * step.0);
            }
            start += size;
        }
        size <<= 1;
    }
}
