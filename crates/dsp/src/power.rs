use num_complex::Complex64;

/// Offset subtracted from each unsigned 8-bit sample
pub const MIDPOINT: i32 = 127;

/// Full-scale RMS amplitude of an 8-bit I/Q pair, 128/sqrt(2)
pub const FULL_SCALE: f64 = 90.5;

/// RMS power of one capture, in dBFS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Power {
    /// Total RMS power, DC component included
    pub rms_db: f64,
    /// RMS power with the mean magnitude removed
    pub rms_dc_db: f64,
}

/// Iterate the complete I/Q pairs of a raw CU8 buffer, centred on zero.
/// A trailing odd byte is ignored.
pub fn iq_samples(buf: &[u8]) -> impl Iterator<Item = Complex64> + '_ {
    buf.chunks_exact(2).map(|pair| {
        Complex64::new(
            f64::from(i32::from(pair[0]) - MIDPOINT),
            f64::from(i32::from(pair[1]) - MIDPOINT),
        )
    })
}

fn to_dbfs(amplitude: f64) -> f64 {
    20.0 * (amplitude / FULL_SCALE).log10()
}

/// Reduce a raw capture to RMS power with and without its DC component.
///
/// `rms` is the root of the mean squared magnitude and `dc` the mean
/// magnitude. A buffer holding no complete pair reports `-inf` for both.
pub fn rms_power(buf: &[u8]) -> Power {
    let mut rms_sum = 0.0;
    let mut dc_sum = 0.0;
    let mut pairs = 0usize;

    for s in iq_samples(buf) {
        let p = s.norm_sqr();
        rms_sum += p;
        dc_sum += p.sqrt();
        pairs += 1;
    }

    if pairs == 0 {
        return Power {
            rms_db: f64::NEG_INFINITY,
            rms_dc_db: f64::NEG_INFINITY,
        };
    }

    let n = pairs as f64;
    let rms = (rms_sum / n).sqrt();
    let dc = dc_sum / n;

    Power {
        rms_db: to_dbfs(rms),
        // rms >= dc always; clamp rounding noise so a flat signal gives -inf, not NaN
        rms_dc_db: to_dbfs((rms - dc).max(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_minus_inf() {
        let buf = [127u8; 64];
        let p = rms_power(&buf);
        assert_eq!(p.rms_db, f64::NEG_INFINITY);
        assert_eq!(p.rms_dc_db, f64::NEG_INFINITY);
    }

    #[test]
    fn test_constant_carrier() {
        // I = +90, Q = 0 on every sample: magnitude is constant, so all the
        // power is "DC" and nothing is left once it is removed.
        let buf: Vec<u8> = [217u8, 127].repeat(32);
        let p = rms_power(&buf);

        let expected = 20.0 * (90.0f64 / FULL_SCALE).log10();
        assert!((p.rms_db - expected).abs() < 1e-9, "rms_db = {}", p.rms_db);
        assert_eq!(p.rms_dc_db, f64::NEG_INFINITY);
    }

    #[test]
    fn test_mixed_magnitudes() {
        // (3, 4) has magnitude 5, (0, 0) has magnitude 0
        let buf = [130u8, 131, 127, 127];
        let p = rms_power(&buf);

        let rms = (25.0f64 / 2.0).sqrt();
        let dc = 2.5;
        assert!((p.rms_db - 20.0 * (rms / FULL_SCALE).log10()).abs() < 1e-9);
        assert!((p.rms_dc_db - 20.0 * ((rms - dc) / FULL_SCALE).log10()).abs() < 1e-9);
        assert!(p.rms_dc_db < p.rms_db);
    }

    #[test]
    fn test_odd_trailing_byte_ignored() {
        let even = rms_power(&[217, 127, 130, 131]);
        let odd = rms_power(&[217, 127, 130, 131, 255]);
        assert_eq!(even, odd);
    }

    #[test]
    fn test_degenerate_buffers_do_not_panic() {
        for buf in [&[][..], &[200u8][..]] {
            let p = rms_power(buf);
            assert_eq!(p.rms_db, f64::NEG_INFINITY);
            assert_eq!(p.rms_dc_db, f64::NEG_INFINITY);
        }
    }

    #[test]
    fn test_iq_samples_centred() {
        let samples: Vec<Complex64> = iq_samples(&[0, 255, 127, 128]).collect();
        assert_eq!(samples, vec![Complex64::new(-127.0, 128.0), Complex64::new(0.0, 1.0)]);
    }
}
