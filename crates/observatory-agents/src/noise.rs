//! Character-level message corruption.
//!
//! Cross-region communication degrades with distance: each character of a
//! message is independently replaced with a random alphanumeric character
//! with probability `noise_factor`. Proximity matters.

use rand::Rng;

/// Replacement alphabet for corrupted characters.
const NOISE_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Apply noise to message content.
///
/// - `noise_factor <= 0`: perfect transmission, content returned as-is.
/// - `noise_factor >= 1`: complete garbling, a fully random string of the
///   same character length.
/// - otherwise: each character is independently corrupted with
///   probability `noise_factor`.
pub fn apply_noise<R: Rng + ?Sized>(content: &str, noise_factor: f64, rng: &mut R) -> String {
    if noise_factor <= 0.0 {
        return content.to_owned();
    }

    if noise_factor >= 1.0 {
        return (0..content.chars().count())
            .map(|_| random_char(rng))
            .collect();
    }

    content
        .chars()
        .map(|c| {
            if rng.random::<f64>() < noise_factor {
                random_char(rng)
            } else {
                c
            }
        })
        .collect()
}

/// Human-readable description of a noise level.
pub fn readability(noise_factor: f64) -> &'static str {
    if noise_factor <= 0.0 {
        "crystal clear"
    } else if noise_factor <= 0.1 {
        "minor static"
    } else if noise_factor <= 0.3 {
        "noticeable interference"
    } else if noise_factor <= 0.5 {
        "heavy distortion"
    } else if noise_factor <= 0.8 {
        "barely legible"
    } else {
        "complete garbling"
    }
}

fn random_char<R: Rng + ?Sized>(rng: &mut R) -> char {
    let index = rng.random_range(0..NOISE_CHARSET.len());
    NOISE_CHARSET.get(index).copied().unwrap_or(b'#') as char
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn zero_noise_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(apply_noise("hello world", 0.0, &mut rng), "hello world");
        assert_eq!(apply_noise("hello world", -0.5, &mut rng), "hello world");
    }

    #[test]
    fn full_noise_preserves_length_only() {
        let mut rng = StdRng::seed_from_u64(2);
        let garbled = apply_noise("hello world", 1.0, &mut rng);
        assert_eq!(garbled.chars().count(), 11);
        assert!(garbled.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn partial_noise_preserves_length() {
        let mut rng = StdRng::seed_from_u64(3);
        let content = "the quick brown fox jumps over the lazy dog";
        let noisy = apply_noise(content, 0.5, &mut rng);
        assert_eq!(noisy.chars().count(), content.chars().count());
    }

    #[test]
    fn seeded_noise_is_deterministic() {
        let content = "hello world";
        let a = apply_noise(content, 0.5, &mut StdRng::seed_from_u64(42));
        let b = apply_noise(content, 0.5, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn heavy_noise_corrupts_roughly_half() {
        // Over a long message, 0.5 noise should land well away from the
        // extremes; this is a sanity band, not an exact count.
        let content: String = std::iter::repeat_n('a', 1000).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let noisy = apply_noise(&content, 0.5, &mut rng);
        let changed = noisy.chars().filter(|c| *c != 'a').count();
        assert!(changed > 300 && changed < 700, "changed = {changed}");
    }

    #[test]
    fn readability_labels() {
        assert_eq!(readability(0.0), "crystal clear");
        assert_eq!(readability(0.05), "minor static");
        assert_eq!(readability(0.2), "noticeable interference");
        assert_eq!(readability(0.5), "heavy distortion");
        assert_eq!(readability(0.7), "barely legible");
        assert_eq!(readability(0.95), "complete garbling");
    }
}
